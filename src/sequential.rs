//! Mapping shortcuts built on [`dispatch`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::Future;

use crate::dispatch::dispatch;
use crate::error::{ConfigError, DispatchError};
use crate::options::Options;
use crate::source::WorkSource;
use crate::worker::Worker;

/// One item at a time: item `n + 1` is launched only after item `n` has
/// finished. Rate and spacing limits in `options` still apply.
pub async fn map_sequential<I, W>(
    source: WorkSource<I>,
    options: Options,
    worker: W,
) -> Result<Vec<W::Output>, DispatchError<W::Error>>
where
    I: Iterator,
    W: Worker<I::Item>,
{
    dispatch(source, options.max_in_flight(1), worker).await
}

/// Run `worker` once per item of `source`, one call at a time, feeding each
/// call the value produced by the previous one (`init` for the first).
///
/// Items only count the steps. Resolves to the last value, or `init` when
/// the source is empty.
///
/// ```rust
/// use std::convert::Infallible;
/// use futures_ratemap::{reduce_sequential, Options, WorkSource};
///
/// let total = tokio_test::block_on(reduce_sequential(
///     WorkSource::range(4),
///     Options::default(),
///     1u64,
///     |acc: u64| async move { Ok::<_, Infallible>(acc * 3) },
/// ));
/// assert_eq!(total.unwrap(), 81);
/// ```
pub async fn reduce_sequential<I, A, F, Fut, E>(
    source: WorkSource<I>,
    options: Options,
    init: A,
    mut step: F,
) -> Result<A, DispatchError<E>>
where
    I: Iterator,
    A: Clone,
    F: FnMut(A) -> Fut,
    Fut: Future<Output = Result<A, E>>,
{
    let latest = Arc::new(Mutex::new(init));
    let worker = {
        let latest = Arc::clone(&latest);
        move |_: I::Item| {
            let current = lock(&latest).clone();
            let next = step(current);
            let latest = Arc::clone(&latest);
            async move {
                let value = next.await?;
                *lock(&latest) = value;
                Ok::<(), E>(())
            }
        }
    };
    map_sequential(source, options, worker).await?;
    let value = lock(&latest).clone();
    Ok(value)
}

fn lock<A>(cell: &Mutex<A>) -> MutexGuard<'_, A> {
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Concurrency limit only, no timing limits. `0` means unlimited.
pub async fn map_concurrent<I, W>(
    source: WorkSource<I>,
    max_in_flight: usize,
    worker: W,
) -> Result<Vec<W::Output>, DispatchError<W::Error>>
where
    I: Iterator,
    W: Worker<I::Item>,
{
    dispatch(source, Options::new().max_in_flight(max_in_flight), worker).await
}

/// A rate window that must be set, plus an optional concurrency cap
/// (`0` means unlimited).
pub async fn rate_limit_map<I, W>(
    source: WorkSource<I>,
    max_in_flight: usize,
    requests_per_duration: usize,
    duration: Duration,
    worker: W,
) -> Result<Vec<W::Output>, DispatchError<W::Error>>
where
    I: Iterator,
    W: Worker<I::Item>,
{
    if requests_per_duration == 0 || duration.is_zero() {
        return Err(ConfigError::IncompleteWindow.into());
    }
    let options = Options::new()
        .max_in_flight(max_in_flight)
        .rate(requests_per_duration, duration);
    dispatch(source, options, worker).await
}
