//! The async operation each work item is pushed through.

use futures::Future;

/// Something that turns an item into a future producing a result.
///
/// Implemented for every `FnMut(T) -> Fut` where `Fut` resolves to a
/// `Result`. Use [`fallible`] when the call itself can fail before it ever
/// produces a future.
pub trait Worker<T> {
    type Output;
    type Error;
    type Future: Future<Output = Result<Self::Output, Self::Error>>;

    /// Start the operation for `item`. An `Err` here is treated exactly
    /// like the returned future resolving to `Err`.
    fn launch(&mut self, item: T) -> Result<Self::Future, Self::Error>;
}

impl<T, F, Fut, R, E> Worker<T> for F
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    type Output = R;
    type Error = E;
    type Future = Fut;

    fn launch(&mut self, item: T) -> Result<Fut, E> {
        Ok(self(item))
    }
}

/// Worker whose invocation may fail synchronously. See [`fallible`].
#[derive(Debug, Clone, Copy)]
pub struct Fallible<F>(F);

/// Wrap a `FnMut(T) -> Result<Fut, E>` so an immediate `Err` cancels the
/// dispatch the same way an asynchronous failure does.
///
/// ```rust
/// use futures::future::{ready, Ready};
/// use futures_ratemap::{dispatch, fallible, Options, WorkSource};
///
/// let result = tokio_test::block_on(dispatch(
///     WorkSource::range(4),
///     Options::default(),
///     fallible(|i: usize| -> Result<Ready<Result<usize, String>>, String> {
///         if i == 2 {
///             return Err("refused".to_string());
///         }
///         Ok(ready(Ok(i)))
///     }),
/// ));
/// assert_eq!(result.unwrap_err().into_worker_error(), Some("refused".to_string()));
/// ```
pub fn fallible<F>(f: F) -> Fallible<F> {
    Fallible(f)
}

impl<T, F, Fut, R, E> Worker<T> for Fallible<F>
where
    F: FnMut(T) -> Result<Fut, E>,
    Fut: Future<Output = Result<R, E>>,
{
    type Output = R;
    type Error = E;
    type Future = Fut;

    fn launch(&mut self, item: T) -> Result<Fut, E> {
        (self.0)(item)
    }
}

#[cfg(test)]
mod tests {
    use futures::future::{ready, Ready};

    use super::*;

    fn launch_now<W: Worker<u32>>(worker: &mut W, item: u32) -> Result<W::Output, W::Error> {
        let future = worker.launch(item)?;
        futures::executor::block_on(future)
    }

    #[test]
    fn test_closure_worker() {
        let mut calls = 0;
        let mut worker = |i: u32| {
            calls += 1;
            async move { Ok::<_, ()>(i * 10) }
        };
        assert_eq!(launch_now(&mut worker, 4), Ok(40));
        assert_eq!(launch_now(&mut worker, 5), Ok(50));
        drop(worker);
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_fallible_worker() {
        type Launch = Result<Ready<Result<u32, &'static str>>, &'static str>;

        let mut worker = fallible(|i: u32| -> Launch {
            if i % 2 == 0 {
                Ok(ready(Ok(i)))
            } else {
                Err("odd")
            }
        });
        assert_eq!(launch_now(&mut worker, 2), Ok(2));
        assert_eq!(launch_now(&mut worker, 3), Err("odd"));
    }
}
