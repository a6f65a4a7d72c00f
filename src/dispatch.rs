//! The dispatcher: launches work under every active limit.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{FuturesUnordered, Stream};
use futures::Future;
use pin_project::pin_project;
use tokio::time::{sleep_until, Instant, Sleep};

use crate::constraint::Limits;
use crate::error::{ConfigError, DispatchError};
use crate::history::LaunchHistory;
use crate::observer::{DispatchObserver, DispatchStats, Outcome, TracingObserver};
use crate::options::Options;
use crate::slots::ResultSlots;
use crate::source::WorkSource;
use crate::worker::Worker;

/// Validated limits plus the observer that watches each dispatch.
#[derive(Debug, Clone)]
pub struct Dispatcher<O = TracingObserver> {
    limits: Limits,
    observer: O,
}

impl Dispatcher {
    /// Validate `options` before anything can be launched.
    pub fn new(options: Options) -> Result<Self, ConfigError> {
        Ok(Self::from_limits(options.validate()?))
    }

    pub fn from_limits(limits: Limits) -> Self {
        Self {
            limits,
            observer: TracingObserver,
        }
    }
}

impl<O> Dispatcher<O> {
    /// Replace the observer. Pass `()` to silence the dispatcher.
    pub fn with_observer<P: DispatchObserver>(self, observer: P) -> Dispatcher<P> {
        Dispatcher {
            limits: self.limits,
            observer,
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Push every item of `source` through `worker`.
    ///
    /// The returned future resolves to the results in draw order, or to the
    /// first worker failure. Nothing runs until it is polled.
    pub fn dispatch<I, W>(&self, source: WorkSource<I>, worker: W) -> Dispatch<I, W, O>
    where
        I: Iterator,
        W: Worker<I::Item>,
        O: DispatchObserver + Clone,
    {
        Dispatch {
            source,
            worker,
            limits: self.limits,
            observer: self.observer.clone(),
            history: self.limits.new_history(),
            running: FuturesUnordered::new(),
            timer: None,
            slots: ResultSlots::default(),
            progress: Progress::default(),
        }
    }
}

/// Validate `options` and push every item of `source` through `worker`.
///
/// At most `max_in_flight` worker futures are outstanding at once, no more
/// than `requests_per_duration` launches happen in any `duration`, and
/// consecutive launches are at least `min_spacing` apart. Results come back
/// in draw order regardless of completion order.
///
/// ```rust
/// use std::convert::Infallible;
/// use std::time::Duration;
/// use futures_ratemap::{dispatch, Options, WorkSource};
///
/// let options = Options::new()
///     .max_in_flight(2)
///     .min_spacing(Duration::from_millis(5));
/// let results = tokio_test::block_on(dispatch(
///     WorkSource::sequence(vec![1, 2, 3, 4, 5]),
///     options,
///     |item: u64| async move { Ok::<_, Infallible>(item * 10) },
/// ));
/// assert_eq!(results.unwrap(), vec![10, 20, 30, 40, 50]);
/// ```
pub async fn dispatch<I, W>(
    source: WorkSource<I>,
    options: Options,
    worker: W,
) -> Result<Vec<W::Output>, DispatchError<W::Error>>
where
    I: Iterator,
    W: Worker<I::Item>,
{
    let dispatcher = Dispatcher::new(options)?;
    dispatcher.dispatch(source, worker).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Running,
    Resolved,
    Rejected,
}

#[derive(Debug)]
struct Progress {
    state: State,
    started: Option<Instant>,
    stats: DispatchStats,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            state: State::Running,
            started: None,
            stats: DispatchStats::default(),
        }
    }
}

impl Progress {
    fn settle<O: DispatchObserver>(&mut self, outcome: Outcome, observer: &O) {
        self.state = match outcome {
            Outcome::Resolved => State::Resolved,
            Outcome::Rejected => State::Rejected,
        };
        if let Some(started) = self.started {
            self.stats.elapsed = started.elapsed();
        }
        observer.on_settled(outcome, &self.stats);
    }
}

/// Worker future tagged with the draw-order index of its item.
#[pin_project]
struct Indexed<F> {
    index: usize,
    #[pin]
    future: F,
}

impl<F: Future> Future for Indexed<F> {
    type Output = (usize, F::Output);

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        this.future.poll(cx).map(|output| (*this.index, output))
    }
}

/// Future returned by [`Dispatcher::dispatch`].
///
/// Every poll first collects finished work, then launches as many items as
/// the concurrency cap and the timing limits allow. When a timing limit is
/// what blocks the next launch, a single timer is armed for the longest
/// residual wait; nothing else is launched until it fires.
///
/// On the first worker failure no further item is drawn, the timer is
/// released and the future resolves to that failure. Futures still in
/// flight are never polled again and are dropped with the `Dispatch`.
#[pin_project]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Dispatch<I, W, O = TracingObserver>
where
    I: Iterator,
    W: Worker<I::Item>,
{
    source: WorkSource<I>,
    worker: W,
    limits: Limits,
    observer: O,
    history: LaunchHistory,
    #[pin]
    running: FuturesUnordered<Indexed<W::Future>>,
    #[pin]
    timer: Option<Sleep>,
    slots: ResultSlots<W::Output>,
    progress: Progress,
}

impl<I, W, O> Dispatch<I, W, O>
where
    I: Iterator,
    W: Worker<I::Item>,
{
    /// Worker futures currently outstanding.
    pub fn in_flight(&self) -> usize {
        self.running.len()
    }

    /// Whether the launch timer is armed.
    pub fn is_waiting(&self) -> bool {
        self.timer.is_some()
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.progress.stats
    }
}

impl<I, W, O> Future for Dispatch<I, W, O>
where
    I: Iterator,
    W: Worker<I::Item>,
    O: DispatchObserver,
{
    type Output = Result<Vec<W::Output>, DispatchError<W::Error>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();
        assert!(
            this.progress.state == State::Running,
            "Dispatch must not be polled after it returned `Poll::Ready`"
        );
        this.progress.started.get_or_insert_with(Instant::now);

        loop {
            // Finished work first, so freed capacity is visible below.
            while let Poll::Ready(Some((index, result))) = this.running.as_mut().poll_next(cx) {
                match result {
                    Ok(value) => {
                        this.slots.fill(index, value);
                        this.progress.stats.completed += 1;
                        this.observer.on_complete(index, this.running.len());
                    }
                    Err(source) => {
                        this.timer.set(None);
                        this.observer.on_failure(index);
                        this.progress.settle(Outcome::Rejected, &*this.observer);
                        return Poll::Ready(Err(DispatchError::Worker { index, source }));
                    }
                }
            }

            let mut launched = false;
            while this.timer.is_none()
                && this.running.len() < this.limits.max_in_flight()
                && this.source.has_more()
            {
                let now = Instant::now();
                if let Some((delay, constraint)) = this.limits.wait_time(now, this.history) {
                    this.timer.set(Some(sleep_until(now + delay)));
                    this.progress.stats.waits += 1;
                    this.observer.on_wait(delay, constraint);
                    break;
                }

                let item = match this.source.take() {
                    Ok(item) => item,
                    Err(exhausted) => {
                        this.progress.settle(Outcome::Rejected, &*this.observer);
                        return Poll::Ready(Err(exhausted.into()));
                    }
                };
                let index = this.slots.open();
                this.history.record(now);
                this.progress.stats.launched += 1;

                match this.worker.launch(item) {
                    Ok(future) => {
                        this.running.push(Indexed { index, future });
                        let in_flight = this.running.len();
                        let stats = &mut this.progress.stats;
                        stats.peak_in_flight = stats.peak_in_flight.max(in_flight);
                        this.observer.on_launch(index, in_flight);
                        launched = true;
                    }
                    Err(source) => {
                        this.timer.set(None);
                        this.observer.on_failure(index);
                        this.progress.settle(Outcome::Rejected, &*this.observer);
                        return Poll::Ready(Err(DispatchError::Worker { index, source }));
                    }
                }
            }

            let fired = match this.timer.as_mut().as_pin_mut() {
                Some(timer) => timer.poll(cx).is_ready(),
                None => false,
            };
            if fired {
                this.timer.set(None);
                continue;
            }

            if this.running.is_empty() && !this.source.has_more() {
                this.progress.settle(Outcome::Resolved, &*this.observer);
                let slots = std::mem::take(this.slots);
                return Poll::Ready(Ok(slots.into_ordered()));
            }

            // Newly pushed futures have not been polled yet and hold no waker.
            if !launched {
                return Poll::Pending;
            }
        }
    }
}
