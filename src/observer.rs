//! Hooks for watching scheduler decisions.

use std::time::Duration;

use tracing::{debug, trace};

use crate::constraint::Constraint;

/// Counters collected over one dispatch, reported when it settles.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub launched: usize,
    pub completed: usize,
    pub peak_in_flight: usize,
    /// How many times the launch timer was armed.
    pub waits: usize,
    pub elapsed: Duration,
}

/// How a dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Resolved,
    Rejected,
}

/// Receives every decision the dispatcher makes. All methods default to
/// doing nothing, and `()` is a silent observer.
pub trait DispatchObserver {
    /// Item `index` was handed to the worker; `in_flight` includes it.
    fn on_launch(&self, index: usize, in_flight: usize) {
        let _ = (index, in_flight);
    }

    /// The timer was armed for `delay` because of `constraint`.
    fn on_wait(&self, delay: Duration, constraint: Constraint) {
        let _ = (delay, constraint);
    }

    fn on_complete(&self, index: usize, in_flight: usize) {
        let _ = (index, in_flight);
    }

    /// Item `index` failed; nothing else will be launched.
    fn on_failure(&self, index: usize) {
        let _ = index;
    }

    fn on_settled(&self, outcome: Outcome, stats: &DispatchStats) {
        let _ = (outcome, stats);
    }
}

impl DispatchObserver for () {}

impl<O: DispatchObserver + ?Sized> DispatchObserver for &O {
    fn on_launch(&self, index: usize, in_flight: usize) {
        (**self).on_launch(index, in_flight)
    }

    fn on_wait(&self, delay: Duration, constraint: Constraint) {
        (**self).on_wait(delay, constraint)
    }

    fn on_complete(&self, index: usize, in_flight: usize) {
        (**self).on_complete(index, in_flight)
    }

    fn on_failure(&self, index: usize) {
        (**self).on_failure(index)
    }

    fn on_settled(&self, outcome: Outcome, stats: &DispatchStats) {
        (**self).on_settled(outcome, stats)
    }
}

/// Default observer: every decision becomes a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl DispatchObserver for TracingObserver {
    fn on_launch(&self, index: usize, in_flight: usize) {
        trace!(index, in_flight, "dispatch: launching item");
    }

    fn on_wait(&self, delay: Duration, constraint: Constraint) {
        debug!(?delay, constraint = constraint.as_str(), "dispatch: rate limited, arming timer");
    }

    fn on_complete(&self, index: usize, in_flight: usize) {
        trace!(index, in_flight, "dispatch: item completed");
    }

    fn on_failure(&self, index: usize) {
        debug!(index, "dispatch: worker failed, cancelling further launches");
    }

    fn on_settled(&self, outcome: Outcome, stats: &DispatchStats) {
        debug!(?outcome, ?stats, "dispatch: settled");
    }
}
