//! Rate-limited, order-preserving async map.
//!
//! This crate pushes a sequence of work items through an async worker while
//! enforcing three limits at the same time:
//!
//! * a maximum number of worker futures outstanding at once,
//! * a sliding window: no more than R launches within any D-long period,
//! * a minimum spacing between two consecutive launches.
//!
//! Any of them can be the one holding back the next launch at any moment.
//! Rather than racing a timer per limit, the dispatcher computes how long
//! each timing limit still wants it to wait, picks the longest, and arms a
//! single timer for it. Completions and the timer are the only things that
//! wake it up again.
//!
//! Items are drawn lazily, so the source can be a plain count (`0..n`), a
//! `Vec`, or an endless iterator. Results are handed back in the order the
//! items were drawn, even though later items may finish first. The first
//! worker failure stops all further launches and becomes the result.
//!
//! Everything runs on the task that polls the returned future: there is no
//! spawning and no locking. The only runtime dependency is the timer, which
//! is a `tokio` sleep.
//!
//! ```rust
//! use std::convert::Infallible;
//! use std::time::Duration;
//! use futures_ratemap::{dispatch, Options, WorkSource};
//!
//! // At most 3 calls in flight, 10 calls per second, 20ms between calls.
//! let options = Options::new()
//!     .max_in_flight(3)
//!     .rate(10, Duration::from_secs(1))
//!     .min_spacing(Duration::from_millis(20));
//!
//! let squares = tokio_test::block_on(dispatch(
//!     WorkSource::range(5),
//!     options,
//!     |i: usize| async move { Ok::<_, Infallible>(i * i) },
//! ));
//! assert_eq!(squares.unwrap(), vec![0, 1, 4, 9, 16]);
//! ```
pub mod constraint;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod observer;
pub mod options;
pub mod sequential;
pub mod slots;
pub mod source;
pub mod worker;

pub use constraint::{residual_wait, Constraint, Limits, RateWindow};
pub use dispatch::{dispatch, Dispatch, Dispatcher};
pub use error::{ConfigError, DispatchError, SourceExhausted};
pub use history::LaunchHistory;
pub use observer::{DispatchObserver, DispatchStats, Outcome, TracingObserver};
pub use options::Options;
pub use sequential::{map_concurrent, map_sequential, rate_limit_map, reduce_sequential};
pub use slots::ResultSlots;
pub use source::{Counter, WorkSource};
pub use worker::{fallible, Fallible, Worker};
