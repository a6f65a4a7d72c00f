//! Dispatch options

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constraint::{Limits, RateWindow};
use crate::error::ConfigError;

/// Limits applied to a dispatch. Every field is optional; the default is
/// an unconstrained concurrent map.
///
/// Durations are carried in milliseconds so options can be loaded from any
/// serde format:
///
/// ```rust
/// use futures_ratemap::Options;
///
/// let options: Options = serde_json::from_str(
///     r#"{ "max_in_flight": 4, "requests_per_duration": 10, "duration_ms": 3000 }"#,
/// ).unwrap();
/// let built = Options::new()
///     .max_in_flight(4)
///     .rate(10, std::time::Duration::from_secs(3));
/// assert_eq!(options, built);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Max concurrently outstanding worker calls. `0` means unlimited.
    pub max_in_flight: usize,

    /// Max launches within any `duration_ms`. `0` disables the window.
    pub requests_per_duration: usize,

    /// Length of the rate window in milliseconds.
    pub duration_ms: u64,

    /// Minimum gap between two consecutive launches in milliseconds.
    /// `0` disables spacing.
    pub min_spacing_ms: u64,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// At most `requests` launches within any `duration`.
    pub fn rate(mut self, requests: usize, duration: Duration) -> Self {
        self.requests_per_duration = requests;
        self.duration_ms = millis(duration);
        self
    }

    pub fn min_spacing(mut self, gap: Duration) -> Self {
        self.min_spacing_ms = millis(gap);
        self
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn spacing(&self) -> Duration {
        Duration::from_millis(self.min_spacing_ms)
    }

    /// Check the options and normalize unset fields to "unlimited".
    ///
    /// A window needs both a request count and a positive duration. A
    /// duration without a request count is ignored.
    pub fn validate(&self) -> Result<Limits, ConfigError> {
        let window = match (self.requests_per_duration, self.duration_ms) {
            (0, _) => None,
            (requests, 0) => return Err(ConfigError::RateWithoutDuration { requests }),
            (count, ms) => Some(RateWindow {
                count,
                duration: Duration::from_millis(ms),
            }),
        };
        let min_spacing = (self.min_spacing_ms > 0).then(|| self.spacing());
        Ok(Limits::new(self.max_in_flight, window, min_spacing))
    }
}

/// Whole milliseconds, rounded up so a positive duration never becomes zero.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unlimited() {
        let limits = Options::default().validate().unwrap();
        assert_eq!(limits, Limits::unlimited());
        assert_eq!(limits.max_in_flight(), usize::MAX);
        assert_eq!(limits.window(), None);
        assert_eq!(limits.min_spacing(), None);
    }

    #[test]
    fn test_rate_without_duration() {
        let options = Options {
            requests_per_duration: 3,
            ..Default::default()
        };
        assert_eq!(
            options.validate(),
            Err(ConfigError::RateWithoutDuration { requests: 3 })
        );
    }

    #[test]
    fn test_duration_without_rate_is_ignored() {
        let options = Options {
            duration_ms: 500,
            ..Default::default()
        };
        assert_eq!(options.validate().unwrap().window(), None);
    }

    #[test]
    fn test_builder() {
        let options = Options::new()
            .max_in_flight(2)
            .rate(5, Duration::from_secs(1))
            .min_spacing(Duration::from_millis(100));
        assert_eq!(options.duration(), Duration::from_secs(1));

        let limits = options.validate().unwrap();
        assert_eq!(limits.max_in_flight(), 2);
        assert_eq!(
            limits.window(),
            Some(RateWindow {
                count: 5,
                duration: Duration::from_secs(1)
            })
        );
        assert_eq!(limits.min_spacing(), Some(Duration::from_millis(100)));
        assert_eq!(limits.history_capacity(), 5);
    }

    #[test]
    fn test_sub_millisecond_durations_round_up() {
        let options = Options::new()
            .rate(2, Duration::from_micros(500))
            .min_spacing(Duration::from_micros(900));
        assert_eq!(options.duration(), Duration::from_millis(1));
        assert_eq!(options.spacing(), Duration::from_millis(1));

        let limits = options.validate().unwrap();
        assert_eq!(
            limits.window(),
            Some(RateWindow {
                count: 2,
                duration: Duration::from_millis(1)
            })
        );
        assert_eq!(limits.min_spacing(), Some(Duration::from_millis(1)));

        let options = Options::new().rate(3, Duration::from_micros(1500));
        assert_eq!(options.duration_ms, 2);
        assert_eq!(Options::new().min_spacing(Duration::ZERO).min_spacing_ms, 0);
    }

    #[test]
    fn test_deserialize_partial() {
        let options: Options = serde_json::from_str(r#"{ "min_spacing_ms": 250 }"#).unwrap();
        assert_eq!(options.max_in_flight, 0);
        assert_eq!(options.spacing(), Duration::from_millis(250));
        assert_eq!(options.duration(), Duration::ZERO);

        let json = serde_json::to_string(&options).unwrap();
        let back: Options = serde_json::from_str(&json).unwrap();
        assert_eq!(back, options);
    }

    #[test]
    fn test_deserialize_rejects_negative() {
        let result = serde_json::from_str::<Options>(r#"{ "max_in_flight": -1 }"#);
        assert!(result.is_err());
    }
}
