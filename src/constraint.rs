//! Timing constraints evaluated before every launch.

use std::time::Duration;

use tokio::time::Instant;

use crate::history::LaunchHistory;

/// Extra time added to a wait so the next decision lands strictly past the
/// window edge instead of on it.
pub const EDGE_NUDGE: Duration = Duration::from_millis(1);

/// The constraint that decided a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// Sliding window: at most `count` launches per `window`.
    Window,
    /// Minimum gap since the previous launch.
    Spacing,
}

impl Constraint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Constraint::Window => "window",
            Constraint::Spacing => "spacing",
        }
    }
}

/// How long to hold off so that no more than `count` launches fall inside
/// any `window`.
///
/// Zero when fewer than `count` launches are on record or when the
/// `count`-th most recent one is already at least `window` old.
pub fn residual_wait(
    now: Instant,
    history: &LaunchHistory,
    count: usize,
    window: Duration,
) -> Duration {
    let Some(anchor) = history.nth_back(count) else {
        return Duration::ZERO;
    };
    let elapsed = now.saturating_duration_since(anchor);
    if elapsed >= window {
        Duration::ZERO
    } else {
        window - elapsed + EDGE_NUDGE
    }
}

/// At most `count` launches within any `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub count: usize,
    pub duration: Duration,
}

/// Validated limits, produced by [`Options::validate`](crate::Options::validate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    max_in_flight: usize,
    window: Option<RateWindow>,
    min_spacing: Option<Duration>,
}

impl Limits {
    pub(crate) fn new(
        max_in_flight: usize,
        window: Option<RateWindow>,
        min_spacing: Option<Duration>,
    ) -> Self {
        Self {
            max_in_flight: if max_in_flight == 0 { usize::MAX } else { max_in_flight },
            window,
            min_spacing,
        }
    }

    /// No limit of any kind.
    pub fn unlimited() -> Self {
        Self::new(0, None, None)
    }

    /// `usize::MAX` when unlimited.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    pub fn window(&self) -> Option<RateWindow> {
        self.window
    }

    pub fn min_spacing(&self) -> Option<Duration> {
        self.min_spacing
    }

    /// Same limits with a different concurrency cap (`0` = unlimited).
    pub fn with_max_in_flight(self, max_in_flight: usize) -> Self {
        Self::new(max_in_flight, self.window, self.min_spacing)
    }

    /// How many launch times must be kept to evaluate these limits.
    pub fn history_capacity(&self) -> usize {
        self.window.map(|w| w.count).unwrap_or(0).max(1)
    }

    pub fn new_history(&self) -> LaunchHistory {
        LaunchHistory::new(self.history_capacity())
    }

    /// The longest wait demanded by any active timing constraint, and which
    /// constraint demands it. `None` means a launch is allowed right now.
    pub fn wait_time(
        &self,
        now: Instant,
        history: &LaunchHistory,
    ) -> Option<(Duration, Constraint)> {
        let window = self
            .window
            .map(|w| residual_wait(now, history, w.count, w.duration))
            .unwrap_or(Duration::ZERO);
        let spacing = self
            .min_spacing
            .map(|gap| residual_wait(now, history, 1, gap))
            .unwrap_or(Duration::ZERO);

        if window.is_zero() && spacing.is_zero() {
            None
        } else if window >= spacing {
            Some((window, Constraint::Window))
        } else {
            Some((spacing, Constraint::Spacing))
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::unlimited()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn history_at(base: Instant, capacity: usize, offsets: &[u64]) -> LaunchHistory {
        let mut history = LaunchHistory::new(capacity);
        for offset in offsets {
            history.record(base + ms(*offset));
        }
        history
    }

    #[test]
    fn test_residual_wait_not_enough_launches() {
        let base = Instant::now();
        let history = history_at(base, 3, &[0, 10]);
        assert_eq!(residual_wait(base + ms(20), &history, 3, ms(1000)), Duration::ZERO);
    }

    #[test]
    fn test_residual_wait_blocked() {
        let base = Instant::now();
        let history = history_at(base, 2, &[0, 100]);
        // Oldest of the last two launches is 400ms old.
        assert_eq!(residual_wait(base + ms(400), &history, 2, ms(1000)), ms(601));
    }

    #[test]
    fn test_residual_wait_at_edge() {
        let base = Instant::now();
        let history = history_at(base, 1, &[0]);
        assert_eq!(residual_wait(base + ms(1000), &history, 1, ms(1000)), Duration::ZERO);
        assert_eq!(residual_wait(base + ms(999), &history, 1, ms(1000)), ms(2));
    }

    #[test]
    fn test_unlimited() {
        let limits = Limits::unlimited();
        let base = Instant::now();
        let history = history_at(base, limits.history_capacity(), &[0]);
        assert_eq!(limits.max_in_flight(), usize::MAX);
        assert_eq!(limits.history_capacity(), 1);
        assert_eq!(limits.wait_time(base, &history), None);
    }

    #[test]
    fn test_governing_constraint_is_the_longest() {
        let limits = Limits::new(
            0,
            Some(RateWindow {
                count: 2,
                duration: ms(1000),
            }),
            Some(ms(100)),
        );
        let base = Instant::now();
        let history = history_at(base, limits.history_capacity(), &[0, 50]);

        // Spacing wants 51ms, window wants 901ms.
        assert_eq!(
            limits.wait_time(base + ms(100), &history),
            Some((ms(901), Constraint::Window))
        );

        let history = history_at(base, limits.history_capacity(), &[0]);
        assert_eq!(
            limits.wait_time(base + ms(30), &history),
            Some((ms(71), Constraint::Spacing))
        );
    }

    #[test]
    fn test_with_max_in_flight_keeps_timing() {
        let limits = Limits::new(
            2,
            Some(RateWindow {
                count: 3,
                duration: ms(500),
            }),
            Some(ms(40)),
        );

        let single = limits.with_max_in_flight(1);
        assert_eq!(single.max_in_flight(), 1);
        assert_eq!(single.window(), limits.window());
        assert_eq!(single.min_spacing(), limits.min_spacing());
        assert_eq!(single.history_capacity(), 3);

        assert_eq!(limits.with_max_in_flight(0).max_in_flight(), usize::MAX);
        assert_eq!(Limits::unlimited().with_max_in_flight(4).window(), None);
    }

    proptest! {
        /// Launching greedily whenever the limits allow never puts more than
        /// `count` launches inside any window, and always respects spacing.
        #[test]
        fn prop_greedy_launches_respect_limits(
            count in 1usize..6,
            window_ms in 1u64..500,
            spacing_ms in 0u64..200,
            attempts in prop::collection::vec(0u64..300, 1..40),
        ) {
            let spacing = if spacing_ms == 0 { None } else { Some(ms(spacing_ms)) };
            let window = RateWindow { count, duration: ms(window_ms) };
            let limits = Limits::new(0, Some(window), spacing);
            let base = Instant::now();
            let mut history = limits.new_history();
            let mut launches: Vec<u64> = Vec::new();
            let mut now = 0u64;

            for gap in attempts {
                now += gap;
                while let Some((wait, _)) = limits.wait_time(base + ms(now), &history) {
                    now += wait.as_millis() as u64;
                }
                history.record(base + ms(now));
                launches.push(now);
            }

            for (i, start) in launches.iter().enumerate() {
                let inside = launches[i..].iter().filter(|t| **t - start < window_ms).count();
                prop_assert!(inside <= count);
            }
            for pair in launches.windows(2) {
                prop_assert!(pair[1] - pair[0] >= spacing_ms);
            }
        }
    }
}
