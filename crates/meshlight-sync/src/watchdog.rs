//! Staleness watchdog for consumer nodes
//!
//! State machine:
//!
//! ```text
//! Dormant --first update--> Nominal --quiet > threshold--> Degraded
//!                              ^                              |
//!                              +---------any update-----------+
//! ```
//!
//! A node that has never heard from the producer is not stale, only not yet
//! synchronized, so the watchdog stays dormant until the first update.

use embassy_time::{Duration, Instant};

/// Staleness threshold of the reference configuration
pub const DEFAULT_STALENESS_THRESHOLD: Duration = Duration::from_millis(5000);

/// Local time of the last applied color update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FreshnessClock {
    last_update: Option<Instant>,
}

impl FreshnessClock {
    /// A clock that has never been reset
    pub const fn never() -> Self {
        Self { last_update: None }
    }

    /// Record an applied update
    pub fn reset(&mut self, now: Instant) {
        self.last_update = Some(now);
    }

    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    /// Time since the last update, `None` if there never was one
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.last_update
            .map(|last| now.checked_duration_since(last).unwrap_or(Duration::from_ticks(0)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    /// No update applied yet
    Dormant,
    /// Updates are arriving within the threshold
    Nominal,
    /// No update for longer than the threshold
    Degraded,
}

impl WatchdogState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dormant => "dormant",
            Self::Nominal => "nominal",
            Self::Degraded => "degraded",
        }
    }
}

/// Edge reported by [`StalenessWatchdog::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogTransition {
    /// First update heard
    Synchronized,
    /// Stream went quiet for longer than the threshold
    Stale { elapsed: Duration },
    /// Updates resumed after being stale
    Recovered,
}

#[derive(Debug, Clone)]
pub struct StalenessWatchdog {
    threshold: Duration,
    state: WatchdogState,
}

impl Default for StalenessWatchdog {
    fn default() -> Self {
        Self::new(DEFAULT_STALENESS_THRESHOLD)
    }
}

impl StalenessWatchdog {
    pub const fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            state: WatchdogState::Dormant,
        }
    }

    pub fn state(&self) -> WatchdogState {
        self.state
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Note an applied update; takes effect immediately without waiting for
    /// the next poll
    pub fn on_update(&mut self) -> Option<WatchdogTransition> {
        let transition = match self.state {
            WatchdogState::Dormant => Some(WatchdogTransition::Synchronized),
            WatchdogState::Degraded => Some(WatchdogTransition::Recovered),
            WatchdogState::Nominal => None,
        };
        self.state = WatchdogState::Nominal;
        transition
    }

    /// Re-evaluate against the freshness clock
    ///
    /// Stale means strictly more than `threshold` since the last update.
    pub fn poll(&mut self, now: Instant, clock: &FreshnessClock) -> Option<WatchdogTransition> {
        let elapsed = clock.elapsed(now)?;
        let stale = elapsed > self.threshold;

        let (next, transition) = match (self.state, stale) {
            (WatchdogState::Dormant, false) => {
                (WatchdogState::Nominal, Some(WatchdogTransition::Synchronized))
            }
            (WatchdogState::Dormant | WatchdogState::Nominal, true) => {
                (WatchdogState::Degraded, Some(WatchdogTransition::Stale { elapsed }))
            }
            (WatchdogState::Degraded, false) => {
                (WatchdogState::Nominal, Some(WatchdogTransition::Recovered))
            }
            (state, _) => (state, None),
        };

        self.state = next;
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn fresh_consumer_stays_dormant() {
        let mut watchdog = StalenessWatchdog::default();
        let clock = FreshnessClock::never();

        assert_eq!(watchdog.poll(at(0), &clock), None);
        assert_eq!(watchdog.poll(at(3_600_000), &clock), None);
        assert_eq!(watchdog.state(), WatchdogState::Dormant);
    }

    #[test]
    fn first_update_synchronizes() {
        let mut watchdog = StalenessWatchdog::default();
        let mut clock = FreshnessClock::never();
        clock.reset(at(100));

        assert_eq!(
            watchdog.poll(at(100), &clock),
            Some(WatchdogTransition::Synchronized)
        );
        assert_eq!(watchdog.state(), WatchdogState::Nominal);
    }

    #[test]
    fn threshold_boundary_is_exclusive() {
        let mut watchdog = StalenessWatchdog::default();
        let mut clock = FreshnessClock::never();
        clock.reset(at(0));
        watchdog.poll(at(0), &clock);

        assert_eq!(watchdog.poll(at(5_000), &clock), None);
        assert_eq!(watchdog.state(), WatchdogState::Nominal);

        assert_eq!(
            watchdog.poll(at(5_001), &clock),
            Some(WatchdogTransition::Stale {
                elapsed: Duration::from_millis(5_001)
            })
        );
        assert_eq!(watchdog.state(), WatchdogState::Degraded);
    }

    #[test]
    fn update_notification_switches_state_at_once() {
        let mut watchdog = StalenessWatchdog::default();
        assert_eq!(watchdog.on_update(), Some(WatchdogTransition::Synchronized));
        assert_eq!(watchdog.on_update(), None);

        let mut clock = FreshnessClock::never();
        clock.reset(at(0));
        watchdog.poll(at(5_001), &clock);
        assert_eq!(watchdog.state(), WatchdogState::Degraded);

        assert_eq!(watchdog.on_update(), Some(WatchdogTransition::Recovered));
        assert_eq!(watchdog.state(), WatchdogState::Nominal);
    }

    #[test]
    fn degraded_is_reported_once() {
        let mut watchdog = StalenessWatchdog::default();
        let mut clock = FreshnessClock::never();
        clock.reset(at(0));
        watchdog.poll(at(0), &clock);

        assert!(watchdog.poll(at(6_000), &clock).is_some());
        assert_eq!(watchdog.poll(at(7_000), &clock), None);
        assert_eq!(watchdog.poll(at(60_000), &clock), None);
        assert_eq!(watchdog.state(), WatchdogState::Degraded);
    }

    #[test]
    fn fresh_update_recovers_and_never_returns_to_dormant() {
        let mut watchdog = StalenessWatchdog::default();
        let mut clock = FreshnessClock::never();
        clock.reset(at(0));
        watchdog.poll(at(0), &clock);
        watchdog.poll(at(9_000), &clock);

        clock.reset(at(9_500));
        assert_eq!(
            watchdog.poll(at(9_500), &clock),
            Some(WatchdogTransition::Recovered)
        );
        assert_eq!(watchdog.state(), WatchdogState::Nominal);

        assert_eq!(watchdog.poll(at(14_500), &clock), None);
        assert_ne!(watchdog.state(), WatchdogState::Dormant);
    }
}
