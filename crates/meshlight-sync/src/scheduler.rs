//! Fixed-period timer driven by the caller's clock
//!
//! There is no jitter compensation and no catch-up: if the loop is late by
//! several periods the timer fires once and then waits for the next tick of
//! the grid set at start.

use embassy_time::{Duration, Instant};

/// Broadcast period of the reference configuration
pub const DEFAULT_BROADCAST_INTERVAL: Duration = Duration::from_millis(2000);

/// Status report period of the reference configuration
pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_secs(30);

/// Periodic trigger on a fixed tick grid
#[derive(Debug, Clone)]
pub struct Periodic {
    /// Distance between ticks
    period: Duration,
    /// Next tick, `None` until started
    next_due: Option<Instant>,
}

impl Periodic {
    /// Create a stopped timer
    pub const fn new(period: Duration) -> Self {
        Self {
            period,
            next_due: None,
        }
    }

    /// Start the grid at `now`; the first tick fires immediately
    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now);
    }

    /// Start the grid at `now`; the first tick fires one period later
    pub fn start_delayed(&mut self, now: Instant) {
        self.next_due = Some(now + self.period);
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_started(&self) -> bool {
        self.next_due.is_some()
    }

    /// Next tick, if started
    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    /// Check the timer. Returns `true` at most once per call when a tick is
    /// due, and moves to the first grid tick after `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(due) = self.next_due else {
            return false;
        };
        if now < due {
            return false;
        }

        let period = self.period.as_ticks().max(1);
        let missed = (now - due).as_ticks() / period;
        self.next_due = Some(due + Duration::from_ticks((missed + 1) * period));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn stopped_timer_never_fires() {
        let mut timer = Periodic::new(Duration::from_millis(100));
        assert!(!timer.poll(at(0)));
        assert!(!timer.poll(at(10_000)));
    }

    #[test]
    fn fires_immediately_then_every_period() {
        let mut timer = Periodic::new(DEFAULT_BROADCAST_INTERVAL);
        timer.start(at(1_000));

        assert!(timer.poll(at(1_000)));
        assert!(!timer.poll(at(1_000)));
        assert!(!timer.poll(at(2_999)));
        assert!(timer.poll(at(3_000)));
        assert!(timer.poll(at(5_010)));
        assert_eq!(timer.next_due(), Some(at(7_000)));
    }

    #[test]
    fn delayed_start_waits_one_period() {
        let mut timer = Periodic::new(DEFAULT_STATUS_INTERVAL);
        timer.start_delayed(at(0));

        assert!(!timer.poll(at(29_999)));
        assert!(timer.poll(at(30_000)));
    }

    #[test]
    fn missed_ticks_are_not_replayed() {
        let mut timer = Periodic::new(Duration::from_millis(2_000));
        timer.start(at(0));
        assert!(timer.poll(at(0)));

        // Loop stalls for three and a half periods
        assert!(timer.poll(at(7_000)));
        assert!(!timer.poll(at(7_500)));
        assert_eq!(timer.next_due(), Some(at(8_000)));
        assert!(timer.poll(at(8_000)));
    }
}
