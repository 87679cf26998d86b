//! Inbound frame handling
//!
//! Every frame that reaches the node is counted first and validated second.
//! Only a fully valid color update touches the display and the freshness
//! clock; anything else is dropped without side effects beyond the counter.

use embassy_time::Instant;

use crate::codec::{self, DecodeError, Malformed, Message};
use crate::color::Rgb;
use crate::diagnostics::Counters;
use crate::transport::{LedDriver, PixelRing};
use crate::watchdog::FreshnessClock;

/// Outcome of handling a single frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reception {
    /// Color was shown and the freshness clock reset
    Applied(Rgb),
    /// Frame failed validation and was dropped
    Rejected(Malformed),
    /// Frame is well-formed but of a kind this node does not handle
    Ignored(u32),
}

/// State the handler mutates while applying a frame
pub struct ReceptionContext<'a, D: LedDriver<N>, const N: usize> {
    pub display: &'a mut PixelRing<D, N>,
    pub counters: &'a mut Counters,
    pub clock: &'a mut FreshnessClock,
}

/// Validates inbound frames and applies color updates
#[derive(Debug, Clone, Default)]
pub struct ReceptionHandler {
    rejected: u32,
    ignored: u32,
}

impl ReceptionHandler {
    pub const fn new() -> Self {
        Self {
            rejected: 0,
            ignored: 0,
        }
    }

    /// Handle a frame that arrived at `now`
    pub fn handle<D: LedDriver<N>, const N: usize>(
        &mut self,
        frame: &[u8],
        now: Instant,
        ctx: &mut ReceptionContext<'_, D, N>,
    ) -> Reception {
        ctx.counters.record_received();

        match codec::decode(frame) {
            Ok(Message::ColorUpdate(color)) => {
                ctx.display.show(color);
                ctx.clock.reset(now);
                trace!(
                    "reception: applied rgb({}, {}, {})",
                    color.r, color.g, color.b
                );
                Reception::Applied(color)
            }
            Err(DecodeError::Malformed(reason)) => {
                self.rejected = self.rejected.saturating_add(1);
                debug!("reception: dropped frame ({} bytes): {}", frame.len(), reason);
                Reception::Rejected(reason)
            }
            Err(DecodeError::UnsupportedKind(kind)) => {
                self.ignored = self.ignored.saturating_add(1);
                trace!("reception: ignoring message type {}", kind);
                Reception::Ignored(kind)
            }
        }
    }

    /// Frames dropped as malformed
    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    /// Frames skipped for an unsupported kind
    pub fn ignored(&self) -> u32 {
        self.ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::BLACK;

    #[derive(Default)]
    struct CountingDriver {
        writes: usize,
    }

    impl<const N: usize> LedDriver<N> for CountingDriver {
        fn write(&mut self, _colors: &[Rgb; N]) {
            self.writes += 1;
        }
    }

    struct Fixture {
        display: PixelRing<CountingDriver, 8>,
        counters: Counters,
        clock: FreshnessClock,
        handler: ReceptionHandler,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                display: PixelRing::new(CountingDriver::default()),
                counters: Counters::new(),
                clock: FreshnessClock::never(),
                handler: ReceptionHandler::new(),
            }
        }

        fn handle(&mut self, frame: &[u8], ms: u64) -> Reception {
            let mut ctx = ReceptionContext {
                display: &mut self.display,
                counters: &mut self.counters,
                clock: &mut self.clock,
            };
            self.handler.handle(frame, Instant::from_millis(ms), &mut ctx)
        }
    }

    #[test]
    fn valid_update_is_applied() {
        let mut fx = Fixture::new();
        let outcome = fx.handle(br#"{"type":1,"r":10,"g":20,"b":30}"#, 1_000);

        let color = Rgb { r: 10, g: 20, b: 30 };
        assert_eq!(outcome, Reception::Applied(color));
        assert_eq!(fx.display.color(), color);
        assert_eq!(fx.display.driver().writes, 1);
        assert_eq!(fx.clock.last_update(), Some(Instant::from_millis(1_000)));
        assert_eq!(fx.counters.received(), 1);
    }

    #[test]
    fn malformed_frame_only_counts() {
        let mut fx = Fixture::new();
        let outcome = fx.handle(br#"{"type":1,"r":300,"g":0,"b":0}"#, 1_000);

        assert_eq!(outcome, Reception::Rejected(Malformed::ChannelOutOfRange));
        assert_eq!(fx.display.color(), BLACK);
        assert_eq!(fx.display.driver().writes, 0);
        assert_eq!(fx.clock.last_update(), None);
        assert_eq!(fx.counters.received(), 1);
        assert_eq!(fx.handler.rejected(), 1);
    }

    #[test]
    fn unsupported_kind_only_counts() {
        let mut fx = Fixture::new();
        let outcome = fx.handle(br#"{"type":2}"#, 1_000);

        assert_eq!(outcome, Reception::Ignored(2));
        assert_eq!(fx.display.driver().writes, 0);
        assert_eq!(fx.clock.last_update(), None);
        assert_eq!(fx.counters.received(), 1);
        assert_eq!(fx.handler.ignored(), 1);
    }

    #[test]
    fn bad_frame_keeps_previous_color_and_clock() {
        let mut fx = Fixture::new();
        fx.handle(br#"{"type":1,"r":1,"g":2,"b":3}"#, 500);
        fx.handle(br#"{"type":1,"r":9,"g":9"#, 900);

        assert_eq!(fx.display.color(), Rgb { r: 1, g: 2, b: 3 });
        assert_eq!(fx.clock.last_update(), Some(Instant::from_millis(500)));
        assert_eq!(fx.counters.received(), 2);
    }
}
