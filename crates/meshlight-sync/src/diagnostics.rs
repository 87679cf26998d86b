//! Diagnostic counters and periodic status reports

use core::fmt;

use embassy_time::Duration;

use crate::color::Rgb;
use crate::node::Role;
use crate::transport::NodeId;
use crate::watchdog::WatchdogState;

/// Frame counters
///
/// Both counters only ever go up. They saturate at `u32::MAX` instead of
/// wrapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    sent: u32,
    received: u32,
}

impl Counters {
    pub const fn new() -> Self {
        Self {
            sent: 0,
            received: 0,
        }
    }

    /// Count a frame handed to the transport
    pub fn record_sent(&mut self) {
        self.sent = self.sent.saturating_add(1);
    }

    /// Count an inbound frame, valid or not
    pub fn record_received(&mut self) {
        self.received = self.received.saturating_add(1);
    }

    pub fn sent(&self) -> u32 {
        self.sent
    }

    pub fn received(&self) -> u32 {
        self.received
    }
}

/// Snapshot of a node's health, rendered with [`fmt::Display`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub role: Role,
    pub node_id: NodeId,
    pub uptime: Duration,
    pub peers: usize,
    pub counters: Counters,
    pub color: Rgb,
    /// `None` on the producer, which has nothing to go stale
    pub watchdog: Option<WatchdogState>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.uptime.as_secs();
        writeln!(f, "=== node status ===")?;
        writeln!(f, "role: {}", self.role)?;
        writeln!(f, "node id: {}", self.node_id)?;
        writeln!(f, "uptime: {}h {:02}m {:02}s", secs / 3600, (secs / 60) % 60, secs % 60)?;
        writeln!(f, "peers: {}", self.peers)?;
        writeln!(f, "sent: {}", self.counters.sent())?;
        writeln!(f, "received: {}", self.counters.received())?;
        writeln!(
            f,
            "color: rgb({}, {}, {})",
            self.color.r, self.color.g, self.color.b
        )?;
        match self.watchdog {
            Some(state) => write!(f, "sync: {}", state.as_str()),
            None => write!(f, "sync: source"),
        }
    }
}
