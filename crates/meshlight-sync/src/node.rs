//! Node role state machine
//!
//! A [`Node`] owns every piece of protocol state for one mesh member. Its
//! role is fixed at construction and decides which components exist:
//! the producer carries a hue sequence and a broadcast schedule, the
//! consumer carries a staleness watchdog. Both handle inbound frames.

use core::fmt;
use core::str::FromStr;

use embassy_time::{Duration, Instant};

use crate::codec;
use crate::color::Rgb;
use crate::diagnostics::{Counters, StatusReport};
use crate::generator::{
    DEFAULT_BRIGHTNESS_CEILING, DEFAULT_HUE_STEP, DEFAULT_SATURATION, HueSequence,
};
use crate::reception::{Reception, ReceptionContext, ReceptionHandler};
use crate::scheduler::{DEFAULT_BROADCAST_INTERVAL, DEFAULT_STATUS_INTERVAL, Periodic};
use crate::transport::{LedDriver, MeshTransport, PixelRing, TransportEvent};
use crate::watchdog::{
    DEFAULT_STALENESS_THRESHOLD, FreshnessClock, StalenessWatchdog, WatchdogState,
    WatchdogTransition,
};

/// Part a node plays on the mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Generates and broadcasts colors
    Producer,
    /// Applies colors received from the producer
    Consumer,
}

impl Role {
    /// Numeric role code, as advertised by older firmware
    pub const fn code(self) -> u8 {
        match self {
            Role::Consumer => 0,
            Role::Producer => 1,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Role::Consumer),
            1 => Some(Role::Producer),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Producer => "producer",
            Role::Consumer => "consumer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleParseError;

impl fmt::Display for RoleParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role, expected producer or consumer")
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    /// Accepts `producer`/`master`/`1` and `consumer`/`client`/`0`, ignoring
    /// case and surrounding whitespace
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let is = |name: &str| s.eq_ignore_ascii_case(name);

        if is("producer") || is("master") || s == "1" {
            Ok(Role::Producer)
        } else if is("consumer") || is("client") || s == "0" {
            Ok(Role::Consumer)
        } else {
            Err(RoleParseError)
        }
    }
}

/// Node configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeConfig {
    pub role: Role,
    /// Time between producer broadcasts
    pub broadcast_interval: Duration,
    /// Silence after which a consumer is considered stale
    pub staleness_threshold: Duration,
    /// Time between status reports
    pub status_interval: Duration,
    /// Hue advance per broadcast
    pub hue_step: u8,
    pub saturation: u8,
    /// HSV value used for generated colors
    pub brightness_ceiling: u8,
}

impl NodeConfig {
    pub const fn new(role: Role) -> Self {
        Self {
            role,
            broadcast_interval: DEFAULT_BROADCAST_INTERVAL,
            staleness_threshold: DEFAULT_STALENESS_THRESHOLD,
            status_interval: DEFAULT_STATUS_INTERVAL,
            hue_step: DEFAULT_HUE_STEP,
            saturation: DEFAULT_SATURATION,
            brightness_ceiling: DEFAULT_BRIGHTNESS_CEILING,
        }
    }

    #[must_use]
    pub const fn with_broadcast_interval(mut self, interval: Duration) -> Self {
        self.broadcast_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_staleness_threshold(mut self, threshold: Duration) -> Self {
        self.staleness_threshold = threshold;
        self
    }

    #[must_use]
    pub const fn with_status_interval(mut self, interval: Duration) -> Self {
        self.status_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_hue_step(mut self, step: u8) -> Self {
        self.hue_step = step;
        self
    }

    #[must_use]
    pub const fn with_saturation(mut self, saturation: u8) -> Self {
        self.saturation = saturation;
        self
    }

    #[must_use]
    pub const fn with_brightness_ceiling(mut self, value: u8) -> Self {
        self.brightness_ceiling = value;
        self
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::new(Role::Consumer)
    }
}

enum RoleState {
    Producer {
        generator: HueSequence,
        schedule: Periodic,
    },
    Consumer {
        watchdog: StalenessWatchdog,
    },
}

/// One mesh member
///
/// The embedding loop feeds transport activity through
/// [`handle_event`](Self::handle_event) and calls [`poll`](Self::poll)
/// regularly. Neither blocks.
pub struct Node<T: MeshTransport, D: LedDriver<N>, const N: usize> {
    role: Role,
    transport: T,
    display: PixelRing<D, N>,
    state: RoleState,
    reception: ReceptionHandler,
    clock: FreshnessClock,
    counters: Counters,
    status_timer: Periodic,
    started_at: Instant,
}

impl<T: MeshTransport, D: LedDriver<N>, const N: usize> Node<T, D, N> {
    /// Build a node and start its timers at `now`
    ///
    /// A producer broadcasts on its first poll; the first status report is
    /// due one status interval after start.
    pub fn new(config: NodeConfig, transport: T, display: PixelRing<D, N>, now: Instant) -> Self {
        let state = match config.role {
            Role::Producer => {
                let mut schedule = Periodic::new(config.broadcast_interval);
                schedule.start(now);
                RoleState::Producer {
                    generator: HueSequence::new(
                        config.hue_step,
                        config.saturation,
                        config.brightness_ceiling,
                    ),
                    schedule,
                }
            }
            Role::Consumer => RoleState::Consumer {
                watchdog: StalenessWatchdog::new(config.staleness_threshold),
            },
        };

        let mut status_timer = Periodic::new(config.status_interval);
        status_timer.start_delayed(now);

        info!(
            "node: starting as {} (id {})",
            config.role,
            transport.node_id()
        );

        Self {
            role: config.role,
            transport,
            display,
            state,
            reception: ReceptionHandler::new(),
            clock: FreshnessClock::never(),
            counters: Counters::new(),
            status_timer,
            started_at: now,
        }
    }

    /// Dispatch one transport event
    ///
    /// Returns the reception outcome for inbound frames.
    pub fn handle_event(&mut self, event: TransportEvent<'_>, now: Instant) -> Option<Reception> {
        match event {
            TransportEvent::Received { from, frame } => {
                trace!("mesh: {} bytes from {}", frame.len(), from);
                let outcome = self.receive(frame, now);
                Some(outcome)
            }
            TransportEvent::NewConnection(id) => {
                // The node list does not include this node
                info!(
                    "mesh: new connection {}, {} nodes in mesh",
                    id,
                    self.transport.peer_count() + 1
                );
                None
            }
            TransportEvent::ConnectionsChanged => {
                info!(
                    "mesh: connections changed, {} peers",
                    self.transport.peer_count()
                );
                None
            }
            TransportEvent::TimeAdjusted(offset_us) => {
                debug!("mesh: time adjusted by {} us", offset_us);
                None
            }
        }
    }

    fn receive(&mut self, frame: &[u8], now: Instant) -> Reception {
        let mut ctx = ReceptionContext {
            display: &mut self.display,
            counters: &mut self.counters,
            clock: &mut self.clock,
        };
        let outcome = self.reception.handle(frame, now, &mut ctx);

        if let (Reception::Applied(_), RoleState::Consumer { watchdog }) =
            (outcome, &mut self.state)
        {
            if let Some(transition) = watchdog.on_update() {
                log_transition(transition);
            }
        }
        outcome
    }

    /// Run time-driven work: the broadcast schedule on the producer, the
    /// staleness check on the consumer, and the status report on both
    pub fn poll(&mut self, now: Instant) {
        match &mut self.state {
            RoleState::Producer {
                generator,
                schedule,
            } => {
                if schedule.poll(now) {
                    let color = generator.next();
                    self.display.show(color);
                    broadcast(&mut self.transport, &mut self.counters, color);
                }
            }
            RoleState::Consumer { watchdog } => {
                if let Some(transition) = watchdog.poll(now, &self.clock) {
                    log_transition(transition);
                }
            }
        }

        if self.status_timer.poll(now) {
            info!("{}", self.status(now));
        }
    }

    /// Snapshot of the node's health at `now`
    pub fn status(&self, now: Instant) -> StatusReport {
        StatusReport {
            role: self.role,
            node_id: self.transport.node_id(),
            uptime: now
                .checked_duration_since(self.started_at)
                .unwrap_or(Duration::from_ticks(0)),
            peers: self.transport.peer_count(),
            counters: self.counters,
            color: self.display.color(),
            watchdog: self.watchdog_state(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Color currently shown on the ring
    pub fn current_color(&self) -> Rgb {
        self.display.color()
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Staleness state, `None` on the producer
    pub fn watchdog_state(&self) -> Option<WatchdogState> {
        match &self.state {
            RoleState::Producer { .. } => None,
            RoleState::Consumer { watchdog } => Some(watchdog.state()),
        }
    }

    /// Last time a valid color update was applied
    pub fn last_update(&self) -> Option<Instant> {
        self.clock.last_update()
    }

    /// Current hue, `None` on the consumer
    pub fn hue(&self) -> Option<u8> {
        match &self.state {
            RoleState::Producer { generator, .. } => Some(generator.hue()),
            RoleState::Consumer { .. } => None,
        }
    }

    /// Frames dropped as malformed or of an unsupported kind
    pub fn dropped(&self) -> (u32, u32) {
        (self.reception.rejected(), self.reception.ignored())
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn display(&self) -> &PixelRing<D, N> {
        &self.display
    }
}

fn broadcast<T: MeshTransport>(transport: &mut T, counters: &mut Counters, color: Rgb) {
    let frame = match codec::encode_color(color) {
        Ok(frame) => frame,
        Err(e) => {
            error!("producer: failed to encode color: {}", e);
            return;
        }
    };

    match transport.broadcast(&frame) {
        Ok(()) => {
            counters.record_sent();
            trace!(
                "producer: sent rgb({}, {}, {})",
                color.r, color.g, color.b
            );
        }
        Err(e) => {
            warn!("producer: broadcast failed: {:?}", e);
        }
    }
}

fn log_transition(transition: WatchdogTransition) {
    match transition {
        WatchdogTransition::Synchronized => {
            info!("watchdog: first color update received");
        }
        WatchdogTransition::Stale { elapsed } => {
            warn!(
                "watchdog: no color update for {} ms, display may be out of sync",
                elapsed.as_millis()
            );
        }
        WatchdogTransition::Recovered => {
            info!("watchdog: color updates resumed");
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::*;
    use crate::codec::Message;
    use crate::color::BLACK;
    use crate::transport::NodeId;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Vec<Vec<u8>>,
        peers: usize,
        fail: bool,
    }

    impl MeshTransport for RecordingTransport {
        type Error = ();

        fn broadcast(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
            if self.fail {
                return Err(());
            }
            self.sent.push(frame.to_vec());
            Ok(())
        }

        fn node_id(&self) -> NodeId {
            7
        }

        fn peer_count(&self) -> usize {
            self.peers
        }
    }

    struct NullDriver;

    impl<const N: usize> LedDriver<N> for NullDriver {
        fn write(&mut self, _colors: &[Rgb; N]) {}
    }

    type TestNode = Node<RecordingTransport, NullDriver, 4>;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn node(role: Role) -> TestNode {
        Node::new(
            NodeConfig::new(role),
            RecordingTransport::default(),
            PixelRing::new(NullDriver),
            at(0),
        )
    }

    fn color_frame(r: u8, g: u8, b: u8) -> Vec<u8> {
        codec::encode_color(Rgb { r, g, b }).unwrap().to_vec()
    }

    #[test]
    fn role_codes() {
        assert_eq!(Role::from_code(0), Some(Role::Consumer));
        assert_eq!(Role::from_code(1), Some(Role::Producer));
        assert_eq!(Role::from_code(2), None);
        assert_eq!(Role::Producer.code(), 1);
        assert_eq!(Role::Consumer.code(), 0);
    }

    #[test]
    fn role_parsing() {
        assert_eq!("producer".parse(), Ok(Role::Producer));
        assert_eq!("MASTER".parse(), Ok(Role::Producer));
        assert_eq!(" client ".parse(), Ok(Role::Consumer));
        assert_eq!("0".parse(), Ok(Role::Consumer));
        assert_eq!("relay".parse::<Role>(), Err(RoleParseError));
    }

    #[test]
    fn config_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.role, Role::Consumer);
        assert_eq!(config.broadcast_interval, Duration::from_millis(2000));
        assert_eq!(config.staleness_threshold, Duration::from_millis(5000));
        assert_eq!(config.status_interval, Duration::from_secs(30));
        assert_eq!(config.hue_step, 5);
        assert_eq!(config.saturation, 255);
        assert_eq!(config.brightness_ceiling, 200);
    }

    #[test]
    fn producer_broadcasts_on_first_poll() {
        let mut node = node(Role::Producer);
        node.poll(at(0));

        let sent = &node.transport().sent;
        assert_eq!(sent.len(), 1);
        let Message::ColorUpdate(color) = codec::decode(&sent[0]).unwrap();
        assert_eq!(color, node.current_color());
        assert_eq!(node.hue(), Some(5));
        assert_eq!(node.counters().sent(), 1);
    }

    #[test]
    fn producer_follows_broadcast_interval() {
        let mut node = node(Role::Producer);
        for ms in (0..=6_000).step_by(100) {
            node.poll(at(ms));
        }

        // 0, 2000, 4000, 6000
        assert_eq!(node.transport().sent.len(), 4);
        assert_eq!(node.counters().sent(), 4);
        assert_eq!(node.hue(), Some(20));
    }

    #[test]
    fn failed_broadcast_is_not_counted() {
        let mut node = node(Role::Producer);
        node.transport_mut().fail = true;
        node.poll(at(0));

        assert_eq!(node.counters().sent(), 0);
        // Still shown locally
        assert_ne!(node.current_color(), BLACK);
    }

    #[test]
    fn consumer_never_broadcasts() {
        let mut node = node(Role::Consumer);
        for ms in (0..=10_000).step_by(500) {
            node.poll(at(ms));
        }

        assert!(node.transport().sent.is_empty());
        assert_eq!(node.hue(), None);
        assert_eq!(node.watchdog_state(), Some(WatchdogState::Dormant));
    }

    #[test]
    fn consumer_applies_received_color() {
        let mut node = node(Role::Consumer);
        let frame = color_frame(200, 23, 0);
        let outcome = node.handle_event(
            TransportEvent::Received {
                from: 1,
                frame: &frame,
            },
            at(1_000),
        );

        let color = Rgb { r: 200, g: 23, b: 0 };
        assert_eq!(outcome, Some(Reception::Applied(color)));
        assert_eq!(node.current_color(), color);
        assert_eq!(node.last_update(), Some(at(1_000)));
        assert_eq!(node.watchdog_state(), Some(WatchdogState::Nominal));
    }

    #[test]
    fn consumer_degrades_and_recovers() {
        let mut node = node(Role::Consumer);
        let frame = color_frame(1, 2, 3);
        let received = TransportEvent::Received {
            from: 1,
            frame: &frame,
        };

        node.handle_event(received, at(0));
        node.poll(at(5_000));
        assert_eq!(node.watchdog_state(), Some(WatchdogState::Nominal));

        node.poll(at(5_001));
        assert_eq!(node.watchdog_state(), Some(WatchdogState::Degraded));
        // Display untouched while stale
        assert_eq!(node.current_color(), Rgb { r: 1, g: 2, b: 3 });

        node.handle_event(received, at(6_000));
        assert_eq!(node.watchdog_state(), Some(WatchdogState::Nominal));
    }

    #[test]
    fn connectivity_events_have_no_outcome() {
        let mut node = node(Role::Consumer);
        node.transport_mut().peers = 2;

        assert_eq!(node.handle_event(TransportEvent::NewConnection(9), at(0)), None);
        assert_eq!(node.handle_event(TransportEvent::ConnectionsChanged, at(0)), None);
        assert_eq!(node.handle_event(TransportEvent::TimeAdjusted(-120), at(0)), None);
        assert_eq!(node.counters().received(), 0);
    }

    #[test]
    fn status_reflects_node() {
        let mut node = node(Role::Consumer);
        node.transport_mut().peers = 3;
        let frame = color_frame(9, 8, 7);
        node.handle_event(
            TransportEvent::Received {
                from: 1,
                frame: &frame,
            },
            at(100),
        );
        node.handle_event(
            TransportEvent::Received {
                from: 1,
                frame: b"garbage",
            },
            at(200),
        );

        let status = node.status(at(45_000));
        assert_eq!(status.role, Role::Consumer);
        assert_eq!(status.node_id, 7);
        assert_eq!(status.uptime, Duration::from_secs(45));
        assert_eq!(status.peers, 3);
        assert_eq!(status.counters.received(), 2);
        assert_eq!(status.counters.sent(), 0);
        assert_eq!(status.color, Rgb { r: 9, g: 8, b: 7 });
        assert_eq!(status.watchdog, Some(WatchdogState::Nominal));
        assert_eq!(node.dropped(), (1, 0));
    }
}
