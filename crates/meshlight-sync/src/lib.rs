#![no_std]

//! Color synchronization protocol for a mesh of LED nodes
//!
//! One node runs as the [`Role::Producer`]: it walks a hue wheel, renders
//! every step on its own ring and broadcasts it. Every other node runs as a
//! [`Role::Consumer`]: it applies the latest color it hears and watches for
//! the stream going quiet.
//!
//! Architecture layers:
//! - `color` - Color types and 8-bit helpers
//! - `generator` - Deterministic hue sequence (producer)
//! - `codec` - Wire frames and validation
//! - `scheduler` - Fixed-period timers
//! - `reception` - Inbound frame handling
//! - `watchdog` - Staleness detection (consumer)
//! - `diagnostics` - Counters and status reports
//! - `transport` - Mesh and LED collaborator traits
//! - `node` - Role state machine that owns everything above
//!
//! The node never reads the clock itself: every operation takes `now`, so the
//! embedding loop decides what time it is.

#[macro_use]
mod fmt;

pub mod codec;
pub mod color;
pub mod diagnostics;
pub mod generator;
pub mod node;
pub mod reception;
pub mod scheduler;
pub mod transport;
pub mod watchdog;

// Color exports
pub use color::{Hsv, Rgb};

// Codec exports
pub use codec::{DecodeError, EncodeError, Frame, MAX_FRAME_SIZE, Malformed, Message, MessageKind};

// Node exports
pub use node::{Node, NodeConfig, Role, RoleParseError};

// Component exports
pub use diagnostics::{Counters, StatusReport};
pub use generator::HueSequence;
pub use reception::{Reception, ReceptionContext, ReceptionHandler};
pub use scheduler::Periodic;
pub use transport::{LedDriver, MeshTransport, NodeId, PixelRing, TransportEvent};
pub use watchdog::{FreshnessClock, StalenessWatchdog, WatchdogState, WatchdogTransition};
