//! Infrastructure layer
//!
//! Hardware bindings for the protocol core: the LED ring, the ESP-NOW
//! transport and the task that drives the node.

pub(crate) mod config;
pub(crate) mod drivers;
pub(crate) mod tasks;
pub(crate) mod types;
