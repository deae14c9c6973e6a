//! The `bridge` module wires the upstream subscriber, the hub and the
//! WebSocket listener together and owns their startup and shutdown.

pub mod controller;

pub use controller::{Bridge, BridgeHandle};
