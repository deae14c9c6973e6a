//! # statusbridge
//!
//! `statusbridge` relays messages from an MQTT broker to browser clients over
//! WebSockets. Each upstream message is pushed to every connected client as
//! a `{"topic": ..., "message": ...}` JSON envelope.
//!
//! ## Core Modules
//!
//! - `upstream`: the broker connection, its reconnect loop and health signal.
//! - `hub`: the session registry and message fan-out.
//! - `session`: per-client bounded queues and the slow-consumer policy.
//! - `transport`: the WebSocket listener and per-client delivery tasks.
//! - `bridge`: wires the pieces together and owns startup and shutdown.
//! - `config`: loads settings from files and environment variables.
//! - `utils`: error types, logging and signal handling.

pub mod bridge;
pub mod config;
pub mod hub;
pub mod session;
pub mod transport;
pub mod upstream;
pub mod utils;

pub use bridge::{Bridge, BridgeHandle};
pub use utils::error::{BridgeError, Result};
