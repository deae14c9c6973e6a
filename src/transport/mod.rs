//! The `transport` module handles the downstream side of the bridge: the
//! WebSocket listener, the handshake, and the task that pushes each
//! session's queue to its connection as JSON envelopes.

pub mod message;
pub mod websocket;

pub use message::ServerMessage;
pub use websocket::{SessionOptions, bind, serve};
