//! The `error` module defines the error taxonomy of the bridge.
//!
//! None of these errors is fatal once the bridge is running: upstream errors
//! feed the reconnect loop and session errors only close the session they
//! belong to. `Bind` and `Config` can only surface during startup.

use thiserror::Error;

use crate::session::SessionId;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The broker was unreachable, refused the handshake or did not answer in time.
    #[error("failed to connect to broker at {addr}: {reason}")]
    Connect { addr: String, reason: String },

    /// The broker rejected a topic registration or never acknowledged it.
    #[error("subscription to topic '{topic}' failed: {reason}")]
    Subscribe { topic: String, reason: String },

    /// An established upstream connection failed.
    #[error("upstream connection lost: {0}")]
    ConnectionLost(String),

    #[error("session {session} disconnected as a slow consumer after {drops} consecutive drops")]
    SlowConsumerDisconnect { session: SessionId, drops: u32 },

    #[error("write to session {session} failed: {source}")]
    SessionIo {
        session: SessionId,
        #[source]
        source: tungstenite::Error,
    },

    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
