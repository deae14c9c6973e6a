use std::fmt;

/// Connection state of the upstream subscriber, published as the bridge's
/// health signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Waiting out the backoff before reconnect attempt `attempt`.
    Reconnecting { attempt: u32 },
    Shutdown,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => f.write_str("DISCONNECTED"),
            ConnectionState::Connecting => f.write_str("CONNECTING"),
            ConnectionState::Connected => f.write_str("CONNECTED"),
            ConnectionState::Reconnecting { .. } => f.write_str("RECONNECTING"),
            ConnectionState::Shutdown => f.write_str("SHUTDOWN"),
        }
    }
}
