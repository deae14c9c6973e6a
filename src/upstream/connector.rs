//! Seams between the reconnect loop and a concrete broker client.

use std::future::Future;

use crate::hub::message::Message;
use crate::hub::topic::SubscriptionSet;
use crate::utils::error::Result;

/// Opens connections to the upstream broker.
pub trait Connector: Send + Sync + 'static {
    type Conn: Connection;

    /// Connects and completes the broker handshake, or fails with
    /// [`BridgeError::Connect`](crate::utils::error::BridgeError::Connect).
    fn connect(&self) -> impl Future<Output = Result<Self::Conn>> + Send;

    /// Address used in logs.
    fn address(&self) -> String;
}

/// One established broker connection.
pub trait Connection: Send + 'static {
    /// Registers every topic of `topics`, failing with
    /// [`BridgeError::Subscribe`](crate::utils::error::BridgeError::Subscribe)
    /// on the first rejected one or when the broker does not acknowledge in time.
    fn subscribe(&mut self, topics: &SubscriptionSet) -> impl Future<Output = Result<()>> + Send;

    /// Waits for the next published message. An error means the
    /// connection is gone and must be replaced.
    fn next_message(&mut self) -> impl Future<Output = Result<Message>> + Send;
}
