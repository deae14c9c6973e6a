//! The `upstream` module owns the connection to the MQTT broker.
//!
//! - `connector`: the `Connector`/`Connection` seam the reconnect loop is
//!   written against.
//! - `mqtt`: the `rumqttc` implementation of that seam.
//! - `subscriber`: the reconnect state machine.
//! - `backoff`: delay schedule between reconnect attempts.
//! - `state`: the health signal exposed to the controller.

pub mod backoff;
pub mod connector;
pub mod mqtt;
pub mod state;
pub mod subscriber;

pub use backoff::{BackoffPolicy, Jitter};
pub use connector::{Connection, Connector};
pub use mqtt::MqttConnector;
pub use state::ConnectionState;
pub use subscriber::Subscriber;

#[cfg(test)]
pub(crate) mod testing;
