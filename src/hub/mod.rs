//! The `hub` module is the fan-out core of the bridge.
//!
//! - `engine`: the session registry and broadcast.
//! - `message`: the message type relayed from upstream.
//! - `topic`: the fixed subscription set.

pub mod engine;
pub mod message;
pub mod topic;

pub use engine::{BroadcastReport, Hub};
pub use message::Message;
pub use topic::SubscriptionSet;
