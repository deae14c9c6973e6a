//! The `session` module defines the representation of a downstream client.
//!
//! It provides the `ClientSession` struct, which owns the bounded outbound
//! queue of a single connection and applies the slow-consumer policy when
//! that queue overflows.

pub mod client_session;
pub mod queue;

pub use client_session::{
    ClientSession, DEFAULT_QUEUE_CAPACITY, Enqueue, SessionId, SessionState, SlowConsumerPolicy,
};

#[cfg(test)]
mod tests;
