//! Per-connection delivery state.
//!
//! A [`ClientSession`] sits between the hub and one downstream connection.
//! The hub pushes into it synchronously through [`ClientSession::enqueue`];
//! the connection task pulls from it with [`ClientSession::next`]. The two
//! sides only meet inside a short critical section, never across I/O.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use uuid::Uuid;

use crate::hub::message::Message;
use crate::session::queue::DropOldestQueue;

pub type SessionId = String;

/// Default number of messages a session buffers before dropping.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Handshake in progress.
    Connecting,
    /// Draining the queue to the connection.
    Open,
    /// No new messages accepted; the queue drains then the session ends.
    Closing,
    /// Resources released.
    Closed,
}

/// What to do when `enqueue` finds the queue full.
///
/// Both variants evict the oldest queued message to make room. `Disconnect`
/// additionally gives up on the session once `after` consecutive enqueues
/// found it full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlowConsumerPolicy {
    #[default]
    DropOldest,
    Disconnect { after: u32 },
}

impl SlowConsumerPolicy {
    /// `0` disables disconnection.
    pub fn from_max_consecutive_drops(max: u32) -> Self {
        match max {
            0 => SlowConsumerPolicy::DropOldest,
            after => SlowConsumerPolicy::Disconnect { after },
        }
    }
}

/// Outcome of a single [`ClientSession::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    Queued,
    /// The queue was full and its oldest message was discarded.
    DroppedOldest { consecutive: u32 },
    /// The slow-consumer policy closed the session.
    Evicted { drops: u32 },
    /// The session no longer accepts messages.
    Closed,
}

#[derive(Debug)]
struct Inner {
    queue: DropOldestQueue<Arc<Message>>,
    state: SessionState,
    consecutive_drops: u32,
}

/// Represents one downstream connection in the bridge.
#[derive(Debug)]
pub struct ClientSession {
    id: SessionId,
    policy: SlowConsumerPolicy,
    inner: Mutex<Inner>,
    notify: Notify,
}

impl ClientSession {
    pub fn new(capacity: usize, policy: SlowConsumerPolicy) -> Self {
        Self::with_id(format!("session-{}", Uuid::new_v4()), capacity, policy)
    }

    pub fn with_id(id: impl Into<SessionId>, capacity: usize, policy: SlowConsumerPolicy) -> Self {
        Self {
            id: id.into(),
            policy,
            inner: Mutex::new(Inner {
                queue: DropOldestQueue::with_capacity(capacity),
                state: SessionState::Connecting,
                consecutive_drops: 0,
            }),
            notify: Notify::new(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn policy(&self) -> SlowConsumerPolicy {
        self.policy
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn capacity(&self) -> usize {
        self.lock().queue.capacity()
    }

    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Marks the handshake as complete.
    pub fn open(&self) {
        let mut inner = self.lock();
        if inner.state == SessionState::Connecting {
            inner.state = SessionState::Open;
        }
    }

    /// Queues `message` for delivery without ever blocking.
    pub fn enqueue(&self, message: Arc<Message>) -> Enqueue {
        let outcome = {
            let mut inner = self.lock();
            match inner.state {
                SessionState::Closing | SessionState::Closed => return Enqueue::Closed,
                SessionState::Connecting | SessionState::Open => {}
            }

            if inner.queue.is_full() {
                inner.consecutive_drops += 1;
                let drops = inner.consecutive_drops;
                match self.policy {
                    SlowConsumerPolicy::Disconnect { after } if drops >= after => {
                        inner.queue.clear();
                        inner.state = SessionState::Closed;
                        Enqueue::Evicted { drops }
                    }
                    _ => {
                        inner.queue.push(message);
                        Enqueue::DroppedOldest { consecutive: drops }
                    }
                }
            } else {
                inner.consecutive_drops = 0;
                inner.queue.push(message);
                Enqueue::Queued
            }
        };
        self.notify.notify_one();
        outcome
    }

    /// Waits for the next queued message.
    ///
    /// Returns `None` once the session is closed, or once it is closing and
    /// the queue has been drained. Cancel-safe: a message is only removed
    /// from the queue in the same poll that returns it.
    pub async fn next(&self) -> Option<Arc<Message>> {
        loop {
            {
                let mut inner = self.lock();
                if inner.state == SessionState::Closed {
                    return None;
                }
                if let Some(message) = inner.queue.pop() {
                    return Some(message);
                }
                if inner.state == SessionState::Closing {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Stops accepting messages; whatever is queued is still delivered.
    pub fn close(&self) {
        {
            let mut inner = self.lock();
            if inner.state == SessionState::Closed {
                return;
            }
            inner.state = SessionState::Closing;
        }
        self.notify.notify_one();
    }

    /// Drops queued messages and ends the session immediately.
    pub fn abort(&self) {
        {
            let mut inner = self.lock();
            inner.queue.clear();
            inner.state = SessionState::Closed;
        }
        self.notify.notify_one();
    }

    /// Snapshot of the queued messages, oldest first.
    pub fn pending(&self) -> Vec<Arc<Message>> {
        self.lock().queue.iter().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
