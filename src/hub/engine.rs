//! Hub engine
//!
//! The hub is the single registry of live downstream sessions and the only
//! place messages fan out from. Its API is synchronous: every critical
//! section is a map insert, remove or clone, and no lock is ever held while
//! a session is being written to.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::hub::message::Message;
use crate::session::{ClientSession, Enqueue, SessionId};
use crate::utils::error::BridgeError;

/// Per-broadcast delivery counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Sessions the message was queued on without loss.
    pub delivered: usize,
    /// Sessions that had to discard their oldest message to take this one.
    pub dropped_oldest: usize,
    /// Sessions removed because they were closed or evicted.
    pub removed: usize,
}

/// Fans every upstream message out to all registered sessions.
#[derive(Debug, Default)]
pub struct Hub {
    sessions: Mutex<HashMap<SessionId, Arc<ClientSession>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Adds a session to the registry and returns its id.
    pub fn register(&self, session: Arc<ClientSession>) -> SessionId {
        let id = session.id().clone();
        self.lock().insert(id.clone(), session);
        debug!(session = %id, "registered session");
        id
    }

    /// Removes a session. Removing an unknown id is a no-op.
    pub fn unregister(&self, session_id: &SessionId) {
        if self.lock().remove(session_id).is_some() {
            debug!(session = %session_id, "unregistered session");
        }
    }

    pub fn session(&self, session_id: &SessionId) -> Option<Arc<ClientSession>> {
        self.lock().get(session_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Queues `message` on every session registered at the time of the call.
    ///
    /// A full queue only affects its own session: the slow-consumer policy
    /// runs for that session and delivery to the others continues.
    pub fn broadcast(&self, message: Arc<Message>) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut to_remove = Vec::new();

        for session in self.snapshot() {
            match session.enqueue(Arc::clone(&message)) {
                Enqueue::Queued => report.delivered += 1,
                Enqueue::DroppedOldest { consecutive } => {
                    report.dropped_oldest += 1;
                    debug!(
                        session = %session.id(),
                        topic = %message.topic,
                        consecutive,
                        "session queue full, dropped oldest message"
                    );
                }
                Enqueue::Evicted { drops } => {
                    let err = BridgeError::SlowConsumerDisconnect {
                        session: session.id().clone(),
                        drops,
                    };
                    warn!(session = %session.id(), topic = %message.topic, "{err}");
                    to_remove.push(session.id().clone());
                }
                Enqueue::Closed => to_remove.push(session.id().clone()),
            }
        }

        if !to_remove.is_empty() {
            let mut sessions = self.lock();
            for id in &to_remove {
                if sessions.remove(id).is_some() {
                    report.removed += 1;
                }
            }
        }

        debug!(
            topic = %message.topic,
            delivered = report.delivered,
            dropped_oldest = report.dropped_oldest,
            removed = report.removed,
            "broadcast message"
        );
        report
    }

    /// Asks every session to drain what it has queued and finish.
    pub fn close_all(&self) {
        for session in self.snapshot() {
            session.close();
        }
    }

    /// Aborts and forgets every session.
    pub fn abort_all(&self) {
        let sessions: Vec<_> = self.lock().drain().map(|(_, s)| s).collect();
        for session in sessions {
            session.abort();
        }
    }

    fn snapshot(&self) -> Vec<Arc<ClientSession>> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, Arc<ClientSession>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
