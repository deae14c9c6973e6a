//! Upstream reconnect loop.
//!
//! ```text
//! DISCONNECTED ─► CONNECTING ─(connect + subscribe)─► CONNECTED
//!                     ▲                                   │
//!                     │                               (error)
//!                     │                                   ▼
//!                     └──────(backoff elapsed)──── RECONNECTING
//! ```
//!
//! Any state moves to SHUTDOWN once the shutdown token is cancelled,
//! including while a backoff sleep is pending.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::hub::message::Message;
use crate::hub::topic::SubscriptionSet;
use crate::upstream::backoff::BackoffPolicy;
use crate::upstream::connector::{Connection, Connector};
use crate::upstream::state::ConnectionState;
use crate::utils::error::Result;

/// Keeps a subscription to the broker alive and feeds every message it
/// receives into a sink.
pub struct Subscriber<C: Connector> {
    connector: C,
    topics: SubscriptionSet,
    backoff: BackoffPolicy,
    state: watch::Sender<ConnectionState>,
}

impl<C: Connector> Subscriber<C> {
    pub fn new(connector: C, topics: SubscriptionSet, backoff: BackoffPolicy) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            connector,
            topics,
            backoff,
            state,
        }
    }

    /// Health signal: follows every state transition.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn topics(&self) -> &SubscriptionSet {
        &self.topics
    }

    /// Runs until `shutdown` is cancelled, handing each message to `sink`.
    ///
    /// Connection and subscription failures never end the loop; they are
    /// logged and retried after a backoff delay.
    pub async fn run<F>(self, mut sink: F, shutdown: CancellationToken)
    where
        F: FnMut(Message) + Send,
    {
        let addr = self.connector.address();
        let mut attempt: u32 = 0;

        'run: loop {
            self.set_state(ConnectionState::Connecting);

            let established = tokio::select! {
                _ = shutdown.cancelled() => break 'run,
                res = self.establish() => res,
            };

            match established {
                Ok(mut conn) => {
                    attempt = 0;
                    self.set_state(ConnectionState::Connected);
                    info!(%addr, topics = ?self.topics, "subscribed to upstream broker");

                    loop {
                        let next = tokio::select! {
                            _ = shutdown.cancelled() => break 'run,
                            res = conn.next_message() => res,
                        };
                        match next {
                            Ok(message) => {
                                debug!(
                                    topic = %message.topic,
                                    payload = %message.payload_text(),
                                    "upstream message received"
                                );
                                sink(message);
                            }
                            Err(e) => {
                                warn!(%addr, error = %e, "upstream connection lost");
                                break;
                            }
                        }
                    }
                }
                Err(e) => warn!(%addr, attempt, error = %e, "upstream connect failed"),
            }

            let delay = self.backoff.next(attempt);
            self.set_state(ConnectionState::Reconnecting { attempt });
            info!(%addr, attempt, ?delay, "reconnecting to upstream broker");
            attempt = attempt.saturating_add(1);

            tokio::select! {
                _ = shutdown.cancelled() => break 'run,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.set_state(ConnectionState::Shutdown);
        info!(%addr, "upstream subscriber stopped");
    }

    async fn establish(&self) -> Result<C::Conn> {
        let mut conn = self.connector.connect().await?;
        conn.subscribe(&self.topics).await?;
        Ok(conn)
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "upstream state changed");
        }
    }
}
