//! WebSocket listener and per-connection delivery.
//!
//! Every accepted connection gets one task that owns both halves of the
//! socket: it writes whatever the connection's [`ClientSession`] yields and
//! reads client frames only to notice close or failure. Nothing here holds
//! the hub lock while touching a socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_tungstenite::{WebSocketStream, accept_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::config::Settings;
use crate::hub::Hub;
use crate::session::{ClientSession, SlowConsumerPolicy};
use crate::transport::message::ServerMessage;
use crate::utils::error::{BridgeError, Result};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-connection settings handed to every session the listener creates.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub queue_capacity: usize,
    pub policy: SlowConsumerPolicy,
    /// How long shutdown waits for sessions to drain before aborting them.
    pub shutdown_grace: Duration,
}

impl From<&Settings> for SessionOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            queue_capacity: settings.session.queue_capacity,
            policy: settings.slow_consumer_policy(),
            shutdown_grace: settings.shutdown_grace(),
        }
    }
}

pub async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| BridgeError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Accepts connections until `shutdown` is cancelled, then closes every
/// session and gives them `options.shutdown_grace` to drain.
pub async fn serve(
    listener: TcpListener,
    hub: Arc<Hub>,
    options: SessionOptions,
    shutdown: CancellationToken,
) {
    if let Ok(addr) = listener.local_addr() {
        info!("WebSocket server listening on ws://{}", addr);
    }

    let mut sessions = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    sessions.spawn(handle_connection(
                        stream,
                        peer,
                        hub.clone(),
                        options,
                        shutdown.clone(),
                    ));
                }
                Err(e) => warn!(error = %e, "failed to accept connection"),
            },
            Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                if let Err(e) = joined {
                    warn!(error = %e, "session task failed");
                }
            }
        }
    }

    drop(listener);
    hub.close_all();

    let drained = timeout(options.shutdown_grace, async {
        while sessions.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        warn!(
            remaining = sessions.len(),
            "shutdown grace period elapsed, aborting sessions"
        );
        sessions.abort_all();
        hub.abort_all();
        while sessions.join_next().await.is_some() {}
    }
    info!("WebSocket server stopped");
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    hub: Arc<Hub>,
    options: SessionOptions,
    shutdown: CancellationToken,
) {
    let session = Arc::new(ClientSession::new(options.queue_capacity, options.policy));

    let handshake = tokio::select! {
        _ = shutdown.cancelled() => return,
        res = timeout(HANDSHAKE_TIMEOUT, accept_async(stream)) => res,
    };
    let ws_stream = match handshake {
        Ok(Ok(ws)) => ws,
        Ok(Err(e)) => {
            warn!(%peer, error = %e, "WebSocket handshake error");
            return;
        }
        Err(_) => {
            warn!(%peer, "WebSocket handshake timed out");
            return;
        }
    };

    session.open();
    let session_id = hub.register(session.clone());
    // Shutdown may have swept the hub before this session was registered.
    if shutdown.is_cancelled() {
        session.close();
    }
    info!(session = %session_id, %peer, "client connected");

    match deliver(ws_stream, &session).await {
        Ok(()) => info!(session = %session_id, "client disconnected"),
        Err(e) => warn!(session = %session_id, error = %e, "closing session"),
    }

    session.abort();
    hub.unregister(&session_id);
}

/// Pumps the session queue into the socket until either side ends.
async fn deliver(ws_stream: WebSocketStream<TcpStream>, session: &ClientSession) -> Result<()> {
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let io_error = |source| BridgeError::SessionIo {
        session: session.id().clone(),
        source,
    };

    loop {
        tokio::select! {
            next = session.next() => match next {
                Some(message) => {
                    let frame = match ServerMessage::from(message.as_ref()).to_frame() {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!(session = %session.id(), topic = %message.topic, error = %e, "failed to encode message");
                            continue;
                        }
                    };
                    ws_sender.send(frame).await.map_err(io_error)?;
                }
                None => {
                    // Closing: best effort, the peer may already be gone.
                    let _ = ws_sender.send(WsMessage::Close(None)).await;
                    let _ = ws_sender.close().await;
                    return Ok(());
                }
            },
            incoming = ws_receiver.next() => match incoming {
                None | Some(Ok(WsMessage::Close(_))) => return Ok(()),
                Some(Ok(frame)) => {
                    debug!(session = %session.id(), len = frame.len(), "ignoring client frame");
                }
                Some(Err(e)) => return Err(io_error(e)),
            }
        }
    }
}
