//! Bridge controller
//!
//! Owns the lifecycle of one running bridge: the listener, the upstream
//! subscriber and the hub that joins them. Nothing here is process-global;
//! several bridges can run side by side (the tests do).

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Settings;
use crate::hub::Hub;
use crate::transport::{self, SessionOptions};
use crate::upstream::{ConnectionState, Connector, Subscriber};
use crate::utils::error::{BridgeError, Result};

pub struct Bridge {
    settings: Settings,
    hub: Arc<Hub>,
}

impl Bridge {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            hub: Arc::new(Hub::new()),
        }
    }

    pub fn hub(&self) -> Arc<Hub> {
        self.hub.clone()
    }

    /// Binds the configured listen address and starts the bridge.
    pub async fn start<C: Connector>(self, connector: C) -> Result<BridgeHandle> {
        let listener = transport::bind(&self.settings.listen_addr()).await?;
        self.start_with_listener(connector, listener)
    }

    /// Starts the subscriber and the accept loop on an already bound listener.
    pub fn start_with_listener<C: Connector>(
        self,
        connector: C,
        listener: TcpListener,
    ) -> Result<BridgeHandle> {
        let local_addr = listener
            .local_addr()
            .map_err(|source| BridgeError::Bind {
                addr: self.settings.listen_addr(),
                source,
            })?;
        let shutdown = CancellationToken::new();

        let subscriber = Subscriber::new(
            connector,
            self.settings.upstream.topics.clone(),
            self.settings.backoff_policy(),
        );
        let health = subscriber.state();

        let hub = self.hub.clone();
        let subscriber_task = tokio::spawn(subscriber.run(
            move |message| {
                hub.broadcast(Arc::new(message));
            },
            shutdown.clone(),
        ));

        let server_task = tokio::spawn(transport::serve(
            listener,
            self.hub.clone(),
            SessionOptions::from(&self.settings),
            shutdown.clone(),
        ));

        info!(%local_addr, "bridge started");
        Ok(BridgeHandle {
            local_addr,
            hub: self.hub,
            health,
            shutdown,
            subscriber_task,
            server_task,
        })
    }

    /// Runs the bridge until `signal` completes, then shuts it down.
    pub async fn run_until<C, F>(self, connector: C, signal: F) -> Result<()>
    where
        C: Connector,
        F: Future<Output = ()>,
    {
        let handle = self.start(connector).await?;
        signal.await;
        info!("shutdown signal received");
        handle.shutdown().await;
        Ok(())
    }
}

/// A running bridge.
pub struct BridgeHandle {
    local_addr: SocketAddr,
    hub: Arc<Hub>,
    health: watch::Receiver<ConnectionState>,
    shutdown: CancellationToken,
    subscriber_task: JoinHandle<()>,
    server_task: JoinHandle<()>,
}

impl BridgeHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Upstream connection state.
    pub fn health(&self) -> watch::Receiver<ConnectionState> {
        self.health.clone()
    }

    /// Stops accepting connections, stops the subscriber and waits for
    /// sessions to drain within the configured grace period.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.subscriber_task.await {
            warn!(error = %e, "subscriber task failed");
        }
        if let Err(e) = self.server_task.await {
            warn!(error = %e, "server task failed");
        }
        info!("bridge stopped");
    }
}
