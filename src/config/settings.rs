use serde::Deserialize;

use crate::hub::topic::SubscriptionSet;
use crate::session::DEFAULT_QUEUE_CAPACITY;

/// 1 MiB; camera snapshots in `Camera_status` run well past rumqttc's 10 KiB default.
pub const DEFAULT_MAX_PACKET_SIZE: usize = 1024 * 1024;

/// Top-level configuration settings for the bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server: ServerSettings,
    pub upstream: UpstreamSettings,
    pub backoff: BackoffSettings,
    pub session: SessionSettings,
}

/// The downstream WebSocket listener.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// The MQTT broker and the topics relayed from it.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive_secs: u64,
    pub connect_timeout_secs: u64,
    /// Largest MQTT packet accepted from or sent to the broker, in bytes.
    pub max_packet_size: usize,
    pub topics: SubscriptionSet,
}

/// Reconnect schedule: exponential from `base_ms`, capped at `max_ms`, with full jitter.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffSettings {
    pub base_ms: u64,
    pub max_ms: u64,
}

/// Per-session queueing and shutdown behaviour.
///
/// `max_consecutive_drops = 0` keeps slow sessions connected and only drops
/// their oldest messages; any other value disconnects a session after that
/// many consecutive full-queue events.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub queue_capacity: usize,
    pub max_consecutive_drops: u32,
    pub shutdown_grace_secs: u64,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values are filled from
/// [`Settings::default`].
#[derive(Debug, Default, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub upstream: Option<PartialUpstreamSettings>,
    pub backoff: Option<PartialBackoffSettings>,
    pub session: Option<PartialSessionSettings>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialUpstreamSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub client_id: Option<String>,
    pub keep_alive_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub max_packet_size: Option<usize>,
    pub topics: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialBackoffSettings {
    pub base_ms: Option<u64>,
    pub max_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialSessionSettings {
    pub queue_capacity: Option<usize>,
    pub max_consecutive_drops: Option<u32>,
    pub shutdown_grace_secs: Option<u64>,
}

impl PartialSettings {
    /// Fills every missing value from `default`.
    pub fn merge(self, default: Settings) -> Settings {
        let server = self.server.unwrap_or_default();
        let upstream = self.upstream.unwrap_or_default();
        let backoff = self.backoff.unwrap_or_default();
        let session = self.session.unwrap_or_default();

        Settings {
            server: ServerSettings {
                host: server.host.unwrap_or(default.server.host),
                port: server.port.unwrap_or(default.server.port),
            },
            upstream: UpstreamSettings {
                host: upstream.host.unwrap_or(default.upstream.host),
                port: upstream.port.unwrap_or(default.upstream.port),
                client_id: upstream.client_id.unwrap_or(default.upstream.client_id),
                keep_alive_secs: upstream
                    .keep_alive_secs
                    .unwrap_or(default.upstream.keep_alive_secs),
                connect_timeout_secs: upstream
                    .connect_timeout_secs
                    .unwrap_or(default.upstream.connect_timeout_secs),
                max_packet_size: upstream
                    .max_packet_size
                    .unwrap_or(default.upstream.max_packet_size),
                topics: upstream
                    .topics
                    .map(SubscriptionSet::from)
                    .unwrap_or(default.upstream.topics),
            },
            backoff: BackoffSettings {
                base_ms: backoff.base_ms.unwrap_or(default.backoff.base_ms),
                max_ms: backoff.max_ms.unwrap_or(default.backoff.max_ms),
            },
            session: SessionSettings {
                queue_capacity: session
                    .queue_capacity
                    .unwrap_or(default.session.queue_capacity),
                max_consecutive_drops: session
                    .max_consecutive_drops
                    .unwrap_or(default.session.max_consecutive_drops),
                shutdown_grace_secs: session
                    .shutdown_grace_secs
                    .unwrap_or(default.session.shutdown_grace_secs),
            },
        }
    }
}

/// Provides default values for `Settings`.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            upstream: UpstreamSettings {
                host: "localhost".to_string(),
                port: 1883,
                client_id: "statusbridge".to_string(),
                keep_alive_secs: 30,
                connect_timeout_secs: 10,
                max_packet_size: DEFAULT_MAX_PACKET_SIZE,
                topics: SubscriptionSet::default(),
            },
            backoff: BackoffSettings {
                base_ms: 1_000,
                max_ms: 30_000,
            },
            session: SessionSettings {
                queue_capacity: DEFAULT_QUEUE_CAPACITY,
                max_consecutive_drops: 0,
                shutdown_grace_secs: 5,
            },
        }
    }
}
