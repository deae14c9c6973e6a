mod settings;

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};

use crate::session::SlowConsumerPolicy;
use crate::upstream::BackoffPolicy;
use settings::PartialSettings;

pub use settings::{
    BackoffSettings, DEFAULT_MAX_PACKET_SIZE, ServerSettings, SessionSettings, Settings,
    UpstreamSettings,
};

/// Default configuration file, resolved relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/default";

/// Loads the configuration from `config/default.*` and the environment.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from(DEFAULT_CONFIG_PATH)
}

/// Loads the configuration from an optional file and environment variables
/// prefixed with `BRIDGE`, e.g. `BRIDGE_UPSTREAM__PORT=1884` or
/// `BRIDGE_UPSTREAM__TOPICS=Camera_status,AC_status`.
///
/// Values that are not set anywhere fall back to [`Settings::default`].
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix("BRIDGE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("upstream.topics")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    let settings = partial.merge(Settings::default());
    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if settings.upstream.topics.is_empty() {
        return Err(ConfigError::Message(
            "upstream.topics must name at least one topic".to_string(),
        ));
    }
    if settings.upstream.connect_timeout_secs == 0 {
        return Err(ConfigError::Message(
            "upstream.connect_timeout_secs must be greater than zero".to_string(),
        ));
    }
    if settings.upstream.max_packet_size == 0 {
        return Err(ConfigError::Message(
            "upstream.max_packet_size must be greater than zero".to_string(),
        ));
    }
    if settings.session.queue_capacity == 0 {
        return Err(ConfigError::Message(
            "session.queue_capacity must be greater than zero".to_string(),
        ));
    }
    if settings.backoff.base_ms > settings.backoff.max_ms {
        return Err(ConfigError::Message(
            "backoff.base_ms must not exceed backoff.max_ms".to_string(),
        ));
    }
    Ok(())
}

impl Settings {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::exponential(
            Duration::from_millis(self.backoff.base_ms),
            Duration::from_millis(self.backoff.max_ms),
        )
    }

    pub fn slow_consumer_policy(&self) -> SlowConsumerPolicy {
        SlowConsumerPolicy::from_max_consecutive_drops(self.session.max_consecutive_drops)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.session.shutdown_grace_secs)
    }
}
