//! Process-wide `tracing` subscriber.

use tracing::Level;

/// Installs the fmt subscriber at `level`. Unknown level names log at INFO.
/// Later calls keep the subscriber that is already installed.
pub fn init(level: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(parse_level(level))
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

pub(crate) fn parse_level(level: &str) -> Level {
    level.trim().parse().unwrap_or(Level::INFO)
}
