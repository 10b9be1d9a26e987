use tracing_subscriber::EnvFilter;

use super::settings::Log;

/// `RUST_LOG` wins over the configured level.
pub fn init(log: &Log) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
