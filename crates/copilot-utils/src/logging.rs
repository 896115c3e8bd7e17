//! Logging and tracing utilities

use crate::config::{Config, LogFormat};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing from the environment
///
/// The filter comes from `RUST_LOG` (default `info`) and the output format
/// from `LOG_FORMAT`.
pub fn init_tracing() {
    init_tracing_with(&Config::from_env());
}

/// Initialize tracing with an explicit configuration
///
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing_with(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    };

    if result.is_ok() {
        tracing::debug!(app = %config.app_name, env = %config.environment, "Tracing initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        let config = Config::default();
        init_tracing_with(&config);
        init_tracing_with(&config);
    }
}
