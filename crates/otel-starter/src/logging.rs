//! Structured logging subscriber.
//!
//! Installs a `tracing-subscriber` registry with an [`EnvFilter`] and either
//! JSON or human-readable output. `RUST_LOG` takes precedence over
//! [`LogConfig::level`].
//!
//! # Example
//!
//! ```rust,ignore
//! use otel_starter::logging::init_logging;
//! use otel_starter::LogConfig;
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(pipeline = "traces", "pipeline started");
//! ```

use crate::error::LaunchError;
use otel_starter_config::LogConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Installs the global logging subscriber described by `config`.
///
/// Does nothing when `config.enabled` is false. Fails if the level is not a
/// valid filter or a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), LaunchError> {
    if !config.enabled {
        return Ok(());
    }

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => create_env_filter(&config.level)?,
    };

    if config.json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| LaunchError::Logging(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| LaunchError::Logging(e.to_string()))?;
    }

    Ok(())
}

/// Parses a filter directive such as `"info"` or `"otel_starter=debug,warn"`.
pub fn create_env_filter(filter: &str) -> Result<EnvFilter, LaunchError> {
    EnvFilter::try_new(filter).map_err(|e| LaunchError::Logging(format!("invalid log level: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_env_filter_valid() {
        assert!(create_env_filter("info").is_ok());
        assert!(create_env_filter("otel_starter=debug,warn").is_ok());
    }

    #[test]
    fn test_create_env_filter_invalid() {
        let err = create_env_filter("otel_starter=loud").unwrap_err();
        assert!(err.to_string().starts_with("failed to initialize logging"));
    }

    #[test]
    fn test_disabled_logging() {
        let config = LogConfig {
            enabled: false,
            level: "not a level".to_string(),
            ..LogConfig::default()
        };
        assert!(init_logging(&config).is_ok());
    }
}
