//! Launcher error types.

use otel_starter_config::{BoxError, ConfigError, MultiError};
use otel_starter_pipeline::PipelineError;
use std::time::Duration;
use thiserror::Error;

/// Errors that prevent the launcher from starting.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// One or more options were rejected.
    #[error("invalid telemetry configuration: {0}")]
    Config(#[from] MultiError<ConfigError>),

    /// An exporter could not be resolved or built.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The propagator list could not be composed.
    #[error("invalid propagators: {0}")]
    Propagation(#[from] ConfigError),

    /// The logging subscriber could not be installed.
    #[error("failed to initialize logging: {0}")]
    Logging(String),
}

/// Errors raised while tearing down a started launcher.
///
/// These are never returned; they are delivered to the configured error
/// handler.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The component reported a failure.
    #[error("failed to shut down {component}: {source}")]
    Failed {
        /// Name of the shutdown action.
        component: String,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },

    /// The component did not finish in time.
    #[error("{component} did not shut down within {timeout:?}")]
    Timeout {
        /// Name of the shutdown action.
        component: String,
        /// The bound that was exceeded.
        timeout: Duration,
    },

    /// The component panicked while shutting down.
    #[error("{component} panicked during shutdown")]
    Panicked {
        /// Name of the shutdown action.
        component: String,
    },
}

impl ShutdownError {
    /// Name of the action that failed.
    pub fn component(&self) -> &str {
        match self {
            Self::Failed { component, .. }
            | Self::Timeout { component, .. }
            | Self::Panicked { component } => component,
        }
    }

    /// Returns true if the action ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
