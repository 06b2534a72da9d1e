//! Configuration model for otel-starter.
//!
//! A [`Config`] starts from [`Config::new_default`] and is only changed by
//! applying options. Applying a batch never stops at the first failure: every
//! option runs, and every rejected input is reported in one [`MultiError`].
//!
//! ```text
//!  options ──► Config::apply ──► Config ──► launcher
//!                   │
//!                   └──► MultiError<ConfigError>
//! ```
//!
//! # Modules
//!
//! - [`config`]: the configuration aggregate and its pipelines
//! - [`option`]: option functions for each configuration scope
//! - [`env`]: options read from `OTEL_*` environment variables
//! - [`resource`]: attribute sets and detectors
//! - [`handler`]: the process-wide error handler
//! - [`multi`]: the error aggregate
//!
//! # Example
//!
//! ```
//! use otel_starter_config::option::*;
//! use otel_starter_config::{Config, ErrorKind};
//!
//! let mut config = Config::new_default();
//! let errors = config
//!     .apply([
//!         with_metrics_pipeline([with_metrics_collect_period_millis(-1)]),
//!         with_error_handler(None),
//!     ])
//!     .unwrap_err();
//!
//! assert_eq!(errors.len(), 2);
//! assert!(errors.contains(ErrorKind::NilParam));
//! assert!(errors.contains(ErrorKind::InvalidParam));
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod env;
pub mod error;
pub mod handler;
pub mod multi;
pub mod option;
pub mod resource;

pub use config::{Config, ExportTarget, LogConfig, MetricsPipeline, TracingPipeline};
pub use env::{from_env, from_env_lookup};
pub use error::{BoxError, ConfigError, ErrorKind, ResourceError};
pub use handler::{
    global_error_handler, handle_error, set_global_error_handler, ErrorHandler, LogErrorHandler,
};
pub use multi::MultiError;
pub use option::{ConfigOption, ExportOption, MetricsOption, TracingOption};
pub use resource::{AttributeSet, Detector, StaticDetector};

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
