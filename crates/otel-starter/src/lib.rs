//! # otel-starter
//!
//! Option-driven bootstrap for OpenTelemetry metric and trace pipelines.
//!
//! - **Configuration**: composable options, every rejected input reported at once
//! - **Exporters**: selected by name from per-signal registries
//! - **Propagation**: `b3`, `baggage`, `tracecontext` and `ottrace`, composed in order
//! - **Lifecycle**: ordered start, bounded and error-reporting shutdown
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use otel_starter::option::*;
//! use otel_starter::Launcher;
//!
//! #[tokio::main]
//! async fn main() {
//!     // `otlpgrpc`, the default exporter, needs the surrounding Tokio runtime.
//!     let launcher = Launcher::start([
//!         with_service_name("checkout"),
//!         with_metrics_pipeline([with_metrics_exporter_options([
//!             with_exporter_endpoint("http://otel-collector:4317"),
//!         ])]),
//!         with_traces_pipeline([
//!             with_tracing_exporter_options([
//!                 with_exporter_named("otlphttp"),
//!                 with_exporter_endpoint("http://otel-collector:4318"),
//!                 with_exporter_use_compression(),
//!             ]),
//!             with_tracing_propagators(["tracecontext", "b3"]),
//!             with_tracing_sampled(),
//!         ]),
//!     ]);
//!
//!     // ... run the service ...
//!
//!     launcher.shutdown();
//! }
//! ```
//!
//! gRPC exporters must be started from within a Tokio runtime; without one
//! [`Launcher::try_start`] returns [`LaunchError::Pipeline`]. The HTTP, Zipkin
//! and stdout exporters work from plain threads.
//!
//! Options may also come from the standard `OTEL_*` environment variables via
//! [`option::from_env`]; later options override earlier ones.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod launcher;
pub mod logging;
pub mod shutdown;

// Re-export the configuration crate
pub use otel_starter_config as config;

// Re-export the pipeline crate
pub use otel_starter_pipeline as pipeline;

pub use error::{LaunchError, ShutdownError};
pub use launcher::{Launcher, LauncherBuilder};
pub use logging::init_logging;
pub use shutdown::{ShutdownAction, DEFAULT_SHUTDOWN_TIMEOUT};

pub use otel_starter_config::{
    AttributeSet, BoxError, Config, ConfigError, ConfigOption, Detector, ErrorHandler, ErrorKind,
    ExportTarget, LogConfig, MultiError, StaticDetector,
};
pub use otel_starter_pipeline::{
    MetricExporter, MetricExporterFactory, PipelineError, Shutdown, TraceExporter,
    TraceExporterFactory,
};

/// Every option function, for glob import.
pub mod option {
    pub use otel_starter_config::env::{from_env, from_env_lookup};
    pub use otel_starter_config::option::*;
}
