//! Exporter registries, propagators and stop capabilities.
//!
//! This crate turns an [`ExportTarget`](otel_starter_config::ExportTarget)
//! into a concrete exporter by name, and a list of format names into one
//! composite propagator.
//!
//! ```text
//!  ExportTarget ──► ExporterFactory ──► MetricExporter / TraceExporter
//!                        │                       │
//!                        │                       └──► Arc<dyn Shutdown>
//!                        └──► PipelineError::NotDefinedExporter
//!
//!  ["b3", "tracecontext"] ──► new_propagators ──► TextMapCompositePropagator
//! ```
//!
//! # Registries
//!
//! | name       | metrics | traces |
//! |------------|---------|--------|
//! | `stdout`   | yes     | yes    |
//! | `otlpgrpc` | yes     | yes    |
//! | `otlphttp` | yes     | yes    |
//! | `zipkin`   |         | yes    |
//! | `jaeger`   |         | yes    |
//!
//! Both registries are [`ExporterFactory`] values and accept extra entries
//! through [`ExporterFactory::register`].
//!
//! `otlpgrpc` exporters must be built from within a Tokio runtime; elsewhere
//! the constructor fails with [`PipelineError::Build`].
//!
//! # Example
//!
//! ```
//! use otel_starter_config::ExportTarget;
//! use otel_starter_pipeline::{metric, new_propagators};
//!
//! let factory = metric::new_exporter_factory();
//! let exporter = factory.new_exporter(&ExportTarget::named("stdout")).unwrap();
//! assert_eq!(exporter.name(), "stdout");
//!
//! assert!(new_propagators(["b3", "baggage"]).is_ok());
//! assert!(new_propagators(["smoke-signals"]).is_err());
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod metric;
pub mod propagation;
pub mod registry;
pub mod shutdown;
pub mod trace;
mod transport;

pub use error::{PipelineError, Signal};
pub use metric::{MetricExporter, MetricExporterFactory};
pub use propagation::{
    new_propagators, B3Propagator, HeaderExtractor, HeaderInjector, OtTracePropagator,
};
pub use registry::{Constructor, ExporterFactory};
pub use shutdown::Shutdown;
pub use trace::{TraceExporter, TraceExporterFactory};

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
