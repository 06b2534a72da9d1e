//! Telemetry pipeline configuration.

use crate::error::ConfigError;
use crate::handler::{global_error_handler, ErrorHandler};
use crate::multi::MultiError;
use crate::option::ConfigOption;
use crate::resource::AttributeSet;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Exporter used by both pipelines unless configured otherwise.
pub const DEFAULT_EXPORTER: &str = "otlpgrpc";

/// Propagators used by the tracing pipeline unless configured otherwise.
pub const DEFAULT_PROPAGATORS: [&str; 2] = ["baggage", "tracecontext"];

/// Interval between metric collections unless configured otherwise.
pub const DEFAULT_COLLECT_PERIOD: Duration = Duration::from_secs(1);

/// Where and how a pipeline ships its telemetry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportTarget {
    /// Registry key of the exporter to build.
    pub exporter: String,

    /// Canonical collector URL, or empty for the exporter default.
    pub endpoint: String,

    /// Extra headers sent with every export request.
    pub headers: HashMap<String, String>,

    /// Whether a plaintext connection is acceptable.
    pub allow_insecure: bool,

    /// Whether payloads are gzip compressed.
    pub use_compression: bool,
}

impl ExportTarget {
    /// Creates a target for the named exporter with no other settings.
    pub fn named(exporter: impl Into<String>) -> Self {
        Self {
            exporter: exporter.into(),
            ..Self::default()
        }
    }
}

/// Metrics pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsPipeline {
    /// Whether the pipeline is started.
    pub enabled: bool,

    /// Export destination.
    pub export: ExportTarget,

    /// How often metrics are collected and pushed.
    pub collect_period: Duration,
}

impl Default for MetricsPipeline {
    fn default() -> Self {
        Self {
            enabled: false,
            export: ExportTarget::named(DEFAULT_EXPORTER),
            collect_period: DEFAULT_COLLECT_PERIOD,
        }
    }
}

/// Tracing pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingPipeline {
    /// Whether the pipeline is started.
    pub enabled: bool,

    /// Export destination.
    pub export: ExportTarget,

    /// Record every span when true, none when false.
    pub sampled: bool,

    /// Context propagation formats, in extraction priority order.
    pub propagators: Vec<String>,
}

impl Default for TracingPipeline {
    fn default() -> Self {
        Self {
            enabled: false,
            export: ExportTarget::named(DEFAULT_EXPORTER),
            sampled: false,
            propagators: DEFAULT_PROPAGATORS.iter().map(|p| (*p).to_string()).collect(),
        }
    }
}

/// Logging subscriber configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether a subscriber is installed at start.
    pub enabled: bool,

    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,

    /// JSON output instead of human-readable lines.
    pub json_format: bool,

    /// Whether to include the event target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "info".to_string(),
            json_format: true,
            include_target: true,
        }
    }
}

impl LogConfig {
    /// Human-readable output at debug level.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            json_format: false,
            include_target: true,
        }
    }

    /// JSON output at info level.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }
}

/// Root configuration aggregate, mutated only through options.
#[derive(Clone)]
pub struct Config {
    /// Metrics pipeline settings.
    pub metrics: MetricsPipeline,

    /// Tracing pipeline settings.
    pub tracing: TracingPipeline,

    /// Logging subscriber settings.
    pub logging: LogConfig,

    pub(crate) error_handler: Arc<dyn ErrorHandler>,
    pub(crate) resource: AttributeSet,
}

impl Config {
    /// Creates the default configuration.
    ///
    /// Both pipelines are disabled. The error handler is the process-wide
    /// handler at the time of the call and the resource is the SDK default.
    pub fn new_default() -> Self {
        Self {
            metrics: MetricsPipeline::default(),
            tracing: TracingPipeline::default(),
            logging: LogConfig::default(),
            error_handler: global_error_handler(),
            resource: AttributeSet::default(),
        }
    }

    /// Applies every option in order.
    ///
    /// All options run even when earlier ones fail, so the configuration may
    /// be partially updated when an error is returned. Every failure is
    /// reported in the aggregate.
    pub fn apply<I>(&mut self, options: I) -> Result<(), MultiError<ConfigError>>
    where
        I: IntoIterator<Item = ConfigOption>,
    {
        let mut errors = MultiError::new();
        for option in options {
            errors.append(option(self));
        }
        errors.into_result()
    }

    /// The handler that receives errors raised after start.
    pub fn error_handler(&self) -> Arc<dyn ErrorHandler> {
        Arc::clone(&self.error_handler)
    }

    /// Attributes describing this process.
    pub fn resource(&self) -> &AttributeSet {
        &self.resource
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new_default()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("metrics", &self.metrics)
            .field("tracing", &self.tracing)
            .field("logging", &self.logging)
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}
