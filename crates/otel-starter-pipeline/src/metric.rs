//! Metric exporters and the built-in metric registry.
//!
//! | name       | exporter                                   |
//! |------------|--------------------------------------------|
//! | `stdout`   | `opentelemetry_stdout::MetricExporter`     |
//! | `otlpgrpc` | OTLP over gRPC (tonic), default `:4317`    |
//! | `otlphttp` | OTLP over HTTP/protobuf, default `:4318`   |

use crate::error::{PipelineError, Signal};
use crate::registry::ExporterFactory;
use crate::shutdown::Shutdown;
use crate::transport::{collector_url, grpc_metadata, require_tokio_runtime, with_default_path};
use opentelemetry_otlp::{Compression, Protocol, WithExportConfig, WithHttpConfig, WithTonicConfig};
use opentelemetry_sdk::metrics::exporter::PushMetricExporter;
use opentelemetry_sdk::metrics::{MeterProviderBuilder, PeriodicReader};
use otel_starter_config::ExportTarget;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Registry name of the stdout exporter.
pub const STDOUT: &str = "stdout";
/// Registry name of the OTLP/gRPC exporter.
pub const OTLP_GRPC: &str = "otlpgrpc";
/// Registry name of the OTLP/HTTP exporter.
pub const OTLP_HTTP: &str = "otlphttp";

const OTLP_HTTP_PATH: &str = "/v1/metrics";

/// Registry of metric exporter constructors.
pub type MetricExporterFactory = ExporterFactory<MetricExporter>;

type Install = Box<dyn FnOnce(MeterProviderBuilder, Duration) -> MeterProviderBuilder + Send>;

/// A built metric exporter, ready to be attached to a meter provider.
///
/// The concrete exporter type is erased. Once installed, the exporter is
/// owned and stopped by its periodic reader.
pub struct MetricExporter {
    name: String,
    install: Install,
    shutdown: Option<Arc<dyn Shutdown>>,
}

impl MetricExporter {
    /// Wraps any push exporter.
    pub fn new<E>(name: impl Into<String>, exporter: E) -> Self
    where
        E: PushMetricExporter + Send + 'static,
    {
        Self {
            name: name.into(),
            install: Box::new(move |builder, interval| {
                let reader = PeriodicReader::builder(exporter)
                    .with_interval(interval)
                    .build();
                builder.with_reader(reader)
            }),
            shutdown: None,
        }
    }

    /// Attaches a separate stop capability, run before the meter provider's.
    #[must_use]
    pub fn with_shutdown(mut self, capability: Arc<dyn Shutdown>) -> Self {
        self.shutdown = Some(capability);
        self
    }

    /// Registry name this exporter was built under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The separate stop capability, if the exporter has one.
    pub fn shutdown_capability(&self) -> Option<Arc<dyn Shutdown>> {
        self.shutdown.clone()
    }

    /// Adds a periodic reader collecting every `interval` to `builder`.
    pub fn install(self, builder: MeterProviderBuilder, interval: Duration) -> MeterProviderBuilder {
        (self.install)(builder, interval)
    }
}

impl fmt::Debug for MetricExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricExporter")
            .field("name", &self.name)
            .field("shutdown", &self.shutdown.is_some())
            .finish_non_exhaustive()
    }
}

/// Builds the registry of built-in metric exporters.
pub fn new_exporter_factory() -> MetricExporterFactory {
    ExporterFactory::new(Signal::Metrics)
        .with(STDOUT, stdout)
        .with(OTLP_GRPC, otlp_grpc)
        .with(OTLP_HTTP, otlp_http)
}

fn stdout(_: &ExportTarget) -> Result<MetricExporter, PipelineError> {
    Ok(MetricExporter::new(
        STDOUT,
        opentelemetry_stdout::MetricExporter::default(),
    ))
}

fn otlp_grpc(target: &ExportTarget) -> Result<MetricExporter, PipelineError> {
    require_tokio_runtime(OTLP_GRPC)?;

    let mut builder = opentelemetry_otlp::MetricExporter::builder().with_tonic();
    if let Some(url) = collector_url(target)? {
        builder = builder.with_endpoint(url.as_str());
    }
    if !target.headers.is_empty() {
        builder = builder.with_metadata(grpc_metadata(&target.headers));
    }
    if target.use_compression {
        builder = builder.with_compression(Compression::Gzip);
    }

    let exporter = builder.build().map_err(PipelineError::build(OTLP_GRPC))?;
    Ok(MetricExporter::new(OTLP_GRPC, exporter))
}

fn otlp_http(target: &ExportTarget) -> Result<MetricExporter, PipelineError> {
    let mut builder = opentelemetry_otlp::MetricExporter::builder()
        .with_http()
        .with_protocol(Protocol::HttpBinary);
    if let Some(url) = collector_url(target)? {
        builder = builder.with_endpoint(with_default_path(url, OTLP_HTTP_PATH).as_str());
    }
    if !target.headers.is_empty() {
        builder = builder.with_headers(target.headers.clone());
    }
    if target.use_compression {
        builder = builder.with_compression(Compression::Gzip);
    }

    let exporter = builder.build().map_err(PipelineError::build(OTLP_HTTP))?;
    Ok(MetricExporter::new(OTLP_HTTP, exporter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_sdk::metrics::SdkMeterProvider;

    #[test]
    fn test_registry_names() {
        let factory = new_exporter_factory();
        assert_eq!(factory.names(), ["otlpgrpc", "otlphttp", "stdout"]);
        assert_eq!(factory.signal(), Signal::Metrics);
    }

    #[test]
    fn test_trace_only_names_are_not_defined() {
        let factory = new_exporter_factory();
        for name in ["zipkin", "jaeger", ""] {
            let err = factory.new_exporter(&ExportTarget::named(name)).unwrap_err();
            assert!(err.is_not_defined(), "{name}");
        }
    }

    #[test]
    fn test_stdout_installs_reader() {
        let exporter = new_exporter_factory()
            .new_exporter(&ExportTarget::named(STDOUT))
            .unwrap();
        assert_eq!(exporter.name(), STDOUT);
        assert!(exporter.shutdown_capability().is_none());

        let provider = exporter
            .install(SdkMeterProvider::builder(), Duration::from_secs(60))
            .build();
        assert!(provider.shutdown().is_ok());
    }

    #[test]
    fn test_otlp_http_with_options() {
        let target = ExportTarget {
            endpoint: "https://localhost:4318/".into(),
            headers: [("api-key".to_string(), "secret".to_string())].into(),
            allow_insecure: true,
            use_compression: true,
            ..ExportTarget::named(OTLP_HTTP)
        };
        let exporter = new_exporter_factory().new_exporter(&target).unwrap();
        assert_eq!(exporter.name(), OTLP_HTTP);
    }

    #[test]
    fn test_otlp_grpc_outside_runtime_is_an_error() {
        let err = new_exporter_factory()
            .new_exporter(&ExportTarget::named(OTLP_GRPC))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Build { ref exporter, .. } if exporter == OTLP_GRPC));
        assert!(err.to_string().contains("requires a Tokio runtime"));
    }

    #[tokio::test]
    async fn test_otlp_grpc_with_options() {
        let target = ExportTarget {
            endpoint: "http://localhost:4317/".into(),
            headers: [("authorization".to_string(), "Bearer t".to_string())].into(),
            use_compression: true,
            ..ExportTarget::named(OTLP_GRPC)
        };
        let exporter = new_exporter_factory().new_exporter(&target).unwrap();
        assert_eq!(exporter.name(), OTLP_GRPC);
    }

    #[test]
    fn test_custom_shutdown_capability() {
        struct Noop;
        impl Shutdown for Noop {
            fn shutdown(&self, _timeout: Duration) -> Result<(), otel_starter_config::BoxError> {
                Ok(())
            }
        }

        let exporter = MetricExporter::new(STDOUT, opentelemetry_stdout::MetricExporter::default())
            .with_shutdown(Arc::new(Noop));
        assert!(exporter.shutdown_capability().is_some());
        assert!(format!("{exporter:?}").contains("shutdown: true"));
    }
}
