//! Span exporters and the built-in trace registry.
//!
//! | name       | exporter                                            |
//! |------------|-----------------------------------------------------|
//! | `stdout`   | `opentelemetry_stdout::SpanExporter`                |
//! | `otlpgrpc` | OTLP over gRPC (tonic), default `:4317`             |
//! | `otlphttp` | OTLP over HTTP/protobuf, default `:4318`            |
//! | `zipkin`   | Zipkin v2 JSON, default `:9411/api/v2/spans`        |
//! | `jaeger`   | OTLP over HTTP to a Jaeger collector, default `:4318` |
//!
//! Jaeger collectors ingest OTLP natively, so `jaeger` is an OTLP/HTTP
//! exporter with its own default endpoint.

use crate::error::{PipelineError, Signal};
use crate::registry::ExporterFactory;
use crate::shutdown::Shutdown;
use crate::transport::{collector_url, grpc_metadata, require_tokio_runtime, with_default_path};
use opentelemetry_otlp::{Compression, Protocol, WithExportConfig, WithHttpConfig, WithTonicConfig};
use opentelemetry_sdk::error::OTelSdkResult;
use opentelemetry_sdk::trace::{BatchSpanProcessor, SpanData, SpanExporter, TracerProviderBuilder};
use opentelemetry_sdk::Resource;
use otel_starter_config::{BoxError, ExportTarget};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::{RwLock, RwLockWriteGuard};

/// Registry name of the stdout exporter.
pub const STDOUT: &str = "stdout";
/// Registry name of the OTLP/gRPC exporter.
pub const OTLP_GRPC: &str = "otlpgrpc";
/// Registry name of the OTLP/HTTP exporter.
pub const OTLP_HTTP: &str = "otlphttp";
/// Registry name of the Zipkin exporter.
pub const ZIPKIN: &str = "zipkin";
/// Registry name of the Jaeger exporter.
pub const JAEGER: &str = "jaeger";

const OTLP_HTTP_PATH: &str = "/v1/traces";
const ZIPKIN_PATH: &str = "/api/v2/spans";
const ZIPKIN_DEFAULT_ENDPOINT: &str = "http://localhost:9411/api/v2/spans";
const JAEGER_DEFAULT_ENDPOINT: &str = "http://localhost:4318/v1/traces";

/// Registry of trace exporter constructors.
pub type TraceExporterFactory = ExporterFactory<TraceExporter>;

type Install = Box<dyn FnOnce(TracerProviderBuilder) -> TracerProviderBuilder + Send>;

const LOCK_RETRY: Duration = Duration::from_millis(1);

/// A built span exporter, ready to be attached to a tracer provider.
///
/// The concrete exporter type is erased. The batch span processor and the
/// stop capability share one exporter, so it can be stopped ahead of its
/// tracer provider.
pub struct TraceExporter {
    name: String,
    install: Install,
    shutdown: Arc<dyn Shutdown>,
}

impl TraceExporter {
    /// Wraps any span exporter.
    pub fn new<E>(name: impl Into<String>, exporter: E) -> Self
    where
        E: SpanExporter + 'static,
    {
        let shared = SharedSpanExporter::new(exporter);
        let shutdown: Arc<dyn Shutdown> = Arc::new(shared.clone());
        Self {
            name: name.into(),
            install: Box::new(move |builder| {
                builder.with_span_processor(BatchSpanProcessor::builder(shared).build())
            }),
            shutdown,
        }
    }

    /// Replaces the stop capability run before the tracer provider's.
    ///
    /// The exporter itself is then only stopped by its tracer provider.
    #[must_use]
    pub fn with_shutdown(mut self, capability: Arc<dyn Shutdown>) -> Self {
        self.shutdown = capability;
        self
    }

    /// Registry name this exporter was built under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The capability that stops this exporter.
    pub fn shutdown_capability(&self) -> Arc<dyn Shutdown> {
        Arc::clone(&self.shutdown)
    }

    /// Adds a batch span processor wrapping this exporter to `builder`.
    pub fn install(self, builder: TracerProviderBuilder) -> TracerProviderBuilder {
        (self.install)(builder)
    }
}

impl fmt::Debug for TraceExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceExporter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// One span exporter reachable from both its batch processor and a
/// [`Shutdown`] capability.
///
/// Exports share a read lock. Stopping, flushing and resource updates take
/// the write lock. The inner exporter is stopped at most once; later stop
/// requests succeed without reaching it.
#[derive(Debug)]
struct SharedSpanExporter<E> {
    inner: Arc<RwLock<E>>,
    stopped: Arc<AtomicBool>,
}

impl<E> Clone for SharedSpanExporter<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            stopped: Arc::clone(&self.stopped),
        }
    }
}

impl<E: SpanExporter> SharedSpanExporter<E> {
    fn new(exporter: E) -> Self {
        Self {
            inner: Arc::new(RwLock::new(exporter)),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Waits for in-flight exports without blocking an async runtime.
    fn exclusive(&self) -> RwLockWriteGuard<'_, E> {
        loop {
            if let Ok(guard) = self.inner.try_write() {
                return guard;
            }
            thread::sleep(LOCK_RETRY);
        }
    }

    fn stop(&self, timeout: Duration) -> OTelSdkResult {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.exclusive().shutdown_with_timeout(timeout)
    }
}

impl<E: SpanExporter> SpanExporter for SharedSpanExporter<E> {
    async fn export(&self, batch: Vec<SpanData>) -> OTelSdkResult {
        self.inner.read().await.export(batch).await
    }

    fn shutdown_with_timeout(&mut self, timeout: Duration) -> OTelSdkResult {
        self.stop(timeout)
    }

    fn force_flush(&mut self) -> OTelSdkResult {
        self.exclusive().force_flush()
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.exclusive().set_resource(resource);
    }
}

impl<E: SpanExporter> Shutdown for SharedSpanExporter<E> {
    fn shutdown(&self, timeout: Duration) -> Result<(), BoxError> {
        self.stop(timeout).map_err(Into::into)
    }
}

/// Builds the registry of built-in trace exporters.
pub fn new_exporter_factory() -> TraceExporterFactory {
    ExporterFactory::new(Signal::Traces)
        .with(STDOUT, stdout)
        .with(OTLP_GRPC, otlp_grpc)
        .with(OTLP_HTTP, |target: &ExportTarget| otlp_http(OTLP_HTTP, target, None))
        .with(ZIPKIN, zipkin)
        .with(JAEGER, |target: &ExportTarget| {
            otlp_http(JAEGER, target, Some(JAEGER_DEFAULT_ENDPOINT))
        })
}

fn stdout(_: &ExportTarget) -> Result<TraceExporter, PipelineError> {
    Ok(TraceExporter::new(
        STDOUT,
        opentelemetry_stdout::SpanExporter::default(),
    ))
}

fn otlp_grpc(target: &ExportTarget) -> Result<TraceExporter, PipelineError> {
    require_tokio_runtime(OTLP_GRPC)?;

    let mut builder = opentelemetry_otlp::SpanExporter::builder().with_tonic();
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
    Ok(TraceExporter::new(OTLP_GRPC, exporter))
}

fn otlp_http(
    name: &str,
    target: &ExportTarget,
    default_endpoint: Option<&str>,
) -> Result<TraceExporter, PipelineError> {
    let mut builder = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_protocol(Protocol::HttpBinary);
    match collector_url(target)? {
        Some(url) => {
            builder = builder.with_endpoint(with_default_path(url, OTLP_HTTP_PATH).as_str());
        }
        None => {
            if let Some(endpoint) = default_endpoint {
                builder = builder.with_endpoint(endpoint);
            }
        }
    }
    if !target.headers.is_empty() {
        builder = builder.with_headers(target.headers.clone());
    }
    if target.use_compression {
        builder = builder.with_compression(Compression::Gzip);
    }

    let exporter = builder.build().map_err(PipelineError::build(name))?;
    Ok(TraceExporter::new(name, exporter))
}

fn zipkin(target: &ExportTarget) -> Result<TraceExporter, PipelineError> {
    let endpoint = collector_url(target)?
        .map(|url| with_default_path(url, ZIPKIN_PATH))
        .map_or_else(|| ZIPKIN_DEFAULT_ENDPOINT.to_string(), String::from);

    if !target.headers.is_empty() {
        tracing::debug!(
            exporter = ZIPKIN,
            "zipkin exporter does not send custom headers; ignoring"
        );
    }

    let exporter = opentelemetry_zipkin::ZipkinExporter::builder()
        .with_collector_endpoint(endpoint)
        .build()
        .map_err(PipelineError::build(ZIPKIN))?;
    Ok(TraceExporter::new(ZIPKIN, exporter))
}
