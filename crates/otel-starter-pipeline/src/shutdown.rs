//! Stop capability for pipeline components.
//!
//! Components that can be stopped on their own expose an
//! `Arc<dyn Shutdown>`. Every built-in trace exporter has one; metric
//! exporters are stopped by their meter provider.

use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use otel_starter_config::BoxError;
use std::time::Duration;

/// A component that can be flushed and stopped.
pub trait Shutdown: Send + Sync {
    /// Flushes pending telemetry and stops the component.
    ///
    /// Implementations should give up after `timeout`. Callers still bound
    /// the wait themselves, so one that ignores it only delays its own result.
    fn shutdown(&self, timeout: Duration) -> Result<(), BoxError>;
}

impl Shutdown for SdkTracerProvider {
    fn shutdown(&self, timeout: Duration) -> Result<(), BoxError> {
        self.shutdown_with_timeout(timeout).map_err(Into::into)
    }
}

impl Shutdown for SdkMeterProvider {
    fn shutdown(&self, timeout: Duration) -> Result<(), BoxError> {
        self.shutdown_with_timeout(timeout).map_err(Into::into)
    }
}
