//! Pipeline error types.

use otel_starter_config::BoxError;
use std::fmt;
use thiserror::Error;

/// Telemetry signal a registry builds exporters for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Metric export.
    Metrics,
    /// Span export.
    Traces,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metrics => f.write_str("metrics"),
            Self::Traces => f.write_str("traces"),
        }
    }
}

/// Errors produced while building exporters.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No constructor is registered under the requested name.
    #[error("{signal} exporter {name:?} is not defined")]
    NotDefinedExporter {
        /// Registry that was consulted.
        signal: Signal,
        /// Requested exporter name.
        name: String,
    },

    /// The constructor ran and failed.
    #[error("failed to build {exporter} exporter: {source}")]
    Build {
        /// Exporter that failed.
        exporter: String,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },
}

impl PipelineError {
    /// Create a not defined exporter error.
    pub fn not_defined(signal: Signal, name: impl Into<String>) -> Self {
        Self::NotDefinedExporter {
            signal,
            name: name.into(),
        }
    }

    /// Returns a mapper that wraps a construction failure of `exporter`.
    ///
    /// ```
    /// use otel_starter_pipeline::PipelineError;
    ///
    /// let err = "not a number"
    ///     .parse::<u16>()
    ///     .map_err(PipelineError::build("zipkin"))
    ///     .unwrap_err();
    /// assert!(err.to_string().starts_with("failed to build zipkin exporter"));
    /// ```
    pub fn build<E>(exporter: &str) -> impl FnOnce(E) -> Self + '_
    where
        E: Into<BoxError>,
    {
        move |source| Self::Build {
            exporter: exporter.to_string(),
            source: source.into(),
        }
    }

    /// Returns true for an unknown exporter name.
    pub fn is_not_defined(&self) -> bool {
        matches!(self, Self::NotDefinedExporter { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_defined_display() {
        let err = PipelineError::not_defined(Signal::Traces, "carrier-pigeon");
        assert_eq!(
            err.to_string(),
            "traces exporter \"carrier-pigeon\" is not defined"
        );
        assert!(err.is_not_defined());
    }

    #[test]
    fn test_build_keeps_source() {
        let err = PipelineError::build("otlphttp")("bad endpoint");
        assert!(!err.is_not_defined());
        assert_eq!(
            std::error::Error::source(&err).map(ToString::to_string),
            Some("bad endpoint".to_string())
        );
    }
}
