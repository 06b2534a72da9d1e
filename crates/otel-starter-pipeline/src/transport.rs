//! Shared construction helpers for network exporters.

use crate::error::PipelineError;
use opentelemetry_otlp::tonic_types::metadata::MetadataMap;
use otel_starter_config::ExportTarget;
use std::collections::HashMap;
use url::Url;

/// The collector URL of `target`, or `None` to keep the exporter default.
///
/// With `allow_insecure` an `https` endpoint is downgraded to `http`.
pub(crate) fn collector_url(target: &ExportTarget) -> Result<Option<Url>, PipelineError> {
    if target.endpoint.is_empty() {
        return Ok(None);
    }

    let mut url = Url::parse(&target.endpoint).map_err(PipelineError::build(&target.exporter))?;
    if target.allow_insecure && url.scheme() == "https" {
        url.set_scheme("http").map_err(|()| {
            PipelineError::build(&target.exporter)(format!(
                "cannot downgrade {} to plaintext",
                target.endpoint
            ))
        })?;
    }
    Ok(Some(url))
}

/// Fails unless called from within a Tokio runtime.
///
/// The tonic channel behind gRPC exporters binds to the current reactor when
/// it is built and panics without one.
pub(crate) fn require_tokio_runtime(exporter: &str) -> Result<(), PipelineError> {
    tokio::runtime::Handle::try_current()
        .map(drop)
        .map_err(|_| {
            PipelineError::build(exporter)(
                "the gRPC exporter requires a Tokio runtime; start telemetry from within one or pick an HTTP exporter",
            )
        })
}

/// Appends `path` when `url` has no path of its own.
pub(crate) fn with_default_path(mut url: Url, path: &str) -> Url {
    if url.path().is_empty() || url.path() == "/" {
        url.set_path(path);
    }
    url
}

/// Converts export headers to gRPC metadata. Invalid entries are skipped.
pub(crate) fn grpc_metadata(headers: &HashMap<String, String>) -> MetadataMap {
    let mut map = http::HeaderMap::with_capacity(headers.len());
    for (key, value) in headers {
        match (
            http::header::HeaderName::try_from(key.as_str()),
            http::header::HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => tracing::warn!(header = %key, "skipping export header that is not valid gRPC metadata"),
        }
    }
    MetadataMap::from_headers(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(endpoint: &str, allow_insecure: bool) -> ExportTarget {
        ExportTarget {
            endpoint: endpoint.to_string(),
            allow_insecure,
            ..ExportTarget::named("otlphttp")
        }
    }

    #[test]
    fn test_empty_endpoint_keeps_default() {
        assert!(collector_url(&target("", false)).unwrap().is_none());
    }

    #[test]
    fn test_insecure_downgrades_https() {
        let url = collector_url(&target("https://collector:4318/", true))
            .unwrap()
            .unwrap();
        assert_eq!(url.as_str(), "http://collector:4318/");

        let url = collector_url(&target("https://collector:4318/", false))
            .unwrap()
            .unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn test_unparsable_endpoint() {
        let err = collector_url(&target("::not a url::", false)).unwrap_err();
        assert!(matches!(err, PipelineError::Build { .. }));
    }

    #[test]
    fn test_runtime_required_outside_tokio() {
        let err = require_tokio_runtime("otlpgrpc").unwrap_err();
        assert!(matches!(err, PipelineError::Build { .. }));
        assert!(err.to_string().contains("requires a Tokio runtime"));
    }

    #[tokio::test]
    async fn test_runtime_found_inside_tokio() {
        assert!(require_tokio_runtime("otlpgrpc").is_ok());
    }

    #[test]
    fn test_default_path() {
        let url = Url::parse("http://localhost:4318/").unwrap();
        assert_eq!(
            with_default_path(url, "/v1/traces").as_str(),
            "http://localhost:4318/v1/traces"
        );

        let url = Url::parse("http://localhost:4318/custom/ingest").unwrap();
        assert_eq!(
            with_default_path(url, "/v1/traces").as_str(),
            "http://localhost:4318/custom/ingest"
        );
    }

    #[test]
    fn test_grpc_metadata_skips_invalid() {
        let headers = HashMap::from([
            ("authorization".to_string(), "Bearer token".to_string()),
            ("bad header".to_string(), "x".to_string()),
        ]);
        let metadata = grpc_metadata(&headers);
        assert_eq!(metadata.len(), 1);
        assert!(metadata.get("authorization").is_some());
    }
}
