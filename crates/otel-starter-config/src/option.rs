//! Option functions.
//!
//! Every option is a boxed `FnOnce` that validates its own input before
//! touching the value it is scoped to. Options never panic; a rejected input
//! comes back as a [`ConfigError`] which [`Config::apply`] accumulates.
//!
//! There are four families, one per scope:
//!
//! | alias            | mutates              |
//! |------------------|----------------------|
//! | [`ConfigOption`] | [`Config`]           |
//! | [`MetricsOption`]| [`MetricsPipeline`]  |
//! | [`TracingOption`]| [`TracingPipeline`]  |
//! | [`ExportOption`] | [`ExportTarget`]     |
//!
//! # Example
//!
//! ```
//! use otel_starter_config::option::*;
//! use otel_starter_config::Config;
//!
//! let mut config = Config::new_default();
//! config
//!     .apply([
//!         with_service_name("checkout"),
//!         with_traces_pipeline([
//!             with_tracing_sampled(),
//!             with_tracing_exporter_options([with_exporter_named("stdout")]),
//!         ]),
//!     ])
//!     .unwrap();
//!
//! assert!(config.tracing.enabled);
//! assert_eq!(config.tracing.export.exporter, "stdout");
//! ```

use crate::config::{Config, ExportTarget, LogConfig, MetricsPipeline, TracingPipeline};
use crate::error::ConfigError;
use crate::handler::ErrorHandler;
use crate::multi::MultiError;
use crate::resource::{AttributeSet, Detector};
use opentelemetry::KeyValue;
use std::collections::hash_map::Entry;
use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::time::Duration;
use url::{Host, Url};

/// Mutates the root [`Config`].
pub type ConfigOption = Box<dyn FnOnce(&mut Config) -> Result<(), ConfigError> + Send>;

/// Mutates the metrics pipeline.
pub type MetricsOption = Box<dyn FnOnce(&mut MetricsPipeline) -> Result<(), ConfigError> + Send>;

/// Mutates the tracing pipeline.
pub type TracingOption = Box<dyn FnOnce(&mut TracingPipeline) -> Result<(), ConfigError> + Send>;

/// Mutates a pipeline's export target.
pub type ExportOption = Box<dyn FnOnce(&mut ExportTarget) -> Result<(), ConfigError> + Send>;

fn apply_all<T, O>(target: &mut T, options: Vec<O>) -> Result<(), ConfigError>
where
    O: FnOnce(&mut T) -> Result<(), ConfigError>,
{
    let mut errors = MultiError::new();
    for option in options {
        errors.append(option(target));
    }
    errors.into_result().map_err(ConfigError::from)
}

fn merge_resource(config: &mut Config, incoming: &AttributeSet) -> Result<(), ConfigError> {
    config.resource = config.resource.merge(incoming)?;
    Ok(())
}

// ============================================================================
// Config options
// ============================================================================

/// Merges the attributes found by `detector` into the resource.
///
/// `None` is rejected with [`ConfigError::NilParam`]. Detection and merge
/// failures are returned as-is and leave the resource unchanged.
pub fn with_resource(detector: Option<Arc<dyn Detector>>) -> ConfigOption {
    Box::new(move |config| {
        let detector = detector.ok_or_else(|| ConfigError::nil_param("resource detector"))?;
        let detected = detector.detect()?;
        merge_resource(config, &detected)
    })
}

/// Same as [`with_resource`] for a detector that is known to be present.
pub fn with_detector(detector: impl Detector + 'static) -> ConfigOption {
    with_resource(Some(Arc::new(detector)))
}

/// Merges explicit attributes into the resource.
pub fn with_attributes<I>(attributes: I) -> ConfigOption
where
    I: IntoIterator<Item = KeyValue>,
{
    let incoming = AttributeSet::new(attributes);
    Box::new(move |config| merge_resource(config, &incoming))
}

/// Sets the `service.name` resource attribute.
pub fn with_service_name(name: impl Into<String>) -> ConfigOption {
    let name: String = name.into();
    if name.is_empty() {
        return Box::new(|_: &mut Config| {
            Err(ConfigError::invalid_param("service name", "must not be empty"))
        });
    }
    with_attributes([KeyValue::new(
        opentelemetry_semantic_conventions::resource::SERVICE_NAME,
        name,
    )])
}

/// Replaces the error handler. `None` is rejected with [`ConfigError::NilParam`].
pub fn with_error_handler(handler: Option<Arc<dyn ErrorHandler>>) -> ConfigOption {
    Box::new(move |config| {
        config.error_handler = handler.ok_or_else(|| ConfigError::nil_param("error handler"))?;
        Ok(())
    })
}

/// Installs a `tracing` subscriber at start with the given settings.
pub fn with_logging(logging: LogConfig) -> ConfigOption {
    Box::new(move |config| {
        config.logging = LogConfig {
            enabled: true,
            ..logging
        };
        Ok(())
    })
}

/// Enables the metrics pipeline and applies `options` to it.
///
/// The pipeline is enabled even when some of the nested options fail.
pub fn with_metrics_pipeline<I>(options: I) -> ConfigOption
where
    I: IntoIterator<Item = MetricsOption>,
{
    let options: Vec<_> = options.into_iter().collect();
    Box::new(move |config| {
        config.metrics.enabled = true;
        apply_all(&mut config.metrics, options)
    })
}

/// Enables the tracing pipeline and applies `options` to it.
///
/// The pipeline is enabled even when some of the nested options fail.
pub fn with_traces_pipeline<I>(options: I) -> ConfigOption
where
    I: IntoIterator<Item = TracingOption>,
{
    let options: Vec<_> = options.into_iter().collect();
    Box::new(move |config| {
        config.tracing.enabled = true;
        apply_all(&mut config.tracing, options)
    })
}

// ============================================================================
// Pipeline options
// ============================================================================

/// Applies export options to the metrics export target.
pub fn with_metrics_exporter_options<I>(options: I) -> MetricsOption
where
    I: IntoIterator<Item = ExportOption>,
{
    let options: Vec<_> = options.into_iter().collect();
    Box::new(move |pipeline| apply_all(&mut pipeline.export, options))
}

/// Sets how often metrics are collected and exported.
///
/// A zero period is rejected as an invalid parameter: the periodic reader
/// silently ignores a zero interval and would keep its own default.
pub fn with_metrics_collect_period(period: Duration) -> MetricsOption {
    Box::new(move |pipeline| {
        if period.is_zero() {
            return Err(ConfigError::invalid_param(
                "collect period",
                "must be greater than zero",
            ));
        }
        pipeline.collect_period = period;
        Ok(())
    })
}

/// Signed variant of [`with_metrics_collect_period`]; negative values are
/// rejected.
pub fn with_metrics_collect_period_millis(millis: i64) -> MetricsOption {
    match u64::try_from(millis) {
        Ok(millis) => with_metrics_collect_period(Duration::from_millis(millis)),
        Err(_) => Box::new(move |_: &mut MetricsPipeline| {
            Err(ConfigError::invalid_param(
                "collect period",
                format!("{millis}ms is negative"),
            ))
        }),
    }
}

/// Applies export options to the tracing export target.
pub fn with_tracing_exporter_options<I>(options: I) -> TracingOption
where
    I: IntoIterator<Item = ExportOption>,
{
    let options: Vec<_> = options.into_iter().collect();
    Box::new(move |pipeline| apply_all(&mut pipeline.export, options))
}

/// Replaces the propagator list. An empty list is rejected.
pub fn with_tracing_propagators<I, S>(names: I) -> TracingOption
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let names: Vec<String> = names.into_iter().map(Into::into).collect();
    Box::new(move |pipeline| {
        if names.is_empty() {
            return Err(ConfigError::nil_param("pipeline propagators"));
        }
        pipeline.propagators = names;
        Ok(())
    })
}

/// Records every span instead of none.
pub fn with_tracing_sampled() -> TracingOption {
    Box::new(|pipeline| {
        pipeline.sampled = true;
        Ok(())
    })
}

// ============================================================================
// Export options
// ============================================================================

/// Selects the exporter by registry name.
pub fn with_exporter_named(name: impl Into<String>) -> ExportOption {
    let name = name.into();
    Box::new(move |target| {
        if name.is_empty() {
            return Err(ConfigError::invalid_param("exporter", "no exporter named"));
        }
        target.exporter = name;
        Ok(())
    })
}

/// Sets the collector endpoint.
///
/// The value must be an `http` or `https` URL whose host resolves. Name
/// resolution happens here, on the calling thread. The stored value is the
/// normalized URL, so `http://localhost:4317` becomes `http://localhost:4317/`.
pub fn with_exporter_endpoint(endpoint: impl Into<String>) -> ExportOption {
    let endpoint = endpoint.into();
    Box::new(move |target| {
        target.endpoint = validate_endpoint(&endpoint)?.into();
        Ok(())
    })
}

fn validate_endpoint(endpoint: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::invalid_param("endpoint", reason);

    let url = Url::parse(endpoint).map_err(|e| invalid(format!("{endpoint:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(invalid(format!(
                "unknown scheme {other:?}; must be http(s)"
            )))
        }
    }

    match url.host() {
        Some(Host::Domain(domain)) => {
            let port = url.port_or_known_default().unwrap_or(80);
            let mut addrs = (domain, port)
                .to_socket_addrs()
                .map_err(|e| invalid(format!("cannot resolve host {domain:?}: {e}")))?;
            if addrs.next().is_none() {
                return Err(invalid(format!("host {domain:?} has no addresses")));
            }
        }
        Some(Host::Ipv4(_) | Host::Ipv6(_)) => {}
        None => return Err(invalid(format!("{endpoint:?} has no host"))),
    }

    Ok(url)
}

/// Adds headers sent with every export request.
///
/// An empty batch is rejected with [`ConfigError::NilParam`]. A key that is
/// already present fails the option with [`ConfigError::InvalidParam`];
/// headers inserted before the conflicting key are kept.
pub fn with_exporter_headers<I, K, V>(headers: I) -> ExportOption
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let headers: Vec<(String, String)> = headers
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    Box::new(move |target| {
        if headers.is_empty() {
            return Err(ConfigError::nil_param("exporter headers"));
        }
        for (key, value) in headers {
            match target.headers.entry(key) {
                Entry::Occupied(entry) => {
                    return Err(ConfigError::invalid_param(
                        "exporter headers",
                        format!("conflict in header key {}", entry.key()),
                    ));
                }
                Entry::Vacant(entry) => {
                    entry.insert(value);
                }
            }
        }
        Ok(())
    })
}

/// Allows a plaintext connection to the collector.
pub fn with_exporter_insecure_connection() -> ExportOption {
    Box::new(|target| {
        target.allow_insecure = true;
        Ok(())
    })
}

/// Compresses export payloads with gzip.
pub fn with_exporter_use_compression() -> ExportOption {
    Box::new(|target| {
        target.use_compression = true;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ResourceError};
    use crate::resource::StaticDetector;
    use std::error::Error;

    const UNRESOLVABLE: &str = "http://nonexistent.invalid";

    fn apply(options: Vec<ConfigOption>) -> (Config, Result<(), MultiError<ConfigError>>) {
        let mut config = Config::new_default();
        let result = config.apply(options);
        (config, result)
    }

    fn expect_kind(options: Vec<ConfigOption>, kind: ErrorKind) {
        let (_, result) = apply(options);
        let errors = result.expect_err("options should fail");
        assert!(errors.contains(kind), "expected {kind:?}, got {errors}");
    }

    #[test]
    fn test_resource_options() {
        let detector = StaticDetector::new(AttributeSet::new([KeyValue::new("host.name", "db-1")]));
        let (config, result) = apply(vec![
            with_resource(Some(Arc::new(detector))),
            with_service_name("checkout"),
            with_attributes([KeyValue::new("deployment.environment", "staging")]),
        ]);

        result.unwrap();
        let resource = config.resource();
        assert_eq!(
            resource.get("service.name").map(|v| v.as_str().into_owned()),
            Some("checkout".to_string())
        );
        assert!(resource.get("host.name").is_some());
        assert!(resource.get("deployment.environment").is_some());
        assert!(resource.get("telemetry.sdk.language").is_some());
    }

    #[test]
    fn test_resource_invalid() {
        expect_kind(vec![with_resource(None)], ErrorKind::NilParam);
        expect_kind(vec![with_service_name("")], ErrorKind::InvalidParam);

        let failing = || -> Result<AttributeSet, ResourceError> {
            Err(ResourceError::detect("metadata service unreachable"))
        };
        expect_kind(vec![with_detector(failing)], ErrorKind::Resource);

        let schema = |url: &'static str| {
            StaticDetector::new(AttributeSet::empty().with_schema_url(url))
        };
        expect_kind(
            vec![
                with_detector(schema("https://opentelemetry.io/schemas/1.20.0")),
                with_detector(schema("https://opentelemetry.io/schemas/1.21.0")),
            ],
            ErrorKind::Resource,
        );
    }

    #[test]
    fn test_error_handler_option() {
        let handler: Arc<dyn ErrorHandler> = Arc::new(|_: &(dyn Error + 'static)| {});
        let (config, result) = apply(vec![with_error_handler(Some(Arc::clone(&handler)))]);
        result.unwrap();
        assert!(Arc::ptr_eq(&config.error_handler(), &handler));

        expect_kind(vec![with_error_handler(None)], ErrorKind::NilParam);
    }

    #[test]
    fn test_logging_option_enables() {
        let (config, result) = apply(vec![with_logging(LogConfig {
            level: "warn".into(),
            ..LogConfig::default()
        })]);
        result.unwrap();
        assert!(config.logging.enabled);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_metrics_pipeline_valid() {
        let (config, result) = apply(vec![with_metrics_pipeline([
            with_metrics_collect_period(Duration::from_secs(5)),
            with_metrics_exporter_options([
                with_exporter_named("stdout"),
                with_exporter_endpoint("http://localhost:9094"),
                with_exporter_headers([("authorization", "token")]),
                with_exporter_insecure_connection(),
                with_exporter_use_compression(),
            ]),
        ])]);

        result.unwrap();
        let metrics = &config.metrics;
        assert!(metrics.enabled);
        assert!(!config.tracing.enabled);
        assert_eq!(metrics.collect_period, Duration::from_secs(5));
        assert_eq!(metrics.export.exporter, "stdout");
        assert_eq!(metrics.export.endpoint, "http://localhost:9094/");
        assert_eq!(metrics.export.headers["authorization"], "token");
        assert!(metrics.export.allow_insecure);
        assert!(metrics.export.use_compression);
    }

    #[test]
    fn test_traces_pipeline_valid() {
        let (config, result) = apply(vec![with_traces_pipeline([
            with_tracing_sampled(),
            with_tracing_propagators(["b3"]),
            with_tracing_exporter_options([
                with_exporter_named("zipkin"),
                with_exporter_endpoint("https://127.0.0.1:9411/api/v2/spans"),
            ]),
        ])]);

        result.unwrap();
        let tracing = &config.tracing;
        assert!(tracing.enabled);
        assert!(tracing.sampled);
        assert_eq!(tracing.propagators, ["b3"]);
        assert_eq!(tracing.export.exporter, "zipkin");
        assert_eq!(tracing.export.endpoint, "https://127.0.0.1:9411/api/v2/spans");
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_empty_pipeline_still_enables() {
        let (config, result) = apply(vec![with_traces_pipeline([])]);
        result.unwrap();
        assert!(config.tracing.enabled);
        assert_eq!(config.tracing.propagators, ["baggage", "tracecontext"]);
    }

    fn invalid_export_cases() -> [(&'static str, fn() -> ExportOption, ErrorKind); 6] {
        [
            ("empty name", || with_exporter_named(""), ErrorKind::InvalidParam),
            ("bad scheme", || with_exporter_endpoint("udp://localhost:9094"), ErrorKind::InvalidParam),
            ("websocket scheme", || with_exporter_endpoint("wss://localhost:4317"), ErrorKind::InvalidParam),
            ("not a url", || with_exporter_endpoint("localhost"), ErrorKind::InvalidParam),
            ("unresolvable", || with_exporter_endpoint(UNRESOLVABLE), ErrorKind::InvalidParam),
            ("no headers", || with_exporter_headers(Vec::<(String, String)>::new()), ErrorKind::NilParam),
        ]
    }

    #[test]
    fn test_invalid_export_options() {
        for (name, option, kind) in invalid_export_cases() {
            let (config, result) =
                apply(vec![with_metrics_pipeline([with_metrics_exporter_options([option()])])]);
            let errors = result.expect_err(name);
            assert!(errors.contains(kind), "{name}: {errors}");
            assert!(config.metrics.enabled, "{name}: pipeline must still be enabled");
        }
    }

    #[test]
    fn test_invalid_export_options_in_traces_pipeline() {
        for (name, option, kind) in invalid_export_cases() {
            let (config, result) =
                apply(vec![with_traces_pipeline([with_tracing_exporter_options([option()])])]);
            let errors = result.expect_err(name);
            assert!(errors.contains(kind), "{name}: {errors}");
            assert!(config.tracing.enabled, "{name}: pipeline must still be enabled");
            assert!(config.tracing.export.endpoint.is_empty(), "{name}: endpoint must stay unset");
        }
    }

    #[test]
    fn test_invalid_pipeline_options() {
        expect_kind(
            vec![with_traces_pipeline([with_tracing_propagators(Vec::<String>::new())])],
            ErrorKind::NilParam,
        );
        expect_kind(
            vec![with_metrics_pipeline([with_metrics_collect_period_millis(-1)])],
            ErrorKind::InvalidParam,
        );
        expect_kind(
            vec![with_metrics_pipeline([with_metrics_collect_period(Duration::ZERO)])],
            ErrorKind::InvalidParam,
        );
    }

    #[test]
    fn test_collect_period_millis() {
        let (config, result) = apply(vec![with_metrics_pipeline([
            with_metrics_collect_period_millis(250),
        ])]);
        result.unwrap();
        assert_eq!(config.metrics.collect_period, Duration::from_millis(250));
    }

    #[test]
    fn test_propagators_replace() {
        let (config, result) = apply(vec![with_traces_pipeline([
            with_tracing_propagators(["b3", "ottrace"]),
            with_tracing_propagators(["tracecontext"]),
        ])]);
        result.unwrap();
        assert_eq!(config.tracing.propagators, ["tracecontext"]);
    }

    #[test]
    fn test_duplicate_header_keeps_earlier() {
        let (config, result) = apply(vec![with_traces_pipeline([with_tracing_exporter_options([
            with_exporter_headers([("a", "1"), ("b", "2")]),
            with_exporter_headers([("c", "3"), ("a", "override"), ("d", "4")]),
        ])])]);

        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.contains(ErrorKind::InvalidParam));

        let headers = &config.tracing.export.headers;
        assert_eq!(headers["a"], "1");
        assert_eq!(headers["c"], "3");
        assert!(!headers.contains_key("d"));
    }

    #[test]
    fn test_failures_do_not_short_circuit() {
        let (config, result) = apply(vec![
            with_resource(None),
            with_traces_pipeline([
                with_tracing_exporter_options([with_exporter_endpoint("ftp://localhost")]),
                with_tracing_sampled(),
            ]),
            with_metrics_pipeline([with_metrics_collect_period_millis(-5)]),
            with_service_name("still-applied"),
        ]);

        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(ErrorKind::NilParam));
        assert!(errors.contains(ErrorKind::InvalidParam));
        assert!(config.tracing.sampled);
        assert!(config.metrics.enabled);
        assert!(config.resource().get("service.name").is_some());
    }

    mod headers {
        use super::*;
        use proptest::prelude::*;
        use std::collections::BTreeSet;

        fn header_keys() -> impl Strategy<Value = BTreeSet<String>> {
            proptest::collection::btree_set("[a-z][a-z0-9-]{0,11}", 2..16)
        }

        fn batch(keys: &[String]) -> ExportOption {
            with_exporter_headers(keys.iter().map(|k| (k.clone(), format!("v-{k}"))))
        }

        proptest! {
            #[test]
            fn disjoint_batches_never_fail(keys in header_keys(), split in 1usize..15, reversed in any::<bool>()) {
                let keys: Vec<String> = keys.into_iter().collect();
                let split = split.min(keys.len() - 1);
                let (left, right) = keys.split_at(split);

                let mut target = ExportTarget::default();
                let batches = if reversed { [batch(right), batch(left)] } else { [batch(left), batch(right)] };
                for option in batches {
                    prop_assert!(option(&mut target).is_ok());
                }

                prop_assert_eq!(target.headers.len(), keys.len());
                for key in &keys {
                    prop_assert_eq!(&target.headers[key], &format!("v-{key}"));
                }
            }

            #[test]
            fn repeated_key_always_fails(keys in header_keys(), pick in any::<prop::sample::Index>()) {
                let keys: Vec<String> = keys.into_iter().collect();
                let repeated = pick.get(&keys).clone();

                let mut target = ExportTarget::default();
                prop_assert!(batch(&keys)(&mut target).is_ok());

                let err = batch(&[repeated])(&mut target).unwrap_err();
                prop_assert_eq!(err.kind(), ErrorKind::InvalidParam);
                prop_assert_eq!(target.headers.len(), keys.len());
            }
        }
    }
}
