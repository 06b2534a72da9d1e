//! Configuration from standard `OTEL_*` environment variables.
//!
//! Variables are read once, when the option is created, and translated into
//! the regular option functions. A pipeline is only enabled when its exporter
//! variable is set to something other than `none`.
//!
//! | Variable                          | Effect                                     |
//! |-----------------------------------|--------------------------------------------|
//! | `OTEL_SERVICE_NAME`               | `service.name` resource attribute          |
//! | `OTEL_RESOURCE_ATTRIBUTES`        | `k=v,k2=v2` resource attributes            |
//! | `OTEL_TRACES_EXPORTER`            | enables tracing with the named exporter    |
//! | `OTEL_METRICS_EXPORTER`           | enables metrics with the named exporter    |
//! | `OTEL_EXPORTER_OTLP_PROTOCOL`     | `grpc` or `http/protobuf` for `otlp`       |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT`     | collector endpoint for both pipelines      |
//! | `OTEL_EXPORTER_OTLP_HEADERS`      | `k=v,k2=v2` export headers                 |
//! | `OTEL_EXPORTER_OTLP_COMPRESSION`  | `gzip` or `none`                           |
//! | `OTEL_EXPORTER_OTLP_INSECURE`     | `true` or `false`                          |
//! | `OTEL_PROPAGATORS`                | comma separated propagator names           |
//! | `OTEL_TRACES_SAMPLER`             | `always_on` or `always_off` (and parent based variants) |
//! | `OTEL_METRIC_EXPORT_INTERVAL`     | collect period in milliseconds             |

use crate::error::ConfigError;
use crate::multi::MultiError;
use crate::option::{
    with_attributes, with_exporter_endpoint, with_exporter_headers,
    with_exporter_insecure_connection, with_exporter_named, with_exporter_use_compression,
    with_metrics_collect_period_millis, with_metrics_exporter_options, with_metrics_pipeline,
    with_service_name, with_traces_pipeline, with_tracing_exporter_options,
    with_tracing_propagators, with_tracing_sampled, ConfigOption, ExportOption, MetricsOption,
    TracingOption,
};
use opentelemetry::KeyValue;

/// `service.name` override.
pub const OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";
/// Extra resource attributes.
pub const OTEL_RESOURCE_ATTRIBUTES: &str = "OTEL_RESOURCE_ATTRIBUTES";
/// Trace exporter selection.
pub const OTEL_TRACES_EXPORTER: &str = "OTEL_TRACES_EXPORTER";
/// Metric exporter selection.
pub const OTEL_METRICS_EXPORTER: &str = "OTEL_METRICS_EXPORTER";
/// OTLP transport protocol.
pub const OTEL_EXPORTER_OTLP_PROTOCOL: &str = "OTEL_EXPORTER_OTLP_PROTOCOL";
/// OTLP collector endpoint.
pub const OTEL_EXPORTER_OTLP_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
/// OTLP request headers.
pub const OTEL_EXPORTER_OTLP_HEADERS: &str = "OTEL_EXPORTER_OTLP_HEADERS";
/// OTLP payload compression.
pub const OTEL_EXPORTER_OTLP_COMPRESSION: &str = "OTEL_EXPORTER_OTLP_COMPRESSION";
/// OTLP plaintext transport.
pub const OTEL_EXPORTER_OTLP_INSECURE: &str = "OTEL_EXPORTER_OTLP_INSECURE";
/// Propagator selection.
pub const OTEL_PROPAGATORS: &str = "OTEL_PROPAGATORS";
/// Sampler selection.
pub const OTEL_TRACES_SAMPLER: &str = "OTEL_TRACES_SAMPLER";
/// Metric export interval in milliseconds.
pub const OTEL_METRIC_EXPORT_INTERVAL: &str = "OTEL_METRIC_EXPORT_INTERVAL";

/// Reads the process environment.
pub fn from_env() -> ConfigOption {
    from_env_lookup(|key| std::env::var(key).ok())
}

/// Reads variables through `lookup` instead of the process environment.
///
/// Unset and blank variables are ignored. Values that cannot be parsed are
/// reported as [`ConfigError::InvalidParam`] when the option is applied,
/// together with any error from the options they translate into.
pub fn from_env_lookup<F>(lookup: F) -> ConfigOption
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let mut errors = MultiError::new();
    let mut options: Vec<ConfigOption> = Vec::new();

    if let Some(raw) = var(OTEL_RESOURCE_ATTRIBUTES) {
        match parse_pairs(OTEL_RESOURCE_ATTRIBUTES, &raw) {
            Ok(pairs) => options.push(with_attributes(
                pairs.into_iter().map(|(k, v)| KeyValue::new(k, v)),
            )),
            Err(err) => errors.push(err),
        }
    }
    if let Some(name) = var(OTEL_SERVICE_NAME) {
        options.push(with_service_name(name));
    }

    let otlp = OtlpSettings::read(&var, &mut errors);
    let protocol = var(OTEL_EXPORTER_OTLP_PROTOCOL);

    if let Some(raw) = var(OTEL_METRICS_EXPORTER) {
        match exporter_name(OTEL_METRICS_EXPORTER, &raw, protocol.as_deref()) {
            Ok(Some(exporter)) => {
                let mut pipeline: Vec<MetricsOption> =
                    vec![with_metrics_exporter_options(otlp.export_options(exporter))];
                if let Some(raw) = var(OTEL_METRIC_EXPORT_INTERVAL) {
                    match raw.parse::<i64>() {
                        Ok(millis) => pipeline.push(with_metrics_collect_period_millis(millis)),
                        Err(e) => errors.push(ConfigError::invalid_param(
                            OTEL_METRIC_EXPORT_INTERVAL,
                            format!("{raw:?}: {e}"),
                        )),
                    }
                }
                options.push(with_metrics_pipeline(pipeline));
            }
            Ok(None) => {}
            Err(err) => errors.push(err),
        }
    }

    if let Some(raw) = var(OTEL_TRACES_EXPORTER) {
        match exporter_name(OTEL_TRACES_EXPORTER, &raw, protocol.as_deref()) {
            Ok(Some(exporter)) => {
                let mut pipeline: Vec<TracingOption> =
                    vec![with_tracing_exporter_options(otlp.export_options(exporter))];
                if let Some(raw) = var(OTEL_PROPAGATORS) {
                    pipeline.push(with_tracing_propagators(split_list(&raw)));
                }
                if let Some(raw) = var(OTEL_TRACES_SAMPLER) {
                    match sampled(&raw) {
                        Ok(true) => pipeline.push(with_tracing_sampled()),
                        Ok(false) => {}
                        Err(err) => errors.push(err),
                    }
                }
                options.push(with_traces_pipeline(pipeline));
            }
            Ok(None) => {}
            Err(err) => errors.push(err),
        }
    }

    Box::new(move |config| {
        let mut errors = errors;
        for option in options {
            errors.append(option(config));
        }
        errors.into_result().map_err(ConfigError::from)
    })
}

/// OTLP settings shared by both pipelines.
#[derive(Debug, Default)]
struct OtlpSettings {
    endpoint: Option<String>,
    headers: Vec<(String, String)>,
    compression: bool,
    insecure: bool,
}

impl OtlpSettings {
    fn read<V>(var: &V, errors: &mut MultiError<ConfigError>) -> Self
    where
        V: Fn(&str) -> Option<String>,
    {
        let mut settings = Self {
            endpoint: var(OTEL_EXPORTER_OTLP_ENDPOINT),
            ..Self::default()
        };

        if let Some(raw) = var(OTEL_EXPORTER_OTLP_HEADERS) {
            match parse_pairs(OTEL_EXPORTER_OTLP_HEADERS, &raw) {
                Ok(headers) => settings.headers = headers,
                Err(err) => errors.push(err),
            }
        }

        if let Some(raw) = var(OTEL_EXPORTER_OTLP_COMPRESSION) {
            match raw.to_ascii_lowercase().as_str() {
                "gzip" => settings.compression = true,
                "none" => {}
                _ => errors.push(ConfigError::invalid_param(
                    OTEL_EXPORTER_OTLP_COMPRESSION,
                    format!("unsupported compression {raw:?}"),
                )),
            }
        }

        if let Some(raw) = var(OTEL_EXPORTER_OTLP_INSECURE) {
            match raw.to_ascii_lowercase().as_str() {
                "true" => settings.insecure = true,
                "false" => {}
                _ => errors.push(ConfigError::invalid_param(
                    OTEL_EXPORTER_OTLP_INSECURE,
                    format!("expected true or false, got {raw:?}"),
                )),
            }
        }

        settings
    }

    fn export_options(&self, exporter: String) -> Vec<ExportOption> {
        let mut options = vec![with_exporter_named(exporter)];
        if let Some(endpoint) = &self.endpoint {
            options.push(with_exporter_endpoint(endpoint.clone()));
        }
        if !self.headers.is_empty() {
            options.push(with_exporter_headers(self.headers.clone()));
        }
        if self.compression {
            options.push(with_exporter_use_compression());
        }
        if self.insecure {
            options.push(with_exporter_insecure_connection());
        }
        options
    }
}

/// Maps an exporter variable onto a registry name. `none` disables the
/// pipeline; names without a mapping are passed through for custom registries.
fn exporter_name(
    variable: &str,
    value: &str,
    protocol: Option<&str>,
) -> Result<Option<String>, ConfigError> {
    let names = split_list(value);
    let name = match names.as_slice() {
        [name] => name.to_ascii_lowercase(),
        _ => {
            return Err(ConfigError::invalid_param(
                variable,
                format!("expected a single exporter, got {value:?}"),
            ))
        }
    };

    let mapped = match name.as_str() {
        "none" => return Ok(None),
        "otlp" => match protocol.map(str::to_ascii_lowercase).as_deref() {
            None | Some("grpc") => "otlpgrpc".to_string(),
            Some("http/protobuf" | "http/json") => "otlphttp".to_string(),
            Some(other) => {
                return Err(ConfigError::invalid_param(
                    OTEL_EXPORTER_OTLP_PROTOCOL,
                    format!("unsupported protocol {other:?}"),
                ))
            }
        },
        "console" | "logging" => "stdout".to_string(),
        _ => name.clone(),
    };
    Ok(Some(mapped))
}

fn sampled(value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "always_on" | "parentbased_always_on" => Ok(true),
        "always_off" | "parentbased_always_off" => Ok(false),
        _ => Err(ConfigError::invalid_param(
            OTEL_TRACES_SAMPLER,
            format!("unsupported sampler {value:?}"),
        )),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_pairs(variable: &str, value: &str) -> Result<Vec<(String, String)>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, val)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), val.trim().to_string()))
            }
            _ => Err(ConfigError::invalid_param(
                variable,
                format!("malformed pair {pair:?}; expected key=value"),
            )),
        })
        .collect()
}
