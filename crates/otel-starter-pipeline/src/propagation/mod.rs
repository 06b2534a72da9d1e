//! Context propagation formats and their composition.
//!
//! | name           | format                                  |
//! |----------------|-----------------------------------------|
//! | `b3`           | Zipkin B3, multi-header inject          |
//! | `baggage`      | W3C Baggage                             |
//! | `tracecontext` | W3C Trace Context                       |
//! | `ottrace`      | OpenTracing `ot-tracer-*` headers       |

mod b3;
mod ottrace;

pub use b3::B3Propagator;
pub use ottrace::OtTracePropagator;

use opentelemetry::propagation::text_map_propagator::FieldIter;
use opentelemetry::propagation::{TextMapCompositePropagator, TextMapPropagator};
use opentelemetry::trace::{SpanId, TraceId};
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};
use otel_starter_config::ConfigError;
use std::sync::OnceLock;

/// Name of the B3 format.
pub const B3: &str = "b3";
/// Name of the W3C Baggage format.
pub const BAGGAGE: &str = "baggage";
/// Name of the W3C Trace Context format.
pub const TRACE_CONTEXT: &str = "tracecontext";
/// Name of the OpenTracing format.
pub const OT_TRACE: &str = "ottrace";

/// Every format name understood by [`new_propagators`].
pub const KNOWN_PROPAGATORS: [&str; 4] = [B3, BAGGAGE, TRACE_CONTEXT, OT_TRACE];

type BoxedPropagator = Box<dyn TextMapPropagator + Send + Sync>;

fn propagator(name: &str) -> Option<BoxedPropagator> {
    match name {
        B3 => Some(Box::new(B3Propagator::new())),
        BAGGAGE => Some(Box::new(BaggagePropagator::new())),
        TRACE_CONTEXT => Some(Box::new(TraceContextPropagator::new())),
        OT_TRACE => Some(Box::new(OtTracePropagator::new())),
        _ => None,
    }
}

/// Composes the named formats, in order, into one propagator.
///
/// Unknown names are skipped. When nothing is left the call fails with
/// [`ConfigError::InvalidParam`].
pub fn new_propagators<I, S>(names: I) -> Result<TextMapCompositePropagator, ConfigError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut requested = Vec::new();
    let selected: Vec<BoxedPropagator> = names
        .into_iter()
        .filter_map(|name| {
            let name = name.as_ref();
            requested.push(name.to_string());
            let found = propagator(name);
            if found.is_none() {
                tracing::debug!(propagator = name, "skipping unknown propagator");
            }
            found
        })
        .collect();

    if selected.is_empty() {
        return Err(ConfigError::invalid_param(
            "propagators",
            format!("missing propagator values: none of {requested:?} is supported"),
        ));
    }

    Ok(TextMapCompositePropagator::new(selected))
}

/// Parses a 16 or 32 character hex trace id; short ids are zero-extended.
pub(crate) fn parse_trace_id(value: &str) -> Option<TraceId> {
    let value = value.trim();
    if !(value.len() == 16 || value.len() == 32) || !is_hex(value) {
        return None;
    }
    TraceId::from_hex(value).ok()
}

/// Parses a 16 character hex span id.
pub(crate) fn parse_span_id(value: &str) -> Option<SpanId> {
    let value = value.trim();
    if value.len() != 16 || !is_hex(value) {
        return None;
    }
    SpanId::from_hex(value).ok()
}

fn is_hex(value: &str) -> bool {
    value.bytes().all(|b| b.is_ascii_hexdigit())
}

pub(crate) fn field_iter<const N: usize>(
    cell: &'static OnceLock<[String; N]>,
    names: [&str; N],
) -> FieldIter<'static> {
    FieldIter::new(cell.get_or_init(|| names.map(str::to_string)))
}

/// Reads propagation fields from an [`http::HeaderMap`].
#[derive(Debug)]
pub struct HeaderExtractor<'a>(pub &'a http::HeaderMap);

impl opentelemetry::propagation::Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(http::HeaderName::as_str).collect()
    }
}

/// Writes propagation fields into an [`http::HeaderMap`].
#[derive(Debug)]
pub struct HeaderInjector<'a>(pub &'a mut http::HeaderMap);

impl opentelemetry::propagation::Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(name), Ok(val)) = (
            http::header::HeaderName::try_from(key),
            http::header::HeaderValue::try_from(&value),
        ) {
            self.0.insert(name, val);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::baggage::BaggageExt;
    use opentelemetry::propagation::Extractor;
    use opentelemetry::trace::{SpanContext, TraceContextExt, TraceFlags, TraceState};
    use opentelemetry::{Context, KeyValue};
    use otel_starter_config::ErrorKind;

    fn sampled_context() -> Context {
        Context::new()
            .with_remote_span_context(SpanContext::new(
                TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap(),
                SpanId::from_hex("00f067aa0ba902b7").unwrap(),
                TraceFlags::SAMPLED,
                true,
                TraceState::default(),
            ))
            .with_baggage([KeyValue::new("tenant", "blue")])
    }

    #[test]
    fn test_all_known_propagators() {
        let propagator = new_propagators(KNOWN_PROPAGATORS).unwrap();
        let fields: Vec<&str> = propagator.fields().collect();
        assert!(fields.contains(&"traceparent"));
        assert!(fields.contains(&"baggage"));
        assert!(fields.contains(&"x-b3-traceid"));
        assert!(fields.contains(&"ot-tracer-traceid"));
    }

    #[test]
    fn test_single_propagator() {
        assert!(new_propagators(["b3"]).is_ok());
    }

    #[test]
    fn test_unknown_names_are_skipped() {
        let propagator = new_propagators(["jaeger", "tracecontext", "xray"]).unwrap();
        let mut fields: Vec<&str> = propagator.fields().collect();
        fields.sort_unstable();
        assert_eq!(fields, ["traceparent", "tracestate"]);
    }

    #[test]
    fn test_empty_selection_fails() {
        let err = new_propagators(Vec::<String>::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParam);

        let err = new_propagators(["jaeger", "xray"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParam);
        assert!(err.to_string().contains("xray"));
    }

    #[test]
    fn test_composite_round_trip_through_headers() {
        let propagator = new_propagators(["tracecontext", "baggage"]).unwrap();

        let mut headers = http::HeaderMap::new();
        propagator.inject_context(&sampled_context(), &mut HeaderInjector(&mut headers));
        assert!(headers.contains_key("traceparent"));
        assert!(headers.contains_key("baggage"));

        let cx = propagator.extract(&HeaderExtractor(&headers));
        let span = cx.span();
        assert!(span.span_context().is_sampled());
        assert_eq!(
            span.span_context().trace_id().to_string(),
            "4bf92f3577b34da6a3ce929d0e0e4736"
        );
        assert!(cx.baggage().get("tenant").is_some());
    }

    #[test]
    fn test_header_extractor() {
        let mut headers = http::HeaderMap::new();
        headers.insert("traceparent", "test-value".parse().unwrap());

        let extractor = HeaderExtractor(&headers);
        assert_eq!(extractor.get("traceparent"), Some("test-value"));
        assert!(extractor.get("nonexistent").is_none());
        assert_eq!(extractor.keys(), ["traceparent"]);
    }

    #[test]
    fn test_parse_ids() {
        assert!(parse_trace_id("a3ce929d0e0e4736").is_some());
        assert!(parse_trace_id("4bf92f3577b34da6a3ce929d0e0e4736").is_some());
        assert!(parse_trace_id("+bf92f3577b34da6").is_none());
        assert!(parse_trace_id("abc").is_none());
        assert!(parse_span_id("00f067aa0ba902b7").is_some());
        assert!(parse_span_id("00f067aa0ba902b").is_none());
    }
}
