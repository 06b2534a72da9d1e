//! OpenTracing `ot-tracer-*` propagation.
//!
//! Trace ids are written as the low 64 bits (16 hex characters); 16 and 32
//! character ids are accepted on extract. Baggage travels as one
//! `ot-baggage-<key>` header per entry.

use super::{field_iter, parse_span_id, parse_trace_id};
use opentelemetry::baggage::BaggageExt;
use opentelemetry::propagation::text_map_propagator::FieldIter;
use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::trace::{SpanContext, TraceContextExt, TraceFlags, TraceState};
use opentelemetry::{Context, KeyValue};
use std::sync::OnceLock;

const TRACE_ID_HEADER: &str = "ot-tracer-traceid";
const SPAN_ID_HEADER: &str = "ot-tracer-spanid";
const SAMPLED_HEADER: &str = "ot-tracer-sampled";
const BAGGAGE_PREFIX: &str = "ot-baggage-";

/// OpenTracing header propagator.
#[derive(Debug, Default, Clone, Copy)]
pub struct OtTracePropagator;

impl OtTracePropagator {
    /// Creates the propagator.
    pub fn new() -> Self {
        Self
    }

    fn extract_span_context(extractor: &dyn Extractor) -> Option<SpanContext> {
        let trace_id = parse_trace_id(extractor.get(TRACE_ID_HEADER)?)?;
        let span_id = parse_span_id(extractor.get(SPAN_ID_HEADER)?)?;
        let flags = match extractor.get(SAMPLED_HEADER).map(str::trim) {
            Some("true" | "1") => TraceFlags::SAMPLED,
            _ => TraceFlags::default(),
        };
        let span_context = SpanContext::new(trace_id, span_id, flags, true, TraceState::default());
        span_context.is_valid().then_some(span_context)
    }
}

impl TextMapPropagator for OtTracePropagator {
    fn inject_context(&self, cx: &Context, injector: &mut dyn Injector) {
        let span = cx.span();
        let span_context = span.span_context();
        if !span_context.is_valid() {
            return;
        }

        let trace_id = span_context.trace_id().to_string();
        injector.set(TRACE_ID_HEADER, trace_id[trace_id.len() - 16..].to_string());
        injector.set(SPAN_ID_HEADER, span_context.span_id().to_string());
        injector.set(SAMPLED_HEADER, span_context.is_sampled().to_string());

        for (key, (value, _)) in cx.baggage() {
            injector.set(&format!("{BAGGAGE_PREFIX}{key}"), value.to_string());
        }
    }

    fn extract_with_context(&self, cx: &Context, extractor: &dyn Extractor) -> Context {
        let Some(span_context) = Self::extract_span_context(extractor) else {
            return cx.clone();
        };

        let baggage: Vec<KeyValue> = extractor
            .keys()
            .into_iter()
            .filter_map(|header| {
                let key = header.strip_prefix(BAGGAGE_PREFIX)?;
                let value = extractor.get(header)?;
                Some(KeyValue::new(key.to_string(), value.to_string()))
            })
            .collect();

        let cx = cx.with_remote_span_context(span_context);
        if baggage.is_empty() {
            cx
        } else {
            cx.with_baggage(baggage)
        }
    }

    fn fields(&self) -> FieldIter<'_> {
        static FIELDS: OnceLock<[String; 3]> = OnceLock::new();
        field_iter(&FIELDS, [TRACE_ID_HEADER, SPAN_ID_HEADER, SAMPLED_HEADER])
    }
}
