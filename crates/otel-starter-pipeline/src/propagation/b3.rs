//! Zipkin B3 propagation.
//!
//! Injects the multi-header encoding (`x-b3-traceid`, `x-b3-spanid`,
//! `x-b3-sampled`). Extracts the single `b3` header when present and falls
//! back to the multi-header encoding.

use super::{field_iter, parse_span_id, parse_trace_id};
use opentelemetry::propagation::text_map_propagator::FieldIter;
use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::trace::{SpanContext, TraceContextExt, TraceFlags, TraceState};
use opentelemetry::Context;
use std::sync::OnceLock;

const B3_SINGLE: &str = "b3";
const B3_TRACE_ID: &str = "x-b3-traceid";
const B3_SPAN_ID: &str = "x-b3-spanid";
const B3_SAMPLED: &str = "x-b3-sampled";
const B3_FLAGS: &str = "x-b3-flags";

/// B3 propagator using the multi-header encoding on inject.
#[derive(Debug, Default, Clone, Copy)]
pub struct B3Propagator;

impl B3Propagator {
    /// Creates the propagator.
    pub fn new() -> Self {
        Self
    }

    fn extract_single(value: &str) -> Option<SpanContext> {
        let mut parts = value.split('-');
        let trace_id = parse_trace_id(parts.next()?)?;
        let span_id = parse_span_id(parts.next()?)?;
        let flags = match parts.next() {
            Some(state) => sampling(state)?,
            None => TraceFlags::default(),
        };
        // An optional fourth part carries the parent span id, which has no
        // place in a span context.
        Some(SpanContext::new(
            trace_id,
            span_id,
            flags,
            true,
            TraceState::default(),
        ))
    }

    fn extract_multi(extractor: &dyn Extractor) -> Option<SpanContext> {
        let trace_id = parse_trace_id(extractor.get(B3_TRACE_ID)?)?;
        let span_id = parse_span_id(extractor.get(B3_SPAN_ID)?)?;

        let debug = extractor.get(B3_FLAGS).is_some_and(|f| f.trim() == "1");
        let flags = if debug {
            TraceFlags::SAMPLED
        } else {
            match extractor.get(B3_SAMPLED) {
                Some(state) => sampling(state)?,
                None => TraceFlags::default(),
            }
        };

        Some(SpanContext::new(
            trace_id,
            span_id,
            flags,
            true,
            TraceState::default(),
        ))
    }
}

fn sampling(state: &str) -> Option<TraceFlags> {
    match state.trim() {
        "1" | "d" | "true" => Some(TraceFlags::SAMPLED),
        "0" | "false" => Some(TraceFlags::default()),
        _ => None,
    }
}

impl TextMapPropagator for B3Propagator {
    fn inject_context(&self, cx: &Context, injector: &mut dyn Injector) {
        let span = cx.span();
        let span_context = span.span_context();
        if !span_context.is_valid() {
            return;
        }

        injector.set(B3_TRACE_ID, span_context.trace_id().to_string());
        injector.set(B3_SPAN_ID, span_context.span_id().to_string());
        let sampled = if span_context.is_sampled() { "1" } else { "0" };
        injector.set(B3_SAMPLED, sampled.to_string());
    }

    fn extract_with_context(&self, cx: &Context, extractor: &dyn Extractor) -> Context {
        let extracted = match extractor.get(B3_SINGLE) {
            Some(single) => Self::extract_single(single),
            None => Self::extract_multi(extractor),
        };

        match extracted {
            Some(span_context) if span_context.is_valid() => {
                cx.with_remote_span_context(span_context)
            }
            _ => cx.clone(),
        }
    }

    fn fields(&self) -> FieldIter<'_> {
        static FIELDS: OnceLock<[String; 4]> = OnceLock::new();
        field_iter(&FIELDS, [B3_TRACE_ID, B3_SPAN_ID, B3_SAMPLED, B3_FLAGS])
    }
}
