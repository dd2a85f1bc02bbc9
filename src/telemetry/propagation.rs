//! Text-map propagators installed at bootstrap.
//!
//! The composite reads every configured header format on the way in and writes
//! all of them on the way out, so callers using W3C trace context, baggage or the
//! legacy Google `X-Cloud-Trace-Context` header all join the same trace.

use std::str::FromStr;
use std::sync::LazyLock;

use opentelemetry::propagation::{
    text_map_propagator::FieldIter, Extractor, Injector, TextMapCompositePropagator,
    TextMapPropagator,
};
use opentelemetry::trace::{SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId, TraceState};
use opentelemetry::Context;
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};
use tracing::warn;

use crate::telemetry::error::TelemetryError;

/// Header formats understood by the composite propagator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagatorKind {
    /// W3C `traceparent` / `tracestate`
    TraceContext,
    /// W3C `baggage`
    Baggage,
    /// Google `X-Cloud-Trace-Context`
    CloudTrace,
}

/// Used when `OTEL_PROPAGATORS` is unset
pub const DEFAULT_PROPAGATORS: [PropagatorKind; 2] =
    [PropagatorKind::TraceContext, PropagatorKind::Baggage];

impl FromStr for PropagatorKind {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tracecontext" => Ok(Self::TraceContext),
            "baggage" => Ok(Self::Baggage),
            "xcloudtrace" => Ok(Self::CloudTrace),
            other => Err(TelemetryError::Config(format!("unknown propagator: {}", other))),
        }
    }
}

impl PropagatorKind {
    fn build(self) -> Box<dyn TextMapPropagator + Send + Sync> {
        match self {
            Self::TraceContext => Box::new(TraceContextPropagator::new()),
            Self::Baggage => Box::new(BaggagePropagator::new()),
            Self::CloudTrace => Box::new(CloudTraceContextPropagator::new()),
        }
    }
}

/// Parse a comma-separated `OTEL_PROPAGATORS` value.
///
/// `none` anywhere in the list disables propagation. Unknown names are skipped
/// with a warning, duplicates collapse to their first occurrence. A blank value,
/// or one where no name is recognized, counts as unset and yields
/// [`DEFAULT_PROPAGATORS`].
pub fn parse_propagators(value: &str) -> Vec<PropagatorKind> {
    let mut kinds = Vec::new();
    for name in value.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if name.eq_ignore_ascii_case("none") {
            return Vec::new();
        }
        match name.parse::<PropagatorKind>() {
            Ok(kind) if !kinds.contains(&kind) => kinds.push(kind),
            Ok(_) => {}
            Err(err) => warn!(propagator = name, error = %err, "Ignoring propagator"),
        }
    }

    if kinds.is_empty() {
        if !value.trim().is_empty() {
            warn!(value, "No known propagator configured, using defaults");
        }
        return DEFAULT_PROPAGATORS.to_vec();
    }
    kinds
}

pub fn build_propagator(kinds: &[PropagatorKind]) -> TextMapCompositePropagator {
    TextMapCompositePropagator::new(kinds.iter().map(|kind| kind.build()).collect())
}

/// Install the composite as the process-wide propagator
pub fn install_propagator(kinds: &[PropagatorKind]) {
    opentelemetry::global::set_text_map_propagator(build_propagator(kinds));
}

const CLOUD_TRACE_HEADER: &str = "x-cloud-trace-context";

static CLOUD_TRACE_FIELDS: LazyLock<[String; 1]> =
    LazyLock::new(|| [CLOUD_TRACE_HEADER.to_owned()]);

/// `X-Cloud-Trace-Context: TRACE_ID/SPAN_ID;o=OPTIONS`
///
/// `TRACE_ID` is 32 hex digits, `SPAN_ID` is the span id as an unsigned decimal,
/// `o=1` marks the trace as sampled. The options part may be missing.
#[derive(Debug, Default)]
pub struct CloudTraceContextPropagator {
    _private: (),
}

impl CloudTraceContextPropagator {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse(header: &str) -> Option<SpanContext> {
        let (trace_part, rest) = header.trim().split_once('/')?;
        let (span_part, options) = match rest.split_once(';') {
            Some((span, options)) => (span, Some(options)),
            None => (rest, None),
        };

        if trace_part.len() != 32 {
            return None;
        }
        let trace_id = TraceId::from_hex(trace_part).ok()?;
        let span_id = SpanId::from_bytes(span_part.parse::<u64>().ok()?.to_be_bytes());

        let sampled = options
            .and_then(|o| o.trim().strip_prefix("o="))
            .and_then(|flag| flag.parse::<u8>().ok())
            .is_some_and(|flag| flag & 1 == 1);
        let flags = if sampled {
            TraceFlags::SAMPLED
        } else {
            TraceFlags::default()
        };

        let span_context = SpanContext::new(trace_id, span_id, flags, true, TraceState::default());
        span_context.is_valid().then_some(span_context)
    }
}

impl TextMapPropagator for CloudTraceContextPropagator {
    fn inject_context(&self, cx: &Context, injector: &mut dyn Injector) {
        let span = cx.span();
        let span_context = span.span_context();
        if !span_context.is_valid() {
            return;
        }

        let header = format!(
            "{}/{};o={}",
            span_context.trace_id(),
            u64::from_be_bytes(span_context.span_id().to_bytes()),
            u8::from(span_context.is_sampled())
        );
        injector.set(CLOUD_TRACE_HEADER, header);
    }

    fn extract_with_context(&self, cx: &Context, extractor: &dyn Extractor) -> Context {
        extractor
            .get(CLOUD_TRACE_HEADER)
            .and_then(Self::parse)
            .map(|span_context| cx.with_remote_span_context(span_context))
            .unwrap_or_else(|| cx.clone())
    }

    fn fields(&self) -> FieldIter<'_> {
        FieldIter::new(CLOUD_TRACE_FIELDS.as_ref())
    }
}
