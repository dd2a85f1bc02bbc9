//! Trace-correlated request loggers.
//!
//! A [`RequestLogger`] stamps every record with the Cloud Logging trace keys so the
//! log viewer can join log lines to the span that produced them. Identifiers are
//! copied verbatim from the span context; only the trace resource path is built.

use std::fmt::Display;

use opentelemetry::trace::TraceContextExt;
use opentelemetry::Context;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::telemetry::environment::DeploymentContext;

pub const TRACE_KEY: &str = "logging.googleapis.com/trace";
pub const SPAN_ID_KEY: &str = "logging.googleapis.com/spanId";
pub const TRACE_SAMPLED_KEY: &str = "logging.googleapis.com/traceSampled";

/// Read-only projection of the span carried by a call's context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanReference {
    pub trace_id: String,
    pub span_id: String,
    pub is_sampled: bool,
    pub is_valid: bool,
}

impl SpanReference {
    pub fn from_context(cx: &Context) -> Self {
        let span = cx.span();
        let span_context = span.span_context();
        Self {
            trace_id: span_context.trace_id().to_string(),
            span_id: span_context.span_id().to_string(),
            is_sampled: span_context.is_sampled(),
            is_valid: span_context.is_valid(),
        }
    }

    /// Span of the current call.
    ///
    /// Prefers the current `tracing` span (as bridged by `tracing-opentelemetry`)
    /// and falls back to the attached OpenTelemetry context.
    pub fn current() -> Self {
        Self::from_context(&call_context())
    }
}

/// OpenTelemetry context of the call running on this thread
pub fn call_context() -> Context {
    let cx = tracing::Span::current().context();
    if cx.span().span_context().is_valid() {
        cx
    } else {
        Context::current()
    }
}

/// The three correlation fields, formatted for Cloud Logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFields {
    /// `projects/<project>/traces/<trace id>`
    pub trace: String,
    pub span_id: String,
    pub sampled: bool,
}

/// Per-call logger. Plain when the call carried no valid span.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLogger {
    trace: Option<TraceFields>,
}

macro_rules! emit {
    ($level:expr, $fields:expr, $message:expr) => {
        match $fields {
            Some(fields) => tracing::event!(
                $level,
                "logging.googleapis.com/trace" = fields.trace.as_str(),
                "logging.googleapis.com/spanId" = fields.span_id.as_str(),
                "logging.googleapis.com/traceSampled" = fields.sampled,
                "{}",
                $message
            ),
            None => tracing::event!($level, "{}", $message),
        }
    };
}

impl RequestLogger {
    /// Logger without trace fields
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn with_trace(fields: TraceFields) -> Self {
        Self {
            trace: Some(fields),
        }
    }

    pub fn trace_fields(&self) -> Option<&TraceFields> {
        self.trace.as_ref()
    }

    pub fn is_correlated(&self) -> bool {
        self.trace.is_some()
    }

    pub fn debug(&self, message: impl Display) {
        emit!(tracing::Level::DEBUG, &self.trace, message)
    }

    pub fn info(&self, message: impl Display) {
        emit!(tracing::Level::INFO, &self.trace, message)
    }

    pub fn warn(&self, message: impl Display) {
        emit!(tracing::Level::WARN, &self.trace, message)
    }

    pub fn error(&self, message: impl Display) {
        emit!(tracing::Level::ERROR, &self.trace, message)
    }
}

/// Builds [`RequestLogger`]s for the resolved deployment
#[derive(Debug, Clone)]
pub struct TraceAwareLoggerFactory {
    deployment: DeploymentContext,
}

impl TraceAwareLoggerFactory {
    pub fn new(deployment: DeploymentContext) -> Self {
        Self { deployment }
    }

    pub fn deployment(&self) -> &DeploymentContext {
        &self.deployment
    }

    pub fn logger_for(&self, span: &SpanReference) -> RequestLogger {
        if !span.is_valid {
            return RequestLogger::plain();
        }

        RequestLogger::with_trace(TraceFields {
            trace: format!(
                "projects/{}/traces/{}",
                self.deployment.project_id(),
                span.trace_id
            ),
            span_id: span.span_id.clone(),
            sampled: span.is_sampled,
        })
    }

    pub fn logger_for_context(&self, cx: &Context) -> RequestLogger {
        self.logger_for(&SpanReference::from_context(cx))
    }
}
