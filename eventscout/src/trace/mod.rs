//! Observability spans around external calls.
//!
//! A [`TraceContext`] is supplied by the caller and produces [`Span`]s. A span
//! is updated with the outcome of the traced operation and then ended; `end`
//! consumes it so a span cannot be reused.
//!
//! Implementations:
//! - [`NoopSpan`]: used when the caller supplies no trace context
//! - [`RecordingTrace`]: keeps spans in memory for inspection
//! - [`Langfuse`]: batches spans to a Langfuse ingestion endpoint

mod langfuse;
mod recording;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TraceError;

pub use langfuse::{Langfuse, LangfuseConfig, LangfuseTrace};
pub use recording::{RecordingTrace, SpanRecord};

/// Severity attached to a span update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ObservationLevel {
    /// Verbose diagnostics.
    Debug,
    /// Normal operation.
    #[default]
    Default,
    /// Something unusual happened.
    Warning,
    /// The operation failed.
    Error,
}

impl ObservationLevel {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Default => "DEFAULT",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

/// Parameters used to open a span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanOptions {
    /// Span name.
    pub name: String,
    /// Input recorded when the span opens.
    pub input: Value,
    /// Free-form metadata.
    pub metadata: Value,
}

impl SpanOptions {
    /// Create span options with a name and no input or metadata.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: Value::Null,
            metadata: Value::Null,
        }
    }

    /// Set the input.
    #[must_use]
    pub fn input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }

    /// Set the metadata.
    #[must_use]
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Outcome recorded on a span.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanUpdate {
    /// Severity; unset means the span keeps its current level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<ObservationLevel>,
    /// Short human-readable status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    /// Output payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

impl SpanUpdate {
    /// A successful outcome carrying `output`.
    #[must_use]
    pub const fn output(output: Value) -> Self {
        Self {
            level: None,
            status_message: None,
            output: Some(output),
        }
    }

    /// A failed outcome.
    #[must_use]
    pub fn error(status_message: impl Into<String>, output: Value) -> Self {
        Self {
            level: Some(ObservationLevel::Error),
            status_message: Some(status_message.into()),
            output: Some(output),
        }
    }

    /// Returns `true` if this update marks the span as failed.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.level == Some(ObservationLevel::Error)
    }
}

/// One traced operation.
pub trait Span: Send {
    /// Record the outcome of the operation.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError`] if the tracing client rejects the update.
    fn update(&mut self, update: SpanUpdate) -> Result<(), TraceError>;

    /// Close the span.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError`] if the tracing client rejects the operation.
    fn end(self: Box<Self>) -> Result<(), TraceError>;
}

/// A boxed span trait object.
pub type BoxedSpan = Box<dyn Span>;

/// A tracing handle capable of producing spans.
pub trait TraceContext: Send + Sync {
    /// Open a new span.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError`] if the tracing client cannot open the span.
    fn span(&self, options: SpanOptions) -> Result<BoxedSpan, TraceError>;
}

/// A span that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSpan;

impl Span for NoopSpan {
    fn update(&mut self, _update: SpanUpdate) -> Result<(), TraceError> {
        Ok(())
    }

    fn end(self: Box<Self>) -> Result<(), TraceError> {
        Ok(())
    }
}

/// Open a span on `trace`, or a [`NoopSpan`] when there is no trace context.
///
/// # Errors
///
/// Propagates the error of [`TraceContext::span`].
pub fn open_span(
    trace: Option<&dyn TraceContext>,
    options: SpanOptions,
) -> Result<BoxedSpan, TraceError> {
    match trace {
        Some(ctx) => ctx.span(options),
        None => Ok(Box::new(NoopSpan)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn level_serializes_uppercase() {
        assert_eq!(
            serde_json::to_value(ObservationLevel::Error).unwrap(),
            json!("ERROR")
        );
        assert_eq!(ObservationLevel::Warning.as_str(), "WARNING");
        assert_eq!(ObservationLevel::default(), ObservationLevel::Default);
    }

    #[test]
    fn span_update_serializes_camel_case() {
        let update = SpanUpdate::error("Invoke failed", json!({"error": "x"}));
        let value = serde_json::to_value(&update).unwrap();

        assert_eq!(
            value,
            json!({"level": "ERROR", "statusMessage": "Invoke failed", "output": {"error": "x"}})
        );
        assert!(update.is_error());
    }

    #[test]
    fn output_update_omits_level() {
        let value = serde_json::to_value(SpanUpdate::output(json!("ok"))).unwrap();
        assert_eq!(value, json!({"output": "ok"}));
    }

    #[test]
    fn open_span_without_context_is_noop() {
        let mut span = open_span(None, SpanOptions::new("noop")).unwrap();
        span.update(SpanUpdate::output(json!(1))).unwrap();
        span.end().unwrap();
    }

    #[test]
    fn open_span_with_context_uses_it() {
        let trace = RecordingTrace::new();
        let span = open_span(Some(&trace), SpanOptions::new("recorded")).unwrap();
        span.end().unwrap();

        assert_eq!(trace.spans().len(), 1);
        assert_eq!(trace.spans()[0].options.name, "recorded");
    }
}
