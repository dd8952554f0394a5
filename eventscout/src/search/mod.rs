//! Web search capability and the traced invoker around it.
//!
//! The search backend is injected as a [`SearchCapability`]. The backend may
//! fail with a structured error or with an arbitrary value, and may succeed
//! with any JSON value; [`invoke_traced_search`] narrows that down to a plain
//! string result and records a span for every call.

mod google;
mod traced;

use std::fmt::{self, Write};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{BoxError, UpstreamError};

pub use google::{
    EventDetails, GoogleCustomSearch, GoogleSearchConfig, GoogleSearchError,
    NO_RESULTS, SearchItem, format_results, parse_results,
};
pub use traced::{SEARCH_METADATA_SERVICE, SEARCH_METADATA_TOOL, SEARCH_SPAN_NAME, invoke_traced_search};

/// Failure reported by a [`SearchCapability`].
#[derive(Debug)]
pub enum InvokeFailure {
    /// A real error value with a message and possibly a cause chain.
    Structured(BoxError),
    /// Anything else the backend failed with.
    Opaque(Value),
}

impl InvokeFailure {
    /// Wrap an error value.
    #[must_use]
    pub fn structured(err: impl Into<BoxError>) -> Self {
        Self::Structured(err.into())
    }

    /// Wrap a non-error value.
    #[must_use]
    pub const fn opaque(value: Value) -> Self {
        Self::Opaque(value)
    }

    /// Short status for the span: the error message, or `"Invoke failed"`.
    #[must_use]
    pub fn status_message(&self) -> String {
        match self {
            Self::Structured(err) => err.to_string(),
            Self::Opaque(_) => "Invoke failed".to_owned(),
        }
    }

    /// Diagnostic text: the error chain, or the string form of the value.
    #[must_use]
    pub fn trace_text(&self) -> String {
        match self {
            Self::Structured(err) => error_chain(err.as_ref()),
            Self::Opaque(value) => js_string(value),
        }
    }

    /// Convert into the error surfaced to callers.
    #[must_use]
    pub fn into_upstream(self) -> UpstreamError {
        match self {
            Self::Structured(err) => UpstreamError::structured(err),
            Self::Opaque(value) => UpstreamError::opaque(js_string(&value)),
        }
    }
}

impl fmt::Display for InvokeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structured(err) => write!(f, "{err}"),
            Self::Opaque(value) => f.write_str(&js_string(value)),
        }
    }
}

/// A backend that performs a web search for a query.
#[async_trait]
pub trait SearchCapability: Send + Sync {
    /// Run the search.
    ///
    /// A well-behaved backend returns a [`Value::String`]; callers treat any
    /// other success value as a contract violation.
    async fn invoke(&self, query: &str) -> Result<Value, InvokeFailure>;
}

/// `typeof`-style name of a JSON value.
///
/// Objects, arrays and `null` are all `"object"`.
#[must_use]
pub const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null | Value::Object(_) | Value::Array(_) => "object",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
    }
}

/// String conversion of a JSON value as a script runtime would coerce it.
///
/// Objects become `[object Object]`, arrays join their elements with `,`
/// (with `null` elements rendered empty), numbers follow [`js_number`].
#[must_use]
pub fn js_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_string(n),
        Value::String(s) => s.clone(),
        Value::Object(_) => "[object Object]".to_owned(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
    }
}

/// Compact JSON text as a script runtime's `JSON.stringify` produces it.
///
/// Differs from `Value`'s `Display` only in number formatting.
#[must_use]
pub fn js_json(value: &Value) -> String {
    match value {
        Value::Number(n) => number_string(n),
        Value::Array(items) => {
            let items: Vec<_> = items.iter().map(js_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let entries: Vec<_> = map
                .iter()
                .map(|(key, item)| format!("{}:{}", Value::String(key.clone()), js_json(item)))
                .collect();
            format!("{{{}}}", entries.join(","))
        }
        other => other.to_string(),
    }
}

/// Shortest round-trip rendering of a double, in `Number.prototype.toString`
/// form: integral values have no fraction, and magnitudes of at least `1e21`
/// or below `1e-6` use exponent notation with an explicit sign.
#[must_use]
pub fn js_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_owned();
    }
    let magnitude = n.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return n.to_string();
    }

    let formatted = format!("{n:e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => formatted,
    }
}

fn number_string(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() => js_number(f),
        _ => n.to_string(),
    }
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut text = format!("Error: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(text, "\nCaused by: {cause}");
        source = cause.source();
    }
    text
}
