use serde_json::{Value, json};
use tracing::{debug, error};

use crate::error::SearchError;
use crate::trace::{SpanOptions, SpanUpdate, TraceContext, open_span};

use super::{InvokeFailure, SearchCapability, js_json, type_name};

/// Name of the span recorded around each search call.
pub const SEARCH_SPAN_NAME: &str = "google-custom-search-invoke";

/// `tool` metadata recorded on the search span.
pub const SEARCH_METADATA_TOOL: &str = "GoogleCustomSearch";

/// `service` metadata recorded on the search span.
pub const SEARCH_METADATA_SERVICE: &str = "Google Custom Search Engine";

/// Run `query` through `capability`, recording a span on `trace`.
///
/// Without a trace context the call is still made but nothing is recorded.
/// The span is updated once and ended once on every path that reaches the
/// capability.
///
/// # Errors
///
/// - [`SearchError::Upstream`] if the capability fails. A structured failure
///   keeps its message and stays reachable through `source()`.
/// - [`SearchError::ContractViolation`] if the capability returns anything
///   other than a string.
/// - [`SearchError::Trace`] if the trace context or span fails.
pub async fn invoke_traced_search(
    capability: &dyn SearchCapability,
    query: &str,
    trace: Option<&dyn TraceContext>,
) -> Result<String, SearchError> {
    let mut span = open_span(
        trace,
        SpanOptions::new(SEARCH_SPAN_NAME)
            .input(json!({ "query": query }))
            .metadata(json!({
                "tool": SEARCH_METADATA_TOOL,
                "service": SEARCH_METADATA_SERVICE,
            })),
    )?;

    debug!(query, traced = trace.is_some(), "Invoking GoogleCustomSearch");

    let output = match capability.invoke(query).await {
        Ok(output) => output,
        Err(failure) => {
            log_failure(&failure);
            span.update(SpanUpdate::error(
                failure.status_message(),
                json!({ "error": failure.trace_text() }),
            ))?;
            span.end()?;
            return Err(failure.into_upstream().into());
        }
    };

    let Value::String(result) = output else {
        let message = format!(
            "GoogleCustomSearch tool returned an unexpected type: {}. Expected string. Output: {}",
            type_name(&output),
            js_json(&output),
        );
        error!(%message, "Unexpected output type from tool");
        span.update(SpanUpdate::error(
            "Unexpected output type from tool",
            json!({ "error": message.clone(), "data": output }),
        ))?;
        span.end()?;
        return Err(SearchError::contract_violation(message));
    };

    span.update(SpanUpdate::output(Value::String(result.clone())))?;
    span.end()?;

    debug!(bytes = result.len(), "GoogleCustomSearch returned");
    Ok(result)
}

fn log_failure(failure: &InvokeFailure) {
    match failure {
        InvokeFailure::Structured(err) => {
            error!(error = %err, "Error invoking GoogleCustomSearch tool");
        }
        InvokeFailure::Opaque(value) => {
            error!(value = %value, "Error invoking GoogleCustomSearch tool");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::TraceError;
    use crate::trace::{BoxedSpan, ObservationLevel, RecordingTrace};
    use async_trait::async_trait;

    struct Fixed(Value);

    #[async_trait]
    impl SearchCapability for Fixed {
        async fn invoke(&self, _query: &str) -> Result<Value, InvokeFailure> {
            Ok(self.0.clone())
        }
    }

    struct RefusingTrace;

    impl TraceContext for RefusingTrace {
        fn span(&self, _options: SpanOptions) -> Result<BoxedSpan, TraceError> {
            Err(TraceError::client("span refused"))
        }
    }

    #[tokio::test]
    async fn string_result_passes_through() {
        let trace = RecordingTrace::new();
        let result = invoke_traced_search(&Fixed(json!("[]")), "q", Some(&trace))
            .await
            .unwrap();

        assert_eq!(result, "[]");
        let spans = trace.spans();
        assert_eq!(spans[0].options.name, SEARCH_SPAN_NAME);
        assert_eq!(
            spans[0].options.metadata,
            json!({"tool": "GoogleCustomSearch", "service": "Google Custom Search Engine"})
        );
        assert_eq!(spans[0].updates, vec![SpanUpdate::output(json!("[]"))]);
    }

    #[tokio::test]
    async fn number_result_is_contract_violation() {
        let trace = RecordingTrace::new();
        let err = invoke_traced_search(&Fixed(json!(7)), "q", Some(&trace))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "GoogleCustomSearch tool returned an unexpected type: number. Expected string. Output: 7"
        );
        let update = trace.spans()[0].last_update().cloned().unwrap();
        assert_eq!(update.level, Some(ObservationLevel::Error));
        assert_eq!(update.output.unwrap()["data"], json!(7));
    }

    #[tokio::test]
    async fn null_result_is_object() {
        let err = invoke_traced_search(&Fixed(Value::Null), "q", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unexpected type: object."));
        assert!(err.to_string().ends_with("Output: null"));
    }

    #[tokio::test]
    async fn float_result_renders_like_json_stringify() {
        let err = invoke_traced_search(&Fixed(json!([1.0, 1e21, 1e-7])), "q", None)
            .await
            .unwrap_err();
        assert!(err.to_string().ends_with("Output: [1,1e+21,1e-7]"));
    }

    #[tokio::test]
    async fn trace_failure_propagates() {
        let err = invoke_traced_search(&Fixed(json!("ok")), "q", Some(&RefusingTrace))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Trace(_)));
        assert_eq!(err.to_string(), "span refused");
    }
}
