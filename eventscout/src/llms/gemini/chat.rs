//! Gemini ChatProvider implementation.

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::chat::{ChatProvider, ChatRequest, ChatResponse, StopReason};
use crate::error::{LlmError, Result};
use crate::message::{Content, ContentPart, Message, ToolCall};
use crate::usage::Usage;

use super::client::Gemini;
use super::types::{GenerateContentResponse, Part};

impl Gemini {
    /// Parse the response into a [`ChatResponse`].
    pub(crate) fn parse_response(response: GenerateContentResponse) -> Result<ChatResponse> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::response_format("at least one candidate", "empty candidates"))?;

        let mut texts = Vec::new();
        let mut tool_calls = Vec::new();

        for part in candidate.content.parts {
            match part {
                Part::Text { thought: Some(true), .. } => {}
                Part::Text { text, .. } => texts.push(ContentPart::text(text)),
                Part::FunctionCall {
                    function_call,
                    thought_signature,
                } => {
                    let id = function_call
                        .id
                        .filter(|id| !id.is_empty())
                        .unwrap_or_else(|| Uuid::new_v4().to_string());
                    let mut call = ToolCall::new(id, function_call.name, function_call.args);
                    call.signature = thought_signature;
                    tool_calls.push(call);
                }
                Part::FunctionResponse { .. } | Part::Other(_) => {}
            }
        }

        let stop_reason = if tool_calls.is_empty() {
            match candidate.finish_reason.as_deref() {
                Some("STOP") | None => StopReason::Stop,
                Some("MAX_TOKENS") => StopReason::Length,
                Some("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII") => {
                    StopReason::ContentFilter
                }
                Some(_) => StopReason::Other,
            }
        } else {
            StopReason::ToolCalls
        };

        let content = if tool_calls.is_empty() {
            let text: String = texts.iter().filter_map(ContentPart::as_text).collect();
            Some(Content::Text(text))
        } else {
            Some(Content::Parts(texts))
        };

        let mut chat_response =
            ChatResponse::new(Message::assistant_with_tool_calls(content, tool_calls))
                .with_stop_reason(stop_reason);

        if let Some(usage) = response.usage_metadata {
            chat_response = chat_response.with_usage(Usage::with_total(
                usage.prompt_token_count,
                usage.candidates_token_count,
                usage.total_token_count,
            ));
        }
        if let Some(model) = response.model_version {
            chat_response = chat_response.with_model(model);
        }

        Ok(chat_response)
    }
}

#[async_trait]
impl ChatProvider for Gemini {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let model = self.resolve_model(request);
        let url = self.generate_url(model);
        let body = Self::build_body(request);

        debug!(
            model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending Gemini request"
        );

        let response = self.build_request(&url).json(&body).send().await.map_err(LlmError::from)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status.as_u16(), &error_text).into());
        }

        let response_text = response.text().await.map_err(LlmError::from)?;
        let parsed: GenerateContentResponse = serde_json::from_str(&response_text).map_err(|e| {
            LlmError::response_format(
                "valid Gemini response",
                format!("parse error: {e}, response: {response_text}"),
            )
        })?;

        Self::parse_response(parsed)
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    fn default_model(&self) -> &str {
        self.model()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::LlmErrorKind;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<ChatResponse> {
        Gemini::parse_response(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn text_response() {
        let response = parse(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello, "}, {"text": "world"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15},
            "modelVersion": "gemini-2.5-pro-preview-05-06"
        }))
        .unwrap();

        assert_eq!(response.message.content, Some(Content::Text("Hello, world".to_owned())));
        assert_eq!(response.stop_reason, StopReason::Stop);
        assert_eq!(response.usage, Some(Usage::new(10, 5)));
        assert_eq!(response.model.as_deref(), Some("gemini-2.5-pro-preview-05-06"));
        assert!(!response.has_tool_calls());
    }

    #[test]
    fn function_call_response() {
        let response = parse(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "Let me search."},
                    {"functionCall": {"name": "google-custom-search", "args": {"input": "renewable energy"}}, "thoughtSignature": "abc"}
                ]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        assert_eq!(response.stop_reason, StopReason::ToolCalls);
        assert_eq!(
            response.message.content,
            Some(Content::Parts(vec![ContentPart::text("Let me search.")]))
        );

        let call = &response.tool_calls()[0];
        assert_eq!(call.name, "google-custom-search");
        assert_eq!(call.str_arg("input"), Some("renewable energy"));
        assert_eq!(call.signature.as_deref(), Some("abc"));
        assert!(Uuid::parse_str(&call.id).is_ok());
    }

    #[test]
    fn function_call_keeps_api_id() {
        let response = parse(json!({
            "candidates": [{"content": {"parts": [
                {"functionCall": {"name": "f", "args": {}, "id": "call-7"}}
            ]}}]
        }))
        .unwrap();
        assert_eq!(response.tool_calls()[0].id, "call-7");
    }

    #[test]
    fn thoughts_and_unknown_parts_are_skipped() {
        let response = parse(json!({
            "candidates": [{"content": {"parts": [
                {"text": "thinking...", "thought": true},
                {"inlineData": {"mimeType": "image/png", "data": ""}},
                {"text": "Answer"}
            ]}}]
        }))
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("Answer"));
    }

    #[test]
    fn finish_reasons() {
        let reason = |r: &str| {
            parse(json!({"candidates": [{"content": {"parts": [{"text": "x"}]}, "finishReason": r}]}))
                .unwrap()
                .stop_reason
        };
        assert_eq!(reason("MAX_TOKENS"), StopReason::Length);
        assert_eq!(reason("SAFETY"), StopReason::ContentFilter);
        assert_eq!(reason("MALFORMED_FUNCTION_CALL"), StopReason::Other);
    }

    #[test]
    fn empty_candidates_is_format_error() {
        let err = parse(json!({"candidates": []})).unwrap_err();
        assert!(matches!(err, crate::Error::Llm(ref e) if e.kind == LlmErrorKind::ResponseFormat));
    }

    #[test]
    fn provider_identity() {
        let gemini = Gemini::new(super::super::GeminiConfig::new("k")).unwrap();
        assert_eq!(gemini.provider_name(), "gemini");
        assert_eq!(gemini.default_model(), "gemini-2.5-pro-preview-05-06");
    }
}
