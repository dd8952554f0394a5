//! Gemini API client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::json;

use crate::chat::ChatRequest;
use crate::error::{LlmError, Result};
use crate::message::{Message, Role};
use crate::tool::ToolDefinition;

use super::config::GeminiConfig;
use super::types::{
    FunctionCall, FunctionDeclaration, FunctionResponse, GeminiContent, GeminiErrorResponse,
    GeminiTool, GenerateContentRequest, GenerationConfig, Part,
};

/// Gemini API client.
#[derive(Debug, Clone)]
pub struct Gemini {
    pub(crate) config: Arc<GeminiConfig>,
    pub(crate) client: Client,
}

impl Gemini {
    /// Create a new Gemini client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an authentication error if the API key is empty, or an
    /// internal error if the HTTP client cannot be built.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(LlmError::auth("gemini", "API key is required").into());
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        let client = builder
            .build()
            .map_err(|e| LlmError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Create a client from environment variables.
    ///
    /// # Errors
    ///
    /// See [`GeminiConfig::from_env`] and [`Gemini::new`].
    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Get the default model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Build the `generateContent` URL for `model`.
    pub(crate) fn generate_url(&self, model: &str) -> String {
        format!(
            "{}/models/{model}:generateContent",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Build a JSON POST request with the API key header.
    pub(crate) fn build_request(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
    }

    fn function_call_part(call: &crate::message::ToolCall) -> Part {
        Part::FunctionCall {
            function_call: FunctionCall {
                name: call.name.clone(),
                args: call.arguments.clone(),
                id: None,
            },
            thought_signature: call.signature.clone(),
        }
    }

    /// Convert one message into a conversation turn.
    ///
    /// Returns `None` for system messages, which go into the system
    /// instruction instead.
    pub(crate) fn convert_message(msg: &Message) -> Option<GeminiContent> {
        let text = msg.text();
        match msg.role {
            Role::System => None,
            Role::User => Some(GeminiContent {
                role: Some("user".to_owned()),
                parts: vec![Part::text(text.unwrap_or_default())],
            }),
            Role::Assistant => {
                let mut parts: Vec<Part> = text.into_iter().map(Part::text).collect();
                parts.extend(msg.tool_calls.iter().map(Self::function_call_part));
                Some(GeminiContent {
                    role: Some("model".to_owned()),
                    parts,
                })
            }
            Role::Tool => Some(GeminiContent {
                role: Some("user".to_owned()),
                parts: vec![Part::FunctionResponse {
                    function_response: FunctionResponse {
                        name: msg.name.clone().unwrap_or_default(),
                        response: json!({ "content": text.unwrap_or_default() }),
                    },
                }],
            }),
        }
    }

    /// Convert the conversation, merging consecutive tool results into one
    /// turn.
    pub(crate) fn convert_messages(messages: &[Message]) -> Vec<GeminiContent> {
        let mut contents: Vec<GeminiContent> = Vec::new();

        for msg in messages {
            let Some(content) = Self::convert_message(msg) else {
                continue;
            };

            if msg.role == Role::Tool
                && let Some(last) = contents.last_mut()
                && last
                    .parts
                    .iter()
                    .all(|p| matches!(p, Part::FunctionResponse { .. }))
                && !last.parts.is_empty()
            {
                last.parts.extend(content.parts);
                continue;
            }

            contents.push(content);
        }

        contents
    }

    fn system_instruction(messages: &[Message]) -> Option<GeminiContent> {
        let parts: Vec<Part> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .filter_map(Message::text)
            .map(Part::text)
            .collect();

        (!parts.is_empty()).then_some(GeminiContent { role: None, parts })
    }

    /// Convert a tool definition into a function declaration.
    pub(crate) fn convert_tool(tool: &ToolDefinition) -> FunctionDeclaration {
        FunctionDeclaration {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        }
    }

    /// Build the request body.
    pub(crate) fn build_body(request: &ChatRequest) -> GenerateContentRequest {
        let tools = if request.tools.is_empty() {
            Vec::new()
        } else {
            vec![GeminiTool {
                function_declarations: request.tools.iter().map(Self::convert_tool).collect(),
            }]
        };

        let generation_config = (request.max_tokens.is_some() || request.temperature.is_some())
            .then_some(GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            });

        GenerateContentRequest {
            contents: Self::convert_messages(&request.messages),
            system_instruction: Self::system_instruction(&request.messages),
            tools,
            generation_config,
        }
    }

    /// Model for `request`, falling back to the configured default.
    pub(crate) fn resolve_model<'a>(&'a self, request: &'a ChatRequest) -> &'a str {
        if request.model.is_empty() {
            &self.config.model
        } else {
            &request.model
        }
    }

    /// Parse an error response from the API.
    pub(crate) fn parse_error(status: u16, body: &str) -> LlmError {
        let envelope = serde_json::from_str::<GeminiErrorResponse>(body).ok();

        match (status, envelope) {
            (401 | 403, Some(envelope)) => LlmError::auth("gemini", envelope.error.message),
            (401 | 403, None) => LlmError::auth("gemini", body.to_owned()),
            (429, _) => LlmError::rate_limited("gemini"),
            (_, Some(envelope)) => {
                let error = envelope.error;
                let code = error
                    .status
                    .unwrap_or_else(|| error.code.unwrap_or(status).to_string());
                LlmError::provider_code("gemini", code, error.message)
            }
            (_, None) => LlmError::http_status(status, body.to_owned()),
        }
    }
}
