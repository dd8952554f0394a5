//! Model → search → model loop.
//!
//! [`SearchRunner`] sends a prompt with the search tool bound, executes the
//! search calls the model asks for through
//! [`invoke_traced_search`](crate::search::invoke_traced_search), feeds the
//! results back and returns the model's final answer.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::chat::{ChatRequest, ChatResponse, SharedChatProvider};
use crate::error::{Error, Result};
use crate::message::{Message, ToolCall};
use crate::search::{SearchCapability, invoke_traced_search};
use crate::tool::ToolDefinition;
use crate::trace::TraceContext;
use crate::usage::Usage;

/// Generation settings for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Model override; `None` uses the provider's default.
    pub model: Option<String>,
    /// Maximum output tokens per model call.
    pub max_output_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            model: None,
            max_output_tokens: 2048,
            temperature: 0.7,
        }
    }
}

impl RunOptions {
    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the maximum output tokens.
    #[must_use]
    pub const fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = tokens;
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// A tool call the runner executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedToolCall {
    /// The call as requested by the model.
    pub call: ToolCall,
    /// Raw search result sent back to the model.
    pub output: String,
}

/// Result of [`SearchRunner::run`].
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Text of the model's first reply, if any.
    pub preamble: Option<String>,
    /// Number of tool calls the model requested in its first reply.
    pub requested_tool_calls: usize,
    /// Search calls that were executed.
    pub tool_calls: Vec<ExecutedToolCall>,
    /// The model's final response.
    pub response: ChatResponse,
    /// Usage accumulated over all model calls.
    pub usage: Usage,
}

impl RunOutcome {
    /// Returns `true` if the model requested any tool call, whether or not
    /// it was executed.
    #[must_use]
    pub const fn requested_tools(&self) -> bool {
        self.requested_tool_calls > 0
    }

    /// Returns `true` if at least one search call was executed.
    #[must_use]
    pub fn used_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Runs a prompt against a chat model with the search tool bound.
pub struct SearchRunner {
    provider: SharedChatProvider,
    search: Arc<dyn SearchCapability>,
    tool: ToolDefinition,
    options: RunOptions,
}

impl std::fmt::Debug for SearchRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchRunner")
            .field("provider", &self.provider.provider_name())
            .field("tool", &self.tool.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SearchRunner {
    /// Create a runner. `tool` is the definition the model sees; calls to it
    /// are executed against `search`.
    #[must_use]
    pub fn new(
        provider: SharedChatProvider,
        search: Arc<dyn SearchCapability>,
        tool: ToolDefinition,
    ) -> Self {
        Self {
            provider,
            search,
            tool,
            options: RunOptions::default(),
        }
    }

    /// Set the generation options.
    #[must_use]
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Get the generation options.
    #[must_use]
    pub const fn options(&self) -> &RunOptions {
        &self.options
    }

    fn request(&self, messages: Vec<Message>) -> ChatRequest {
        let model = self
            .options
            .model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_owned());

        ChatRequest::with_messages(model, messages)
            .tools(vec![self.tool.clone()])
            .max_tokens(self.options.max_output_tokens)
            .temperature(self.options.temperature)
    }

    /// Extract the search input of a call, if it is a search call.
    fn search_input<'a>(&self, call: &'a ToolCall) -> Option<&'a str> {
        (call.name == self.tool.name)
            .then(|| call.str_arg("input"))
            .flatten()
    }

    /// Run `prompt`, executing any search calls the model makes.
    ///
    /// If the first response contains tool calls the model is called a
    /// second time with the results; otherwise the first response is final.
    ///
    /// # Errors
    ///
    /// Fails on any model error, on any search failure, and with
    /// `Missing/invalid id for <name>.` when an executed call has no id.
    pub async fn run(&self, prompt: &str, trace: Option<&dyn TraceContext>) -> Result<RunOutcome> {
        let mut messages = vec![Message::user(prompt)];

        let first = self.provider.chat(&self.request(messages.clone())).await?;
        let mut usage = first.usage.unwrap_or_default();
        let preamble = first.text();

        info!(
            provider = self.provider.provider_name(),
            tool_calls = first.tool_calls().len(),
            "Model responded"
        );

        if !first.has_tool_calls() {
            return Ok(RunOutcome {
                preamble,
                requested_tool_calls: 0,
                tool_calls: Vec::new(),
                response: first,
                usage,
            });
        }

        messages.push(first.message.clone());

        let mut executed = Vec::new();
        for call in first.tool_calls() {
            let Some(input) = self.search_input(call) else {
                warn!(tool = %call.name, "Skipping unsupported tool call");
                continue;
            };

            let output = invoke_traced_search(self.search.as_ref(), input, trace)
                .await
                .inspect_err(|e| error!(tool = %call.name, error = %e, "Error executing tool"))?;

            if call.id.is_empty() {
                return Err(Error::run(format!("Missing/invalid id for {}.", call.name)));
            }

            messages.push(Message::tool(&call.id, &call.name, output.clone()));
            executed.push(ExecutedToolCall {
                call: call.clone(),
                output,
            });
        }

        info!(executed = executed.len(), "Tool calls executed");

        let response = self.provider.chat(&self.request(messages)).await?;
        usage += response.usage.unwrap_or_default();

        Ok(RunOutcome {
            preamble,
            requested_tool_calls: first.tool_calls().len(),
            tool_calls: executed,
            response,
            usage,
        })
    }
}
