//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```rust,ignore
//! use eventscout::prelude::*;
//! ```

pub use crate::llms::{Gemini, GeminiConfig};

pub use crate::chat::{ChatProvider, ChatRequest, ChatResponse, SharedChatProvider, StopReason};
pub use crate::error::{
    BoxError, Error, LlmError, Result, SearchError, TraceError, UpstreamError,
};
pub use crate::message::{Content, ContentPart, Message, Role, ToolCall};
pub use crate::query::{CityWithRadius, SearchInputParameters, build_query};
pub use crate::runner::{ExecutedToolCall, RunOptions, RunOutcome, SearchRunner};
pub use crate::search::{
    GoogleCustomSearch, GoogleSearchConfig, InvokeFailure, SearchCapability, SearchItem,
    invoke_traced_search,
};
pub use crate::tool::{Tool, ToolDefinition};
pub use crate::trace::{
    Langfuse, LangfuseConfig, LangfuseTrace, NoopSpan, RecordingTrace, Span, SpanOptions,
    SpanUpdate, TraceContext,
};
pub use crate::usage::Usage;
