//! eventscout - event discovery through a search-enabled chat model
//!
//! This crate builds event search queries, runs them through a web search
//! backend with optional observability spans, and chains a chat model to the
//! search tool.

pub mod chat;
pub mod error;
pub mod llms;
pub mod message;
pub mod prelude;
pub mod query;
pub mod runner;
pub mod search;
pub mod tool;
pub mod trace;
pub mod usage;

pub use error::{Error, LlmError, Result, SearchError, TraceError, UpstreamError};
