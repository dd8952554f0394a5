//! Google Gemini API client implementation.
//!
//! Supports non-streaming chat through `models/{model}:generateContent`,
//! including function calling.

mod chat;
mod client;
mod config;
mod types;

pub use client::Gemini;
pub use config::GeminiConfig;
