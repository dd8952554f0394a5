//! Model backend implementations.
//!
//! # Available Backends
//!
//! - [`gemini`] - Google Gemini API

pub mod gemini;

pub use gemini::{Gemini, GeminiConfig};
