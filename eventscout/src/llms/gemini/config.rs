//! Gemini client configuration.

use crate::error::{LlmError, Result};

/// Configuration for the Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Default model to use.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl GeminiConfig {
    /// Default Generative Language API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";
    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "gemini-2.5-pro-preview-05-06";

    /// Creates a new configuration with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Reads from:
    /// - `GOOGLE_API_KEY`, falling back to `GEMINI_API_KEY` - required API key
    /// - `GEMINI_BASE_URL` - optional base URL
    /// - `GEMINI_MODEL` - optional default model
    ///
    /// # Errors
    ///
    /// Returns an authentication error if no API key is set.
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let api_key = var("GOOGLE_API_KEY")
            .or_else(|| var("GEMINI_API_KEY"))
            .ok_or_else(|| {
                LlmError::auth(
                    "gemini",
                    "GOOGLE_API_KEY or GEMINI_API_KEY environment variable not set",
                )
            })?;

        let base_url = var("GEMINI_BASE_URL").unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_owned());
        let model = var("GEMINI_MODEL").unwrap_or_else(|| Self::DEFAULT_MODEL.to_owned());

        Ok(Self {
            api_key,
            base_url,
            model,
            timeout_secs: Some(120),
        })
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the default model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            model: Self::DEFAULT_MODEL.to_owned(),
            timeout_secs: Some(120),
        }
    }
}
