//! Configuration file schema.

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Model generation settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Search settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Tracing settings.
    #[serde(default)]
    pub tracing: TracingConfig,
}

/// Model generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name. Falls back to `GEMINI_MODEL` or the provider default.
    #[serde(default)]
    pub name: Option<String>,

    /// Maximum output tokens per request.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

const fn default_max_output_tokens() -> u32 {
    2048
}

const fn default_temperature() -> f32 {
    0.7
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: None,
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Search settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Custom Search endpoint override.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Tracing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracingConfig {
    /// Send spans to Langfuse when its environment variables are set.
    #[serde(default = "default_true")]
    pub langfuse: bool,

    /// Name of the trace created for each `ask` run.
    #[serde(default = "default_trace_name")]
    pub trace_name: String,
}

const fn default_true() -> bool {
    true
}

fn default_trace_name() -> String {
    "event-search".to_owned()
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            langfuse: default_true(),
            trace_name: default_trace_name(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.model.name, None);
        assert_eq!(config.model.max_output_tokens, 2048);
        assert!((config.model.temperature - 0.7).abs() < f32::EPSILON);
        assert!(config.tracing.langfuse);
        assert_eq!(config.tracing.trace_name, "event-search");
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [model]
            name = "gemini-2.0-flash"

            [tracing]
            langfuse = false
            "#,
        )
        .unwrap();

        assert_eq!(config.model.name.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(config.model.max_output_tokens, 2048);
        assert!(!config.tracing.langfuse);
        assert_eq!(config.tracing.trace_name, "event-search");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(toml::from_str::<AppConfig>("[channels]\nenabled = true").is_err());
    }
}
