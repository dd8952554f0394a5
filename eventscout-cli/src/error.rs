//! Error types for the eventscout CLI.

use eventscout::search::GoogleSearchError;

use crate::config::ConfigError;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors surfaced by CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration file error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Error from the eventscout library.
    #[error(transparent)]
    Core(#[from] eventscout::Error),

    /// Search client setup error.
    #[error(transparent)]
    Search(#[from] GoogleSearchError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Output rendering error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<eventscout::SearchError> for CliError {
    fn from(err: eventscout::SearchError) -> Self {
        Self::Core(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_errors_keep_their_message() {
        let err: CliError = GoogleSearchError::MissingCredentials.into();
        assert_eq!(
            err.to_string(),
            "GOOGLE_API_KEY or GOOGLE_CSE_ID is not set. Aborting."
        );

        let err: CliError =
            eventscout::SearchError::invalid_argument("City name cannot be empty.").into();
        assert_eq!(err.to_string(), "City name cannot be empty.");
    }
}
