//! Google Custom Search JSON API client.
//!
//! Usable directly, as a [`SearchCapability`] for
//! [`invoke_traced_search`](super::invoke_traced_search), or as a [`Tool`]
//! bound to a chat model.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::tool::Tool;

use super::{InvokeFailure, SearchCapability};

/// Default endpoint of the Custom Search JSON API.
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// Returned instead of a JSON array when the search has no hits.
pub const NO_RESULTS: &str = "No good results found.";

/// Errors from the Custom Search client.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GoogleSearchError {
    /// API key or engine id is not configured.
    #[error("GOOGLE_API_KEY or GOOGLE_CSE_ID is not set. Aborting.")]
    MissingCredentials,

    /// The API answered with a non-success status.
    #[error("Got {status} error from Google custom search: {reason}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Status reason phrase.
        reason: String,
    },

    /// The configured endpoint is not a valid URL.
    #[error("Invalid search endpoint: {0}")]
    Url(#[from] url::ParseError),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response or the results could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration for [`GoogleCustomSearch`].
#[derive(Debug, Clone)]
pub struct GoogleSearchConfig {
    /// API key.
    pub api_key: String,
    /// Programmable Search Engine id (`cx`).
    pub cse_id: String,
    /// Endpoint URL.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl GoogleSearchConfig {
    /// Create a configuration with the default endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>, cse_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            cse_id: cse_id.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout_secs: Some(30),
        }
    }

    /// Create configuration from `GOOGLE_API_KEY` and `GOOGLE_CSE_ID`.
    ///
    /// # Errors
    ///
    /// Returns [`GoogleSearchError::MissingCredentials`] if either variable
    /// is unset or empty.
    pub fn from_env() -> Result<Self, GoogleSearchError> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        match (var("GOOGLE_API_KEY"), var("GOOGLE_CSE_ID")) {
            (Some(api_key), Some(cse_id)) => Ok(Self::new(api_key, cse_id)),
            _ => Err(GoogleSearchError::MissingCredentials),
        }
    }

    /// Set the endpoint URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Build the request URL for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`GoogleSearchError::Url`] if the endpoint is not a valid URL.
    pub fn request_url(&self, query: &str) -> Result<Url, GoogleSearchError> {
        Ok(Url::parse_with_params(
            &self.base_url,
            &[
                ("key", self.api_key.as_str()),
                ("cx", self.cse_id.as_str()),
                ("q", query),
            ],
        )?)
    }
}

/// One search hit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchItem {
    /// Page title.
    #[serde(default)]
    pub title: String,
    /// Page URL.
    #[serde(default)]
    pub link: String,
    /// Text excerpt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

/// Event description derived from a search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetails {
    /// Generated identifier.
    pub id: String,
    /// Event title.
    pub title: String,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Event date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Event time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Venue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// City the search was made for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Where the event was found.
    pub source: String,
    /// Ranking score, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    /// The hit the event was derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_result: Option<Value>,
}

impl EventDetails {
    /// Derive an event from a search hit.
    #[must_use]
    pub fn from_item(item: &SearchItem, city: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: item.title.clone(),
            description: item.snippet.clone(),
            date: None,
            time: None,
            location: None,
            city: city.map(str::to_owned),
            source: item.link.clone(),
            relevance_score: None,
            raw_result: serde_json::to_value(item).ok(),
        }
    }
}

/// Render hits the way the search tool returns them.
///
/// # Errors
///
/// Returns [`GoogleSearchError::Json`] if serialization fails.
pub fn format_results(items: &[SearchItem]) -> Result<String, GoogleSearchError> {
    if items.is_empty() {
        return Ok(NO_RESULTS.to_owned());
    }
    Ok(serde_json::to_string(items)?)
}

/// Parse a search tool result back into hits.
///
/// # Errors
///
/// Returns [`GoogleSearchError::Json`] if `text` is neither the no-results
/// marker nor a JSON array of hits.
pub fn parse_results(text: &str) -> Result<Vec<SearchItem>, GoogleSearchError> {
    if text == NO_RESULTS {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(text)?)
}

/// Google Custom Search client.
#[derive(Debug, Clone)]
pub struct GoogleCustomSearch {
    config: Arc<GoogleSearchConfig>,
    client: Client,
}

impl GoogleCustomSearch {
    /// Create a client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GoogleSearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: GoogleSearchConfig) -> Result<Self, GoogleSearchError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        Ok(Self {
            config: Arc::new(config),
            client: builder.build()?,
        })
    }

    /// Create a client from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`GoogleSearchError::MissingCredentials`] if the credentials
    /// are not set.
    pub fn from_env() -> Result<Self, GoogleSearchError> {
        Self::new(GoogleSearchConfig::from_env()?)
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &GoogleSearchConfig {
        &self.config
    }

    /// Search and return the hits as a JSON array string, or [`NO_RESULTS`].
    ///
    /// # Errors
    ///
    /// Returns [`GoogleSearchError::Status`] on a non-success response, and
    /// transport or decoding errors otherwise.
    pub async fn search(&self, query: &str) -> Result<String, GoogleSearchError> {
        let items = self.search_items(query).await?;
        format_results(&items)
    }

    /// Search and return the hits.
    ///
    /// # Errors
    ///
    /// See [`search`](Self::search).
    pub async fn search_items(&self, query: &str) -> Result<Vec<SearchItem>, GoogleSearchError> {
        let url = self.config.request_url(query)?;
        debug!(query, "Sending Google custom search request");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown").to_owned();
            warn!(status = status.as_u16(), %reason, "Google custom search failed");
            return Err(GoogleSearchError::Status {
                status: status.as_u16(),
                reason,
            });
        }

        let body: SearchResponse = response.json().await?;
        debug!(hits = body.items.len(), "Google custom search returned");
        Ok(body.items)
    }
}

#[async_trait]
impl SearchCapability for GoogleCustomSearch {
    async fn invoke(&self, query: &str) -> Result<Value, InvokeFailure> {
        self.search(query)
            .await
            .map(Value::String)
            .map_err(InvokeFailure::structured)
    }
}

impl Tool for GoogleCustomSearch {
    const NAME: &'static str = "google-custom-search";

    fn description(&self) -> String {
        "a custom search engine. useful for when you need to answer questions about current events. input should be a search query. outputs a JSON array of results."
            .to_owned()
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "input": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["input"]
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(title: &str, snippet: Option<&str>) -> SearchItem {
        SearchItem {
            title: title.to_owned(),
            link: format!("https://example.com/{title}"),
            snippet: snippet.map(str::to_owned),
        }
    }

    mod config {
        use super::*;

        #[test]
        fn request_url_encodes_query() {
            let config = GoogleSearchConfig::new("key-1", "cx-1");
            let url = config
                .request_url("\"AI conferences\" events in \"San Francisco\"")
                .unwrap();

            assert_eq!(url.host_str(), Some("www.googleapis.com"));
            assert_eq!(url.path(), "/customsearch/v1");
            let pairs: Vec<(String, String)> = url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            assert_eq!(pairs[0], ("key".to_owned(), "key-1".to_owned()));
            assert_eq!(pairs[1], ("cx".to_owned(), "cx-1".to_owned()));
            assert_eq!(
                pairs[2].1,
                "\"AI conferences\" events in \"San Francisco\""
            );
        }

        #[test]
        fn invalid_base_url() {
            let config = GoogleSearchConfig::new("k", "c").with_base_url("not a url");
            assert!(matches!(
                config.request_url("q"),
                Err(GoogleSearchError::Url(_))
            ));
        }

        #[test]
        fn missing_credentials_message() {
            assert_eq!(
                GoogleSearchError::MissingCredentials.to_string(),
                "GOOGLE_API_KEY or GOOGLE_CSE_ID is not set. Aborting."
            );
        }
    }

    mod results {
        use super::*;

        #[test]
        fn empty_is_no_results() {
            assert_eq!(format_results(&[]).unwrap(), NO_RESULTS);
            assert!(parse_results(NO_RESULTS).unwrap().is_empty());
        }

        #[test]
        fn formats_json_array_in_field_order() {
            let text = format_results(&[item("a", Some("first")), item("b", None)]).unwrap();
            assert_eq!(
                text,
                r#"[{"title":"a","link":"https://example.com/a","snippet":"first"},{"title":"b","link":"https://example.com/b"}]"#
            );
            assert_eq!(parse_results(&text).unwrap()[1], item("b", None));
        }

        #[test]
        fn parses_api_response_items() {
            let body: SearchResponse = serde_json::from_str(
                r#"{"kind":"customsearch#search","items":[{"title":"Jazz Fest","link":"https://jazz.example","snippet":"June","displayLink":"jazz.example"}]}"#,
            )
            .unwrap();
            assert_eq!(body.items.len(), 1);
            assert_eq!(body.items[0].snippet.as_deref(), Some("June"));
        }

        #[test]
        fn missing_items_is_empty() {
            let body: SearchResponse = serde_json::from_str(r#"{"kind":"x"}"#).unwrap();
            assert!(body.items.is_empty());
        }

        #[test]
        fn status_error_message() {
            let err = GoogleSearchError::Status {
                status: 403,
                reason: "Forbidden".to_owned(),
            };
            assert_eq!(
                err.to_string(),
                "Got 403 error from Google custom search: Forbidden"
            );
        }
    }

    mod event_details {
        use super::*;

        #[test]
        fn derived_from_item() {
            let event = EventDetails::from_item(&item("Jazz Night", Some("Live jazz")), Some("Berlin"));
            assert_eq!(event.title, "Jazz Night");
            assert_eq!(event.description.as_deref(), Some("Live jazz"));
            assert_eq!(event.city.as_deref(), Some("Berlin"));
            assert_eq!(event.source, "https://example.com/Jazz Night");
            assert_eq!(event.raw_result.unwrap()["title"], "Jazz Night");
            assert!(!event.id.is_empty());
        }

        #[test]
        fn serializes_camel_case() {
            let mut event = EventDetails::from_item(&item("x", None), None);
            event.relevance_score = Some(0.5);
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["relevanceScore"], 0.5);
            assert!(value.get("city").is_none());
        }
    }

    mod tool {
        use super::*;

        #[test]
        fn definition() {
            let search = GoogleCustomSearch::new(GoogleSearchConfig::new("k", "c")).unwrap();
            let def = search.definition();
            assert_eq!(def.name, "google-custom-search");
            assert_eq!(def.parameters["required"], json!(["input"]));
            assert!(def.description.contains("current events"));
        }
    }
}
