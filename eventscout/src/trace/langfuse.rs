//! Langfuse tracing client.
//!
//! Spans are queued locally as ingestion events and sent in one batch by
//! [`Langfuse::flush`]. Creating and updating spans never touches the network.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::TraceError;

use super::{BoxedSpan, Span, SpanOptions, SpanUpdate, TraceContext};

/// Configuration for the Langfuse client.
#[derive(Debug, Clone)]
pub struct LangfuseConfig {
    /// Public key (basic auth user name).
    pub public_key: String,
    /// Secret key (basic auth password).
    pub secret_key: String,
    /// Base URL of the Langfuse instance.
    pub host: String,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Upper bound on buffered events; the oldest are dropped beyond it.
    pub max_queued_events: usize,
}

impl LangfuseConfig {
    /// Default value of [`LangfuseConfig::max_queued_events`].
    pub const DEFAULT_MAX_QUEUED_EVENTS: usize = 10_000;

    /// Creates a configuration from explicit credentials.
    #[must_use]
    pub fn new(
        public_key: impl Into<String>,
        secret_key: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            public_key: public_key.into(),
            secret_key: secret_key.into(),
            host: host.into(),
            timeout_secs: Some(30),
            max_queued_events: Self::DEFAULT_MAX_QUEUED_EVENTS,
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Reads `LANGFUSE_SECRET_KEY`, `LANGFUSE_PUBLIC_KEY` and `LANGFUSE_HOST`.
    /// Returns `None` unless all three are set and non-empty.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let secret_key = var("LANGFUSE_SECRET_KEY")?;
        let public_key = var("LANGFUSE_PUBLIC_KEY")?;
        let host = var("LANGFUSE_HOST")?;

        Some(Self::new(public_key, secret_key, host))
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Sets the buffered event limit.
    #[must_use]
    pub const fn with_max_queued_events(mut self, max: usize) -> Self {
        self.max_queued_events = max;
        self
    }

    /// URL of the batch ingestion endpoint.
    #[must_use]
    pub fn ingestion_url(&self) -> String {
        format!("{}/api/public/ingestion", self.host.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, Serialize)]
struct IngestionEvent {
    id: String,
    timestamp: String,
    #[serde(rename = "type")]
    kind: &'static str,
    body: Value,
}

impl IngestionEvent {
    fn new(kind: &'static str, body: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: now(),
            kind,
            body,
        }
    }
}

type Queue = Arc<Mutex<Vec<IngestionEvent>>>;

fn lock(queue: &Queue) -> MutexGuard<'_, Vec<IngestionEvent>> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Langfuse client.
///
/// Cheap to clone; clones share the event queue.
#[derive(Debug, Clone)]
pub struct Langfuse {
    config: Arc<LangfuseConfig>,
    client: Client,
    queue: Queue,
}

impl Langfuse {
    /// Create a client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::Http`] if the HTTP client cannot be built.
    pub fn new(config: LangfuseConfig) -> Result<Self, TraceError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        Ok(Self {
            config: Arc::new(config),
            client: builder.build()?,
            queue: Arc::default(),
        })
    }

    /// Create a client from environment variables, if they are all present.
    ///
    /// Missing variables or a failed initialization disable tracing with a
    /// warning instead of failing.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let Some(config) = LangfuseConfig::from_env() else {
            warn!(
                "Langfuse environment variables (LANGFUSE_SECRET_KEY, LANGFUSE_PUBLIC_KEY, LANGFUSE_HOST) are not fully set. Langfuse tracing will be disabled."
            );
            return None;
        };

        match Self::new(config) {
            Ok(client) => {
                info!(host = %client.config.host, "Langfuse initialized successfully.");
                Some(client)
            }
            Err(e) => {
                error!(error = %e, "Failed to initialize Langfuse");
                warn!("Langfuse tracing will be disabled due to initialization error.");
                None
            }
        }
    }

    /// Get the configured host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Start a new trace.
    #[must_use]
    pub fn trace(&self, name: impl Into<String>, input: Option<Value>) -> LangfuseTrace {
        let id = Uuid::new_v4().to_string();
        let mut body = Map::new();
        body.insert("id".to_owned(), Value::String(id.clone()));
        body.insert("name".to_owned(), Value::String(name.into()));
        body.insert("timestamp".to_owned(), Value::String(now()));
        if let Some(input) = input {
            body.insert("input".to_owned(), input);
        }

        lock(&self.queue).push(IngestionEvent::new("trace-create", Value::Object(body)));

        LangfuseTrace {
            id,
            queue: Arc::clone(&self.queue),
        }
    }

    /// Number of events waiting to be sent.
    #[must_use]
    pub fn pending(&self) -> usize {
        lock(&self.queue).len()
    }

    /// Send all queued events and return how many were sent.
    ///
    /// On failure the events are put back at the front of the queue, ahead
    /// of anything queued meanwhile. If that exceeds
    /// [`LangfuseConfig::max_queued_events`], the oldest events are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::Http`] on transport failures and
    /// [`TraceError::Rejected`] on a non-success status.
    pub async fn flush(&self) -> Result<usize, TraceError> {
        let batch = std::mem::take(&mut *lock(&self.queue));
        if batch.is_empty() {
            return Ok(0);
        }

        let count = batch.len();
        debug!(events = count, "Flushing Langfuse events");

        match self.send(&batch).await {
            Ok(()) => Ok(count),
            Err(e) => {
                self.requeue(batch);
                Err(e)
            }
        }
    }

    fn requeue(&self, batch: Vec<IngestionEvent>) {
        let mut queue = lock(&self.queue);
        let newer = std::mem::replace(&mut *queue, batch);
        queue.extend(newer);

        let overflow = queue.len().saturating_sub(self.config.max_queued_events);
        if overflow > 0 {
            queue.drain(..overflow);
            warn!(
                dropped = overflow,
                limit = self.config.max_queued_events,
                "Langfuse queue full, dropping oldest events"
            );
        }
    }

    async fn send(&self, batch: &[IngestionEvent]) -> Result<(), TraceError> {
        let response = self
            .client
            .post(self.config.ingestion_url())
            .basic_auth(&self.config.public_key, Some(&self.config.secret_key))
            .json(&json!({ "batch": batch }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => format!("<unreadable response body: {e}>"),
            };
            return Err(TraceError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

/// A Langfuse trace; produces spans attached to it.
#[derive(Debug, Clone)]
pub struct LangfuseTrace {
    id: String,
    queue: Queue,
}

impl LangfuseTrace {
    /// Trace identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl TraceContext for LangfuseTrace {
    fn span(&self, options: SpanOptions) -> Result<BoxedSpan, TraceError> {
        let id = Uuid::new_v4().to_string();
        let body = json!({
            "id": id,
            "traceId": self.id,
            "name": options.name,
            "startTime": now(),
            "input": options.input,
            "metadata": options.metadata,
        });
        lock(&self.queue).push(IngestionEvent::new("span-create", body));

        Ok(Box::new(LangfuseSpan {
            id,
            trace_id: self.id.clone(),
            queue: Arc::clone(&self.queue),
        }))
    }
}

struct LangfuseSpan {
    id: String,
    trace_id: String,
    queue: Queue,
}

impl LangfuseSpan {
    fn base_body(&self) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("id".to_owned(), Value::String(self.id.clone()));
        body.insert("traceId".to_owned(), Value::String(self.trace_id.clone()));
        body
    }
}

impl Span for LangfuseSpan {
    fn update(&mut self, update: SpanUpdate) -> Result<(), TraceError> {
        let mut body = self.base_body();
        if let Some(level) = update.level {
            body.insert("level".to_owned(), Value::String(level.as_str().to_owned()));
        }
        if let Some(message) = update.status_message {
            body.insert("statusMessage".to_owned(), Value::String(message));
        }
        if let Some(output) = update.output {
            body.insert("output".to_owned(), output);
        }

        lock(&self.queue).push(IngestionEvent::new("span-update", Value::Object(body)));
        Ok(())
    }

    fn end(self: Box<Self>) -> Result<(), TraceError> {
        let mut body = self.base_body();
        body.insert("endTime".to_owned(), Value::String(now()));

        lock(&self.queue).push(IngestionEvent::new("span-update", Value::Object(body)));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> Langfuse {
        Langfuse::new(LangfuseConfig::new("pk-test", "sk-test", "http://localhost:3000/")).unwrap()
    }

    fn events(client: &Langfuse) -> Vec<IngestionEvent> {
        lock(&client.queue).clone()
    }

    #[test]
    fn ingestion_url_strips_trailing_slash() {
        let config = LangfuseConfig::new("pk", "sk", "https://cloud.langfuse.com/");
        assert_eq!(
            config.ingestion_url(),
            "https://cloud.langfuse.com/api/public/ingestion"
        );
    }

    #[test]
    fn config_builder() {
        let config = LangfuseConfig::new("pk", "sk", "http://h").with_timeout(5);
        assert_eq!(config.timeout_secs, Some(5));
        assert_eq!(
            config.max_queued_events,
            LangfuseConfig::DEFAULT_MAX_QUEUED_EVENTS
        );
        assert_eq!(config.public_key, "pk");
    }

    #[test]
    fn trace_queues_trace_create() {
        let client = client();
        let trace = client.trace("event-search", Some(json!({"field": "Jazz"})));

        let events = events(&client);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "trace-create");
        assert_eq!(events[0].body["id"], json!(trace.id()));
        assert_eq!(events[0].body["name"], json!("event-search"));
        assert_eq!(events[0].body["input"], json!({"field": "Jazz"}));
    }

    #[test]
    fn span_lifecycle_queues_events() {
        let client = client();
        let trace = client.trace("t", None);

        let mut span = trace
            .span(
                SpanOptions::new("google-custom-search-invoke")
                    .input(json!({"query": "q"}))
                    .metadata(json!({"tool": "GoogleCustomSearch"})),
            )
            .unwrap();
        span.update(SpanUpdate::error("Invoke failed", json!({"error": "boom"})))
            .unwrap();
        span.end().unwrap();

        let events = events(&client);
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, ["trace-create", "span-create", "span-update", "span-update"]);

        let create = &events[1].body;
        assert_eq!(create["traceId"], json!(trace.id()));
        assert_eq!(create["name"], json!("google-custom-search-invoke"));
        assert_eq!(create["input"], json!({"query": "q"}));

        let update = &events[2].body;
        assert_eq!(update["id"], create["id"]);
        assert_eq!(update["level"], json!("ERROR"));
        assert_eq!(update["statusMessage"], json!("Invoke failed"));
        assert_eq!(update["output"], json!({"error": "boom"}));

        let end = &events[3].body;
        assert_eq!(end["id"], create["id"]);
        assert!(end["endTime"].is_string());
        assert!(end.get("level").is_none());
    }

    #[test]
    fn event_serializes_type_field() {
        let event = IngestionEvent::new("span-create", json!({}));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], json!("span-create"));
        assert!(value["id"].is_string());
        assert!(value["timestamp"].is_string());
    }

    #[tokio::test]
    async fn flush_with_empty_queue_is_noop() {
        let client = client();
        assert_eq!(client.flush().await.unwrap(), 0);
        assert_eq!(client.pending(), 0);
    }

    #[tokio::test]
    async fn failed_flush_restores_batch_ahead_of_newer_events() {
        let client = Langfuse::new(
            LangfuseConfig::new("pk", "sk", "http://127.0.0.1:1").with_timeout(2),
        )
        .unwrap();
        let trace = client.trace("first", None);
        trace.span(SpanOptions::new("s")).unwrap();
        assert_eq!(client.pending(), 2);

        let err = client.flush().await.unwrap_err();
        assert!(matches!(err, TraceError::Http(_)));
        assert_eq!(client.pending(), 2);

        let later = client.trace("later", None);
        let events = events(&client);
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, ["trace-create", "span-create", "trace-create"]);
        assert_eq!(events[0].body["id"], json!(trace.id()));
        assert_eq!(events[2].body["id"], json!(later.id()));
    }

    #[test]
    fn requeue_drops_oldest_beyond_limit() {
        let client = Langfuse::new(
            LangfuseConfig::new("pk", "sk", "http://h").with_max_queued_events(3),
        )
        .unwrap();
        let newer = client.trace("newer", None);

        let batch: Vec<_> = (0..3)
            .map(|i| IngestionEvent::new("trace-create", json!({ "id": i })))
            .collect();
        client.requeue(batch);

        let events = events(&client);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].body["id"], json!(1));
        assert_eq!(events[1].body["id"], json!(2));
        assert_eq!(events[2].body["id"], json!(newer.id()));
    }

    #[test]
    fn clones_share_queue() {
        let client = client();
        let clone = client.clone();
        let _trace = clone.trace("t", None);
        assert_eq!(client.pending(), 1);
    }
}
