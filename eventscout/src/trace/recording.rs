//! In-memory trace recorder.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::TraceError;

use super::{BoxedSpan, Span, SpanOptions, SpanUpdate, TraceContext};

/// Everything recorded for one span.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanRecord {
    /// Options the span was opened with.
    pub options: SpanOptions,
    /// Updates in the order they were applied.
    pub updates: Vec<SpanUpdate>,
    /// How many times the span was ended.
    pub end_count: usize,
}

impl SpanRecord {
    /// Returns `true` if the span was ended.
    #[must_use]
    pub const fn is_ended(&self) -> bool {
        self.end_count > 0
    }

    /// Returns the last update, if any.
    #[must_use]
    pub fn last_update(&self) -> Option<&SpanUpdate> {
        self.updates.last()
    }
}

type SharedRecords = Arc<Mutex<Vec<SpanRecord>>>;

fn lock(records: &SharedRecords) -> MutexGuard<'_, Vec<SpanRecord>> {
    records.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A [`TraceContext`] that keeps every span in memory.
///
/// Clones share the same storage, so a clone can be handed to the code under
/// observation while the original is inspected afterwards.
#[derive(Debug, Clone, Default)]
pub struct RecordingTrace {
    records: SharedRecords,
}

impl RecordingTrace {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded spans, in creation order.
    #[must_use]
    pub fn spans(&self) -> Vec<SpanRecord> {
        lock(&self.records).clone()
    }

    /// Number of spans opened so far.
    #[must_use]
    pub fn span_count(&self) -> usize {
        lock(&self.records).len()
    }

    /// Remove all recorded spans.
    pub fn clear(&self) {
        lock(&self.records).clear();
    }
}

impl TraceContext for RecordingTrace {
    fn span(&self, options: SpanOptions) -> Result<BoxedSpan, TraceError> {
        let mut records = lock(&self.records);
        let index = records.len();
        records.push(SpanRecord {
            options,
            updates: Vec::new(),
            end_count: 0,
        });

        Ok(Box::new(RecordedSpan {
            records: Arc::clone(&self.records),
            index,
        }))
    }
}

struct RecordedSpan {
    records: SharedRecords,
    index: usize,
}

impl Span for RecordedSpan {
    fn update(&mut self, update: SpanUpdate) -> Result<(), TraceError> {
        let mut records = lock(&self.records);
        let record = records
            .get_mut(self.index)
            .ok_or_else(|| TraceError::client("span record was cleared"))?;
        record.updates.push(update);
        Ok(())
    }

    fn end(self: Box<Self>) -> Result<(), TraceError> {
        let mut records = lock(&self.records);
        let record = records
            .get_mut(self.index)
            .ok_or_else(|| TraceError::client("span record was cleared"))?;
        record.end_count += 1;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn records_options_updates_and_end() {
        let trace = RecordingTrace::new();
        let mut span = trace
            .span(SpanOptions::new("op").input(json!({"query": "q"})))
            .unwrap();
        span.update(SpanUpdate::output(json!("done"))).unwrap();
        span.end().unwrap();

        let spans = trace.spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].options.input, json!({"query": "q"}));
        assert_eq!(spans[0].updates, vec![SpanUpdate::output(json!("done"))]);
        assert_eq!(spans[0].end_count, 1);
        assert!(spans[0].is_ended());
    }

    #[test]
    fn clones_share_storage() {
        let trace = RecordingTrace::new();
        let handle = trace.clone();
        handle.span(SpanOptions::new("a")).unwrap().end().unwrap();

        assert_eq!(trace.span_count(), 1);
    }

    #[test]
    fn clear_detaches_open_spans() {
        let trace = RecordingTrace::new();
        let mut span = trace.span(SpanOptions::new("a")).unwrap();
        trace.clear();

        assert!(span.update(SpanUpdate::default()).is_err());
        assert!(span.end().is_err());
        assert_eq!(trace.span_count(), 0);
    }
}
