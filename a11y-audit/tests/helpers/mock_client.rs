//! Scripted analysis client
//!
//! Answers every queried record unless told otherwise. Batches can be made
//! to fail (transiently or permanently), to stall, or to answer with
//! malformed or missing replies for chosen rows.

use a11y_audit::error::{AuditError, AuditResult};
use a11y_audit::models::findings::{ContradictionReport, FactCheck, SuggestionSet};
use a11y_audit::services::{AnalysisClient, BatchRequest, FieldHints, RecordReply};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct MockClient {
    transient_batches: HashSet<usize>,
    permanent_batches: HashSet<usize>,
    /// Transient failures before a batch succeeds
    flaky_batches: HashMap<usize, usize>,
    delays: HashMap<usize, Duration>,
    /// Quota wait before every call
    ready_delay: Option<Duration>,
    malformed_rows: HashSet<usize>,
    silent_rows: HashSet<usize>,
    incorrect_rows: HashSet<usize>,
    calls: AtomicUsize,
    calls_per_batch: Mutex<HashMap<usize, usize>>,
    queried_rows: Mutex<Vec<usize>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batch always fails with a transient error
    pub fn failing_batch(mut self, index: usize) -> Self {
        self.transient_batches.insert(index);
        self
    }

    /// Batch always fails with a permanent error
    pub fn rejecting_batch(mut self, index: usize) -> Self {
        self.permanent_batches.insert(index);
        self
    }

    /// Batch fails transiently `failures` times, then succeeds
    pub fn flaky_batch(mut self, index: usize, failures: usize) -> Self {
        self.flaky_batches.insert(index, failures);
        self
    }

    pub fn delayed_batch(mut self, index: usize, delay: Duration) -> Self {
        self.delays.insert(index, delay);
        self
    }

    /// Every call waits this long for quota before it starts
    pub fn throttled(mut self, delay: Duration) -> Self {
        self.ready_delay = Some(delay);
        self
    }

    pub fn malformed_row(mut self, row: usize) -> Self {
        self.malformed_rows.insert(row);
        self
    }

    /// Row gets no reply at all
    pub fn silent_row(mut self, row: usize) -> Self {
        self.silent_rows.insert(row);
        self
    }

    /// Fact check for the row reports incorrect information
    pub fn incorrect_row(mut self, row: usize) -> Self {
        self.incorrect_rows.insert(row);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for_batch(&self, index: usize) -> usize {
        self.calls_per_batch
            .lock()
            .unwrap()
            .get(&index)
            .copied()
            .unwrap_or(0)
    }

    /// Every row sent to the client, in call order
    pub fn queried_rows(&self) -> Vec<usize> {
        self.queried_rows.lock().unwrap().clone()
    }

    async fn answer<T>(
        &self,
        batch: &BatchRequest,
        reply: impl Fn(usize, &str) -> T,
    ) -> AuditResult<Vec<RecordReply<T>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let attempt = {
            let mut per_batch = self.calls_per_batch.lock().unwrap();
            let count = per_batch.entry(batch.batch_index).or_insert(0);
            *count += 1;
            *count
        };
        self.queried_rows
            .lock()
            .unwrap()
            .extend(batch.records.iter().map(|r| r.row_index));

        if let Some(delay) = self.delays.get(&batch.batch_index) {
            tokio::time::sleep(*delay).await;
        }
        if self.transient_batches.contains(&batch.batch_index) {
            return Err(AuditError::TransientExternal(format!(
                "HTTP 503 for batch {}",
                batch.batch_index
            )));
        }
        if self.permanent_batches.contains(&batch.batch_index) {
            return Err(AuditError::PermanentExternal("HTTP 401: bad key".to_string()));
        }
        if let Some(failures) = self.flaky_batches.get(&batch.batch_index) {
            if attempt <= *failures {
                return Err(AuditError::TransientExternal("HTTP 429".to_string()));
            }
        }

        Ok(batch
            .records
            .iter()
            .filter(|r| !self.silent_rows.contains(&r.row_index))
            .map(|r| {
                if self.malformed_rows.contains(&r.row_index) {
                    RecordReply::Malformed {
                        row_index: Some(r.row_index),
                        reason: "missing field `suggestions`".to_string(),
                    }
                } else {
                    RecordReply::Parsed(reply(r.row_index, &r.tool_name))
                }
            })
            .collect())
    }
}

#[async_trait]
impl AnalysisClient for MockClient {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn ready(&self) {
        if let Some(delay) = self.ready_delay {
            tokio::time::sleep(delay).await;
        }
    }

    async fn suggest_missing(
        &self,
        batch: &BatchRequest,
        _hints: &FieldHints,
    ) -> AuditResult<Vec<RecordReply<SuggestionSet>>> {
        let missing: HashMap<usize, Vec<String>> = batch
            .records
            .iter()
            .map(|r| (r.row_index, r.missing_requirements.clone()))
            .collect();
        self.answer(batch, |row_index, name| SuggestionSet {
            tool_name: name.to_string(),
            row_index,
            missing_requirements: missing.get(&row_index).cloned().unwrap_or_default(),
            suggestions: vec![],
        })
        .await
    }

    async fn detect_contradictions(
        &self,
        batch: &BatchRequest,
        _hints: &FieldHints,
    ) -> AuditResult<Vec<RecordReply<ContradictionReport>>> {
        self.answer(batch, |row_index, name| ContradictionReport {
            tool_name: name.to_string(),
            row_index,
            contradictions: vec![],
        })
        .await
    }

    async fn verify_facts(
        &self,
        batch: &BatchRequest,
        _hints: &FieldHints,
    ) -> AuditResult<Vec<RecordReply<FactCheck>>> {
        self.answer(batch, |row_index, name| FactCheck {
            tool_name: name.to_string(),
            row_index,
            id_tag: None,
            is_information_correct: !self.incorrect_rows.contains(&row_index),
            incorrect_information: vec![],
        })
        .await
    }
}
