//! Batched strategy runner
//!
//! # Algorithm
//! 1. Partition the table with the configured batch size
//! 2. Per batch, select which records to query; records the operation
//!    cannot use become "unresolved" without leaving the batch
//! 3. Call the capability under a per-call timeout, retried per
//!    [`RetryPolicy`]; a batch with nothing to query makes no call
//! 4. Match replies to records by `row_index`; missing or malformed replies
//!    degrade only their record
//! 5. Batches run with bounded concurrency through `buffered`, so results
//!    arrive in batch order regardless of completion order
//!
//! A batch that exhausts its retries counts in `batches_failed` and
//! contributes no findings; remaining batches continue. Cancellation
//! abandons in-flight batches and fails the operation with the counts so far.

use super::AuditServices;
use crate::dataset::ToolTable;
use crate::error::{AuditError, AuditResult};
use crate::models::report::{BatchFailure, BatchStats};
use crate::models::{Batch, OperationId, RecordFinding, RecordKeyed, ToolRecord};
use crate::services::analysis_client::{AnalysisClient, BatchRequest, FieldHints, RecordPayload, RecordReply};
use crate::services::partitioner::partition;
use crate::services::retry::{retry_with_backoff, timeout_error, RetryPolicy};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What to do with one record of a batch
#[derive(Debug)]
pub enum Selection {
    /// Send to the analysis client
    Query(RecordPayload),
    /// Nothing to ask about this record; no finding is produced
    Skip,
    /// Record cannot be analyzed; reported as unresolved
    Malformed(AuditError),
}

/// The operation-specific part of a batched strategy
#[async_trait]
pub trait BatchCapability: Send + Sync {
    type Reply: RecordKeyed + Send + Sync + 'static;

    fn operation(&self) -> OperationId;

    fn select(&self, record: &ToolRecord) -> Selection;

    async fn query(
        &self,
        client: &dyn AnalysisClient,
        request: &BatchRequest,
        hints: &FieldHints,
    ) -> AuditResult<Vec<RecordReply<Self::Reply>>>;
}

/// Findings of a batched operation, in record order
#[derive(Debug)]
pub struct BatchedFindings<T> {
    pub findings: Vec<RecordFinding<T>>,
    pub batches: BatchStats,
}

struct BatchOutcome<T> {
    index: usize,
    first_row: usize,
    len: usize,
    result: AuditResult<Vec<RecordFinding<T>>>,
}

enum Slot<T> {
    Queried { row_index: usize, tool_name: String },
    Done(RecordFinding<T>),
}

/// Run a capability over every batch of `table`
pub async fn run_batched<C: BatchCapability>(
    capability: &C,
    services: &AuditServices,
    table: &ToolTable,
) -> AuditResult<BatchedFindings<C::Reply>> {
    let operation = capability.operation();
    let client = services.client()?;
    let hints = FieldHints::from_mapping(&table.mapping);
    let batches = partition(table.kind, &table.records, services.settings.batch_size());
    let total = batches.len();
    let timeout = services.settings.call_timeout();
    let concurrency = services.settings.max_concurrent_batches.max(1);

    info!(
        operation = %operation,
        client = client.name(),
        table = %table.kind,
        records = table.len(),
        batches = total,
        "Starting batched operation"
    );

    let mut stats = BatchStats::scheduled(total);
    let mut findings = Vec::new();

    let pending: Vec<_> = batches
        .into_iter()
        .map(|batch| process_batch(capability, &**client, &hints, batch, total, &services.retry, timeout))
        .collect();
    let mut outcomes = stream::iter(pending).buffered(concurrency);

    loop {
        tokio::select! {
            biased;
            _ = services.cancel.cancelled() => {
                warn!(
                    operation = %operation,
                    batches_processed = stats.batches_processed,
                    batches_failed = stats.batches_failed,
                    "Operation cancelled, abandoning in-flight batches"
                );
                return Err(AuditError::Cancelled {
                    batches_processed: stats.batches_processed,
                    batches_failed: stats.batches_failed,
                });
            }
            next = outcomes.next() => {
                let Some(outcome) = next else { break };
                match outcome.result {
                    Ok(batch_findings) => {
                        debug!(
                            operation = %operation,
                            batch = outcome.index,
                            findings = batch_findings.len(),
                            "Batch processed"
                        );
                        stats.record_success();
                        findings.extend(batch_findings);
                    }
                    Err(e) => {
                        warn!(
                            operation = %operation,
                            batch = outcome.index,
                            first_row = outcome.first_row,
                            error = %e,
                            "Batch failed, continuing with remaining batches"
                        );
                        stats.record_failure(BatchFailure {
                            batch_index: outcome.index,
                            first_row: outcome.first_row,
                            len: outcome.len,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }
    }

    info!(
        operation = %operation,
        batches_processed = stats.batches_processed,
        batches_failed = stats.batches_failed,
        findings = findings.len(),
        "Batched operation complete"
    );

    Ok(BatchedFindings {
        findings,
        batches: stats,
    })
}

async fn process_batch<C: BatchCapability>(
    capability: &C,
    client: &dyn AnalysisClient,
    hints: &FieldHints,
    batch: Batch<'_>,
    total_batches: usize,
    policy: &RetryPolicy,
    timeout: Duration,
) -> BatchOutcome<C::Reply> {
    let mut slots = Vec::with_capacity(batch.len());
    let mut payloads = Vec::new();

    for record in batch.records {
        match capability.select(record) {
            Selection::Query(payload) => {
                slots.push(Slot::Queried {
                    row_index: record.row_index,
                    tool_name: payload.tool_name.clone(),
                });
                payloads.push(payload);
            }
            Selection::Skip => {}
            Selection::Malformed(err) => slots.push(Slot::Done(RecordFinding::Unresolved {
                row_index: record.row_index,
                tool_name: record.display_name(),
                reason: err.to_string(),
            })),
        }
    }

    let outcome = |result| BatchOutcome {
        index: batch.index,
        first_row: batch.offset,
        len: batch.len(),
        result,
    };

    if payloads.is_empty() {
        return outcome(Ok(reconcile(slots, Vec::new())));
    }

    let operation = capability.operation();
    let name = operation.name();
    let request = BatchRequest::new(operation, &batch, total_batches, payloads);
    let request = &request;

    let replies = retry_with_backoff(name, policy, move || async move {
        // Quota wait is outside the per-call timeout
        client.ready().await;
        match tokio::time::timeout(timeout, capability.query(client, request, hints)).await {
            Ok(result) => result,
            Err(_) => Err(timeout_error(name, timeout)),
        }
    })
    .await;

    outcome(replies.map(|replies| reconcile(slots, replies)))
}

/// Match replies to queried records by `row_index`, in record order
fn reconcile<T: RecordKeyed>(slots: Vec<Slot<T>>, replies: Vec<RecordReply<T>>) -> Vec<RecordFinding<T>> {
    let mut parsed: HashMap<usize, T> = HashMap::new();
    let mut malformed: HashMap<usize, String> = HashMap::new();

    for reply in replies {
        match reply {
            RecordReply::Parsed(finding) => {
                parsed.entry(finding.row_index()).or_insert(finding);
            }
            RecordReply::Malformed {
                row_index: Some(row_index),
                reason,
            } => {
                malformed.entry(row_index).or_insert(reason);
            }
            RecordReply::Malformed { row_index: None, reason } => {
                debug!(reason = %reason, "Dropping malformed reply without row_index");
            }
        }
    }

    slots
        .into_iter()
        .map(|slot| match slot {
            Slot::Done(finding) => finding,
            Slot::Queried { row_index, tool_name } => match parsed.remove(&row_index) {
                Some(finding) => RecordFinding::Resolved(finding),
                None => {
                    let reason = malformed
                        .remove(&row_index)
                        .unwrap_or_else(|| "no reply for record".to_string());
                    RecordFinding::Unresolved {
                        row_index,
                        tool_name,
                        reason: AuditError::MalformedRecord { row_index, reason }.to_string(),
                    }
                }
            },
        })
        .collect()
}

/// Selection for capabilities that need only a product name
pub fn select_named(record: &ToolRecord) -> Selection {
    match RecordPayload::from_record(record) {
        Some(payload) => Selection::Query(payload),
        None => Selection::Malformed(AuditError::MalformedRecord {
            row_index: record.row_index,
            reason: "record has no product name".to_string(),
        }),
    }
}
