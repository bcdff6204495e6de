//! Result aggregation
//!
//! Set-once merge of per-operation outcomes into the report. An operation
//! that produced a result is completed (success or partial, depending on
//! its own failed batches); one that aborted is failed. Operations that
//! never reported by finalization are recorded as failed so the report
//! always enumerates every scheduled operation.

use crate::error::{AuditError, AuditResult};
use crate::models::report::{OperationEntry, ReportSummary};
use crate::models::{AuditReport, OperationId, OperationPlan, OperationResult};
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

/// Error text for operations that never reported
const NOT_COMPLETED: &str = "operation did not complete";

#[derive(Debug, Clone)]
pub struct ResultAggregator {
    report: AuditReport,
}

impl ResultAggregator {
    pub fn new(plan: &OperationPlan, audit_timestamp: DateTime<Utc>) -> Self {
        Self {
            report: AuditReport::new(plan, audit_timestamp),
        }
    }

    /// Fold one operation's outcome into the report.
    ///
    /// Returns false, leaving the report untouched, when the operation was
    /// not scheduled or already has an entry.
    pub fn record(&mut self, id: OperationId, outcome: AuditResult<OperationResult>) -> bool {
        if !self.report.audit_operations.contains(&id) {
            warn!(operation = %id, "Ignoring outcome for unscheduled operation");
            return false;
        }
        if self.report.results.contains_key(&id) {
            warn!(operation = %id, "Ignoring duplicate outcome");
            return false;
        }

        let entry = match outcome {
            Ok(result) => {
                let entry = OperationEntry::completed(id, result);
                info!(
                    operation = %id,
                    status = ?entry.status,
                    batches_processed = entry.batches_processed,
                    batches_failed = entry.batches_failed,
                    "Operation completed"
                );
                entry
            }
            Err(err) => {
                let (processed, failed) = match &err {
                    AuditError::Cancelled {
                        batches_processed,
                        batches_failed,
                    } => (*batches_processed, *batches_failed),
                    _ => (0, 0),
                };
                error!(operation = %id, error = %err, "Operation failed");
                OperationEntry::failed(id, err.to_string(), processed, failed)
            }
        };

        self.report.results.insert(id, entry);
        self.report.summary = ReportSummary::from_entries(self.report.results.values());
        true
    }

    /// Operations still without an entry, in plan order
    pub fn pending(&self) -> Vec<OperationId> {
        self.report
            .audit_operations
            .iter()
            .copied()
            .filter(|id| !self.report.results.contains_key(id))
            .collect()
    }

    /// Report as it stands, with only the operations resolved so far
    pub fn snapshot(&self) -> &AuditReport {
        &self.report
    }

    /// Close the report: unresolved operations become failures and the
    /// summary is recomputed over every scheduled operation
    pub fn finalize(mut self, completed_at: DateTime<Utc>) -> AuditReport {
        for id in self.pending() {
            warn!(operation = %id, "Operation never reported, marking failed");
            self.report
                .results
                .insert(id, OperationEntry::failed(id, NOT_COMPLETED.to_string(), 0, 0));
        }
        self.report.summary = ReportSummary::from_entries(self.report.results.values());
        self.report.completed_at = Some(completed_at);
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::report::{BatchStats, DataSummaryResult, OperationStatus};

    fn summary_result() -> OperationResult {
        OperationResult::DataSummary(DataSummaryResult {
            tables: vec![],
            batches: BatchStats::unbatched(),
        })
    }

    fn aggregator(request: &str) -> ResultAggregator {
        ResultAggregator::new(&OperationPlan::parse(request), Utc::now())
    }

    #[test]
    fn test_record_is_set_once() {
        let mut agg = aggregator("8");
        assert!(agg.record(OperationId::DataSummary, Ok(summary_result())));
        assert!(!agg.record(
            OperationId::DataSummary,
            Err(AuditError::Internal("late".to_string()))
        ));
        let entry = agg.snapshot().entry(OperationId::DataSummary).unwrap();
        assert_eq!(entry.status, OperationStatus::Success);
    }

    #[test]
    fn test_record_rejects_unscheduled() {
        let mut agg = aggregator("8");
        assert!(!agg.record(OperationId::ColumnMapping, Ok(summary_result())));
        assert!(agg.snapshot().results.is_empty());
    }

    #[test]
    fn test_cancelled_keeps_batch_counts() {
        let mut agg = aggregator("1");
        agg.record(
            OperationId::MissingValues,
            Err(AuditError::Cancelled {
                batches_processed: 2,
                batches_failed: 1,
            }),
        );
        let entry = agg.snapshot().entry(OperationId::MissingValues).unwrap();
        assert_eq!(entry.status, OperationStatus::Failed);
        assert_eq!(entry.batches_processed, 2);
        assert_eq!(entry.batches_failed, 1);
    }

    #[test]
    fn test_finalize_fills_pending() {
        let mut agg = aggregator("8,9,10");
        agg.record(OperationId::DataSummary, Ok(summary_result()));
        assert_eq!(agg.pending(), vec![OperationId::SavedReports, OperationId::ColumnMapping]);

        let report = agg.finalize(Utc::now());
        assert!(report.is_consistent());
        assert_eq!(report.summary.total_operations, 3);
        assert_eq!(report.summary.operations_completed, 1);
        assert_eq!(report.summary.operations_failed, 2);
        assert!(report.completed_at.is_some());
    }
}
