//! Operation results and the aggregated audit report

use super::findings::{
    CompletenessAssessment, ContradictionReport, DuplicateGroup, FactCheck, RecordFinding,
    ReinstatementCandidate, RemovalCandidate, SuggestionSet,
};
use super::operation::{OperationId, OperationPlan, RejectedOperation};
use super::record::TableKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

// ============================================================================
// Batch accounting
// ============================================================================

/// A batch that exhausted its retry budget or failed permanently
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub batch_index: usize,
    pub first_row: usize,
    pub len: usize,
    pub error: String,
}

/// Per-operation batch counters
///
/// `batches_processed + batches_failed == batches_scheduled` once the
/// operation has produced a result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchStats {
    pub batches_scheduled: usize,
    pub batches_processed: usize,
    pub batches_failed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<BatchFailure>,
}

impl BatchStats {
    /// Counters for an operation that schedules no batches
    pub fn unbatched() -> Self {
        Self::default()
    }

    pub fn scheduled(batches_scheduled: usize) -> Self {
        Self {
            batches_scheduled,
            ..Self::default()
        }
    }

    pub fn record_success(&mut self) {
        self.batches_processed += 1;
    }

    pub fn record_failure(&mut self, failure: BatchFailure) {
        self.batches_failed += 1;
        self.failures.push(failure);
    }

    pub fn is_consistent(&self) -> bool {
        self.batches_processed + self.batches_failed == self.batches_scheduled
    }
}

// ============================================================================
// Per-operation results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletenessSummary {
    pub total_records: usize,
    pub complete_records: usize,
    pub incomplete_records: usize,
    pub average_completeness: f64,
    /// Requirement label → number of records missing it
    pub missing_by_requirement: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingValuesResult {
    pub summary: CompletenessSummary,
    pub incomplete_records: Vec<CompletenessAssessment>,
    /// Source column → blank cell count, for the removed table when loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_blank_cells: Option<BTreeMap<String, usize>>,
    pub suggestions: Vec<RecordFinding<SuggestionSet>>,
    #[serde(flatten)]
    pub batches: BatchStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContradictionSummary {
    pub records_analyzed: usize,
    pub records_with_contradictions: usize,
    pub total_contradictions: usize,
    pub unresolved: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContradictionsResult {
    pub summary: ContradictionSummary,
    pub findings: Vec<RecordFinding<ContradictionReport>>,
    #[serde(flatten)]
    pub batches: BatchStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FactCheckSummary {
    pub records_checked: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub unresolved: usize,
    /// Share of resolved records judged correct
    pub correct_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncorrectInfoResult {
    pub summary: FactCheckSummary,
    pub findings: Vec<RecordFinding<FactCheck>>,
    #[serde(flatten)]
    pub batches: BatchStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicatesResult {
    /// Rows whose every mapped field equals an earlier row, per table
    pub exact_row_duplicates: BTreeMap<TableKind, usize>,
    pub active_groups: Vec<DuplicateGroup>,
    /// Groups over active + removed; empty when the removed table is absent
    pub combined_groups: Vec<DuplicateGroup>,
    pub removed_table_present: bool,
    /// Records left out of similarity checks because they have no name
    pub skipped_nameless: usize,
    #[serde(flatten)]
    pub batches: BatchStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToRemoveResult {
    pub records_checked: usize,
    pub candidates: Vec<RemovalCandidate>,
    #[serde(flatten)]
    pub batches: BatchStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccidentalRemovalResult {
    pub records_checked: usize,
    pub candidates: Vec<ReinstatementCandidate>,
    #[serde(flatten)]
    pub batches: BatchStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub table: TableKind,
    pub present: bool,
    pub total_rows: usize,
    pub columns: Vec<String>,
    pub sample_names: Vec<String>,
    /// Why a table file that exists could not be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSummaryResult {
    pub tables: Vec<TableSummary>,
    #[serde(flatten)]
    pub batches: BatchStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SavedReportsStatus {
    Found,
    NoFiles,
    NoDirectory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedReportInfo {
    pub file_name: String,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedReportsResult {
    pub status: SavedReportsStatus,
    pub directory: String,
    /// Newest first
    pub files: Vec<SavedReportInfo>,
    #[serde(flatten)]
    pub batches: BatchStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableMapping {
    pub table: TableKind,
    /// Logical field key → source column header
    pub fields: BTreeMap<String, String>,
    pub unmapped_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMappingResult {
    pub tables: Vec<TableMapping>,
    #[serde(flatten)]
    pub batches: BatchStats,
}

/// Structured outcome of one operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationResult {
    MissingValues(MissingValuesResult),
    Contradictions(ContradictionsResult),
    IncorrectInfo(IncorrectInfoResult),
    Duplicates(DuplicatesResult),
    ToRemove(ToRemoveResult),
    AccidentalRemoval(AccidentalRemovalResult),
    DataSummary(DataSummaryResult),
    SavedReports(SavedReportsResult),
    ColumnMapping(ColumnMappingResult),
}

impl OperationResult {
    pub fn batches(&self) -> &BatchStats {
        match self {
            OperationResult::MissingValues(r) => &r.batches,
            OperationResult::Contradictions(r) => &r.batches,
            OperationResult::IncorrectInfo(r) => &r.batches,
            OperationResult::Duplicates(r) => &r.batches,
            OperationResult::ToRemove(r) => &r.batches,
            OperationResult::AccidentalRemoval(r) => &r.batches,
            OperationResult::DataSummary(r) => &r.batches,
            OperationResult::SavedReports(r) => &r.batches,
            OperationResult::ColumnMapping(r) => &r.batches,
        }
    }

    /// Partial when any batch failed, success otherwise
    pub fn status(&self) -> OperationStatus {
        if self.batches().batches_failed > 0 {
            OperationStatus::Partial
        } else {
            OperationStatus::Success
        }
    }
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Produced a result with no failed batches
    Success,
    /// Produced a result with at least one failed batch
    Partial,
    /// Aborted before producing a result
    Failed,
}

impl OperationStatus {
    pub fn is_completed(&self) -> bool {
        !matches!(self, OperationStatus::Failed)
    }
}

/// One requested operation in the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationEntry {
    pub operation_id: u8,
    pub status: OperationStatus,
    pub batches_processed: usize,
    pub batches_failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<OperationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationEntry {
    pub fn completed(id: OperationId, result: OperationResult) -> Self {
        let batches = result.batches();
        Self {
            operation_id: id.number(),
            status: result.status(),
            batches_processed: batches.batches_processed,
            batches_failed: batches.batches_failed,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(
        id: OperationId,
        error: String,
        batches_processed: usize,
        batches_failed: usize,
    ) -> Self {
        Self {
            operation_id: id.number(),
            status: OperationStatus::Failed,
            batches_processed,
            batches_failed,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total_operations: usize,
    /// Success + partial
    pub operations_completed: usize,
    pub operations_failed: usize,
    /// Completed operations with at least one failed batch
    pub operations_partial: usize,
}

impl ReportSummary {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a OperationEntry>) -> Self {
        let mut summary = ReportSummary::default();
        for entry in entries {
            summary.total_operations += 1;
            match entry.status {
                OperationStatus::Success => summary.operations_completed += 1,
                OperationStatus::Partial => {
                    summary.operations_completed += 1;
                    summary.operations_partial += 1;
                }
                OperationStatus::Failed => summary.operations_failed += 1,
            }
        }
        summary
    }
}

/// Root artifact of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditReport {
    pub run_id: Uuid,
    pub audit_timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Raw request tokens
    pub requested_operations: Vec<String>,
    /// Operations actually scheduled
    pub audit_operations: Vec<OperationId>,
    pub rejected_operations: Vec<RejectedOperation>,
    pub results: BTreeMap<OperationId, OperationEntry>,
    pub summary: ReportSummary,
}

impl AuditReport {
    /// Empty report for a plan; entries are filled as operations resolve
    pub fn new(plan: &OperationPlan, audit_timestamp: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            audit_timestamp,
            completed_at: None,
            requested_operations: plan.requested.clone(),
            audit_operations: plan.operations.clone(),
            rejected_operations: plan.rejected.clone(),
            results: BTreeMap::new(),
            summary: ReportSummary::default(),
        }
    }

    pub fn entry(&self, id: OperationId) -> Option<&OperationEntry> {
        self.results.get(&id)
    }

    pub fn result(&self, id: OperationId) -> Option<&OperationResult> {
        self.entry(id).and_then(|e| e.result.as_ref())
    }

    /// Summary counts agree with the entries and every scheduled operation
    /// has exactly one entry
    pub fn is_consistent(&self) -> bool {
        let s = &self.summary;
        s.operations_completed + s.operations_failed == s.total_operations
            && s.total_operations == self.audit_operations.len()
            && self.audit_operations.iter().all(|id| self.results.contains_key(id))
            && self.results.len() == self.audit_operations.len()
            && *s == ReportSummary::from_entries(self.results.values())
    }
}
