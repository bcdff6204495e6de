//! Operation 1: missing values
//!
//! Local completeness assessment of the active table first, then suggestions
//! for incomplete records from the analysis client, batch by batch.

use super::batched::{run_batched, select_named, BatchCapability, Selection};
use super::{AuditServices, OperationStrategy};
use crate::dataset::loader::blank_cells_by_column;
use crate::error::AuditResult;
use crate::models::findings::SuggestionSet;
use crate::models::report::MissingValuesResult;
use crate::models::{OperationId, OperationResult, TableKind, ToolRecord};
use crate::services::analysis_client::{AnalysisClient, BatchRequest, FieldHints, RecordReply};
use crate::services::completeness::{assess_table, missing_requirements};
use async_trait::async_trait;
use tracing::info;

pub struct MissingValuesStrategy;

struct SuggestMissing;

#[async_trait]
impl BatchCapability for SuggestMissing {
    type Reply = SuggestionSet;

    fn operation(&self) -> OperationId {
        OperationId::MissingValues
    }

    fn select(&self, record: &ToolRecord) -> Selection {
        let missing = missing_requirements(record);
        if missing.is_empty() {
            return Selection::Skip;
        }
        match select_named(record) {
            Selection::Query(payload) => {
                Selection::Query(payload.with_missing(missing.iter().map(|r| r.label().to_string()).collect()))
            }
            other => other,
        }
    }

    async fn query(
        &self,
        client: &dyn AnalysisClient,
        request: &BatchRequest,
        hints: &FieldHints,
    ) -> AuditResult<Vec<RecordReply<SuggestionSet>>> {
        client.suggest_missing(request, hints).await
    }
}

#[async_trait]
impl OperationStrategy for MissingValuesStrategy {
    fn id(&self) -> OperationId {
        OperationId::MissingValues
    }

    async fn run(&self, services: &AuditServices) -> AuditResult<OperationResult> {
        let active = services.dataset.require(TableKind::Active)?;
        let (summary, incomplete_records) = assess_table(&active.records);

        info!(
            total = summary.total_records,
            incomplete = summary.incomplete_records,
            average_completeness = summary.average_completeness,
            "Completeness assessment complete"
        );

        let removed_blank_cells = services.dataset.table(TableKind::Removed).map(blank_cells_by_column);

        let batched = run_batched(&SuggestMissing, services, active).await?;

        Ok(OperationResult::MissingValues(MissingValuesResult {
            summary,
            incomplete_records,
            removed_blank_cells,
            suggestions: batched.findings,
            batches: batched.batches,
        }))
    }
}
