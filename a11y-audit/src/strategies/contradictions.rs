//! Operation 2: category and flag contradictions

use super::batched::{run_batched, select_named, BatchCapability, Selection};
use super::{AuditServices, OperationStrategy};
use crate::error::AuditResult;
use crate::models::findings::ContradictionReport;
use crate::models::report::{ContradictionSummary, ContradictionsResult};
use crate::models::{OperationId, OperationResult, RecordFinding, TableKind, ToolRecord};
use crate::services::analysis_client::{AnalysisClient, BatchRequest, FieldHints, RecordReply};
use async_trait::async_trait;

pub struct ContradictionsStrategy;

struct DetectContradictions;

#[async_trait]
impl BatchCapability for DetectContradictions {
    type Reply = ContradictionReport;

    fn operation(&self) -> OperationId {
        OperationId::Contradictions
    }

    fn select(&self, record: &ToolRecord) -> Selection {
        select_named(record)
    }

    async fn query(
        &self,
        client: &dyn AnalysisClient,
        request: &BatchRequest,
        hints: &FieldHints,
    ) -> AuditResult<Vec<RecordReply<ContradictionReport>>> {
        client.detect_contradictions(request, hints).await
    }
}

fn summarize(findings: &[RecordFinding<ContradictionReport>]) -> ContradictionSummary {
    let mut summary = ContradictionSummary {
        records_analyzed: findings.len(),
        records_with_contradictions: 0,
        total_contradictions: 0,
        unresolved: 0,
    };
    for finding in findings {
        match finding.resolved() {
            Some(report) if !report.contradictions.is_empty() => {
                summary.records_with_contradictions += 1;
                summary.total_contradictions += report.contradictions.len();
            }
            Some(_) => {}
            None => summary.unresolved += 1,
        }
    }
    summary
}

#[async_trait]
impl OperationStrategy for ContradictionsStrategy {
    fn id(&self) -> OperationId {
        OperationId::Contradictions
    }

    async fn run(&self, services: &AuditServices) -> AuditResult<OperationResult> {
        let active = services.dataset.require(TableKind::Active)?;
        let batched = run_batched(&DetectContradictions, services, active).await?;

        Ok(OperationResult::Contradictions(ContradictionsResult {
            summary: summarize(&batched.findings),
            findings: batched.findings,
            batches: batched.batches,
        }))
    }
}
