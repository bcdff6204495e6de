//! Operation 3: factual accuracy checks against the vendor's own material

use super::batched::{run_batched, select_named, BatchCapability, Selection};
use super::{AuditServices, OperationStrategy};
use crate::error::AuditResult;
use crate::models::findings::FactCheck;
use crate::models::report::{FactCheckSummary, IncorrectInfoResult};
use crate::models::{OperationId, OperationResult, RecordFinding, TableKind, ToolRecord};
use crate::services::analysis_client::{AnalysisClient, BatchRequest, FieldHints, RecordReply};
use async_trait::async_trait;

pub struct IncorrectInfoStrategy;

struct VerifyFacts;

#[async_trait]
impl BatchCapability for VerifyFacts {
    type Reply = FactCheck;

    fn operation(&self) -> OperationId {
        OperationId::IncorrectInfo
    }

    fn select(&self, record: &ToolRecord) -> Selection {
        select_named(record)
    }

    async fn query(
        &self,
        client: &dyn AnalysisClient,
        request: &BatchRequest,
        hints: &FieldHints,
    ) -> AuditResult<Vec<RecordReply<FactCheck>>> {
        client.verify_facts(request, hints).await
    }
}

/// Percentage is over resolved records only
fn summarize(findings: &[RecordFinding<FactCheck>]) -> FactCheckSummary {
    let mut correct = 0;
    let mut incorrect = 0;
    let mut unresolved = 0;
    for finding in findings {
        match finding.resolved() {
            Some(check) if check.is_information_correct => correct += 1,
            Some(_) => incorrect += 1,
            None => unresolved += 1,
        }
    }
    let resolved = correct + incorrect;
    let correct_percentage = if resolved == 0 {
        0.0
    } else {
        (correct as f64 / resolved as f64 * 10000.0).round() / 100.0
    };
    FactCheckSummary {
        records_checked: findings.len(),
        correct,
        incorrect,
        unresolved,
        correct_percentage,
    }
}

#[async_trait]
impl OperationStrategy for IncorrectInfoStrategy {
    fn id(&self) -> OperationId {
        OperationId::IncorrectInfo
    }

    async fn run(&self, services: &AuditServices) -> AuditResult<OperationResult> {
        let active = services.dataset.require(TableKind::Active)?;
        let batched = run_batched(&VerifyFacts, services, active).await?;

        Ok(OperationResult::IncorrectInfo(IncorrectInfoResult {
            summary: summarize(&batched.findings),
            findings: batched.findings,
            batches: batched.batches,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(row_index: usize, correct: bool) -> RecordFinding<FactCheck> {
        RecordFinding::Resolved(FactCheck {
            tool_name: format!("Tool {}", row_index),
            row_index,
            id_tag: None,
            is_information_correct: correct,
            incorrect_information: vec![],
        })
    }

    #[test]
    fn test_summarize_excludes_unresolved_from_percentage() {
        let findings = vec![
            check(0, true),
            check(1, true),
            check(2, false),
            RecordFinding::Unresolved {
                row_index: 3,
                tool_name: "Tool 3".to_string(),
                reason: "no reply".to_string(),
            },
        ];
        let summary = summarize(&findings);
        assert_eq!(summary.records_checked, 4);
        assert_eq!(summary.correct, 2);
        assert_eq!(summary.incorrect, 1);
        assert_eq!(summary.unresolved, 1);
        assert_eq!(summary.correct_percentage, 66.67);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary.records_checked, 0);
        assert_eq!(summary.correct_percentage, 0.0);
    }
}
