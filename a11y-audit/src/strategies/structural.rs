//! Operations 4-6: whole-dataset structural checks
//!
//! Each runs once over the full table set on a blocking worker. No batches,
//! no external calls, no retries; any error fails the operation as a whole.

use super::{AuditServices, OperationStrategy};
use crate::dataset::DatasetView;
use crate::error::{AuditError, AuditResult};
use crate::models::{OperationId, OperationResult};
use crate::services::removal_checker::{check_accidental_removals, check_to_remove};
use crate::services::DuplicateAnalyzer;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Run `analysis` on a blocking worker, abandoning it on cancellation
async fn run_whole_dataset<F>(id: OperationId, services: &AuditServices, analysis: F) -> AuditResult<OperationResult>
where
    F: FnOnce(&DatasetView) -> AuditResult<OperationResult> + Send + 'static,
{
    let dataset = Arc::clone(&services.dataset);
    debug!(operation = %id, "Starting whole-dataset analysis");

    let handle = tokio::task::spawn_blocking(move || analysis(&dataset));

    let result = tokio::select! {
        biased;
        _ = services.cancel.cancelled() => {
            return Err(AuditError::Cancelled {
                batches_processed: 0,
                batches_failed: 0,
            });
        }
        joined = handle => joined.map_err(|e| AuditError::Internal(format!("{} worker failed: {}", id.name(), e)))??,
    };

    info!(operation = %id, "Whole-dataset analysis complete");
    Ok(result)
}

pub struct DuplicatesStrategy;

#[async_trait]
impl OperationStrategy for DuplicatesStrategy {
    fn id(&self) -> OperationId {
        OperationId::Duplicates
    }

    async fn run(&self, services: &AuditServices) -> AuditResult<OperationResult> {
        let analyzer = DuplicateAnalyzer::with_thresholds(services.settings.similarity.clone());
        run_whole_dataset(self.id(), services, move |view| {
            analyzer.analyze(view).map(OperationResult::Duplicates)
        })
        .await
    }
}

pub struct ToRemoveStrategy;

#[async_trait]
impl OperationStrategy for ToRemoveStrategy {
    fn id(&self) -> OperationId {
        OperationId::ToRemove
    }

    async fn run(&self, services: &AuditServices) -> AuditResult<OperationResult> {
        run_whole_dataset(self.id(), services, |view| {
            check_to_remove(view).map(OperationResult::ToRemove)
        })
        .await
    }
}

pub struct AccidentalRemovalStrategy;

#[async_trait]
impl OperationStrategy for AccidentalRemovalStrategy {
    fn id(&self) -> OperationId {
        OperationId::AccidentalRemoval
    }

    async fn run(&self, services: &AuditServices) -> AuditResult<OperationResult> {
        let thresholds = services.settings.similarity.clone();
        run_whole_dataset(self.id(), services, move |view| {
            check_accidental_removals(view, &thresholds).map(OperationResult::AccidentalRemoval)
        })
        .await
    }
}
