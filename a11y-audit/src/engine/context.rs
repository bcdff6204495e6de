//! Explicit per-run state

use super::ResultAggregator;
use crate::error::AuditError;
use crate::models::{AuditReport, OperationPlan};
use crate::strategies::{strategy_for, AuditServices};
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tracing::{info, warn};

/// Everything one invocation owns: the plan, the shared services and the
/// report being assembled
pub struct RunContext {
    plan: OperationPlan,
    services: AuditServices,
    aggregator: ResultAggregator,
}

impl RunContext {
    pub fn new(plan: OperationPlan, services: AuditServices) -> Self {
        let aggregator = ResultAggregator::new(&plan, chrono::Utc::now());
        Self {
            plan,
            services,
            aggregator,
        }
    }

    pub fn plan(&self) -> &OperationPlan {
        &self.plan
    }

    pub fn services(&self) -> &AuditServices {
        &self.services
    }

    /// Run every scheduled operation and return the closed report.
    ///
    /// Operations are independent: a failure in one never stops another.
    /// After cancellation, operations not yet started are recorded as failed
    /// without running.
    pub async fn execute(self) -> AuditReport {
        let Self {
            plan,
            services,
            mut aggregator,
        } = self;

        let started = Instant::now();
        let concurrency = services.settings.max_concurrent_operations.max(1);

        info!(
            operations = ?plan.operations,
            rejected = plan.rejected.len(),
            concurrency,
            "Starting audit run"
        );

        let services = &services;
        let mut outcomes = stream::iter(plan.operations.iter().copied().map(|id| async move {
            if services.cancel.is_cancelled() {
                return (
                    id,
                    Err(AuditError::Cancelled {
                        batches_processed: 0,
                        batches_failed: 0,
                    }),
                );
            }
            let strategy = strategy_for(id);
            (id, strategy.run(services).await)
        }))
        .buffer_unordered(concurrency);

        while let Some((id, outcome)) = outcomes.next().await {
            aggregator.record(id, outcome);
        }

        if services.cancel.is_cancelled() {
            warn!("Audit run cancelled, report holds completed operations only");
        }

        let report = aggregator.finalize(chrono::Utc::now());
        info!(
            total = report.summary.total_operations,
            completed = report.summary.operations_completed,
            failed = report.summary.operations_failed,
            partial = report.summary.operations_partial,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Audit run complete"
        );
        report
    }
}
