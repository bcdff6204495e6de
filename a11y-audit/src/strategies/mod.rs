//! Operation strategies
//!
//! One [`OperationStrategy`] per menu operation. Each builds its result in
//! isolation from the shared, read-only [`AuditServices`]; nothing here
//! touches the report.
//!
//! # Architecture
//! - **Batched** ([`missing_values`], [`contradictions`], [`incorrect_info`]):
//!   implement [`batched::BatchCapability`] and delegate to
//!   [`batched::run_batched`], which owns partitioning, bounded concurrency,
//!   per-call timeouts, retries, cancellation and batch-order reassembly
//! - **Whole-dataset** ([`structural`]): one in-memory pass on a blocking
//!   worker; no external calls, no retries
//! - **Informational** ([`informational`]): report on the dataset or saved
//!   artifacts

pub mod batched;
pub mod contradictions;
pub mod incorrect_info;
pub mod informational;
pub mod missing_values;
pub mod structural;

use crate::config::AuditSettings;
use crate::dataset::DatasetView;
use crate::error::{AuditError, AuditResult};
use crate::models::{Batching, OperationId, OperationResult};
use crate::services::{AnalysisClient, ReportCatalog, RetryPolicy};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared, read-only collaborators for one run
#[derive(Clone)]
pub struct AuditServices {
    pub settings: Arc<AuditSettings>,
    pub dataset: Arc<DatasetView>,
    pub client: Option<Arc<dyn AnalysisClient>>,
    /// Why no client is available, when one was wanted
    pub client_unavailable: Option<String>,
    pub catalog: ReportCatalog,
    pub retry: RetryPolicy,
    pub cancel: CancellationToken,
}

impl AuditServices {
    pub fn new(
        settings: AuditSettings,
        dataset: DatasetView,
        client: Option<Arc<dyn AnalysisClient>>,
        catalog: ReportCatalog,
        cancel: CancellationToken,
    ) -> Self {
        let retry = RetryPolicy::from(&settings.retry);
        Self {
            settings: Arc::new(settings),
            dataset: Arc::new(dataset),
            client,
            client_unavailable: None,
            catalog,
            retry,
            cancel,
        }
    }

    /// Record why the analysis client could not be built
    pub fn with_client_unavailable(mut self, reason: impl Into<String>) -> Self {
        self.client_unavailable = Some(reason.into());
        self
    }

    /// Analysis client, or a permanent failure when none is configured
    pub fn client(&self) -> AuditResult<&Arc<dyn AnalysisClient>> {
        self.client.as_ref().ok_or_else(|| {
            AuditError::PermanentExternal(match &self.client_unavailable {
                Some(reason) => format!("Analysis client unavailable: {}", reason),
                None => "No analysis client configured".to_string(),
            })
        })
    }
}

#[async_trait]
pub trait OperationStrategy: Send + Sync {
    fn id(&self) -> OperationId;

    fn batching(&self) -> Batching {
        self.id().batching()
    }

    /// Run to completion. An `Err` means the whole operation aborted.
    async fn run(&self, services: &AuditServices) -> AuditResult<OperationResult>;
}

/// Strategy for an operation
pub fn strategy_for(id: OperationId) -> Box<dyn OperationStrategy> {
    match id {
        OperationId::MissingValues => Box::new(missing_values::MissingValuesStrategy),
        OperationId::Contradictions => Box::new(contradictions::ContradictionsStrategy),
        OperationId::IncorrectInfo => Box::new(incorrect_info::IncorrectInfoStrategy),
        OperationId::Duplicates => Box::new(structural::DuplicatesStrategy),
        OperationId::ToRemove => Box::new(structural::ToRemoveStrategy),
        OperationId::AccidentalRemoval => Box::new(structural::AccidentalRemovalStrategy),
        OperationId::DataSummary => Box::new(informational::DataSummaryStrategy),
        OperationId::SavedReports => Box::new(informational::SavedReportsStrategy),
        OperationId::ColumnMapping => Box::new(informational::ColumnMappingStrategy),
    }
}
