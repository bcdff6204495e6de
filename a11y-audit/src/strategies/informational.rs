//! Operations 8-10: informational reports
//!
//! These describe the loaded dataset or earlier artifacts. They never call
//! the analysis client and schedule no batches.

use super::{AuditServices, OperationStrategy};
use crate::dataset::DatasetView;
use crate::error::AuditResult;
use crate::models::report::{
    BatchStats, ColumnMappingResult, DataSummaryResult, SavedReportsResult, TableMapping, TableSummary,
};
use crate::models::{OperationId, OperationResult, TableKind};
use async_trait::async_trait;

/// Names shown per table in the data summary
const SAMPLE_NAMES: usize = 3;

const TABLES: [TableKind; 2] = [TableKind::Active, TableKind::Removed];

pub struct DataSummaryStrategy;

fn summarize_tables(view: &DatasetView) -> Vec<TableSummary> {
    TABLES
        .iter()
        .map(|&kind| match view.table(kind) {
            Some(table) => TableSummary {
                table: kind,
                present: true,
                total_rows: table.len(),
                columns: table.columns().to_vec(),
                sample_names: table.records.iter().take(SAMPLE_NAMES).map(|r| r.display_name()).collect(),
                load_error: None,
            },
            None => TableSummary {
                table: kind,
                present: false,
                total_rows: 0,
                columns: Vec::new(),
                sample_names: Vec::new(),
                load_error: view.load_error(kind).map(str::to_string),
            },
        })
        .collect()
}

#[async_trait]
impl OperationStrategy for DataSummaryStrategy {
    fn id(&self) -> OperationId {
        OperationId::DataSummary
    }

    async fn run(&self, services: &AuditServices) -> AuditResult<OperationResult> {
        Ok(OperationResult::DataSummary(DataSummaryResult {
            tables: summarize_tables(&services.dataset),
            batches: BatchStats::unbatched(),
        }))
    }
}

pub struct SavedReportsStrategy;

#[async_trait]
impl OperationStrategy for SavedReportsStrategy {
    fn id(&self) -> OperationId {
        OperationId::SavedReports
    }

    async fn run(&self, services: &AuditServices) -> AuditResult<OperationResult> {
        let (status, files) = services.catalog.list()?;
        Ok(OperationResult::SavedReports(SavedReportsResult {
            status,
            directory: services.catalog.directory().display().to_string(),
            files,
            batches: BatchStats::unbatched(),
        }))
    }
}

pub struct ColumnMappingStrategy;

#[async_trait]
impl OperationStrategy for ColumnMappingStrategy {
    fn id(&self) -> OperationId {
        OperationId::ColumnMapping
    }

    async fn run(&self, services: &AuditServices) -> AuditResult<OperationResult> {
        let tables = TABLES
            .iter()
            .filter_map(|&kind| services.dataset.table(kind))
            .map(|table| TableMapping {
                table: table.kind,
                fields: table.mapping.describe(),
                unmapped_columns: table.mapping.unmapped_columns(),
            })
            .collect();

        Ok(OperationResult::ColumnMapping(ColumnMappingResult {
            tables,
            batches: BatchStats::unbatched(),
        }))
    }
}
