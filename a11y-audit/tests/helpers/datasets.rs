//! Dataset and service builders

use a11y_audit::config::AuditSettings;
use a11y_audit::dataset::{ColumnMapping, DatasetView, ToolTable};
use a11y_audit::models::{Category, Platform, Pricing, TableKind, ToolRecord};
use a11y_audit::services::{AnalysisClient, ReportCatalog};
use a11y_audit::AuditServices;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const HEADERS: &[&str] = &[
    "ID TAG",
    "PRODUCT/FEATURE NAME",
    "DESCRIPTION",
    "COMPANY",
    "AUDITOR NOTES",
];

/// Record meeting every completeness requirement
pub fn complete_record(table: TableKind, row: usize) -> ToolRecord {
    ToolRecord::new(table, row)
        .with_name(&format!("Complete Tool {}", row))
        .with_description(&format!("Feature set number {} for testing", row))
        .with_id_tag(&format!("T{}", row))
        .with_vendor_url("https://example.org")
        .with_at_installed()
        .with_pricing(Pricing::Free)
        .with_category(Category::Vision)
        .with_platform(Platform::Windows)
}

/// Named record missing most requirements
pub fn incomplete_record(table: TableKind, row: usize) -> ToolRecord {
    ToolRecord::new(table, row).with_name(&format!("Sparse Tool {}", row))
}

pub fn table(kind: TableKind, records: Vec<ToolRecord>) -> ToolTable {
    let headers: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    ToolTable::from_records(kind, ColumnMapping::resolve(&headers, &BTreeMap::new()), records)
}

/// Active table of `n` incomplete, named records
pub fn active_table(n: usize) -> ToolTable {
    table(
        TableKind::Active,
        (0..n).map(|i| incomplete_record(TableKind::Active, i)).collect(),
    )
}

pub fn view(active: Option<ToolTable>, removed: Option<ToolTable>) -> DatasetView {
    DatasetView::new(active, removed)
}

/// Defaults with millisecond backoffs so retry tests stay fast
pub fn test_settings() -> AuditSettings {
    let mut settings = AuditSettings::default();
    settings.retry.initial_backoff_ms = 1;
    settings.retry.max_backoff_ms = 2;
    settings.call_timeout_ms = 5_000;
    settings
}

pub fn services_with(
    settings: AuditSettings,
    dataset: DatasetView,
    client: Option<Arc<dyn AnalysisClient>>,
    output_dir: &Path,
    cancel: CancellationToken,
) -> AuditServices {
    AuditServices::new(settings, dataset, client, ReportCatalog::new(output_dir), cancel)
}
