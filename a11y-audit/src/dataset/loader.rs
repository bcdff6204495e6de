//! CSV ingestion
//!
//! Rows are read with the `csv` crate into raw cells, then resolved through
//! the table's [`ColumnMapping`] into [`ToolRecord`]s. A cell counts as
//! blank when it is empty, whitespace, or a spreadsheet null marker.

use super::columns::{ColumnMapping, LogicalField};
use super::{DatasetView, ToolTable};
use crate::error::{AuditError, AuditResult};
use crate::models::{Category, Flag, Platform, Pricing, TableKind, ToolRecord};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Null markers written by spreadsheet exports
const NULL_MARKERS: &[&str] = &["nan", "none", "null", "n/a"];

/// Whether a raw cell carries no value
pub fn is_blank(cell: &str) -> bool {
    let trimmed = cell.trim();
    trimmed.is_empty() || NULL_MARKERS.iter().any(|m| trimmed.eq_ignore_ascii_case(m))
}

/// Load both tables. A missing file leaves that table absent; a file that
/// fails to parse leaves it absent with the error kept on the view, so the
/// other table stays usable.
pub fn load_dataset(
    active_path: &Path,
    removed_path: &Path,
    overrides: &BTreeMap<String, String>,
) -> DatasetView {
    let mut tables = Vec::with_capacity(2);
    let mut failures = Vec::new();

    for (kind, path) in [(TableKind::Active, active_path), (TableKind::Removed, removed_path)] {
        match load_table(kind, path, overrides) {
            Ok(table) => tables.push(table),
            Err(e) => {
                warn!(table = %kind, path = %path.display(), error = %e, "Tools table failed to load");
                let message = match e {
                    AuditError::DatasetStructure(msg) => msg,
                    other => format!("{} ({}): {}", kind, path.display(), other),
                };
                failures.push((kind, message));
                tables.push(None);
            }
        }
    }

    let removed = tables.pop().flatten();
    let active = tables.pop().flatten();
    failures
        .into_iter()
        .fold(DatasetView::new(active, removed), |view, (kind, message)| {
            view.with_load_error(kind, message)
        })
}

/// Load one table from disk; `Ok(None)` when the file does not exist
pub fn load_table(
    kind: TableKind,
    path: &Path,
    overrides: &BTreeMap<String, String>,
) -> AuditResult<Option<ToolTable>> {
    if !path.exists() {
        warn!(table = %kind, path = %path.display(), "Tools CSV not found, table will be absent");
        return Ok(None);
    }

    let file = std::fs::File::open(path)?;
    let table = read_table(kind, file, overrides).map_err(|e| match e {
        AuditError::Csv(err) => AuditError::DatasetStructure(format!(
            "{} ({}): {}",
            kind,
            path.display(),
            err
        )),
        other => other,
    })?;

    info!(
        table = %kind,
        path = %path.display(),
        rows = table.len(),
        columns = table.columns().len(),
        "Loaded tools table"
    );
    Ok(Some(table))
}

/// Parse a table from any CSV source
pub fn read_table<R: Read>(
    kind: TableKind,
    source: R,
    overrides: &BTreeMap<String, String>,
) -> AuditResult<ToolTable> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(source);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() {
        return Err(AuditError::DatasetStructure(format!("{} table has no header row", kind)));
    }

    let mapping = ColumnMapping::resolve(&headers, overrides);
    let mut records = Vec::new();
    let mut cells = Vec::new();

    for (row_index, row) in reader.records().enumerate() {
        let row = row?;
        let mut raw: Vec<String> = row.iter().map(str::to_string).collect();
        raw.resize(headers.len(), String::new());

        records.push(build_record(kind, row_index, &raw, &mapping));
        cells.push(raw);
    }

    Ok(ToolTable {
        kind,
        mapping,
        records,
        cells,
    })
}

fn build_record(kind: TableKind, row_index: usize, raw: &[String], mapping: &ColumnMapping) -> ToolRecord {
    let text = |field: LogicalField| -> Option<String> {
        mapping
            .index_of(field)
            .map(|idx| raw[idx].as_str())
            .filter(|cell| !is_blank(cell))
            .map(|cell| cell.trim().to_string())
    };
    let flag = |field: LogicalField| text(field).is_some();

    let mut record = ToolRecord::new(kind, row_index);
    record.name = text(LogicalField::Name);
    record.description = text(LogicalField::Description);
    record.company = text(LogicalField::Company);
    record.id_tag = text(LogicalField::IdTag);
    record.vendor_url = text(LogicalField::VendorUrl);
    record.auditor_notes = text(LogicalField::AuditorNotes);
    record.built_in = flag(LogicalField::BuiltIn);
    record.at_installed = flag(LogicalField::AtInstalled);
    record.pricing = Pricing::ALL
        .iter()
        .copied()
        .filter(|f| flag(LogicalField::Pricing(*f)))
        .collect();
    record.categories = Category::ALL
        .iter()
        .copied()
        .filter(|f| flag(LogicalField::Category(*f)))
        .collect();
    record.platforms = Platform::ALL
        .iter()
        .copied()
        .filter(|f| flag(LogicalField::Platform(*f)))
        .collect();
    record
}

/// Blank cell count per source column, in column order
pub fn blank_cells_by_column(table: &ToolTable) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for (idx, header) in table.columns().iter().enumerate() {
        let blanks = table
            .cells
            .iter()
            .filter(|row| row.get(idx).map(|c| is_blank(c)).unwrap_or(true))
            .count();
        counts.insert(header.clone(), blanks);
    }
    counts
}
