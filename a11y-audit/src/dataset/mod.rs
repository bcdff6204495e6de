//! Dataset view over the active and removed tables
//!
//! Both tables share one schema but are loaded and mapped independently.
//! Either may be absent; operations that need a table check for it
//! explicitly and fail with [`AuditError::DatasetStructure`]. A table that
//! exists but could not be parsed keeps its load error so those operations
//! report the parse failure instead of a bare "not loaded".

pub mod columns;
pub mod loader;

pub use columns::{normalize_header, ColumnMapping, LogicalField};
pub use loader::{load_dataset, load_table, read_table};

use crate::error::{AuditError, AuditResult};
use crate::models::{TableKind, ToolRecord};
use std::collections::BTreeMap;

/// One loaded table
#[derive(Debug, Clone)]
pub struct ToolTable {
    pub kind: TableKind,
    pub mapping: ColumnMapping,
    pub records: Vec<ToolRecord>,
    /// Raw cells per row, in header order; used for per-column statistics
    pub cells: Vec<Vec<String>>,
}

impl ToolTable {
    /// Table built directly from records, for callers that do not go
    /// through CSV
    pub fn from_records(kind: TableKind, mapping: ColumnMapping, records: Vec<ToolRecord>) -> Self {
        Self {
            kind,
            mapping,
            records,
            cells: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        self.mapping.headers()
    }
}

/// Read-only view of both tables
#[derive(Debug, Clone, Default)]
pub struct DatasetView {
    pub active: Option<ToolTable>,
    pub removed: Option<ToolTable>,
    load_errors: BTreeMap<TableKind, String>,
}

impl DatasetView {
    pub fn new(active: Option<ToolTable>, removed: Option<ToolTable>) -> Self {
        Self {
            active,
            removed,
            load_errors: BTreeMap::new(),
        }
    }

    /// Record why a table could not be loaded
    pub fn with_load_error(mut self, kind: TableKind, message: impl Into<String>) -> Self {
        self.load_errors.insert(kind, message.into());
        self
    }

    pub fn load_error(&self, kind: TableKind) -> Option<&str> {
        self.load_errors.get(&kind).map(String::as_str)
    }

    pub fn table(&self, kind: TableKind) -> Option<&ToolTable> {
        match kind {
            TableKind::Active => self.active.as_ref(),
            TableKind::Removed => self.removed.as_ref(),
        }
    }

    /// Table an operation cannot run without
    pub fn require(&self, kind: TableKind) -> AuditResult<&ToolTable> {
        self.table(kind).ok_or_else(|| match self.load_error(kind) {
            Some(message) => AuditError::DatasetStructure(message.to_string()),
            None => AuditError::DatasetStructure(format!("{} tools table is not loaded", kind)),
        })
    }
}
