//! External analysis capability interface
//!
//! The engine only depends on [`AnalysisClient`]; the HTTP implementation
//! lives in [`super::gemini_client`] and tests substitute their own.
//!
//! Each capability receives one batch and returns one [`RecordReply`] per
//! record it could say something about. Replies are matched back to records
//! by `row_index`; missing or malformed replies degrade only that record.

use crate::dataset::{ColumnMapping, LogicalField};
use crate::error::AuditResult;
use crate::models::findings::{ContradictionReport, FactCheck, SuggestionSet};
use crate::models::{Batch, Flag, OperationId, TableKind, ToolRecord};
use async_trait::async_trait;
use serde::Serialize;

/// One record as sent to the analysis service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordPayload {
    pub row_index: usize,
    pub tool_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_url: Option<String>,
    pub built_in: bool,
    pub at_installed: bool,
    pub pricing: Vec<&'static str>,
    pub categories: Vec<&'static str>,
    pub platforms: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_requirements: Vec<String>,
}

impl RecordPayload {
    /// Payload for a named record; `None` when the record has no name
    pub fn from_record(record: &ToolRecord) -> Option<Self> {
        let name = record.name()?;
        Some(Self {
            row_index: record.row_index,
            tool_name: name.to_string(),
            id_tag: record.id_tag.clone(),
            company: record.company.clone(),
            description: record.description.clone(),
            vendor_url: record.vendor_url.clone(),
            built_in: record.built_in,
            at_installed: record.at_installed,
            pricing: record.pricing.labels(),
            categories: record.categories.labels(),
            platforms: record.platforms.labels(),
            missing_requirements: Vec::new(),
        })
    }

    pub fn with_missing(mut self, missing: Vec<String>) -> Self {
        self.missing_requirements = missing;
        self
    }
}

/// The subset of a batch that is actually queried
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRequest {
    pub operation: OperationId,
    pub table: TableKind,
    pub batch_index: usize,
    pub total_batches: usize,
    pub records: Vec<RecordPayload>,
}

impl BatchRequest {
    pub fn new(operation: OperationId, batch: &Batch<'_>, total_batches: usize, records: Vec<RecordPayload>) -> Self {
        Self {
            operation,
            table: batch.table,
            batch_index: batch.index,
            total_batches,
            records,
        }
    }
}

/// Column-mapping hints the client needs to phrase its query
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldHints {
    /// Logical fields present in the table
    pub fields: Vec<&'static str>,
    pub pricing: Vec<&'static str>,
    pub categories: Vec<&'static str>,
    pub platforms: Vec<&'static str>,
}

impl FieldHints {
    pub fn from_mapping(mapping: &ColumnMapping) -> Self {
        Self {
            fields: LogicalField::all()
                .into_iter()
                .filter(|f| mapping.is_mapped(*f))
                .map(|f| f.key())
                .collect(),
            pricing: mapping.mapped_flags(LogicalField::Pricing).into_iter().map(Flag::label).collect(),
            categories: mapping.mapped_flags(LogicalField::Category).into_iter().map(Flag::label).collect(),
            platforms: mapping.mapped_flags(LogicalField::Platform).into_iter().map(Flag::label).collect(),
        }
    }
}

/// Reply for one record
#[derive(Debug, Clone, PartialEq)]
pub enum RecordReply<T> {
    Parsed(T),
    /// Reply element could not be decoded; `row_index` when recoverable
    Malformed {
        row_index: Option<usize>,
        reason: String,
    },
}

/// Capability calls consumed by the batched strategies
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Client identifier for logging
    fn name(&self) -> &'static str;

    /// Wait until the client may issue another call (request quota).
    /// Callers await this before starting the timed call.
    async fn ready(&self) {}

    /// Suggest values for missing requirements (web search backed)
    async fn suggest_missing(
        &self,
        batch: &BatchRequest,
        hints: &FieldHints,
    ) -> AuditResult<Vec<RecordReply<SuggestionSet>>>;

    /// Find disagreements between descriptions and assigned categories
    async fn detect_contradictions(
        &self,
        batch: &BatchRequest,
        hints: &FieldHints,
    ) -> AuditResult<Vec<RecordReply<ContradictionReport>>>;

    /// Verify record facts against current web information
    async fn verify_facts(
        &self,
        batch: &BatchRequest,
        hints: &FieldHints,
    ) -> AuditResult<Vec<RecordReply<FactCheck>>>;
}
