//! Per-record findings
//!
//! Reply types for the three external capabilities, and the structured
//! output of the in-memory analyses.

use super::record::TableKind;
use serde::{Deserialize, Serialize};

/// A reply that names the record it describes
pub trait RecordKeyed {
    fn row_index(&self) -> usize;
}

/// Outcome for one record of a batched operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordFinding<T> {
    Resolved(T),
    /// The record could not be analyzed (missing fields, malformed or absent reply)
    Unresolved {
        row_index: usize,
        tool_name: String,
        reason: String,
    },
}

impl<T: RecordKeyed> RecordFinding<T> {
    pub fn row_index(&self) -> usize {
        match self {
            RecordFinding::Resolved(finding) => finding.row_index(),
            RecordFinding::Unresolved { row_index, .. } => *row_index,
        }
    }

    pub fn resolved(&self) -> Option<&T> {
        match self {
            RecordFinding::Resolved(finding) => Some(finding),
            RecordFinding::Unresolved { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, RecordFinding::Resolved(_))
    }
}

// ============================================================================
// Missing values
// ============================================================================

/// One suggested fix for a missing requirement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub requirement: String,
    #[serde(default)]
    pub current_value: Option<String>,
    pub suggested_value: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub confidence: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Suggestions for one incomplete record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionSet {
    pub tool_name: String,
    pub row_index: usize,
    #[serde(default)]
    pub missing_requirements: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

impl RecordKeyed for SuggestionSet {
    fn row_index(&self) -> usize {
        self.row_index
    }
}

// ============================================================================
// Contradictions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContradictionKind {
    MissingCategory,
    IncorrectCategoryAssignment,
    CategoryMismatch,
    Overcategorization,
    #[serde(other)]
    Other,
}

/// Disagreement between a description and the categories assigned to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contradiction {
    #[serde(rename = "type")]
    pub kind: ContradictionKind,
    #[serde(default)]
    pub category_involved: Option<String>,
    pub description: String,
    #[serde(default)]
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContradictionReport {
    pub tool_name: String,
    pub row_index: usize,
    #[serde(default)]
    pub contradictions: Vec<Contradiction>,
}

impl RecordKeyed for ContradictionReport {
    fn row_index(&self) -> usize {
        self.row_index
    }
}

// ============================================================================
// Fact verification
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncorrectField {
    pub field: String,
    #[serde(default)]
    pub incorrect_value: Option<String>,
    #[serde(default)]
    pub correct_value: Option<String>,
}

/// Web verification verdict for one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheck {
    pub tool_name: String,
    pub row_index: usize,
    #[serde(default)]
    pub id_tag: Option<String>,
    pub is_information_correct: bool,
    #[serde(default)]
    pub incorrect_information: Vec<IncorrectField>,
}

impl RecordKeyed for FactCheck {
    fn row_index(&self) -> usize {
        self.row_index
    }
}

// ============================================================================
// In-memory analyses
// ============================================================================

/// A record referenced from a group or candidate list
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct MemberRef {
    pub table: TableKind,
    pub row_index: usize,
    pub tool_name: String,
}

/// Records transitively connected by pairwise similarity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    /// Sorted by (table, row_index)
    pub members: Vec<MemberRef>,
    /// At least one member from each table
    pub spans_tables: bool,
    /// Every member shares one normalized name
    pub exact_name: bool,
}

/// Active-table record that may be stale
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemovalCandidate {
    pub row_index: usize,
    pub tool_name: String,
    /// Indicator phrases found, in indicator-list order
    pub indicators: Vec<String>,
    /// Fields the indicators were found in
    pub fields: Vec<String>,
}

/// Why a removed record looks like it should be reinstated
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReinstatementReason {
    /// Closely matches a record that is still active
    MatchesActive {
        active_row_index: usize,
        active_tool_name: String,
        name_similarity: f64,
        description_similarity: f64,
    },
    /// Notes describe the tool as still available
    ActiveIndicator { indicators: Vec<String> },
}

/// Removed-table record that may have been removed by mistake
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReinstatementCandidate {
    pub row_index: usize,
    pub tool_name: String,
    pub reasons: Vec<ReinstatementReason>,
}

/// Local completeness assessment for one record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletenessAssessment {
    pub row_index: usize,
    pub tool_name: String,
    pub missing_requirements: Vec<String>,
    /// Requirements met, as a percentage of all requirements
    pub completeness_score: f64,
}
