//! Operation identifiers and request parsing
//!
//! The menu exposes IDs 1 through 11. IDs 1–6 are analyses, 7 expands to
//! all of 1–6, 8–10 are informational and 11 (exit) only exists in the
//! interactive menu. A request such as `"1,3,99"` is parsed token by token:
//! bad tokens are rejected individually and never reach the engine.

use crate::error::AuditError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How an operation consumes the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Batching {
    /// Partitioned into batches, one external call per batch
    Batched,
    /// One in-memory pass over the full table set
    WholeDataset,
    /// Reports on the dataset or prior artifacts
    Informational,
}

/// A schedulable operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationId {
    MissingValues,
    Contradictions,
    IncorrectInfo,
    Duplicates,
    ToRemove,
    AccidentalRemoval,
    DataSummary,
    SavedReports,
    ColumnMapping,
}

/// Menu number that expands to every analysis
pub const COMPLETE_AUDIT: u8 = 7;

/// Menu number for leaving the interactive menu
pub const EXIT: u8 = 11;

impl OperationId {
    /// The six analyses, in menu order
    pub const ANALYSES: [OperationId; 6] = [
        OperationId::MissingValues,
        OperationId::Contradictions,
        OperationId::IncorrectInfo,
        OperationId::Duplicates,
        OperationId::ToRemove,
        OperationId::AccidentalRemoval,
    ];

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(OperationId::MissingValues),
            2 => Some(OperationId::Contradictions),
            3 => Some(OperationId::IncorrectInfo),
            4 => Some(OperationId::Duplicates),
            5 => Some(OperationId::ToRemove),
            6 => Some(OperationId::AccidentalRemoval),
            8 => Some(OperationId::DataSummary),
            9 => Some(OperationId::SavedReports),
            10 => Some(OperationId::ColumnMapping),
            _ => None,
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            OperationId::MissingValues => 1,
            OperationId::Contradictions => 2,
            OperationId::IncorrectInfo => 3,
            OperationId::Duplicates => 4,
            OperationId::ToRemove => 5,
            OperationId::AccidentalRemoval => 6,
            OperationId::DataSummary => 8,
            OperationId::SavedReports => 9,
            OperationId::ColumnMapping => 10,
        }
    }

    /// Report key for this operation
    pub fn name(&self) -> &'static str {
        match self {
            OperationId::MissingValues => "missing_values",
            OperationId::Contradictions => "contradictions",
            OperationId::IncorrectInfo => "incorrect_info",
            OperationId::Duplicates => "duplicates",
            OperationId::ToRemove => "to_remove",
            OperationId::AccidentalRemoval => "accidental_removal",
            OperationId::DataSummary => "data_summary",
            OperationId::SavedReports => "saved_reports",
            OperationId::ColumnMapping => "column_mapping",
        }
    }

    pub fn batching(&self) -> Batching {
        match self {
            OperationId::MissingValues | OperationId::Contradictions | OperationId::IncorrectInfo => {
                Batching::Batched
            }
            OperationId::Duplicates | OperationId::ToRemove | OperationId::AccidentalRemoval => {
                Batching::WholeDataset
            }
            OperationId::DataSummary | OperationId::SavedReports | OperationId::ColumnMapping => {
                Batching::Informational
            }
        }
    }

    /// Whether the operation calls the external analysis client
    pub fn needs_client(&self) -> bool {
        self.batching() == Batching::Batched
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Menu entries as shown to the user
pub const MENU: &[(u8, &str)] = &[
    (1, "Analyze missing values (with web search suggestions)"),
    (2, "Find contradictions between descriptions and categories"),
    (3, "Verify factual accuracy (web search)"),
    (4, "Find duplicate entries"),
    (5, "Check active tools that may need removal"),
    (6, "Check removed tools that may have been removed accidentally"),
    (7, "Complete audit (all of 1-6)"),
    (8, "Data summary"),
    (9, "View saved audit results"),
    (10, "Show column mapping"),
    (11, "Exit"),
];

/// Render the operation menu
pub fn menu_text() -> String {
    let mut out = String::from("Accessibility tools data audit\n\n");
    for (number, label) in MENU {
        out.push_str(&format!("{:>3}. {}\n", number, label));
    }
    out.push_str("\nPass operations as a comma-separated list, e.g. \"1,3,5\".\n");
    out
}

/// A token that could not be scheduled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedOperation {
    pub token: String,
    pub reason: String,
}

/// Validated set of operations for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationPlan {
    /// Raw tokens as requested
    pub requested: Vec<String>,
    /// Operations to schedule, deduplicated, in request order
    pub operations: Vec<OperationId>,
    /// Tokens rejected before scheduling
    pub rejected: Vec<RejectedOperation>,
}

impl OperationPlan {
    /// Parse a comma-separated request like `"1,3,99"`.
    ///
    /// Blank tokens are ignored; `7` expands in place to 1–6; repeated
    /// operations keep their first position.
    pub fn parse(input: &str) -> Self {
        let mut plan = OperationPlan {
            requested: Vec::new(),
            operations: Vec::new(),
            rejected: Vec::new(),
        };

        for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            plan.requested.push(token.to_string());

            match parse_token(token) {
                Ok(ids) => {
                    for id in ids {
                        if !plan.operations.contains(&id) {
                            plan.operations.push(id);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(token, error = %e, "Rejected operation");
                    plan.rejected.push(RejectedOperation {
                        token: token.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        plan
    }

    /// Plan from already-validated identifiers
    pub fn from_ids(ids: &[OperationId]) -> Self {
        let mut operations = Vec::new();
        for id in ids {
            if !operations.contains(id) {
                operations.push(*id);
            }
        }
        OperationPlan {
            requested: operations.iter().map(|id| id.number().to_string()).collect(),
            operations,
            rejected: Vec::new(),
        }
    }

    pub fn needs_client(&self) -> bool {
        self.operations.iter().any(OperationId::needs_client)
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

fn parse_token(token: &str) -> Result<Vec<OperationId>, AuditError> {
    let number: u8 = token
        .parse()
        .map_err(|_| AuditError::UnknownOperation(format!("'{}' is not an operation number", token)))?;

    if number == COMPLETE_AUDIT {
        return Ok(OperationId::ANALYSES.to_vec());
    }
    if number == EXIT {
        return Err(AuditError::UnknownOperation(
            "11 (exit) is only valid in the interactive menu".to_string(),
        ));
    }

    OperationId::from_number(number)
        .map(|id| vec![id])
        .ok_or_else(|| AuditError::UnknownOperation(format!("{} is not in the menu (1-10)", number)))
}
