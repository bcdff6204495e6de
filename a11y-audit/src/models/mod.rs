//! Data model for the audit engine
//!
//! - [`record`]: immutable tool records and the batches cut from them
//! - [`operation`]: operation identifiers and request parsing
//! - [`findings`]: per-record findings produced by each operation
//! - [`report`]: operation results and the aggregated report

pub mod findings;
pub mod operation;
pub mod record;
pub mod report;

pub use findings::{RecordFinding, RecordKeyed};
pub use operation::{Batching, OperationId, OperationPlan, RejectedOperation};
pub use record::{Batch, Category, Flag, FlagSet, Platform, Pricing, TableKind, ToolRecord};
pub use report::{
    AuditReport, BatchFailure, BatchStats, OperationEntry, OperationResult, OperationStatus,
    ReportSummary,
};
