//! a11y-audit - Batch audit engine for the accessibility tools dataset
//!
//! Runs a menu of audit operations over the active and removed tool tables
//! and aggregates their outcomes into one timestamped report.
//!
//! **Layers:**
//! - [`dataset`]: CSV loading and column mapping into [`models::ToolRecord`]s
//! - [`services`]: partitioning, retry, similarity, the analysis client and
//!   report persistence
//! - [`strategies`]: one strategy per operation
//! - [`engine`]: the per-run context and result aggregation

pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod models;
pub mod services;
pub mod strategies;

pub use engine::{ResultAggregator, RunContext};
pub use error::{AuditError, AuditResult};
pub use models::{AuditReport, OperationId, OperationPlan};
pub use strategies::AuditServices;
