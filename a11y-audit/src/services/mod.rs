//! Services used by the operation strategies
//!
//! - [`partitioner`]: batch partitioning
//! - [`retry`]: retry policy for external calls
//! - [`analysis_client`]: external capability interface
//! - [`gemini_client`]: HTTP implementation of the capability interface
//! - [`completeness`], [`similarity`], [`duplicate_analyzer`],
//!   [`removal_checker`]: in-memory analyses
//! - [`report_sink`]: report persistence and listing

pub mod analysis_client;
pub mod completeness;
pub mod duplicate_analyzer;
pub mod gemini_client;
pub mod partitioner;
pub mod removal_checker;
pub mod report_sink;
pub mod retry;
pub mod similarity;

pub use analysis_client::{AnalysisClient, BatchRequest, FieldHints, RecordPayload, RecordReply};
pub use duplicate_analyzer::{AllPairs, CandidateBlocker, DuplicateAnalyzer, SharedTokenBlocker};
pub use gemini_client::GeminiClient;
pub use partitioner::partition;
pub use report_sink::{JsonFileSink, ReportCatalog, ReportSink};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use similarity::SimilarityThresholds;
