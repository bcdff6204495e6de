//! Run orchestration
//!
//! [`RunContext`] owns everything one invocation needs: the operation plan,
//! the shared services and the in-progress report. Operations run with
//! bounded concurrency and are folded into the [`ResultAggregator`] as each
//! one resolves; the aggregator is the only place results meet.

pub mod aggregator;
pub mod context;

pub use aggregator::ResultAggregator;
pub use context::RunContext;
