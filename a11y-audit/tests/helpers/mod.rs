//! Test Helper Utilities
//!
//! Shared utilities for testing a11y-audit

#![allow(dead_code)]

pub mod datasets;
pub mod mock_client;

pub use datasets::{active_table, complete_record, incomplete_record, services_with, test_settings, view};
pub use mock_client::MockClient;
