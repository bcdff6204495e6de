//! # A11y Audit Common Library
//!
//! Shared code for the accessibility-tools audit workspace:
//! - Common error and result types
//! - TOML configuration loading, writing and path resolution
//! - Timestamp helpers used for report naming

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
