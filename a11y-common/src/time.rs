//! Timestamp helpers for report artifacts

use chrono::{DateTime, Utc};

/// Format used in report artifact names (`20250101_093000`)
pub const ARTIFACT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Render a timestamp for use inside a file name
pub fn artifact_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(ARTIFACT_TIMESTAMP_FORMAT).to_string()
}
