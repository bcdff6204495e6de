//! Removal consistency checks
//!
//! Two read-only checks that produce candidates for human review:
//! - **To remove:** active records whose description or notes describe the
//!   tool as stale (discontinued, outdated, ...)
//! - **Accidental removal:** removed records that closely match a still
//!   active record, or whose notes describe the tool as available, and whose
//!   notes give no intentional removal reason
//!
//! Indicator phrases match whole normalized words, so "removed" does not
//! match "remove" and "unavailable" does not match "available".

use super::similarity::{normalize_name, score, PairScore, RecordProfile, SimilarityThresholds};
use crate::dataset::DatasetView;
use crate::error::AuditResult;
use crate::models::findings::{ReinstatementCandidate, ReinstatementReason, RemovalCandidate};
use crate::models::report::{AccidentalRemovalResult, BatchStats, ToRemoveResult};
use crate::models::{TableKind, ToolRecord};

/// Phrases suggesting an active tool should be removed
pub const REMOVAL_INDICATORS: &[&str] = &[
    "remove",
    "delete",
    "duplicate",
    "outdated",
    "discontinued",
    "no longer available",
    "no longer supported",
    "deprecated",
    "defunct",
    "obsolete",
    "end of life",
];

/// Phrases in a removed record's notes that explain the removal
pub const INTENTIONAL_REMOVAL_REASONS: &[&str] = &[
    "remove",
    "removed",
    "delete",
    "deleted",
    "duplicate",
    "outdated",
    "discontinued",
    "no longer",
    "deprecated",
    "defunct",
    "obsolete",
    "end of life",
    "replaced",
    "merged",
    "acquired",
];

/// Phrases suggesting a tool is still available
pub const ACTIVE_INDICATORS: &[&str] = &[
    "active",
    "current",
    "available",
    "supported",
    "working",
    "functional",
];

/// Indicators present in `text`, in list order
pub fn matched_indicators(text: &str, indicators: &[&str]) -> Vec<String> {
    let haystack = format!(" {} ", normalize_name(text));
    indicators
        .iter()
        .filter(|phrase| haystack.contains(&format!(" {} ", normalize_name(phrase))))
        .map(|phrase| phrase.to_string())
        .collect()
}

fn has_any(text: Option<&str>, indicators: &[&str]) -> bool {
    text.map(|t| !matched_indicators(t, indicators).is_empty())
        .unwrap_or(false)
}

/// Active records that look stale
pub fn find_removal_candidates(active: &[ToolRecord]) -> Vec<RemovalCandidate> {
    active
        .iter()
        .filter_map(|record| {
            let mut indicators: Vec<String> = Vec::new();
            let mut fields = Vec::new();
            for (field, text) in [("description", record.description()), ("auditor_notes", record.notes())] {
                let Some(text) = text else { continue };
                let found = matched_indicators(text, REMOVAL_INDICATORS);
                if !found.is_empty() {
                    fields.push(field.to_string());
                    for phrase in found {
                        if !indicators.contains(&phrase) {
                            indicators.push(phrase);
                        }
                    }
                }
            }
            if indicators.is_empty() {
                return None;
            }
            Some(RemovalCandidate {
                row_index: record.row_index,
                tool_name: record.display_name(),
                indicators,
                fields,
            })
        })
        .collect()
}

/// Removed records that may have been removed by mistake
pub fn find_reinstatement_candidates(
    active: &[ToolRecord],
    removed: &[ToolRecord],
    thresholds: &SimilarityThresholds,
) -> Vec<ReinstatementCandidate> {
    let active_profiles: Vec<RecordProfile> = active.iter().filter_map(RecordProfile::build).collect();

    removed
        .iter()
        .filter(|record| !has_any(record.notes(), INTENTIONAL_REMOVAL_REASONS))
        .filter_map(|record| {
            let mut reasons = Vec::new();

            if let Some(profile) = RecordProfile::build(record) {
                // Highest combined score; ties go to the earliest row
                let mut best: Option<(&RecordProfile, PairScore)> = None;
                for candidate in &active_profiles {
                    let pair = score(&profile, candidate, thresholds);
                    if !pair.is_reinstatement_match(thresholds) {
                        continue;
                    }
                    if best.map_or(true, |(_, current)| pair.combined > current.combined) {
                        best = Some((candidate, pair));
                    }
                }

                if let Some((matched, pair)) = best {
                    reasons.push(ReinstatementReason::MatchesActive {
                        active_row_index: matched.row_index,
                        active_tool_name: matched.display_name.clone(),
                        name_similarity: round3(pair.name),
                        description_similarity: round3(pair.description),
                    });
                }
            }

            if let Some(notes) = record.notes() {
                let indicators = matched_indicators(notes, ACTIVE_INDICATORS);
                if !indicators.is_empty() {
                    reasons.push(ReinstatementReason::ActiveIndicator { indicators });
                }
            }

            if reasons.is_empty() {
                return None;
            }
            Some(ReinstatementCandidate {
                row_index: record.row_index,
                tool_name: record.display_name(),
                reasons,
            })
        })
        .collect()
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// To-remove operation over the dataset
pub fn check_to_remove(view: &DatasetView) -> AuditResult<ToRemoveResult> {
    let active = view.require(TableKind::Active)?;
    let candidates = find_removal_candidates(&active.records);
    tracing::info!(
        records_checked = active.len(),
        candidates = candidates.len(),
        "Removal check complete"
    );
    Ok(ToRemoveResult {
        records_checked: active.len(),
        candidates,
        batches: BatchStats::unbatched(),
    })
}

/// Accidental-removal operation over the dataset
pub fn check_accidental_removals(
    view: &DatasetView,
    thresholds: &SimilarityThresholds,
) -> AuditResult<AccidentalRemovalResult> {
    let active = view.require(TableKind::Active)?;
    let removed = view.require(TableKind::Removed)?;
    let candidates = find_reinstatement_candidates(&active.records, &removed.records, thresholds);
    tracing::info!(
        records_checked = removed.len(),
        candidates = candidates.len(),
        "Accidental removal check complete"
    );
    Ok(AccidentalRemovalResult {
        records_checked: removed.len(),
        candidates,
        batches: BatchStats::unbatched(),
    })
}
