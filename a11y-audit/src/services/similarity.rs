// Record similarity for duplicate and reinstatement detection
//
// Concept: score pairs of tool records without any external calls
// Name: max(token-set Jaccard, normalized Levenshtein) over normalized names
// Description: Jaccard over content words (length >= 3, stop words removed)
// Combined: name_weight * name + (1 - name_weight) * description
//
// Default thresholds:
// - exact normalized name: always a duplicate
// - name >= 0.92: duplicate regardless of description
// - combined >= 0.75: duplicate
// - reinstatement: name >= 0.85 AND description >= 0.30

use crate::models::{TableKind, ToolRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Words too common in tool descriptions to signal similarity
const STOP_WORDS: &[&str] = &[
    "and", "the", "for", "with", "that", "this", "from", "are", "can", "your", "you", "users",
    "use", "tool", "app", "allows", "which", "into", "its", "has", "have", "also", "all", "any",
];

/// Thresholds for pairwise decisions, all in `[0, 1]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarityThresholds {
    /// Name similarity that alone makes a duplicate
    #[serde(default = "default_name_match")]
    pub name_match: f64,

    /// Combined score that makes a duplicate
    #[serde(default = "default_joint_match")]
    pub joint_match: f64,

    /// Weight of name similarity in the combined score
    #[serde(default = "default_name_weight")]
    pub name_weight: f64,

    /// Minimum name similarity for a reinstatement match
    #[serde(default = "default_reinstate_name")]
    pub reinstate_name: f64,

    /// Minimum description similarity for a reinstatement match
    #[serde(default = "default_reinstate_description")]
    pub reinstate_description: f64,
}

fn default_name_match() -> f64 {
    0.92
}

fn default_joint_match() -> f64 {
    0.75
}

fn default_name_weight() -> f64 {
    0.6
}

fn default_reinstate_name() -> f64 {
    0.85
}

fn default_reinstate_description() -> f64 {
    0.30
}

impl Default for SimilarityThresholds {
    fn default() -> Self {
        Self {
            name_match: default_name_match(),
            joint_match: default_joint_match(),
            name_weight: default_name_weight(),
            reinstate_name: default_reinstate_name(),
            reinstate_description: default_reinstate_description(),
        }
    }
}

impl SimilarityThresholds {
    pub fn validate(&self) -> a11y_common::Result<()> {
        let fields = [
            ("name_match", self.name_match),
            ("joint_match", self.joint_match),
            ("name_weight", self.name_weight),
            ("reinstate_name", self.reinstate_name),
            ("reinstate_description", self.reinstate_description),
        ];
        for (name, value) in fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(a11y_common::Error::Config(format!(
                    "audit.similarity.{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Lowercase, punctuation to spaces, collapse whitespace
pub fn normalize_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .flat_map(|c| {
            let keep = c.is_alphanumeric();
            c.to_lowercase().map(move |l| if keep { l } else { ' ' })
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn name_tokens(normalized: &str) -> BTreeSet<String> {
    normalized.split(' ').filter(|t| !t.is_empty()).map(str::to_string).collect()
}

fn description_tokens(text: &str) -> BTreeSet<String> {
    normalize_name(text)
        .split(' ')
        .filter(|t| t.chars().count() >= 3 && !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// |A ∩ B| / |A ∪ B|; zero when either side is empty
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Precomputed comparison view of one named record
#[derive(Debug, Clone)]
pub struct RecordProfile {
    pub table: TableKind,
    pub row_index: usize,
    pub display_name: String,
    pub normalized_name: String,
    pub name_tokens: BTreeSet<String>,
    pub description_tokens: BTreeSet<String>,
}

impl RecordProfile {
    /// `None` for records without a usable name
    pub fn build(record: &ToolRecord) -> Option<Self> {
        let name = record.name()?;
        let normalized_name = normalize_name(name);
        if normalized_name.is_empty() {
            return None;
        }
        Some(Self {
            table: record.table,
            row_index: record.row_index,
            display_name: name.to_string(),
            name_tokens: name_tokens(&normalized_name),
            normalized_name,
            description_tokens: record.description().map(description_tokens).unwrap_or_default(),
        })
    }
}

/// Similarity of one pair of records
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairScore {
    pub exact_name: bool,
    pub name: f64,
    pub description: f64,
    pub combined: f64,
}

impl PairScore {
    pub fn is_duplicate(&self, thresholds: &SimilarityThresholds) -> bool {
        self.exact_name || self.name >= thresholds.name_match || self.combined >= thresholds.joint_match
    }

    pub fn is_reinstatement_match(&self, thresholds: &SimilarityThresholds) -> bool {
        (self.exact_name || self.name >= thresholds.reinstate_name)
            && self.description >= thresholds.reinstate_description
    }
}

pub fn name_similarity(a: &RecordProfile, b: &RecordProfile) -> f64 {
    if a.normalized_name == b.normalized_name {
        return 1.0;
    }
    let token_score = jaccard(&a.name_tokens, &b.name_tokens);
    let edit_score = strsim::normalized_levenshtein(&a.normalized_name, &b.normalized_name);
    token_score.max(edit_score)
}

pub fn score(a: &RecordProfile, b: &RecordProfile, thresholds: &SimilarityThresholds) -> PairScore {
    let name = name_similarity(a, b);
    let description = jaccard(&a.description_tokens, &b.description_tokens);
    let weight = thresholds.name_weight;
    PairScore {
        exact_name: a.normalized_name == b.normalized_name,
        name,
        description,
        combined: weight * name + (1.0 - weight) * description,
    }
}
