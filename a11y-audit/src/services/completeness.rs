//! Local completeness assessment against the essential requirements
//!
//! Runs before any external call so that only incomplete records are sent
//! for suggestions.

use crate::models::findings::CompletenessAssessment;
use crate::models::report::CompletenessSummary;
use crate::models::ToolRecord;
use std::collections::BTreeMap;

/// Attributes every active record is expected to carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Requirement {
    BuiltInOrAt,
    Pricing,
    AccessibilityCategory,
    OsCompatibility,
    IdTag,
    ProductName,
    Description,
    VendorWebsite,
}

impl Requirement {
    pub const ALL: [Requirement; 8] = [
        Requirement::BuiltInOrAt,
        Requirement::Pricing,
        Requirement::AccessibilityCategory,
        Requirement::OsCompatibility,
        Requirement::IdTag,
        Requirement::ProductName,
        Requirement::Description,
        Requirement::VendorWebsite,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Requirement::BuiltInOrAt => "Built-in or AT (Installed)",
            Requirement::Pricing => "Pricing",
            Requirement::AccessibilityCategory => "Accessibility Categories",
            Requirement::OsCompatibility => "OS Compatibility",
            Requirement::IdTag => "ID TAG",
            Requirement::ProductName => "Product Name",
            Requirement::Description => "Description",
            Requirement::VendorWebsite => "Vendor Website",
        }
    }

    pub fn is_met(&self, record: &ToolRecord) -> bool {
        let present = |v: &Option<String>| v.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false);
        match self {
            Requirement::BuiltInOrAt => record.built_in || record.at_installed,
            Requirement::Pricing => !record.pricing.is_empty(),
            Requirement::AccessibilityCategory => !record.categories.is_empty(),
            Requirement::OsCompatibility => !record.platforms.is_empty(),
            Requirement::IdTag => present(&record.id_tag),
            Requirement::ProductName => record.name().is_some(),
            Requirement::Description => present(&record.description),
            Requirement::VendorWebsite => present(&record.vendor_url),
        }
    }
}

pub fn missing_requirements(record: &ToolRecord) -> Vec<Requirement> {
    Requirement::ALL
        .iter()
        .copied()
        .filter(|r| !r.is_met(record))
        .collect()
}

pub fn assess(record: &ToolRecord) -> CompletenessAssessment {
    let missing = missing_requirements(record);
    let total = Requirement::ALL.len();
    let met = total - missing.len();
    CompletenessAssessment {
        row_index: record.row_index,
        tool_name: record.display_name(),
        missing_requirements: missing.iter().map(|r| r.label().to_string()).collect(),
        completeness_score: round2(met as f64 / total as f64 * 100.0),
    }
}

/// Summary over a table plus the incomplete records, in row order
pub fn assess_table(records: &[ToolRecord]) -> (CompletenessSummary, Vec<CompletenessAssessment>) {
    let mut missing_by_requirement: BTreeMap<String, usize> = Requirement::ALL
        .iter()
        .map(|r| (r.label().to_string(), 0))
        .collect();
    let mut incomplete = Vec::new();
    let mut score_total = 0.0;

    for record in records {
        let assessment = assess(record);
        score_total += assessment.completeness_score;
        if assessment.missing_requirements.is_empty() {
            continue;
        }
        for label in &assessment.missing_requirements {
            if let Some(count) = missing_by_requirement.get_mut(label) {
                *count += 1;
            }
        }
        incomplete.push(assessment);
    }

    let average = if records.is_empty() {
        0.0
    } else {
        round2(score_total / records.len() as f64)
    };

    let summary = CompletenessSummary {
        total_records: records.len(),
        complete_records: records.len() - incomplete.len(),
        incomplete_records: incomplete.len(),
        average_completeness: average,
        missing_by_requirement,
    };
    (summary, incomplete)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
