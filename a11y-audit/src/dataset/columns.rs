//! Column mapping
//!
//! Source headers are loosely structured (embedded newlines, inconsistent
//! spacing around `/`, optional columns). They are resolved once at load
//! time into a [`ColumnMapping`] from logical fields to column positions;
//! everything downstream consults the mapping instead of probing headers.
//!
//! # Resolution order
//! 1. `[columns]` overrides from config (by logical field key)
//! 2. Alias lists, compared after header normalization
//! 3. Name only: first header containing NAME or PRODUCT (but not UNNAMED),
//!    then the first column

use crate::models::{Category, Flag, Platform, Pricing};
use std::collections::BTreeMap;

/// A field the engine knows how to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogicalField {
    Name,
    Description,
    Company,
    IdTag,
    VendorUrl,
    AuditorNotes,
    BuiltIn,
    AtInstalled,
    Pricing(Pricing),
    Category(Category),
    Platform(Platform),
}

impl LogicalField {
    /// Every logical field, in report order
    pub fn all() -> Vec<LogicalField> {
        let mut fields = vec![
            LogicalField::Name,
            LogicalField::Description,
            LogicalField::Company,
            LogicalField::IdTag,
            LogicalField::VendorUrl,
            LogicalField::AuditorNotes,
            LogicalField::BuiltIn,
            LogicalField::AtInstalled,
        ];
        fields.extend(Pricing::ALL.iter().map(|f| LogicalField::Pricing(*f)));
        fields.extend(Category::ALL.iter().map(|f| LogicalField::Category(*f)));
        fields.extend(Platform::ALL.iter().map(|f| LogicalField::Platform(*f)));
        fields
    }

    /// Stable key used in config overrides and reports
    pub fn key(&self) -> &'static str {
        match self {
            LogicalField::Name => "name",
            LogicalField::Description => "description",
            LogicalField::Company => "company",
            LogicalField::IdTag => "id_tag",
            LogicalField::VendorUrl => "vendor_url",
            LogicalField::AuditorNotes => "auditor_notes",
            LogicalField::BuiltIn => "built_in",
            LogicalField::AtInstalled => "at_installed",
            LogicalField::Pricing(f) => f.key(),
            LogicalField::Category(f) => f.key(),
            LogicalField::Platform(f) => f.key(),
        }
    }

    pub fn from_key(key: &str) -> Option<LogicalField> {
        LogicalField::all().into_iter().find(|f| f.key() == key)
    }

    /// Normalized header spellings seen in the source tables
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            LogicalField::Name => &[
                "PRODUCT/FEATURE NAME",
                "PRODUCT_FEATURE_NAME",
                "PRODUCT FEATURE NAME",
                "PRODUCT NAME",
                "PRODUCT_NAME",
                "NAME",
            ],
            LogicalField::Description => &["DESCRIPTION", "DESC"],
            LogicalField::Company => &["COMPANY", "VENDOR", "DEVELOPER"],
            LogicalField::IdTag => &["ID TAG", "ID_TAG", "ID", "TOOL_ID"],
            LogicalField::VendorUrl => &[
                "LINK TO DESCRIPTION ON VENDOR'S WEBSITE",
                "VENDOR WEBSITE",
                "VENDOR_WEBSITE",
                "URL",
            ],
            LogicalField::AuditorNotes => &["AUDITOR NOTES", "AUDITOR_NOTES", "NOTES"],
            LogicalField::BuiltIn => &["BUILT-IN", "BUILT IN", "BUILT_IN"],
            LogicalField::AtInstalled => &["AT (INSTALLED)", "AT INSTALLED", "AT_INSTALLED"],
            LogicalField::Pricing(f) => f.aliases(),
            LogicalField::Category(f) => f.aliases(),
            LogicalField::Platform(f) => f.aliases(),
        }
    }
}

/// Uppercase, collapse whitespace (including embedded newlines) and drop
/// spaces adjacent to `/`
pub fn normalize_header(header: &str) -> String {
    let collapsed = header.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.replace(" /", "/").replace("/ ", "/").to_uppercase()
}

/// Resolved logical field → column position mapping for one table
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMapping {
    headers: Vec<String>,
    fields: BTreeMap<LogicalField, usize>,
}

impl ColumnMapping {
    /// Resolve headers against overrides and aliases.
    ///
    /// Overrides naming an unknown field or a missing column are logged and
    /// ignored.
    pub fn resolve(headers: &[String], overrides: &BTreeMap<String, String>) -> Self {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
        let mut fields = BTreeMap::new();

        for (key, column) in overrides {
            let Some(field) = LogicalField::from_key(key) else {
                tracing::warn!(key = %key, "Ignoring column override for unknown field");
                continue;
            };
            let target = normalize_header(column);
            match normalized.iter().position(|h| *h == target) {
                Some(idx) => {
                    fields.insert(field, idx);
                }
                None => {
                    tracing::warn!(key = %key, column = %column, "Column override names a missing column");
                }
            }
        }

        for field in LogicalField::all() {
            if fields.contains_key(&field) {
                continue;
            }
            let found = field
                .aliases()
                .iter()
                .find_map(|alias| normalized.iter().position(|h| h.as_str() == *alias));
            if let Some(idx) = found {
                fields.insert(field, idx);
            }
        }

        if !fields.contains_key(&LogicalField::Name) && !headers.is_empty() {
            let heuristic = normalized
                .iter()
                .position(|h| (h.contains("NAME") || h.contains("PRODUCT")) && !h.contains("UNNAMED"))
                .unwrap_or(0);
            tracing::debug!(column = %headers[heuristic], "Product name column chosen by heuristic");
            fields.insert(LogicalField::Name, heuristic);
        }

        Self {
            headers: headers.to_vec(),
            fields,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn index_of(&self, field: LogicalField) -> Option<usize> {
        self.fields.get(&field).copied()
    }

    pub fn column_for(&self, field: LogicalField) -> Option<&str> {
        self.index_of(field).map(|idx| self.headers[idx].as_str())
    }

    pub fn is_mapped(&self, field: LogicalField) -> bool {
        self.fields.contains_key(&field)
    }

    /// Flags of one family that this table can represent
    pub fn mapped_flags<F: Flag>(&self, wrap: fn(F) -> LogicalField) -> Vec<F> {
        F::ALL.iter().copied().filter(|f| self.is_mapped(wrap(*f))).collect()
    }

    /// Logical field key → source header
    pub fn describe(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|(field, idx)| (field.key().to_string(), self.headers[*idx].clone()))
            .collect()
    }

    /// Source headers no logical field maps to, in column order
    pub fn unmapped_columns(&self) -> Vec<String> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| !self.fields.values().any(|v| v == idx))
            .map(|(_, h)| h.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_header_collapses_newlines_and_slashes() {
        assert_eq!(normalize_header("PRODUCT/FEATURE\nNAME"), "PRODUCT/FEATURE NAME");
        assert_eq!(normalize_header("Speech/ Communication"), "SPEECH/COMMUNICATION");
        assert_eq!(normalize_header("  iPad   (iPadOS) "), "IPAD (IPADOS)");
    }

    #[test]
    fn test_resolve_source_headers() {
        let mapping = ColumnMapping::resolve(
            &headers(&[
                "ID TAG",
                "PRODUCT/FEATURE\nNAME",
                "DESCRIPTION",
                "Built-in",
                "AT (Installed)",
                "FREE",
                "Vision",
                "Speech/ Communication",
                "iPhone (iOS)",
                "AUDITOR NOTES",
                "Unnamed: 20",
            ]),
            &BTreeMap::new(),
        );

        assert_eq!(mapping.column_for(LogicalField::Name), Some("PRODUCT/FEATURE\nNAME"));
        assert_eq!(mapping.index_of(LogicalField::IdTag), Some(0));
        assert!(mapping.is_mapped(LogicalField::Category(Category::SpeechCommunication)));
        assert!(mapping.is_mapped(LogicalField::Platform(Platform::Iphone)));
        assert!(!mapping.is_mapped(LogicalField::Company));
        assert_eq!(mapping.unmapped_columns(), vec!["Unnamed: 20".to_string()]);
    }

    #[test]
    fn test_name_heuristic_skips_unnamed() {
        let mapping = ColumnMapping::resolve(
            &headers(&["Unnamed: 0", "Tool Product Label", "DESCRIPTION"]),
            &BTreeMap::new(),
        );
        assert_eq!(mapping.index_of(LogicalField::Name), Some(1));
    }

    #[test]
    fn test_name_falls_back_to_first_column() {
        let mapping = ColumnMapping::resolve(&headers(&["Tool", "Blurb"]), &BTreeMap::new());
        assert_eq!(mapping.index_of(LogicalField::Name), Some(0));
    }

    #[test]
    fn test_override_wins_over_alias() {
        let mut overrides = BTreeMap::new();
        overrides.insert("name".to_string(), "Title".to_string());
        overrides.insert("nonsense".to_string(), "NAME".to_string());

        let mapping = ColumnMapping::resolve(&headers(&["NAME", "Title"]), &overrides);
        assert_eq!(mapping.index_of(LogicalField::Name), Some(1));
    }

    #[test]
    fn test_mapped_flags() {
        let mapping = ColumnMapping::resolve(&headers(&["NAME", "Windows", "Android"]), &BTreeMap::new());
        let platforms = mapping.mapped_flags(LogicalField::Platform);
        assert_eq!(platforms, vec![Platform::Windows, Platform::Android]);
    }

    #[test]
    fn test_field_keys_round_trip() {
        for field in LogicalField::all() {
            assert_eq!(LogicalField::from_key(field.key()), Some(field));
        }
    }
}
