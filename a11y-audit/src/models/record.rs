//! Tool records and batches
//!
//! A [`ToolRecord`] is one row of the active or removed table, resolved once
//! at load time into a fixed shape. Identity is the record's positional
//! `row_index` within its table, never its name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Which source table a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Active,
    Removed,
}

impl TableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Active => "active",
            TableKind::Removed => "removed",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Flags
// ============================================================================

/// A boolean column family (pricing, category, platform)
pub trait Flag: Copy + Ord + fmt::Debug + Send + Sync + 'static {
    /// Every member of the family, in column order
    const ALL: &'static [Self];

    /// Human-readable label used in prompts and summaries
    fn label(self) -> &'static str;

    /// Normalized source headers that map to this flag
    fn aliases(self) -> &'static [&'static str];

    /// Key used for `[columns]` overrides (`category.vision`)
    fn key(self) -> &'static str;
}

/// Pricing model flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pricing {
    Free,
    FreeTrial,
    Subscription,
    LifetimeLicense,
}

impl Flag for Pricing {
    const ALL: &'static [Self] = &[
        Pricing::Free,
        Pricing::FreeTrial,
        Pricing::Subscription,
        Pricing::LifetimeLicense,
    ];

    fn label(self) -> &'static str {
        match self {
            Pricing::Free => "Free",
            Pricing::FreeTrial => "Free Trial",
            Pricing::Subscription => "Subscription",
            Pricing::LifetimeLicense => "Lifetime License",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Pricing::Free => &["FREE"],
            Pricing::FreeTrial => &["FREE TRIAL", "FREE_TRIAL"],
            Pricing::Subscription => &["SUBSCRIPTION"],
            Pricing::LifetimeLicense => &["LIFETIME LICENSE", "LIFETIME_LICENSE"],
        }
    }

    fn key(self) -> &'static str {
        match self {
            Pricing::Free => "pricing.free",
            Pricing::FreeTrial => "pricing.free_trial",
            Pricing::Subscription => "pricing.subscription",
            Pricing::LifetimeLicense => "pricing.lifetime_license",
        }
    }
}

/// Accessibility category flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Reading,
    Cognitive,
    ExecutiveFunction,
    Vision,
    Physical,
    Hearing,
    SpeechCommunication,
    TrainingTherapy,
}

impl Flag for Category {
    const ALL: &'static [Self] = &[
        Category::Reading,
        Category::Cognitive,
        Category::ExecutiveFunction,
        Category::Vision,
        Category::Physical,
        Category::Hearing,
        Category::SpeechCommunication,
        Category::TrainingTherapy,
    ];

    fn label(self) -> &'static str {
        match self {
            Category::Reading => "Reading",
            Category::Cognitive => "Cognitive",
            Category::ExecutiveFunction => "Executive Function",
            Category::Vision => "Vision",
            Category::Physical => "Physical",
            Category::Hearing => "Hearing",
            Category::SpeechCommunication => "Speech/Communication",
            Category::TrainingTherapy => "Training/Therapy",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Category::Reading => &["READING"],
            Category::Cognitive => &["COGNITIVE"],
            Category::ExecutiveFunction => &["EXECUTIVE FUNCTION", "EXECUTIVE_FUNCTION"],
            Category::Vision => &["VISION"],
            Category::Physical => &["PHYSICAL"],
            Category::Hearing => &["HEARING"],
            Category::SpeechCommunication => &["SPEECH/COMMUNICATION", "SPEECH", "COMMUNICATION"],
            Category::TrainingTherapy => &["TRAINING/THERAPY", "TRAINING", "THERAPY"],
        }
    }

    fn key(self) -> &'static str {
        match self {
            Category::Reading => "category.reading",
            Category::Cognitive => "category.cognitive",
            Category::ExecutiveFunction => "category.executive_function",
            Category::Vision => "category.vision",
            Category::Physical => "category.physical",
            Category::Hearing => "category.hearing",
            Category::SpeechCommunication => "category.speech_communication",
            Category::TrainingTherapy => "category.training_therapy",
        }
    }
}

/// Platform compatibility flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Windows,
    Macintosh,
    Chromebook,
    Ipad,
    Iphone,
    Android,
}

impl Flag for Platform {
    const ALL: &'static [Self] = &[
        Platform::Windows,
        Platform::Macintosh,
        Platform::Chromebook,
        Platform::Ipad,
        Platform::Iphone,
        Platform::Android,
    ];

    fn label(self) -> &'static str {
        match self {
            Platform::Windows => "Windows",
            Platform::Macintosh => "Macintosh",
            Platform::Chromebook => "Chromebook",
            Platform::Ipad => "iPad (iPadOS)",
            Platform::Iphone => "iPhone (iOS)",
            Platform::Android => "Android",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Platform::Windows => &["WINDOWS"],
            Platform::Macintosh => &["MACINTOSH", "MAC", "MACOS"],
            Platform::Chromebook => &["CHROMEBOOK", "CHROMEOS"],
            Platform::Ipad => &["IPAD (IPADOS)", "IPAD"],
            Platform::Iphone => &["IPHONE (IOS)", "IPHONE"],
            Platform::Android => &["ANDROID"],
        }
    }

    fn key(self) -> &'static str {
        match self {
            Platform::Windows => "platform.windows",
            Platform::Macintosh => "platform.macintosh",
            Platform::Chromebook => "platform.chromebook",
            Platform::Ipad => "platform.ipad",
            Platform::Iphone => "platform.iphone",
            Platform::Android => "platform.android",
        }
    }
}

/// Set of flags marked on a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagSet<F: Flag>(BTreeSet<F>);

impl<F: Flag> Default for FlagSet<F> {
    fn default() -> Self {
        Self(BTreeSet::new())
    }
}

impl<F: Flag> FlagSet<F> {
    pub fn insert(&mut self, flag: F) {
        self.0.insert(flag);
    }

    pub fn contains(&self, flag: F) -> bool {
        self.0.contains(&flag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = F> + '_ {
        self.0.iter().copied()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.iter().map(Flag::label).collect()
    }
}

impl<F: Flag> FromIterator<F> for FlagSet<F> {
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// ToolRecord
// ============================================================================

/// One row from the active or removed table.
///
/// Text fields are `None` when the column is unmapped or the cell is blank.
/// Records are never mutated after load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolRecord {
    pub table: TableKind,
    /// 0-based position within the source table
    pub row_index: usize,
    pub name: Option<String>,
    pub description: Option<String>,
    pub company: Option<String>,
    pub id_tag: Option<String>,
    pub vendor_url: Option<String>,
    pub auditor_notes: Option<String>,
    pub built_in: bool,
    pub at_installed: bool,
    pub pricing: FlagSet<Pricing>,
    pub categories: FlagSet<Category>,
    pub platforms: FlagSet<Platform>,
}

impl ToolRecord {
    /// Empty record at the given position; fields are filled by the loader
    /// or by the `with_*` builders
    pub fn new(table: TableKind, row_index: usize) -> Self {
        Self {
            table,
            row_index,
            name: None,
            description: None,
            company: None,
            id_tag: None,
            vendor_url: None,
            auditor_notes: None,
            built_in: false,
            at_installed: false,
            pricing: FlagSet::default(),
            categories: FlagSet::default(),
            platforms: FlagSet::default(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_company(mut self, company: &str) -> Self {
        self.company = Some(company.to_string());
        self
    }

    pub fn with_id_tag(mut self, id_tag: &str) -> Self {
        self.id_tag = Some(id_tag.to_string());
        self
    }

    pub fn with_vendor_url(mut self, url: &str) -> Self {
        self.vendor_url = Some(url.to_string());
        self
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.auditor_notes = Some(notes.to_string());
        self
    }

    pub fn with_built_in(mut self) -> Self {
        self.built_in = true;
        self
    }

    pub fn with_at_installed(mut self) -> Self {
        self.at_installed = true;
        self
    }

    pub fn with_pricing(mut self, pricing: Pricing) -> Self {
        self.pricing.insert(pricing);
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.categories.insert(category);
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platforms.insert(platform);
        self
    }

    /// Product name, if present and non-blank
    pub fn name(&self) -> Option<&str> {
        non_blank(&self.name)
    }

    pub fn description(&self) -> Option<&str> {
        non_blank(&self.description)
    }

    pub fn notes(&self) -> Option<&str> {
        non_blank(&self.auditor_notes)
    }

    /// Name for display in findings; records without one are labelled by position
    pub fn display_name(&self) -> String {
        match self.name() {
            Some(name) => name.to_string(),
            None => format!("<unnamed {} row {}>", self.table, self.row_index),
        }
    }

    /// Every mapped attribute except position and table, for exact-row
    /// duplicate detection
    pub fn content_key(&self) -> String {
        let text = |v: &Option<String>| v.as_deref().map(str::trim).unwrap_or("").to_string();
        format!(
            "{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}{}\u{1f}{:?}\u{1f}{:?}\u{1f}{:?}",
            text(&self.name),
            text(&self.description),
            text(&self.company),
            text(&self.id_tag),
            text(&self.vendor_url),
            text(&self.auditor_notes),
            u8::from(self.built_in),
            u8::from(self.at_installed),
            self.pricing,
            self.categories,
            self.platforms,
        )
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// ============================================================================
// Batch
// ============================================================================

/// An order-preserving slice of one table, processed as a unit.
///
/// `offset` is the position of the first record within the table, so
/// `records[i]` is table row `offset + i`.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    pub index: usize,
    pub table: TableKind,
    pub offset: usize,
    pub records: &'a [ToolRecord],
}

impl<'a> Batch<'a> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
