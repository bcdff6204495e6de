//! Duplicate detection
//!
//! # Algorithm
//! 1. Build a [`RecordProfile`] per named record (nameless records are
//!    skipped and counted)
//! 2. Ask the [`CandidateBlocker`] which pairs to compare
//! 3. Score each pair; duplicates are merged in a disjoint-set forest
//! 4. Components with two or more members become [`DuplicateGroup`]s
//!
//! Exact normalized-name matches are always merged. Transitive merging
//! means A~B and B~C report one group {A, B, C}, never overlapping pairs.
//!
//! Output is sorted by (table, row_index) inside each group and by first
//! member across groups, so repeated runs over the same data are identical
//! regardless of blocker.

use super::similarity::{score, RecordProfile, SimilarityThresholds};
use crate::dataset::DatasetView;
use crate::error::AuditResult;
use crate::models::findings::{DuplicateGroup, MemberRef};
use crate::models::report::{BatchStats, DuplicatesResult};
use crate::models::{TableKind, ToolRecord};
use std::collections::{BTreeMap, HashSet};

// ============================================================================
// Candidate blocking
// ============================================================================

/// Chooses which profile pairs get scored. Returned pairs are `(i, j)` with
/// `i < j`, indexes into the profile slice.
pub trait CandidateBlocker: Send + Sync {
    fn candidate_pairs(&self, profiles: &[RecordProfile]) -> Vec<(usize, usize)>;
}

/// Every unordered pair; O(n²), fine for low thousands of rows
#[derive(Debug, Clone, Copy, Default)]
pub struct AllPairs;

impl CandidateBlocker for AllPairs {
    fn candidate_pairs(&self, profiles: &[RecordProfile]) -> Vec<(usize, usize)> {
        let n = profiles.len();
        let mut pairs = Vec::with_capacity(n.saturating_sub(1) * n / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                pairs.push((i, j));
            }
        }
        pairs
    }
}

/// Only pairs sharing a name token or a name prefix.
///
/// Exact-name matches always share a token so they are never lost; pairs
/// that are similar only by edit distance across token boundaries may be.
#[derive(Debug, Clone, Copy)]
pub struct SharedTokenBlocker {
    pub prefix_len: usize,
}

impl Default for SharedTokenBlocker {
    fn default() -> Self {
        Self { prefix_len: 4 }
    }
}

impl CandidateBlocker for SharedTokenBlocker {
    fn candidate_pairs(&self, profiles: &[RecordProfile]) -> Vec<(usize, usize)> {
        let mut buckets: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (idx, profile) in profiles.iter().enumerate() {
            for token in &profile.name_tokens {
                buckets.entry(format!("t:{}", token)).or_default().push(idx);
            }
            let compact: String = profile.normalized_name.chars().filter(|c| *c != ' ').collect();
            let prefix: String = compact.chars().take(self.prefix_len).collect();
            buckets.entry(format!("p:{}", prefix)).or_default().push(idx);
        }

        let mut seen = HashSet::new();
        for members in buckets.values() {
            for (pos, &i) in members.iter().enumerate() {
                for &j in &members[pos + 1..] {
                    let pair = if i < j { (i, j) } else { (j, i) };
                    if pair.0 != pair.1 {
                        seen.insert(pair);
                    }
                }
            }
        }

        let mut pairs: Vec<(usize, usize)> = seen.into_iter().collect();
        pairs.sort_unstable();
        pairs
    }
}

// ============================================================================
// Disjoint set
// ============================================================================

struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

// ============================================================================
// Analyzer
// ============================================================================

/// Groups found in one record set
#[derive(Debug, Clone, PartialEq)]
pub struct Grouping {
    pub groups: Vec<DuplicateGroup>,
    pub skipped_nameless: usize,
}

pub struct DuplicateAnalyzer {
    thresholds: SimilarityThresholds,
    blocker: Box<dyn CandidateBlocker>,
}

impl Default for DuplicateAnalyzer {
    fn default() -> Self {
        Self {
            thresholds: SimilarityThresholds::default(),
            blocker: Box::new(AllPairs),
        }
    }
}

impl DuplicateAnalyzer {
    pub fn with_thresholds(thresholds: SimilarityThresholds) -> Self {
        Self {
            thresholds,
            ..Self::default()
        }
    }

    pub fn with_blocker(mut self, blocker: Box<dyn CandidateBlocker>) -> Self {
        self.blocker = blocker;
        self
    }

    /// Cluster records into duplicate groups
    pub fn find_groups<'a>(&self, records: impl IntoIterator<Item = &'a ToolRecord>) -> Grouping {
        let mut skipped_nameless = 0;
        let profiles: Vec<RecordProfile> = records
            .into_iter()
            .filter_map(|record| {
                let profile = RecordProfile::build(record);
                if profile.is_none() {
                    skipped_nameless += 1;
                }
                profile
            })
            .collect();

        let mut forest = DisjointSet::new(profiles.len());
        for (i, j) in self.blocker.candidate_pairs(&profiles) {
            let pair = score(&profiles[i], &profiles[j], &self.thresholds);
            if pair.is_duplicate(&self.thresholds) {
                tracing::trace!(
                    a = %profiles[i].display_name,
                    b = %profiles[j].display_name,
                    name = pair.name,
                    combined = pair.combined,
                    "Duplicate pair"
                );
                forest.union(i, j);
            }
        }

        let mut components: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for idx in 0..profiles.len() {
            let root = forest.find(idx);
            components.entry(root).or_default().push(idx);
        }

        let mut groups: Vec<DuplicateGroup> = components
            .into_values()
            .filter(|members| members.len() > 1)
            .map(|members| build_group(&profiles, &members))
            .collect();
        groups.sort_by(|a, b| a.members[0].cmp(&b.members[0]));

        Grouping {
            groups,
            skipped_nameless,
        }
    }

    /// Full duplicates analysis over the dataset
    pub fn analyze(&self, view: &DatasetView) -> AuditResult<DuplicatesResult> {
        let active = view.require(TableKind::Active)?;

        let active_grouping = self.find_groups(&active.records);

        let mut exact_row_duplicates = BTreeMap::new();
        exact_row_duplicates.insert(TableKind::Active, exact_row_duplicates_in(&active.records));

        let combined_groups = match &view.removed {
            Some(removed) => {
                exact_row_duplicates.insert(TableKind::Removed, exact_row_duplicates_in(&removed.records));
                self.find_groups(active.records.iter().chain(removed.records.iter()))
                    .groups
            }
            None => Vec::new(),
        };

        tracing::info!(
            active_groups = active_grouping.groups.len(),
            combined_groups = combined_groups.len(),
            skipped_nameless = active_grouping.skipped_nameless,
            "Duplicate analysis complete"
        );

        Ok(DuplicatesResult {
            exact_row_duplicates,
            active_groups: active_grouping.groups,
            combined_groups,
            removed_table_present: view.removed.is_some(),
            skipped_nameless: active_grouping.skipped_nameless,
            batches: BatchStats::unbatched(),
        })
    }
}

fn build_group(profiles: &[RecordProfile], members: &[usize]) -> DuplicateGroup {
    let mut refs: Vec<MemberRef> = members
        .iter()
        .map(|&idx| MemberRef {
            table: profiles[idx].table,
            row_index: profiles[idx].row_index,
            tool_name: profiles[idx].display_name.clone(),
        })
        .collect();
    refs.sort();

    let first_name = &profiles[members[0]].normalized_name;
    let exact_name = members.iter().all(|&idx| profiles[idx].normalized_name == *first_name);
    let spans_tables = refs.iter().any(|m| m.table == TableKind::Active)
        && refs.iter().any(|m| m.table == TableKind::Removed);

    DuplicateGroup {
        members: refs,
        spans_tables,
        exact_name,
    }
}

/// Rows identical in every mapped field to an earlier row
pub fn exact_row_duplicates_in(records: &[ToolRecord]) -> usize {
    let mut seen = HashSet::new();
    records.iter().filter(|r| !seen.insert(r.content_key())).count()
}
