//! Per-member admission state.

use std::collections::hash_map::{DefaultHasher, Entry};
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use gtfs_config::shared::DedupPolicy;

use crate::archive::strip_terminator;
use crate::key::{DedupPlan, FieldSplitter, RowKey};

/// Outcome of offering a row to [`SeenRows::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The row is new and must be written.
    Admitted,
    /// The row repeats an admitted row byte for byte.
    ExactDuplicate,
    /// The row's key was admitted before with different content.
    KeyConflict,
}

/// Counters of admission outcomes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeenStats {
    /// Rows admitted.
    pub admitted: u64,
    /// Rows dropped as exact repeats.
    pub exact_duplicates: u64,
    /// Rows dropped for a repeated key with different content.
    pub key_conflicts: u64,
}

enum SeenState {
    /// Key tuple of every admitted row, with a digest of the admitted line.
    Keyed {
        key_indices: Vec<usize>,
        splitter: FieldSplitter,
        keys: HashMap<RowKey, u64>,
    },
    /// Every admitted line.
    Exact { lines: HashSet<Box<[u8]>> },
    PassAll,
}

/// Rows seen while merging one member.
///
/// Built fresh for every member from its [`DedupPlan`] and dropped with the member, so keys of
/// unrelated files never meet.
pub struct SeenRows {
    state: SeenState,
    stats: SeenStats,
}

impl SeenRows {
    /// Creates the admission state for a member.
    pub fn for_plan(plan: &DedupPlan) -> Self {
        let state = match plan.policy() {
            DedupPolicy::KeyDedup => SeenState::Keyed {
                key_indices: plan.key_indices().to_vec(),
                splitter: FieldSplitter::new(),
                keys: HashMap::new(),
            },
            DedupPolicy::NoDedupPassExactOnly => SeenState::Exact {
                lines: HashSet::new(),
            },
            DedupPolicy::NoDedupPassAll => SeenState::PassAll,
        };

        Self {
            state,
            stats: SeenStats::default(),
        }
    }

    /// Decides whether `line`, as it would be written, enters the output, and records it if so.
    ///
    /// Under `key-dedup` the exact/conflict distinction of a dropped row compares line digests
    /// and only feeds diagnostics.
    pub fn admit(&mut self, line: &[u8]) -> Admission {
        let admission = match &mut self.state {
            SeenState::Keyed {
                key_indices,
                splitter,
                keys,
            } => {
                let key = splitter.key(strip_terminator(line), key_indices);
                let digest = line_digest(line);

                match keys.entry(key) {
                    Entry::Vacant(entry) => {
                        entry.insert(digest);
                        Admission::Admitted
                    }
                    Entry::Occupied(entry) if *entry.get() == digest => Admission::ExactDuplicate,
                    Entry::Occupied(_) => Admission::KeyConflict,
                }
            }
            SeenState::Exact { lines } => {
                if lines.contains(line) {
                    Admission::ExactDuplicate
                } else {
                    lines.insert(line.into());
                    Admission::Admitted
                }
            }
            SeenState::PassAll => Admission::Admitted,
        };

        match admission {
            Admission::Admitted => self.stats.admitted += 1,
            Admission::ExactDuplicate => self.stats.exact_duplicates += 1,
            Admission::KeyConflict => self.stats.key_conflicts += 1,
        }

        admission
    }

    /// Returns the number of distinct keys or lines recorded.
    pub fn len(&self) -> usize {
        match &self.state {
            SeenState::Keyed { keys, .. } => keys.len(),
            SeenState::Exact { lines } => lines.len(),
            SeenState::PassAll => 0,
        }
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns admission statistics.
    pub fn stats(&self) -> &SeenStats {
        &self.stats
    }
}

fn line_digest(line: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    line.hash(&mut hasher);
    hasher.finish()
}
