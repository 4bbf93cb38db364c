//! Resolution of per-member deduplication rules.

use std::collections::HashMap;

use gtfs_config::shared::{DedupPolicy, FileRuleConfig, default_file_rules};

use crate::archive::{strip_bom, strip_terminator};
use crate::key::FieldSplitter;

/// Deduplication rule for one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRule {
    /// Admission policy for the member's rows.
    pub policy: DedupPolicy,
    /// Ordered key column names, used under [`DedupPolicy::KeyDedup`].
    pub key_columns: Vec<String>,
}

/// Mapping from member name to deduplication rule, plus the policy for unknown members.
#[derive(Debug, Clone)]
pub struct KeyTable {
    rules: HashMap<String, FileRule>,
    fallback_policy: DedupPolicy,
}

impl Default for KeyTable {
    fn default() -> Self {
        Self::gtfs_defaults()
    }
}

impl KeyTable {
    /// Creates an empty table; every member falls back to `fallback_policy`.
    pub fn new(fallback_policy: DedupPolicy) -> Self {
        Self {
            rules: HashMap::new(),
            fallback_policy,
        }
    }

    /// Creates a table from configured rules. A later rule replaces an earlier one of the same
    /// name.
    pub fn from_rules(
        rules: impl IntoIterator<Item = FileRuleConfig>,
        fallback_policy: DedupPolicy,
    ) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| {
                (
                    rule.name,
                    FileRule {
                        policy: rule.policy,
                        key_columns: rule.key_columns,
                    },
                )
            })
            .collect();

        Self {
            rules,
            fallback_policy,
        }
    }

    /// Creates the table of built-in GTFS rules with a `key-dedup` fallback.
    pub fn gtfs_defaults() -> Self {
        Self::from_rules(default_file_rules(), DedupPolicy::KeyDedup)
    }

    /// Adds or replaces the rule for `name`.
    pub fn with_rule(mut self, name: &str, policy: DedupPolicy, key_columns: &[&str]) -> Self {
        self.rules.insert(
            name.to_string(),
            FileRule {
                policy,
                key_columns: key_columns.iter().map(|c| c.to_string()).collect(),
            },
        );
        self
    }

    /// Returns the rule for `member`, if any.
    pub fn rule(&self, member: &str) -> Option<&FileRule> {
        self.rules.get(member)
    }

    /// Returns the policy applied to members without a rule.
    pub fn fallback_policy(&self) -> DedupPolicy {
        self.fallback_policy
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if the table has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// How the rows of one member are deduplicated, resolved against the member's header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupPlan {
    policy: DedupPolicy,
    key_indices: Vec<usize>,
    fallback_column: Option<String>,
    is_fallback: bool,
}

impl DedupPlan {
    /// Returns the admission policy.
    pub fn policy(&self) -> DedupPolicy {
        self.policy
    }

    /// Returns the zero-based key column indices; empty unless the policy is `key-dedup`.
    pub fn key_indices(&self) -> &[usize] {
        &self.key_indices
    }

    /// Returns true when the member had no rule and the fallback policy applies.
    pub fn is_fallback(&self) -> bool {
        self.is_fallback
    }

    /// Returns the name of the first header column when a `key-dedup` fallback keys on it.
    pub fn fallback_column(&self) -> Option<&str> {
        self.fallback_column.as_deref()
    }
}

/// A configured key column is absent from the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingKeyColumn {
    /// The configured column name.
    pub column: String,
    /// The columns the header actually has.
    pub available: Vec<String>,
}

/// Resolves deduplication plans from a [`KeyTable`].
#[derive(Debug, Clone, Default)]
pub struct KeyExtractor {
    table: KeyTable,
}

impl KeyExtractor {
    /// Creates an extractor over `table`.
    pub fn new(table: KeyTable) -> Self {
        Self { table }
    }

    /// Resolves the deduplication plan of `member` from its raw header line.
    ///
    /// Members without a rule get the fallback policy, keyed on column 0 under `key-dedup`.
    /// Fails when a configured key column is not in the header.
    pub fn plan(&self, member: &str, header: &[u8]) -> Result<DedupPlan, MissingKeyColumn> {
        let Some(rule) = self.table.rule(member) else {
            let policy = self.table.fallback_policy();
            let fallback_column = policy
                .uses_key_columns()
                .then(|| header_columns(header).into_iter().next().unwrap_or_default());
            let key_indices = if policy.uses_key_columns() {
                vec![0]
            } else {
                Vec::new()
            };

            return Ok(DedupPlan {
                policy,
                key_indices,
                fallback_column,
                is_fallback: true,
            });
        };

        if !rule.policy.uses_key_columns() {
            return Ok(DedupPlan {
                policy: rule.policy,
                key_indices: Vec::new(),
                fallback_column: None,
                is_fallback: false,
            });
        }

        let columns = header_columns(header);
        let key_indices = rule
            .key_columns
            .iter()
            .map(|key_column| {
                columns
                    .iter()
                    .position(|column| column == key_column.trim())
                    .ok_or_else(|| MissingKeyColumn {
                        column: key_column.clone(),
                        available: columns.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DedupPlan {
            policy: rule.policy,
            key_indices,
            fallback_column: None,
            is_fallback: false,
        })
    }
}

/// Returns the column names of a raw header line.
///
/// A leading byte-order marker and the line terminator are removed before splitting, and names
/// are trimmed of surrounding whitespace.
pub fn header_columns(header: &[u8]) -> Vec<String> {
    let line = strip_bom(strip_terminator(header));
    let mut splitter = FieldSplitter::new();

    splitter
        .split(line)
        .iter()
        .map(|name| String::from_utf8_lossy(name).trim().to_string())
        .collect()
}
