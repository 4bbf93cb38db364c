use std::fmt;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// How rows of one member are admitted into the merged output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupPolicy {
    /// A row is admitted only if its key tuple was not seen before for the member.
    #[default]
    KeyDedup,
    /// A row is admitted only if its exact bytes were not seen before for the member.
    NoDedupPassExactOnly,
    /// Every row of a compatible member is admitted.
    NoDedupPassAll,
}

impl DedupPolicy {
    /// Returns the configuration name of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            DedupPolicy::KeyDedup => "key-dedup",
            DedupPolicy::NoDedupPassExactOnly => "no-dedup-pass-exact-only",
            DedupPolicy::NoDedupPassAll => "no-dedup-pass-all",
        }
    }

    /// Returns `true` when the policy needs key columns resolved from the header.
    pub fn uses_key_columns(&self) -> bool {
        matches!(self, DedupPolicy::KeyDedup)
    }
}

impl fmt::Display for DedupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deduplication rule for one archive member, identified by its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FileRuleConfig {
    /// Member name inside the archive, e.g. `stops.txt`.
    pub name: String,
    /// Admission policy for the member's rows.
    #[serde(default)]
    pub policy: DedupPolicy,
    /// Ordered column names forming the key tuple. Only read under `key-dedup`.
    #[serde(default)]
    pub key_columns: Vec<String>,
}

impl FileRuleConfig {
    /// Creates a `key-dedup` rule keyed on the given columns.
    pub fn keyed(name: &str, key_columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            policy: DedupPolicy::KeyDedup,
            key_columns: key_columns.iter().map(|column| column.to_string()).collect(),
        }
    }

    /// Creates a rule with a policy that does not need key columns.
    pub fn unkeyed(name: &str, policy: DedupPolicy) -> Self {
        Self {
            name: name.to_string(),
            policy,
            key_columns: Vec::new(),
        }
    }

    /// Validates a single rule.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyRuleName);
        }

        if self.policy.uses_key_columns() && self.key_columns.is_empty() {
            return Err(ValidationError::MissingKeyColumns(self.name.clone()));
        }

        if self.key_columns.iter().any(|column| column.is_empty()) {
            return Err(ValidationError::EmptyKeyColumn(self.name.clone()));
        }

        Ok(())
    }
}

/// Built-in rules for the files of a GTFS static feed.
///
/// Keys follow the primary keys of the GTFS reference. Files whose identifying columns are
/// optional in published feeds only drop byte-identical rows.
pub fn default_file_rules() -> Vec<FileRuleConfig> {
    vec![
        FileRuleConfig::keyed("agency.txt", &["agency_id"]),
        FileRuleConfig::keyed("stops.txt", &["stop_id"]),
        FileRuleConfig::keyed("routes.txt", &["route_id"]),
        FileRuleConfig::keyed("trips.txt", &["trip_id"]),
        FileRuleConfig::keyed("stop_times.txt", &["trip_id", "stop_sequence"]),
        FileRuleConfig::keyed("calendar.txt", &["service_id"]),
        FileRuleConfig::keyed("calendar_dates.txt", &["service_id", "date"]),
        FileRuleConfig::keyed("fare_attributes.txt", &["fare_id"]),
        FileRuleConfig::keyed("shapes.txt", &["shape_id", "shape_pt_sequence"]),
        FileRuleConfig::keyed("frequencies.txt", &["trip_id", "start_time"]),
        FileRuleConfig::keyed("transfers.txt", &["from_stop_id", "to_stop_id"]),
        FileRuleConfig::keyed("pathways.txt", &["pathway_id"]),
        FileRuleConfig::keyed("levels.txt", &["level_id"]),
        FileRuleConfig::unkeyed("fare_rules.txt", DedupPolicy::NoDedupPassExactOnly),
        FileRuleConfig::unkeyed("feed_info.txt", DedupPolicy::NoDedupPassExactOnly),
        FileRuleConfig::unkeyed("translations.txt", DedupPolicy::NoDedupPassExactOnly),
        FileRuleConfig::unkeyed("attributions.txt", DedupPolicy::NoDedupPassExactOnly),
    ]
}
