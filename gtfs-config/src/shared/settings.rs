use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::Config;
use crate::shared::{DedupPolicy, FileRuleConfig, ValidationError, default_file_rules};

/// Compression applied to every member of the output archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputCompression {
    /// Members are stored uncompressed.
    #[default]
    Stored,
    /// Members are deflate-compressed.
    Deflated,
}

/// Settings of a merge run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MergeSettings {
    /// Rules that override built-in rules with the same name or add new ones.
    #[serde(default)]
    pub files: Vec<FileRuleConfig>,
    /// Discards the built-in GTFS rules so that only `files` applies.
    #[serde(default)]
    pub replace_default_rules: bool,
    /// Policy for members without a rule. Under `key-dedup` the first column is the key.
    #[serde(default)]
    pub fallback_policy: DedupPolicy,
    /// Members whose rows all pass through, whatever rule would apply otherwise.
    #[serde(default)]
    pub pass_all_files: Vec<String>,
    /// Members that only drop byte-identical rows, whatever rule would apply otherwise.
    #[serde(default)]
    pub exact_only_files: Vec<String>,
    /// Compression of the output members.
    #[serde(default)]
    pub compression: OutputCompression,
}

impl Config for MergeSettings {
    const LIST_PARSE_KEYS: &'static [&'static str] = &["pass_all_files", "exact_only_files"];
}

impl MergeSettings {
    /// Validates the settings.
    ///
    /// Each rule must be valid on its own and rule names must be unique within `files`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut names = HashSet::with_capacity(self.files.len());
        for rule in &self.files {
            rule.validate()?;

            if !names.insert(rule.name.as_str()) {
                return Err(ValidationError::DuplicateRule(rule.name.clone()));
            }
        }

        if self.pass_all_files.iter().any(|name| name.is_empty()) {
            return Err(ValidationError::EmptyExemption("pass_all_files"));
        }

        if self.exact_only_files.iter().any(|name| name.is_empty()) {
            return Err(ValidationError::EmptyExemption("exact_only_files"));
        }

        Ok(())
    }

    /// Returns the effective rule list.
    ///
    /// Starts from the built-in rules (unless `replace_default_rules` is set), applies `files`
    /// by name and finally the `exact_only_files` and `pass_all_files` exemptions, the latter
    /// winning when a name is listed in both.
    pub fn resolved_rules(&self) -> Vec<FileRuleConfig> {
        let mut rules = if self.replace_default_rules {
            Vec::new()
        } else {
            default_file_rules()
        };

        for rule in &self.files {
            upsert_rule(&mut rules, rule.clone());
        }

        for name in &self.exact_only_files {
            exempt(&mut rules, name, DedupPolicy::NoDedupPassExactOnly);
        }

        for name in &self.pass_all_files {
            exempt(&mut rules, name, DedupPolicy::NoDedupPassAll);
        }

        rules
    }
}

fn upsert_rule(rules: &mut Vec<FileRuleConfig>, rule: FileRuleConfig) {
    match rules.iter_mut().find(|existing| existing.name == rule.name) {
        Some(existing) => *existing = rule,
        None => rules.push(rule),
    }
}

fn exempt(rules: &mut Vec<FileRuleConfig>, name: &str, policy: DedupPolicy) {
    match rules.iter_mut().find(|existing| existing.name == name) {
        Some(existing) => existing.policy = policy,
        None => rules.push(FileRuleConfig::unkeyed(name, policy)),
    }
}
