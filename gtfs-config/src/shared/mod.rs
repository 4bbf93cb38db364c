//! Settings types shared by the merge library and the `gtfs-merge` binary.

mod rules;
mod settings;
mod validation;

pub use rules::{DedupPolicy, FileRuleConfig, default_file_rules};
pub use settings::{MergeSettings, OutputCompression};
pub use validation::ValidationError;
