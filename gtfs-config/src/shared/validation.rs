use thiserror::Error;

/// Settings validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A file rule was declared without a member name.
    #[error("a file rule has an empty `name`")]
    EmptyRuleName,
    /// Two file rules target the same member name.
    #[error("file rule `{0}` is declared more than once")]
    DuplicateRule(String),
    /// A `key-dedup` rule has no key columns to deduplicate on.
    #[error("file rule `{0}` uses `key-dedup` but lists no `key_columns`")]
    MissingKeyColumns(String),
    /// A key column name is empty.
    #[error("file rule `{0}` contains an empty key column name")]
    EmptyKeyColumn(String),
    /// A policy exemption list names an empty file.
    #[error("`{0}` contains an empty file name")]
    EmptyExemption(&'static str),
}
