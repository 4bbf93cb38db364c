//! Key extraction for row deduplication.
//!
//! A [`KeyTable`] maps member names to deduplication rules. The [`KeyExtractor`] resolves a
//! member's rule against the member's header into a [`DedupPlan`], and [`RowKey`] holds the key
//! tuple of one row.

mod extractor;
mod row_key;

pub use extractor::{DedupPlan, FileRule, KeyExtractor, KeyTable, MissingKeyColumn, header_columns};
pub use row_key::{FieldSplitter, RowKey};
