//! Configuration for the GTFS merge tool.
//!
//! Holds the serde-deserializable [`shared::MergeSettings`] (per-filename key-column table,
//! deduplication policies and output options) and the layered loader that reads them from an
//! optional settings file and `GTFS_MERGE_`-prefixed environment variables.

mod load;
pub mod shared;

pub use load::{Config, LoadConfigError, load_config_from};
