//! GTFS Merger - Merges GTFS feed archives into one archive.
//!
//! Every input is a ZIP archive of comma-separated text files. The first input is the
//! reference: its member list, in its order, defines the members of the output, and its
//! header line of each member is written verbatim as the header of the output member. Rows are
//! then streamed from every archive in argument order, the reference included, and
//! deduplicated per member according to a per-filename policy:
//!
//! - `key-dedup`: a row is kept if its key tuple (the values of the configured key columns)
//!   was not seen before for the member,
//! - `no-dedup-pass-exact-only`: a row is kept if its exact bytes were not seen before,
//! - `no-dedup-pass-all`: every row is kept.
//!
//! An archive whose member header differs from the reference header, or that lacks the member,
//! contributes nothing to that member and is reported through an [`EventSink`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use gtfs_merger::{Merger, MergerConfig, TracingEventSink};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let merger = Merger::new(MergerConfig::default());
//!
//!     let summary = merger.merge(
//!         &["feeds/north.zip", "feeds/south.zip"],
//!         Path::new("merged.zip"),
//!         &mut TracingEventSink,
//!     )?;
//!     println!("Wrote {} rows", summary.rows_written);
//!
//!     Ok(())
//! }
//! ```

pub mod archive;
mod config;
mod engine;
mod error;
mod events;
mod inputs;
pub mod key;
mod merger;
mod seen;

pub use config::MergerConfig;
pub use engine::{MemberMergeResult, merge_member};
pub use error::{MergerError, MergerResult};
pub use events::{DuplicateKind, EventSink, MemoryEventSink, MergeEvent, SkipReason, TracingEventSink};
pub use inputs::{ResolvedPaths, expand_input_patterns, resolve_paths};
pub use merger::{MergeSummary, Merger};
pub use seen::{Admission, SeenRows, SeenStats};
