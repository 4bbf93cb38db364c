//! Core merger that drives the per-member merge across all input archives.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::archive::{InputArchive, OutputArchive};
use crate::config::MergerConfig;
use crate::engine::{MemberMergeResult, merge_member};
use crate::error::{MergerError, MergerResult};
use crate::events::{EventSink, MergeEvent};
use crate::key::KeyExtractor;

/// Summary of a complete merge run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    /// Number of input archives, the reference included.
    pub archives: usize,
    /// Per-member results in output order.
    pub members: Vec<MemberMergeResult>,
    /// Directory entries reproduced from the reference archive.
    pub directories: Vec<String>,
    /// Body rows written across all members.
    pub rows_written: u64,
    /// Rows dropped as exact repeats across all members.
    pub exact_duplicates: u64,
    /// Rows dropped for a repeated key across all members.
    pub key_conflicts: u64,
    /// Skipped (member, archive) pairs, for a header mismatch or a missing member.
    pub skipped_archives: usize,
}

impl MergeSummary {
    fn new(archives: usize) -> Self {
        Self {
            archives,
            ..Default::default()
        }
    }

    fn add_member(&mut self, result: MemberMergeResult) {
        self.rows_written += result.rows_written;
        self.exact_duplicates += result.exact_duplicates;
        self.key_conflicts += result.key_conflicts;
        self.skipped_archives += result.header_mismatches + result.archives_missing_member;
        self.members.push(result);
    }

    /// Returns the result of `member`, if it was merged.
    pub fn member(&self, member: &str) -> Option<&MemberMergeResult> {
        self.members.iter().find(|result| result.member == member)
    }
}

/// Merges GTFS archives into one archive.
///
/// The first input is the reference: its members, in its order, are the members of the output,
/// and its headers are the headers of the output members.
#[derive(Debug, Clone)]
pub struct Merger {
    config: MergerConfig,
    extractor: KeyExtractor,
}

impl Merger {
    /// Creates a new merger.
    pub fn new(config: MergerConfig) -> Self {
        let extractor = KeyExtractor::new(config.key_table.clone());

        Self { config, extractor }
    }

    /// Merges `inputs` into a new archive at `output`.
    ///
    /// The archive appears at `output` only if every member was merged; on error nothing is
    /// written there.
    pub fn merge<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        output: &Path,
        events: &mut dyn EventSink,
    ) -> MergerResult<MergeSummary> {
        if inputs.is_empty() || output.as_os_str().is_empty() {
            return Err(MergerError::MissingArguments);
        }

        let archives = inputs
            .iter()
            .map(|path| InputArchive::open(path.as_ref()))
            .collect::<MergerResult<Vec<_>>>()?;
        ensure_output_is_not_input(&archives, output)?;

        let reference = &archives[0];
        let members = reference.members()?;

        info!(
            reference = %reference.path().display(),
            archives = archives.len(),
            members = members.len(),
            output = %output.display(),
            "starting merge"
        );

        let mut writer = OutputArchive::create(output, self.config.compression)?;
        let mut summary = MergeSummary::new(archives.len());

        for entry in members {
            if entry.is_dir {
                debug!(directory = %entry.name, "copying directory entry");
                writer.add_directory(&entry.name)?;
                summary.directories.push(entry.name);
                continue;
            }

            events.record(MergeEvent::MemberStarted {
                member: entry.name.clone(),
            });

            writer.start_member(&entry.name)?;
            let result = merge_member(
                &entry.name,
                &archives,
                &self.extractor,
                &mut writer,
                &mut *events,
            )?;

            events.record(MergeEvent::MemberFinished {
                result: result.clone(),
            });
            summary.add_member(result);
        }

        writer.finish()?;

        info!(
            members = summary.members.len(),
            rows_written = summary.rows_written,
            exact_duplicates = summary.exact_duplicates,
            key_conflicts = summary.key_conflicts,
            skipped_archives = summary.skipped_archives,
            "merge completed"
        );

        Ok(summary)
    }
}

fn ensure_output_is_not_input(archives: &[InputArchive], output: &Path) -> MergerResult<()> {
    let Ok(output_path) = fs::canonicalize(output) else {
        // Inputs exist, so an output path that does not resolve cannot be one of them.
        return Ok(());
    };

    let is_input = archives.iter().any(|archive| {
        fs::canonicalize(archive.path())
            .map(|path| path == output_path)
            .unwrap_or(false)
    });

    if is_input {
        return Err(MergerError::OutputIsInput(PathBuf::from(output)));
    }

    Ok(())
}
