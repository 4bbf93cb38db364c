//! Row merge for a single member across all input archives.

use std::io::{self, Write};
use std::path::Path;

use gtfs_config::shared::DedupPolicy;
use serde::Serialize;
use tracing::debug;
use zip::result::ZipError;

use crate::archive::{InputArchive, MemberLines, line_terminator, strip_terminator};
use crate::error::{MergerError, MergerResult};
use crate::events::{DuplicateKind, EventSink, MergeEvent, SkipReason};
use crate::key::KeyExtractor;
use crate::seen::{Admission, SeenRows};

/// Terminator appended to a final body line that has none, when the header has none either.
const DEFAULT_TERMINATOR: &[u8] = b"\n";

/// Result of merging one member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemberMergeResult {
    /// Member name.
    pub member: String,
    /// Admission policy used.
    pub policy: DedupPolicy,
    /// Whether the member had no rule and the fallback policy applied.
    pub key_fallback: bool,
    /// Body rows written to the output.
    pub rows_written: u64,
    /// Rows dropped as exact repeats.
    pub exact_duplicates: u64,
    /// Rows dropped for a repeated key with different content.
    pub key_conflicts: u64,
    /// Archives whose rows were merged, the reference included.
    pub archives_merged: usize,
    /// Archives skipped because their header differs from the reference.
    pub header_mismatches: usize,
    /// Archives without the member.
    pub archives_missing_member: usize,
}

impl MemberMergeResult {
    fn new(member: &str) -> Self {
        Self {
            member: member.to_string(),
            ..Default::default()
        }
    }
}

/// What one archive contributed to a member.
enum ArchiveRows {
    HeaderMismatch,
    Merged,
}

/// Merges the member `member` of every archive into `output`.
///
/// The header is read from the first archive, the reference, and written once. Each archive,
/// the reference included, then streams its body rows through the member's admission state in
/// argument order; an archive that lacks the member or has a different header is skipped and
/// reported. Admitted rows are written verbatim.
pub fn merge_member<W: Write>(
    member: &str,
    archives: &[InputArchive],
    extractor: &KeyExtractor,
    output: &mut W,
    events: &mut dyn EventSink,
) -> MergerResult<MemberMergeResult> {
    let Some(reference) = archives.first() else {
        return Err(MergerError::MissingArguments);
    };

    let mut result = MemberMergeResult::new(member);

    let header = reference
        .read_member(member, |lines| read_header(lines, member, reference.path()))?
        .ok_or_else(|| MergerError::ReferenceMemberUnreadable {
            member: member.to_string(),
            archive: reference.path().to_path_buf(),
            source: ZipError::FileNotFound,
        })?;

    write_line(output, member, &header)?;

    if header.is_empty() {
        debug!(%member, "reference member is empty, nothing to merge");
        return Ok(result);
    }

    let plan = extractor
        .plan(member, &header)
        .map_err(|missing| MergerError::KeyColumnNotFound {
            member: member.to_string(),
            column: missing.column,
            archive: reference.path().to_path_buf(),
            available: missing.available.join(", "),
        })?;

    result.policy = plan.policy();
    result.key_fallback = plan.is_fallback();

    if plan.is_fallback() {
        events.record(MergeEvent::KeyFallback {
            member: member.to_string(),
            policy: plan.policy(),
            column: plan.fallback_column().map(str::to_string),
        });
    }

    let terminator = match line_terminator(&header) {
        [] => DEFAULT_TERMINATOR,
        terminator => terminator,
    };

    let mut seen = SeenRows::for_plan(&plan);

    for (position, archive) in archives.iter().enumerate() {
        events.record(MergeEvent::ArchiveConsulted {
            member: member.to_string(),
            archive: archive.path().to_path_buf(),
            reference: position == 0,
        });

        let mut merge = ArchiveMerge {
            member,
            archive: archive.path(),
            header: &header,
            terminator,
            seen: &mut seen,
            output: &mut *output,
            events: &mut *events,
        };
        let contribution = archive.read_member(member, |lines| merge.merge_rows(lines))?;

        let reason = match contribution {
            Some(ArchiveRows::Merged) => {
                result.archives_merged += 1;
                continue;
            }
            Some(ArchiveRows::HeaderMismatch) => {
                result.header_mismatches += 1;
                SkipReason::HeaderMismatch
            }
            None => {
                result.archives_missing_member += 1;
                SkipReason::MemberMissingInArchive
            }
        };

        events.record(MergeEvent::ArchiveSkipped {
            member: member.to_string(),
            archive: archive.path().to_path_buf(),
            reason,
        });
    }

    let stats = seen.stats();
    result.rows_written = stats.admitted;
    result.exact_duplicates = stats.exact_duplicates;
    result.key_conflicts = stats.key_conflicts;

    Ok(result)
}

/// Streams the body of one archive's member through the member's admission state.
struct ArchiveMerge<'a, W: Write> {
    member: &'a str,
    archive: &'a Path,
    header: &'a [u8],
    terminator: &'a [u8],
    seen: &'a mut SeenRows,
    output: &'a mut W,
    events: &'a mut dyn EventSink,
}

impl<W: Write> ArchiveMerge<'_, W> {
    fn merge_rows(&mut self, lines: &mut MemberLines<'_>) -> MergerResult<ArchiveRows> {
        let mut line = Vec::new();

        let has_header = lines
            .next_line(&mut line)
            .map_err(|err| self.read_error(err))?;
        if !has_header || line != self.header {
            return Ok(ArchiveRows::HeaderMismatch);
        }

        while lines
            .next_line(&mut line)
            .map_err(|err| self.read_error(err))?
        {
            if line_terminator(&line).is_empty() {
                line.extend_from_slice(self.terminator);
            }

            let kind = match self.seen.admit(&line) {
                Admission::Admitted => {
                    write_line(self.output, self.member, &line)?;
                    continue;
                }
                Admission::ExactDuplicate => DuplicateKind::ExactDuplicate,
                Admission::KeyConflict => DuplicateKind::KeyConflict,
            };

            self.events.record(MergeEvent::DuplicateRow {
                member: self.member.to_string(),
                archive: self.archive.to_path_buf(),
                kind,
                line_number: lines.line_number(),
                line: String::from_utf8_lossy(strip_terminator(&line)).into_owned(),
            });
        }

        Ok(ArchiveRows::Merged)
    }

    fn read_error(&self, source: io::Error) -> MergerError {
        MergerError::MemberRead {
            member: self.member.to_string(),
            archive: self.archive.to_path_buf(),
            source,
        }
    }
}

fn read_header(lines: &mut MemberLines<'_>, member: &str, archive: &Path) -> MergerResult<Vec<u8>> {
    let mut header = Vec::new();
    lines
        .next_line(&mut header)
        .map_err(|source| MergerError::MemberRead {
            member: member.to_string(),
            archive: archive.to_path_buf(),
            source,
        })?;

    Ok(header)
}

fn write_line<W: Write>(output: &mut W, member: &str, line: &[u8]) -> MergerResult<()> {
    output
        .write_all(line)
        .map_err(|err| MergerError::MemberWrite {
            member: member.to_string(),
            source: ZipError::Io(err),
        })
}
