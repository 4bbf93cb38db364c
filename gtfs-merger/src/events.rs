//! Merge events and the sinks that receive them.
//!
//! Events are reported for auditability only; no sink can change how rows are merged.

use std::fmt;
use std::path::PathBuf;

use gtfs_config::shared::DedupPolicy;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::engine::MemberMergeResult;

/// Why an archive contributed nothing to a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The archive has no member with that name.
    MemberMissingInArchive,
    /// The member's header differs from the reference header.
    HeaderMismatch,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MemberMissingInArchive => f.write_str("member missing in archive"),
            SkipReason::HeaderMismatch => f.write_str("header does not match the reference"),
        }
    }
}

/// Classification of a dropped row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKind {
    /// Same content as an admitted row.
    ExactDuplicate,
    /// Same key as an admitted row, different content.
    KeyConflict,
}

/// Something that happened while merging.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeEvent {
    /// Merging of a member started.
    MemberStarted { member: String },
    /// An archive is being read for a member.
    ArchiveConsulted {
        member: String,
        archive: PathBuf,
        reference: bool,
    },
    /// An archive's contribution to a member was skipped.
    ArchiveSkipped {
        member: String,
        archive: PathBuf,
        reason: SkipReason,
    },
    /// A member has no rule and the fallback policy applies.
    KeyFallback {
        member: String,
        policy: DedupPolicy,
        column: Option<String>,
    },
    /// A row was dropped.
    DuplicateRow {
        member: String,
        archive: PathBuf,
        kind: DuplicateKind,
        line_number: u64,
        line: String,
    },
    /// Merging of a member finished.
    MemberFinished { result: MemberMergeResult },
}

/// Receiver of [`MergeEvent`]s.
pub trait EventSink {
    /// Records one event.
    fn record(&mut self, event: MergeEvent);
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn record(&mut self, event: MergeEvent) {
        (**self).record(event);
    }
}

/// Sink that renders events as `tracing` log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&mut self, event: MergeEvent) {
        match event {
            MergeEvent::MemberStarted { member } => info!(%member, "processing member"),
            MergeEvent::ArchiveConsulted {
                member,
                archive,
                reference,
            } => info!(%member, archive = %archive.display(), reference, "reading archive"),
            MergeEvent::ArchiveSkipped {
                member,
                archive,
                reason: SkipReason::MemberMissingInArchive,
            } => info!(%member, archive = %archive.display(), "archive has no such member, nothing to merge"),
            MergeEvent::ArchiveSkipped {
                member,
                archive,
                reason: SkipReason::HeaderMismatch,
            } => warn!(
                %member,
                archive = %archive.display(),
                "skipping member from archive, header does not match the reference"
            ),
            MergeEvent::KeyFallback {
                member,
                policy,
                column,
            } => warn!(
                %member,
                %policy,
                column = column.as_deref().unwrap_or("-"),
                "no key rule for member, using fallback policy"
            ),
            MergeEvent::DuplicateRow {
                member,
                archive,
                kind: DuplicateKind::ExactDuplicate,
                line_number,
                line,
            } => debug!(%member, archive = %archive.display(), line_number, %line, "avoiding duplicate line"),
            MergeEvent::DuplicateRow {
                member,
                archive,
                kind: DuplicateKind::KeyConflict,
                line_number,
                line,
            } => info!(
                %member,
                archive = %archive.display(),
                line_number,
                %line,
                "dropping conflicting row with duplicate key"
            ),
            MergeEvent::MemberFinished { result } => info!(
                member = %result.member,
                policy = %result.policy,
                rows_written = result.rows_written,
                exact_duplicates = result.exact_duplicates,
                key_conflicts = result.key_conflicts,
                header_mismatches = result.header_mismatches,
                "member merged"
            ),
        }
    }
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryEventSink {
    events: Vec<MergeEvent>,
}

impl MemoryEventSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded events in order.
    pub fn events(&self) -> &[MergeEvent] {
        &self.events
    }

    /// Consumes the sink and returns its events.
    pub fn into_events(self) -> Vec<MergeEvent> {
        self.events
    }

    /// Returns the skip events for `member`, as `(archive, reason)` pairs.
    pub fn skips(&self, member: &str) -> Vec<(PathBuf, SkipReason)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                MergeEvent::ArchiveSkipped {
                    member: m,
                    archive,
                    reason,
                } if m == member => Some((archive.clone(), *reason)),
                _ => None,
            })
            .collect()
    }

    /// Returns the number of fallback events recorded for `member`.
    pub fn fallbacks(&self, member: &str) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, MergeEvent::KeyFallback { member: m, .. } if m == member))
            .count()
    }

    /// Returns the dropped rows of `member`, as `(kind, line)` pairs.
    pub fn duplicates(&self, member: &str) -> Vec<(DuplicateKind, String)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                MergeEvent::DuplicateRow {
                    member: m,
                    kind,
                    line,
                    ..
                } if m == member => Some((*kind, line.clone())),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for MemoryEventSink {
    fn record(&mut self, event: MergeEvent) {
        self.events.push(event);
    }
}
