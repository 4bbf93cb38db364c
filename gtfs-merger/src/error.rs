//! Error types for the gtfs-merger crate.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use zip::result::ZipError;

/// Errors that abort a merge run.
///
/// Per-archive problems that only cost one archive's contribution to one member are not errors;
/// they are reported as [`crate::MergeEvent::ArchiveSkipped`] events.
#[derive(Error, Debug)]
pub enum MergerError {
    /// Fewer than one input archive or no output path was given.
    #[error("missing arguments: at least one input archive and an output path are required")]
    MissingArguments,

    /// None of the input patterns matched an existing path.
    #[error("no input archive matched the patterns: {patterns}")]
    NoInputsMatched { patterns: String },

    /// An input pattern is not a valid glob.
    #[error("invalid input pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// An input archive cannot be opened or its directory is corrupt.
    #[error("cannot read archive `{path}`: {source}")]
    ArchiveUnreadable {
        path: PathBuf,
        #[source]
        source: ZipError,
    },

    /// The output archive cannot be created or finalized.
    #[error("cannot write output archive `{path}`: {source}")]
    OutputUnwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The output path designates one of the input archives.
    #[error("output archive `{0}` is also an input archive")]
    OutputIsInput(PathBuf),

    /// A member listed by the reference archive cannot be opened in it.
    #[error("member `{member}` listed by reference archive `{archive}` cannot be opened: {source}")]
    ReferenceMemberUnreadable {
        member: String,
        archive: PathBuf,
        #[source]
        source: ZipError,
    },

    /// A configured key column is absent from the member's header.
    #[error(
        "key column `{column}` configured for `{member}` is not in the header of `{archive}` \
         (columns: {available})"
    )]
    KeyColumnNotFound {
        member: String,
        column: String,
        archive: PathBuf,
        available: String,
    },

    /// Streaming a member out of an input archive failed.
    #[error("failed to read member `{member}` from `{archive}`: {source}")]
    MemberRead {
        member: String,
        archive: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing a member into the output archive failed.
    #[error("failed to write member `{member}` to the output archive: {source}")]
    MemberWrite {
        member: String,
        #[source]
        source: ZipError,
    },
}

impl MergerError {
    /// Returns a short category label for this error.
    pub fn category(&self) -> &'static str {
        match self {
            MergerError::MissingArguments
            | MergerError::NoInputsMatched { .. }
            | MergerError::InvalidPattern { .. } => "argument error",
            MergerError::ArchiveUnreadable { .. }
            | MergerError::ReferenceMemberUnreadable { .. }
            | MergerError::MemberRead { .. } => "input archive error",
            MergerError::OutputUnwritable { .. }
            | MergerError::OutputIsInput(_)
            | MergerError::MemberWrite { .. } => "output archive error",
            MergerError::KeyColumnNotFound { .. } => "key configuration error",
        }
    }
}

/// Result type for merger operations.
pub type MergerResult<T> = Result<T, MergerError>;
