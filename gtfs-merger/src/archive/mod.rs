//! Streaming access to ZIP archives.
//!
//! Input archives are reopened for every member access so that only one member of one input is
//! open at a time. The output archive is written to a temporary file and only moved to its final
//! path once every member has been merged.

mod lines;
mod reader;
mod writer;

pub use lines::{MemberLines, line_terminator, strip_bom, strip_terminator};
pub use reader::{InputArchive, MemberEntry};
pub use writer::OutputArchive;
