//! Line-level reading of archive members.

use std::io::{self, BufRead};

/// UTF-8 byte-order marker.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Reads a member line by line, keeping every byte including line terminators.
pub struct MemberLines<'a> {
    reader: Box<dyn BufRead + 'a>,
    line_number: u64,
}

impl<'a> MemberLines<'a> {
    /// Wraps a buffered reader positioned at the start of a member.
    pub fn new(reader: impl BufRead + 'a) -> Self {
        Self {
            reader: Box::new(reader),
            line_number: 0,
        }
    }

    /// Reads the next line into `buf`, replacing its contents.
    ///
    /// The `\n` terminator (and a preceding `\r`, if any) stays in `buf`. Returns `false` once
    /// the member is exhausted.
    pub fn next_line(&mut self, buf: &mut Vec<u8>) -> io::Result<bool> {
        buf.clear();
        let read = self.reader.read_until(b'\n', buf)?;
        if read == 0 {
            return Ok(false);
        }

        self.line_number += 1;
        Ok(true)
    }

    /// Returns the 1-based number of the last line read, 0 before the first read.
    pub fn line_number(&self) -> u64 {
        self.line_number
    }
}

/// Returns the line terminator at the end of `line`: `\r\n`, `\n` or nothing.
pub fn line_terminator(line: &[u8]) -> &[u8] {
    if line.ends_with(b"\r\n") {
        &line[line.len() - 2..]
    } else if line.ends_with(b"\n") {
        &line[line.len() - 1..]
    } else {
        &[]
    }
}

/// Returns `line` without its line terminator.
pub fn strip_terminator(line: &[u8]) -> &[u8] {
    &line[..line.len() - line_terminator(line).len()]
}

/// Returns `line` without a leading UTF-8 byte-order marker.
pub fn strip_bom(line: &[u8]) -> &[u8] {
    line.strip_prefix(UTF8_BOM).unwrap_or(line)
}
