//! Row key representation.

use csv::ByteRecord;
use csv_core::{ReadRecordResult, Reader};

/// Initial size of the unescaped field buffer.
const FIELD_BUFFER_SIZE: usize = 1024;

/// Initial number of field end offsets.
const FIELD_ENDS_SIZE: usize = 32;

/// Key tuple of a row: the values of the key columns, in key order.
///
/// Values are raw field bytes with CSV quoting removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey {
    values: Vec<Vec<u8>>,
}

impl RowKey {
    /// Creates a key from its values.
    pub fn new(values: Vec<Vec<u8>>) -> Self {
        Self { values }
    }

    /// Creates a key by picking the fields at `key_indices` from a parsed row.
    ///
    /// A row with fewer fields than an index contributes an empty value for it.
    pub fn from_record(record: &ByteRecord, key_indices: &[usize]) -> Self {
        let values = key_indices
            .iter()
            .map(|&idx| record.get(idx).unwrap_or_default().to_vec())
            .collect();
        Self { values }
    }
}

/// Splits single lines into fields following RFC 4180 quoting.
///
/// One parser and its buffers serve every line of a member; only the parser state is reset
/// between lines.
#[derive(Debug)]
pub struct FieldSplitter {
    reader: Reader,
    fields: Vec<u8>,
    ends: Vec<usize>,
    record: ByteRecord,
}

impl Default for FieldSplitter {
    fn default() -> Self {
        Self {
            reader: Reader::new(),
            fields: vec![0; FIELD_BUFFER_SIZE],
            ends: vec![0; FIELD_ENDS_SIZE],
            record: ByteRecord::new(),
        }
    }
}

impl FieldSplitter {
    /// Creates a splitter with empty reusable buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits `line`, which must not include its terminator. An empty line has no fields.
    pub fn split(&mut self, line: &[u8]) -> &ByteRecord {
        self.reader.reset();
        self.record.clear();

        let mut input = line;
        let mut out = 0;
        let mut end = 0;

        loop {
            let (result, nin, nout, nend) =
                self.reader
                    .read_record(input, &mut self.fields[out..], &mut self.ends[end..]);
            input = &input[nin..];
            out += nout;
            end += nend;

            match result {
                // The next call passes the empty remainder, which marks the end of input.
                ReadRecordResult::InputEmpty => {}
                ReadRecordResult::OutputFull => {
                    let len = self.fields.len() * 2;
                    self.fields.resize(len, 0);
                }
                ReadRecordResult::OutputEndsFull => {
                    let len = self.ends.len() * 2;
                    self.ends.resize(len, 0);
                }
                ReadRecordResult::Record => break,
                ReadRecordResult::End => return &self.record,
            }
        }

        let mut start = 0;
        for &field_end in &self.ends[..end] {
            self.record.push_field(&self.fields[start..field_end]);
            start = field_end;
        }

        &self.record
    }

    /// Splits `line` and returns the key formed by the fields at `key_indices`.
    pub fn key(&mut self, line: &[u8], key_indices: &[usize]) -> RowKey {
        RowKey::from_record(self.split(line), key_indices)
    }
}
