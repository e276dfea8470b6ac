//! Delimiter detection for delimited text input.
//!
//! The delimiter is inferred from the first non-blank line of the input:
//! each candidate is tried as the field separator under standard CSV
//! quoting rules, and the one producing the most fields wins. The input
//! stream is rewound to the start afterwards so parsing sees every byte.

use crate::error::Result;
use crate::sanitize::decode_lossy;
use std::io::{BufRead, Seek, SeekFrom};

/// Candidate delimiters, tried in order. Earlier entries win ties.
pub const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Infer the field delimiter from the first non-blank line of `reader`.
///
/// A leading UTF-8 BOM is ignored, and an input with no non-blank line
/// defaults to `,`. The reader is left positioned at offset 0.
///
/// # Example
///
/// ```
/// use sheetpipe::detect_delimiter;
/// use std::io::Cursor;
///
/// let mut input = Cursor::new("name;age;city\nada;36;london\n");
/// assert_eq!(detect_delimiter(&mut input, false)?, b';');
/// assert_eq!(input.position(), 0);
/// # Ok::<(), sheetpipe::Error>(())
/// ```
pub fn detect_delimiter<R: BufRead + Seek>(reader: &mut R, backslash_escape: bool) -> Result<u8> {
    let mut buf = Vec::new();
    let mut first = true;
    let delimiter = loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            break b',';
        }
        let decoded = decode_lossy(&buf);
        let mut line = decoded.trim_end_matches(['\r', '\n']);
        if first {
            line = line.strip_prefix('\u{feff}').unwrap_or(line);
            first = false;
        }
        if line.trim().is_empty() {
            continue;
        }
        break best_delimiter(line, backslash_escape);
    };
    reader.seek(SeekFrom::Start(0))?;
    Ok(delimiter)
}

fn best_delimiter(line: &str, backslash_escape: bool) -> u8 {
    let mut best = DELIMITER_CANDIDATES[0];
    let mut best_count = 0;
    for &candidate in &DELIMITER_CANDIDATES {
        let count = field_count(line, candidate, backslash_escape);
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

/// Split a single line under CSV quoting rules and count its fields.
fn field_count(line: &str, delimiter: u8, backslash_escape: bool) -> usize {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(false).flexible(true).delimiter(delimiter);
    if backslash_escape {
        builder.escape(Some(b'\\'));
    }
    let mut reader = builder.from_reader(line.as_bytes());
    match reader.byte_records().next() {
        Some(Ok(record)) => record.len(),
        _ => 0,
    }
}
