//! Disk-backed shared-string store.
//!
//! The shared-string table of a large workbook can dwarf every other part,
//! so it is never materialized in memory. Building the store streams
//! `xl/sharedStrings.xml` once and spills each string into a pair of
//! anonymous temp files:
//!
//! - a *data file* of `<u32 big-endian length><UTF-8 bytes>` records, and
//! - an *index file* of fixed 21-byte records: 20 zero-padded ASCII
//!   decimal digits holding the data-file byte offset, then one `0x0A`.
//!
//! The fixed index width is what makes lookup O(1): string `i` starts at
//! index offset `i × 21`. Both handles are unlinked by the OS as soon as
//! they drop, on every exit path.

use crate::error::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{BufRead, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};

/// Byte width of one index record: 20 offset digits plus one separator.
const INDEX_RECORD_LEN: u64 = 21;

/// Random-access view over an interned string table spilled to disk.
pub struct SharedStringStore {
    index: std::fs::File,
    data: std::fs::File,
    count: u64,
}

impl SharedStringStore {
    /// Build the store by streaming shared-strings XML.
    ///
    /// Each `<si>` element contributes one record: the concatenated text of
    /// all its `<t>` descendants (covering rich-text runs), with phonetic
    /// `<rPh>` runs excluded.
    pub fn build<R: BufRead>(xml: R) -> Result<Self> {
        let mut index = BufWriter::new(tempfile::tempfile()?);
        let mut data = BufWriter::new(tempfile::tempfile()?);

        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(false);

        let mut buf = Vec::new();
        let mut count: u64 = 0;
        let mut offset: u64 = 0;
        let mut in_si = false;
        let mut capture = 0usize;
        let mut phonetic = 0usize;
        let mut current = String::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"si" => {
                        in_si = true;
                        capture = 0;
                        phonetic = 0;
                        current.clear();
                    }
                    b"t" if in_si => capture += 1,
                    b"rPh" if in_si => phonetic += 1,
                    _ => {}
                },
                Event::Empty(e) if e.local_name().as_ref() == b"si" => {
                    write_record(&mut index, &mut data, &mut offset, "")?;
                    count += 1;
                }
                Event::Text(e) => {
                    if in_si && capture > 0 && phonetic == 0 {
                        current.push_str(&e.unescape().unwrap_or_default());
                    }
                }
                Event::CData(e) => {
                    if in_si && capture > 0 && phonetic == 0 {
                        current.push_str(&crate::sanitize::decode_lossy(&e));
                    }
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"si" => {
                        write_record(&mut index, &mut data, &mut offset, &current)?;
                        count += 1;
                        in_si = false;
                    }
                    b"t" => capture = capture.saturating_sub(1),
                    b"rPh" => phonetic = phonetic.saturating_sub(1),
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        let index = index
            .into_inner()
            .map_err(|e| Error::WriteFailed(e.to_string()))?;
        let data = data
            .into_inner()
            .map_err(|e| Error::WriteFailed(e.to_string()))?;
        Ok(Self { index, data, count })
    }

    /// Number of interned strings.
    pub fn len(&self) -> u64 {
        self.count
    }

    /// Whether the table holds no strings.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Fetch string `i`.
    ///
    /// Out-of-range indices and short reads resolve to the empty string.
    /// Real I/O failures on the handles are errors.
    pub fn get(&mut self, i: u64) -> Result<String> {
        if i >= self.count {
            return Ok(String::new());
        }

        self.index.seek(SeekFrom::Start(i * INDEX_RECORD_LEN))?;
        let mut record = [0u8; INDEX_RECORD_LEN as usize];
        if !read_exact_tolerant(&mut self.index, &mut record)? {
            return Ok(String::new());
        }
        let Some(offset) = parse_offset(&record) else {
            return Ok(String::new());
        };

        self.data.seek(SeekFrom::Start(offset))?;
        let mut len_buf = [0u8; 4];
        if !read_exact_tolerant(&mut self.data, &mut len_buf)? {
            return Ok(String::new());
        }
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut bytes = vec![0u8; len];
        if !read_exact_tolerant(&mut self.data, &mut bytes)? {
            return Ok(String::new());
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl std::fmt::Debug for SharedStringStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedStringStore")
            .field("count", &self.count)
            .finish()
    }
}

fn write_record<W: Write>(
    index: &mut W,
    data: &mut W,
    offset: &mut u64,
    text: &str,
) -> Result<()> {
    write!(index, "{:020}\n", *offset)?;
    let len = text.len() as u32;
    data.write_all(&len.to_be_bytes())?;
    data.write_all(text.as_bytes())?;
    *offset += 4 + u64::from(len);
    Ok(())
}

/// `read_exact` that reports a clean EOF as `false` instead of an error.
fn read_exact_tolerant<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn parse_offset(record: &[u8; INDEX_RECORD_LEN as usize]) -> Option<u64> {
    std::str::from_utf8(&record[..20]).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_from(xml: &str) -> SharedStringStore {
        SharedStringStore::build(xml.as_bytes()).unwrap()
    }

    #[test]
    fn test_build_and_lookup() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3">
    <si><t>Hello</t></si>
    <si><t>World</t></si>
    <si><t>Test</t></si>
</sst>"#;

        let mut ss = store_from(xml);
        assert_eq!(ss.len(), 3);
        assert_eq!(ss.get(0).unwrap(), "Hello");
        assert_eq!(ss.get(2).unwrap(), "Test");
        assert_eq!(ss.get(1).unwrap(), "World");
    }

    #[test]
    fn test_out_of_range_is_empty() {
        let mut ss = store_from("<sst><si><t>only</t></si></sst>");
        assert_eq!(ss.get(1).unwrap(), "");
        assert_eq!(ss.get(u64::MAX).unwrap(), "");
    }

    #[test]
    fn test_rich_text_runs_concatenate() {
        let xml = r#"<sst>
    <si><r><t>Hello</t></r><r><t xml:space="preserve"> World</t></r></si>
</sst>"#;
        let mut ss = store_from(xml);
        assert_eq!(ss.len(), 1);
        assert_eq!(ss.get(0).unwrap(), "Hello World");
    }

    #[test]
    fn test_phonetic_runs_excluded() {
        let xml = r#"<sst>
    <si><r><t>漢字</t></r><rPh sb="0" eb="2"><t>かんじ</t></rPh></si>
</sst>"#;
        let mut ss = store_from(xml);
        assert_eq!(ss.get(0).unwrap(), "漢字");
    }

    #[test]
    fn test_empty_si_records() {
        let mut ss = store_from("<sst><si/><si><t>x</t></si><si><t/></si></sst>");
        assert_eq!(ss.len(), 3);
        assert_eq!(ss.get(0).unwrap(), "");
        assert_eq!(ss.get(1).unwrap(), "x");
        assert_eq!(ss.get(2).unwrap(), "");
    }

    #[test]
    fn test_escaped_entities_unescape() {
        let mut ss = store_from("<sst><si><t>a &amp; b &lt;c&gt;</t></si></sst>");
        assert_eq!(ss.get(0).unwrap(), "a & b <c>");
    }

    #[test]
    fn test_lookup_is_random_access() {
        let mut body = String::from("<sst>");
        for i in 0..100 {
            body.push_str(&format!("<si><t>s{}</t></si>", i));
        }
        body.push_str("</sst>");

        let mut ss = store_from(&body);
        assert_eq!(ss.get(99).unwrap(), "s99");
        assert_eq!(ss.get(0).unwrap(), "s0");
        assert_eq!(ss.get(42).unwrap(), "s42");
    }
}
