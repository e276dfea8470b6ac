//! Streaming worksheet row reader.

use crate::cell_ref::column_of_ref;
use crate::error::Result;
use crate::sanitize::decode_lossy;
use crate::xlsx::SharedStringStore;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::BufRead;

/// Explicit cell type tag from the `t` attribute of a `<c>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    /// `t="s"`: the value is a decimal index into the shared-string table.
    Shared,
    /// `t="b"`: `1` renders as `TRUE`, anything else as `FALSE`.
    Bool,
    /// `t="inlineStr"`: the text lives in an `<is><t>` child.
    Inline,
    /// Any other tag, or none: the content is the literal cell value.
    Literal,
}

fn cell_kind(tag: &[u8]) -> CellKind {
    match tag {
        b"s" => CellKind::Shared,
        b"b" => CellKind::Bool,
        b"inlineStr" => CellKind::Inline,
        _ => CellKind::Literal,
    }
}

/// Lazy, forward-only iteration over the dense rows of one worksheet.
///
/// Each call to [`next_row`](Self::next_row) yields the fields of the next
/// CSV line: sheet rows are padded with empty strings up to their highest
/// occupied column, and gaps in the sheet's row numbering surface as empty
/// rows so that output line N always corresponds to sheet row N. The
/// stream is not restartable.
pub struct RowStreamer<'s, R: BufRead> {
    xml: Reader<R>,
    buf: Vec<u8>,
    strings: Option<&'s mut SharedStringStore>,
    expected_row: u64,
    parked: Option<(u64, Vec<String>)>,
    done: bool,
}

impl<'s, R: BufRead> RowStreamer<'s, R> {
    /// Wrap a worksheet XML stream. `strings` resolves `t="s"` cells and
    /// may be `None` for workbooks without a shared-string table.
    pub fn new(reader: R, strings: Option<&'s mut SharedStringStore>) -> Self {
        let mut xml = Reader::from_reader(reader);
        xml.config_mut().trim_text(false);
        Self {
            xml,
            buf: Vec::new(),
            strings,
            expected_row: 1,
            parked: None,
            done: false,
        }
    }

    /// Pull the next dense row, or `None` once the sheet is exhausted.
    pub fn next_row(&mut self) -> Result<Option<Vec<String>>> {
        loop {
            if let Some((declared, row)) = self.parked.take() {
                if self.expected_row < declared {
                    self.parked = Some((declared, row));
                    self.expected_row += 1;
                    return Ok(Some(Vec::new()));
                }
                self.expected_row = declared + 1;
                return Ok(Some(row));
            }
            if self.done {
                return Ok(None);
            }

            let mut opened_row: Option<u64> = None;
            match self.xml.read_event_into(&mut self.buf)? {
                Event::Start(e) if e.local_name().as_ref() == b"row" => {
                    opened_row = Some(declared_row_number(&e, self.expected_row));
                }
                Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                    let declared = declared_row_number(&e, self.expected_row);
                    self.parked = Some((declared, Vec::new()));
                }
                Event::End(e) if e.local_name().as_ref() == b"sheetData" => {
                    self.done = true;
                }
                Event::Eof => {
                    self.done = true;
                }
                _ => {}
            }
            self.buf.clear();

            if let Some(declared) = opened_row {
                let cells = self.read_cells()?;
                self.parked = Some((declared, cells));
            }
        }
    }

    /// Consume the children of an open `<row>` and return the dense row.
    fn read_cells(&mut self) -> Result<Vec<String>> {
        let mut row: Vec<String> = Vec::new();
        let mut next_column: u64 = 1;
        let mut depth = 0usize;

        loop {
            let mut open_cell: Option<(u64, CellKind)> = None;
            match self.xml.read_event_into(&mut self.buf)? {
                Event::Start(e) if e.local_name().as_ref() == b"c" => {
                    open_cell = Some(cell_attributes(&e, next_column));
                }
                Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                    let (column, _) = cell_attributes(&e, next_column);
                    place_cell(&mut row, column, String::new());
                    next_column = column + 1;
                }
                Event::Start(_) => depth += 1,
                Event::End(e) => {
                    if depth == 0 && e.local_name().as_ref() == b"row" {
                        break;
                    }
                    depth = depth.saturating_sub(1);
                }
                Event::Eof => break,
                _ => {}
            }
            self.buf.clear();

            if let Some((column, kind)) = open_cell {
                let raw = self.read_cell_text()?;
                let value = self.resolve(kind, raw)?;
                place_cell(&mut row, column, value);
                next_column = column + 1;
            }
        }
        Ok(row)
    }

    /// Collect the text of `<v>` and `<t>` descendants until `</c>`.
    fn read_cell_text(&mut self) -> Result<String> {
        let mut value = String::new();
        let mut capture = 0usize;
        let mut phonetic = 0usize;

        loop {
            match self.xml.read_event_into(&mut self.buf)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"v" | b"t" => capture += 1,
                    b"rPh" => phonetic += 1,
                    _ => {}
                },
                Event::End(e) => match e.local_name().as_ref() {
                    b"c" => break,
                    b"v" | b"t" => capture = capture.saturating_sub(1),
                    b"rPh" => phonetic = phonetic.saturating_sub(1),
                    _ => {}
                },
                Event::Text(e) => {
                    if capture > 0 && phonetic == 0 {
                        value.push_str(&e.unescape().unwrap_or_default());
                    }
                }
                Event::CData(e) => {
                    if capture > 0 && phonetic == 0 {
                        value.push_str(&decode_lossy(&e));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            self.buf.clear();
        }
        Ok(value)
    }

    fn resolve(&mut self, kind: CellKind, raw: String) -> Result<String> {
        match kind {
            CellKind::Shared => match raw.trim().parse::<u64>() {
                Ok(i) => self.lookup(i),
                Err(_) => Ok(raw),
            },
            CellKind::Bool => Ok(if raw.trim() == "1" { "TRUE" } else { "FALSE" }.to_string()),
            CellKind::Inline | CellKind::Literal => Ok(raw),
        }
    }

    fn lookup(&mut self, i: u64) -> Result<String> {
        match self.strings.as_deref_mut() {
            Some(store) => store.get(i),
            None => Ok(String::new()),
        }
    }
}

/// The `r` attribute of a `<row>`, or `expected` when absent or invalid.
/// A declaration below the running count is clamped so row numbers never
/// move backwards.
fn declared_row_number(e: &BytesStart<'_>, expected: u64) -> u64 {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == b"r" {
            if let Ok(n) = decode_lossy(&attr.value).trim().parse::<u64>() {
                if n >= 1 {
                    return n.max(expected);
                }
            }
        }
    }
    expected
}

/// Column index (from the `r` reference) and type tag of a `<c>` element.
/// Cells without a usable reference fall back to the running counter.
fn cell_attributes(e: &BytesStart<'_>, next_column: u64) -> (u64, CellKind) {
    let mut column = 0u64;
    let mut kind = CellKind::Literal;
    for attr in e.attributes().flatten() {
        match attr.key.local_name().as_ref() {
            b"r" => column = u64::from(column_of_ref(&decode_lossy(&attr.value))),
            b"t" => kind = cell_kind(&attr.value),
            _ => {}
        }
    }
    if column == 0 {
        column = next_column;
    }
    (column, kind)
}

fn place_cell(row: &mut Vec<String>, column: u64, value: String) {
    let idx = (column - 1) as usize;
    if row.len() <= idx {
        row.resize(idx + 1, String::new());
    }
    row[idx] = value;
}
