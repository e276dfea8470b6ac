//! Worksheet XML generation and package assembly.
//!
//! The worksheet body is written to a temp file as CSV rows arrive, then
//! streamed into the output archive next to the fixed package parts. Only
//! inline strings are emitted; no shared-string table is produced on
//! write.

use crate::cell_ref::column_letters;
use crate::error::Result;
use crate::sanitize::{clean_text, decode_lossy};
use quick_xml::escape::escape;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const SHEET_PROLOG: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
    "<worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\"><sheetData>"
);

const SHEET_EPILOG: &str = "</sheetData></worksheet>";

/// Incremental worksheet XML writer.
///
/// Rows are numbered sequentially from 1 in arrival order. Cells holding
/// the empty string are omitted entirely, giving the sparse representation
/// the reader reconstructs from cell references.
pub struct SheetWriter<W: Write> {
    out: W,
    rows: u64,
    cells: u64,
}

impl<W: Write> SheetWriter<W> {
    /// Start a worksheet document on `out`.
    pub fn new(mut out: W) -> Result<Self> {
        out.write_all(SHEET_PROLOG.as_bytes())?;
        Ok(Self {
            out,
            rows: 0,
            cells: 0,
        })
    }

    /// Append one row of raw field bytes.
    ///
    /// Fields are decoded as UTF-8 with invalid sequences dropped, purged
    /// of XML-illegal code points, and entity-escaped. A UTF-8 BOM on the
    /// very first field of the document is stripped exactly once.
    pub fn write_row<'f, I>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = &'f [u8]>,
    {
        let row = self.rows + 1;
        write!(self.out, "<row r=\"{}\">", row)?;
        for (i, field) in fields.into_iter().enumerate() {
            let decoded = decode_lossy(field);
            let mut value: &str = &decoded;
            if row == 1 && i == 0 {
                value = value.strip_prefix('\u{feff}').unwrap_or(value);
            }
            if value.is_empty() {
                continue;
            }
            let cleaned = clean_text(value);
            write!(
                self.out,
                "<c r=\"{}{}\" t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
                column_letters((i + 1) as u32),
                row,
                escape(cleaned.as_ref())
            )?;
            self.cells += 1;
        }
        self.out.write_all(b"</row>")?;
        self.rows = row;
        Ok(())
    }

    /// Rows written so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Non-empty cells written so far.
    pub fn cells(&self) -> u64 {
        self.cells
    }

    /// Close the document and flush, returning the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.out.write_all(SHEET_EPILOG.as_bytes())?;
        self.out.flush()?;
        Ok(self.out)
    }
}

/// The fixed package parts, in the order they are added to the archive.
/// `xl/worksheets/sheet1.xml` follows as the streamed sixth entry.
const FIXED_PARTS: [(&str, &str); 4] = [
    (
        "[Content_Types].xml",
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
            "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\n",
            "<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\n",
            "<Default Extension=\"xml\" ContentType=\"application/xml\"/>\n",
            "<Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\n",
            "<Override PartName=\"/xl/worksheets/sheet1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>\n",
            "</Types>"
        ),
    ),
    (
        "_rels/.rels",
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
            "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\n",
            "<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"xl/workbook.xml\"/>\n",
            "</Relationships>"
        ),
    ),
    (
        "xl/workbook.xml",
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
            "<workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\n",
            "<sheets><sheet name=\"Sheet1\" sheetId=\"1\" r:id=\"rId1\"/></sheets>\n",
            "</workbook>"
        ),
    ),
    (
        "xl/_rels/workbook.xml.rels",
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
            "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\n",
            "<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet1.xml\"/>\n",
            "</Relationships>"
        ),
    ),
];

/// Create the output archive and add the package parts, streaming the
/// finalized worksheet temp file as the sheet entry. The caller discards
/// the archive on error.
pub fn assemble_package(output: &Path, sheet_xml: &mut File) -> Result<()> {
    let file = File::create(output)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, body) in FIXED_PARTS {
        zip.start_file(name, options)?;
        zip.write_all(body.as_bytes())?;
    }

    zip.start_file("xl/worksheets/sheet1.xml", options)?;
    io::copy(sheet_xml, &mut zip)?;
    zip.finish()?;
    Ok(())
}
