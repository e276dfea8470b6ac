//! Conversion pipelines.
//!
//! Both directions run as a single pass: validate the paths, open the
//! source, stream rows through to the destination, finalize, clean up.
//! Temp files are anonymous handles the OS reclaims on drop, and the
//! output file is guarded so that any failure (panic included) unlinks it
//! before the error surfaces. Callers observe all-or-nothing outcomes.

use crate::detect::detect_delimiter;
use crate::error::{Error, Result};
use crate::paths::SandboxPolicy;
use crate::xlsx::{
    assemble_package, locate_first_worksheet, RowStreamer, SharedStringStore, SheetWriter,
    SHARED_STRINGS_PART,
};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use zip::result::ZipError;
use zip::ZipArchive;

/// Options shared by both conversion directions.
///
/// # Example
///
/// ```
/// use sheetpipe::ConvertOptions;
///
/// let options = ConvertOptions::new()
///     .with_sandbox_root("/srv/jobs/42")
///     .with_delimiter(b';');
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    sandbox: Option<SandboxPolicy>,
    delimiter: Option<u8>,
    backslash_escape: bool,
}

impl ConvertOptions {
    /// Default options: sandbox rooted at the current directory, delimiter
    /// auto-detected on read and `,` on write, double-quote escaping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Confine input and output paths to the given root directory.
    pub fn with_sandbox_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sandbox = Some(SandboxPolicy::new(root));
        self
    }

    /// Force a field delimiter instead of detecting one, and use it when
    /// writing CSV output.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Treat backslash as the CSV escape character instead of relying on
    /// double-quote doubling alone.
    pub fn with_backslash_escape(mut self, enabled: bool) -> Self {
        self.backslash_escape = enabled;
        self
    }

    fn policy(&self) -> SandboxPolicy {
        self.sandbox.clone().unwrap_or_default()
    }
}

/// Row and cell counts of a completed conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertStats {
    /// Rows written to the destination, gap rows included.
    pub rows: u64,
    /// Fields (XLSX → CSV) or non-empty cells (CSV → XLSX) written.
    pub cells: u64,
}

/// Convert the first worksheet of an XLSX workbook to CSV, with default
/// options.
pub fn xlsx_to_csv(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<ConvertStats> {
    xlsx_to_csv_with_options(input, output, &ConvertOptions::default())
}

/// Convert the first worksheet of an XLSX workbook to CSV.
///
/// Shared-string references are resolved through a disk-backed index, so
/// memory stays bounded by the longest single string rather than the table
/// size. Gaps in the sheet's row numbering become blank CSV lines.
pub fn xlsx_to_csv_with_options(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &ConvertOptions,
) -> Result<ConvertStats> {
    let policy = options.policy();
    let input = policy.validate_input(input.as_ref())?;
    let output = policy.validate_output(output.as_ref())?;

    let file = File::open(&input)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    let sheet_path = locate_first_worksheet(&mut archive)?;

    let mut strings = match archive.by_name(SHARED_STRINGS_PART) {
        Ok(entry) => Some(SharedStringStore::build(BufReader::new(entry))?),
        Err(ZipError::FileNotFound) => None,
        Err(e) => return Err(e.into()),
    };

    let guard = OutputGuard::new(&output);
    let stats = stream_rows_to_csv(&mut archive, &sheet_path, strings.as_mut(), &output, options)?;
    guard.disarm();
    Ok(stats)
}

fn stream_rows_to_csv<R: std::io::Read + Seek>(
    archive: &mut ZipArchive<R>,
    sheet_path: &str,
    strings: Option<&mut SharedStringStore>,
    output: &Path,
    options: &ConvertOptions,
) -> Result<ConvertStats> {
    let entry = archive.by_name(sheet_path)?;
    let mut rows = RowStreamer::new(BufReader::new(entry), strings);

    let mut builder = csv::WriterBuilder::new();
    builder
        .flexible(true)
        .delimiter(options.delimiter.unwrap_or(b','));
    if options.backslash_escape {
        builder.double_quote(false).escape(b'\\');
    }
    let mut writer = builder.from_writer(File::create(output)?);

    let mut stats = ConvertStats::default();
    while let Some(row) = rows.next_row()? {
        stats.rows += 1;
        stats.cells += row.len() as u64;
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(stats)
}

/// Convert a CSV file to a single-sheet XLSX workbook, with default
/// options.
pub fn csv_to_xlsx(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<ConvertStats> {
    csv_to_xlsx_with_options(input, output, &ConvertOptions::default())
}

/// Convert a CSV file to a single-sheet XLSX workbook.
///
/// The delimiter is inferred from the first non-blank line unless forced
/// through [`ConvertOptions::with_delimiter`]. The worksheet body is
/// staged in a temp file and streamed into the archive after the fixed
/// package parts, so no row set is ever resident in memory.
pub fn csv_to_xlsx_with_options(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &ConvertOptions,
) -> Result<ConvertStats> {
    let policy = options.policy();
    let input = policy.validate_input(input.as_ref())?;
    let output = policy.validate_output(output.as_ref())?;

    let mut reader = BufReader::new(File::open(&input)?);
    let delimiter = match options.delimiter {
        Some(d) => d,
        None => detect_delimiter(&mut reader, options.backslash_escape)?,
    };

    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(false).flexible(true).delimiter(delimiter);
    if options.backslash_escape {
        builder.escape(Some(b'\\'));
    }
    let mut records = builder.from_reader(reader);

    let mut sheet_xml = tempfile::tempfile()?;
    let stats = {
        let mut sheet = SheetWriter::new(BufWriter::new(&sheet_xml))?;
        for record in records.byte_records() {
            let record = record?;
            sheet.write_row(record.iter())?;
        }
        let stats = ConvertStats {
            rows: sheet.rows(),
            cells: sheet.cells(),
        };
        sheet.finish()?;
        stats
    };
    sheet_xml.seek(SeekFrom::Start(0))?;

    let guard = OutputGuard::new(&output);
    assemble_package(&output, &mut sheet_xml).map_err(|e| match e {
        Error::Io(io) => Error::WriteFailed(io.to_string()),
        other => other,
    })?;
    guard.disarm();
    Ok(stats)
}

/// Unlinks the output file on drop unless the conversion finalized.
///
/// Covers error returns and unwinding alike, so a failed conversion never
/// leaves a half-written artifact behind.
struct OutputGuard<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> OutputGuard<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for OutputGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let _ = fs::remove_file(self.path);
        }
    }
}
