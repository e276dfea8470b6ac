//! # sheetpipe
//!
//! Streaming conversion between XLSX workbooks and delimited text.
//!
//! This library converts in both directions with memory bounded by the
//! widest row and the longest string, never by the input size, so
//! multi-gigabyte files convert in a few megabytes of heap. Worksheet
//! rows are pulled one at a time out of the ZIP-contained XML stream, and
//! shared-string references are resolved through a disk-backed index
//! instead of an in-memory table.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sheetpipe::{csv_to_xlsx, xlsx_to_csv};
//!
//! // Extract the first worksheet to CSV
//! let stats = xlsx_to_csv("report.xlsx", "report.csv")?;
//! println!("{} rows", stats.rows);
//!
//! // Build a workbook from delimited text (delimiter auto-detected)
//! csv_to_xlsx("data.csv", "data.xlsx")?;
//! # Ok::<(), sheetpipe::Error>(())
//! ```
//!
//! ## Options
//!
//! ```no_run
//! use sheetpipe::{csv_to_xlsx_with_options, ConvertOptions};
//!
//! let options = ConvertOptions::new()
//!     .with_sandbox_root("/srv/exports")
//!     .with_delimiter(b';');
//!
//! csv_to_xlsx_with_options("in.csv", "/srv/exports/out.xlsx", &options)?;
//! # Ok::<(), sheetpipe::Error>(())
//! ```
//!
//! ## Guarantees
//!
//! - Only the first worksheet of a workbook is read; the written package
//!   always contains exactly one sheet named `Sheet1`.
//! - Row alignment survives the round trip: gaps in the sheet's row
//!   numbering become blank CSV lines and vice versa.
//! - Conversions are all-or-nothing. On any failure the output file is
//!   unlinked and every temp file is released, panics included.

pub mod cell_ref;
pub mod convert;
pub mod detect;
pub mod error;
pub mod paths;
pub mod sanitize;
pub mod xlsx;

// Re-exports
pub use convert::{
    csv_to_xlsx, csv_to_xlsx_with_options, xlsx_to_csv, xlsx_to_csv_with_options, ConvertOptions,
    ConvertStats,
};
pub use detect::{detect_delimiter, DELIMITER_CANDIDATES};
pub use error::{Error, Result};
pub use paths::SandboxPolicy;
