//! XLSX (Excel) workbook reading and writing.
//!
//! Reading pulls one worksheet row at a time out of the ZIP-contained XML
//! stream; writing emits a minimal but valid package layout while the
//! worksheet body is generated row by row. Neither direction holds the
//! sheet in memory.
//!
//! # Example
//!
//! ```no_run
//! use sheetpipe::xlsx::{locate_first_worksheet, RowStreamer};
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! let file = File::open("data.xlsx")?;
//! let mut archive = zip::ZipArchive::new(BufReader::new(file))?;
//! let sheet_path = locate_first_worksheet(&mut archive)?;
//!
//! let entry = archive.by_name(&sheet_path)?;
//! let mut rows = RowStreamer::new(BufReader::new(entry), None);
//! while let Some(row) = rows.next_row()? {
//!     println!("{}", row.join("|"));
//! }
//! # Ok::<(), sheetpipe::Error>(())
//! ```

mod locate;
mod rows;
mod shared_strings;
mod writer;

pub use locate::locate_first_worksheet;
pub use rows::RowStreamer;
pub use shared_strings::SharedStringStore;
pub use writer::{assemble_package, SheetWriter};

/// Archive entry holding the shared-string table, when present.
pub const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
