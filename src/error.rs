//! Error types for the sheetpipe library.

use std::io;
use thiserror::Error;

/// Result type alias for sheetpipe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during a conversion.
///
/// A conversion never recovers mid-stream: the first error cancels the
/// pipeline, temp files are released, and a partially written output file
/// is unlinked before the error reaches the caller.
#[derive(Error, Debug)]
pub enum Error {
    /// The path was rejected by the sandbox policy.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error reading or writing a ZIP archive.
    #[error("ZIP archive error: {0}")]
    ZipArchive(String),

    /// Error parsing XML content.
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// The workbook contains no worksheet entry.
    #[error("no worksheet found in workbook")]
    SheetNotFound,

    /// A write could not be completed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Error during text encoding conversion.
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::ZipArchive(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlParse(err.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        let msg = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(e) => Error::Io(e),
            _ => Error::Encoding(msg),
        }
    }
}
