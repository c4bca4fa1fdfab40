//! Error types for XLS file parsing

use crate::common::binary::BinaryError;
use crate::ole::file::OleError;
use crate::ole::xls::formula::FormulaError;
use thiserror::Error;

/// Result type alias for XLS operations
pub type XlsResult<T> = Result<T, XlsError>;

/// Errors that can occur during XLS file parsing
///
/// Only container and workbook-globals problems surface here; malformed
/// sheet records and formulas are reported as diagnostics and skipped.
#[derive(Debug, Error)]
pub enum XlsError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CFB (Compound File Binary) error
    #[error("CFB error: {0}")]
    Cfb(#[from] OleError),

    /// Neither a "Workbook" nor a "Book" stream exists
    #[error("Can't find workbook in OLE2 compound document")]
    WorkbookStreamNotFound,

    /// Unsupported BIFF version (reported as e.g. 22 for 2.2)
    #[error("BIFF version {0} is not supported")]
    UnsupportedBiffVersion(u16),

    /// A BIFF 5+ workspace file holds no sheets
    #[error("Workspace file -- no spreadsheet data")]
    WorkspaceFile,

    /// The workbook is encrypted (FILEPASS record present)
    #[error("Workbook is encrypted")]
    Encrypted,

    /// Invalid BIFF record
    #[error("Invalid record 0x{record_type:04X}: {message}")]
    InvalidRecord {
        /// Record type
        record_type: u16,
        /// Error description
        message: String,
    },

    /// Worksheet not found
    #[error("Worksheet '{0}' not found")]
    WorksheetNotFound(String),

    /// Unknown encoding override
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Formula could not be decompiled
    #[error("Formula error: {0}")]
    Formula(#[from] FormulaError),

    /// Invalid data
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<BinaryError> for XlsError {
    fn from(err: BinaryError) -> Self {
        XlsError::InvalidData(err.to_string())
    }
}
