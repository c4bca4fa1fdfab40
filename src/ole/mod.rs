//! OLE2 compound document container and the formats stored in it.

/// Constants for OLE file format
pub mod consts;

/// Sector allocation table entries and ownership tracking
pub mod sector;

/// Main OLE file parsing implementation
pub mod file;

/// Codepage to encoding mapping
pub mod codepage;

/// Legacy Excel workbook (.xls) reader
///
/// This module provides functionality to parse Microsoft Excel workbooks
/// in the legacy binary format (.xls files), which are usually OLE2-based.
pub mod xls;

// Re-export public types for convenient access
pub use codepage::XlsEncoding;
pub use file::{is_ole_file, CompoundDocument, DirectoryEntry, EntryKind, OleError};
