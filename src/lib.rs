//! litchi-xls - A Rust library for reading legacy Microsoft Excel workbooks
//!
//! This library decodes `.xls` files written by Excel 2.x through Excel
//! 2003 (BIFF2 to BIFF8) into a workbook model of sheets, typed cells,
//! formats, defined names and decompiled formula text.
//!
//! # Features
//!
//! - **OLE2 container**: Sector chains, short streams and directory lookup,
//!   with re-claimed sectors either rejected or survived with a warning
//! - **BIFF records**: Record framing with CONTINUE handling across all
//!   BIFF versions
//! - **Workbook globals**: Codepage, date mode, shared strings, fonts,
//!   formats, XF records, sheet inventory, names and external references
//! - **Worksheets**: Numbers, RK values, labels, booleans, errors, formula
//!   results, merged ranges and row/column information, loaded eagerly or
//!   on demand
//! - **Formulas**: Token streams turned back into A1 or R1C1 text
//!
//! # Example - Reading a workbook
//!
//! ```no_run
//! use litchi_xls::{open_workbook_path, CellValue, OpenOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let workbook = open_workbook_path("sales.xls", OpenOptions::default())?;
//! println!("BIFF {}, {} sheets", workbook.version(), workbook.nsheets());
//!
//! let sheet = workbook.sheet_by_name("Q1")?;
//! if let CellValue::Number(total) = sheet.cell_value(10, 3) {
//!     println!("Total: {}", total);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Lazy loading with diagnostics
//!
//! ```no_run
//! use litchi_xls::{open_workbook, OpenOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = std::fs::read("archive.xls")?;
//! let options = OpenOptions::new()
//!     .with_eager_load(false)
//!     .with_diagnostic_sink(Box::new(std::io::stderr()));
//! let workbook = open_workbook(&data, options)?;
//!
//! // Only the sheet asked for is decoded
//! let sheet = workbook.sheet_by_index(2)?;
//! println!("{} rows", sheet.nrows());
//! # Ok(())
//! # }
//! ```

/// Shared binary readers and diagnostic reporting
pub mod common;

/// OLE2 compound document reader and the `.xls` decoder
pub mod ole;

#[cfg(test)]
mod testutil;

pub use ole::xls::{
    open_workbook, open_workbook_path, AddressingStyle, BiffVersion, Cell, CellType, CellValue, OpenOptions, Sheet,
    Workbook, XlsError, XlsResult,
};
