//! Legacy Excel (.xls) file format reader
//!
//! Decodes BIFF2 through BIFF8 workbooks, either wrapped in an OLE2
//! compound document ("Workbook" or "Book" stream) or as a bare BIFF
//! stream. The globals substream is decoded while opening; worksheets are
//! decoded eagerly or on first access.
//!
//! # Example
//!
//! ```no_run
//! use litchi_xls::ole::xls::{open_workbook, CellValue, OpenOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = std::fs::read("budget.xls")?;
//! let workbook = open_workbook(&data, OpenOptions::new().with_decompile_formulas(true))?;
//! let sheet = workbook.sheet_by_index(0)?;
//! for row in 0..sheet.nrows() as u32 {
//!     for cell in sheet.row(row) {
//!         match &cell.value {
//!             CellValue::Number(n) if cell.xf_index.is_some_and(|xf| workbook.xf_is_date(xf)) => {
//!                 print!("date:{} ", n)
//!             }
//!             value => print!("{:?} ", value),
//!         }
//!     }
//!     println!();
//! }
//! # Ok(())
//! # }
//! ```

/// Error types for XLS parsing
mod error;

/// BIFF record framing and the BOF record
pub mod records;

/// Byte and Unicode string decoding, shared string table
pub mod strings;

/// Fonts, number formats and extended formats
pub mod format;

/// Defined names
pub mod names;

/// External references (SUPBOOK, EXTERNSHEET)
pub mod xref;

/// Formula token decompiler
pub mod formula;

/// Options for opening a workbook
mod options;

/// Globals substream decoding
mod globals;

/// Workbook parsing implementation
mod workbook;

/// Worksheet parsing implementation
mod worksheet;

/// Cell value parsing and representation
mod cell;

/// Shared parsing utilities
pub mod utils;

pub use cell::{Cell, CellType, CellValue};
pub use error::{XlsError, XlsResult};
pub use format::{ExtendedFormat, Font, Format, FormatKind, FormattingTables};
pub use formula::{FormulaError, FormulaKind};
pub use globals::{parse_globals, SheetEntry, SheetKind, SheetVisibility, WorkbookTables};
pub use names::{DefinedName, NameScope, NameTable};
pub use options::{AddressingStyle, OpenOptions};
pub use records::BiffVersion;
pub use strings::SharedStringTable;
pub use workbook::{open_workbook, open_workbook_path, Workbook};
pub use worksheet::{ColInfo, Dimensions, MergedRange, RowInfo, Sheet};
pub use xref::{ExternSheet, ExternalRefs, SheetRange, SupBook, SupBookKind};
