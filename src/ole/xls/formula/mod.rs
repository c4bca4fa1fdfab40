//! Formula decompiler
//!
//! BIFF formulas are stored as postfix token streams ("parsed expressions").
//! This module turns them back into formula text. It never evaluates
//! anything; the cached result of a formula cell is read by the sheet parser.
//!
//! # Example
//!
//! ```
//! use litchi_xls::ole::xls::formula::{decompile_formula, FormulaKind, ReferenceTables};
//! use litchi_xls::ole::xls::{AddressingStyle, BiffVersion};
//!
//! // 2 3 + 4 *
//! let tokens = [0x1E, 2, 0, 0x1E, 3, 0, 0x03, 0x1E, 4, 0, 0x05];
//! let tables = ReferenceTables::default();
//! let text = decompile_formula(
//!     &tokens,
//!     FormulaKind::CELL,
//!     BiffVersion::Biff8,
//!     AddressingStyle::A1,
//!     None,
//!     &tables,
//! )
//! .unwrap();
//! assert_eq!(text, "(2+3)*4");
//! ```

mod decompiler;
mod functions;
mod render;
mod tables;

pub use decompiler::{decompile_formula, Operand, OperandKind};
pub use functions::{function_def, FunctionDef};
pub use render::{cell_name_rel, range_name_rel, RelativeCell};

use crate::common::diagnostics::Diagnostics;
use crate::ole::codepage::XlsEncoding;
use crate::ole::xls::names::DefinedName;
use crate::ole::xls::xref::ExternalRefs;
use bitflags::bitflags;
use thiserror::Error;

bitflags! {
    /// Context a token stream was found in
    ///
    /// Shared, name, conditional-format and data-validation formulas store
    /// relative references as signed offsets.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FormulaKind: u8 {
        const CELL = 0x01;
        const SHARED = 0x02;
        const ARRAY = 0x04;
        const COND_FMT = 0x08;
        const DATA_VAL = 0x10;
        const NAME = 0x20;
    }
}

impl FormulaKind {
    /// Whether relative references are stored as offsets
    pub fn uses_relative_offsets(self) -> bool {
        self.intersects(Self::SHARED | Self::NAME | Self::COND_FMT | Self::DATA_VAL)
    }

    pub fn description(self) -> &'static str {
        match self {
            k if k == Self::CELL => "CELL",
            k if k == Self::SHARED => "SHARED",
            k if k == Self::ARRAY => "ARRAY",
            k if k == Self::COND_FMT => "COND-FMT",
            k if k == Self::DATA_VAL => "DATA-VAL",
            k if k == Self::NAME => "NAME",
            _ => "MIXED",
        }
    }
}

/// Errors that abort decompilation of a single formula
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    /// A token's payload runs past the declared formula length
    #[error("token 0x{token:02X} at offset {offset} needs {size} bytes; formula length is {length}")]
    LengthOverflow {
        token: u8,
        offset: usize,
        size: usize,
        length: usize,
    },

    /// Name formulas reference each other too deeply (or cyclically)
    #[error("excessive indirect references in name {0:?}")]
    RecursionLimit(String),
}

/// Result type alias for formula decompilation
pub type FormulaResult<T> = Result<T, FormulaError>;

/// Workbook tables a formula may refer to
///
/// The default value has no sheets, names or external references, which is
/// enough for formulas made only of constants, operators, functions and
/// 2-D references.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceTables<'t> {
    pub encoding: XlsEncoding,
    /// Worksheet names in inventory order
    pub sheet_names: &'t [String],
    /// Worksheet index per BOUNDSHEET record (`None` for non-worksheets)
    pub all_sheets_map: &'t [Option<usize>],
    pub external: Option<&'t ExternalRefs>,
    pub names: &'t [DefinedName],
    /// Receives unknown-token and stack warnings; `log` only when absent
    pub diagnostics: Option<&'t Diagnostics>,
}

impl Default for ReferenceTables<'_> {
    fn default() -> Self {
        ReferenceTables {
            encoding: XlsEncoding::Latin1,
            sheet_names: &[],
            all_sheets_map: &[],
            external: None,
            names: &[],
            diagnostics: None,
        }
    }
}
