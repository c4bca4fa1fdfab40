//! Options controlling how a workbook is opened.

use crate::common::diagnostics::DiagnosticSink;
use std::fmt;

/// Notation used for references in decompiled formula text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressingStyle {
    /// `$A$1`, `B2`
    #[default]
    A1,
    /// `R1C1`, `R[1]C[-1]`
    R1C1,
}

/// Options for [`open_workbook`](crate::ole::xls::open_workbook).
///
/// # Examples
///
/// ```rust
/// use litchi_xls::ole::xls::{AddressingStyle, OpenOptions};
///
/// let options = OpenOptions::new()
///     .with_eager_load(false)
///     .with_ragged_rows(true)
///     .with_decompile_formulas(true)
///     .with_addressing_style(AddressingStyle::R1C1);
/// assert!(!options.eager_load);
/// ```
pub struct OpenOptions {
    /// Encoding label overriding the workbook's CODEPAGE record
    /// (`"cp1251"`, `"koi8-r"`, ...)
    pub encoding_override: Option<String>,
    /// Parse every worksheet while opening; otherwise on first access
    pub eager_load: bool,
    /// Keep each row only as long as its last populated column
    pub ragged_rows: bool,
    /// Cut a re-claimed sector chain short with a warning instead of failing
    pub permissive_corruption: bool,
    /// Receives a copy of every warning and note
    pub diagnostic_sink: Option<DiagnosticSink>,
    /// Keep formatted empty cells (BLANK, MULBLANK) as [`CellValue::Blank`](crate::ole::xls::CellValue::Blank)
    pub formatting_info: bool,
    /// Store decompiled text on each formula cell
    pub decompile_formulas: bool,
    pub addressing_style: AddressingStyle,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            encoding_override: None,
            eager_load: true,
            ragged_rows: false,
            permissive_corruption: false,
            diagnostic_sink: None,
            formatting_info: false,
            decompile_formulas: false,
            addressing_style: AddressingStyle::A1,
        }
    }
}

impl OpenOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode byte strings with the named encoding whatever the file declares.
    #[inline]
    pub fn with_encoding_override(mut self, label: impl Into<String>) -> Self {
        self.encoding_override = Some(label.into());
        self
    }

    /// Set whether worksheets are parsed during open.
    ///
    /// BIFF2-4 files and BIFF4W workbooks are always loaded eagerly.
    #[inline]
    pub fn with_eager_load(mut self, eager: bool) -> Self {
        self.eager_load = eager;
        self
    }

    #[inline]
    pub fn with_ragged_rows(mut self, ragged: bool) -> Self {
        self.ragged_rows = ragged;
        self
    }

    /// Set whether sector re-use in the container is fatal (`false`, the
    /// default) or reported and survived (`true`).
    #[inline]
    pub fn with_permissive_corruption(mut self, permissive: bool) -> Self {
        self.permissive_corruption = permissive;
        self
    }

    /// Write one line per diagnostic to `sink`.
    #[inline]
    pub fn with_diagnostic_sink(mut self, sink: DiagnosticSink) -> Self {
        self.diagnostic_sink = Some(sink);
        self
    }

    #[inline]
    pub fn with_formatting_info(mut self, formatting_info: bool) -> Self {
        self.formatting_info = formatting_info;
        self
    }

    #[inline]
    pub fn with_decompile_formulas(mut self, decompile: bool) -> Self {
        self.decompile_formulas = decompile;
        self
    }

    #[inline]
    pub fn with_addressing_style(mut self, style: AddressingStyle) -> Self {
        self.addressing_style = style;
        self
    }
}

impl fmt::Debug for OpenOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenOptions")
            .field("encoding_override", &self.encoding_override)
            .field("eager_load", &self.eager_load)
            .field("ragged_rows", &self.ragged_rows)
            .field("permissive_corruption", &self.permissive_corruption)
            .field("diagnostic_sink", &self.diagnostic_sink.is_some())
            .field("formatting_info", &self.formatting_info)
            .field("decompile_formulas", &self.decompile_formulas)
            .field("addressing_style", &self.addressing_style)
            .finish()
    }
}

/// The parts of [`OpenOptions`] sheet parsing needs after open
#[derive(Debug, Clone, Copy)]
pub(crate) struct SheetOptions {
    pub ragged_rows: bool,
    pub formatting_info: bool,
    pub decompile_formulas: bool,
    pub addressing_style: AddressingStyle,
}

impl From<&OpenOptions> for SheetOptions {
    fn from(options: &OpenOptions) -> Self {
        SheetOptions {
            ragged_rows: options.ragged_rows,
            formatting_info: options.formatting_info,
            decompile_formulas: options.decompile_formulas,
            addressing_style: options.addressing_style,
        }
    }
}

impl Default for SheetOptions {
    fn default() -> Self {
        SheetOptions::from(&OpenOptions::default())
    }
}
