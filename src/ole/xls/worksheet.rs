//! Worksheet substream parsing and the sparse sheet model

use crate::common::binary::{read_f64_le, read_u16_le, read_u32_le, slice_clamped};
use crate::common::diagnostics::Diagnostics;
use crate::ole::xls::cell::{Cell, CellType, CellValue, EMPTY_CELL};
use crate::ole::xls::formula::{decompile_formula, FormulaKind, ReferenceTables};
use crate::ole::xls::globals::{SheetVisibility, WorkbookTables};
use crate::ole::xls::options::SheetOptions;
use crate::ole::xls::records::*;
use crate::ole::xls::strings::{unpack_string, unpack_unicode};
use crate::ole::xls::utils::rk_to_f64;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Columns addressable in any BIFF version
const MAX_COLUMNS: u32 = 256;

/// A merged block, half-open: rows `row_lo..row_hi`, columns `col_lo..col_hi`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergedRange {
    pub row_lo: u32,
    pub row_hi: u32,
    pub col_lo: u32,
    pub col_hi: u32,
}

impl MergedRange {
    pub fn contains(&self, row: u32, col: u32) -> bool {
        (self.row_lo..self.row_hi).contains(&row) && (self.col_lo..self.col_hi).contains(&col)
    }
}

/// ROW record overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RowInfo {
    /// Height in twips
    pub height: u16,
    pub custom_height: bool,
    pub hidden: bool,
    pub outline_level: u8,
    /// Default XF of the row's empty cells
    pub xf_index: Option<u16>,
}

/// COLINFO record overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColInfo {
    /// Width in 1/256 of the zero character
    pub width: u16,
    pub xf_index: u16,
    pub hidden: bool,
    pub outline_level: u8,
    pub collapsed: bool,
}

/// DIMENSION record: first used row/column and one past the last
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub first_row: u32,
    pub last_row: u32,
    pub first_col: u32,
    pub last_col: u32,
}

/// A decoded worksheet
///
/// Cells are stored sparsely; unpopulated positions read as
/// [`CellValue::Empty`] unless a merged range covers them, in which case
/// the range's top-left cell is returned.
#[derive(Debug, Clone)]
pub struct Sheet {
    name: String,
    index: usize,
    visibility: SheetVisibility,
    cells: BTreeMap<(u32, u32), Cell>,
    nrows: u32,
    ncols: u32,
    ragged_rows: bool,
    /// Last populated column + 1 per row
    row_lens: BTreeMap<u32, u32>,
    merged: Vec<MergedRange>,
    row_info: BTreeMap<u32, RowInfo>,
    col_info: BTreeMap<u32, ColInfo>,
    default_col_width: Option<u16>,
    standard_width: Option<u16>,
    dimensions: Option<Dimensions>,
}

impl Sheet {
    fn new(name: String, index: usize, visibility: SheetVisibility, ragged_rows: bool) -> Self {
        Sheet {
            name,
            index,
            visibility,
            cells: BTreeMap::new(),
            nrows: 0,
            ncols: 0,
            ragged_rows,
            row_lens: BTreeMap::new(),
            merged: Vec::new(),
            row_info: BTreeMap::new(),
            col_info: BTreeMap::new(),
            default_col_width: None,
            standard_width: None,
            dimensions: None,
        }
    }

    fn put_cell(&mut self, row: u32, col: u32, cell: Cell) {
        self.nrows = self.nrows.max(row + 1);
        self.ncols = self.ncols.max(col + 1);
        let len = self.row_lens.entry(row).or_insert(0);
        *len = (*len).max(col + 1);
        self.cells.insert((row, col), cell);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in the workbook's worksheet inventory
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn visibility(&self) -> SheetVisibility {
        self.visibility
    }

    pub fn nrows(&self) -> usize {
        self.nrows as usize
    }

    pub fn ncols(&self) -> usize {
        self.ncols as usize
    }

    /// Cell at a position, reading through merged ranges to their anchor
    ///
    /// Interior cells of a merged range always read as the anchor, even when
    /// a formatted blank is stored there.
    pub fn cell(&self, row: u32, col: u32) -> &Cell {
        let anchor = self
            .merged
            .iter()
            .find(|range| range.contains(row, col))
            .map_or((row, col), |range| (range.row_lo, range.col_lo));
        self.cells.get(&anchor).unwrap_or(&EMPTY_CELL)
    }

    pub fn cell_value(&self, row: u32, col: u32) -> &CellValue {
        &self.cell(row, col).value
    }

    pub fn cell_type(&self, row: u32, col: u32) -> CellType {
        self.cell(row, col).cell_type()
    }

    /// Cell stored at exactly this position, without merged read-through
    pub fn stored_cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Populated cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = ((u32, u32), &Cell)> {
        self.cells.iter().map(|(&pos, cell)| (pos, cell))
    }

    /// Length of a row: the sheet-wide column count, or with ragged rows
    /// the row's last populated column + 1
    pub fn row_len(&self, row: u32) -> usize {
        if row >= self.nrows {
            return 0;
        }
        if self.ragged_rows {
            self.row_lens.get(&row).copied().unwrap_or(0) as usize
        } else {
            self.ncols as usize
        }
    }

    pub fn row(&self, row: u32) -> Vec<&Cell> {
        (0..self.row_len(row) as u32).map(|col| self.cell(row, col)).collect()
    }

    pub fn merged_ranges(&self) -> &[MergedRange] {
        &self.merged
    }

    pub fn row_info(&self, row: u32) -> Option<&RowInfo> {
        self.row_info.get(&row)
    }

    pub fn col_info(&self, col: u32) -> Option<&ColInfo> {
        self.col_info.get(&col)
    }

    /// DEFCOLWIDTH, in characters
    pub fn default_col_width(&self) -> Option<u16> {
        self.default_col_width
    }

    /// STANDARDWIDTH, in 1/256 of a character
    pub fn standard_width(&self) -> Option<u16> {
        self.standard_width
    }

    /// Extents declared by the DIMENSION record, which may disagree with
    /// the cells actually present
    pub fn dimensions(&self) -> Option<Dimensions> {
        self.dimensions
    }
}

/// Decodes one worksheet substream into a [`Sheet`]
pub(crate) struct SheetParser<'a, 't> {
    stream: RecordStream<'a>,
    tables: &'t WorkbookTables,
    references: ReferenceTables<'t>,
    options: SheetOptions,
    diagnostics: &'t Diagnostics,
    sheet: Sheet,
    /// BIFF2 IXFE value for the next cell with XF index 63
    pending_ixfe: Option<u16>,
}

impl<'a, 't> SheetParser<'a, 't> {
    /// Parse worksheet `index` of the inventory.
    ///
    /// Malformed records are reported and skipped; a truncated stream keeps
    /// the cells decoded before the cut.
    pub fn parse(
        stream: &'a [u8],
        index: usize,
        tables: &'t WorkbookTables,
        options: SheetOptions,
        diagnostics: &'t Diagnostics,
    ) -> Sheet {
        let (name, offset, visibility) = match tables.sheets.get(index) {
            Some(entry) => (entry.name.clone(), entry.offset, entry.visibility),
            None => (String::new(), stream.len(), SheetVisibility::Visible),
        };
        let mut parser = SheetParser {
            stream: RecordStream::at(stream, offset),
            tables,
            references: tables.reference_tables(Some(diagnostics)),
            options,
            diagnostics,
            sheet: Sheet::new(name, index, visibility, options.ragged_rows),
            pending_ixfe: None,
        };
        parser.run();
        parser.sheet
    }

    fn version(&self) -> BiffVersion {
        self.tables.version
    }

    fn run(&mut self) {
        match self.stream.next() {
            Some(record) if BOF_CODES.contains(&record.code) => {},
            Some(record) => {
                self.diagnostics.warn(format_args!(
                    "Sheet {:?}: expected BOF at offset {}, found 0x{:04X}; sheet is empty",
                    self.sheet.name, record.offset, record.code
                ));
                return;
            },
            None => {
                self.diagnostics.warn(format_args!(
                    "Sheet {:?}: no records at offset {}",
                    self.sheet.name,
                    self.stream.position()
                ));
                return;
            },
        }

        while let Some(record) = self.stream.next() {
            let data = record.payload;
            match record.code {
                EOF => return,
                code if BOF_CODES.contains(&code) => self.skip_substream(),
                NUMBER => {
                    if let Some((row, col, xf)) = self.header(data) {
                        let value = read_f64_le(data, 6).unwrap_or(0.0);
                        self.put(row, col, CellValue::Number(value), xf);
                    }
                },
                RK => {
                    if let Some((row, col, xf)) = self.header(data) {
                        let value = rk_to_f64(read_u32_le(data, 6).unwrap_or(0));
                        self.put(row, col, CellValue::Number(value), xf);
                    }
                },
                MULRK => self.handle_mulrk(data),
                LABEL | RSTRING => {
                    if let Some((row, col, xf)) = self.header(data) {
                        let text = if self.version() >= BiffVersion::Biff8 {
                            unpack_unicode(data, 6, 2)
                        } else {
                            unpack_string(data, 6, &self.tables.encoding, 2)
                        };
                        self.put(row, col, CellValue::Text(text), xf);
                    }
                },
                LABELSST => self.handle_labelsst(data),
                BOOLERR => {
                    if let Some((row, col, xf)) = self.header(data) {
                        self.put_boolerr(row, col, xf, data, 6);
                    }
                },
                BLANK => {
                    if self.options.formatting_info
                        && let Some((row, col, xf)) = self.header(data)
                    {
                        self.put(row, col, CellValue::Blank, xf);
                    }
                },
                MULBLANK => self.handle_mulblank(data),
                FORMULA | FORMULA3 | FORMULA4 => self.handle_formula(data),
                // BIFF2 cell records
                INTEGER if self.version().is_biff2() => {
                    if let Some((row, col, xf)) = self.header_b2(data) {
                        let value = read_u16_le(data, 7).unwrap_or(0) as f64;
                        self.put(row, col, CellValue::Number(value), xf);
                    }
                },
                NUMBER_B2 if self.version().is_biff2() => {
                    if let Some((row, col, xf)) = self.header_b2(data) {
                        let value = read_f64_le(data, 7).unwrap_or(0.0);
                        self.put(row, col, CellValue::Number(value), xf);
                    }
                },
                LABEL_B2 if self.version().is_biff2() => {
                    if let Some((row, col, xf)) = self.header_b2(data) {
                        let text = unpack_string(data, 7, &self.tables.encoding, 1);
                        self.put(row, col, CellValue::Text(text), xf);
                    }
                },
                BOOLERR_B2 if self.version().is_biff2() => {
                    if let Some((row, col, xf)) = self.header_b2(data) {
                        self.put_boolerr(row, col, xf, data, 7);
                    }
                },
                BLANK_B2 if self.version().is_biff2() => {
                    if self.options.formatting_info
                        && let Some((row, col, xf)) = self.header_b2(data)
                    {
                        self.put(row, col, CellValue::Blank, xf);
                    }
                },
                IXFE => self.pending_ixfe = read_u16_le(data, 0).ok(),
                DIMENSION | DIMENSION2 => self.handle_dimension(record.code, data),
                ROW | ROW_B2 => self.handle_row(record.code, data),
                COLINFO => self.handle_colinfo(data),
                DEFCOLWIDTH => self.sheet.default_col_width = read_u16_le(data, 0).ok(),
                STANDARDWIDTH => self.sheet.standard_width = read_u16_le(data, 0).ok(),
                MERGEDCELLS => self.handle_mergedcells(data),
                _ => {},
            }
        }

        if self.stream.truncated() {
            self.diagnostics.warn(format_args!(
                "Sheet {:?}: stream ends in a truncated record; keeping {} cells",
                self.sheet.name,
                self.sheet.cells.len()
            ));
        } else {
            self.diagnostics.warn(format_args!(
                "Sheet {:?}: no EOF record before the end of the stream",
                self.sheet.name
            ));
        }
    }

    /// Skip an embedded substream (a chart inside a worksheet)
    fn skip_substream(&mut self) {
        let mut depth = 1usize;
        for record in self.stream.by_ref() {
            if BOF_CODES.contains(&record.code) {
                depth += 1;
            } else if record.code == EOF {
                depth -= 1;
                if depth == 0 {
                    return;
                }
            }
        }
    }

    fn put(&mut self, row: u32, col: u32, value: CellValue, xf: u16) {
        self.sheet.put_cell(row, col, Cell::new(value, xf));
    }

    /// Row, column and XF of a BIFF3+ cell record
    fn header(&self, data: &[u8]) -> Option<(u32, u32, u16)> {
        match (read_u16_le(data, 0), read_u16_le(data, 2), read_u16_le(data, 4)) {
            (Ok(row), Ok(col), Ok(xf)) => Some((row as u32, col as u32, xf)),
            _ => {
                self.diagnostics
                    .warn(format_args!("Cell record of {} bytes has no header; skipped", data.len()));
                None
            },
        }
    }

    /// Row, column and XF of a BIFF2 cell record with 3 attribute bytes
    fn header_b2(&mut self, data: &[u8]) -> Option<(u32, u32, u16)> {
        let (Ok(row), Ok(col), Some(&attr)) = (read_u16_le(data, 0), read_u16_le(data, 2), data.get(4)) else {
            self.diagnostics
                .warn(format_args!("BIFF2 cell record of {} bytes has no header; skipped", data.len()));
            return None;
        };
        let mut xf = (attr & 0x3F) as u16;
        if xf == 63 {
            xf = match self.pending_ixfe {
                Some(ixfe) => ixfe,
                None => {
                    self.diagnostics.warn(format_args!(
                        "BIFF2 cell ({}, {}) has XF index 63 but no preceding IXFE record",
                        row, col
                    ));
                    0
                },
            };
        }
        Some((row as u32, col as u32, xf))
    }

    fn put_boolerr(&mut self, row: u32, col: u32, xf: u16, data: &[u8], at: usize) {
        let value = data.get(at).copied().unwrap_or(0);
        let is_error = data.get(at + 1).copied().unwrap_or(0) != 0;
        let value = if is_error {
            CellValue::Error(value)
        } else {
            CellValue::Boolean(value != 0)
        };
        self.put(row, col, value, xf);
    }

    /// Row, first column, then (XF, RK) pairs; the last column closes the record
    fn handle_mulrk(&mut self, data: &[u8]) {
        let (Ok(row), Ok(first)) = (read_u16_le(data, 0), read_u16_le(data, 2)) else {
            return;
        };
        if data.len() < 6 {
            return;
        }
        let last = read_u16_le(data, data.len() - 2).unwrap_or(0);
        let count = (data.len() - 6) / 6;
        if last < first || usize::from(last) - usize::from(first) + 1 != count {
            self.diagnostics.warn(format_args!(
                "MULRK row {}: columns {}..={} disagree with {} entries",
                row, first, last, count
            ));
        }
        for (i, entry) in slice_clamped(data, 4, data.len() - 2).chunks_exact(6).enumerate() {
            let xf = u16::from_le_bytes([entry[0], entry[1]]);
            let rk = u32::from_le_bytes([entry[2], entry[3], entry[4], entry[5]]);
            self.put(row as u32, first as u32 + i as u32, CellValue::Number(rk_to_f64(rk)), xf);
        }
    }

    fn handle_mulblank(&mut self, data: &[u8]) {
        if !self.options.formatting_info || data.len() < 6 {
            return;
        }
        let (Ok(row), Ok(first)) = (read_u16_le(data, 0), read_u16_le(data, 2)) else {
            return;
        };
        for (i, entry) in slice_clamped(data, 4, data.len() - 2).chunks_exact(2).enumerate() {
            let xf = u16::from_le_bytes([entry[0], entry[1]]);
            self.put(row as u32, first as u32 + i as u32, CellValue::Blank, xf);
        }
    }

    fn handle_labelsst(&mut self, data: &[u8]) {
        let Some((row, col, xf)) = self.header(data) else {
            return;
        };
        let index = read_u32_le(data, 6).unwrap_or(u32::MAX) as usize;
        let text = match self.tables.shared_strings.get(index) {
            Some(text) => text.to_string(),
            None => {
                self.diagnostics.warn(format_args!(
                    "LABELSST ({}, {}): string index {} is outside the SST ({} strings)",
                    row,
                    col,
                    index,
                    self.tables.shared_strings.len()
                ));
                String::new()
            },
        };
        self.put(row, col, CellValue::Text(text), xf);
    }

    fn handle_formula(&mut self, data: &[u8]) {
        let version = self.version();
        // (result offset, token length offset, token length width)
        let (position, result_at, tokens_len_at, wide_len) = if version.is_biff2() {
            (self.header_b2(data), 7, 16, false)
        } else if version < BiffVersion::Biff5 {
            (self.header(data), 6, 16, true)
        } else {
            (self.header(data), 6, 20, true)
        };
        let Some((row, col, xf)) = position else {
            return;
        };

        let result = slice_clamped(data, result_at, result_at + 8);
        let value = if result.len() == 8 && result[6] == 0xFF && result[7] == 0xFF {
            match result[0] {
                0 => Some(CellValue::Text(self.formula_string(row, col))),
                1 => Some(CellValue::Boolean(result[2] != 0)),
                2 => Some(CellValue::Error(result[2])),
                3 => Some(CellValue::Text(String::new())),
                other => {
                    self.diagnostics.warn(format_args!(
                        "FORMULA ({}, {}): unexpected special result type 0x{:02X}",
                        row, col, other
                    ));
                    None
                },
            }
        } else {
            Some(CellValue::Number(read_f64_le(result, 0).unwrap_or(0.0)))
        };

        let formula = if self.options.decompile_formulas {
            let (tokens_len, tokens_at) = if wide_len {
                (read_u16_le(data, tokens_len_at).unwrap_or(0) as usize, tokens_len_at + 2)
            } else {
                (data.get(tokens_len_at).copied().unwrap_or(0) as usize, tokens_len_at + 1)
            };
            let tokens = slice_clamped(data, tokens_at, tokens_at + tokens_len);
            self.decompile(tokens, row, col)
        } else {
            None
        };

        if let Some(value) = value {
            let mut cell = Cell::new(value, xf);
            cell.formula = formula;
            self.sheet.put_cell(row, col, cell);
        }
    }

    fn decompile(&self, tokens: &[u8], row: u32, col: u32) -> Option<String> {
        match decompile_formula(
            tokens,
            FormulaKind::CELL,
            self.version(),
            self.options.addressing_style,
            Some((row, col)),
            &self.references,
        ) {
            Ok(text) => Some(text),
            Err(err) => {
                self.diagnostics
                    .warn(format_args!("Sheet {:?} formula at ({}, {}): {}", self.sheet.name, row, col, err));
                None
            },
        }
    }

    /// Text result of a string formula, from the STRING record that follows.
    ///
    /// SHRFMLA, ARRAY and TABLEOP records may sit in between.
    fn formula_string(&mut self, row: u32, col: u32) -> String {
        loop {
            match self.stream.peek_code() {
                Some(SHRFMLA | ARRAY | TABLEOP | TABLEOP2 | TABLEOP_B2) => {
                    self.stream.next();
                },
                Some(STRING | STRING_B2) => {
                    let Some(record) = self.stream.next() else {
                        return String::new();
                    };
                    return if self.version() >= BiffVersion::Biff8 {
                        unpack_unicode(record.payload, 0, 2)
                    } else if self.version().is_biff2() {
                        unpack_string(record.payload, 0, &self.tables.encoding, 1)
                    } else {
                        unpack_string(record.payload, 0, &self.tables.encoding, 2)
                    };
                },
                found => {
                    self.diagnostics.warn(format_args!(
                        "FORMULA ({}, {}): expected a STRING record, found {}",
                        row,
                        col,
                        found.map_or_else(|| "end of stream".to_string(), |code| format!("0x{:04X}", code))
                    ));
                    return String::new();
                },
            }
        }
    }

    fn handle_dimension(&mut self, code: u16, data: &[u8]) {
        let dimensions = if code == DIMENSION && self.version() >= BiffVersion::Biff8 {
            match (read_u32_le(data, 0), read_u32_le(data, 4), read_u16_le(data, 8), read_u16_le(data, 10)) {
                (Ok(r1), Ok(r2), Ok(c1), Ok(c2)) => Some((r1, r2, c1, c2)),
                _ => None,
            }
        } else {
            match (read_u16_le(data, 0), read_u16_le(data, 2), read_u16_le(data, 4), read_u16_le(data, 6)) {
                (Ok(r1), Ok(r2), Ok(c1), Ok(c2)) => Some((r1 as u32, r2 as u32, c1, c2)),
                _ => None,
            }
        };
        if let Some((first_row, last_row, first_col, last_col)) = dimensions {
            self.sheet.dimensions = Some(Dimensions {
                first_row,
                last_row,
                first_col: first_col as u32,
                last_col: last_col as u32,
            });
        }
    }

    fn handle_row(&mut self, code: u16, data: &[u8]) {
        let (Ok(row), Ok(bits)) = (read_u16_le(data, 0), read_u16_le(data, 6)) else {
            return;
        };
        let mut info = RowInfo {
            height: bits & 0x7FFF,
            custom_height: bits & 0x8000 == 0,
            ..RowInfo::default()
        };
        if code == ROW
            && let Ok(options) = read_u32_le(data, 12)
        {
            info.outline_level = (options & 0x07) as u8;
            info.hidden = options & 0x20 != 0;
            if options & 0x80 != 0 {
                info.xf_index = Some(((options >> 16) & 0x0FFF) as u16);
            }
        }
        self.sheet.row_info.insert(row as u32, info);
    }

    fn handle_colinfo(&mut self, data: &[u8]) {
        let fields = (
            read_u16_le(data, 0),
            read_u16_le(data, 2),
            read_u16_le(data, 4),
            read_u16_le(data, 6),
            read_u16_le(data, 8),
        );
        let (Ok(first), Ok(last), Ok(width), Ok(xf_index), Ok(flags)) = fields else {
            return;
        };
        let info = ColInfo {
            width,
            xf_index,
            hidden: flags & 0x0001 != 0,
            outline_level: ((flags >> 8) & 0x07) as u8,
            collapsed: flags & 0x1000 != 0,
        };
        let last = (last as u32).min(MAX_COLUMNS - 1);
        for col in first as u32..=last {
            self.sheet.col_info.insert(col, info);
        }
    }

    fn handle_mergedcells(&mut self, data: &[u8]) {
        let count = read_u16_le(data, 0).unwrap_or(0) as usize;
        let available = data.len().saturating_sub(2) / 8;
        if count > available {
            self.diagnostics.warn(format_args!(
                "MERGEDCELLS declares {} ranges but holds {}",
                count, available
            ));
        }
        for entry in slice_clamped(data, 2, data.len()).chunks_exact(8).take(count) {
            let word = |i: usize| u16::from_le_bytes([entry[i], entry[i + 1]]) as u32;
            let (row_lo, row_last, col_lo, col_last) = (word(0), word(2), word(4), word(6));
            if row_last < row_lo || col_last < col_lo {
                self.diagnostics.warn(format_args!(
                    "MERGEDCELLS: inverted range rows {}..={} cols {}..={}; skipped",
                    row_lo, row_last, col_lo, col_last
                ));
                continue;
            }
            self.sheet.merged.push(MergedRange {
                row_lo,
                row_hi: row_last + 1,
                col_lo,
                col_hi: col_last + 1,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::diagnostics::capture::CaptureSink;
    use crate::ole::xls::globals::parse_globals;
    use crate::testutil::biff::{
        bof_payload, cell_header, number_payload, unicode_string, Biff8Workbook, RecordWriter,
    };

    fn sheet_from(body: RecordWriter, trailer: &[(u16, Vec<u8>)], options: SheetOptions) -> Sheet {
        let mut workbook = Biff8Workbook::new();
        for (code, payload) in trailer {
            workbook = workbook.trailer(*code, payload);
        }
        let stream = workbook.sheet("Data", body).finish();
        let diagnostics = Diagnostics::new();
        let tables = parse_globals(&stream, None, &diagnostics).unwrap();
        SheetParser::parse(&stream, 0, &tables, options, &diagnostics)
    }

    fn sst(strings: &[&str]) -> Vec<u8> {
        let mut payload = (strings.len() as u32).to_le_bytes().to_vec();
        payload.extend_from_slice(&(strings.len() as u32).to_le_bytes());
        for s in strings {
            payload.extend(unicode_string(s, 2));
        }
        payload
    }

    fn formula_payload(row: u16, col: u16, result: [u8; 8], tokens: &[u8]) -> Vec<u8> {
        let mut payload = cell_header(row, col, 15);
        payload.extend_from_slice(&result);
        payload.extend_from_slice(&0u16.to_le_bytes());
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload.extend_from_slice(&(tokens.len() as u16).to_le_bytes());
        payload.extend_from_slice(tokens);
        payload
    }

    #[test]
    fn test_basic_cell_records() {
        let mut rk = cell_header(0, 1, 16);
        rk.extend_from_slice(&(((1234u32) << 2) | 0x03).to_le_bytes());
        let mut labelsst = cell_header(1, 0, 17);
        labelsst.extend_from_slice(&1u32.to_le_bytes());
        let mut boolerr = cell_header(1, 1, 15);
        boolerr.extend_from_slice(&[0x07, 1]);
        let mut label = cell_header(2, 2, 15);
        label.extend(unicode_string("inline", 2));

        let body = RecordWriter::new()
            .record(NUMBER, &number_payload(0, 0, 15, 2.5))
            .record(RK, &rk)
            .record(LABELSST, &labelsst)
            .record(BOOLERR, &boolerr)
            .record(LABEL, &label);
        let sheet = sheet_from(body, &[(SST, sst(&["zero", "one"]))], SheetOptions::default());

        assert_eq!(sheet.name(), "Data");
        assert_eq!(sheet.cell_value(0, 0), &CellValue::Number(2.5));
        assert_eq!(sheet.cell_value(0, 1), &CellValue::Number(12.34));
        assert_eq!(sheet.cell(0, 1).xf_index, Some(16));
        assert_eq!(sheet.cell_value(1, 0), &CellValue::Text("one".to_string()));
        assert_eq!(sheet.cell_value(1, 1), &CellValue::Error(0x07));
        assert_eq!(sheet.cell_value(2, 2).as_str(), Some("inline"));
        assert_eq!(sheet.cell_type(5, 5), CellType::Empty);
        assert_eq!((sheet.nrows(), sheet.ncols()), (3, 3));
    }

    #[test]
    fn test_mulrk_and_blanks() {
        let mut mulrk = Vec::new();
        mulrk.extend_from_slice(&3u16.to_le_bytes());
        mulrk.extend_from_slice(&1u16.to_le_bytes());
        for value in [1u32, 2, 3] {
            mulrk.extend_from_slice(&15u16.to_le_bytes());
            mulrk.extend_from_slice(&((value << 2) | 0x02).to_le_bytes());
        }
        mulrk.extend_from_slice(&3u16.to_le_bytes());
        let mut mulblank = Vec::new();
        mulblank.extend_from_slice(&4u16.to_le_bytes());
        mulblank.extend_from_slice(&0u16.to_le_bytes());
        mulblank.extend_from_slice(&[15, 0, 15, 0]);
        mulblank.extend_from_slice(&1u16.to_le_bytes());

        let body = || {
            RecordWriter::new()
                .record(MULRK, &mulrk)
                .record(MULBLANK, &mulblank)
                .record(BLANK, &cell_header(5, 5, 15))
        };
        let sheet = sheet_from(body(), &[], SheetOptions::default());
        assert_eq!(sheet.cell_value(3, 3), &CellValue::Number(3.0));
        assert_eq!(sheet.cell_type(4, 0), CellType::Empty);
        assert_eq!(sheet.nrows(), 4);

        let options = SheetOptions {
            formatting_info: true,
            ..SheetOptions::default()
        };
        let sheet = sheet_from(body(), &[], options);
        assert_eq!(sheet.cell_type(4, 1), CellType::Blank);
        assert_eq!(sheet.cell_type(5, 5), CellType::Blank);
        assert_eq!(sheet.nrows(), 6);
    }

    #[test]
    fn test_formula_results() {
        let number = 42.0f64.to_le_bytes();
        let string = [0, 0, 0, 0, 0, 0, 0xFF, 0xFF];
        let boolean = [1, 0, 1, 0, 0, 0, 0xFF, 0xFF];
        let error = [2, 0, 0x2A, 0, 0, 0, 0xFF, 0xFF];
        let empty = [3, 0, 0, 0, 0, 0, 0xFF, 0xFF];
        let tokens = [0x1E, 42, 0];

        let body = RecordWriter::new()
            .record(FORMULA, &formula_payload(0, 0, number, &tokens))
            .record(FORMULA, &formula_payload(1, 0, string, &tokens))
            .record(SHRFMLA, &[0; 10])
            .record(STRING, &unicode_string("text result", 2))
            .record(FORMULA, &formula_payload(2, 0, boolean, &tokens))
            .record(FORMULA, &formula_payload(3, 0, error, &tokens))
            .record(FORMULA, &formula_payload(4, 0, empty, &tokens));
        let options = SheetOptions {
            decompile_formulas: true,
            ..SheetOptions::default()
        };
        let sheet = sheet_from(body, &[], options);
        assert_eq!(sheet.cell_value(0, 0), &CellValue::Number(42.0));
        assert_eq!(sheet.cell(0, 0).formula.as_deref(), Some("42"));
        assert_eq!(sheet.cell_value(1, 0).as_str(), Some("text result"));
        assert_eq!(sheet.cell_value(2, 0), &CellValue::Boolean(true));
        assert_eq!(sheet.cell_value(3, 0), &CellValue::Error(0x2A));
        assert_eq!(sheet.cell_value(4, 0).as_str(), Some(""));
    }

    #[test]
    fn test_string_formula_without_string_record() {
        let string = [0, 0, 0, 0, 0, 0, 0xFF, 0xFF];
        let body = RecordWriter::new()
            .record(FORMULA, &formula_payload(0, 0, string, &[]))
            .record(NUMBER, &number_payload(0, 1, 15, 1.0));
        let sheet = sheet_from(body, &[], SheetOptions::default());
        assert_eq!(sheet.cell_value(0, 0).as_str(), Some(""));
        // The record after the formula is still decoded
        assert_eq!(sheet.cell_value(0, 1), &CellValue::Number(1.0));
    }

    #[test]
    fn test_merged_read_through() {
        let mut merged = 1u16.to_le_bytes().to_vec();
        for word in [1u16, 2, 1, 3] {
            merged.extend_from_slice(&word.to_le_bytes());
        }
        let body = RecordWriter::new()
            .record(NUMBER, &number_payload(1, 1, 15, 7.0))
            .record(MERGEDCELLS, &merged);
        let sheet = sheet_from(body, &[], SheetOptions::default());
        assert_eq!(
            sheet.merged_ranges(),
            &[MergedRange {
                row_lo: 1,
                row_hi: 3,
                col_lo: 1,
                col_hi: 4
            }]
        );
        assert_eq!(sheet.cell_value(2, 3), &CellValue::Number(7.0));
        assert!(sheet.stored_cell(2, 3).is_none());
        assert_eq!(sheet.cell_type(3, 3), CellType::Empty);
    }

    #[test]
    fn test_merged_interior_blanks_read_anchor() {
        let mut merged = 1u16.to_le_bytes().to_vec();
        for word in [1u16, 2, 1, 3] {
            merged.extend_from_slice(&word.to_le_bytes());
        }
        let body = RecordWriter::new()
            .record(NUMBER, &number_payload(1, 1, 21, 7.0))
            .record(BLANK, &cell_header(1, 2, 15))
            .record(BLANK, &cell_header(2, 3, 15))
            .record(MERGEDCELLS, &merged);
        let options = SheetOptions {
            formatting_info: true,
            ..SheetOptions::default()
        };
        let sheet = sheet_from(body, &[], options);
        for (row, col) in [(1, 2), (2, 3)] {
            let cell = sheet.cell(row, col);
            assert_eq!(cell.value, CellValue::Number(7.0));
            assert_eq!(cell.xf_index, Some(21));
            assert_eq!(sheet.stored_cell(row, col).map(|c| &c.value), Some(&CellValue::Blank));
        }
    }

    #[test]
    fn test_mulrk_with_runaway_last_column() {
        let sink = CaptureSink::default();
        let mut mulrk = 0u16.to_le_bytes().to_vec();
        mulrk.extend_from_slice(&0u16.to_le_bytes());
        mulrk.extend_from_slice(&15u16.to_le_bytes());
        mulrk.extend_from_slice(&((9u32 << 2) | 0x02).to_le_bytes());
        mulrk.extend_from_slice(&0xFFFFu16.to_le_bytes());

        let stream = Biff8Workbook::new()
            .sheet("Data", RecordWriter::new().record(MULRK, &mulrk))
            .finish();
        let diagnostics = Diagnostics::with_sink(Box::new(sink.clone()));
        let tables = parse_globals(&stream, None, &diagnostics).unwrap();
        let sheet = SheetParser::parse(&stream, 0, &tables, SheetOptions::default(), &diagnostics);
        assert_eq!(sheet.cell_value(0, 0), &CellValue::Number(9.0));
        assert!(sink.text().contains("MULRK row 0: columns 0..=65535 disagree with 1 entries"));
    }

    #[test]
    fn test_ragged_rows() {
        let body = || {
            RecordWriter::new()
                .record(NUMBER, &number_payload(0, 4, 15, 1.0))
                .record(NUMBER, &number_payload(1, 1, 15, 2.0))
        };
        let padded = sheet_from(body(), &[], SheetOptions::default());
        assert_eq!(padded.row_len(1), 5);
        assert_eq!(padded.row(1).len(), 5);

        let ragged = sheet_from(
            body(),
            &[],
            SheetOptions {
                ragged_rows: true,
                ..SheetOptions::default()
            },
        );
        assert_eq!(ragged.row_len(0), 5);
        assert_eq!(ragged.row_len(1), 2);
        assert_eq!(ragged.row_len(9), 0);
    }

    #[test]
    fn test_row_and_column_info() {
        let mut row = Vec::new();
        for word in [2u16, 0, 4, 0x8000 | 300, 0, 0] {
            row.extend_from_slice(&word.to_le_bytes());
        }
        row.extend_from_slice(&(0x20u32 | 0x80 | (21 << 16)).to_le_bytes());
        let mut colinfo = Vec::new();
        for word in [1u16, 3, 4096, 17, 0x0001, 0] {
            colinfo.extend_from_slice(&word.to_le_bytes());
        }
        let mut dimension = 0u32.to_le_bytes().to_vec();
        dimension.extend_from_slice(&10u32.to_le_bytes());
        dimension.extend_from_slice(&[0, 0, 5, 0, 0, 0]);

        let body = RecordWriter::new()
            .record(DIMENSION, &dimension)
            .record(ROW, &row)
            .record(COLINFO, &colinfo)
            .record(DEFCOLWIDTH, &8u16.to_le_bytes());
        let sheet = sheet_from(body, &[], SheetOptions::default());

        let info = sheet.row_info(2).unwrap();
        assert_eq!(info.height, 300);
        assert!(!info.custom_height);
        assert!(info.hidden);
        assert_eq!(info.xf_index, Some(21));
        assert_eq!(sheet.col_info(3).map(|c| c.width), Some(4096));
        assert!(sheet.col_info(3).unwrap().hidden);
        assert!(sheet.col_info(4).is_none());
        assert_eq!(sheet.default_col_width(), Some(8));
        assert_eq!(sheet.dimensions().map(|d| (d.last_row, d.last_col)), Some((10, 5)));
    }

    #[test]
    fn test_truncated_sheet_keeps_cells() {
        let sink = CaptureSink::default();
        let diagnostics = Diagnostics::with_sink(Box::new(sink.clone()));
        let body = RecordWriter::new().record(NUMBER, &number_payload(0, 0, 15, 9.0));
        let mut stream = Biff8Workbook::new().sheet("Cut", body).finish();
        // Drop the sheet EOF and half of a record header
        stream.truncate(stream.len() - 4);
        stream.extend_from_slice(&[0x03, 0x02]);

        let tables = parse_globals(&stream, None, &diagnostics).unwrap();
        let sheet = SheetParser::parse(&stream, 0, &tables, SheetOptions::default(), &diagnostics);
        assert_eq!(sheet.cell_value(0, 0), &CellValue::Number(9.0));
        assert!(sink.text().contains("truncated"));
    }

    #[test]
    fn test_biff2_cells_and_ixfe() {
        let stream = RecordWriter::new()
            .record(BOF_B2, &[0x00, 0x00, 0x10, 0x00])
            .record(INTEGER, &[0, 0, 0, 0, 5, 0, 0, 42, 0])
            .record(IXFE, &70u16.to_le_bytes())
            .record(LABEL_B2, &[1, 0, 0, 0, 63, 0, 0, 2, b'h', b'i'])
            .record(BOOLERR_B2, &[2, 0, 0, 0, 0, 0, 0, 1, 0])
            .record(EOF, &[])
            .finish();
        let diagnostics = Diagnostics::new();
        let tables = parse_globals(&stream, None, &diagnostics).unwrap();
        let sheet = SheetParser::parse(&stream, 0, &tables, SheetOptions::default(), &diagnostics);
        assert_eq!(sheet.name(), "Sheet1");
        assert_eq!(sheet.cell_value(0, 0), &CellValue::Number(42.0));
        assert_eq!(sheet.cell(0, 0).xf_index, Some(5));
        assert_eq!(sheet.cell_value(1, 0).as_str(), Some("hi"));
        assert_eq!(sheet.cell(1, 0).xf_index, Some(70));
        assert_eq!(sheet.cell_value(2, 0), &CellValue::Boolean(true));
    }

    #[test]
    fn test_embedded_chart_substream_is_skipped() {
        let chart_bof = bof_payload(0x0600, 0x0020);
        let body = RecordWriter::new()
            .record(BOF, &chart_bof)
            .record(NUMBER, &number_payload(9, 9, 15, 1.0))
            .record(EOF, &[])
            .record(NUMBER, &number_payload(0, 0, 15, 2.0));
        let sheet = sheet_from(body, &[], SheetOptions::default());
        assert_eq!(sheet.cell_type(9, 9), CellType::Empty);
        assert_eq!(sheet.cell_value(0, 0), &CellValue::Number(2.0));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_merged_cells_read_anchor(
            row_lo in 0u32..50,
            col_lo in 0u32..50,
            height in 1u32..10,
            width in 1u32..10,
            row in 0u32..70,
            col in 0u32..70,
            formatted in any::<bool>(),
        ) {
            let mut sheet = Sheet::new("M".to_string(), 0, SheetVisibility::Visible, false);
            sheet.put_cell(row_lo, col_lo, Cell::new(CellValue::Number(1.0), 21));
            let range = MergedRange {
                row_lo,
                row_hi: row_lo + height,
                col_lo,
                col_hi: col_lo + width,
            };
            if formatted {
                for r in range.row_lo..range.row_hi {
                    for c in range.col_lo..range.col_hi {
                        if (r, c) != (row_lo, col_lo) {
                            sheet.put_cell(r, c, Cell::new(CellValue::Blank, 15));
                        }
                    }
                }
            }
            sheet.merged.push(range);

            let value = sheet.cell_value(row, col);
            if range.contains(row, col) {
                prop_assert_eq!(value, &CellValue::Number(1.0));
                prop_assert_eq!(sheet.cell(row, col).xf_index, Some(21));
            } else {
                prop_assert_eq!(value, &CellValue::Empty);
            }
        }
    }
}
