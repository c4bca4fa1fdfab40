//! Reference rendering in A1 and R1C1 notation

use crate::ole::xls::utils::{cellnameabs, colname};

const ROW_WRAP: i64 = 65536;
const COL_WRAP: i64 = 256;

/// A decoded cell reference
///
/// Relative parts hold offsets from the base cell; absolute parts hold the
/// row or column index itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeCell {
    pub row: i32,
    pub col: i32,
    pub row_relative: bool,
    pub col_relative: bool,
}

impl RelativeCell {
    pub fn is_relative(&self) -> bool {
        self.row_relative || self.col_relative
    }
}

fn push_number(text: &mut String, value: i64) {
    let mut buffer = itoa::Buffer::new();
    text.push_str(buffer.format(value));
}

fn row_name(text: &mut String, cell: &RelativeCell, base_row: Option<u32>, r1c1: bool) {
    let row = cell.row as i64;
    match (cell.row_relative, r1c1, base_row) {
        (false, true, _) => {
            text.push('R');
            push_number(text, row + 1);
        },
        (false, false, _) => {
            text.push('$');
            push_number(text, row + 1);
        },
        (true, true, _) | (true, false, None) => {
            text.push('R');
            if row != 0 {
                text.push('[');
                push_number(text, row);
                text.push(']');
            }
        },
        (true, false, Some(base)) => push_number(text, (base as i64 + row).rem_euclid(ROW_WRAP) + 1),
    }
}

fn col_name(text: &mut String, cell: &RelativeCell, base_col: Option<u32>, r1c1: bool) {
    let col = cell.col as i64;
    match (cell.col_relative, r1c1, base_col) {
        (false, true, _) => {
            text.push('C');
            push_number(text, col + 1);
        },
        (false, false, _) => {
            text.push('$');
            text.push_str(&colname(col.max(0) as u32));
        },
        (true, true, _) | (true, false, None) => {
            text.push('C');
            if col != 0 {
                text.push('[');
                push_number(text, col);
                text.push(']');
            }
        },
        (true, false, Some(base)) => {
            text.push_str(&colname((base as i64 + col).rem_euclid(COL_WRAP) as u32))
        },
    }
}

fn needs_r1c1(cell: &RelativeCell, base: Option<(u32, u32)>) -> bool {
    cell.is_relative() && base.is_none()
}

/// Render one cell reference
///
/// A relative part without a base cell cannot be placed in A1 notation, so
/// the whole reference switches to R1C1.
pub fn cell_name_rel(cell: &RelativeCell, base: Option<(u32, u32)>, r1c1: bool) -> String {
    if !cell.is_relative() {
        return cellnameabs(cell.row.max(0) as u32, cell.col.max(0) as u32, r1c1);
    }
    let r1c1 = r1c1 || needs_r1c1(cell, base);
    let mut text = String::with_capacity(12);
    if r1c1 {
        row_name(&mut text, cell, base.map(|b| b.0), true);
        col_name(&mut text, cell, base.map(|b| b.1), true);
    } else {
        col_name(&mut text, cell, base.map(|b| b.1), false);
        row_name(&mut text, cell, base.map(|b| b.0), false);
    }
    text
}

/// Render a reference to the rectangle spanned by two corner cells
///
/// Both corners use the same notation. A range whose corners are identical
/// renders as a single cell.
pub fn range_name_rel(
    first: &RelativeCell,
    last: &RelativeCell,
    base: Option<(u32, u32)>,
    r1c1: bool,
) -> String {
    let r1c1 = r1c1 || needs_r1c1(first, base) || needs_r1c1(last, base);
    let head = cell_name_rel(first, base, r1c1);
    if first == last {
        return head;
    }
    let tail = cell_name_rel(last, base, r1c1);
    let mut text = head;
    text.push(':');
    text.push_str(&tail);
    text
}
