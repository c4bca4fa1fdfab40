//! Cell representation for XLS files

use crate::ole::xls::utils;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value held by a cell
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum CellValue {
    /// Nothing stored at this position
    #[default]
    Empty,
    Text(String),
    /// Numbers and dates (dates are serial numbers; see [`crate::ole::xls::Workbook::xf_is_date`])
    Number(f64),
    Boolean(bool),
    /// Excel error code, e.g. 0x07 for `#DIV/0!`
    Error(u8),
    /// Formatted but empty (kept only with `formatting_info`)
    Blank,
}

/// Discriminant of a [`CellValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    Empty,
    Text,
    Number,
    Boolean,
    Error,
    Blank,
}

impl CellValue {
    pub fn cell_type(&self) -> CellType {
        match self {
            CellValue::Empty => CellType::Empty,
            CellValue::Text(_) => CellType::Text,
            CellValue::Number(_) => CellType::Number,
            CellValue::Boolean(_) => CellType::Boolean,
            CellValue::Error(_) => CellType::Error,
            CellValue::Blank => CellType::Blank,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// True for `Empty` and `Blank`
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty | CellValue::Blank)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty | CellValue::Blank => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            CellValue::Error(code) => match utils::error_text(*code) {
                Some(text) => f.write_str(text),
                None => write!(f, "#ERR{}", code),
            },
        }
    }
}

/// A decoded cell
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cell {
    pub value: CellValue,
    /// Index into the workbook XF table
    pub xf_index: Option<u16>,
    /// Decompiled formula text, when requested at open time
    pub formula: Option<String>,
}

impl Cell {
    pub fn new(value: CellValue, xf_index: u16) -> Self {
        Cell {
            value,
            xf_index: Some(xf_index),
            formula: None,
        }
    }

    pub fn cell_type(&self) -> CellType {
        self.value.cell_type()
    }
}

/// The shared empty cell returned for unpopulated positions
pub(crate) static EMPTY_CELL: Cell = Cell {
    value: CellValue::Empty,
    xf_index: None,
    formula: None,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_type_follows_value() {
        assert_eq!(Cell::new(CellValue::Number(1.5), 15).cell_type(), CellType::Number);
        assert_eq!(EMPTY_CELL.cell_type(), CellType::Empty);
        assert_eq!(CellValue::Blank.cell_type(), CellType::Blank);
        assert!(CellValue::Blank.is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(CellValue::Error(0x07).to_string(), "#DIV/0!");
        assert_eq!(CellValue::Boolean(true).to_string(), "TRUE");
        assert_eq!(CellValue::Number(3.0).to_string(), "3");
        assert_eq!(CellValue::Text("x".into()).to_string(), "x");
    }
}
