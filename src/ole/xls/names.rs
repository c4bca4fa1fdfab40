//! Defined names (NAME records)

use crate::common::binary::{read_u16_le, slice_clamped};
use crate::common::diagnostics::Diagnostics;
use crate::ole::codepage::XlsEncoding;
use crate::ole::xls::formula::{FormulaError, FormulaResult};
use crate::ole::xls::records::BiffVersion;
use crate::ole::xls::strings::{unpack_string_update_pos, unpack_unicode_update_pos};
use crate::ole::xls::xref::ExternalRefs;
use bitflags::bitflags;
use std::collections::HashMap;

bitflags! {
    /// NAME option bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NameFlags: u16 {
        const HIDDEN = 0x0001;
        const FUNCTION = 0x0002;
        const VB_PROCEDURE = 0x0004;
        const MACRO = 0x0008;
        const COMPLEX = 0x0010;
        const BUILTIN = 0x0020;
        const BINARY = 0x1000;
    }
}

const FUNCTION_GROUP_MASK: u16 = 0x0FC0;

/// Built-in names are stored as a single character code
const BUILTIN_NAMES: [&str; 14] = [
    "Consolidate_Area",
    "Auto_Open",
    "Auto_Close",
    "Extract",
    "Database",
    "Criteria",
    "Print_Area",
    "Print_Titles",
    "Recorder",
    "Data_Form",
    "Auto_Activate",
    "Auto_Deactivate",
    "Sheet_Title",
    "_FilterDatabase",
];

/// Where a name is visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NameScope {
    /// Record data points nowhere sensible
    Invalid,
    /// Local to a macro, chart or VBA sheet
    Unusable,
    Global,
    /// Local to a worksheet (worksheet index)
    Sheet(usize),
}

impl NameScope {
    /// -3 invalid, -2 unusable sheet, -1 global, otherwise the sheet index
    pub fn code(&self) -> i64 {
        match self {
            NameScope::Invalid => -3,
            NameScope::Unusable => -2,
            NameScope::Global => -1,
            NameScope::Sheet(index) => *index as i64,
        }
    }
}

/// A defined name
#[derive(Debug, Clone, PartialEq)]
pub struct DefinedName {
    /// Position in the NAME record sequence
    pub index: usize,
    pub name: String,
    pub flags: NameFlags,
    pub function_group: u8,
    pub shortcut: u8,
    /// 1-based EXTERNSHEET number giving the scope in BIFF5/7, 0 for global
    pub extern_sheet_number: u16,
    /// 1-based BOUNDSHEET index giving the scope in BIFF8, 0 for global
    pub sheet_index: u16,
    pub scope: NameScope,
    /// Token bytes (plus any trailing constant data)
    pub raw_formula: Vec<u8>,
    /// Declared token length
    pub formula_len: usize,
    /// Decompiled formula, set once the workbook globals are read
    pub formula_text: Option<String>,
    pub formula_error: Option<FormulaError>,
}

impl DefinedName {
    /// A name with no option bits over the given tokens
    pub fn new(index: usize, name: impl Into<String>, scope: NameScope, raw_formula: Vec<u8>) -> Self {
        DefinedName {
            index,
            name: name.into(),
            flags: NameFlags::empty(),
            function_group: 0,
            shortcut: 0,
            extern_sheet_number: 0,
            sheet_index: 0,
            scope,
            formula_len: raw_formula.len(),
            raw_formula,
            formula_text: None,
            formula_error: None,
        }
    }

    /// Parse a NAME record (BIFF5 and later)
    ///
    /// The scope stays [`NameScope::Global`] until
    /// [`NameTable::resolve_scopes`] runs.
    pub fn parse(index: usize, data: &[u8], version: BiffVersion, encoding: &XlsEncoding) -> Option<Self> {
        if data.len() < 14 {
            return None;
        }
        let options = read_u16_le(data, 0).ok()?;
        let shortcut = data[2];
        let name_len = data[3] as usize;
        let formula_len = read_u16_le(data, 4).ok()? as usize;
        let extern_sheet_number = read_u16_le(data, 6).ok()?;
        let sheet_index = read_u16_le(data, 8).ok()?;

        let (internal_name, pos) = if version >= BiffVersion::Biff8 {
            unpack_unicode_update_pos(data, 14, 1, Some(name_len))
        } else {
            unpack_string_update_pos(data, 14, encoding, 1, Some(name_len))
        };

        let flags = NameFlags::from_bits_truncate(options);
        let name = if flags.contains(NameFlags::BUILTIN) {
            internal_name
                .chars()
                .next()
                .and_then(|c| BUILTIN_NAMES.get(c as usize))
                .map(|s| s.to_string())
                .unwrap_or_else(|| "??Unknown??".to_string())
        } else {
            internal_name
        };

        Some(DefinedName {
            index,
            name,
            flags,
            function_group: ((options & FUNCTION_GROUP_MASK) >> 6) as u8,
            shortcut,
            extern_sheet_number,
            sheet_index,
            scope: NameScope::Global,
            raw_formula: slice_clamped(data, pos, data.len()).to_vec(),
            formula_len,
            formula_text: None,
            formula_error: None,
        })
    }

    /// Token bytes within the declared formula length
    pub fn formula_tokens(&self) -> &[u8] {
        &self.raw_formula[..self.formula_len.min(self.raw_formula.len())]
    }

    pub fn is_builtin(&self) -> bool {
        self.flags.contains(NameFlags::BUILTIN)
    }

    pub fn is_hidden(&self) -> bool {
        self.flags.contains(NameFlags::HIDDEN)
    }

    /// Macro and binary names have no formula to decompile
    pub fn is_opaque(&self) -> bool {
        self.flags.intersects(NameFlags::MACRO | NameFlags::BINARY)
    }
}

/// All defined names of a workbook with lookup maps
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    names: Vec<DefinedName>,
    by_name_and_scope: HashMap<(String, NameScope), usize>,
    by_name: HashMap<String, Vec<usize>>,
}

impl NameTable {
    pub fn push(&mut self, name: DefinedName) {
        self.names.push(name);
    }

    /// Turn the file-level sheet numbers of each name into a scope.
    ///
    /// `all_sheets_map` lists the worksheet index of each BOUNDSHEET;
    /// `sheet_by_name` maps worksheet names to their index.
    pub fn resolve_scopes(
        &mut self,
        version: BiffVersion,
        all_sheets_map: &[Option<usize>],
        external: &ExternalRefs,
        sheet_by_name: &HashMap<String, usize>,
    ) {
        for name in &mut self.names {
            name.scope = if version >= BiffVersion::Biff8 {
                match name.sheet_index as usize {
                    0 => NameScope::Global,
                    n if n <= all_sheets_map.len() => match all_sheets_map[n - 1] {
                        Some(sheet) => NameScope::Sheet(sheet),
                        None => NameScope::Unusable,
                    },
                    _ => NameScope::Invalid,
                }
            } else {
                match name.extern_sheet_number as usize {
                    0 => NameScope::Global,
                    n => match external.extern_sheet_name(n) {
                        Some(sheet_name) => sheet_by_name
                            .get(sheet_name)
                            .map_or(NameScope::Unusable, |&sheet| NameScope::Sheet(sheet)),
                        None => NameScope::Invalid,
                    },
                }
            };
        }
    }

    /// Build the case-insensitive lookup maps
    pub fn build_maps(&mut self, diagnostics: &Diagnostics) {
        self.by_name_and_scope.clear();
        self.by_name.clear();
        for (index, name) in self.names.iter().enumerate() {
            let lower = name.name.to_lowercase();
            let key = (lower.clone(), name.scope);
            if self.by_name_and_scope.insert(key, index).is_some() {
                diagnostics.note(format_args!(
                    "Duplicate entry ({:?}, {}) in name map",
                    lower,
                    name.scope.code()
                ));
            }
            self.by_name.entry(lower).or_default().push(index);
        }
        let names = &self.names;
        for indices in self.by_name.values_mut() {
            indices.sort_by_key(|&i| (names[i].scope.code(), i));
        }
    }

    /// Store decompiled formula text, one result per name
    ///
    /// Macro and binary names keep no text whatever their result.
    pub fn set_formula_results(&mut self, results: Vec<FormulaResult<String>>) {
        for (name, result) in self.names.iter_mut().zip(results) {
            if name.is_opaque() {
                continue;
            }
            match result {
                Ok(text) => name.formula_text = Some(text),
                Err(err) => name.formula_error = Some(err),
            }
        }
    }

    pub fn names(&self) -> &[DefinedName] {
        &self.names
    }

    pub fn get(&self, index: usize) -> Option<&DefinedName> {
        self.names.get(index)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The name with this (case-insensitive) text and scope
    pub fn lookup(&self, name: &str, scope: NameScope) -> Option<&DefinedName> {
        self.by_name_and_scope
            .get(&(name.to_lowercase(), scope))
            .map(|&i| &self.names[i])
    }

    /// Every name with this text, ordered by scope code (global before sheets)
    pub fn named(&self, name: &str) -> Vec<&DefinedName> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|indices| indices.iter().map(|&i| &self.names[i]).collect())
            .unwrap_or_default()
    }
}
