//! External references: SUPBOOK, EXTERNNAME and EXTERNSHEET records.
//!
//! 3-D references in formulas name sheets indirectly. In BIFF8 a reference
//! index selects an EXTERNSHEET triple `(supbook, first, last)`; the supbook
//! says whether the sheets are local, in another workbook, or add-in
//! functions. BIFF5/7 EXTERNSHEET records instead carry a type byte and,
//! for internal references, the sheet name.

use crate::common::binary::{read_u16_le, slice_clamped};
use crate::common::diagnostics::Diagnostics;
use crate::ole::codepage::XlsEncoding;
use crate::ole::xls::strings::unpack_unicode_update_pos;
use std::collections::BTreeMap;

/// What a SUPBOOK record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupBookKind {
    /// Sheets of this workbook
    Internal,
    /// Add-in functions
    AddIn,
    /// Another workbook
    External,
    /// DDE or OLE link
    DdeOle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SupBook {
    pub kind: SupBookKind,
    /// Encoded URL of an external or DDE/OLE source
    pub url: Option<String>,
    /// Sheet names of an external workbook
    pub sheet_names: Vec<String>,
}

/// One BIFF8 EXTERNSHEET entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternSheet {
    pub supbook_index: u16,
    pub first_sheet: u16,
    pub last_sheet: u16,
}

/// Sheets a 3-D reference resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetRange {
    /// Worksheet indices, inclusive
    Local { first: usize, last: usize },
    /// Internal reference not tied to a sheet
    AnySheet,
    /// The referenced sheet was deleted
    Deleted,
    /// Internal reference to a macro, chart or VBA sheet
    MacroSheet,
    /// Sheets of another workbook
    External,
    /// Add-in function reference
    AddIn,
    /// Reference data that does not resolve (code -101, -102, -103)
    Invalid(i32),
}

impl SheetRange {
    /// The numeric code of a non-local range (-1 any sheet ... -5 add-in)
    pub fn code(&self) -> i32 {
        match self {
            SheetRange::Local { first, .. } => *first as i32,
            SheetRange::AnySheet => -1,
            SheetRange::Deleted => -2,
            SheetRange::MacroSheet => -3,
            SheetRange::External => -4,
            SheetRange::AddIn => -5,
            SheetRange::Invalid(code) => *code,
        }
    }

    /// `Sheet1`, `Sheet1:Sheet3` or a placeholder for unresolved ranges,
    /// quoted as formula text requires
    pub fn describe<S: AsRef<str>>(&self, sheet_names: &[S]) -> String {
        let name = |index: usize| sheet_names.get(index).map_or("?", |s| s.as_ref());
        match *self {
            SheetRange::Local { first, last } => {
                let mut text = quote_sheet_name(name(first));
                if last != first {
                    text.push(':');
                    text.push_str(&quote_sheet_name(name(last)));
                }
                text
            },
            SheetRange::AnySheet => quote_sheet_name("?internal; any sheet?"),
            SheetRange::Deleted => quote_sheet_name("internal; deleted sheet"),
            SheetRange::MacroSheet => quote_sheet_name("internal; macro sheet"),
            SheetRange::External => quote_sheet_name("<<external>>"),
            other => format!("?error {}?", other.code()),
        }
    }
}

/// Quote a sheet name for formula text
pub fn quote_sheet_name(name: &str) -> String {
    if name.contains('\'') {
        format!("'{}'", name.replace('\'', "''"))
    } else if name.contains(' ') {
        format!("'{}'", name)
    } else {
        name.to_string()
    }
}

/// External reference tables of a workbook
#[derive(Debug, Clone, Default)]
pub struct ExternalRefs {
    supbooks: Vec<SupBook>,
    locals_index: Option<usize>,
    addins_index: Option<usize>,
    addin_function_names: Vec<String>,
    extern_sheets: Vec<ExternSheet>,
    /// BIFF5/7 EXTERNSHEET type bytes (0 for unknown types)
    extern_sheet_types: Vec<u8>,
    /// BIFF5/7 internal sheet names keyed by 1-based EXTERNSHEET number
    extern_sheet_names: BTreeMap<usize, String>,
    extern_sheet_count: usize,
}

impl ExternalRefs {
    /// Handle a SUPBOOK record
    pub fn add_supbook(&mut self, data: &[u8], diagnostics: &Diagnostics) {
        let sheet_count = read_u16_le(data, 0).unwrap_or(0) as usize;
        let index = self.supbooks.len();

        if slice_clamped(data, 2, 4) == [0x01, 0x04] {
            self.locals_index = Some(index);
            self.supbooks.push(SupBook {
                kind: SupBookKind::Internal,
                url: None,
                sheet_names: Vec::new(),
            });
            return;
        }
        if slice_clamped(data, 0, 4) == [0x01, 0x00, 0x01, 0x3A] {
            self.addins_index = Some(index);
            self.supbooks.push(SupBook {
                kind: SupBookKind::AddIn,
                url: None,
                sheet_names: Vec::new(),
            });
            return;
        }

        let (url, mut pos) = unpack_unicode_update_pos(data, 2, 2, None);
        if sheet_count == 0 {
            self.supbooks.push(SupBook {
                kind: SupBookKind::DdeOle,
                url: Some(url),
                sheet_names: Vec::new(),
            });
            return;
        }

        let mut sheet_names = Vec::with_capacity(sheet_count.min(256));
        for _ in 0..sheet_count {
            if pos + 2 > data.len() {
                diagnostics.debug(format_args!(
                    "SUPBOOK {}: {} of {} sheet names present",
                    index,
                    sheet_names.len(),
                    sheet_count
                ));
                break;
            }
            let (name, next) = unpack_unicode_update_pos(data, pos, 2, None);
            sheet_names.push(name);
            pos = next;
        }
        self.supbooks.push(SupBook {
            kind: SupBookKind::External,
            url: Some(url),
            sheet_names,
        });
    }

    /// Handle a BIFF8 EXTERNNAME record.
    ///
    /// Only names under an add-in SUPBOOK are kept; they name add-in
    /// functions called through `tNameX`.
    pub fn add_extern_name(&mut self, data: &[u8]) {
        if data.len() < 6 {
            return;
        }
        let (name, _) = unpack_unicode_update_pos(data, 6, 1, None);
        if self.supbooks.last().map(|s| s.kind) == Some(SupBookKind::AddIn) {
            self.addin_function_names.push(name);
        }
    }

    /// Handle a BIFF8 EXTERNSHEET record (CONTINUE payloads already appended)
    pub fn add_extern_sheets_biff8(&mut self, data: &[u8], diagnostics: &Diagnostics) {
        self.extern_sheet_count += 1;
        let count = read_u16_le(data, 0).unwrap_or(0) as usize;
        let mut pos = 2;
        for n in 0..count {
            let (Ok(supbook_index), Ok(first_sheet), Ok(last_sheet)) = (
                read_u16_le(data, pos),
                read_u16_le(data, pos + 2),
                read_u16_le(data, pos + 4),
            ) else {
                diagnostics.warn(format_args!(
                    "EXTERNSHEET: only {} of {} references present",
                    n, count
                ));
                break;
            };
            self.extern_sheets.push(ExternSheet {
                supbook_index,
                first_sheet,
                last_sheet,
            });
            pos += 6;
        }
    }

    /// Handle a BIFF5/7 EXTERNSHEET record
    pub fn add_extern_sheet_b57(&mut self, data: &[u8], encoding: &XlsEncoding) {
        self.extern_sheet_count += 1;
        let name_len = data.first().copied().unwrap_or(0) as usize;
        let mut kind = data.get(1).copied().unwrap_or(0);
        if kind == 3 {
            let name = encoding.decode(slice_clamped(data, 2, 2 + name_len));
            self.extern_sheet_names.insert(self.extern_sheet_count, name);
        }
        if !(1..=4).contains(&kind) {
            kind = 0;
        }
        self.extern_sheet_types.push(kind);
    }

    /// Bytes an EXTERNSHEET record with this header needs in BIFF8
    pub fn biff8_externsheet_len(data: &[u8]) -> usize {
        read_u16_le(data, 0).unwrap_or(0) as usize * 6 + 2
    }

    pub fn supbooks(&self) -> &[SupBook] {
        &self.supbooks
    }

    pub fn extern_sheets(&self) -> &[ExternSheet] {
        &self.extern_sheets
    }

    pub fn extern_sheet_types(&self) -> &[u8] {
        &self.extern_sheet_types
    }

    /// Internal sheet name of a BIFF5/7 EXTERNSHEET (1-based)
    pub fn extern_sheet_name(&self, number: usize) -> Option<&str> {
        self.extern_sheet_names.get(&number).map(String::as_str)
    }

    pub fn addin_function_name(&self, index: usize) -> Option<&str> {
        self.addin_function_names.get(index).map(String::as_str)
    }

    pub fn addin_function_names(&self) -> &[String] {
        &self.addin_function_names
    }

    /// Resolve a BIFF8 reference index against the sheet map.
    ///
    /// `all_sheets_map[i]` is the worksheet index of BOUNDSHEET `i`, or
    /// `None` for macro, chart and VBA sheets.
    pub fn local_range_biff8(&self, refx: usize, all_sheets_map: &[Option<usize>]) -> SheetRange {
        let Some(info) = self.extern_sheets.get(refx) else {
            return SheetRange::Invalid(-101);
        };
        let supbook = info.supbook_index as usize;
        if self.addins_index == Some(supbook) {
            return SheetRange::AddIn;
        }
        if self.locals_index != Some(supbook) {
            return SheetRange::External;
        }
        match (info.first_sheet, info.last_sheet) {
            (0xFFFE, 0xFFFE) => return SheetRange::AnySheet,
            (0xFFFF, 0xFFFF) => return SheetRange::Deleted,
            _ => {},
        }
        resolve_local(
            info.first_sheet as usize,
            info.last_sheet as usize,
            all_sheets_map,
            -102,
        )
    }

    /// Resolve a BIFF5/7 3-D reference.
    ///
    /// A positive EXTERNSHEET index means another workbook; `-1, -1` is an
    /// internal reference to any sheet.
    pub fn local_range_b57(
        raw_extern_sheet: i16,
        first: i16,
        last: i16,
        all_sheets_map: &[Option<usize>],
    ) -> SheetRange {
        if raw_extern_sheet > 0 {
            return SheetRange::External;
        }
        if first == -1 && last == -1 {
            return SheetRange::Deleted;
        }
        if first < 0 || last < 0 {
            return SheetRange::Invalid(-103);
        }
        resolve_local(first as usize, last as usize, all_sheets_map, -103)
    }
}

fn resolve_local(
    first: usize,
    last: usize,
    all_sheets_map: &[Option<usize>],
    invalid: i32,
) -> SheetRange {
    if first > last || last >= all_sheets_map.len() {
        return SheetRange::Invalid(invalid);
    }
    match (all_sheets_map[first], all_sheets_map[last]) {
        (Some(first), Some(last)) if first <= last => SheetRange::Local { first, last },
        _ => SheetRange::MacroSheet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::biff::unicode_string;

    fn internal_and_external() -> ExternalRefs {
        let diagnostics = Diagnostics::new();
        let mut refs = ExternalRefs::default();
        refs.add_supbook(&[0x03, 0x00, 0x01, 0x04], &diagnostics);
        let mut external = 1u16.to_le_bytes().to_vec();
        external.extend(unicode_string("\u{1}other.xls", 2));
        external.extend(unicode_string("Data", 2));
        refs.add_supbook(&external, &diagnostics);
        refs.add_supbook(&[0x01, 0x00, 0x01, 0x3A], &diagnostics);
        let mut addin = vec![0u8; 6];
        addin.extend(unicode_string("ADDIN_FN", 1));
        refs.add_extern_name(&addin);

        let mut sheets = 5u16.to_le_bytes().to_vec();
        for (book, first, last) in [(0u16, 0u16, 1u16), (1, 0, 0), (0, 0xFFFE, 0xFFFE), (0, 2, 2), (2, 0, 0)] {
            sheets.extend_from_slice(&book.to_le_bytes());
            sheets.extend_from_slice(&first.to_le_bytes());
            sheets.extend_from_slice(&last.to_le_bytes());
        }
        refs.add_extern_sheets_biff8(&sheets, &diagnostics);
        refs
    }

    #[test]
    fn test_supbook_kinds() {
        let refs = internal_and_external();
        let kinds: Vec<SupBookKind> = refs.supbooks().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            [SupBookKind::Internal, SupBookKind::External, SupBookKind::AddIn]
        );
        assert_eq!(refs.supbooks()[1].sheet_names, ["Data"]);
        assert_eq!(refs.addin_function_name(0), Some("ADDIN_FN"));
    }

    #[test]
    fn test_biff8_ranges() {
        let refs = internal_and_external();
        // BOUNDSHEETs: worksheet, worksheet, chart
        let map = [Some(0), Some(1), None];
        assert_eq!(refs.local_range_biff8(0, &map), SheetRange::Local { first: 0, last: 1 });
        assert_eq!(refs.local_range_biff8(1, &map), SheetRange::External);
        assert_eq!(refs.local_range_biff8(2, &map), SheetRange::AnySheet);
        assert_eq!(refs.local_range_biff8(3, &map), SheetRange::MacroSheet);
        assert_eq!(refs.local_range_biff8(4, &map), SheetRange::AddIn);
        assert_eq!(refs.local_range_biff8(9, &map), SheetRange::Invalid(-101));
    }

    #[test]
    fn test_b57_ranges() {
        let map = [Some(0), None, Some(1)];
        assert_eq!(ExternalRefs::local_range_b57(1, 0, 0, &map), SheetRange::External);
        assert_eq!(ExternalRefs::local_range_b57(-1, -1, -1, &map), SheetRange::Deleted);
        assert_eq!(ExternalRefs::local_range_b57(-1, 0, 2, &map), SheetRange::Local { first: 0, last: 1 });
        assert_eq!(ExternalRefs::local_range_b57(-1, 1, 1, &map), SheetRange::MacroSheet);
        assert_eq!(ExternalRefs::local_range_b57(-1, 2, 5, &map), SheetRange::Invalid(-103));
    }

    #[test]
    fn test_b57_externsheet_names() {
        let mut refs = ExternalRefs::default();
        refs.add_extern_sheet_b57(&[0x06, 0x03, b'S', b'h', b'e', b'e', b't', b'1'], &XlsEncoding::Latin1);
        refs.add_extern_sheet_b57(&[0x00, 0x09], &XlsEncoding::Latin1);
        assert_eq!(refs.extern_sheet_name(1), Some("Sheet1"));
        assert_eq!(refs.extern_sheet_types(), [3, 0]);
    }

    #[test]
    fn test_describe() {
        let names = ["Sheet1", "My Sheet", "O'Brien"];
        assert_eq!(SheetRange::Local { first: 0, last: 0 }.describe(&names), "Sheet1");
        assert_eq!(SheetRange::Local { first: 0, last: 1 }.describe(&names), "Sheet1:'My Sheet'");
        assert_eq!(SheetRange::Local { first: 2, last: 2 }.describe(&names), "'O''Brien'");
        assert_eq!(SheetRange::External.describe(&names), "<<external>>");
        assert_eq!(SheetRange::Deleted.describe(&names), "'internal; deleted sheet'");
        assert_eq!(SheetRange::Invalid(-102).describe(&names), "?error -102?");
    }
}
