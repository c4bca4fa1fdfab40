//! Workbook globals substream.
//!
//! The globals hold everything sheets share: the BIFF version, text
//! encoding, date mode, shared strings, formatting tables, defined names,
//! external references and the sheet inventory. BIFF2-4 files carry them
//! interleaved with the single worksheet's cells; BIFF4W embeds each sheet
//! after a SHEETHDR record; from BIFF5 on the globals come first and every
//! sheet is addressed by its BOUNDSHEET offset.

use crate::common::binary::{read_i32_le, read_u16_le, read_u32_le};
use crate::common::diagnostics::Diagnostics;
use crate::ole::codepage::XlsEncoding;
use crate::ole::xls::error::{XlsError, XlsResult};
use crate::ole::xls::format::FormattingTables;
use crate::ole::xls::formula::{decompile_formula, FormulaKind, ReferenceTables};
use crate::ole::xls::names::{DefinedName, NameScope, NameTable};
use crate::ole::xls::options::AddressingStyle;
use crate::ole::xls::records::*;
use crate::ole::xls::strings::{unpack_string, unpack_unicode, SharedStringTable};
use crate::ole::xls::xref::ExternalRefs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sheet visibility from BOUNDSHEET
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SheetVisibility {
    #[default]
    Visible,
    Hidden,
    /// Hidden and only made visible again by a macro
    VeryHidden,
    Other(u8),
}

impl From<u8> for SheetVisibility {
    fn from(value: u8) -> Self {
        match value {
            0 => SheetVisibility::Visible,
            1 => SheetVisibility::Hidden,
            2 => SheetVisibility::VeryHidden,
            other => SheetVisibility::Other(other),
        }
    }
}

/// Sheet type from BOUNDSHEET
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SheetKind {
    Worksheet,
    MacroSheet,
    Chart,
    VisualBasicModule,
    Other(u8),
}

impl From<u8> for SheetKind {
    fn from(value: u8) -> Self {
        match value {
            0x00 => SheetKind::Worksheet,
            0x01 => SheetKind::MacroSheet,
            0x02 => SheetKind::Chart,
            0x06 => SheetKind::VisualBasicModule,
            other => SheetKind::Other(other),
        }
    }
}

/// One worksheet of the inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetEntry {
    pub name: String,
    /// Position of the sheet's BOF within the workbook stream
    pub offset: usize,
    pub visibility: SheetVisibility,
}

/// Everything decoded from the workbook globals
#[derive(Debug, Clone)]
pub struct WorkbookTables {
    pub version: BiffVersion,
    pub encoding: XlsEncoding,
    /// CODEPAGE value as stored
    pub codepage: Option<u16>,
    /// COUNTRY: user interface and system regional settings
    pub country: Option<(u16, u16)>,
    /// 0 for the 1900 date system, 1 for 1904
    pub datemode: u8,
    /// WRITEACCESS user name
    pub user_name: String,
    pub builtin_format_count: Option<u16>,
    pub formatting: FormattingTables,
    pub shared_strings: SharedStringTable,
    /// Worksheets in inventory order
    pub sheets: Vec<SheetEntry>,
    /// Same order as `sheets`
    pub sheet_names: Vec<String>,
    /// Worksheet index per BOUNDSHEET, `None` for other sheet types
    pub all_sheets_map: Vec<Option<usize>>,
    pub sheet_by_name: HashMap<String, usize>,
    pub names: NameTable,
    pub external: ExternalRefs,
}

impl WorkbookTables {
    fn new(version: BiffVersion, encoding: XlsEncoding) -> Self {
        WorkbookTables {
            version,
            encoding,
            codepage: None,
            country: None,
            datemode: 0,
            user_name: String::new(),
            builtin_format_count: None,
            formatting: FormattingTables::default(),
            shared_strings: SharedStringTable::default(),
            sheets: Vec::new(),
            sheet_names: Vec::new(),
            all_sheets_map: Vec::new(),
            sheet_by_name: HashMap::new(),
            names: NameTable::default(),
            external: ExternalRefs::default(),
        }
    }

    /// Whether sheets must be parsed while opening.
    ///
    /// Sheets of BIFF2-4 and BIFF4W files are not independently addressable.
    pub fn requires_eager_load(&self) -> bool {
        self.version <= BiffVersion::Biff4W
    }

    /// Lookup tables for the formula decompiler
    pub fn reference_tables<'t>(&'t self, diagnostics: Option<&'t Diagnostics>) -> ReferenceTables<'t> {
        ReferenceTables {
            encoding: self.encoding,
            sheet_names: &self.sheet_names,
            all_sheets_map: &self.all_sheets_map,
            external: Some(&self.external),
            names: self.names.names(),
            diagnostics,
        }
    }

    fn push_sheet(&mut self, name: String, offset: usize, visibility: SheetVisibility) {
        let index = self.sheets.len();
        self.sheet_by_name.insert(name.clone(), index);
        self.sheet_names.push(name.clone());
        self.sheets.push(SheetEntry {
            name,
            offset,
            visibility,
        });
    }
}

fn default_encoding(version: BiffVersion) -> XlsEncoding {
    if version >= BiffVersion::Biff8 {
        XlsEncoding::Utf16Le
    } else {
        XlsEncoding::Latin1
    }
}

/// Walks the globals records and fills [`WorkbookTables`]
struct GlobalsParser<'a, 'd> {
    stream: RecordStream<'a>,
    tables: WorkbookTables,
    encoding_locked: bool,
    sheethdr_count: usize,
    diagnostics: &'d Diagnostics,
}

/// Decode the workbook globals of a BIFF stream.
///
/// The stream must start with a BOF record. `encoding_override` wins over
/// any CODEPAGE record.
pub fn parse_globals(
    stream: &[u8],
    encoding_override: Option<&str>,
    diagnostics: &Diagnostics,
) -> XlsResult<WorkbookTables> {
    let mut records = RecordStream::new(stream);
    let first = records.next().ok_or_else(|| XlsError::InvalidRecord {
        record_type: 0,
        message: "Workbook stream is too short for a BOF record".to_string(),
    })?;
    let bof = BofRecord::parse(&first, diagnostics)?;
    bof.check_workbook()?;

    let override_encoding = match encoding_override {
        Some(label) => Some(
            XlsEncoding::from_label(label)
                .ok_or_else(|| XlsError::Encoding(format!("unknown encoding label {:?}", label)))?,
        ),
        None => None,
    };
    let encoding = override_encoding.unwrap_or_else(|| default_encoding(bof.version));

    let mut parser = GlobalsParser {
        stream: records,
        tables: WorkbookTables::new(bof.version, encoding),
        encoding_locked: override_encoding.is_some(),
        sheethdr_count: 0,
        diagnostics,
    };
    parser.run()?;
    parser.names_epilogue();

    if parser.tables.version < BiffVersion::Biff4W {
        parser
            .tables
            .push_sheet("Sheet1".to_string(), 0, SheetVisibility::Visible);
        parser.tables.all_sheets_map.push(Some(0));
    }
    log::debug!(
        "globals: BIFF {} encoding {:?} {} sheets {} names",
        parser.tables.version,
        parser.tables.encoding,
        parser.tables.sheets.len(),
        parser.tables.names.len()
    );
    Ok(parser.tables)
}

impl GlobalsParser<'_, '_> {
    fn version(&self) -> BiffVersion {
        self.tables.version
    }

    fn run(&mut self) -> XlsResult<()> {
        while let Some(record) = self.stream.next() {
            let data = record.payload;
            match record.code {
                EOF => return Ok(()),
                FILEPASS => return Err(XlsError::Encrypted),
                CODEPAGE => self.handle_codepage(data),
                COUNTRY => {
                    if let (Ok(ui), Ok(system)) = (read_u16_le(data, 0), read_u16_le(data, 2)) {
                        self.tables.country = Some((ui, system));
                    }
                },
                DATEMODE => self.handle_datemode(data),
                WRITEACCESS => self.handle_writeaccess(data),
                BUILTINFMTCOUNT => self.tables.builtin_format_count = read_u16_le(data, 0).ok(),
                FONT | FONT_B3B4 => {
                    let encoding = self.tables.encoding;
                    self.tables.formatting.add_font(data, self.version(), &encoding);
                },
                EFONT => self.tables.formatting.set_last_font_colour(data),
                FORMAT | FORMAT2 => {
                    let encoding = self.tables.encoding;
                    self.tables.formatting.add_format(
                        record.code,
                        data,
                        self.version(),
                        &encoding,
                        self.diagnostics,
                    );
                },
                XF | XF2 | XF3 | XF4 => {
                    self.tables.formatting.add_xf(data, self.version(), self.diagnostics);
                },
                SST => {
                    let mut fragments = vec![data];
                    fragments.extend(self.stream.continuations());
                    self.tables.shared_strings = SharedStringTable::parse(&fragments, self.diagnostics);
                },
                BOUNDSHEET => self.handle_boundsheet(data),
                SHEETHDR if self.version() == BiffVersion::Biff4W => self.handle_sheethdr(data),
                NAME if self.version() >= BiffVersion::Biff5 => self.handle_name(data),
                SUPBOOK if self.version() >= BiffVersion::Biff8 => {
                    self.tables.external.add_supbook(data, self.diagnostics);
                },
                EXTERNNAME if self.version() >= BiffVersion::Biff8 => {
                    self.tables.external.add_extern_name(data);
                },
                EXTERNSHEET => self.handle_externsheet(data),
                _ => {},
            }
        }
        if self.stream.truncated() {
            self.diagnostics
                .warn(format_args!("Workbook globals end in a truncated record; using what was read"));
        }
        Ok(())
    }

    fn handle_codepage(&mut self, data: &[u8]) {
        let Ok(codepage) = read_u16_le(data, 0) else {
            return;
        };
        self.tables.codepage = Some(codepage);
        if self.encoding_locked {
            return;
        }
        self.tables.encoding = match XlsEncoding::from_codepage(codepage) {
            Some(encoding) => encoding,
            None => {
                self.diagnostics.warn(format_args!(
                    "Unknown codepage {}; decoding byte strings as latin_1",
                    codepage
                ));
                XlsEncoding::Latin1
            },
        };
    }

    fn handle_datemode(&mut self, data: &[u8]) {
        match read_u16_le(data, 0) {
            Ok(mode @ (0 | 1)) => self.tables.datemode = mode as u8,
            Ok(other) => self.diagnostics.warn(format_args!(
                "DATEMODE: expected 0 or 1, found {}; ignored",
                other
            )),
            Err(_) => {},
        }
    }

    fn handle_writeaccess(&mut self, data: &[u8]) {
        let name = if self.version() >= BiffVersion::Biff8 {
            unpack_unicode(data, 0, 2)
        } else {
            unpack_string(data, 0, &self.tables.encoding, 1)
        };
        self.tables.user_name = name.trim_end_matches(' ').to_string();
    }

    fn handle_boundsheet(&mut self, data: &[u8]) {
        if self.version() == BiffVersion::Biff4W {
            // The payload is only the name; offsets come from SHEETHDR
            let name = unpack_string(data, 0, &self.tables.encoding, 1);
            let index = self.tables.sheets.len();
            self.tables.push_sheet(name, 0, SheetVisibility::Visible);
            self.tables.all_sheets_map.push(Some(index));
            return;
        }
        if self.version() < BiffVersion::Biff5 {
            return;
        }

        let offset = read_i32_le(data, 0).unwrap_or(-1);
        let visibility = SheetVisibility::from(data.get(4).copied().unwrap_or(0));
        let kind = SheetKind::from(data.get(5).copied().unwrap_or(0));
        let name = if self.version() >= BiffVersion::Biff8 {
            unpack_unicode(data, 6, 1)
        } else {
            unpack_string(data, 6, &self.tables.encoding, 1)
        };

        if kind != SheetKind::Worksheet {
            self.diagnostics.debug(format_args!(
                "BOUNDSHEET: {:?} ({:?}) is not a worksheet; skipped",
                name, kind
            ));
            self.tables.all_sheets_map.push(None);
            return;
        }
        if offset < 0 || offset as usize >= self.stream.data().len() {
            self.diagnostics.warn(format_args!(
                "BOUNDSHEET: sheet {:?} offset {} is outside the stream; sheet will be empty",
                name, offset
            ));
        }
        let index = self.tables.sheets.len();
        self.tables
            .push_sheet(name, offset.max(0) as usize, visibility);
        self.tables.all_sheets_map.push(Some(index));
    }

    /// BIFF4W: a 4-byte length and the sheet name, with the sheet's own
    /// BOF..EOF substream right after this record.
    fn handle_sheethdr(&mut self, data: &[u8]) {
        let length = read_u32_le(data, 0).unwrap_or(0) as usize;
        let name = unpack_string(data, 4, &self.tables.encoding, 1);
        let offset = self.stream.position();

        let sheetno = self.sheethdr_count;
        self.sheethdr_count += 1;
        match self.tables.sheets.get_mut(sheetno) {
            Some(entry) => {
                if entry.name != name {
                    self.diagnostics.warn(format_args!(
                        "SHEETHDR: sheet {} is named {:?} here but {:?} in BOUNDSHEET",
                        sheetno, name, entry.name
                    ));
                }
                entry.offset = offset;
            },
            None => {
                let index = self.tables.sheets.len();
                self.tables.push_sheet(name, offset, SheetVisibility::Visible);
                self.tables.all_sheets_map.push(Some(index));
            },
        }

        if length == 0 {
            self.diagnostics
                .warn(format_args!("SHEETHDR: sheet {} has zero length", sheetno));
            self.skip_substream();
        } else {
            self.stream.seek(offset.saturating_add(length));
        }
    }

    /// Skip an embedded BOF..EOF substream
    fn skip_substream(&mut self) {
        for record in self.stream.by_ref() {
            if record.code == EOF {
                break;
            }
        }
    }

    fn handle_name(&mut self, data: &[u8]) {
        let index = self.tables.names.len();
        match DefinedName::parse(index, data, self.version(), &self.tables.encoding) {
            Some(name) => self.tables.names.push(name),
            None => {
                // Keep indices aligned with the file's name numbering
                self.diagnostics
                    .warn(format_args!("NAME record {} is too short ({} bytes)", index, data.len()));
                self.tables
                    .names
                    .push(DefinedName::new(index, "", NameScope::Invalid, Vec::new()));
            },
        }
    }

    fn handle_externsheet(&mut self, data: &[u8]) {
        if self.version() >= BiffVersion::Biff8 {
            let needed = ExternalRefs::biff8_externsheet_len(data);
            if data.len() >= needed {
                self.tables.external.add_extern_sheets_biff8(data, self.diagnostics);
                return;
            }
            let mut joined = data.to_vec();
            while joined.len() < needed {
                match self.stream.expect_continue() {
                    Some(more) => joined.extend_from_slice(more),
                    None => break,
                }
            }
            self.tables.external.add_extern_sheets_biff8(&joined, self.diagnostics);
        } else {
            let encoding = self.tables.encoding;
            self.tables.external.add_extern_sheet_b57(data, &encoding);
        }
    }

    /// Resolve name scopes, build the lookup maps and decompile every name.
    fn names_epilogue(&mut self) {
        if self.tables.names.is_empty() {
            return;
        }
        let tables = &mut self.tables;
        tables.names.resolve_scopes(
            tables.version,
            &tables.all_sheets_map,
            &tables.external,
            &tables.sheet_by_name,
        );
        tables.names.build_maps(self.diagnostics);

        let references = tables.reference_tables(Some(self.diagnostics));
        let results: Vec<_> = tables
            .names
            .names()
            .iter()
            .map(|name| {
                if name.is_opaque() {
                    return Ok(String::new());
                }
                decompile_formula(
                    name.formula_tokens(),
                    FormulaKind::NAME,
                    tables.version,
                    AddressingStyle::A1,
                    None,
                    &references,
                )
            })
            .collect();
        for (name, result) in tables.names.names().iter().zip(&results) {
            if let Err(err) = result {
                self.diagnostics
                    .warn(format_args!("Name {:?}: {}", name.name, err));
            }
        }
        tables.names.set_formula_results(results);
    }
}
