//! Workbook implementation for XLS files

use crate::common::binary::read_u16_le;
use crate::common::diagnostics::Diagnostics;
use crate::ole::codepage::XlsEncoding;
use crate::ole::file::{is_ole_file, CompoundDocument, OleError};
use crate::ole::xls::error::{XlsError, XlsResult};
use crate::ole::xls::format::FormattingTables;
use crate::ole::xls::formula::{self, FormulaKind, FormulaResult};
use crate::ole::xls::globals::{parse_globals, SheetEntry, WorkbookTables};
use crate::ole::xls::names::NameTable;
use crate::ole::xls::options::{AddressingStyle, OpenOptions, SheetOptions};
use crate::ole::xls::records::{BiffVersion, BOF_CODES};
use crate::ole::xls::strings::SharedStringTable;
use crate::ole::xls::worksheet::{Sheet, SheetParser};
use crate::ole::xls::xref::ExternalRefs;
use once_cell::sync::OnceCell;
use std::borrow::Cow;
use std::fmt;
use std::path::Path;

/// Stream names holding the BIFF data, newest first
const WORKBOOK_STREAMS: [&str; 2] = ["Workbook", "Book"];

/// An opened `.xls` workbook
///
/// Globals are decoded while opening. Worksheets are decoded then as well,
/// or on first access when [`OpenOptions::eager_load`] is off; each sheet is
/// decoded at most once and lazy loads of different sheets may run on
/// different threads.
///
/// # Examples
///
/// ```no_run
/// use litchi_xls::ole::xls::{open_workbook_path, OpenOptions};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let workbook = open_workbook_path("report.xls", OpenOptions::default())?;
/// for name in workbook.sheet_names() {
///     let sheet = workbook.sheet_by_name(name)?;
///     println!("{}: {} x {}", name, sheet.nrows(), sheet.ncols());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Workbook<'a> {
    stream: Cow<'a, [u8]>,
    tables: WorkbookTables,
    sheets: Vec<OnceCell<Sheet>>,
    sheet_options: SheetOptions,
    diagnostics: Diagnostics,
}

/// Open a workbook held in memory.
///
/// `bytes` is either an OLE2 compound document with a "Workbook" or "Book"
/// stream, or a bare BIFF stream starting with a BOF record (common for
/// BIFF2-4 files).
pub fn open_workbook(bytes: &[u8], mut options: OpenOptions) -> XlsResult<Workbook<'_>> {
    let diagnostics = match options.diagnostic_sink.take() {
        Some(sink) => Diagnostics::with_sink(sink),
        None => Diagnostics::new(),
    };
    let stream = workbook_stream(bytes, options.permissive_corruption, &diagnostics)?;
    Workbook::from_stream(stream, &options, diagnostics)
}

/// Read a file and open it as a workbook that owns its data.
pub fn open_workbook_path<P: AsRef<Path>>(path: P, options: OpenOptions) -> XlsResult<Workbook<'static>> {
    let bytes = std::fs::read(path)?;
    Ok(open_workbook(&bytes, options)?.into_owned())
}

fn workbook_stream<'a>(
    bytes: &'a [u8],
    permissive: bool,
    diagnostics: &Diagnostics,
) -> XlsResult<Cow<'a, [u8]>> {
    if !is_ole_file(bytes) {
        let code = read_u16_le(bytes, 0).unwrap_or(u16::MAX);
        if BOF_CODES.contains(&code) {
            diagnostics.debug(format_args!("input is a bare BIFF stream"));
            return Ok(Cow::Borrowed(bytes));
        }
        return Err(OleError::NotOleFile.into());
    }

    let mut document = CompoundDocument::open(bytes, !permissive, diagnostics)?;
    for name in WORKBOOK_STREAMS {
        match document.locate_stream(name, diagnostics) {
            Ok(stream) => return Ok(stream),
            Err(OleError::StreamNotFound(_)) => continue,
            Err(err) => return Err(err.into()),
        }
    }
    Err(XlsError::WorkbookStreamNotFound)
}

impl<'a> Workbook<'a> {
    fn from_stream(stream: Cow<'a, [u8]>, options: &OpenOptions, diagnostics: Diagnostics) -> XlsResult<Self> {
        let tables = parse_globals(&stream, options.encoding_override.as_deref(), &diagnostics)?;
        let mut eager = options.eager_load;
        if !eager && tables.requires_eager_load() {
            diagnostics.warn(format_args!(
                "BIFF {} sheets are not independently addressable; loading eagerly",
                tables.version
            ));
            eager = true;
        }

        let sheets = (0..tables.sheets.len()).map(|_| OnceCell::new()).collect();
        let workbook = Workbook {
            stream,
            tables,
            sheets,
            sheet_options: SheetOptions::from(options),
            diagnostics,
        };
        if eager {
            for index in 0..workbook.sheets.len() {
                workbook.load_sheet(index);
            }
        }
        Ok(workbook)
    }

    /// Detach from the input buffer
    pub fn into_owned(self) -> Workbook<'static> {
        Workbook {
            stream: Cow::Owned(self.stream.into_owned()),
            tables: self.tables,
            sheets: self.sheets,
            sheet_options: self.sheet_options,
            diagnostics: self.diagnostics,
        }
    }

    fn load_sheet(&self, index: usize) -> &Sheet {
        self.sheets[index].get_or_init(|| {
            log::debug!("loading sheet {} ({:?})", index, self.tables.sheets[index].name);
            SheetParser::parse(&self.stream, index, &self.tables, self.sheet_options, &self.diagnostics)
        })
    }

    pub fn version(&self) -> BiffVersion {
        self.tables.version
    }

    /// 0 for the 1900 date system, 1 for 1904
    pub fn datemode(&self) -> u8 {
        self.tables.datemode
    }

    pub fn encoding(&self) -> XlsEncoding {
        self.tables.encoding
    }

    pub fn codepage(&self) -> Option<u16> {
        self.tables.codepage
    }

    pub fn country(&self) -> Option<(u16, u16)> {
        self.tables.country
    }

    /// Last user to save the file (WRITEACCESS)
    pub fn user_name(&self) -> &str {
        &self.tables.user_name
    }

    pub fn nsheets(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheet_names(&self) -> &[String] {
        &self.tables.sheet_names
    }

    /// Inventory entries: name, stream offset and visibility
    pub fn sheet_entries(&self) -> &[SheetEntry] {
        &self.tables.sheets
    }

    pub fn sheet_by_index(&self, index: usize) -> XlsResult<&Sheet> {
        if index >= self.sheets.len() {
            return Err(XlsError::WorksheetNotFound(format!("index {}", index)));
        }
        Ok(self.load_sheet(index))
    }

    pub fn sheet_by_name(&self, name: &str) -> XlsResult<&Sheet> {
        let index = self
            .tables
            .sheet_by_name
            .get(name)
            .copied()
            .ok_or_else(|| XlsError::WorksheetNotFound(name.to_string()))?;
        Ok(self.load_sheet(index))
    }

    /// All worksheets in inventory order, loading any not yet decoded
    pub fn sheets(&self) -> impl Iterator<Item = &Sheet> {
        (0..self.sheets.len()).map(|index| self.load_sheet(index))
    }

    pub fn sheet_loaded(&self, index: usize) -> bool {
        self.sheets.get(index).is_some_and(|cell| cell.get().is_some())
    }

    /// Drop a decoded sheet; the next access decodes it again
    pub fn unload_sheet(&mut self, index: usize) {
        if let Some(cell) = self.sheets.get_mut(index) {
            cell.take();
        }
    }

    pub fn shared_strings(&self) -> &SharedStringTable {
        &self.tables.shared_strings
    }

    pub fn formatting(&self) -> &FormattingTables {
        &self.tables.formatting
    }

    /// Whether cells with this XF index hold dates
    pub fn xf_is_date(&self, xf_index: u16) -> bool {
        self.tables.formatting.xf_is_date(xf_index as usize)
    }

    pub fn names(&self) -> &NameTable {
        &self.tables.names
    }

    pub fn external_refs(&self) -> &ExternalRefs {
        &self.tables.external
    }

    /// Everything decoded from the globals
    pub fn tables(&self) -> &WorkbookTables {
        &self.tables
    }

    /// Decompile a token stream against this workbook's sheets and names.
    ///
    /// Diagnostics go to the workbook's sink.
    pub fn decompile_formula(
        &self,
        tokens: &[u8],
        kind: FormulaKind,
        style: AddressingStyle,
        base_cell: Option<(u32, u32)>,
    ) -> FormulaResult<String> {
        let tables = self.tables.reference_tables(Some(&self.diagnostics));
        formula::decompile_formula(tokens, kind, self.tables.version, style, base_cell, &tables)
    }
}

impl fmt::Debug for Workbook<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workbook")
            .field("version", &self.tables.version)
            .field("encoding", &self.tables.encoding)
            .field("stream_len", &self.stream.len())
            .field("sheets", &self.tables.sheet_names)
            .field("loaded", &self.sheets.iter().filter(|cell| cell.get().is_some()).count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::diagnostics::capture::CaptureSink;
    use crate::ole::xls::cell::{CellType, CellValue};
    use crate::ole::xls::records::*;
    use crate::testutil::biff::{cell_header, unicode_string, Biff8Workbook, RecordWriter};
    use crate::testutil::cfb::{set_sat_entry, CompoundBuilder};
    use std::io::Write;

    fn rk_body(row: u16, col: u16, value: i32) -> RecordWriter {
        let mut payload = cell_header(row, col, 15);
        payload.extend_from_slice(&(((value << 2) as u32) | 0x02).to_le_bytes());
        RecordWriter::new().record(RK, &payload)
    }

    fn formula_payload(row: u16, col: u16, result: [u8; 8], tokens: &[u8]) -> Vec<u8> {
        let mut payload = cell_header(row, col, 15);
        payload.extend_from_slice(&result);
        payload.extend_from_slice(&[0; 6]);
        payload.extend_from_slice(&(tokens.len() as u16).to_le_bytes());
        payload.extend_from_slice(tokens);
        payload
    }

    fn in_container(stream: Vec<u8>) -> Vec<u8> {
        CompoundBuilder::new().stream("Workbook", stream).build().bytes
    }

    #[test]
    fn test_single_rk_cell_end_to_end() {
        let stream = Biff8Workbook::new().sheet("Numbers", rk_body(0, 0, 1234)).finish();
        let bytes = in_container(stream);
        let workbook = open_workbook(&bytes, OpenOptions::default()).unwrap();
        assert_eq!(workbook.sheet_names(), ["Numbers"]);
        assert_eq!(workbook.version(), BiffVersion::Biff8);
        let sheet = workbook.sheet_by_index(0).unwrap();
        assert_eq!(sheet.cell_type(0, 0), CellType::Number);
        assert_eq!(sheet.cell_value(0, 0), &CellValue::Number(1234.0));
    }

    #[test]
    fn test_utf16_shared_string() {
        let mut sst = 1u32.to_le_bytes().to_vec();
        sst.extend_from_slice(&1u32.to_le_bytes());
        sst.extend(unicode_string("Grüße €", 2));
        let mut labelsst = cell_header(0, 0, 15);
        labelsst.extend_from_slice(&0u32.to_le_bytes());

        let stream = Biff8Workbook::new()
            .global(CODEPAGE, &1200u16.to_le_bytes())
            .trailer(SST, &sst)
            .sheet("Text", RecordWriter::new().record(LABELSST, &labelsst))
            .finish();
        let bytes = in_container(stream);
        let workbook = open_workbook(&bytes, OpenOptions::default()).unwrap();
        assert_eq!(workbook.encoding(), XlsEncoding::Utf16Le);
        let sheet = workbook.sheet_by_name("Text").unwrap();
        assert_eq!(sheet.cell_value(0, 0).as_str(), Some("Grüße €"));
    }

    #[test]
    fn test_string_formula_result() {
        let marker = [0, 0, 0, 0, 0, 0, 0xFF, 0xFF];
        let body = RecordWriter::new()
            .record(FORMULA, &formula_payload(0, 0, marker, &[0x17, 2, 0, b'o', b'k']))
            .record(STRING, &unicode_string("ok", 2));
        let stream = Biff8Workbook::new().sheet("F", body).finish();
        let workbook = open_workbook(&stream, OpenOptions::new().with_decompile_formulas(true)).unwrap();
        let cell = workbook.sheet_by_index(0).unwrap().cell(0, 0);
        assert_eq!(cell.value, CellValue::Text("ok".to_string()));
        assert_eq!(cell.formula.as_deref(), Some("\"ok\""));
    }

    #[test]
    fn test_ragged_rows_change_row_len() {
        let stream = || {
            let body = rk_body(0, 3, 1);
            let mut payload = cell_header(1, 0, 15);
            payload.extend_from_slice(&0x0000_0006u32.to_le_bytes());
            let body = body.record(RK, &payload);
            Biff8Workbook::new().sheet("R", body).finish()
        };
        let padded = stream();
        let workbook = open_workbook(&padded, OpenOptions::default()).unwrap();
        assert_eq!(workbook.sheet_by_index(0).unwrap().row_len(1), 4);

        let ragged = stream();
        let workbook = open_workbook(&ragged, OpenOptions::new().with_ragged_rows(true)).unwrap();
        assert_eq!(workbook.sheet_by_index(0).unwrap().row_len(1), 1);
    }

    #[test]
    fn test_reclaimed_sector_is_fatal_unless_permissive() {
        let mut stream = Biff8Workbook::new().sheet("Kept", rk_body(0, 0, 3)).finish();
        stream.resize(4096, 0);
        let mut built = CompoundBuilder::new().stream("Workbook", stream).build();
        let chain = built.stream_sectors[0].clone();
        set_sat_entry(&mut built, chain[1], chain[0] as i32);

        assert!(matches!(
            open_workbook(&built.bytes, OpenOptions::default()),
            Err(XlsError::Cfb(OleError::Corruption(_)))
        ));

        let sink = CaptureSink::default();
        let options = OpenOptions::new()
            .with_permissive_corruption(true)
            .with_diagnostic_sink(Box::new(sink.clone()));
        let workbook = open_workbook(&built.bytes, options).unwrap();
        assert_eq!(workbook.sheet_by_index(0).unwrap().cell_value(0, 0), &CellValue::Number(3.0));
        assert!(sink.text().contains("corruption"));
    }

    #[test]
    fn test_lazy_loading() {
        let stream = Biff8Workbook::new()
            .sheet("A", rk_body(0, 0, 1))
            .sheet("B", rk_body(0, 0, 2))
            .finish();
        let mut workbook = open_workbook(&stream, OpenOptions::new().with_eager_load(false)).unwrap();
        assert!(!workbook.sheet_loaded(1));
        assert_eq!(workbook.sheet_by_name("B").unwrap().cell_value(0, 0), &CellValue::Number(2.0));
        assert!(workbook.sheet_loaded(1));
        assert!(!workbook.sheet_loaded(0));
        workbook.unload_sheet(1);
        assert!(!workbook.sheet_loaded(1));
        assert_eq!(workbook.sheets().count(), 2);
        assert!(matches!(workbook.sheet_by_name("C"), Err(XlsError::WorksheetNotFound(_))));
        assert!(matches!(workbook.sheet_by_index(2), Err(XlsError::WorksheetNotFound(_))));
    }

    #[test]
    fn test_book_stream_and_missing_stream() {
        let stream = Biff8Workbook::new().sheet("Old", rk_body(0, 0, 1)).finish();
        let bytes = CompoundBuilder::new().stream("Book", stream).build().bytes;
        assert_eq!(open_workbook(&bytes, OpenOptions::default()).unwrap().nsheets(), 1);

        let bytes = CompoundBuilder::new().stream("Other", vec![0; 64]).build().bytes;
        assert!(matches!(
            open_workbook(&bytes, OpenOptions::default()),
            Err(XlsError::WorkbookStreamNotFound)
        ));
        assert!(matches!(
            open_workbook(b"PK\x03\x04 not a workbook", OpenOptions::default()),
            Err(XlsError::Cfb(OleError::NotOleFile))
        ));
    }

    #[test]
    fn test_biff2_lazy_request_loads_eagerly() {
        let sink = CaptureSink::default();
        let stream = RecordWriter::new()
            .record(BOF_B2, &[0x00, 0x00, 0x10, 0x00])
            .record(INTEGER, &[0, 0, 0, 0, 0, 0, 0, 7, 0])
            .record(EOF, &[])
            .finish();
        let options = OpenOptions::new()
            .with_eager_load(false)
            .with_diagnostic_sink(Box::new(sink.clone()));
        let workbook = open_workbook(&stream, options).unwrap();
        assert!(workbook.sheet_loaded(0));
        assert!(sink.text().contains("loading eagerly"));
        assert_eq!(workbook.sheet_by_index(0).unwrap().cell_value(0, 0), &CellValue::Number(7.0));
    }

    #[test]
    fn test_workbook_decompile_formula_uses_sheet_names() {
        let mut externsheet = 1u16.to_le_bytes().to_vec();
        externsheet.extend_from_slice(&[0, 0, 1, 0, 1, 0]);
        let stream = Biff8Workbook::new()
            .trailer(SUPBOOK, &[0x02, 0x00, 0x01, 0x04])
            .trailer(EXTERNSHEET, &externsheet)
            .sheet("First", RecordWriter::new())
            .sheet("Q1 2024", RecordWriter::new())
            .finish();
        let workbook = open_workbook(&stream, OpenOptions::default()).unwrap();
        let tokens = [0x3A, 0, 0, 0, 0, 0, 0];
        let text = workbook
            .decompile_formula(&tokens, FormulaKind::CELL, AddressingStyle::A1, None)
            .unwrap();
        assert_eq!(text, "'Q1 2024'!$A$1");
    }

    #[test]
    fn test_open_path_owns_data() {
        let stream = Biff8Workbook::new().sheet("Disk", rk_body(2, 1, 5)).finish();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&in_container(stream)).unwrap();
        file.flush().unwrap();

        let workbook = open_workbook_path(file.path(), OpenOptions::default()).unwrap();
        drop(file);
        assert_eq!(workbook.sheet_by_index(0).unwrap().cell_value(2, 1), &CellValue::Number(5.0));
    }

    #[test]
    fn test_workbook_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Workbook<'static>>();
    }
}
