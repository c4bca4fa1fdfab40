//! BIFF record writers used by tests.

use crate::ole::xls::records::{
    BOF, BOUNDSHEET, EOF, STREAM_WORKBOOK_GLOBALS, STREAM_WORKSHEET,
};

/// Appends `type, length, payload` records to a buffer
#[derive(Default)]
pub struct RecordWriter {
    buf: Vec<u8>,
}

impl RecordWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(mut self, code: u16, payload: &[u8]) -> Self {
        self.push(code, payload);
        self
    }

    pub fn push(&mut self, code: u16, payload: &[u8]) {
        self.buf.extend_from_slice(&code.to_le_bytes());
        self.buf
            .extend_from_slice(&(payload.len() as u16).to_le_bytes());
        self.buf.extend_from_slice(payload);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// 16-byte BIFF5+ BOF payload (build 3515, year 1996)
pub fn bof_payload(version: u16, stream_type: u16) -> Vec<u8> {
    let mut payload = Vec::with_capacity(16);
    payload.extend_from_slice(&version.to_le_bytes());
    payload.extend_from_slice(&stream_type.to_le_bytes());
    payload.extend_from_slice(&3515u16.to_le_bytes());
    payload.extend_from_slice(&1996u16.to_le_bytes());
    payload.extend_from_slice(&[0u8; 8]);
    payload
}

/// BIFF8 unicode string: `lenlen`-byte char count, options, chars.
///
/// Uses compressed (Latin-1) form when every char fits in a byte.
pub fn unicode_string(text: &str, lenlen: usize) -> Vec<u8> {
    let units: Vec<u16> = text.encode_utf16().collect();
    let mut out = Vec::new();
    if lenlen == 1 {
        out.push(units.len() as u8);
    } else {
        out.extend_from_slice(&(units.len() as u16).to_le_bytes());
    }
    if units.iter().all(|&u| u < 0x100) {
        out.push(0x00);
        out.extend(units.iter().map(|&u| u as u8));
    } else {
        out.push(0x01);
        out.extend(units.iter().flat_map(|u| u.to_le_bytes()));
    }
    out
}

/// 8-bit string with a `lenlen`-byte length prefix
pub fn byte_string(text: &[u8], lenlen: usize) -> Vec<u8> {
    let mut out = Vec::new();
    if lenlen == 1 {
        out.push(text.len() as u8);
    } else {
        out.extend_from_slice(&(text.len() as u16).to_le_bytes());
    }
    out.extend_from_slice(text);
    out
}

/// Cell header: row, column, XF index
pub fn cell_header(row: u16, col: u16, xf: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(6);
    out.extend_from_slice(&row.to_le_bytes());
    out.extend_from_slice(&col.to_le_bytes());
    out.extend_from_slice(&xf.to_le_bytes());
    out
}

/// NUMBER payload
pub fn number_payload(row: u16, col: u16, xf: u16, value: f64) -> Vec<u8> {
    let mut out = cell_header(row, col, xf);
    out.extend_from_slice(&value.to_le_bytes());
    out
}

/// Builds a BIFF8 workbook stream: globals followed by worksheet substreams.
///
/// BOUNDSHEET offsets are patched once the sheet positions are known.
pub struct Biff8Workbook {
    /// Globals records between BOF and the BOUNDSHEETs
    globals: RecordWriter,
    /// Records after the BOUNDSHEETs (SST, NAME, ...)
    trailer: RecordWriter,
    sheets: Vec<(String, u8, u8, Vec<u8>)>,
}

impl Biff8Workbook {
    pub fn new() -> Self {
        Biff8Workbook {
            globals: RecordWriter::new(),
            trailer: RecordWriter::new(),
            sheets: Vec::new(),
        }
    }

    /// Add a globals record emitted before the BOUNDSHEET block
    pub fn global(mut self, code: u16, payload: &[u8]) -> Self {
        self.globals.push(code, payload);
        self
    }

    /// Add a globals record emitted after the BOUNDSHEET block
    pub fn trailer(mut self, code: u16, payload: &[u8]) -> Self {
        self.trailer.push(code, payload);
        self
    }

    /// Add a worksheet; `body` holds the records between its BOF and EOF
    pub fn sheet(self, name: &str, body: RecordWriter) -> Self {
        self.sheet_with(name, 0, 0, body)
    }

    /// Add a sheet with explicit visibility and kind bytes
    pub fn sheet_with(mut self, name: &str, visibility: u8, kind: u8, body: RecordWriter) -> Self {
        self.sheets
            .push((name.to_string(), visibility, kind, body.finish()));
        self
    }

    pub fn finish(self) -> Vec<u8> {
        let mut globals = RecordWriter::new();
        globals.push(BOF, &bof_payload(0x0600, STREAM_WORKBOOK_GLOBALS));
        globals.buf.extend_from_slice(&self.globals.finish());

        let mut bound_offsets = Vec::new();
        for (name, visibility, kind, _) in &self.sheets {
            bound_offsets.push(globals.len() + 4);
            let mut payload = vec![0u8; 4];
            payload.push(*visibility);
            payload.push(*kind);
            payload.extend(unicode_string(name, 1));
            globals.push(BOUNDSHEET, &payload);
        }
        globals.buf.extend_from_slice(&self.trailer.finish());
        globals.push(EOF, &[]);

        let mut stream = globals.finish();
        for (index, (_, _, _, body)) in self.sheets.iter().enumerate() {
            let position = stream.len() as u32;
            let at = bound_offsets[index];
            stream[at..at + 4].copy_from_slice(&position.to_le_bytes());

            let mut sheet = RecordWriter::new();
            sheet.push(BOF, &bof_payload(0x0600, STREAM_WORKSHEET));
            sheet.buf.extend_from_slice(body);
            sheet.push(EOF, &[]);
            stream.extend(sheet.finish());
        }
        stream
    }
}
