//! BIFF record parsing for XLS files
//!
//! A workbook stream is a flat sequence of records, each a 2-byte type, a
//! 2-byte payload length and the payload. [`RecordStream`] walks that
//! sequence over an in-memory stream without copying; version detection
//! from the BOF record lives here too.

use crate::common::binary::{read_u16_le, slice_clamped};
use crate::common::diagnostics::Diagnostics;
use crate::ole::xls::error::{XlsError, XlsResult};
use std::fmt;

// Workbook-level records
pub const BOF: u16 = 0x0809;
pub const BOF_B4: u16 = 0x0409;
pub const BOF_B3: u16 = 0x0209;
pub const BOF_B2: u16 = 0x0009;
pub const EOF: u16 = 0x000A;
pub const CONTINUE: u16 = 0x003C;
pub const SST: u16 = 0x00FC;
pub const EXTSST: u16 = 0x00FF;
pub const BOUNDSHEET: u16 = 0x0085;
pub const SHEETHDR: u16 = 0x008F;
pub const SHEETSOFFSET: u16 = 0x008E;
pub const CODEPAGE: u16 = 0x0042;
pub const COUNTRY: u16 = 0x008C;
pub const DATEMODE: u16 = 0x0022;
pub const FILEPASS: u16 = 0x002F;
pub const WRITEACCESS: u16 = 0x005C;
pub const BUILTINFMTCOUNT: u16 = 0x0056;
pub const FONT: u16 = 0x0031;
pub const FONT_B3B4: u16 = 0x0231;
pub const EFONT: u16 = 0x0045;
pub const FORMAT: u16 = 0x041E;
pub const FORMAT2: u16 = 0x001E;
pub const XF: u16 = 0x00E0;
pub const XF2: u16 = 0x0043;
pub const XF3: u16 = 0x0243;
pub const XF4: u16 = 0x0443;
pub const NAME: u16 = 0x0018;
pub const SUPBOOK: u16 = 0x01AE;
pub const EXTERNNAME: u16 = 0x0023;
pub const EXTERNSHEET: u16 = 0x0017;
pub const INTERFACEHDR: u16 = 0x00E1;

// Cell records
pub const NUMBER: u16 = 0x0203;
pub const NUMBER_B2: u16 = 0x0003;
pub const INTEGER: u16 = 0x0002;
pub const RK: u16 = 0x027E;
pub const MULRK: u16 = 0x00BD;
pub const LABEL: u16 = 0x0204;
pub const LABEL_B2: u16 = 0x0004;
pub const RSTRING: u16 = 0x00D6;
pub const LABELSST: u16 = 0x00FD;
pub const BOOLERR: u16 = 0x0205;
pub const BOOLERR_B2: u16 = 0x0005;
pub const BLANK: u16 = 0x0201;
pub const BLANK_B2: u16 = 0x0001;
pub const MULBLANK: u16 = 0x00BE;
pub const FORMULA: u16 = 0x0006;
pub const FORMULA3: u16 = 0x0206;
pub const FORMULA4: u16 = 0x0406;
pub const STRING: u16 = 0x0207;
pub const STRING_B2: u16 = 0x0007;
pub const SHRFMLA: u16 = 0x04BC;
pub const ARRAY: u16 = 0x0221;
pub const TABLEOP: u16 = 0x0236;
pub const TABLEOP2: u16 = 0x0037;
pub const TABLEOP_B2: u16 = 0x0036;
pub const IXFE: u16 = 0x0044;

// Sheet layout records
pub const DIMENSION: u16 = 0x0200;
pub const DIMENSION2: u16 = 0x0000;
pub const ROW: u16 = 0x0208;
pub const ROW_B2: u16 = 0x0008;
pub const COLINFO: u16 = 0x007D;
pub const DEFCOLWIDTH: u16 = 0x0055;
pub const STANDARDWIDTH: u16 = 0x0099;
pub const MERGEDCELLS: u16 = 0x00E5;

// BOF stream types
pub const STREAM_WORKBOOK_GLOBALS: u16 = 0x0005;
pub const STREAM_WORKBOOK_GLOBALS_4W: u16 = 0x0100;
pub const STREAM_WORKSHEET: u16 = 0x0010;

/// Record codes that start a substream
pub const BOF_CODES: [u16; 4] = [BOF, BOF_B4, BOF_B3, BOF_B2];

/// Display names for the records this crate understands
static RECORD_NAMES: phf::Map<u16, &'static str> = phf::phf_map! {
    0x0809u16 => "BOF",
    0x0409u16 => "BOF (BIFF4)",
    0x0209u16 => "BOF (BIFF3)",
    0x0009u16 => "BOF (BIFF2)",
    0x000Au16 => "EOF",
    0x003Cu16 => "CONTINUE",
    0x00FCu16 => "SST",
    0x00FFu16 => "EXTSST",
    0x0085u16 => "BOUNDSHEET",
    0x008Fu16 => "SHEETHDR",
    0x008Eu16 => "SHEETSOFFSET",
    0x0042u16 => "CODEPAGE",
    0x008Cu16 => "COUNTRY",
    0x0022u16 => "DATEMODE",
    0x002Fu16 => "FILEPASS",
    0x005Cu16 => "WRITEACCESS",
    0x0056u16 => "BUILTINFMTCOUNT",
    0x0031u16 => "FONT",
    0x0231u16 => "FONT (BIFF3-4)",
    0x0045u16 => "EFONT",
    0x041Eu16 => "FORMAT",
    0x001Eu16 => "FORMAT (BIFF2-3)",
    0x00E0u16 => "XF",
    0x0043u16 => "XF (BIFF2)",
    0x0243u16 => "XF (BIFF3)",
    0x0443u16 => "XF (BIFF4)",
    0x0018u16 => "NAME",
    0x01AEu16 => "SUPBOOK",
    0x0023u16 => "EXTERNNAME",
    0x0017u16 => "EXTERNSHEET",
    0x0203u16 => "NUMBER",
    0x0003u16 => "NUMBER (BIFF2)",
    0x0002u16 => "INTEGER",
    0x027Eu16 => "RK",
    0x00BDu16 => "MULRK",
    0x0204u16 => "LABEL",
    0x0004u16 => "LABEL (BIFF2)",
    0x00D6u16 => "RSTRING",
    0x00FDu16 => "LABELSST",
    0x0205u16 => "BOOLERR",
    0x0005u16 => "BOOLERR (BIFF2)",
    0x0201u16 => "BLANK",
    0x0001u16 => "BLANK (BIFF2)",
    0x00BEu16 => "MULBLANK",
    0x0006u16 => "FORMULA",
    0x0206u16 => "FORMULA (BIFF3)",
    0x0406u16 => "FORMULA (BIFF4)",
    0x0207u16 => "STRING",
    0x0007u16 => "STRING (BIFF2)",
    0x04BCu16 => "SHRFMLA",
    0x0221u16 => "ARRAY",
    0x0236u16 => "TABLEOP",
    0x0044u16 => "IXFE",
    0x0200u16 => "DIMENSION",
    0x0000u16 => "DIMENSION (BIFF2)",
    0x0208u16 => "ROW",
    0x0008u16 => "ROW (BIFF2)",
    0x007Du16 => "COLINFO",
    0x0055u16 => "DEFCOLWIDTH",
    0x0099u16 => "STANDARDWIDTH",
    0x00E5u16 => "MERGEDCELLS",
};

/// Name of a record code, for diagnostics
pub fn record_name(code: u16) -> &'static str {
    RECORD_NAMES.get(&code).copied().unwrap_or("UNKNOWN")
}

/// A BIFF record borrowed from its stream
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub code: u16,
    /// Declared payload length
    pub length: u16,
    pub payload: &'a [u8],
    /// Stream offset of the record header
    pub offset: usize,
}

/// Iterator over BIFF records in a stream
///
/// Stops (and sets [`RecordStream::truncated`]) when a header or payload
/// would run past the end of the data.
#[derive(Debug, Clone)]
pub struct RecordStream<'a> {
    data: &'a [u8],
    pos: usize,
    truncated: bool,
}

impl<'a> RecordStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0)
    }

    /// Start reading at `pos`
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        RecordStream {
            data,
            pos,
            truncated: false,
        }
    }

    /// Offset of the next record header
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Seek to a specific position in the stream
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Whether iteration stopped on a partial record
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Type of the next record without consuming it
    pub fn peek_code(&self) -> Option<u16> {
        if self.pos + 4 > self.data.len() {
            return None;
        }
        read_u16_le(self.data, self.pos).ok()
    }

    /// Consume the next record if it is a CONTINUE and return its payload
    pub fn expect_continue(&mut self) -> Option<&'a [u8]> {
        if self.peek_code() == Some(CONTINUE) {
            self.next().map(|record| record.payload)
        } else {
            None
        }
    }

    /// Consume every CONTINUE record that follows
    pub fn continuations(&mut self) -> Vec<&'a [u8]> {
        let mut fragments = Vec::new();
        while let Some(payload) = self.expect_continue() {
            fragments.push(payload);
        }
        fragments
    }
}

impl<'a> Iterator for RecordStream<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let header_end = self.pos.checked_add(4)?;
        if header_end > self.data.len() {
            if self.pos < self.data.len() {
                self.truncated = true;
            }
            return None;
        }

        let code = read_u16_le(self.data, self.pos).ok()?;
        let length = read_u16_le(self.data, self.pos + 2).ok()?;
        let end = header_end + length as usize;
        if end > self.data.len() {
            self.truncated = true;
            return None;
        }

        let record = Record {
            code,
            length,
            payload: &self.data[header_end..end],
            offset: self.pos,
        };
        self.pos = end;
        Some(record)
    }
}

/// BIFF versions supported
///
/// Ordered, so `version >= BiffVersion::Biff5` reads naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BiffVersion {
    Biff2 = 20,
    Biff21 = 21,
    Biff3 = 30,
    Biff4 = 40,
    /// BIFF4 workbook with several sheets (4.0W)
    Biff4W = 45,
    Biff5 = 50,
    Biff7 = 70,
    Biff8 = 80,
}

impl BiffVersion {
    /// Version from its number, e.g. 80 for BIFF 8.0
    pub fn from_number(number: u16) -> Option<Self> {
        match number {
            20 => Some(BiffVersion::Biff2),
            21 => Some(BiffVersion::Biff21),
            30 => Some(BiffVersion::Biff3),
            40 => Some(BiffVersion::Biff4),
            45 => Some(BiffVersion::Biff4W),
            50 => Some(BiffVersion::Biff5),
            70 => Some(BiffVersion::Biff7),
            80 => Some(BiffVersion::Biff8),
            _ => None,
        }
    }

    pub fn number(self) -> u16 {
        self as u16
    }

    pub fn supports_unicode(self) -> bool {
        self == BiffVersion::Biff8
    }

    /// BIFF2 cells use 3-byte attribute blocks instead of an XF index
    pub fn is_biff2(self) -> bool {
        self <= BiffVersion::Biff21
    }
}

impl fmt::Display for BiffVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let number = self.number();
        write!(f, "{}.{}", number / 10, number % 10)
    }
}

/// BOF (Beginning of File) record
#[derive(Debug, Clone)]
pub struct BofRecord {
    pub code: u16,
    pub version: BiffVersion,
    /// Substream type (0x0005 globals, 0x0010 worksheet, ...)
    pub stream_type: u16,
    /// Build identifier (BIFF5+ only)
    pub build: u16,
    /// Build year (BIFF5+ only)
    pub year: u16,
}

impl BofRecord {
    /// Parse a BOF record and resolve the BIFF version it announces.
    pub fn parse(record: &Record<'_>, diagnostics: &Diagnostics) -> XlsResult<Self> {
        let expected_len = match record.code {
            BOF => 8,
            BOF_B4 | BOF_B3 => 6,
            BOF_B2 => 4,
            found => {
                return Err(XlsError::InvalidRecord {
                    record_type: found,
                    message: "Expected BOF record".to_string(),
                });
            },
        };

        let length = record.payload.len();
        if !(4..=20).contains(&length) {
            return Err(XlsError::InvalidRecord {
                record_type: record.code,
                message: format!("Invalid length ({}) for BOF record", length),
            });
        }

        let mut padded = [0u8; 20];
        padded[..length].copy_from_slice(record.payload);
        if length < expected_len {
            diagnostics.debug(format_args!(
                "BOF record 0x{:04X} has {} bytes, expected {}; padding",
                record.code, length, expected_len
            ));
        }
        let data = slice_clamped(&padded, 0, length.max(expected_len));

        let version_word = read_u16_le(data, 0)?;
        let stream_type = read_u16_le(data, 2)?;
        let (mut number, build, year) = if record.code == BOF {
            let build = read_u16_le(data, 4)?;
            let year = read_u16_le(data, 6)?;
            let number = match version_word {
                0x0600 => 80,
                0x0500 if year < 1994 || matches!(build, 2412 | 3218 | 3321) => 50,
                0x0500 => 70,
                0x0000 | 0x0007 | 0x0200 => 21,
                0x0300 => 30,
                0x0400 => 40,
                _ => 0,
            };
            (number, build, year)
        } else {
            let number = match record.code {
                BOF_B4 => 40,
                BOF_B3 => 30,
                _ => 20,
            };
            (number, 0, 0)
        };

        if number == 40 && stream_type == STREAM_WORKBOOK_GLOBALS_4W {
            number = 45;
        }

        diagnostics.debug(format_args!(
            "BOF: op=0x{:04X} vers=0x{:04X} stream=0x{:04X} build={} year={} -> BIFF{}",
            record.code, version_word, stream_type, build, year, number
        ));

        let version =
            BiffVersion::from_number(number).ok_or(XlsError::UnsupportedBiffVersion(number))?;

        Ok(BofRecord {
            code: record.code,
            version,
            stream_type,
            build,
            year,
        })
    }

    /// Whether this BOF opens the workbook globals
    pub fn is_globals(&self) -> bool {
        self.stream_type == STREAM_WORKBOOK_GLOBALS
            || (self.version == BiffVersion::Biff4W
                && self.stream_type == STREAM_WORKBOOK_GLOBALS_4W)
    }

    /// Check that the BOF opens something this crate can read.
    ///
    /// BIFF2-4 files hold a single worksheet and may start with a worksheet
    /// BOF instead of a globals one.
    pub fn check_workbook(&self) -> XlsResult<()> {
        if self.is_globals() {
            return Ok(());
        }
        if self.version < BiffVersion::Biff5 && self.stream_type == STREAM_WORKSHEET {
            return Ok(());
        }
        if self.version >= BiffVersion::Biff5 && self.stream_type == STREAM_WORKBOOK_GLOBALS_4W {
            return Err(XlsError::WorkspaceFile);
        }
        Err(XlsError::InvalidRecord {
            record_type: self.code,
            message: format!(
                "BOF not workbook/worksheet: stream type 0x{:04X}, BIFF {}",
                self.stream_type, self.version
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::biff::{RecordWriter, bof_payload};

    fn first(data: &[u8]) -> Record<'_> {
        RecordStream::new(data).next().unwrap()
    }

    #[test]
    fn test_iterates_records_and_advances() {
        let data = RecordWriter::new()
            .record(0x0042, &[0xE4, 0x04])
            .record(EOF, &[])
            .finish();
        let mut stream = RecordStream::new(&data);

        let codepage = stream.next().unwrap();
        assert_eq!(codepage.code, CODEPAGE);
        assert_eq!(codepage.payload, &[0xE4, 0x04]);
        assert_eq!(codepage.offset, 0);
        assert_eq!(stream.position(), 6);

        let eof = stream.next().unwrap();
        assert_eq!((eof.code, eof.length, eof.offset), (EOF, 0, 6));
        assert!(stream.next().is_none());
        assert!(!stream.truncated());
    }

    #[test]
    fn test_overrunning_payload_stops_iteration() {
        let mut data = RecordWriter::new().record(NUMBER, &[0u8; 14]).finish();
        // Declare 100 bytes of payload with only 14 present
        data[2] = 100;
        let mut stream = RecordStream::new(&data);
        assert!(stream.next().is_none());
        assert!(stream.truncated());
    }

    #[test]
    fn test_partial_header_is_truncation() {
        let data = [0x09, 0x08, 0x10];
        let mut stream = RecordStream::new(&data);
        assert!(stream.next().is_none());
        assert!(stream.truncated());
    }

    #[test]
    fn test_continuations() {
        let data = RecordWriter::new()
            .record(SST, &[1, 2])
            .record(CONTINUE, &[3])
            .record(CONTINUE, &[4, 5])
            .record(EOF, &[])
            .finish();
        let mut stream = RecordStream::new(&data);
        stream.next();
        assert_eq!(stream.continuations(), vec![&[3u8][..], &[4u8, 5][..]]);
        assert_eq!(stream.peek_code(), Some(EOF));
    }

    #[test]
    fn test_bof_biff8() {
        let data = RecordWriter::new()
            .record(BOF, &bof_payload(0x0600, STREAM_WORKBOOK_GLOBALS))
            .finish();
        let bof = BofRecord::parse(&first(&data), &Diagnostics::new()).unwrap();
        assert_eq!(bof.version, BiffVersion::Biff8);
        assert!(bof.is_globals());
        assert!(bof.check_workbook().is_ok());
    }

    #[test]
    fn test_bof_biff5_vs_biff7() {
        let mut payload = bof_payload(0x0500, STREAM_WORKBOOK_GLOBALS);
        payload[4..6].copy_from_slice(&3218u16.to_le_bytes());
        payload[6..8].copy_from_slice(&1995u16.to_le_bytes());
        let data = RecordWriter::new().record(BOF, &payload).finish();
        let bof = BofRecord::parse(&first(&data), &Diagnostics::new()).unwrap();
        assert_eq!(bof.version, BiffVersion::Biff5);

        payload[4..6].copy_from_slice(&4000u16.to_le_bytes());
        let data = RecordWriter::new().record(BOF, &payload).finish();
        let bof = BofRecord::parse(&first(&data), &Diagnostics::new()).unwrap();
        assert_eq!(bof.version, BiffVersion::Biff7);
    }

    #[test]
    fn test_bof_older_codes() {
        let cases = [
            (BOF_B2, BiffVersion::Biff2),
            (BOF_B3, BiffVersion::Biff3),
            (BOF_B4, BiffVersion::Biff4),
        ];
        for (code, expected) in cases {
            let data = RecordWriter::new()
                .record(code, &[0x00, 0x00, 0x10, 0x00])
                .finish();
            let bof = BofRecord::parse(&first(&data), &Diagnostics::new()).unwrap();
            assert_eq!(bof.version, expected);
            assert!(bof.check_workbook().is_ok());
        }
    }

    #[test]
    fn test_bof_biff4_workbook() {
        let data = RecordWriter::new()
            .record(BOF_B4, &[0x00, 0x00, 0x00, 0x01, 0x00, 0x00])
            .finish();
        let bof = BofRecord::parse(&first(&data), &Diagnostics::new()).unwrap();
        assert_eq!(bof.version, BiffVersion::Biff4W);
        assert!(bof.is_globals());
    }

    #[test]
    fn test_bof_unknown_version_is_unsupported() {
        let data = RecordWriter::new()
            .record(BOF, &bof_payload(0x0700, STREAM_WORKBOOK_GLOBALS))
            .finish();
        assert!(matches!(
            BofRecord::parse(&first(&data), &Diagnostics::new()),
            Err(XlsError::UnsupportedBiffVersion(0))
        ));
    }

    #[test]
    fn test_bof_workspace_file() {
        let data = RecordWriter::new()
            .record(BOF, &bof_payload(0x0600, STREAM_WORKBOOK_GLOBALS_4W))
            .finish();
        let bof = BofRecord::parse(&first(&data), &Diagnostics::new()).unwrap();
        assert!(matches!(bof.check_workbook(), Err(XlsError::WorkspaceFile)));
    }

    #[test]
    fn test_bof_bad_length() {
        let data = RecordWriter::new().record(BOF, &[0x00, 0x06]).finish();
        assert!(matches!(
            BofRecord::parse(&first(&data), &Diagnostics::new()),
            Err(XlsError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn test_version_display_and_order() {
        assert_eq!(BiffVersion::Biff4W.to_string(), "4.5");
        assert!(BiffVersion::Biff21 < BiffVersion::Biff3);
        assert!(BiffVersion::Biff21.is_biff2());
        assert!(!BiffVersion::Biff3.is_biff2());
        assert_eq!(record_name(LABELSST), "LABELSST");
        assert_eq!(record_name(0x1234), "UNKNOWN");
    }
}
