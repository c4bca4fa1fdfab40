//! Codepage decoding utilities for OLE file formats
//!
//! BIFF workbooks name their byte encoding through a CODEPAGE record; the
//! values are Windows codepage identifiers plus two Excel-specific ids.
//! Conversion to UTF-8 goes through `encoding_rs`.

use encoding_rs::Encoding;
use std::fmt;

/// Resolve the value of a BIFF CODEPAGE record.
///
/// Returns `None` for codepages `encoding_rs` does not implement (the DOS
/// codepages other than 866, for instance).
pub fn biff_codepage_encoding(codepage: u16) -> Option<&'static Encoding> {
    let encoding = match codepage {
        // US-ASCII, read as its superset
        367 => encoding_rs::WINDOWS_1252,
        866 => encoding_rs::IBM866,
        874 => encoding_rs::WINDOWS_874,
        932 => encoding_rs::SHIFT_JIS,
        936 => encoding_rs::GBK,
        949 => encoding_rs::EUC_KR,
        950 => encoding_rs::BIG5,
        1200 => encoding_rs::UTF_16LE,
        1201 => encoding_rs::UTF_16BE,
        1250 => encoding_rs::WINDOWS_1250,
        1251 => encoding_rs::WINDOWS_1251,
        1252 => encoding_rs::WINDOWS_1252,
        1253 => encoding_rs::WINDOWS_1253,
        1254 => encoding_rs::WINDOWS_1254,
        1255 => encoding_rs::WINDOWS_1255,
        1256 => encoding_rs::WINDOWS_1256,
        1257 => encoding_rs::WINDOWS_1257,
        1258 => encoding_rs::WINDOWS_1258,
        10000 => encoding_rs::MACINTOSH,
        10007 => encoding_rs::X_MAC_CYRILLIC,
        20866 => encoding_rs::KOI8_R,
        20932 => encoding_rs::EUC_JP,
        21866 => encoding_rs::KOI8_U,
        28592 => encoding_rs::ISO_8859_2,
        28593 => encoding_rs::ISO_8859_3,
        28594 => encoding_rs::ISO_8859_4,
        28595 => encoding_rs::ISO_8859_5,
        28596 => encoding_rs::ISO_8859_6,
        28597 => encoding_rs::ISO_8859_7,
        28598 => encoding_rs::ISO_8859_8,
        28605 => encoding_rs::ISO_8859_15,
        // Excel's own ids for Macintosh Roman and Windows-1252
        32768 => encoding_rs::MACINTOSH,
        32769 => encoding_rs::WINDOWS_1252,
        54936 => encoding_rs::GB18030,
        65001 => encoding_rs::UTF_8,
        _ => return None,
    };
    Some(encoding)
}

/// Resolve a caller-supplied encoding name.
///
/// Accepts any WHATWG label known to `encoding_rs` ("utf-16le", "latin1",
/// "shift_jis", ...) as well as `cp<N>` codepage spellings.
pub fn encoding_from_label(label: &str) -> Option<&'static Encoding> {
    let trimmed = label.trim();
    let lower = trimmed.to_ascii_lowercase();
    if let Some(number) = lower.strip_prefix("cp")
        && let Ok(codepage) = number.parse::<u16>()
    {
        return biff_codepage_encoding(codepage);
    }
    Encoding::for_label(trimmed.as_bytes())
}

/// Text encoding in effect for a workbook's byte strings.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum XlsEncoding {
    /// ISO-8859-1: each byte is the code point of the same value
    Latin1,
    /// UTF-16 little endian (BIFF8 compressed strings are still Latin-1)
    Utf16Le,
    /// An `encoding_rs` encoding selected by a CODEPAGE record or override
    Codepage {
        codepage: Option<u16>,
        encoding: &'static Encoding,
    },
}

impl XlsEncoding {
    /// Encoding named by a CODEPAGE record value.
    ///
    /// Returns `None` for unknown codepages so the caller can warn and fall
    /// back.
    pub fn from_codepage(codepage: u16) -> Option<Self> {
        if codepage == 1200 {
            return Some(XlsEncoding::Utf16Le);
        }
        biff_codepage_encoding(codepage).map(|encoding| XlsEncoding::Codepage {
            codepage: Some(codepage),
            encoding,
        })
    }

    /// Encoding named by a label; see [`encoding_from_label`].
    pub fn from_label(label: &str) -> Option<Self> {
        let encoding = encoding_from_label(label)?;
        if encoding == encoding_rs::UTF_16LE {
            return Some(XlsEncoding::Utf16Le);
        }
        Some(XlsEncoding::Codepage {
            codepage: None,
            encoding,
        })
    }

    /// Decode 8-bit string bytes.
    ///
    /// In a UTF-16 workbook byte strings only occur in compressed form, which
    /// is Latin-1.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            XlsEncoding::Latin1 | XlsEncoding::Utf16Le => {
                encoding_rs::mem::decode_latin1(bytes).into_owned()
            },
            XlsEncoding::Codepage { encoding, .. } => {
                encoding.decode_without_bom_handling(bytes).0.into_owned()
            },
        }
    }

    /// Human readable name
    pub fn name(&self) -> &'static str {
        match self {
            XlsEncoding::Latin1 => "latin_1",
            XlsEncoding::Utf16Le => "utf_16_le",
            XlsEncoding::Codepage { encoding, .. } => encoding.name(),
        }
    }
}

impl fmt::Debug for XlsEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XlsEncoding::Codepage {
                codepage: Some(cp), ..
            } => write!(f, "{} (codepage {})", self.name(), cp),
            _ => f.write_str(self.name()),
        }
    }
}

/// Decode UTF-16 LE bytes to a String
///
/// Stops at the first U+0000 and replaces unpaired surrogates with U+FFFD.
/// A trailing odd byte is ignored.
///
/// # Examples
///
/// ```
/// use litchi_xls::ole::codepage::decode_utf16le;
///
/// let bytes = b"H\x00e\x00l\x00l\x00o\x00";
/// let text = decode_utf16le(bytes);
/// assert_eq!(text, "Hello");
/// ```
#[inline]
pub fn decode_utf16le(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }

    let utf16_units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .take_while(|&c| c != 0)
        .collect();

    String::from_utf16_lossy(&utf16_units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf16le() {
        let bytes = b"H\x00e\x00l\x00l\x00o\x00";
        assert_eq!(decode_utf16le(bytes), "Hello");
    }

    #[test]
    fn test_decode_utf16le_with_null() {
        let bytes = b"H\x00e\x00l\x00l\x00o\x00\x00\x00W\x00o\x00r\x00l\x00d\x00";
        assert_eq!(decode_utf16le(bytes), "Hello");
    }

    #[test]
    fn test_decode_utf16le_odd_length() {
        let bytes = b"H\x00e\x00l\x00l\x00o\x00\xFF";
        assert_eq!(decode_utf16le(bytes), "Hello");
    }

    #[test]
    fn test_biff_codepage_aliases() {
        assert_eq!(biff_codepage_encoding(32768), Some(encoding_rs::MACINTOSH));
        assert_eq!(biff_codepage_encoding(32769), Some(encoding_rs::WINDOWS_1252));
        assert_eq!(biff_codepage_encoding(367), Some(encoding_rs::WINDOWS_1252));
        assert_eq!(biff_codepage_encoding(1251), Some(encoding_rs::WINDOWS_1251));
        assert_eq!(biff_codepage_encoding(12345), None);
    }

    #[test]
    fn test_from_codepage_1200_is_utf16() {
        assert_eq!(XlsEncoding::from_codepage(1200), Some(XlsEncoding::Utf16Le));
        assert!(XlsEncoding::from_codepage(9999).is_none());
    }

    #[test]
    fn test_encoding_from_label() {
        assert_eq!(encoding_from_label("cp1251"), Some(encoding_rs::WINDOWS_1251));
        assert_eq!(encoding_from_label("CP1252"), Some(encoding_rs::WINDOWS_1252));
        assert_eq!(encoding_from_label("shift_jis"), Some(encoding_rs::SHIFT_JIS));
        assert_eq!(encoding_from_label("no-such-encoding"), None);
    }

    #[test]
    fn test_latin1_decodes_every_byte() {
        let text = XlsEncoding::Latin1.decode(&[0x41, 0xE9, 0xFF]);
        assert_eq!(text, "A\u{e9}\u{ff}");
    }

    #[test]
    fn test_codepage_decode() {
        let cyrillic = XlsEncoding::from_codepage(1251).unwrap();
        assert_eq!(cyrillic.decode(&[0xC0, 0xC1]), "\u{410}\u{411}");
        assert_eq!(format!("{:?}", cyrillic), "windows-1251 (codepage 1251)");
    }
}
