//! BIFF string decoding.
//!
//! Two string families exist. Byte strings (BIFF2-7) carry a 1- or 2-byte
//! length and are decoded with the workbook encoding. BIFF8 "unicode"
//! strings add an options byte: bit 0 selects UTF-16LE over compressed
//! Latin-1, bit 2 announces a phonetic block and bit 3 rich-text runs, both
//! stored after the characters.
//!
//! All readers clamp to the available data: a string that overruns its
//! record yields the characters present.

use crate::common::binary::{read_i32_le, read_u16_le, slice_clamped};
use crate::common::diagnostics::Diagnostics;
use crate::ole::codepage::XlsEncoding;
use std::collections::BTreeMap;

const OPT_UTF16: u8 = 0x01;
const OPT_PHONETIC: u8 = 0x04;
const OPT_RICH_TEXT: u8 = 0x08;

#[inline]
fn read_len(data: &[u8], pos: usize, lenlen: usize) -> usize {
    if lenlen == 1 {
        data.get(pos).copied().unwrap_or(0) as usize
    } else {
        read_u16_le(data, pos).unwrap_or(0) as usize
    }
}

/// Decode UTF-16LE code units, replacing unpaired surrogates.
///
/// Unlike directory names, cell text may legitimately contain U+0000.
pub(crate) fn decode_utf16(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

#[inline]
pub(crate) fn decode_latin1(bytes: &[u8]) -> String {
    encoding_rs::mem::decode_latin1(bytes).into_owned()
}

/// Byte string with a `lenlen`-byte length at `pos`.
pub fn unpack_string(data: &[u8], pos: usize, encoding: &XlsEncoding, lenlen: usize) -> String {
    unpack_string_update_pos(data, pos, encoding, lenlen, None).0
}

/// Byte string at `pos`; returns the text and the position after it.
///
/// With `known_len` the length prefix is absent and that many bytes are read.
pub fn unpack_string_update_pos(
    data: &[u8],
    mut pos: usize,
    encoding: &XlsEncoding,
    lenlen: usize,
    known_len: Option<usize>,
) -> (String, usize) {
    let nchars = match known_len {
        Some(len) => len,
        None => {
            let len = read_len(data, pos, lenlen);
            pos += lenlen;
            len
        },
    };
    let end = pos + nchars;
    (encoding.decode(slice_clamped(data, pos, end)), end)
}

/// BIFF8 unicode string with a `lenlen`-byte char count at `pos`.
pub fn unpack_unicode(data: &[u8], pos: usize, lenlen: usize) -> String {
    if read_len(data, pos, lenlen) == 0 {
        return String::new();
    }
    unpack_unicode_update_pos(data, pos, lenlen, None).0
}

/// BIFF8 unicode string at `pos`; returns the text and the position after
/// the string including any rich-text and phonetic trailers.
pub fn unpack_unicode_update_pos(
    data: &[u8],
    mut pos: usize,
    lenlen: usize,
    known_len: Option<usize>,
) -> (String, usize) {
    let nchars = match known_len {
        Some(len) => len,
        None => {
            let len = read_len(data, pos, lenlen);
            pos += lenlen;
            len
        },
    };

    // A zero-length string may omit the options byte
    if nchars == 0 && pos >= data.len() {
        return (String::new(), pos);
    }

    let options = data.get(pos).copied().unwrap_or(0);
    pos += 1;

    let mut rich_runs = 0usize;
    let mut phonetic_size = 0usize;
    if options & OPT_RICH_TEXT != 0 {
        rich_runs = read_u16_le(data, pos).unwrap_or(0) as usize;
        pos += 2;
    }
    if options & OPT_PHONETIC != 0 {
        phonetic_size = read_i32_le(data, pos).unwrap_or(0).max(0) as usize;
        pos += 4;
    }

    let text = if options & OPT_UTF16 != 0 {
        let end = pos + 2 * nchars;
        let text = decode_utf16(slice_clamped(data, pos, end));
        pos = end;
        text
    } else {
        let end = pos + nchars;
        let text = decode_latin1(slice_clamped(data, pos, end));
        pos = end;
        text
    };

    pos += 4 * rich_runs + phonetic_size;
    (text, pos)
}

/// Shared string table (SST record plus its CONTINUE records)
#[derive(Debug, Clone, Default)]
pub struct SharedStringTable {
    strings: Vec<String>,
    /// Formatting runs `(char index, font index)` keyed by string index
    rich_text_runs: BTreeMap<usize, Vec<(u16, u16)>>,
}

impl SharedStringTable {
    /// Decode the table from the SST payload followed by its continuations.
    ///
    /// A string's characters may continue in the next fragment, where a fresh
    /// options byte can switch between compressed and UTF-16 form. Rich-text
    /// runs and phonetic blocks may also straddle fragments. Running out of
    /// data keeps the strings decoded so far and reports a warning.
    pub fn parse(fragments: &[&[u8]], diagnostics: &Diagnostics) -> Self {
        let mut table = SharedStringTable::default();
        let Some(&first) = fragments.first() else {
            return table;
        };
        let count = read_i32_le(first, 4).unwrap_or(0).max(0) as usize;
        let total_bytes: usize = fragments.iter().map(|f| f.len()).sum();
        // Every string needs at least three header bytes
        table.strings.reserve(count.min(total_bytes / 3));

        let mut index = 0usize;
        let mut data = first;
        let mut pos = 8usize;

        'strings: for n in 0..count {
            let (Ok(nchars), Some(&header_options)) = (read_u16_le(data, pos), data.get(pos + 2))
            else {
                diagnostics.warn(format_args!(
                    "SST: data exhausted after {} of {} strings",
                    n, count
                ));
                break;
            };
            let nchars = nchars as usize;
            let mut options = header_options;
            pos += 3;

            let mut rich_runs = 0usize;
            let mut phonetic_size = 0usize;
            if options & OPT_RICH_TEXT != 0 {
                rich_runs = read_u16_le(data, pos).unwrap_or(0) as usize;
                pos += 2;
            }
            if options & OPT_PHONETIC != 0 {
                phonetic_size = read_i32_le(data, pos).unwrap_or(0).max(0) as usize;
                pos += 4;
            }

            let mut text = String::with_capacity(nchars);
            let mut got = 0usize;
            loop {
                let need = nchars - got;
                let available = data.len().saturating_sub(pos);
                if options & OPT_UTF16 != 0 {
                    let take = (available >> 1).min(need);
                    text.push_str(&decode_utf16(slice_clamped(data, pos, pos + 2 * take)));
                    pos += 2 * take;
                    got += take;
                } else {
                    let take = available.min(need);
                    text.push_str(&decode_latin1(slice_clamped(data, pos, pos + take)));
                    pos += take;
                    got += take;
                }
                if got == nchars {
                    break;
                }

                index += 1;
                match fragments.get(index).copied().filter(|f| !f.is_empty()) {
                    Some(fragment) => {
                        data = fragment;
                        options = fragment[0];
                        pos = 1;
                    },
                    None => {
                        diagnostics.warn(format_args!(
                            "SST: string {} truncated ({} of {} chars)",
                            n, got, nchars
                        ));
                        table.strings.push(text);
                        break 'strings;
                    },
                }
            }

            if rich_runs > 0 {
                let mut runs = Vec::with_capacity(rich_runs.min(256));
                for _ in 0..rich_runs {
                    if pos >= data.len() {
                        index += 1;
                        match fragments.get(index).copied() {
                            Some(fragment) => {
                                data = fragment;
                                pos = 0;
                            },
                            None => break,
                        }
                    }
                    match (read_u16_le(data, pos), read_u16_le(data, pos + 2)) {
                        (Ok(char_index), Ok(font_index)) => runs.push((char_index, font_index)),
                        _ => break,
                    }
                    pos += 4;
                }
                table.rich_text_runs.insert(table.strings.len(), runs);
            }

            pos += phonetic_size;
            // The phonetic block may cover several whole fragments
            while pos >= data.len() {
                let Some(&next) = fragments.get(index + 1) else {
                    break;
                };
                pos -= data.len();
                index += 1;
                data = next;
            }

            table.strings.push(text);
        }

        diagnostics.debug(format_args!(
            "SST: {} strings decoded from {} fragments",
            table.strings.len(),
            fragments.len()
        ));
        table
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }

    /// Formatting runs of the string at `index`, if it has any
    pub fn rich_text_runs(&self, index: usize) -> Option<&[(u16, u16)]> {
        self.rich_text_runs.get(&index).map(Vec::as_slice)
    }
}
