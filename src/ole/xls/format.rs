//! Fonts, number formats and extended formats (XF records).
//!
//! Only what is needed to classify cells is decoded: a cell's XF points at a
//! number format, and the format string decides whether the number is a
//! date. Colours, borders and alignment are not modelled.

use crate::common::binary::{read_u16_le, read_u8};
use crate::common::diagnostics::Diagnostics;
use crate::ole::codepage::XlsEncoding;
use crate::ole::xls::records::{BiffVersion, FORMAT2};
use crate::ole::xls::strings::{unpack_string, unpack_unicode};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

bitflags! {
    /// FONT option flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct FontFlags: u16 {
        const BOLD = 0x0001;
        const ITALIC = 0x0002;
        const UNDERLINED = 0x0004;
        const STRUCK_OUT = 0x0008;
        const OUTLINE = 0x0010;
        const SHADOW = 0x0020;
    }
}

bitflags! {
    /// Protection and type bits of an XF record
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct XfFlags: u8 {
        const LOCKED = 0x01;
        const FORMULA_HIDDEN = 0x02;
        /// A style XF rather than a cell XF
        const STYLE = 0x04;
    }
}

/// A FONT record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Font {
    pub index: usize,
    pub name: String,
    /// Height in twips (1/20 of a point)
    pub height: u16,
    pub flags: FontFlags,
    pub colour_index: u16,
    /// 400 normal, 700 bold
    pub weight: u16,
    pub escapement: u16,
    pub underline: u8,
    pub family: u8,
    pub character_set: u8,
}

impl Font {
    fn placeholder(index: usize) -> Self {
        Font {
            index,
            name: "Dummy Font".to_string(),
            height: 0,
            flags: FontFlags::empty(),
            colour_index: 0x7FFF,
            weight: 400,
            escapement: 0,
            underline: 0,
            family: 0,
            character_set: 0,
        }
    }

    /// Parse a FONT record in any BIFF era.
    pub fn parse(index: usize, data: &[u8], version: BiffVersion, encoding: &XlsEncoding) -> Self {
        let mut font = Font::placeholder(index);
        font.height = read_u16_le(data, 0).unwrap_or(0);
        let flags = read_u16_le(data, 2).unwrap_or(0);
        font.flags = FontFlags::from_bits_truncate(flags);

        if version >= BiffVersion::Biff5 {
            font.colour_index = read_u16_le(data, 4).unwrap_or(0x7FFF);
            font.weight = read_u16_le(data, 6).unwrap_or(400);
            font.escapement = read_u16_le(data, 8).unwrap_or(0);
            font.underline = read_u8(data, 10).unwrap_or(0);
            font.family = read_u8(data, 11).unwrap_or(0);
            font.character_set = read_u8(data, 12).unwrap_or(0);
            font.name = if version >= BiffVersion::Biff8 {
                unpack_unicode(data, 14, 1)
            } else {
                unpack_string(data, 14, encoding, 1)
            };
        } else if version >= BiffVersion::Biff3 {
            font.colour_index = read_u16_le(data, 4).unwrap_or(0x7FFF);
            font.weight = if font.flags.contains(FontFlags::BOLD) { 700 } else { 400 };
            font.name = unpack_string(data, 6, encoding, 1);
        } else {
            font.weight = if font.flags.contains(FontFlags::BOLD) { 700 } else { 400 };
            font.name = unpack_string(data, 4, encoding, 1);
        }
        font
    }
}

/// Classification of a number format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatKind {
    General,
    Number,
    Date,
    Text,
    Unknown,
}

/// A number format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Format {
    pub key: u16,
    pub kind: FormatKind,
    pub text: String,
}

/// Built-in number format strings by key
static BUILTIN_FORMATS: phf::Map<u16, &'static str> = phf::phf_map! {
    0x00u16 => "General",
    0x01u16 => "0",
    0x02u16 => "0.00",
    0x03u16 => "#,##0",
    0x04u16 => "#,##0.00",
    0x05u16 => "$#,##0_);($#,##0)",
    0x06u16 => "$#,##0_);[Red]($#,##0)",
    0x07u16 => "$#,##0.00_);($#,##0.00)",
    0x08u16 => "$#,##0.00_);[Red]($#,##0.00)",
    0x09u16 => "0%",
    0x0Au16 => "0.00%",
    0x0Bu16 => "0.00E+00",
    0x0Cu16 => "# ?/?",
    0x0Du16 => "# ??/??",
    0x0Eu16 => "m/d/yy",
    0x0Fu16 => "d-mmm-yy",
    0x10u16 => "d-mmm",
    0x11u16 => "mmm-yy",
    0x12u16 => "h:mm AM/PM",
    0x13u16 => "h:mm:ss AM/PM",
    0x14u16 => "h:mm",
    0x15u16 => "h:mm:ss",
    0x16u16 => "m/d/yy h:mm",
    0x25u16 => "#,##0_);(#,##0)",
    0x26u16 => "#,##0_);[Red](#,##0)",
    0x27u16 => "#,##0.00_);(#,##0.00)",
    0x28u16 => "#,##0.00_);[Red](#,##0.00)",
    0x29u16 => "_(* #,##0_);_(* (#,##0);_(* \"-\"_);_(@_)",
    0x2Au16 => "_($* #,##0_);_($* (#,##0);_($* \"-\"_);_(@_)",
    0x2Bu16 => "_(* #,##0.00_);_(* (#,##0.00);_(* \"-\"??_);_(@_)",
    0x2Cu16 => "_($* #,##0.00_);_($* (#,##0.00);_($* \"-\"??_);_(@_)",
    0x2Du16 => "mm:ss",
    0x2Eu16 => "[h]:mm:ss",
    0x2Fu16 => "mm:ss.0",
    0x30u16 => "##0.0E+0",
    0x31u16 => "@",
};

/// Built-in format string for `key`
pub fn builtin_format(key: u16) -> Option<&'static str> {
    BUILTIN_FORMATS.get(&key).copied()
}

/// Kind of a built-in format key, including locale-specific date keys that
/// have no fixed string
pub fn builtin_format_kind(key: u16) -> Option<FormatKind> {
    match key {
        0 => Some(FormatKind::General),
        1..=13 | 37..=44 | 48 | 59..=62 | 67..=70 => Some(FormatKind::Number),
        14..=22 | 27..=36 | 45..=47 | 50..=58 | 71..=81 => Some(FormatKind::Date),
        49 => Some(FormatKind::Text),
        _ => None,
    }
}

const NON_DATE_FORMATS: [&str; 6] = ["0.00E+00", "##0.0E+0", "General", "GENERAL", "general", "@"];

/// Decide whether a format string displays a date or time.
///
/// Quoted text, escaped characters and `[...]` sections are ignored; the
/// remaining date letters (`ymdhs`) are weighed against digit placeholders
/// (`0#?`).
pub fn is_date_format_string(format: &str) -> bool {
    #[derive(PartialEq)]
    enum State {
        Plain,
        Quoted,
        Escaped,
    }

    let mut state = State::Plain;
    let mut plain = String::with_capacity(format.len());
    for c in format.chars() {
        match state {
            State::Plain => match c {
                '"' => state = State::Quoted,
                '\\' | '_' | '*' => state = State::Escaped,
                '$' | '-' | '+' | '/' | '(' | ')' | ':' | ' ' => {},
                _ => plain.push(c),
            },
            State::Quoted => {
                if c == '"' {
                    state = State::Plain;
                }
            },
            State::Escaped => state = State::Plain,
        }
    }

    let mut stripped = String::with_capacity(plain.len());
    let mut in_brackets = false;
    for c in plain.chars() {
        match (in_brackets, c) {
            (false, '[') => in_brackets = true,
            (true, ']') => in_brackets = false,
            (false, _) => stripped.push(c),
            (true, _) => {},
        }
    }
    // An unclosed '[' is not a bracketed section
    if in_brackets && let Some(at) = plain.rfind('[') {
        stripped.push_str(&plain[at..]);
    }

    if NON_DATE_FORMATS.contains(&stripped.as_str()) {
        return false;
    }

    let mut date_count = 0u32;
    let mut num_count = 0u32;
    for c in stripped.chars() {
        match c {
            'y' | 'm' | 'd' | 'h' | 's' | 'Y' | 'M' | 'D' | 'H' | 'S' => date_count += 5,
            '0' | '#' | '?' => num_count += 5,
            _ => {},
        }
    }
    date_count > num_count
}

/// An extended format (XF record)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedFormat {
    pub index: usize,
    pub font_index: u16,
    pub format_key: u16,
    pub flags: XfFlags,
    /// Parent style XF (cell XFs only)
    pub parent_style_index: u16,
}

impl ExtendedFormat {
    /// Parse an XF record; the layout differs in every era.
    pub fn parse(index: usize, data: &[u8], version: BiffVersion) -> Option<Self> {
        let (font_index, format_key, flags, parent) = if version >= BiffVersion::Biff5 {
            let packed = read_u16_le(data, 4).ok()?;
            (
                read_u16_le(data, 0).ok()?,
                read_u16_le(data, 2).ok()?,
                (packed & 0x07) as u8,
                (packed >> 4) & 0x0FFF,
            )
        } else if version >= BiffVersion::Biff4 {
            let packed = read_u16_le(data, 2).ok()?;
            (
                read_u8(data, 0).ok()? as u16,
                read_u8(data, 1).ok()? as u16,
                (packed & 0x07) as u8,
                (packed >> 4) & 0x0FFF,
            )
        } else if version >= BiffVersion::Biff3 {
            let protection = read_u8(data, 2).ok()?;
            let align_parent = read_u16_le(data, 4).ok()?;
            (
                read_u8(data, 0).ok()? as u16,
                read_u8(data, 1).ok()? as u16,
                protection & 0x07,
                (align_parent >> 4) & 0x0FFF,
            )
        } else {
            let format_etc = read_u8(data, 2).ok()?;
            let mut flags = 0u8;
            if format_etc & 0x40 != 0 {
                flags |= XfFlags::LOCKED.bits();
            }
            if format_etc & 0x80 != 0 {
                flags |= XfFlags::FORMULA_HIDDEN.bits();
            }
            (read_u8(data, 0).ok()? as u16, (format_etc & 0x3F) as u16, flags, 0)
        };

        Some(ExtendedFormat {
            index,
            font_index,
            format_key,
            flags: XfFlags::from_bits_truncate(flags),
            parent_style_index: parent,
        })
    }

    pub fn is_style(&self) -> bool {
        self.flags.contains(XfFlags::STYLE)
    }
}

/// Formatting tables collected from the workbook globals
#[derive(Debug, Clone, Default)]
pub struct FormattingTables {
    fonts: Vec<Font>,
    formats: BTreeMap<u16, Format>,
    xfs: Vec<ExtendedFormat>,
    /// FORMAT records seen, which is the key of BIFF2-4 formats
    actual_format_count: u16,
    builtins_loaded: bool,
}

impl FormattingTables {
    /// Handle a FONT record.
    ///
    /// Font index 4 is never written to the file; a placeholder keeps
    /// later indices aligned.
    pub fn add_font(&mut self, data: &[u8], version: BiffVersion, encoding: &XlsEncoding) {
        if self.fonts.len() == 4 {
            self.fonts.push(Font::placeholder(4));
        }
        let index = self.fonts.len();
        self.fonts.push(Font::parse(index, data, version, encoding));
    }

    /// EFONT carries the BIFF2 colour of the preceding font
    pub fn set_last_font_colour(&mut self, data: &[u8]) {
        if let (Some(font), Ok(colour)) = (self.fonts.last_mut(), read_u16_le(data, 0)) {
            font.colour_index = colour;
        }
    }

    /// Handle FORMAT (BIFF4+) and FORMAT2 (BIFF2-3) records.
    pub fn add_format(
        &mut self,
        code: u16,
        data: &[u8],
        version: BiffVersion,
        encoding: &XlsEncoding,
        diagnostics: &Diagnostics,
    ) {
        let version = if code == FORMAT2 {
            version.min(BiffVersion::Biff3)
        } else {
            version
        };

        let mut text_pos = 2;
        let key = if version >= BiffVersion::Biff5 {
            read_u16_le(data, 0).unwrap_or(0)
        } else {
            if version <= BiffVersion::Biff3 {
                text_pos = 0;
            }
            self.actual_format_count
        };
        self.actual_format_count = self.actual_format_count.saturating_add(1);

        let text = if version >= BiffVersion::Biff8 {
            unpack_unicode(data, 2, 2)
        } else {
            unpack_string(data, text_pos, encoding, 1)
        };

        let is_date = is_date_format_string(&text);
        if version >= BiffVersion::Biff5
            && (1..50).contains(&key)
            && let Some(builtin) = builtin_format_kind(key)
            && (builtin == FormatKind::Date) != is_date
        {
            diagnostics.debug(format_args!(
                "format {} {:?}: built-in kind {:?} disagrees with the format string",
                key, text, builtin
            ));
        }

        let kind = if is_date {
            FormatKind::Date
        } else {
            FormatKind::General
        };
        self.formats.insert(key, Format { key, kind, text });
    }

    /// Handle an XF record.
    ///
    /// From BIFF5 on, built-in formats are filled in before the first XF so
    /// that keys the file never redefines still resolve.
    pub fn add_xf(&mut self, data: &[u8], version: BiffVersion, diagnostics: &Diagnostics) {
        if version >= BiffVersion::Biff5 && !self.builtins_loaded {
            self.load_builtin_formats();
        }
        let index = self.xfs.len();
        match ExtendedFormat::parse(index, data, version) {
            Some(xf) => self.xfs.push(xf),
            None => diagnostics.warn(format_args!(
                "XF record {} is too short ({} bytes)",
                index,
                data.len()
            )),
        }
    }

    fn load_builtin_formats(&mut self) {
        self.builtins_loaded = true;
        for key in 0u16..=81 {
            let Some(kind) = builtin_format_kind(key) else {
                continue;
            };
            self.formats.entry(key).or_insert_with(|| Format {
                key,
                kind,
                text: builtin_format(key).unwrap_or_default().to_string(),
            });
        }
    }

    pub fn fonts(&self) -> &[Font] {
        &self.fonts
    }

    pub fn font(&self, index: usize) -> Option<&Font> {
        self.fonts.get(index)
    }

    pub fn format(&self, key: u16) -> Option<&Format> {
        self.formats.get(&key)
    }

    pub fn formats(&self) -> impl Iterator<Item = &Format> {
        self.formats.values()
    }

    pub fn xfs(&self) -> &[ExtendedFormat] {
        &self.xfs
    }

    pub fn xf(&self, index: usize) -> Option<&ExtendedFormat> {
        self.xfs.get(index)
    }

    /// Whether numbers formatted with XF `index` are dates
    pub fn xf_is_date(&self, index: usize) -> bool {
        let Some(xf) = self.xfs.get(index) else {
            return false;
        };
        match self.formats.get(&xf.format_key) {
            Some(format) => format.kind == FormatKind::Date,
            None => builtin_format_kind(xf.format_key) == Some(FormatKind::Date),
        }
    }
}
