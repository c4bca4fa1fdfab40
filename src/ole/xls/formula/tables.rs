//! Token tables: payload sizes per BIFF era, token names and the formula
//! kinds each token may not appear in.

use super::FormulaKind;
use crate::ole::xls::records::BiffVersion;

/// Width of a token including its opcode byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TokenSize {
    Fixed(usize),
    /// Computed from the payload (tStr, tAttr)
    Variable,
    /// Not defined in this era
    Unknown,
}

const V: i8 = -1;
const U: i8 = -2;

// Indexed by effective opcode: base code for 0x00..0x1F, base + 32 for
// classed tokens. tArray (index 32) is the opcode plus 7 reserved bytes in
// every era; its constants are stored after the token stream.
#[rustfmt::skip]
const SIZES_BIFF2: [i8; 64] = [
    U, 4, 4, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, V, U, V, 8, 4, 2, 2, 3, 9,
    8, 2, 3, 8, 4, 7, 5, 5, 5, 2, 4, 7, 4, 7, 2, 2,
    U, U, U, U, U, U, U, U, 3, U, U, U, U, U, U, U,
];

#[rustfmt::skip]
const SIZES_BIFF3: [i8; 64] = [
    U, 5, 5, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, V, U, V, 11, 5, 2, 2, 3, 9,
    8, 2, 3, 11, 4, 7, 7, 7, 7, 3, 4, 7, 4, 7, 3, 3,
    U, U, U, U, U, U, U, U, 3, U, U, U, U, U, U, U,
];

#[rustfmt::skip]
const SIZES_BIFF4: [i8; 64] = [
    U, 5, 5, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, V, U, V, 11, 5, 2, 2, 3, 9,
    8, 3, 4, 11, 4, 7, 7, 7, 7, 3, 4, 7, 4, 7, 3, 3,
    U, U, U, U, U, U, U, U, U, U, U, U, U, U, U, U,
];

#[rustfmt::skip]
const SIZES_BIFF5: [i8; 64] = [
    U, 5, 5, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, V, U, V, U, U, 2, 2, 3, 9,
    8, 3, 4, 15, 4, 7, 7, 7, 7, 3, 4, 7, 4, 7, 3, 3,
    U, U, U, U, U, U, U, U, U, 25, 18, 21, 18, 21, U, U,
];

#[rustfmt::skip]
const SIZES_BIFF8: [i8; 64] = [
    U, 5, 5, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, V, V, V, U, U, 2, 2, 3, 9,
    8, 3, 4, 5, 5, 9, 7, 7, 7, 3, 5, 9, 5, 9, 3, 3,
    U, U, U, U, U, U, U, U, U, 7, 7, 11, 7, 11, U, U,
];

#[rustfmt::skip]
const TOKEN_NAMES: [&str; 64] = [
    "Unk00", "Exp", "Tbl", "Add", "Sub", "Mul", "Div", "Power",
    "Concat", "LT", "LE", "EQ", "GE", "GT", "NE", "Isect",
    "List", "Range", "Uplus", "Uminus", "Percent", "Paren", "MissArg", "Str",
    "Extended", "Attr", "Sheet", "EndSheet", "Err", "Bool", "Int", "Num",
    "Array", "Func", "FuncVar", "Name", "Ref", "Area", "MemArea", "MemErr",
    "MemNoMem", "MemFunc", "RefErr", "AreaErr", "RefN", "AreaN", "MemAreaN", "MemNoMemN",
    "", "", "", "", "", "", "", "",
    "FuncCE", "NameX", "Ref3d", "Area3d", "RefErr3d", "AreaErr3d", "", "",
];

pub(super) fn token_size(version: BiffVersion, opx: usize) -> TokenSize {
    let table = match version {
        BiffVersion::Biff2 | BiffVersion::Biff21 => &SIZES_BIFF2,
        BiffVersion::Biff3 => &SIZES_BIFF3,
        BiffVersion::Biff4 | BiffVersion::Biff4W => &SIZES_BIFF4,
        BiffVersion::Biff5 | BiffVersion::Biff7 => &SIZES_BIFF5,
        BiffVersion::Biff8 => &SIZES_BIFF8,
    };
    match table.get(opx).copied().unwrap_or(U) {
        V => TokenSize::Variable,
        U => TokenSize::Unknown,
        n => TokenSize::Fixed(n as usize),
    }
}

pub(super) fn token_name(opx: usize) -> &'static str {
    TOKEN_NAMES.get(opx).copied().unwrap_or("")
}

/// Formula kinds in which a token is not allowed
pub(super) fn token_not_allowed(opx: usize) -> FormulaKind {
    let not_3d = FormulaKind::SHARED | FormulaKind::COND_FMT | FormulaKind::DATA_VAL;
    match opx {
        // tExp, tTbl
        0x01 | 0x02 => FormulaKind::all() - FormulaKind::CELL,
        // tIsect, tList, tRange, tArray
        0x0F | 0x10 | 0x11 | 0x20 => not_3d,
        // tName
        0x23 => FormulaKind::SHARED,
        // tNameX, tRef3d, tArea3d
        0x39 | 0x3A | 0x3B => not_3d,
        // tRefN, tAreaN
        0x2C | 0x2D => FormulaKind::CELL | FormulaKind::ARRAY,
        _ => FormulaKind::empty(),
    }
}

pub(super) fn attr_name(subop: u8) -> &'static str {
    match subop {
        0x00 => "Skip??",
        0x01 => "Volatile",
        0x02 => "If",
        0x04 => "Choose",
        0x08 => "Skip",
        0x10 => "Sum",
        0x20 => "Assign",
        0x40 => "Space",
        0x41 => "SpaceVolatile",
        _ => "??Unknown??",
    }
}
