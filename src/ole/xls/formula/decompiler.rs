//! Postfix token stream to formula text

use super::functions::{function_def, EXTERNAL_FUNCTION};
use super::render::{range_name_rel, RelativeCell};
use super::tables::{attr_name, token_name, token_not_allowed, token_size, TokenSize};
use super::{FormulaError, FormulaKind, FormulaResult, ReferenceTables};
use crate::common::binary::{read_f64_le, read_i16_le, read_u16_le};
use crate::ole::xls::names::{DefinedName, NameScope};
use crate::ole::xls::options::AddressingStyle;
use crate::ole::xls::records::BiffVersion;
use crate::ole::xls::strings::{unpack_string_update_pos, unpack_unicode_update_pos};
use crate::ole::xls::utils::error_text;
use crate::ole::xls::xref::{quote_sheet_name, ExternalRefs, SheetRange};
use smallvec::SmallVec;
use std::cell::Cell;
use std::fmt;

const LEAF_RANK: u8 = 90;
const FUNC_RANK: u8 = 90;
const REF_OP_RANK: u8 = 80;
const LIST_SEPARATOR: char = ',';

/// Deepest chain of names referring to names
const MAX_NAME_DEPTH: usize = 10;
/// Name expansions allowed while decompiling one formula
const MAX_NAME_EXPANSIONS: usize = 4096;

/// What an operand evaluates to, as far as the token stream tells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    Unknown,
    String,
    Number,
    Boolean,
    Error,
    Missing,
    /// Absolute reference
    Ref,
    /// Reference with a relative part
    Rel,
}

/// One entry of the decompiler stack
#[derive(Debug, Clone, PartialEq)]
pub struct Operand {
    pub kind: OperandKind,
    /// Binding strength: operands below an operator's rank are parenthesized
    pub rank: u8,
    pub text: String,
}

impl Operand {
    fn leaf(kind: OperandKind, text: impl Into<String>) -> Self {
        Operand {
            kind,
            rank: LEAF_RANK,
            text: text.into(),
        }
    }

    fn unknown() -> Self {
        Operand::leaf(OperandKind::Unknown, "?")
    }
}

/// Decompile a token stream into formula text.
///
/// `tokens` holds exactly the declared formula length. `base_cell` is the
/// (row, column) the formula belongs to; without it relative references
/// render in R1C1 notation whatever `style` asks for. Unknown tokens
/// degrade to `?`; only token payloads overrunning the formula and runaway
/// name recursion are errors.
pub fn decompile_formula(
    tokens: &[u8],
    kind: FormulaKind,
    version: BiffVersion,
    style: AddressingStyle,
    base_cell: Option<(u32, u32)>,
    tables: &ReferenceTables<'_>,
) -> FormulaResult<String> {
    let expansions = Cell::new(0);
    let decompiler = Decompiler {
        tables,
        version,
        kind,
        r1c1: style == AddressingStyle::R1C1,
        base: base_cell,
        level: 0,
        expansions: &expansions,
    };
    decompiler.run(tokens).map(|operand| operand.text)
}

#[derive(Clone, Copy)]
struct Decompiler<'a, 't> {
    tables: &'a ReferenceTables<'t>,
    version: BiffVersion,
    kind: FormulaKind,
    r1c1: bool,
    base: Option<(u32, u32)>,
    level: usize,
    expansions: &'a Cell<usize>,
}

fn u16_at(payload: &[u8], at: usize) -> u16 {
    read_u16_le(payload, at).unwrap_or(0)
}

fn i16_at(payload: &[u8], at: usize) -> i16 {
    read_i16_le(payload, at).unwrap_or(0)
}

/// Format a number the way Excel shows a literal: no trailing ".0"
fn number_text(value: f64) -> String {
    let mut buffer = ryu::Buffer::new();
    let text = buffer.format(value);
    text.strip_suffix(".0").unwrap_or(text).to_string()
}

fn push_wrapped(text: &mut String, operand: &Operand, rank: u8) {
    if operand.rank < rank {
        text.push('(');
        text.push_str(&operand.text);
        text.push(')');
    } else {
        text.push_str(&operand.text);
    }
}

fn binary_operator(opcode: u8) -> Option<(&'static str, u8, OperandKind)> {
    let rule = match opcode {
        0x03 => ("+", 30, OperandKind::Number),
        0x04 => ("-", 30, OperandKind::Number),
        0x05 => ("*", 40, OperandKind::Number),
        0x06 => ("/", 40, OperandKind::Number),
        0x07 => ("^", 50, OperandKind::Number),
        0x08 => ("&", 20, OperandKind::String),
        0x09 => ("<", 10, OperandKind::Boolean),
        0x0A => ("<=", 10, OperandKind::Boolean),
        0x0B => ("=", 10, OperandKind::Boolean),
        0x0C => (">=", 10, OperandKind::Boolean),
        0x0D => (">", 10, OperandKind::Boolean),
        0x0E => ("<>", 10, OperandKind::Boolean),
        _ => return None,
    };
    Some(rule)
}

fn unary_operator(opcode: u8) -> Option<(&'static str, &'static str, u8)> {
    match opcode {
        0x12 => Some(("+", "", 70)),
        0x13 => Some(("-", "", 70)),
        0x14 => Some(("", "%", 60)),
        _ => None,
    }
}

impl Decompiler<'_, '_> {
    fn warn(&self, message: fmt::Arguments<'_>) {
        match self.tables.diagnostics {
            Some(diagnostics) => diagnostics.warn(message),
            None => log::warn!("{}", message),
        }
    }

    fn debug(&self, message: fmt::Arguments<'_>) {
        match self.tables.diagnostics {
            Some(diagnostics) => diagnostics.debug(message),
            None => log::debug!("{}", message),
        }
    }

    fn is_biff8(&self) -> bool {
        self.version >= BiffVersion::Biff8
    }

    fn run(&self, data: &[u8]) -> FormulaResult<Operand> {
        if data.is_empty() {
            return Ok(Operand::unknown());
        }

        let mut stack: Vec<Operand> = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            let op = data[pos];
            let opcode = op & 0x1F;
            let optype = (op & 0x60) >> 5;
            let opx = if optype == 0 { opcode as usize } else { opcode as usize + 32 };

            let mut literal = None;
            let size = match token_size(self.version, opx) {
                TokenSize::Fixed(size) => size,
                TokenSize::Variable if opx == 0x17 => {
                    let (text, end) = self.read_string(data, pos + 1);
                    literal = Some(text);
                    end - pos
                },
                TokenSize::Variable if opx == 0x19 => self.attr_size(data, pos),
                _ => {
                    self.warn(format_args!(
                        "Unexpected token 0x{:02x} (t{}); biff_version={}",
                        op,
                        token_name(opx),
                        self.version
                    ));
                    stack.push(Operand::unknown());
                    break;
                },
            };
            if pos + size > data.len() {
                return Err(FormulaError::LengthOverflow {
                    token: op,
                    offset: pos,
                    size,
                    length: data.len(),
                });
            }
            let payload = &data[pos + 1..pos + size];

            if optype == 0 {
                self.apply_operator(opcode, payload, literal, &mut stack);
            } else {
                self.apply_operand(opcode, payload, &mut stack)?;
            }

            if token_not_allowed(opx).intersects(self.kind) {
                self.warn(format_args!(
                    "Unexpected token 0x{:02x} (t{}) found in formula type {}",
                    op,
                    token_name(opx),
                    self.kind.description()
                ));
                match stack.last_mut() {
                    Some(top) => *top = Operand::unknown(),
                    None => stack.push(Operand::unknown()),
                }
            }
            pos += size;
        }

        match stack.len() {
            1 => Ok(stack.remove(0)),
            0 => {
                self.warn(format_args!("Formula left an empty stack"));
                Ok(Operand::unknown())
            },
            n => {
                self.warn(format_args!("Formula stack has {} unprocessed operands", n - 1));
                Ok(stack.pop().unwrap_or_else(Operand::unknown))
            },
        }
    }

    fn read_string(&self, data: &[u8], pos: usize) -> (String, usize) {
        if self.is_biff8() {
            unpack_unicode_update_pos(data, pos, 1, None)
        } else {
            unpack_string_update_pos(data, pos, &self.tables.encoding, 1, None)
        }
    }

    fn attr_size(&self, data: &[u8], pos: usize) -> usize {
        let subop = data.get(pos + 1).copied().unwrap_or(0);
        if subop == 0x04 {
            // Choose carries a jump table of count + 1 offsets
            u16_at(data, pos + 2) as usize * 2 + 6
        } else {
            4
        }
    }

    fn pop_pair(&self, stack: &mut Vec<Operand>, what: &str) -> Option<(Operand, Operand)> {
        if stack.len() < 2 {
            self.warn(format_args!("Operator {} needs two operands, stack has {}", what, stack.len()));
            stack.clear();
            stack.push(Operand::unknown());
            return None;
        }
        let right = stack.pop()?;
        let left = stack.pop()?;
        Some((left, right))
    }

    fn apply_operator(&self, opcode: u8, payload: &[u8], literal: Option<String>, stack: &mut Vec<Operand>) {
        if let Some((symbol, rank, kind)) = binary_operator(opcode) {
            let Some((left, right)) = self.pop_pair(stack, symbol) else {
                return;
            };
            let mut text = String::with_capacity(left.text.len() + right.text.len() + 4);
            push_wrapped(&mut text, &left, rank);
            text.push_str(symbol);
            push_wrapped(&mut text, &right, rank);
            stack.push(Operand { kind, rank, text });
            return;
        }

        if let Some((prefix, suffix, rank)) = unary_operator(opcode) {
            let Some(operand) = stack.pop() else {
                self.warn(format_args!("Unary operator on an empty stack"));
                stack.push(Operand::unknown());
                return;
            };
            let mut text = String::from(prefix);
            push_wrapped(&mut text, &operand, rank);
            text.push_str(suffix);
            stack.push(Operand {
                kind: OperandKind::Number,
                rank,
                text,
            });
            return;
        }

        match opcode {
            // tExp, tTbl
            0x01 | 0x02 => {
                let row = u16_at(payload, 0);
                let col = if self.version >= BiffVersion::Biff3 {
                    u16_at(payload, 2)
                } else {
                    payload.get(2).copied().unwrap_or(0) as u16
                };
                let what = if opcode == 0x01 { "SHARED FMLA" } else { "TABLE" };
                stack.push(Operand::leaf(
                    OperandKind::Unknown,
                    format!("{} at rowx={} colx={}", what, row, col),
                ));
            },
            // tIsect, tList, tRange
            0x0F..=0x11 => {
                let symbol = match opcode {
                    0x0F => " ",
                    0x10 => ",",
                    _ => ":",
                };
                let Some((left, right)) = self.pop_pair(stack, symbol) else {
                    return;
                };
                let kind = reference_operator_kind(opcode, left.kind, right.kind);
                let mut text = String::new();
                push_wrapped(&mut text, &left, REF_OP_RANK);
                text.push_str(symbol);
                push_wrapped(&mut text, &right, REF_OP_RANK);
                stack.push(Operand {
                    kind,
                    rank: REF_OP_RANK,
                    text,
                });
            },
            // tParen
            0x15 => {
                if let Some(top) = stack.last_mut() {
                    top.text = format!("({})", top.text);
                    top.rank = LEAF_RANK;
                }
            },
            // tMissArg
            0x16 => stack.push(Operand::leaf(OperandKind::Missing, "")),
            // tStr
            0x17 => {
                let value = literal.unwrap_or_default();
                stack.push(Operand::leaf(
                    OperandKind::String,
                    format!("\"{}\"", value.replace('"', "\"\"")),
                ));
            },
            // tAttr
            0x19 => {
                let subop = payload.first().copied().unwrap_or(0);
                if subop == 0x10 {
                    if let Some(top) = stack.pop() {
                        stack.push(Operand {
                            kind: OperandKind::Number,
                            rank: FUNC_RANK,
                            text: format!("SUM({})", top.text),
                        });
                    }
                } else {
                    self.debug(format_args!("tAttr{} skipped", attr_name(subop)));
                }
            },
            // tSheet, tEndSheet
            0x1A | 0x1B => self.debug(format_args!("tSheet/tEndSheet skipped")),
            // tErr
            0x1C => {
                let code = payload.first().copied().unwrap_or(0);
                let text = error_text(code).map_or_else(|| format!("#ERR{}", code), str::to_string);
                stack.push(Operand::leaf(OperandKind::Error, text));
            },
            // tBool
            0x1D => {
                let text = if payload.first().copied().unwrap_or(0) != 0 { "TRUE" } else { "FALSE" };
                stack.push(Operand::leaf(OperandKind::Boolean, text));
            },
            // tInt
            0x1E => {
                let mut buffer = itoa::Buffer::new();
                let text = buffer.format(u16_at(payload, 0)).to_string();
                stack.push(Operand::leaf(OperandKind::Number, text));
            },
            // tNum
            0x1F => {
                let value = read_f64_le(payload, 0).unwrap_or(0.0);
                stack.push(Operand::leaf(OperandKind::Number, number_text(value)));
            },
            _ => {
                self.warn(format_args!("Unhandled opcode 0x{:02x}", opcode));
                stack.push(Operand::unknown());
            },
        }
    }

    fn apply_operand(&self, opcode: u8, payload: &[u8], stack: &mut Vec<Operand>) -> FormulaResult<()> {
        match opcode {
            // tArray: the constants follow the token stream
            0x00 => stack.push(Operand::unknown()),
            // tFunc
            0x01 => {
                let index = if self.version >= BiffVersion::Biff4 {
                    u16_at(payload, 0)
                } else {
                    payload.first().copied().unwrap_or(0) as u16
                };
                match function_def(index) {
                    Some(def) => self.push_call(def.name, def.min_args as usize, stack),
                    None => {
                        self.warn(format_args!("formula/tFunc unknown FuncID:{}", index));
                        stack.push(Operand::unknown());
                    },
                }
            },
            // tFuncVar
            0x02 => {
                let nargs = (payload.first().copied().unwrap_or(0) & 0x7F) as usize;
                let index = if self.version >= BiffVersion::Biff4 {
                    u16_at(payload, 1) & 0x7FFF
                } else {
                    payload.get(1).copied().unwrap_or(0) as u16
                };
                if index == EXTERNAL_FUNCTION {
                    self.push_external_call(nargs, stack);
                    return Ok(());
                }
                match function_def(index) {
                    Some(def) => {
                        if nargs < def.min_args as usize || nargs > def.max_args as usize {
                            self.warn(format_args!(
                                "{} called with {} arguments, expected {}..={}",
                                def.name, nargs, def.min_args, def.max_args
                            ));
                        }
                        self.push_call(def.name, nargs, stack);
                    },
                    None => {
                        self.warn(format_args!("formula/tFuncVar unknown FuncID:{}", index));
                        let keep = stack.len().saturating_sub(nargs);
                        stack.truncate(keep);
                        stack.push(Operand::unknown());
                    },
                }
            },
            // tName
            0x03 => {
                let index = (u16_at(payload, 0) as usize).wrapping_sub(1);
                let operand = self.name_operand(index)?;
                stack.push(operand);
            },
            // tRef, tRefN
            0x04 | 0x0C => {
                let cell = self.cell_address(payload, 0, opcode == 0x0C);
                stack.push(self.reference(None, &cell, &cell));
            },
            // tArea, tAreaN
            0x05 | 0x0D => {
                let (first, last) = self.range_address(payload, 0, opcode == 0x0D);
                stack.push(self.reference(None, &first, &last));
            },
            // tMemArea, tMemErr, tMemNoMem, tMemFunc, tMemAreaN, tMemNoMemN:
            // the subexpression that follows produces the operand
            0x06..=0x09 | 0x0E | 0x0F => {},
            // tRefErr, tAreaErr, tRefErr3d, tAreaErr3d
            0x0A | 0x0B | 0x1C | 0x1D => stack.push(Operand::leaf(OperandKind::Error, "#REF!")),
            // tNameX
            0x19 => {
                let operand = self.external_name_operand(payload)?;
                stack.push(operand);
            },
            // tRef3d
            0x1A => {
                let (range, at) = self.sheet_range(payload);
                let cell = self.cell_address(payload, at, false);
                stack.push(self.reference(Some(range), &cell, &cell));
            },
            // tArea3d
            0x1B => {
                let (range, at) = self.sheet_range(payload);
                let (first, last) = self.range_address(payload, at, false);
                stack.push(self.reference(Some(range), &first, &last));
            },
            _ => {
                self.warn(format_args!(
                    "Token t{} is not handled",
                    token_name(opcode as usize + 32)
                ));
                stack.push(Operand::unknown());
            },
        }
        Ok(())
    }

    fn push_call(&self, name: &str, nargs: usize, stack: &mut Vec<Operand>) {
        if stack.len() < nargs {
            self.warn(format_args!(
                "{} needs {} arguments, stack has {}",
                name,
                nargs,
                stack.len()
            ));
            stack.clear();
            stack.push(Operand::unknown());
            return;
        }
        let args: SmallVec<[Operand; 8]> = stack.drain(stack.len() - nargs..).collect();
        stack.push(Operand {
            kind: OperandKind::Unknown,
            rank: FUNC_RANK,
            text: call_text(name, &args),
        });
    }

    /// Add-in and macro calls pass the callee as the first argument
    fn push_external_call(&self, nargs: usize, stack: &mut Vec<Operand>) {
        if nargs == 0 || stack.len() < nargs {
            self.warn(format_args!("External function call with {} arguments", nargs));
            let keep = stack.len().saturating_sub(nargs);
            stack.truncate(keep);
            stack.push(Operand::unknown());
            return;
        }
        let args: SmallVec<[Operand; 8]> = stack.drain(stack.len() - nargs..).collect();
        stack.push(Operand {
            kind: OperandKind::Unknown,
            rank: FUNC_RANK,
            text: call_text(&args[0].text, &args[1..]),
        });
    }

    fn cell_address(&self, payload: &[u8], at: usize, offsets: bool) -> RelativeCell {
        let offsets = offsets || self.kind.uses_relative_offsets();
        if self.is_biff8() {
            adjust_biff8(u16_at(payload, at), u16_at(payload, at + 2), offsets, self.base)
        } else {
            let col = payload.get(at + 2).copied().unwrap_or(0) as u16;
            adjust_biff7(u16_at(payload, at), col, offsets, self.base)
        }
    }

    fn range_address(&self, payload: &[u8], at: usize, offsets: bool) -> (RelativeCell, RelativeCell) {
        let offsets = offsets || self.kind.uses_relative_offsets();
        let row1 = u16_at(payload, at);
        let row2 = u16_at(payload, at + 2);
        if self.is_biff8() {
            let col1 = u16_at(payload, at + 4);
            let col2 = u16_at(payload, at + 6);
            (
                adjust_biff8(row1, col1, offsets, self.base),
                adjust_biff8(row2, col2, offsets, self.base),
            )
        } else {
            let col1 = payload.get(at + 4).copied().unwrap_or(0) as u16;
            let col2 = payload.get(at + 5).copied().unwrap_or(0) as u16;
            (
                adjust_biff7(row1, col1, offsets, self.base),
                adjust_biff7(row2, col2, offsets, self.base),
            )
        }
    }

    /// Sheet range of a 3-D token and the payload offset of its cell address
    fn sheet_range(&self, payload: &[u8]) -> (SheetRange, usize) {
        if self.is_biff8() {
            let refx = u16_at(payload, 0) as usize;
            let range = match self.tables.external {
                Some(external) => external.local_range_biff8(refx, self.tables.all_sheets_map),
                None => SheetRange::Invalid(-101),
            };
            (range, 2)
        } else {
            let range = ExternalRefs::local_range_b57(
                i16_at(payload, 0),
                i16_at(payload, 10),
                i16_at(payload, 12),
                self.tables.all_sheets_map,
            );
            (range, 14)
        }
    }

    fn reference(&self, sheets: Option<SheetRange>, first: &RelativeCell, last: &RelativeCell) -> Operand {
        let relative = first.is_relative() || last.is_relative();
        let cells = range_name_rel(first, last, self.base, self.r1c1);
        let text = match sheets {
            Some(range) => format!("{}!{}", range.describe(self.tables.sheet_names), cells),
            None => cells,
        };
        let kind = if relative { OperandKind::Rel } else { OperandKind::Ref };
        Operand::leaf(kind, text)
    }

    fn name_operand(&self, index: usize) -> FormulaResult<Operand> {
        let Some(target) = self.tables.names.get(index) else {
            self.warn(format_args!("Formula refers to undefined name #{}", index.wrapping_add(1)));
            return Ok(Operand::unknown());
        };
        let kind = if target.is_opaque() {
            OperandKind::Unknown
        } else {
            self.expand_name(target)?.kind
        };
        let text = match target.scope {
            NameScope::Sheet(sheet) => match self.tables.sheet_names.get(sheet) {
                Some(sheet_name) => format!("{}!{}", quote_sheet_name(sheet_name), target.name),
                None => target.name.clone(),
            },
            _ => target.name.clone(),
        };
        Ok(Operand::leaf(kind, text))
    }

    /// Decompile a referenced name's own formula one level deeper
    fn expand_name(&self, target: &DefinedName) -> FormulaResult<Operand> {
        let expansions = self.expansions.get() + 1;
        self.expansions.set(expansions);
        if self.level >= MAX_NAME_DEPTH || expansions > MAX_NAME_EXPANSIONS {
            return Err(FormulaError::RecursionLimit(target.name.clone()));
        }
        let inner = Decompiler {
            kind: FormulaKind::NAME,
            base: None,
            level: self.level + 1,
            ..*self
        };
        match inner.run(target.formula_tokens()) {
            Ok(operand) => Ok(operand),
            Err(err @ FormulaError::RecursionLimit(_)) => Err(err),
            Err(err) => {
                self.debug(format_args!("name {:?}: {}", target.name, err));
                Ok(Operand::unknown())
            },
        }
    }

    fn external_name_operand(&self, payload: &[u8]) -> FormulaResult<Operand> {
        let (origin, target, resolves_locally) = if self.is_biff8() {
            let refx = u16_at(payload, 0) as usize;
            let target = (u16_at(payload, 2) as usize).wrapping_sub(1);
            let range = match self.tables.external {
                Some(external) => external.local_range_biff8(refx, self.tables.all_sheets_map),
                None => SheetRange::Invalid(-101),
            };
            if range == SheetRange::AddIn {
                let name = self
                    .tables
                    .external
                    .and_then(|external| external.addin_function_name(target));
                return Ok(match name {
                    Some(name) => Operand::leaf(OperandKind::Unknown, name),
                    None => Operand::unknown(),
                });
            }
            (refx as i64, target, range.code() >= -1)
        } else {
            let refx = i16_at(payload, 0);
            let target = (u16_at(payload, 10) as usize).wrapping_sub(1);
            let resolves_locally = match refx {
                0 => {
                    self.debug(format_args!("tNameX with a zero EXTERNSHEET index"));
                    return Ok(Operand::unknown());
                },
                r if r > 0 => false,
                r => {
                    let slot = (-(r as i32) - 1) as usize;
                    let types = self.tables.external.map(|e| e.extern_sheet_types()).unwrap_or(&[]);
                    types.get(slot) == Some(&4)
                },
            };
            (refx as i64, target, resolves_locally)
        };
        if target == usize::MAX {
            return Ok(Operand::unknown());
        }
        if !resolves_locally {
            return Ok(Operand::leaf(
                OperandKind::Unknown,
                format!("<<Name #{} in external(?) file #{}>>", target, origin),
            ));
        }
        self.name_operand(target)
    }
}

fn call_text(name: &str, args: &[Operand]) -> String {
    let mut text = String::from(name);
    text.push('(');
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            text.push(LIST_SEPARATOR);
        }
        text.push_str(&arg.text);
    }
    text.push(')');
    text
}

fn reference_operator_kind(opcode: u8, left: OperandKind, right: OperandKind) -> OperandKind {
    use OperandKind::{Error, Ref, Rel};
    if left == Error || right == Error {
        return Error;
    }
    match opcode {
        0x0F if left == Rel && right == Rel => Rel,
        0x10 if matches!(left, Ref | Rel) && matches!(right, Ref | Rel) && (left == Rel || right == Rel) => Rel,
        _ => Ref,
    }
}

/// BIFF8: row word, column word with relative flags in bits 15 and 14
fn adjust_biff8(row: u16, col_word: u16, offsets: bool, base: Option<(u32, u32)>) -> RelativeCell {
    let row_relative = col_word & 0x8000 != 0;
    let col_relative = col_word & 0x4000 != 0;
    let mut row = row as i32;
    let mut col = (col_word & 0xFF) as i32;
    if offsets {
        if row_relative && row >= 32768 {
            row -= 65536;
        }
        if col_relative && col >= 128 {
            col -= 256;
        }
    } else if let Some((base_row, base_col)) = base {
        if row_relative {
            row -= base_row as i32;
        }
        if col_relative {
            col -= base_col as i32;
        }
    }
    RelativeCell {
        row,
        col,
        row_relative,
        col_relative,
    }
}

/// BIFF2-7: relative flags and a 14-bit row share the row word
fn adjust_biff7(row_word: u16, col: u16, offsets: bool, base: Option<(u32, u32)>) -> RelativeCell {
    let row_relative = row_word & 0x8000 != 0;
    let col_relative = row_word & 0x4000 != 0;
    let mut row = (row_word & 0x3FFF) as i32;
    let mut col = col as i32;
    if offsets {
        if row_relative && row >= 8192 {
            row -= 16384;
        }
        if col_relative && col >= 128 {
            col -= 256;
        }
    } else if let Some((base_row, base_col)) = base {
        if row_relative {
            row -= base_row as i32;
        }
        if col_relative {
            col -= base_col as i32;
        }
    }
    RelativeCell {
        row,
        col,
        row_relative,
        col_relative,
    }
}
