/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use std::fmt;

use crate::token::SourceLocation;

/// The full register set. Only `A..J` and `SP` are generic operand
/// registers; `PC`, `EX`, `IA` are reached through dedicated operand
/// codes or special opcodes and are never indirectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    A,
    B,
    C,
    X,
    Y,
    Z,
    I,
    J,
    Sp,
    Pc,
    Ex,
    Ia,
}

impl Register {
    /// The eight general-purpose registers in their encoding order.
    pub const GENERAL: [Register; 8] = [
        Register::A,
        Register::B,
        Register::C,
        Register::X,
        Register::Y,
        Register::Z,
        Register::I,
        Register::J,
    ];

    pub fn general_index(self) -> Option<u8> {
        Self::GENERAL.iter().position(|&r| r == self).map(|i| i as u8)
    }

    pub fn is_indirectable(self) -> bool {
        matches!(self, Register::Sp) || self.general_index().is_some()
    }

    pub fn from_name(name: &str) -> Option<Register> {
        match name.to_ascii_uppercase().as_str() {
            "A" => Some(Register::A),
            "B" => Some(Register::B),
            "C" => Some(Register::C),
            "X" => Some(Register::X),
            "Y" => Some(Register::Y),
            "Z" => Some(Register::Z),
            "I" => Some(Register::I),
            "J" => Some(Register::J),
            "SP" => Some(Register::Sp),
            "PC" => Some(Register::Pc),
            "EX" => Some(Register::Ex),
            "IA" => Some(Register::Ia),
            _ => None,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Register::A => "A",
            Register::B => "B",
            Register::C => "C",
            Register::X => "X",
            Register::Y => "Y",
            Register::Z => "Z",
            Register::I => "I",
            Register::J => "J",
            Register::Sp => "SP",
            Register::Pc => "PC",
            Register::Ex => "EX",
            Register::Ia => "IA",
        };
        write!(f, "{}", s)
    }
}

/// Opcodes for basic (two-operand) and special (one-operand)
/// instructions, plus the `JMP`/`PUSH`/`POP` pseudo-mnemonics that the
/// statement parser expands into `SET` forms (see the REDESIGN note on
/// the `JMP`/`PUSH`/`POP` dispatch fallthrough bug in the prior art).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    // basic
    Set,
    Add,
    Sub,
    Mul,
    Mli,
    Div,
    Dvi,
    Mod,
    Mdi,
    And,
    Bor,
    Xor,
    Shr,
    Asr,
    Shl,
    Ifb,
    Ifc,
    Ife,
    Ifn,
    Ifg,
    Ifa,
    Ifl,
    Ifu,
    Adx,
    Sbx,
    Sti,
    Std,
    // special
    Jsr,
    Hcf,
    Int,
    Iag,
    Ias,
    Rfi,
    Iaq,
    Hwn,
    Hwq,
    Hwi,
    // pseudo-ops, expanded during encoding
    Jmp,
    Push,
    Pop,
}

impl Mnemonic {
    pub fn from_name(name: &str) -> Option<Mnemonic> {
        use Mnemonic::*;
        Some(match name.to_ascii_uppercase().as_str() {
            "SET" => Set,
            "ADD" => Add,
            "SUB" => Sub,
            "MUL" => Mul,
            "MLI" => Mli,
            "DIV" => Div,
            "DVI" => Dvi,
            "MOD" => Mod,
            "MDI" => Mdi,
            "AND" => And,
            "BOR" | "OR" => Bor,
            "XOR" => Xor,
            "SHR" => Shr,
            "ASR" => Asr,
            "SHL" => Shl,
            "IFB" => Ifb,
            "IFC" => Ifc,
            "IFE" => Ife,
            "IFN" => Ifn,
            "IFG" => Ifg,
            "IFA" => Ifa,
            "IFL" => Ifl,
            "IFU" => Ifu,
            "ADX" => Adx,
            "SBX" => Sbx,
            "STI" => Sti,
            "STD" => Std,
            "JSR" => Jsr,
            "HCF" => Hcf,
            "INT" => Int,
            "IAG" => Iag,
            "IAS" => Ias,
            "RFI" => Rfi,
            "IAQ" => Iaq,
            "HWN" => Hwn,
            "HWQ" => Hwq,
            "HWI" => Hwi,
            "JMP" => Jmp,
            "PUSH" => Push,
            "POP" => Pop,
            _ => return None,
        })
    }

    /// Arity-1 mnemonics take only operand `a`; arity-2 take `b, a`
    /// (textual order `b, a`, encoding positions A/B).
    pub fn arity(self) -> u8 {
        use Mnemonic::*;
        match self {
            Set | Add | Sub | Mul | Mli | Div | Dvi | Mod | Mdi | And | Bor | Xor | Shr | Asr
            | Shl | Ifb | Ifc | Ife | Ifn | Ifg | Ifa | Ifl | Ifu | Adx | Sbx | Sti | Std => 2,
            Jsr | Hcf | Int | Iag | Ias | Rfi | Iaq | Hwn | Hwq | Hwi | Jmp | Push | Pop => 1,
        }
    }

    pub fn is_conditional(self) -> bool {
        use Mnemonic::*;
        matches!(self, Ifb | Ifc | Ife | Ifn | Ifg | Ifa | Ifl | Ifu)
    }

    /// Base cycle cost, excluding the cost of reading extension words.
    pub fn base_cycles(self) -> u16 {
        use Mnemonic::*;
        match self {
            Set | And | Bor | Xor | Shr | Asr | Shl => 1,
            Add | Sub | Mul | Mli | Ifb | Ifc | Ife | Ifn | Ifg | Ifa | Ifl | Ifu | Sti | Std => 2,
            Div | Dvi | Mod | Mdi | Adx | Sbx => 3,
            Jsr => 3,
            Hcf => 9,
            Int => 4,
            Iag | Ias => 1,
            Rfi => 3,
            Iaq => 2,
            Hwn => 2,
            Hwq => 4,
            Hwi => 4,
            // pseudo-ops are expanded before cycle accounting ever sees them
            Jmp | Push | Pop => 1,
        }
    }

    /// Opcode number for the low 5 bits of a basic (two-operand) word.
    /// `None` for special mnemonics and pseudo-ops.
    pub fn basic_opcode(self) -> Option<u8> {
        use Mnemonic::*;
        Some(match self {
            Set => 0x01,
            Add => 0x02,
            Sub => 0x03,
            Mul => 0x04,
            Mli => 0x05,
            Div => 0x06,
            Dvi => 0x07,
            Mod => 0x08,
            Mdi => 0x09,
            And => 0x0a,
            Bor => 0x0b,
            Xor => 0x0c,
            Shr => 0x0d,
            Asr => 0x0e,
            Shl => 0x0f,
            Ifb => 0x10,
            Ifc => 0x11,
            Ife => 0x12,
            Ifn => 0x13,
            Ifg => 0x14,
            Ifa => 0x15,
            Ifl => 0x16,
            Ifu => 0x17,
            Adx => 0x1a,
            Sbx => 0x1b,
            Sti => 0x1e,
            Std => 0x1f,
            _ => return None,
        })
    }

    /// Opcode number carried in bits 5-9 of a special (single-operand)
    /// word (bits 0-4 are zero). `None` for basic mnemonics and pseudo-ops.
    pub fn special_opcode(self) -> Option<u8> {
        use Mnemonic::*;
        Some(match self {
            Jsr => 0x01,
            Hcf => 0x07,
            Int => 0x08,
            Iag => 0x09,
            Ias => 0x0a,
            Rfi => 0x0b,
            Iaq => 0x0c,
            Hwn => 0x10,
            Hwq => 0x11,
            Hwi => 0x12,
            _ => return None,
        })
    }

    pub fn from_basic_opcode(op: u8) -> Option<Mnemonic> {
        use Mnemonic::*;
        Some(match op {
            0x01 => Set,
            0x02 => Add,
            0x03 => Sub,
            0x04 => Mul,
            0x05 => Mli,
            0x06 => Div,
            0x07 => Dvi,
            0x08 => Mod,
            0x09 => Mdi,
            0x0a => And,
            0x0b => Bor,
            0x0c => Xor,
            0x0d => Shr,
            0x0e => Asr,
            0x0f => Shl,
            0x10 => Ifb,
            0x11 => Ifc,
            0x12 => Ife,
            0x13 => Ifn,
            0x14 => Ifg,
            0x15 => Ifa,
            0x16 => Ifl,
            0x17 => Ifu,
            0x1a => Adx,
            0x1b => Sbx,
            0x1e => Sti,
            0x1f => Std,
            _ => return None,
        })
    }

    pub fn from_special_opcode(op: u8) -> Option<Mnemonic> {
        use Mnemonic::*;
        Some(match op {
            0x01 => Jsr,
            0x07 => Hcf,
            0x08 => Int,
            0x09 => Iag,
            0x0a => Ias,
            0x0b => Rfi,
            0x0c => Iaq,
            0x10 => Hwn,
            0x11 => Hwq,
            0x12 => Hwi,
            _ => return None,
        })
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Mnemonic::*;
        let s = match self {
            Set => "SET",
            Add => "ADD",
            Sub => "SUB",
            Mul => "MUL",
            Mli => "MLI",
            Div => "DIV",
            Dvi => "DVI",
            Mod => "MOD",
            Mdi => "MDI",
            And => "AND",
            Bor => "BOR",
            Xor => "XOR",
            Shr => "SHR",
            Asr => "ASR",
            Shl => "SHL",
            Ifb => "IFB",
            Ifc => "IFC",
            Ife => "IFE",
            Ifn => "IFN",
            Ifg => "IFG",
            Ifa => "IFA",
            Ifl => "IFL",
            Ifu => "IFU",
            Adx => "ADX",
            Sbx => "SBX",
            Sti => "STI",
            Std => "STD",
            Jsr => "JSR",
            Hcf => "HCF",
            Int => "INT",
            Iag => "IAG",
            Ias => "IAS",
            Rfi => "RFI",
            Iaq => "IAQ",
            Hwn => "HWN",
            Hwq => "HWQ",
            Hwi => "HWI",
            Jmp => "JMP",
            Push => "PUSH",
            Pop => "POP",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
}

impl BinaryOp {
    /// Only `+` allows a register operand on either side; `-` allows
    /// one on the left only; every other operator is literal-only.
    pub fn allows_register_left(self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Sub)
    }

    pub fn allows_register_right(self) -> bool {
        matches!(self, BinaryOp::Add)
    }
}

/// Sum-of-variants expression tree (§3, §9). `Evaluated` is the
/// normalized post-fold form: at most one register, at most one
/// literal offset. Symbols are carried by name; the symbol table
/// itself is the stable arena (see `symbols.rs`), so nothing here
/// holds a raw pointer/index that the compression loop could
/// invalidate by mutating the table in place.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(u32),
    Symbol(String),
    Register(Register),
    CurrentPosition,
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Evaluated { register: Option<Register>, value: Option<i32> },
    Invalid,
}

impl Expr {
    pub fn evaluated_literal(value: i32) -> Expr {
        Expr::Evaluated { register: None, value: Some(value) }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Expr::Invalid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackArgKind {
    Push,
    Pop,
    Peek,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Stack(StackArgKind),
    Pick(Expr),
    Expression(ExprArgument),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprArgument {
    pub expr: Expr,
    pub indirect: bool,
}

impl ExprArgument {
    pub fn direct(expr: Expr) -> Self {
        ExprArgument { expr, indirect: false }
    }

    pub fn indirect(expr: Expr) -> Self {
        ExprArgument { expr, indirect: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Global,
    Local,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub name: String,
    pub kind: LabelKind,
    pub location: SourceLocation,
}

/// The payload of a statement, independent of any labels attached to
/// the same source line.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementBody {
    Instruction { opcode: Mnemonic, a: Argument, b: Option<Argument> },
    /// `.dw`/`.dat`/`dat`: one 16-bit word per expression (a quoted
    /// string argument contributes one word per character).
    Data(Vec<Expr>),
    /// `.db`/`.dp`: two bytes packed big-endian into each output word.
    DataBytes(Vec<Expr>),
    Org(Expr),
    Fill { count: Expr, value: Expr },
    Equ(Expr),
    Align(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub labels: Vec<Label>,
    pub body: Option<StatementBody>,
    pub location: SourceLocation,
}

/// Rewrites the `JMP`/`PUSH`/`POP` pseudo-mnemonics into their `SET`
/// equivalents before the statement list reaches the compression loop.
/// This has to happen ahead of compression, not merely at encode time:
/// `POP a` moves the user's argument from encoding position A to
/// position B (which never takes the short-literal form), so the
/// compression loop must see the real `SET` shape to size it correctly.
/// See the REDESIGN note on the prior art's `JMP`/`PUSH`/`POP` dispatch
/// fallthrough bug; expanding here sidesteps it entirely by construction.
pub fn expand_pseudo_ops(statements: &mut [Statement]) {
    for stmt in statements {
        let Some(StatementBody::Instruction { opcode, a, b }) = &mut stmt.body else {
            continue;
        };
        match opcode {
            Mnemonic::Jmp => {
                *opcode = Mnemonic::Set;
                *b = Some(Argument::Expression(ExprArgument::direct(Expr::Register(Register::Pc))));
            }
            Mnemonic::Push => {
                *opcode = Mnemonic::Set;
                *b = Some(Argument::Stack(StackArgKind::Push));
            }
            Mnemonic::Pop => {
                *opcode = Mnemonic::Set;
                let target = std::mem::replace(a, Argument::Stack(StackArgKind::Pop));
                *b = Some(target);
            }
            _ => {}
        }
    }
}
