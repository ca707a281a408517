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

//! Emits the 16-bit instruction words the compression loop laid out
//! (§4.6). The encoder trusts the converged layout completely: every
//! operand is re-evaluated against the final symbol table and must
//! collapse to exactly the size the loop already committed to, using
//! the same size predicate (`compress::expr_size`) so the two stay in
//! lock-step by construction rather than by coincidence.

use crate::ast::{Argument, Expr, Mnemonic, Register, Statement, StatementBody};
use crate::compress::{self, EncodingHint};
use crate::diagnostics::Log;
use crate::eval::Evaluator;
use crate::symbols::SymbolTable;

/// `SET A, A`, the filler instruction `.align` pads with.
const ALIGN_FILLER: u16 = 0x0001;

pub fn encode(statements: &[Statement], symtab: &SymbolTable, hints: &[EncodingHint], log: &mut Log) -> Vec<u16> {
    let mut out: Vec<u16> = Vec::new();
    let mut pc: u32 = 0;

    for (stmt, hint) in statements.iter().zip(hints.iter()) {
        match &stmt.body {
            None => {}
            Some(StatementBody::Instruction { opcode, a, b }) => {
                let words = encode_instruction(*opcode, a, b.as_ref(), hint, symtab, pc as u16, &stmt.location, log);
                place(&mut out, pc, &words);
                pc += words.len() as u32;
            }
            Some(StatementBody::Data(values)) => {
                let evaluator = Evaluator::new(symtab, pc as u16, false);
                let words: Vec<u16> =
                    values.iter().map(|e| evaluator.eval(e, &stmt.location, log)).map(|e| literal_word(&e)).collect();
                place(&mut out, pc, &words);
                pc += words.len() as u32;
            }
            Some(StatementBody::DataBytes(values)) => {
                let evaluator = Evaluator::new(symtab, pc as u16, false);
                let bytes: Vec<u8> = values
                    .iter()
                    .map(|e| evaluator.eval(e, &stmt.location, log))
                    .map(|e| literal_word(&e) as u8)
                    .collect();
                let words: Vec<u16> = bytes
                    .chunks(2)
                    .map(|pair| {
                        let hi = pair[0] as u16;
                        let lo = *pair.get(1).unwrap_or(&0) as u16;
                        (hi << 8) | lo
                    })
                    .collect();
                place(&mut out, pc, &words);
                pc += words.len() as u32;
            }
            Some(StatementBody::Org(expr)) => {
                let evaluator = Evaluator::new(symtab, pc as u16, false);
                pc = compress::evaluate_org(&evaluator, expr, &stmt.location, log) as u32;
            }
            Some(StatementBody::Fill { count, value }) => {
                let evaluator = Evaluator::new(symtab, pc as u16, false);
                let n = compress::evaluate_count(&evaluator, count, &stmt.location, log);
                let value_word = literal_word(&evaluator.eval(value, &stmt.location, log));
                let words = vec![value_word; n as usize];
                place(&mut out, pc, &words);
                pc += words.len() as u32;
            }
            Some(StatementBody::Equ(_)) => {}
            Some(StatementBody::Align(alignment)) => {
                let evaluator = Evaluator::new(symtab, pc as u16, false);
                let boundary = compress::evaluate_count(&evaluator, alignment, &stmt.location, log).max(1);
                let n = compress::padding_for(pc as u16, boundary);
                let words = vec![ALIGN_FILLER; n as usize];
                place(&mut out, pc, &words);
                pc += words.len() as u32;
            }
        }
    }

    out
}

fn place(out: &mut Vec<u16>, pc: u32, words: &[u16]) {
    let end = pc as usize + words.len();
    if out.len() < end {
        out.resize(end, 0);
    }
    out[pc as usize..end].copy_from_slice(words);
}

fn literal_word(evaluated: &Expr) -> u16 {
    match evaluated {
        Expr::Evaluated { value: Some(v), .. } => *v as u16,
        _ => 0,
    }
}

/// `opcode` is always a real basic or special mnemonic here; pseudo-ops
/// are rewritten to `SET` by `ast::expand_pseudo_ops` before compression
/// ever sees the statement list.
fn encode_instruction(
    opcode: Mnemonic,
    a: &Argument,
    b: Option<&Argument>,
    hint: &EncodingHint,
    symtab: &SymbolTable,
    pc: u16,
    location: &crate::token::SourceLocation,
    log: &mut Log,
) -> Vec<u16> {
    let evaluator = Evaluator::new(symtab, pc, false);
    let (a_code, a_extra) = encode_argument(a, true, hint.force_next_word, &evaluator, location, log);

    match b {
        Some(b_arg) => {
            let (b_code, b_extra) = encode_argument(b_arg, false, false, &evaluator, location, log);
            let op = basic_opcode(opcode);
            let instruction = ((a_code as u16) << 10) | ((b_code as u16) << 5) | op as u16;
            let mut words = vec![instruction];
            words.extend(a_extra);
            words.extend(b_extra);
            words
        }
        None => {
            let op = special_opcode(opcode);
            let instruction = ((a_code as u16) << 10) | ((op as u16) << 5);
            let mut words = vec![instruction];
            words.extend(a_extra);
            words
        }
    }
}

/// Encodes one operand, returning its 5/6-bit field code and an
/// optional extension word. `force_next_word` only ever applies to
/// position `a`, mirroring the compression loop's own restriction.
fn encode_argument(
    arg: &Argument,
    is_a: bool,
    force_next_word: bool,
    evaluator: &Evaluator,
    location: &crate::token::SourceLocation,
    log: &mut Log,
) -> (u8, Option<u16>) {
    match arg {
        Argument::Stack(kind) => {
            let code = match kind {
                crate::ast::StackArgKind::Push | crate::ast::StackArgKind::Pop => 0x18,
                crate::ast::StackArgKind::Peek => 0x19,
            };
            (code, None)
        }
        Argument::Pick(expr) => {
            let evaluated = evaluator.eval(expr, location, log);
            (0x1a, Some(literal_word(&evaluated)))
        }
        Argument::Expression(expr_arg) => {
            let evaluated = evaluator.eval(&expr_arg.expr, location, log);
            encode_expr_argument(&evaluated, expr_arg.indirect, is_a, force_next_word)
        }
    }
}

fn encode_expr_argument(evaluated: &Expr, indirect: bool, is_a: bool, force_next_word: bool) -> (u8, Option<u16>) {
    let (register, value) = match evaluated {
        Expr::Evaluated { register, value } => (*register, *value),
        _ => (None, Some(0)),
    };

    if let Some(reg) = register {
        if indirect {
            if (value.is_none() || value == Some(0)) && !force_next_word {
                return (0x08 + general_index(reg), None);
            }
            let offset = value.unwrap_or(0) as u16;
            return (0x10 + general_index(reg), Some(offset));
        }
        assert!(value.is_none(), "direct register operand carries a value; parser should have rejected {reg:?}+offset outside REGISTER_EXPRESSIONS context");
        return (register_direct_code(reg), None);
    }

    let v = value.unwrap_or(0);
    if indirect {
        return (0x1e, Some(v as u16));
    }
    if is_a && !force_next_word && (-1..=30).contains(&v) {
        return ((v + 1) as u8 + 0x20, None);
    }
    (0x1f, Some(v as u16))
}

fn general_index(reg: Register) -> u8 {
    reg.general_index().unwrap_or(0)
}

fn register_direct_code(reg: Register) -> u8 {
    match reg {
        Register::Sp => 0x1b,
        Register::Pc => 0x1c,
        Register::Ex => 0x1d,
        other => other.general_index().unwrap_or(0),
    }
}

fn basic_opcode(m: Mnemonic) -> u8 {
    m.basic_opcode().unwrap_or_else(|| unreachable!("{m:?} is not a basic opcode"))
}

fn special_opcode(m: Mnemonic) -> u8 {
    m.special_opcode().unwrap_or_else(|| unreachable!("{m:?} is not a special opcode"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprArgument, UnaryOp};
    use crate::diagnostics::Log;

    fn statement(body: StatementBody) -> Statement {
        Statement { labels: Vec::new(), body: Some(body), location: crate::token::SourceLocation::new(std::rc::Rc::from("t"), 1, 1) }
    }

    fn assemble(stmts: &[Statement]) -> (Vec<u16>, Log) {
        let mut log = Log::new();
        let mut symtab = SymbolTable::new();
        let result = compress::compress(stmts, &mut symtab, &mut log);
        let words = encode(stmts, &symtab, &result.hints, &mut log);
        (words, log)
    }

    #[test]
    fn set_a_negative_one_is_one_word() {
        let stmts = vec![statement(StatementBody::Instruction {
            opcode: Mnemonic::Set,
            a: Argument::Expression(ExprArgument::direct(Expr::Unary(UnaryOp::Minus, Box::new(Expr::Literal(1))))),
            b: Some(Argument::Expression(ExprArgument::direct(Expr::Register(Register::A)))),
        })];
        let (words, log) = assemble(&stmts);
        assert!(!log.has_errors());
        assert_eq!(words.len(), 1);
        // -1 packs into the short-literal range at code 0x20.
        assert_eq!(words[0] >> 10, 0x20);
    }

    #[test]
    fn set_direct_b_literal_never_shortens() {
        let stmts = vec![statement(StatementBody::Instruction {
            opcode: Mnemonic::Set,
            a: Argument::Expression(ExprArgument::direct(Expr::Register(Register::A))),
            b: Some(Argument::Expression(ExprArgument::direct(Expr::Literal(0)))),
        })];
        let (words, _log) = assemble(&stmts);
        assert_eq!(words.len(), 2);
    }

    #[test]
    fn jmp_expands_to_set_pc_before_encoding() {
        let mut stmts = vec![statement(StatementBody::Instruction {
            opcode: Mnemonic::Jmp,
            a: Argument::Expression(ExprArgument::direct(Expr::Literal(0x1000))),
            b: None,
        })];
        crate::ast::expand_pseudo_ops(&mut stmts);
        let (words, log) = assemble(&stmts);
        assert!(!log.has_errors());
        assert_eq!(words.len(), 2);
        // b = PC (register direct code 0x1c), op = SET (0x01).
        let b_field = (words[0] >> 5) & 0x1f;
        assert_eq!(b_field, 0x1c);
        assert_eq!(words[0] & 0x1f, 0x01);
        assert_eq!(words[1], 0x1000);
    }

    #[test]
    fn pop_moves_argument_to_position_b() {
        let mut stmts = vec![statement(StatementBody::Instruction {
            opcode: Mnemonic::Pop,
            a: Argument::Expression(ExprArgument::direct(Expr::Register(Register::A))),
            b: None,
        })];
        crate::ast::expand_pseudo_ops(&mut stmts);
        let (words, log) = assemble(&stmts);
        assert!(!log.has_errors());
        assert_eq!(words.len(), 1);
        // a = [SP++] (code 0x18), b = A (register direct code 0x00).
        let a_field = words[0] >> 10;
        let b_field = (words[0] >> 5) & 0x1f;
        assert_eq!(a_field, 0x18);
        assert_eq!(b_field, 0x00);
    }
}
