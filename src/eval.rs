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

use crate::ast::{BinaryOp, Expr, Register, UnaryOp};
use crate::diagnostics::Log;
use crate::symbols::{SymbolKind, SymbolTable};
use crate::token::SourceLocation;

const MAX_EQU_DEPTH: usize = 64;

/// Folds an expression tree down to its `Evaluated` normal form,
/// looking up symbols in `symtab` and substituting `$` with
/// `current_pc`. `intermediary` suppresses divide-by-zero warnings so
/// the compression loop's fixpoint iterations, which re-evaluate every
/// operand on every pass against a not-yet-final layout, don't spam
/// the log.
pub struct Evaluator<'a> {
    pub symtab: &'a SymbolTable,
    pub current_pc: u16,
    pub intermediary: bool,
}

impl<'a> Evaluator<'a> {
    pub fn new(symtab: &'a SymbolTable, current_pc: u16, intermediary: bool) -> Self {
        Evaluator { symtab, current_pc, intermediary }
    }

    pub fn eval(&self, expr: &Expr, location: &SourceLocation, log: &mut Log) -> Expr {
        self.eval_depth(expr, location, log, 0)
    }

    fn eval_depth(&self, expr: &Expr, location: &SourceLocation, log: &mut Log, depth: usize) -> Expr {
        match expr {
            Expr::Invalid => Expr::Invalid,
            Expr::Literal(v) => Expr::Evaluated { register: None, value: Some(*v as i32) },
            Expr::Register(r) => Expr::Evaluated { register: Some(*r), value: None },
            Expr::CurrentPosition => Expr::Evaluated { register: None, value: Some(self.current_pc as i32) },
            Expr::Evaluated { .. } => expr.clone(),
            Expr::Symbol(name) => self.eval_symbol(name, location, log, depth),
            Expr::Unary(op, inner) => self.eval_unary(*op, inner, location, log, depth),
            Expr::Binary(op, lhs, rhs) => self.eval_binary(*op, lhs, rhs, location, log, depth),
        }
    }

    fn eval_symbol(&self, name: &str, location: &SourceLocation, log: &mut Log, depth: usize) -> Expr {
        let Some(full_name) = self.symtab.qualify(name) else {
            log.error(location.clone(), format!("local label '{name}' declared before any global label"));
            return Expr::Invalid;
        };

        let Some(entry) = self.symtab.lookup(&full_name) else {
            log.error(location.clone(), format!("undefined symbol '{name}'"));
            return Expr::Invalid;
        };

        match entry.kind {
            SymbolKind::GlobalLabel | SymbolKind::LocalLabel | SymbolKind::CurrentLocation => {
                Expr::Evaluated { register: None, value: Some(entry.offset as i32) }
            }
            SymbolKind::Equ => {
                if depth >= MAX_EQU_DEPTH {
                    log.error(location.clone(), format!("'{name}' has a cyclic .equ definition"));
                    return Expr::Invalid;
                }
                let equ_expr = entry.equ_expr.as_ref().expect("equ symbol always carries an expression");
                self.eval_depth(equ_expr, location, log, depth + 1)
            }
        }
    }

    fn eval_unary(&self, op: UnaryOp, inner: &Expr, location: &SourceLocation, log: &mut Log, depth: usize) -> Expr {
        let operand = self.eval_depth(inner, location, log, depth);
        let (register, value) = match &operand {
            Expr::Evaluated { register, value } => (*register, *value),
            Expr::Invalid => return Expr::Invalid,
            _ => unreachable!("eval_depth always returns Evaluated or Invalid"),
        };

        if register.is_some() || value.is_none() {
            log.error(location.clone(), format!("non-constant operand for unary operator '{}'", unary_symbol(op)));
            return Expr::Invalid;
        }
        let v = value.unwrap();

        let result = match op {
            UnaryOp::Plus => v,
            UnaryOp::Minus => v.wrapping_neg(),
            UnaryOp::Not => {
                if v == 0 {
                    1
                } else {
                    0
                }
            }
            UnaryOp::BitNot => !v,
        };

        Expr::Evaluated { register: None, value: Some(result) }
    }

    fn eval_binary(
        &self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        location: &SourceLocation,
        log: &mut Log,
        depth: usize,
    ) -> Expr {
        let left = self.eval_depth(lhs, location, log, depth);
        let right = self.eval_depth(rhs, location, log, depth);

        if left.is_invalid() || right.is_invalid() {
            return Expr::Invalid;
        }

        let (left_reg, left_val) = as_parts(&left);
        let (right_reg, right_val) = as_parts(&right);

        if left_reg.is_some() && right_reg.is_some() {
            log.error(location.clone(), "multiple registers in expression".to_string());
            return Expr::Invalid;
        }

        match op {
            BinaryOp::Add => {
                let value = add_values(left_val, right_val);
                Expr::Evaluated { register: left_reg.or(right_reg), value }
            }
            BinaryOp::Sub => {
                if right_reg.is_some() {
                    log.error(location.clone(), "non-constant right operand for operator '-'".to_string());
                    return Expr::Invalid;
                }
                let value = match (left_val, right_val) {
                    (Some(l), Some(r)) => Some(l.wrapping_sub(r)),
                    (None, Some(_)) => Some(0i32.wrapping_sub(right_val.unwrap())),
                    _ => None,
                };
                Expr::Evaluated { register: left_reg, value }
            }
            _ => {
                if left_reg.is_some() || right_reg.is_some() {
                    log.error(
                        location.clone(),
                        format!("non-constant operands for operator '{}'", binary_symbol(op)),
                    );
                    return Expr::Invalid;
                }
                let (Some(l), Some(r)) = (left_val, right_val) else {
                    return Expr::Invalid;
                };
                Expr::Evaluated { register: None, value: Some(self.apply(op, l, r, location, log)) }
            }
        }
    }

    fn apply(&self, op: BinaryOp, l: i32, r: i32, location: &SourceLocation, log: &mut Log) -> i32 {
        match op {
            BinaryOp::Add => l.wrapping_add(r),
            BinaryOp::Sub => l.wrapping_sub(r),
            BinaryOp::Mul => l.wrapping_mul(r),
            BinaryOp::Div => {
                if r == 0 {
                    if !self.intermediary {
                        log.divide_by_zero(location);
                    }
                    0
                } else {
                    l.wrapping_div(r)
                }
            }
            BinaryOp::Mod => {
                if r == 0 {
                    if !self.intermediary {
                        log.divide_by_zero(location);
                    }
                    0
                } else {
                    l.wrapping_rem(r)
                }
            }
            BinaryOp::Shl => l.wrapping_shl(r as u32 & 31),
            BinaryOp::Shr => l.wrapping_shr(r as u32 & 31),
            BinaryOp::Lt => bool_to_i32(l < r),
            BinaryOp::Le => bool_to_i32(l <= r),
            BinaryOp::Gt => bool_to_i32(l > r),
            BinaryOp::Ge => bool_to_i32(l >= r),
            BinaryOp::Eq => bool_to_i32(l == r),
            BinaryOp::Ne => bool_to_i32(l != r),
            BinaryOp::And => bool_to_i32(l != 0 && r != 0),
            BinaryOp::Or => bool_to_i32(l != 0 || r != 0),
            BinaryOp::BitAnd => l & r,
            BinaryOp::BitOr => l | r,
            BinaryOp::BitXor => l ^ r,
        }
    }
}

fn as_parts(expr: &Expr) -> (Option<Register>, Option<i32>) {
    match expr {
        Expr::Evaluated { register, value } => (*register, *value),
        _ => (None, None),
    }
}

fn add_values(l: Option<i32>, r: Option<i32>) -> Option<i32> {
    match (l, r) {
        (Some(a), Some(b)) => Some(a.wrapping_add(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

fn bool_to_i32(b: bool) -> i32 {
    if b {
        1
    } else {
        0
    }
}

fn unary_symbol(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Plus => "+",
        UnaryOp::Minus => "-",
        UnaryOp::Not => "!",
        UnaryOp::BitNot => "~",
    }
}

fn binary_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
        BinaryOp::BitAnd => "&",
        BinaryOp::BitOr => "|",
        BinaryOp::BitXor => "^",
    }
}
