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

use crate::ast::{Argument, Expr, Statement, StatementBody};
use crate::diagnostics::Log;
use crate::errors::AssemblyError;
use crate::eval::Evaluator;
use crate::symbols::{SymbolKind, SymbolTable};
use crate::token::SourceLocation;

const MAX_ITERATIONS: usize = 1000;

/// Hysteresis state for the one argument in a statement that the
/// fixpoint loop is allowed to shrink: an instruction's `a` operand.
/// `force_next_word` is the pin that stops a shrink from oscillating:
/// once set, this argument always reserves its extension word even if
/// a later pass would otherwise want to shrink it again.
#[derive(Debug, Clone, Copy, Default)]
struct ArgState {
    cached_size: u16,
    force_next_word: bool,
}

/// Per-statement bookkeeping the compression loop needs. Most
/// statement kinds have a fixed size decided once at build time;
/// `Instruction`, `Fill`, and `Align` carry state that gets revisited
/// every pass.
enum StmtLayout {
    Fixed(u16),
    Instruction { a: ArgState, b_size: u16 },
    Fill { cached_size: u16 },
    Align { cached_size: u16 },
    Org,
}

/// What the encoder needs to know, per statement, about the shape the
/// fixpoint loop settled on: whether operand `a` was pinned to its
/// extension-word form even though its resolved value would otherwise
/// fit the short-literal range.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodingHint {
    pub force_next_word: bool,
}

/// The result of a converged compression pass: the final word count
/// and, for every statement, the encoding hint the encoder consults
/// when it re-evaluates operand `a` against the now-stable symbol table.
pub struct CompressionResult {
    pub word_count: u16,
    pub hints: Vec<EncodingHint>,
}

/// Builds the symbol table from scratch and assigns every statement an
/// initial (possibly pessimistic) size, then runs the fixpoint
/// compression loop until operand sizes stop changing. Returns the
/// final word count of the assembled image.
pub fn build_and_compress(statements: &[Statement], symtab: &mut SymbolTable, log: &mut Log) -> u16 {
    compress(statements, symtab, log).word_count
}

/// As `build_and_compress`, but also returns the per-statement encoding
/// hints the encoder needs to reproduce the loop's exact output sizes.
pub fn compress(statements: &[Statement], symtab: &mut SymbolTable, log: &mut Log) -> CompressionResult {
    let mut layout = build(statements, symtab, log);

    if log.has_errors() {
        return CompressionResult { word_count: 0, hints: hints_from(&layout) };
    }

    let mut converged = false;
    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;
        let mut pc: u32 = 0;

        for (stmt, entry) in statements.iter().zip(layout.iter_mut()) {
            changed |= compress_statement(stmt, entry, symtab, pc as u16, log);
            pc = advance_pc(pc, stmt, entry, symtab, log);
        }

        if !changed {
            converged = true;
            break;
        }
    }

    let final_pc = total_words(statements, &layout, symtab, log);
    let hints = hints_from(&layout);

    if !converged {
        let location = statements.last().map(|s| s.location.clone()).unwrap_or_else(fallback_location);
        log.error(location, AssemblyError::CompressionDidNotConverge.to_string());
        return CompressionResult { word_count: final_pc, hints };
    }

    if final_pc as u32 > u16::MAX as u32 {
        let location = statements.last().map(|s| s.location.clone()).unwrap_or_else(fallback_location);
        log.error_from(&AssemblyError::OutputOverflow { location });
    }

    CompressionResult { word_count: final_pc, hints }
}

fn hints_from(layout: &[StmtLayout]) -> Vec<EncodingHint> {
    layout
        .iter()
        .map(|entry| match entry {
            StmtLayout::Instruction { a, .. } => EncodingHint { force_next_word: a.force_next_word },
            _ => EncodingHint::default(),
        })
        .collect()
}

fn fallback_location() -> SourceLocation {
    SourceLocation::new(std::rc::Rc::from("<output>"), 0, 0)
}

fn build(statements: &[Statement], symtab: &mut SymbolTable, log: &mut Log) -> Vec<StmtLayout> {
    let mut layout = Vec::with_capacity(statements.len());
    let mut pc: u32 = 0;

    for stmt in statements {
        declare_labels(stmt, symtab, pc as u16, log);

        let entry = match &stmt.body {
            None => StmtLayout::Fixed(0),
            Some(StatementBody::Instruction { a, b, .. }) => {
                let a_state = initial_arg_state(a, symtab, pc as u16, &stmt.location, log);
                let b_size = b
                    .as_ref()
                    .map(|arg| initial_arg_size(arg, symtab, pc as u16, &stmt.location, false, log))
                    .unwrap_or(0);
                StmtLayout::Instruction { a: a_state, b_size }
            }
            Some(StatementBody::Data(values)) => StmtLayout::Fixed(values.len() as u16),
            Some(StatementBody::DataBytes(values)) => StmtLayout::Fixed(((values.len() + 1) / 2) as u16),
            Some(StatementBody::Org(_)) => StmtLayout::Org,
            Some(StatementBody::Fill { count, .. }) => {
                let evaluator = Evaluator::new(symtab, pc as u16, true);
                let size = evaluate_count(&evaluator, count, &stmt.location, log);
                StmtLayout::Fill { cached_size: size }
            }
            Some(StatementBody::Equ(_)) => StmtLayout::Fixed(0),
            Some(StatementBody::Align(alignment)) => {
                let evaluator = Evaluator::new(symtab, pc as u16, true);
                let boundary = evaluate_count(&evaluator, alignment, &stmt.location, log).max(1);
                let size = padding_for(pc as u16, boundary);
                StmtLayout::Align { cached_size: size }
            }
        };

        let size = match &entry {
            StmtLayout::Fixed(n) => *n,
            StmtLayout::Instruction { a, b_size } => 1 + a.cached_size + b_size,
            StmtLayout::Fill { cached_size } => *cached_size,
            StmtLayout::Align { cached_size } => *cached_size,
            StmtLayout::Org => 0,
        };

        layout.push(entry);

        if let Some(StatementBody::Org(expr)) = &stmt.body {
            let evaluator = Evaluator::new(symtab, pc as u16, true);
            pc = evaluate_org(&evaluator, expr, &stmt.location, log) as u32;
        } else {
            pc += size as u32;
        }
    }

    layout
}

fn declare_labels(stmt: &Statement, symtab: &mut SymbolTable, pc: u16, log: &mut Log) {
    let is_equ = matches!(stmt.body, Some(StatementBody::Equ(_)));

    for label in &stmt.labels {
        let kind = match label.kind {
            crate::ast::LabelKind::Global => SymbolKind::GlobalLabel,
            crate::ast::LabelKind::Local => SymbolKind::LocalLabel,
        };

        if kind == SymbolKind::LocalLabel && symtab.qualify(&label.name).is_none() {
            log.error_from(&AssemblyError::OrphanLocalLabel {
                location: label.location.clone(),
                name: label.name.clone(),
            });
            continue;
        }

        let result = if is_equ {
            let Some(StatementBody::Equ(expr)) = &stmt.body else { unreachable!() };
            symtab.declare_equ(&label.name, expr.clone(), label.location.clone())
        } else {
            symtab.declare_label(&label.name, kind, pc, label.location.clone())
        };

        if let Err(name) = result {
            log.error_from(&AssemblyError::DuplicateSymbol { location: label.location.clone(), name });
        }
    }
}

fn initial_arg_state(arg: &Argument, symtab: &SymbolTable, pc: u16, location: &SourceLocation, log: &mut Log) -> ArgState {
    ArgState { cached_size: initial_arg_size(arg, symtab, pc, location, true, log), force_next_word: false }
}

/// An argument whose expression references no symbol or `$` can be
/// sized immediately; one that does starts pessimistically at its
/// maximum size (one extension word) until the compression loop
/// proves it can shrink. `is_position_a` must match the operand's
/// textual position: only position `a` is eligible for the
/// short-literal collapse.
fn initial_arg_size(
    arg: &Argument,
    symtab: &SymbolTable,
    pc: u16,
    location: &SourceLocation,
    is_position_a: bool,
    log: &mut Log,
) -> u16 {
    match arg {
        Argument::Stack(_) => 0,
        Argument::Pick(expr) => {
            if references_symbolic(expr) {
                1
            } else {
                let evaluator = Evaluator::new(symtab, pc, true);
                let evaluated = evaluator.eval(expr, location, log);
                pick_size(&evaluated, false)
            }
        }
        Argument::Expression(expr_arg) => {
            if references_symbolic(&expr_arg.expr) {
                1
            } else {
                let evaluator = Evaluator::new(symtab, pc, true);
                let evaluated = evaluator.eval(&expr_arg.expr, location, log);
                expr_size(&evaluated, expr_arg.indirect, is_position_a, false)
            }
        }
    }
}

pub(crate) fn references_symbolic(expr: &Expr) -> bool {
    match expr {
        Expr::Symbol(_) | Expr::CurrentPosition => true,
        Expr::Unary(_, inner) => references_symbolic(inner),
        Expr::Binary(_, lhs, rhs) => references_symbolic(lhs) || references_symbolic(rhs),
        Expr::Literal(_) | Expr::Register(_) | Expr::Evaluated { .. } | Expr::Invalid => false,
    }
}

/// Mirrors the encoder's own collapsing rules so the space the
/// compression loop reserves always matches what the encoder actually
/// emits: a direct literal fits in a short-literal operand only in
/// position A, within `[-1, 30]`, and only once pinned `force_next_word`
/// is false; an indirect register-plus-offset collapses to the bare
/// `[reg]` form whenever the offset is absent or exactly zero.
pub(crate) fn expr_size(evaluated: &Expr, indirect: bool, is_position_a: bool, force_next_word: bool) -> u16 {
    let (register, value) = match evaluated {
        Expr::Evaluated { register, value } => (*register, *value),
        _ => return 1,
    };

    if indirect {
        if register.is_some() && (value.is_none() || value == Some(0)) && !force_next_word {
            0
        } else {
            1
        }
    } else if register.is_some() {
        0
    } else if is_position_a && !force_next_word && matches!(value, Some(v) if (-1..=30).contains(&v)) {
        0
    } else {
        1
    }
}

fn pick_size(evaluated: &Expr, force_next_word: bool) -> u16 {
    expr_size(evaluated, true, false, force_next_word)
}

fn compress_statement(stmt: &Statement, entry: &mut StmtLayout, symtab: &mut SymbolTable, pc: u16, log: &mut Log) -> bool {
    match (&stmt.body, entry) {
        (Some(StatementBody::Instruction { a, .. }), StmtLayout::Instruction { a: state, .. }) => {
            compress_argument(a, state, symtab, pc, &stmt.location, log)
        }
        (Some(StatementBody::Fill { count, .. }), StmtLayout::Fill { cached_size }) => {
            let evaluator = Evaluator::new(symtab, pc, true);
            let new_size = evaluate_count(&evaluator, count, &stmt.location, log);
            if new_size != *cached_size {
                let delta = new_size as i32 - *cached_size as i32;
                symtab.update_after(pc, delta);
                *cached_size = new_size;
                true
            } else {
                false
            }
        }
        (Some(StatementBody::Align(alignment)), StmtLayout::Align { cached_size }) => {
            let evaluator = Evaluator::new(symtab, pc, true);
            let boundary = evaluate_count(&evaluator, alignment, &stmt.location, log).max(1);
            let new_size = padding_for(pc, boundary);
            if new_size != *cached_size {
                let delta = new_size as i32 - *cached_size as i32;
                symtab.update_after(pc, delta);
                *cached_size = new_size;
                true
            } else {
                false
            }
        }
        _ => false,
    }
}

fn compress_argument(
    arg: &Argument,
    state: &mut ArgState,
    symtab: &mut SymbolTable,
    pc: u16,
    location: &SourceLocation,
    log: &mut Log,
) -> bool {
    let (indirect, expr) = match arg {
        Argument::Stack(_) => return false,
        Argument::Pick(expr) => (true, expr),
        Argument::Expression(e) => (e.indirect, &e.expr),
    };

    if !references_symbolic(expr) {
        return false;
    }

    let evaluator = Evaluator::new(symtab, pc, true);
    let evaluated = evaluator.eval(expr, location, log);
    let new_size = expr_size(&evaluated, indirect, true, state.force_next_word);

    if new_size == state.cached_size {
        return false;
    }

    let delta = new_size as i32 - state.cached_size as i32;
    symtab.update_after(pc, delta);
    state.cached_size = new_size;

    let non_intermediary = Evaluator::new(symtab, pc, false);
    let reevaluated = non_intermediary.eval(expr, location, log);
    let settled_size = expr_size(&reevaluated, indirect, true, state.force_next_word);
    if settled_size > new_size {
        let delta2 = settled_size as i32 - new_size as i32;
        symtab.update_after(pc, delta2);
        state.cached_size = settled_size;
        state.force_next_word = true;
    }

    true
}

fn advance_pc(pc: u32, stmt: &Statement, entry: &StmtLayout, symtab: &SymbolTable, log: &mut Log) -> u32 {
    if let Some(StatementBody::Org(expr)) = &stmt.body {
        let evaluator = Evaluator::new(symtab, pc as u16, true);
        return evaluate_org(&evaluator, expr, &stmt.location, log) as u32;
    }

    let size = match entry {
        StmtLayout::Fixed(n) => *n,
        StmtLayout::Instruction { a, b_size } => 1 + a.cached_size + b_size,
        StmtLayout::Fill { cached_size } => *cached_size,
        StmtLayout::Align { cached_size } => *cached_size,
        StmtLayout::Org => 0,
    };
    pc + size as u32
}

fn total_words(statements: &[Statement], layout: &[StmtLayout], symtab: &SymbolTable, log: &mut Log) -> u16 {
    let mut pc: u32 = 0;
    for (stmt, entry) in statements.iter().zip(layout.iter()) {
        pc = advance_pc(pc, stmt, entry, symtab, log);
    }
    pc.min(u16::MAX as u32) as u16
}

pub(crate) fn evaluate_count(evaluator: &Evaluator, expr: &Expr, location: &SourceLocation, log: &mut Log) -> u16 {
    match evaluator.eval(expr, location, log) {
        Expr::Evaluated { value: Some(v), register: None } => v.clamp(0, u16::MAX as i32) as u16,
        _ => 0,
    }
}

pub(crate) fn evaluate_org(evaluator: &Evaluator, expr: &Expr, location: &SourceLocation, log: &mut Log) -> u16 {
    match evaluator.eval(expr, location, log) {
        Expr::Evaluated { value: Some(v), register: None } => {
            if v < 0 {
                log.error_from(&AssemblyError::NegativeOrg { location: location.clone() });
                0
            } else {
                v.min(u16::MAX as i32) as u16
            }
        }
        _ => 0,
    }
}

pub(crate) fn padding_for(pc: u16, boundary: u16) -> u16 {
    if boundary <= 1 {
        return 0;
    }
    let remainder = pc % boundary;
    if remainder == 0 {
        0
    } else {
        boundary - remainder
    }
}
