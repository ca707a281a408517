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

pub mod cursor;
pub mod directives;
pub mod expr_parser;

use crate::ast::{Argument, Expr, ExprArgument, Label, LabelKind, Statement, StatementBody};
use crate::diagnostics::Log;
use crate::token::{Directive, Operator, StackOp, Token, TokenKind};

use cursor::TokenCursor;
use expr_parser::{AllowedFlags, ExprParser};

/// Parses a whole token stream into a flat list of statements. Mirrors
/// the prior art's single-pass structure: one label/directive/
/// instruction per iteration, with error recovery that skips to the
/// next newline rather than aborting the whole file.
pub struct Parser<'a, 'c> {
    cursor: TokenCursor<'c>,
    logger: &'a mut Log,
    instructions_found: usize,
    labels_found: usize,
}

impl<'a, 'c> Parser<'a, 'c> {
    pub fn new(tokens: &'c [Token], logger: &'a mut Log) -> Self {
        Parser { cursor: TokenCursor::new(tokens), logger, instructions_found: 0, labels_found: 0 }
    }

    pub fn parse(mut self) -> Vec<Statement> {
        let mut statements = Vec::new();

        while !self.cursor.at_eof() {
            let token = self.cursor.next().clone();
            if token.is_eof() {
                break;
            }
            if token.is_newline() {
                continue;
            }

            let mut labels = Vec::new();
            let mut next_token = token;
            while let Some(label) = self.try_parse_label(&next_token) {
                self.labels_found += 1;
                labels.push(label);
                next_token = self.cursor.next().clone();
                if next_token.is_newline() || next_token.is_eof() {
                    break;
                }
            }

            if next_token.is_newline() || next_token.is_eof() {
                if !labels.is_empty() {
                    let location = labels[0].location.clone();
                    statements.push(Statement { labels, body: None, location });
                }
                continue;
            }

            if let Some(body) = self.parse_directive(&next_token, !labels.is_empty()) {
                let location = labels.first().map(|l| l.location.clone()).unwrap_or_else(|| next_token.location.clone());
                statements.push(Statement { labels, body: Some(body), location });
                continue;
            }

            if let Some(body) = self.parse_instruction(&next_token) {
                self.instructions_found += 1;
                let location = labels.first().map(|l| l.location.clone()).unwrap_or_else(|| next_token.location.clone());
                statements.push(Statement { labels, body: Some(body), location });
                continue;
            }

            self.logger
                .error(next_token.location.clone(), format!("expected a label, instruction, or directive; found '{}'", next_token.content));
            self.advance_to_newline();
        }

        statements
    }

    fn try_parse_label(&mut self, token: &Token) -> Option<Label> {
        let (form, name) = match &token.kind {
            TokenKind::Label(form) => (*form, token.content.clone()),
            _ => return None,
        };
        let kind = if name.starts_with('.') { LabelKind::Local } else { LabelKind::Global };
        let _ = form; // both `name:` and `:name` denote the same label
        Some(Label { name, kind, location: token.location.clone() })
    }

    fn parse_instruction(&mut self, token: &Token) -> Option<StatementBody> {
        let mnemonic = match token.kind {
            TokenKind::Instruction(m) => m,
            _ => {
                self.logger
                    .error(token.location.clone(), format!("expected a label, instruction, or directive; found '{}'", token.content));
                return None;
            }
        };

        let (opcode, a, b) = match mnemonic.arity() {
            1 => {
                let a_tok = self.cursor.next().clone();
                let Some(a) = self.parse_argument(&a_tok, ArgPosition::A) else {
                    self.advance_to_newline();
                    return None;
                };
                (mnemonic, a, None)
            }
            _ => {
                let b_tok = self.cursor.next().clone();
                let b = self.parse_argument(&b_tok, ArgPosition::B);
                if b.is_none() {
                    self.advance_until(|t| t.is_operator(Operator::Comma) || t.is_newline() || t.is_eof());
                }

                let comma = self.cursor.next().clone();
                if !comma.is_operator(Operator::Comma) {
                    self.logger.error(comma.location.clone(), format!("expected ',', found '{}'", comma.content));
                    self.cursor.rewind();
                }

                let a_tok = self.cursor.next().clone();
                let a = self.parse_argument(&a_tok, ArgPosition::A);
                let (Some(a), Some(b)) = (a, b) else {
                    self.advance_to_newline();
                    return None;
                };
                (mnemonic, a, Some(b))
            }
        };

        let eol = self.cursor.next().clone();
        if !eol.is_newline() && !eol.is_eof() {
            self.logger.error(eol.location.clone(), format!("expected newline or end of file, found '{}'", eol.content));
            self.advance_to_newline();
        } else {
            self.cursor.rewind();
        }

        Some(StatementBody::Instruction { opcode, a, b })
    }

    fn parse_argument(&mut self, token: &Token, position: ArgPosition) -> Option<Argument> {
        if token.is_operator(Operator::Comma) || token.is_newline() || token.is_eof() {
            self.logger.error(token.location.clone(), "expected an instruction argument".to_string());
            return None;
        }

        if token.is_operator(Operator::LBracket) {
            return self.parse_indirect_argument(position);
        }

        if let TokenKind::StackOp(op) = token.kind {
            return self.parse_stack_argument(token, op, position);
        }

        let expr = self.parse_expr(token.clone(), AllowedFlags::DIRECT);
        Some(Argument::Expression(ExprArgument::direct(expr)))
    }

    fn parse_indirect_argument(&mut self, position: ArgPosition) -> Option<Argument> {
        let inner = self.cursor.next().clone();
        let expr = self.parse_expr(inner, AllowedFlags::INDIRECT);

        let closing = self.cursor.next().clone();
        if !closing.is_operator(Operator::RBracket) {
            self.cursor.rewind();
            self.logger.error(closing.location.clone(), format!("expected ']', found '{}'", closing.content));
            return None;
        }

        let _ = position;
        Some(Argument::Expression(ExprArgument::indirect(expr)))
    }

    fn parse_stack_argument(&mut self, token: &Token, op: StackOp, position: ArgPosition) -> Option<Argument> {
        if op == StackOp::Pick {
            let next = self.cursor.next().clone();
            let offset = self.parse_expr(next, AllowedFlags::CONSTANT);
            return Some(Argument::Pick(offset));
        }

        if op == StackOp::Push && position == ArgPosition::A {
            self.logger.error_from(&crate::errors::AssemblyError::PushInPositionA { location: token.location.clone() });
        } else if op == StackOp::Pop && position == ArgPosition::B {
            self.logger.error_from(&crate::errors::AssemblyError::PopInPositionB { location: token.location.clone() });
        }

        let kind = match op {
            StackOp::Push => crate::ast::StackArgKind::Push,
            StackOp::Pop => crate::ast::StackArgKind::Pop,
            StackOp::Peek => crate::ast::StackArgKind::Peek,
            StackOp::Pick => unreachable!("handled above"),
        };
        Some(Argument::Stack(kind))
    }

    fn parse_directive(&mut self, token: &Token, has_label: bool) -> Option<StatementBody> {
        let directive = match token.kind {
            TokenKind::Directive(d) => d,
            _ => return None,
        };

        let org_already_passed = self.instructions_or_labels_found();
        let body = match directive {
            Directive::Dw | Directive::Dat => directives::parse_data(self, false),
            Directive::Db | Directive::Dp => directives::parse_data(self, true),
            Directive::Org => directives::parse_org(self, token, org_already_passed),
            Directive::Equ => directives::parse_equ(self, token, has_label),
            Directive::Fill => directives::parse_fill(self),
            Directive::Align => directives::parse_align(self, token),
        };

        let eol = self.cursor.next().clone();
        if !eol.is_newline() && !eol.is_eof() {
            self.logger.error(eol.location.clone(), format!("expected a newline, found '{}'", eol.content));
            self.advance_to_newline();
        } else {
            self.cursor.rewind();
        }

        Some(body)
    }

    /// `first` must be the token most recently returned by `self.cursor.next()`;
    /// rewinding once puts the cursor back in front of it so the expression
    /// parser's own `next()` call re-consumes it.
    fn parse_expr(&mut self, first: Token, allowed: AllowedFlags) -> Expr {
        let _ = &first;
        self.cursor.rewind();
        let mut expr_parser = ExprParser::new(&mut self.cursor, self.logger, allowed);
        expr_parser.parse()
    }

    fn advance_to_newline(&mut self) {
        self.advance_until(|t| t.is_newline() || t.is_eof());
    }

    fn advance_until(&mut self, predicate: impl Fn(&Token) -> bool) {
        while !predicate(self.cursor.peek()) {
            self.cursor.next();
        }
    }

    pub(crate) fn logger(&mut self) -> &mut Log {
        self.logger
    }

    pub(crate) fn next_token(&mut self) -> Token {
        self.cursor.next().clone()
    }

    pub(crate) fn rewind(&mut self) {
        self.cursor.rewind();
    }

    pub(crate) fn instructions_or_labels_found(&self) -> bool {
        self.instructions_found > 0 || self.labels_found > 0
    }

    pub(crate) fn parse_expression(&mut self, first: Token, allowed: AllowedFlags) -> Expr {
        self.parse_expr(first, allowed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArgPosition {
    A,
    B,
}
