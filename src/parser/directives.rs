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

use crate::ast::{Expr, StatementBody};
use crate::token::{Operator, Token, TokenKind};

use super::expr_parser::AllowedFlags;
use super::Parser;

/// `.dw`/`.dat` (`packed = false`) produce one expression per output
/// word; `.db`/`.dp` (`packed = true`) produce one expression per
/// output byte, packed two-to-a-word at encode time. A quoted string
/// argument contributes one expression per character either way.
pub(super) fn parse_data(parser: &mut Parser<'_, '_>, packed: bool) -> StatementBody {
    let mut values = Vec::new();

    loop {
        let token = parser.next_token();
        match &token.kind {
            TokenKind::QuotedString(_) => {
                values.extend(token.content.chars().map(|c| Expr::Literal(c as u32)));
            }
            TokenKind::Integer(value) => {
                let limit = if packed { u8::MAX as u32 } else { u16::MAX as u32 };
                if *value > limit {
                    let width = if packed { "8-bit" } else { "16-bit" };
                    parser.logger().warning(token.location.clone(), format!("overflow in converting to {width} integer"));
                }
                values.push(Expr::Literal(*value));
            }
            _ => {
                parser.rewind();
                let expr = parser.parse_expression(token, AllowedFlags::CONSTANT);
                values.push(expr);
            }
        }

        let separator = parser.next_token();
        if !separator.is_operator(Operator::Comma) {
            parser.rewind();
            break;
        }
    }

    if values.is_empty() {
        let here = parser.next_token();
        parser.logger().warning(here.location.clone(), "empty data segment".to_string());
        parser.rewind();
    }

    if packed {
        StatementBody::DataBytes(values)
    } else {
        StatementBody::Data(values)
    }
}

pub(super) fn parse_org(parser: &mut Parser<'_, '_>, directive_token: &Token, already_passed: bool) -> StatementBody {
    if already_passed {
        parser
            .logger()
            .error(directive_token.location.clone(), ".ORG must occur before all labels and instructions".to_string());
    }

    let token = parser.next_token();
    let expr = parser.parse_expression(token, AllowedFlags::SYMBOL.union(AllowedFlags::CURRENT_POSITION));
    StatementBody::Org(expr)
}

pub(super) fn parse_equ(parser: &mut Parser<'_, '_>, directive_token: &Token, has_label: bool) -> StatementBody {
    if !has_label {
        parser.logger().error(directive_token.location.clone(), ".EQU must be preceded by a label".to_string());
    }

    let token = parser.next_token();
    let expr = parser.parse_expression(token, AllowedFlags::CONSTANT);
    StatementBody::Equ(expr)
}

pub(super) fn parse_fill(parser: &mut Parser<'_, '_>) -> StatementBody {
    let count_token = parser.next_token();
    let count = parser.parse_expression(count_token, AllowedFlags::CONSTANT);

    let separator = parser.next_token();
    if separator.is_operator(Operator::Comma) {
        let value_token = parser.next_token();
        let value = parser.parse_expression(value_token, AllowedFlags::CONSTANT);
        StatementBody::Fill { count, value }
    } else {
        if !separator.is_newline() && !separator.is_eof() {
            parser.logger().error(separator.location.clone(), format!("expected ',' or newline, found '{}'", separator.content));
        }
        parser.rewind();
        StatementBody::Fill { count, value: Expr::Literal(0) }
    }
}

pub(super) fn parse_align(parser: &mut Parser<'_, '_>, directive_token: &Token) -> StatementBody {
    let token = parser.next_token();
    let expr = parser.parse_expression(token, AllowedFlags::SYMBOL.union(AllowedFlags::CURRENT_POSITION));
    if let Expr::Literal(value) = &expr {
        if *value == 0 {
            parser.logger().error(directive_token.location.clone(), "align boundary must be greater than zero".to_string());
        } else if *value == 1 {
            parser.logger().warning(directive_token.location.clone(), "align boundary of one has no effect".to_string());
        }
    }
    StatementBody::Align(expr)
}
