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

use bitflags::bitflags;

use crate::ast::{BinaryOp, Expr, Register, UnaryOp};
use crate::diagnostics::Log;
use crate::token::{Operator, SourceLocation, Token, TokenKind};

use super::cursor::TokenCursor;

bitflags! {
    /// Bitmask of which operands the statement parser allows at the
    /// current position; passed down into the expression parser so a
    /// single precedence-climbing implementation serves every context.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AllowedFlags: u32 {
        const REGISTER_A = 1 << 0;
        const REGISTER_B = 1 << 1;
        const REGISTER_C = 1 << 2;
        const REGISTER_X = 1 << 3;
        const REGISTER_Y = 1 << 4;
        const REGISTER_Z = 1 << 5;
        const REGISTER_I = 1 << 6;
        const REGISTER_J = 1 << 7;
        const REGISTER_SP = 1 << 8;
        const REGISTER_PC = 1 << 9;
        const REGISTER_EX = 1 << 10;
        const REGISTER_EXPRESSIONS = 1 << 11;
        const SYMBOL = 1 << 12;
        const CURRENT_POSITION = 1 << 13;
    }
}

impl AllowedFlags {
    pub const CONSTANT: AllowedFlags = AllowedFlags::SYMBOL.union(AllowedFlags::CURRENT_POSITION);

    pub const INDIRECT: AllowedFlags = AllowedFlags::REGISTER_A
        .union(AllowedFlags::REGISTER_B)
        .union(AllowedFlags::REGISTER_C)
        .union(AllowedFlags::REGISTER_X)
        .union(AllowedFlags::REGISTER_Y)
        .union(AllowedFlags::REGISTER_Z)
        .union(AllowedFlags::REGISTER_I)
        .union(AllowedFlags::REGISTER_J)
        .union(AllowedFlags::REGISTER_SP)
        .union(AllowedFlags::REGISTER_EXPRESSIONS)
        .union(AllowedFlags::CONSTANT);

    pub const DIRECT: AllowedFlags = AllowedFlags::REGISTER_A
        .union(AllowedFlags::REGISTER_B)
        .union(AllowedFlags::REGISTER_C)
        .union(AllowedFlags::REGISTER_X)
        .union(AllowedFlags::REGISTER_Y)
        .union(AllowedFlags::REGISTER_Z)
        .union(AllowedFlags::REGISTER_I)
        .union(AllowedFlags::REGISTER_J)
        .union(AllowedFlags::REGISTER_SP)
        .union(AllowedFlags::REGISTER_PC)
        .union(AllowedFlags::REGISTER_EX)
        .union(AllowedFlags::CONSTANT);

    fn register_flag(register: Register) -> AllowedFlags {
        match register {
            Register::A => AllowedFlags::REGISTER_A,
            Register::B => AllowedFlags::REGISTER_B,
            Register::C => AllowedFlags::REGISTER_C,
            Register::X => AllowedFlags::REGISTER_X,
            Register::Y => AllowedFlags::REGISTER_Y,
            Register::Z => AllowedFlags::REGISTER_Z,
            Register::I => AllowedFlags::REGISTER_I,
            Register::J => AllowedFlags::REGISTER_J,
            Register::Sp => AllowedFlags::REGISTER_SP,
            Register::Pc => AllowedFlags::REGISTER_PC,
            Register::Ex => AllowedFlags::REGISTER_EX,
            Register::Ia => AllowedFlags::empty(),
        }
    }
}

struct RegisterLocation {
    register: Register,
    location: SourceLocation,
}

/// Precedence-climbing parser for the standard C-family ladder, lowest
/// to highest: `||`, `&&`, `|`, `^`, `&`, `== !=`, `< <= > >=`, `<< >>`,
/// `+ -`, `* / %`, unary `+ - ! ~`, primary.
///
/// `<` means LT and `>` means GT (not the inverted mapping some older
/// assemblers for this family use).
pub struct ExprParser<'a, 'c> {
    cursor: &'a mut TokenCursor<'c>,
    logger: &'a mut Log,
    allowed: AllowedFlags,
    first_register: Option<RegisterLocation>,
}

impl<'a, 'c> ExprParser<'a, 'c> {
    pub fn new(cursor: &'a mut TokenCursor<'c>, logger: &'a mut Log, allowed: AllowedFlags) -> Self {
        ExprParser { cursor, logger, allowed, first_register: None }
    }

    pub fn parse(&mut self) -> Expr {
        self.parse_boolean_or()
    }

    fn parse_boolean_or(&mut self) -> Expr {
        self.parse_binary(Self::parse_boolean_and, &[(Operator::OrOr, BinaryOp::Or)])
    }

    fn parse_boolean_and(&mut self) -> Expr {
        self.parse_binary(Self::parse_bitwise_or, &[(Operator::AndAnd, BinaryOp::And)])
    }

    fn parse_bitwise_or(&mut self) -> Expr {
        self.parse_binary(Self::parse_bitwise_xor, &[(Operator::Pipe, BinaryOp::BitOr)])
    }

    fn parse_bitwise_xor(&mut self) -> Expr {
        self.parse_binary(Self::parse_bitwise_and, &[(Operator::Caret, BinaryOp::BitXor)])
    }

    fn parse_bitwise_and(&mut self) -> Expr {
        self.parse_binary(Self::parse_relational_equals, &[(Operator::Amp, BinaryOp::BitAnd)])
    }

    fn parse_relational_equals(&mut self) -> Expr {
        self.parse_binary(
            Self::parse_relational_order,
            &[(Operator::EqEq, BinaryOp::Eq), (Operator::Ne, BinaryOp::Ne), (Operator::Ne2, BinaryOp::Ne)],
        )
    }

    fn parse_relational_order(&mut self) -> Expr {
        self.parse_binary(
            Self::parse_bitwise_shift,
            &[
                (Operator::Lt, BinaryOp::Lt),
                (Operator::Le, BinaryOp::Le),
                (Operator::Gt, BinaryOp::Gt),
                (Operator::Ge, BinaryOp::Ge),
            ],
        )
    }

    fn parse_bitwise_shift(&mut self) -> Expr {
        self.parse_binary(Self::parse_add, &[(Operator::Shl, BinaryOp::Shl), (Operator::Shr, BinaryOp::Shr)])
    }

    fn parse_add(&mut self) -> Expr {
        self.parse_binary(Self::parse_multiply, &[(Operator::Plus, BinaryOp::Add), (Operator::Minus, BinaryOp::Sub)])
    }

    fn parse_multiply(&mut self) -> Expr {
        self.parse_binary(
            Self::parse_unary,
            &[(Operator::Star, BinaryOp::Mul), (Operator::Slash, BinaryOp::Div), (Operator::Percent, BinaryOp::Mod)],
        )
    }

    fn parse_binary(&mut self, next: fn(&mut Self) -> Expr, operators: &[(Operator, BinaryOp)]) -> Expr {
        let mut left = next(self);

        loop {
            let token = self.cursor.peek().clone();
            let matched = operators.iter().find(|(op, _)| token.is_operator(*op));
            let Some((_, binary_op)) = matched else {
                break;
            };
            self.cursor.next();

            let right = next(self);
            left = self.combine(*binary_op, left, right, &token.location);
        }

        left
    }

    fn combine(&mut self, op: BinaryOp, left: Expr, right: Expr, location: &SourceLocation) -> Expr {
        let left_ok = (op.allows_register_left() && self.register_expressions_allowed()) || evaluates_to_literal(&left);
        let right_ok =
            (op.allows_register_right() && self.register_expressions_allowed()) || evaluates_to_literal(&right);

        if !left_ok || !right_ok || left.is_invalid() || right.is_invalid() {
            if !left.is_invalid() && !right.is_invalid() {
                self.logger
                    .error(location.clone(), format!("non-constant operands for operator '{}'", op_symbol(op)));
            }
            return Expr::Invalid;
        }

        Expr::Binary(op, Box::new(left), Box::new(right))
    }

    fn parse_unary(&mut self) -> Expr {
        let token = self.cursor.peek().clone();
        let unary_op = match token.kind {
            TokenKind::Operator(Operator::Plus) => UnaryOp::Plus,
            TokenKind::Operator(Operator::Minus) => UnaryOp::Minus,
            TokenKind::Operator(Operator::Tilde) => UnaryOp::BitNot,
            TokenKind::Operator(Operator::Bang) => UnaryOp::Not,
            _ => return self.parse_primary(),
        };
        self.cursor.next();

        let operand = self.parse_unary();
        if !evaluates_to_literal(&operand) {
            self.logger.error(
                token.location.clone(),
                format!("non-constant operand for unary operator '{}'", unary_symbol(unary_op)),
            );
            return Expr::Invalid;
        }

        Expr::Unary(unary_op, Box::new(operand))
    }

    fn parse_primary(&mut self) -> Expr {
        let token = self.cursor.next().clone();

        match &token.kind {
            TokenKind::Operator(Operator::LParen) => self.parse_grouping(),
            TokenKind::Register(register) => self.parse_register(*register, &token.location),
            TokenKind::Symbol { .. } => self.parse_symbol(&token),
            TokenKind::Integer(value) => Expr::Literal(*value),
            TokenKind::CurrentPosition => {
                if !self.current_position_allowed() {
                    self.logger.error(token.location.clone(), "'$' is not allowed here".to_string());
                    return Expr::Invalid;
                }
                Expr::CurrentPosition
            }
            _ => {
                self.cursor.rewind();
                self.logger
                    .error(token.location.clone(), format!("expected a primary expression before '{}'", token.content));
                Expr::Invalid
            }
        }
    }

    fn parse_grouping(&mut self) -> Expr {
        let expr = self.parse();
        let closing = self.cursor.next();
        if !closing.is_operator(Operator::RParen) {
            self.cursor.rewind();
            self.logger.error(closing.location.clone(), format!("unexpected token '{}'; expected ')'", closing.content));
        }
        expr
    }

    fn parse_register(&mut self, register: Register, location: &SourceLocation) -> Expr {
        if !self.register_allowed(register) {
            self.logger.error(location.clone(), format!("register '{register}' is not allowed here"));
            return Expr::Invalid;
        }

        if let Some(first) = &self.first_register {
            self.logger.error(
                location.clone(),
                format!("multiple registers in expression; first register '{}' at {}", first.register, first.location),
            );
            return Expr::Invalid;
        }

        self.first_register = Some(RegisterLocation { register, location: location.clone() });
        Expr::Register(register)
    }

    fn parse_symbol(&mut self, token: &Token) -> Expr {
        if !self.symbols_allowed() {
            self.logger.error(token.location.clone(), "symbols are not allowed here".to_string());
            return Expr::Invalid;
        }
        Expr::Symbol(token.content.clone())
    }

    fn register_allowed(&self, register: Register) -> bool {
        self.allowed.contains(AllowedFlags::register_flag(register))
    }

    fn register_expressions_allowed(&self) -> bool {
        self.allowed.contains(AllowedFlags::REGISTER_EXPRESSIONS)
    }

    fn symbols_allowed(&self) -> bool {
        self.allowed.contains(AllowedFlags::SYMBOL)
    }

    fn current_position_allowed(&self) -> bool {
        self.allowed.contains(AllowedFlags::CURRENT_POSITION)
    }
}

/// A rough literal-ness check used only to police operator legality
/// during parsing (before any symbol is resolved); symbols and `$`
/// count as "will evaluate to a literal" since they aren't registers.
fn evaluates_to_literal(expr: &Expr) -> bool {
    !matches!(expr, Expr::Register(_))
}

fn unary_symbol(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Plus => "+",
        UnaryOp::Minus => "-",
        UnaryOp::Not => "!",
        UnaryOp::BitNot => "~",
    }
}

fn op_symbol(op: BinaryOp) -> &'static str {
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
