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
use std::rc::Rc;

use crate::ast::Register;

/// A (source-name, line, column) triple. Attached to every token, AST
/// node, and symbol, and propagated into every diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub source: Rc<str>,
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(source: Rc<str>, line: usize, column: usize) -> Self {
        SourceLocation { source, line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source, self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelForm {
    /// `name:`
    Suffix,
    /// `:name`
    Prefix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackOp {
    Push,
    Pop,
    Peek,
    Pick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    Ne,
    Ne2, // `<>`, a synonym for `!=` accepted by the lexer
    AndAnd,
    OrOr,
    Amp,
    Pipe,
    Caret,
    Bang,
    Tilde,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    Double,
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Directive(Directive),
    Instruction(crate::ast::Mnemonic),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Org,
    Dw,
    Dat,
    Db,
    Dp,
    Fill,
    Equ,
    Align,
}

/// The tag half of a token. `Token::content` carries the raw lexeme;
/// kind-specific data that isn't already text lives in the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Label(LabelForm),
    /// A bare identifier or a `$`-prefixed forced-symbol reference.
    Symbol { forced: bool },
    Directive(Directive),
    Instruction(crate::ast::Mnemonic),
    Register(Register),
    StackOp(StackOp),
    Integer(u32),
    InvalidInteger,
    Operator(Operator),
    QuotedString(QuoteStyle),
    /// A character literal; payload is the single evaluated ASCII value.
    Character(u8),
    /// `$` used on its own to mean "current output position".
    CurrentPosition,
    Newline,
    EndOfInput,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub content: String,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, content: impl Into<String>, location: SourceLocation) -> Self {
        Token { kind, content: content.into(), location }
    }

    pub fn is_operator(&self, op: Operator) -> bool {
        matches!(self.kind, TokenKind::Operator(o) if o == op)
    }

    pub fn is_newline(&self) -> bool {
        matches!(self.kind, TokenKind::Newline)
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::EndOfInput)
    }

    pub fn register(&self) -> Option<Register> {
        match self.kind {
            TokenKind::Register(r) => Some(r),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.content)
    }
}
