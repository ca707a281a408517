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

use std::rc::Rc;

use crate::ast::{Mnemonic, Register};
use crate::diagnostics::Log;
use crate::token::{Directive, LabelForm, Operator, QuoteStyle, SourceLocation, StackOp, Token, TokenKind};

/// Produces a finite, non-restartable lazy sequence of tokens from
/// source text. `next_token` is the only entry point a parser needs;
/// the whole stream can also be materialized up front with `lex_all`.
pub struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    source: Rc<str>,
    line: usize,
    column: usize,
    logger: &'a mut Log,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(content: &str, source_name: &str, logger: &'a mut Log) -> Self {
        Lexer {
            chars: content.chars().collect(),
            pos: 0,
            source: Rc::from(source_name),
            line: 1,
            column: 0,
            logger,
            finished: false,
        }
    }

    pub fn lex_all(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let eof = token.is_eof();
            tokens.push(token);
            if eof {
                break;
            }
        }
        tokens
    }

    fn peek_char(&self) -> char {
        self.chars.get(self.pos).copied().unwrap_or('\0')
    }

    fn next_char(&mut self) -> char {
        let c = self.peek_char();
        if self.pos < self.chars.len() {
            self.pos += 1;
        }
        self.column += 1;
        c
    }

    fn move_back(&mut self) {
        if self.pos > 0 {
            self.pos -= 1;
        }
        self.column -= 1;
    }

    fn consume_next_if(&mut self, c: char) -> bool {
        if self.pos >= self.chars.len() {
            return false;
        }
        if self.next_char() == c {
            true
        } else {
            self.move_back();
            false
        }
    }

    fn next_line(&mut self) {
        self.line += 1;
        self.column = 0;
    }

    fn make_location(&self) -> SourceLocation {
        SourceLocation::new(self.source.clone(), self.line, self.column)
    }

    fn is_identifier_first_char(c: char) -> bool {
        c.is_alphabetic() || c == '_' || c == '?' || c == '.'
    }

    fn is_identifier_char(c: char) -> bool {
        c.is_alphanumeric() || matches!(c, '_' | '?' | '.' | '$' | '#' | '@')
    }

    /// Skips whitespace (other than newline) and `;`-to-end-of-line
    /// comments.
    fn skip(&mut self) {
        loop {
            let c = self.peek_char();
            if c == ';' {
                while self.peek_char() != '\n' && self.pos < self.chars.len() {
                    self.pos += 1;
                    self.column += 1;
                }
            } else if c != '\n' && c.is_whitespace() {
                self.pos += 1;
                self.column += 1;
            } else {
                break;
            }
        }
    }

    fn append_while(&mut self, initial: char, predicate: impl Fn(char) -> bool) -> String {
        let mut content = String::new();
        if initial != '\0' {
            content.push(initial);
        }
        while self.pos < self.chars.len() {
            let c = self.next_char();
            if !predicate(c) {
                self.move_back();
                break;
            }
            content.push(c);
        }
        content
    }

    pub fn next_token(&mut self) -> Token {
        if self.finished {
            return Token::new(TokenKind::EndOfInput, "end of file", self.make_location());
        }

        self.skip();

        if self.pos >= self.chars.len() {
            self.finished = true;
            return Token::new(TokenKind::EndOfInput, "end of file", self.make_location());
        }

        let start = self.make_location();
        let c = self.next_char();

        if c == '<' {
            if self.consume_next_if('<') {
                return Token::new(TokenKind::Operator(Operator::Shl), "<<", start);
            } else if self.consume_next_if('=') {
                return Token::new(TokenKind::Operator(Operator::Le), "<=", start);
            } else if self.consume_next_if('>') {
                return Token::new(TokenKind::Operator(Operator::Ne2), "<>", start);
            }
            return Token::new(TokenKind::Operator(Operator::Lt), "<", start);
        } else if c == '>' {
            if self.consume_next_if('>') {
                return Token::new(TokenKind::Operator(Operator::Shr), ">>", start);
            } else if self.consume_next_if('=') {
                return Token::new(TokenKind::Operator(Operator::Ge), ">=", start);
            }
            return Token::new(TokenKind::Operator(Operator::Gt), ">", start);
        } else if c == '=' && self.consume_next_if('=') {
            return Token::new(TokenKind::Operator(Operator::EqEq), "==", start);
        } else if c == '!' && self.consume_next_if('=') {
            return Token::new(TokenKind::Operator(Operator::Ne), "!=", start);
        } else if c == '&' && self.consume_next_if('&') {
            return Token::new(TokenKind::Operator(Operator::AndAnd), "&&", start);
        } else if c == '|' && self.consume_next_if('|') {
            return Token::new(TokenKind::Operator(Operator::OrOr), "||", start);
        } else if c == '\'' {
            return self.parse_character_literal(start);
        } else if c == '"' {
            let content = self.parse_quoted_string(&start, '"');
            return Token::new(TokenKind::QuotedString(QuoteStyle::Double), content, start);
        } else if c == ':' && Self::is_identifier_first_char(self.peek_char()) {
            let name = self.append_while_from_next(Self::is_identifier_char);
            return Token::new(TokenKind::Label(LabelForm::Prefix), name, start);
        } else if c == '$' && Self::is_identifier_first_char(self.peek_char()) {
            let name = self.append_while_from_next(Self::is_identifier_char);
            return Token::new(TokenKind::Symbol { forced: true }, name, start);
        } else if c == '$' {
            return Token::new(TokenKind::CurrentPosition, "$", start);
        } else if Self::is_identifier_first_char(c) {
            let identifier = self.append_while(c, Self::is_identifier_char);
            if self.consume_next_if(':') {
                return Token::new(TokenKind::Label(LabelForm::Suffix), identifier, start);
            }
            return self.parse_identifier(start, identifier);
        } else if c.is_ascii_digit() {
            let raw = self.append_while(c, Self::is_identifier_char);
            return self.parse_number(start, raw);
        } else if c == '[' {
            let checkpoint = (self.pos, self.column);
            if let Some(token) = self.try_parse_stack_operation(&start) {
                return token;
            }
            self.pos = checkpoint.0;
            self.column = checkpoint.1;
            return Token::new(TokenKind::Operator(Operator::LBracket), "[", start);
        } else if c == ']' {
            return Token::new(TokenKind::Operator(Operator::RBracket), "]", start);
        } else if c == '(' {
            return Token::new(TokenKind::Operator(Operator::LParen), "(", start);
        } else if c == ')' {
            return Token::new(TokenKind::Operator(Operator::RParen), ")", start);
        } else if c == ',' {
            return Token::new(TokenKind::Operator(Operator::Comma), ",", start);
        } else if c == '+' {
            return Token::new(TokenKind::Operator(Operator::Plus), "+", start);
        } else if c == '-' {
            return Token::new(TokenKind::Operator(Operator::Minus), "-", start);
        } else if c == '*' {
            return Token::new(TokenKind::Operator(Operator::Star), "*", start);
        } else if c == '/' {
            return Token::new(TokenKind::Operator(Operator::Slash), "/", start);
        } else if c == '%' {
            return Token::new(TokenKind::Operator(Operator::Percent), "%", start);
        } else if c == '&' {
            return Token::new(TokenKind::Operator(Operator::Amp), "&", start);
        } else if c == '|' {
            return Token::new(TokenKind::Operator(Operator::Pipe), "|", start);
        } else if c == '^' {
            return Token::new(TokenKind::Operator(Operator::Caret), "^", start);
        } else if c == '!' {
            return Token::new(TokenKind::Operator(Operator::Bang), "!", start);
        } else if c == '~' {
            return Token::new(TokenKind::Operator(Operator::Tilde), "~", start);
        } else if c == '\n' {
            self.next_line();
            return Token::new(TokenKind::Newline, "newline", start);
        }

        Token::new(TokenKind::Character(c as u8), c.to_string(), start)
    }

    fn append_while_from_next(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let c = self.next_char();
        self.append_while(c, predicate)
    }

    fn parse_identifier(&mut self, start: SourceLocation, identifier: String) -> Token {
        if let Some(register) = Register::from_name(&identifier) {
            return Token::new(TokenKind::Register(register), identifier, start);
        }
        if let Some(mnemonic) = Mnemonic::from_name(&identifier) {
            return Token::new(TokenKind::Instruction(mnemonic), identifier, start);
        }
        if let Some(directive) = lookup_directive(&identifier) {
            return Token::new(TokenKind::Directive(directive), identifier, start);
        }
        if let Some(stack_op) = lookup_stack_operation(&identifier) {
            return Token::new(TokenKind::StackOp(stack_op), identifier, start);
        }
        Token::new(TokenKind::Symbol { forced: false }, identifier, start)
    }

    /// Speculative micro-scan for `[SP]`/`[SP++]`/`[--SP]`, tolerant of
    /// interior whitespace. Rewinds (via the checkpoint the caller
    /// took before calling this) on anything that doesn't match one of
    /// the three forms.
    fn try_parse_stack_operation(&mut self, start: &SourceLocation) -> Option<Token> {
        let mut content = String::from("[");

        loop {
            if self.pos >= self.chars.len() {
                return None;
            }
            self.skip();
            if self.pos >= self.chars.len() {
                return None;
            }
            let next = self.next_char();

            if next == ']' {
                content.push(next);
                break;
            } else if next == '\n' {
                return None;
            } else if next == '-' && self.consume_next_if('-') {
                content.push_str("--");
                continue;
            } else if next == '+' && self.consume_next_if('+') {
                content.push_str("++");
                continue;
            }
            content.push(next);
        }

        let upper = content.to_ascii_uppercase();
        if upper == "[SP]" {
            Some(Token::new(TokenKind::StackOp(StackOp::Peek), content, start.clone()))
        } else if upper == "[--SP]" {
            Some(Token::new(TokenKind::StackOp(StackOp::Push), content, start.clone()))
        } else if upper == "[SP++]" {
            Some(Token::new(TokenKind::StackOp(StackOp::Pop), content, start.clone()))
        } else {
            None
        }
    }

    fn parse_character_literal(&mut self, start: SourceLocation) -> Token {
        let content = self.parse_quoted_string(&start, '\'');
        if content.is_empty() {
            self.logger
                .warning(start.clone(), "empty character literal; assuming null terminator");
            return Token::new(TokenKind::Integer(0), content, start);
        }
        if content.chars().count() > 1 {
            self.logger.error(start.clone(), "multi-byte character literal");
        }
        let value = content.as_bytes()[0];
        Token::new(TokenKind::Integer(value as u32), content, start)
    }

    fn parse_quoted_string(&mut self, start: &SourceLocation, end_quote: char) -> String {
        let mut result = String::new();

        while self.pos < self.chars.len() {
            let c = self.next_char();
            if c == '\n' {
                break;
            }
            if c == end_quote {
                return result;
            }
            if c == '\\' {
                if let Some(escaped) = self.parse_escape_sequence() {
                    result.push(escaped as char);
                }
            } else {
                if c as u32 > 0x7f {
                    self.logger
                        .warning(self.make_location(), format!("invalid 7-bit ASCII character '{c}'"));
                }
                result.push(c);
            }
        }

        let kind = if end_quote == '\'' { "character" } else { "string" };
        self.logger.error(start.clone(), format!("unterminated {kind} literal"));
        result
    }

    fn parse_escape_sequence(&mut self) -> Option<u8> {
        if self.pos >= self.chars.len() {
            return None;
        }
        let c = self.next_char();
        Some(match c {
            '\'' => b'\'',
            '"' => b'"',
            '?' => b'?',
            '\\' => b'\\',
            '0' => 0,
            'a' => 0x07,
            'b' => 0x08,
            'f' => 0x0c,
            'n' => b'\n',
            'r' => b'\r',
            't' => b'\t',
            'v' => 0x0b,
            'x' | 'X' => {
                let first = self.next_char();
                if !first.is_ascii_hexdigit() {
                    self.logger.error(
                        self.make_location(),
                        format!("invalid hex digit '{first}' following hex escape"),
                    );
                    self.move_back();
                    return Some(0);
                }
                let mut value = first.to_digit(16).unwrap() as u8;
                if self.peek_char().is_ascii_hexdigit() {
                    let second = self.next_char();
                    value = value * 16 + second.to_digit(16).unwrap() as u8;
                }
                if value & 0x80 != 0 {
                    self.logger
                        .warning(self.make_location(), format!("invalid 7-bit ASCII character '{value:#04x}'"));
                }
                value
            }
            other => {
                self.logger
                    .error(self.make_location(), format!("unrecognized escape character '{other}'"));
                other as u8
            }
        })
    }

    fn parse_number(&mut self, start: SourceLocation, raw: String) -> Token {
        let (base, unprefixed) = if raw.len() > 2 && raw[..2].eq_ignore_ascii_case("0x") {
            (16, &raw[2..])
        } else if raw.len() > 2 && raw[..2].eq_ignore_ascii_case("0o") {
            (8, &raw[2..])
        } else if raw.len() > 2 && raw[..2].eq_ignore_ascii_case("0b") {
            (2, &raw[2..])
        } else {
            (10, raw.as_str())
        };

        if unprefixed.is_empty() {
            return Token::new(TokenKind::InvalidInteger, raw, start);
        }

        match u64::from_str_radix(unprefixed, base) {
            Ok(value) if value <= u32::MAX as u64 => Token::new(TokenKind::Integer(value as u32), raw, start),
            Ok(_) => {
                self.logger
                    .warning(start.clone(), format!("overflow converting '{raw}' to a 32-bit integer"));
                Token::new(TokenKind::Integer(u32::MAX), raw, start)
            }
            Err(_) => Token::new(TokenKind::InvalidInteger, raw, start),
        }
    }
}

fn lookup_directive(name: &str) -> Option<Directive> {
    Some(match name.to_ascii_lowercase().as_str() {
        ".org" => Directive::Org,
        ".dw" => Directive::Dw,
        ".dat" | "dat" => Directive::Dat,
        ".db" => Directive::Db,
        ".dp" => Directive::Dp,
        ".fill" => Directive::Fill,
        ".equ" => Directive::Equ,
        ".align" => Directive::Align,
        _ => return None,
    })
}

fn lookup_stack_operation(name: &str) -> Option<StackOp> {
    Some(match name.to_ascii_uppercase().as_str() {
        "PUSH" => StackOp::Push,
        "POP" => StackOp::Pop,
        "PEEK" => StackOp::Peek,
        "PICK" => StackOp::Pick,
        _ => return None,
    })
}
