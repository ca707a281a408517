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

use crate::token::Token;

/// A simple rewindable cursor over an already-lexed token stream.
/// Statements are newline-terminated and the token stream is finite
/// and not restartable by design, so a plain index into a materialized
/// `Vec<Token>` is enough; there is no need for the lexer's own
/// speculative-scan machinery here.
pub struct TokenCursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        TokenCursor { tokens, pos: 0 }
    }

    pub fn peek(&self) -> &'a Token {
        self.tokens.get(self.pos).unwrap_or_else(|| self.tokens.last().expect("token stream always has EOF"))
    }

    pub fn next(&mut self) -> &'a Token {
        let tok = self.peek();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    pub fn rewind(&mut self) {
        if self.pos > 0 {
            self.pos -= 1;
        }
    }

    pub fn at_eof(&self) -> bool {
        self.peek().is_eof()
    }
}
