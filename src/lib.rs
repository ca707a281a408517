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

pub mod ast;
pub mod compress;
pub mod decode;
pub mod diagnostics;
pub mod emulator;
pub mod encode;
pub mod errors;
pub mod eval;
pub mod file_reader;
pub mod lexer;
pub mod objfile;
pub mod parser;
pub mod symbols;
pub mod token;

use ast::Statement;
use diagnostics::Log;
use symbols::SymbolTable;

/// Everything the assembler produced from one source file: the object
/// words (empty if any error occurred), the final AST and symbol
/// table (for `--ast-print`/`--symbols-print`), and the accumulated log.
pub struct AssembleOutput {
    pub words: Vec<u16>,
    pub statements: Vec<Statement>,
    pub symtab: SymbolTable,
    pub log: Log,
}

/// Runs the full pipeline: lex, parse, expand pseudo-ops, compress,
/// encode. Mirrors the stage order lexer → parser → compression loop →
/// encoder; nothing here re-derives what those modules already decide.
pub fn assemble(source: &str, source_name: &str) -> AssembleOutput {
    let mut log = Log::new();

    let tokens = lexer::Lexer::new(source, source_name, &mut log).lex_all();
    let mut statements = parser::Parser::new(&tokens, &mut log).parse();
    ast::expand_pseudo_ops(&mut statements);

    let mut symtab = SymbolTable::new();
    let result = compress::compress(&statements, &mut symtab, &mut log);

    let words = if log.has_errors() {
        Vec::new()
    } else {
        encode::encode(&statements, &symtab, &result.hints, &mut log)
    };

    AssembleOutput { words, statements, symtab, log }
}

/// Disassembles a full word stream into one decoded-instruction line
/// per instruction, skipping past whatever extension words each
/// instruction consumes. Stops at the first undecodable opcode but
/// still returns everything decoded before it, alongside the error.
pub fn disassemble(words: &[u16], radix: decode::Radix) -> (Vec<decode::DecodedInstruction>, Option<errors::EmulatorError>) {
    let mut out = Vec::new();
    let mut pc = 0usize;

    while pc < words.len() {
        match decode::decode_one(&words[pc..], radix) {
            Ok(instr) => {
                pc += instr.words.max(1) as usize;
                out.push(instr);
            }
            Err(err) => return (out, Some(err)),
        }
    }

    (out, None)
}
