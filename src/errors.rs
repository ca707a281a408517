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

use thiserror::Error;

use crate::token::SourceLocation;

/// Errors surfaced by the lexer, parser, and resolver. These are
/// accumulated into `diagnostics::Log` rather than aborting the pass;
/// see `errors.rs`'s sibling `diagnostics.rs` for the recovery model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssemblyError {
    #[error("{location}: unterminated {kind}")]
    UnterminatedLiteral { location: SourceLocation, kind: &'static str },

    #[error("{location}: invalid escape sequence '\\{ch}'")]
    BadEscape { location: SourceLocation, ch: char },

    #[error("{location}: unexpected token '{found}'{}", expected.as_ref().map(|e| format!(", expected {e}")).unwrap_or_default())]
    UnexpectedToken { location: SourceLocation, found: String, expected: Option<String> },

    #[error("{location}: non-constant operand for operator '{op}'")]
    NonConstantOperand { location: SourceLocation, op: String },

    #[error("{location}: symbols are not allowed here")]
    SymbolNotAllowed { location: SourceLocation },

    #[error("{location}: register '{register}' is not allowed here")]
    RegisterNotAllowed { location: SourceLocation, register: String },

    #[error("{location}: register '{register}' is not indirectable")]
    RegisterNotIndirectable { location: SourceLocation, register: String },

    #[error("{location}: multiple registers in expression; first register '{first}' at {first_location}")]
    MultipleRegisters { location: SourceLocation, first: String, first_location: SourceLocation },

    #[error("{location}: duplicate symbol '{name}'")]
    DuplicateSymbol { location: SourceLocation, name: String },

    #[error("{location}: undefined symbol '{name}'")]
    UndefinedSymbol { location: SourceLocation, name: String },

    #[error("{location}: local label '{name}' declared before any global label")]
    OrphanLocalLabel { location: SourceLocation, name: String },

    #[error("{location}: .org must precede any instruction or label")]
    OrgOutOfPosition { location: SourceLocation },

    #[error("{location}: .org address may not be negative")]
    NegativeOrg { location: SourceLocation },

    #[error("{location}: .equ must be preceded by a label")]
    EquWithoutLabel { location: SourceLocation },

    #[error("{location}: PUSH is illegal in operand position A")]
    PushInPositionA { location: SourceLocation },

    #[error("{location}: POP is illegal in operand position B")]
    PopInPositionB { location: SourceLocation },

    #[error("output exceeds 65,535 words")]
    OutputOverflow { location: SourceLocation },

    #[error("compression loop exceeded its iteration ceiling")]
    CompressionDidNotConverge,

    #[error("{location}: '$' could not be resolved at compile time")]
    UnresolvedCurrentPosition { location: SourceLocation },
}

impl AssemblyError {
    pub fn location(&self) -> &SourceLocation {
        use AssemblyError::*;
        match self {
            UnterminatedLiteral { location, .. }
            | BadEscape { location, .. }
            | UnexpectedToken { location, .. }
            | NonConstantOperand { location, .. }
            | SymbolNotAllowed { location }
            | RegisterNotAllowed { location, .. }
            | RegisterNotIndirectable { location, .. }
            | MultipleRegisters { location, .. }
            | DuplicateSymbol { location, .. }
            | UndefinedSymbol { location, .. }
            | OrphanLocalLabel { location, .. }
            | OrgOutOfPosition { location }
            | NegativeOrg { location }
            | EquWithoutLabel { location }
            | PushInPositionA { location }
            | PopInPositionB { location }
            | OutputOverflow { location }
            | UnresolvedCurrentPosition { location } => location,
            CompressionDidNotConverge => {
                panic!("CompressionDidNotConverge has no single location; use diagnostics::Log directly")
            }
        }
    }
}

/// Errors raised while executing a running machine image.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmulatorError {
    #[error("invalid basic opcode: {0:#04x}")]
    InvalidBasicOpcode(u8),

    #[error("invalid special opcode: {0:#04x}")]
    InvalidSpecialOpcode(u8),

    #[error("program image exceeds the 65,536-word address space")]
    ImageTooLarge,

    #[error("hardware manager already has the maximum of 65,535 registered devices")]
    TooManyDevices,
}

/// Errors raised while reading or writing an object file.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObjectFileError {
    #[error("object file has an odd number of bytes ({0})")]
    OddLength(usize),

    #[error("object file exceeds the 65,536-word address space ({0} words)")]
    TooLarge(usize),
}
