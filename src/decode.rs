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

//! Reverses the encoder (§4.7): classify each word, consume extension
//! words, and render a canonical mnemonic line. Operand A is decoded
//! before operand B, matching the order the emulator's fetch/decode
//! step uses, so a multi-word instruction's extension words are
//! attributed to the correct operand.

use crate::ast::Mnemonic;
use crate::errors::EmulatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Radix {
    Hex,
    Octal,
    Decimal,
}

impl Default for Radix {
    fn default() -> Self {
        Radix::Hex
    }
}

impl Radix {
    fn format(self, value: u16) -> String {
        match self {
            Radix::Hex => format!("0x{value:x}"),
            Radix::Octal => format!("0o{value:o}"),
            Radix::Decimal => format!("{value}"),
        }
    }
}

/// One decoded instruction, ready to print as `MNEMONIC operands...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub mnemonic: Mnemonic,
    pub operands: Vec<String>,
    /// Total words consumed, including the opcode word itself.
    pub words: u16,
}

impl DecodedInstruction {
    pub fn to_text(&self) -> String {
        if self.operands.is_empty() {
            self.mnemonic.to_string()
        } else {
            format!("{} {}", self.mnemonic, self.operands.join(", "))
        }
    }
}

impl std::fmt::Display for DecodedInstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

const REGISTER_NAMES: [&str; 8] = ["A", "B", "C", "X", "Y", "Z", "I", "J"];

/// Decodes one instruction starting at `words[0]`. `words` must be
/// non-empty. If an operand's extension word would run past the end
/// of the slice, it reads as zero, mirroring a program that falls off
/// the end of its own image.
pub fn decode_one(words: &[u16], radix: Radix) -> Result<DecodedInstruction, EmulatorError> {
    let instruction = words[0];
    let low5 = instruction & 0x1f;
    let a_field = (instruction >> 10) & 0x3f;

    if low5 != 0 {
        let b_field = (instruction >> 5) & 0x1f;
        let mnemonic = Mnemonic::from_basic_opcode(low5 as u8).ok_or(EmulatorError::InvalidBasicOpcode(low5 as u8))?;
        let (a_text, a_consumed) = decode_operand(a_field as u8, true, &words[1..], radix);
        let (b_text, b_consumed) = decode_operand(b_field as u8, false, &words[1 + a_consumed..], radix);
        Ok(DecodedInstruction {
            mnemonic,
            operands: vec![b_text, a_text],
            words: 1 + a_consumed as u16 + b_consumed as u16,
        })
    } else {
        let special_op = ((instruction >> 5) & 0x1f) as u8;
        let mnemonic =
            Mnemonic::from_special_opcode(special_op).ok_or(EmulatorError::InvalidSpecialOpcode(special_op))?;
        let (a_text, a_consumed) = decode_operand(a_field as u8, true, &words[1..], radix);
        Ok(DecodedInstruction { mnemonic, operands: vec![a_text], words: 1 + a_consumed as u16 })
    }
}

/// Decodes one operand field, returning its rendered text and the
/// number of extension words it consumed (0 or 1). `is_a` gates the
/// short-literal range (0x20-0x3f), which only ever appears in
/// position A.
fn decode_operand(code: u8, is_a: bool, rest: &[u16], radix: Radix) -> (String, usize) {
    let next_word = |rest: &[u16]| -> u16 { rest.first().copied().unwrap_or(0) };

    match code {
        0x00..=0x07 => (REGISTER_NAMES[code as usize].to_string(), 0),
        0x08..=0x0f => (format!("[{}]", REGISTER_NAMES[(code - 0x08) as usize]), 0),
        0x10..=0x17 => {
            let offset = next_word(rest);
            (format!("[{} + {}]", REGISTER_NAMES[(code - 0x10) as usize], radix.format(offset)), 1)
        }
        0x18 => (if is_a { "POP" } else { "PUSH" }.to_string(), 0),
        0x19 => ("PEEK".to_string(), 0),
        0x1a => {
            let offset = next_word(rest);
            (format!("PICK {}", radix.format(offset)), 1)
        }
        0x1b => ("SP".to_string(), 0),
        0x1c => ("PC".to_string(), 0),
        0x1d => ("EX".to_string(), 0),
        0x1e => {
            let addr = next_word(rest);
            (format!("[{}]", radix.format(addr)), 1)
        }
        0x1f => {
            let literal = next_word(rest);
            (radix.format(literal), 1)
        }
        0x20..=0x3f if is_a => (radix.format((code as i16 - 0x21) as u16), 0),
        _ => (format!("<invalid:{code:#04x}>"), 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_set_a_short_literal() {
        // SET A, 5: a=0x26 (5 short-literal), b=A(0x00), op=SET(0x01)
        let instruction = (0x26u16 << 10) | (0x00 << 5) | 0x01;
        let decoded = decode_one(&[instruction], Radix::Hex).unwrap();
        assert_eq!(decoded.mnemonic, Mnemonic::Set);
        assert_eq!(decoded.operands, vec!["A".to_string(), "0x5".to_string()]);
        assert_eq!(decoded.words, 1);
    }

    #[test]
    fn decodes_set_indirect_offset_consumes_extension_word() {
        // SET [A + 0x10], B
        let instruction = (0x10u16 << 10) | (0x01 << 5) | 0x01;
        let decoded = decode_one(&[instruction, 0x10], Radix::Hex).unwrap();
        assert_eq!(decoded.mnemonic, Mnemonic::Set);
        assert_eq!(decoded.operands, vec!["B".to_string(), "[A + 0x10]".to_string()]);
        assert_eq!(decoded.words, 2);
    }

    #[test]
    fn decodes_jsr_as_special_form() {
        // JSR [next word]
        let instruction = (0x1eu16 << 10) | (0x01 << 5);
        let decoded = decode_one(&[instruction, 0x4000], Radix::Hex).unwrap();
        assert_eq!(decoded.mnemonic, Mnemonic::Jsr);
        assert_eq!(decoded.operands, vec!["[0x4000]".to_string()]);
        assert_eq!(decoded.words, 2);
    }

    #[test]
    fn rejects_invalid_special_opcode() {
        let instruction = (0x00u16 << 10) | (0x1f << 5);
        assert!(decode_one(&[instruction], Radix::Hex).is_err());
    }

    #[test]
    fn decimal_radix_formats_without_prefix() {
        let instruction = (0x1fu16 << 10) | (0x00 << 5) | 0x01;
        let decoded = decode_one(&[instruction, 42], Radix::Decimal).unwrap();
        assert_eq!(decoded.operands[1], "42");
    }
}
