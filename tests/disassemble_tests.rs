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

use cortex16::decode::Radix;
use cortex16::{assemble, disassemble};

#[test]
fn round_trips_a_short_literal_set() {
    let out = assemble("SET A, 5\n", "t.asm");
    assert!(!out.log.has_errors());

    let (instructions, err) = disassemble(&out.words, Radix::Hex);
    assert!(err.is_none());
    assert_eq!(instructions.len(), 1);
    let text = instructions[0].to_text();
    assert!(text.contains("SET"));
    assert!(text.contains('A'));
}

#[test]
fn disassembly_consumes_the_extension_word_of_a_long_literal() {
    let out = assemble("SET A, 0x1234\n", "t.asm");
    assert!(!out.log.has_errors());
    assert_eq!(out.words.len(), 2);

    let (instructions, err) = disassemble(&out.words, Radix::Hex);
    assert!(err.is_none());
    assert_eq!(instructions.len(), 1);
    assert_eq!(instructions[0].words, 2);
    assert!(instructions[0].to_text().contains("1234"));
}

#[test]
fn stops_at_an_invalid_basic_opcode_but_keeps_prior_instructions() {
    // Low 5 bits 0x18 is an unassigned basic opcode in this machine.
    let words = vec![0x0001u16, 0x0018];
    let (instructions, err) = disassemble(&words, Radix::Hex);
    assert_eq!(instructions.len(), 1);
    assert!(err.is_some());
}

#[test]
fn decimal_radix_formats_operands_without_a_prefix() {
    let out = assemble("SET A, 42\n", "t.asm");
    assert!(!out.log.has_errors());

    let (instructions, _) = disassemble(&out.words, Radix::Decimal);
    assert_eq!(instructions.len(), 1);
    assert!(instructions[0].to_text().contains("42"));
}
