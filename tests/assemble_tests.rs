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

use cortex16::assemble;

#[test]
fn short_literal_boundary_is_one_word() {
    let out = assemble("SET A, 30\n", "t.asm");
    assert!(!out.log.has_errors());
    assert_eq!(out.words.len(), 1);
}

#[test]
fn just_past_short_literal_boundary_needs_a_next_word() {
    let out = assemble("SET A, 31\n", "t.asm");
    assert!(!out.log.has_errors());
    assert_eq!(out.words.len(), 2);
    assert_eq!(out.words[1], 31);
}

#[test]
fn negative_one_is_still_short_form() {
    let out = assemble("SET A, -1\n", "t.asm");
    assert!(!out.log.has_errors());
    assert_eq!(out.words.len(), 1);
}

#[test]
fn forward_reference_resolves_after_compression() {
    let src = "SET A, target\nSET B, 0\ntarget:\nSET C, 0\n";
    let out = assemble(src, "t.asm");
    assert!(!out.log.has_errors(), "unexpected errors: {:?}", out.log.errors());
    let target = out.symtab.lookup("target").expect("target label declared");
    assert_eq!(target.offset, 2);
}

#[test]
fn local_label_before_any_global_is_an_error() {
    let out = assemble(".child:\nSET A, 0\n", "t.asm");
    assert!(out.log.has_errors());
    assert!(out.log.errors().iter().any(|(_, msg)| msg.contains("declared before any global label")));
}

#[test]
fn local_label_is_scoped_to_its_enclosing_global() {
    let src = "first:\n.step:\nSET A, 0\nsecond:\n.step:\nSET B, 0\n";
    let out = assemble(src, "t.asm");
    assert!(!out.log.has_errors(), "unexpected errors: {:?}", out.log.errors());
    assert!(out.symtab.lookup("first.step").is_some());
    assert!(out.symtab.lookup("second.step").is_some());
}

#[test]
fn duplicate_global_label_is_rejected() {
    let src = "here:\nSET A, 0\nhere:\nSET B, 0\n";
    let out = assemble(src, "t.asm");
    assert!(out.log.has_errors());
    assert!(out.log.errors().iter().any(|(_, msg)| msg.contains("duplicate symbol")));
}

#[test]
fn equ_binds_a_name_to_a_constant_expression() {
    let src = "WIDTH: .equ 4 + 4\nSET A, WIDTH\n";
    let out = assemble(src, "t.asm");
    assert!(!out.log.has_errors(), "unexpected errors: {:?}", out.log.errors());
    assert_eq!(out.words.len(), 1);
}

#[test]
fn jmp_expands_to_set_pc_end_to_end() {
    let src = "start:\nJMP start\n";
    let out = assemble(src, "t.asm");
    assert!(!out.log.has_errors(), "unexpected errors: {:?}", out.log.errors());
    assert_eq!(out.words.len(), 2);
    let b_field = (out.words[0] >> 5) & 0x1f;
    assert_eq!(b_field, 0x1c); // PC register-direct code
    assert_eq!(out.words[0] & 0x1f, 0x01); // SET basic opcode
}

#[test]
fn push_as_the_second_operand_is_rejected() {
    // Second operand encodes into position A; PUSH (`[--SP]`) there
    // would both write and pop the stack in the same instruction.
    let out = assemble("SET 0, [--SP]\n", "t.asm");
    assert!(out.log.has_errors());
    assert!(out.log.errors().iter().any(|(_, msg)| msg.contains("PUSH") && msg.contains("position A")));
}

#[test]
fn pop_as_the_first_operand_is_rejected() {
    // First operand encodes into position B; POP (`[SP++]`) there
    // would discard the value SET was about to write to it.
    let out = assemble("SET [SP++], 0\n", "t.asm");
    assert!(out.log.has_errors());
    assert!(out.log.errors().iter().any(|(_, msg)| msg.contains("POP") && msg.contains("position B")));
}

#[test]
fn org_moves_the_assembly_position() {
    let src = ".org 0x100\nhere:\nSET A, 0\n";
    let out = assemble(src, "t.asm");
    assert!(!out.log.has_errors(), "unexpected errors: {:?}", out.log.errors());
    let here = out.symtab.lookup("here").expect("label declared");
    assert_eq!(here.offset, 0x100);
}

#[test]
fn fill_emits_the_requested_word_count() {
    let out = assemble(".fill 4, 0xabcd\n", "t.asm");
    assert!(!out.log.has_errors(), "unexpected errors: {:?}", out.log.errors());
    assert_eq!(out.words, vec![0xabcd; 4]);
}

#[test]
fn divide_by_zero_in_a_constant_expression_warns_once() {
    let out = assemble("SET A, 1 / 0\n", "t.asm");
    assert!(!out.log.has_errors());
    assert_eq!(out.log.warning_count(), 1);
}

#[test]
fn b_position_short_range_literal_still_reserves_its_extension_word() {
    // Operand B never collapses to a short literal even when its value
    // falls in the A-only short-literal range; a label placed right
    // after such a statement must land two words past it, not one.
    let src = "SET 0, A\nhere:\nSET B, 0\n";
    let out = assemble(src, "t.asm");
    assert!(!out.log.has_errors(), "unexpected errors: {:?}", out.log.errors());
    assert_eq!(out.words.len(), 3);
    let here = out.symtab.lookup("here").expect("label declared");
    assert_eq!(here.offset, 2);
}

#[test]
fn compression_does_not_oscillate_across_a_run_of_forward_references() {
    // Twenty forward references all landing close to the short-literal
    // ceiling; shrinking any one of them shifts every label after it,
    // which is exactly the scenario the fixpoint loop has to settle.
    let mut src = String::new();
    for i in 0..20 {
        src.push_str(&format!("SET A, label{i}\n"));
    }
    for i in 0..20 {
        src.push_str(&format!("label{i}:\nSET B, 0\n"));
    }
    let out = assemble(&src, "t.asm");
    assert!(!out.log.has_errors(), "unexpected errors: {:?}", out.log.errors());
}
