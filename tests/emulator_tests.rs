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

use cortex16::ast::Register;
use cortex16::assemble;
use cortex16::emulator::worker::StopReason;
use cortex16::emulator::{Clock, Cpu, Worker};

fn run_to_completion(source: &str) -> Cpu {
    let out = assemble(source, "t.asm");
    assert!(!out.log.has_errors(), "unexpected errors: {:?}", out.log.errors());

    let mut cpu = Cpu::new();
    cpu.load(&out.words).unwrap();

    let worker = Worker::new(cpu, Clock::disabled());
    let (reason, cpu) = worker.spawn().join();
    assert_eq!(reason, StopReason::CaughtFire);
    cpu
}

#[test]
fn add_accumulates_into_the_destination_register() {
    let cpu = run_to_completion("SET A, 5\nSET B, 10\nADD B, A\nHCF A\n");
    assert_eq!(cpu.registers.get(Register::A), 5);
    assert_eq!(cpu.registers.get(Register::B), 15);
    assert_eq!(cpu.registers.get(Register::Ex), 0);
}

#[test]
fn add_sets_ex_on_overflow() {
    let cpu = run_to_completion("SET A, 1\nSET B, 0xffff\nADD B, A\nHCF A\n");
    assert_eq!(cpu.registers.get(Register::B), 0);
    assert_eq!(cpu.registers.get(Register::Ex), 1);
}

#[test]
fn sub_underflow_wraps_and_sets_ex_to_all_ones() {
    let cpu = run_to_completion("SET A, 1\nSET B, 0\nSUB B, A\nHCF A\n");
    assert_eq!(cpu.registers.get(Register::B), 0xffff);
    assert_eq!(cpu.registers.get(Register::Ex), 0xffff);
}

#[test]
fn conditional_skip_chain_skips_both_ifs_and_the_guarded_instruction() {
    // IFN A, 0 is false (A is 0), so it skips IFE B, 0 in turn, which
    // skips the SET that would otherwise run; C is never touched.
    let src = "SET A, 0\nSET B, 0\nSET C, 1\nIFN A, 0\nIFE B, 0\nSET C, 99\nHCF A\n";
    let cpu = run_to_completion(src);
    assert_eq!(cpu.registers.get(Register::C), 1);
}

#[test]
fn stack_push_and_pop_round_trip_through_sp() {
    let src = "SET A, 0x42\nSET [--SP], A\nSET B, [SP++]\nHCF A\n";
    let cpu = run_to_completion(src);
    assert_eq!(cpu.registers.get(Register::B), 0x42);
    assert_eq!(cpu.registers.get(Register::Sp), 0);
}

#[test]
fn worker_can_be_stopped_before_it_catches_fire() {
    let out = assemble("loop:\nSET PC, loop\n", "t.asm");
    assert!(!out.log.has_errors());

    let mut cpu = Cpu::new();
    cpu.load(&out.words).unwrap();

    let worker = Worker::new(cpu, Clock::disabled());
    let handle = worker.spawn();
    let (reason, cpu) = handle.stop().unwrap();
    assert_eq!(reason, StopReason::Requested);
    assert!(!cpu.on_fire);
}
