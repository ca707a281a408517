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

//! Fetch/decode/execute (§4.8). Operand decoding is not a pure
//! function of the opcode word: reading an extension word advances
//! `PC`, and `PUSH`/`POP` move `SP`, both at decode time. A skipped
//! instruction (inside an `IFx` skip chain) still decodes its
//! operands the same way — only `execute` is withheld — so the skip
//! chain consumes exactly the words a taken branch would have.

use crate::ast::{Mnemonic, Register};
use crate::errors::EmulatorError;

use super::hardware::HardwareManager;
use super::interrupt::InterruptQueue;
use super::memory::Memory;
use super::registers::Registers;

pub struct Cpu {
    pub registers: Registers,
    pub memory: Memory,
    pub interrupts: InterruptQueue,
    pub hardware: HardwareManager,
    pub cycles: u64,
    pub on_fire: bool,
    skip_next: bool,
}

impl Default for Cpu {
    fn default() -> Self {
        Cpu {
            registers: Registers::default(),
            memory: Memory::new(),
            interrupts: InterruptQueue::new(),
            hardware: HardwareManager::new(),
            cycles: 0,
            on_fire: false,
            skip_next: false,
        }
    }
}

/// A decoded operand: already resolved to its storage location, so
/// `execute` never has to know which addressing mode produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand {
    Register(Register),
    Memory(u16),
    Literal(u16),
}

impl Operand {
    fn get(self, cpu: &Cpu) -> u16 {
        match self {
            Operand::Register(r) => cpu.registers.get(r),
            Operand::Memory(addr) => cpu.memory.read(addr),
            Operand::Literal(v) => v,
        }
    }

    /// Writes to a literal operand are silent no-ops, matching a
    /// program that targets `SET 5, A` (legal to assemble, pointless
    /// to execute).
    fn set(self, cpu: &mut Cpu, value: u16) {
        match self {
            Operand::Register(r) => cpu.registers.set(r, value),
            Operand::Memory(addr) => cpu.memory.write(addr, value),
            Operand::Literal(_) => {}
        }
    }
}

impl Cpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, image: &[u16]) -> Result<(), EmulatorError> {
        self.memory.load(image)
    }

    fn fetch_word(&mut self) -> u16 {
        let word = self.memory.read(self.registers.pc);
        self.registers.pc = self.registers.pc.wrapping_add(1);
        word
    }

    fn push(&mut self, value: u16) {
        self.registers.sp = self.registers.sp.wrapping_sub(1);
        self.memory.write(self.registers.sp, value);
    }

    fn pop(&mut self) -> u16 {
        let value = self.memory.read(self.registers.sp);
        self.registers.sp = self.registers.sp.wrapping_add(1);
        value
    }

    /// Decodes one operand field, returning its resolved location and
    /// the number of extension-word cycles it cost (0 or 1).
    fn decode_operand(&mut self, code: u8, is_a: bool) -> (Operand, u16) {
        match code {
            0x00..=0x07 => (Operand::Register(Register::GENERAL[code as usize]), 0),
            0x08..=0x0f => {
                let base = self.registers.general(code - 0x08);
                (Operand::Memory(base), 0)
            }
            0x10..=0x17 => {
                let offset = self.fetch_word();
                let base = self.registers.general(code - 0x10);
                (Operand::Memory(base.wrapping_add(offset)), 1)
            }
            0x18 if is_a => {
                // POP: [SP++]
                let addr = self.pop_address();
                (Operand::Memory(addr), 0)
            }
            0x18 => {
                // PUSH: [--SP]
                let addr = self.push_address();
                (Operand::Memory(addr), 0)
            }
            0x19 => (Operand::Memory(self.registers.sp), 0),
            0x1a => {
                let offset = self.fetch_word();
                (Operand::Memory(self.registers.sp.wrapping_add(offset)), 1)
            }
            0x1b => (Operand::Register(Register::Sp), 0),
            0x1c => (Operand::Register(Register::Pc), 0),
            0x1d => (Operand::Register(Register::Ex), 0),
            0x1e => {
                let addr = self.fetch_word();
                (Operand::Memory(addr), 1)
            }
            0x1f => {
                let literal = self.fetch_word();
                (Operand::Literal(literal), 1)
            }
            0x20..=0x3f if is_a => (Operand::Literal((code as i32 - 0x21) as u16), 0),
            _ => (Operand::Literal(0), 0),
        }
    }

    /// Mutates `SP` the way a `PUSH` addressing mode does and returns
    /// the address the value should land at, without writing it.
    fn push_address(&mut self) -> u16 {
        self.registers.sp = self.registers.sp.wrapping_sub(1);
        self.registers.sp
    }

    /// Mutates `SP` the way a `POP` addressing mode does and returns
    /// the address the value should be read from.
    fn pop_address(&mut self) -> u16 {
        let addr = self.registers.sp;
        self.registers.sp = self.registers.sp.wrapping_add(1);
        addr
    }

    fn charge(&mut self, cycles: u16) {
        self.cycles += cycles as u64;
    }

    /// Delivers interrupts to the CPU (§4.9). The queue itself only
    /// tracks messages and the queueing flag; pushing the return
    /// address and jumping to the handler touches registers and
    /// memory, which belong to the CPU.
    fn trigger(&mut self, message: u16) {
        if self.registers.ia == 0 {
            return;
        }
        self.interrupts.set_queueing(true);
        self.push(self.registers.pc);
        self.push(self.registers.a);
        self.registers.pc = self.registers.ia;
        self.registers.a = message;
    }

    fn send(&mut self, message: u16) {
        if self.registers.ia == 0 {
            return;
        }
        if self.interrupts.is_queueing() {
            if !self.interrupts.enqueue(message) {
                self.on_fire = true;
            }
        } else {
            self.trigger(message);
        }
    }

    /// Dequeues and delivers one pending interrupt if the machine
    /// isn't already mid-handler.
    fn deliver_pending_interrupt(&mut self) {
        if self.interrupts.is_queueing() {
            return;
        }
        if let Some(message) = self.interrupts.dequeue() {
            self.trigger(message);
        }
    }

    /// Runs exactly one fetch/decode/(execute or skip) step and
    /// delivers one pending interrupt, if any. Does nothing if the
    /// machine has already caught fire.
    pub fn step(&mut self) -> Result<(), EmulatorError> {
        if self.on_fire {
            return Ok(());
        }

        let instruction = self.fetch_word();
        let low5 = (instruction & 0x1f) as u8;
        let a_field = ((instruction >> 10) & 0x3f) as u8;
        let was_skipping = self.skip_next;

        let cycles = if low5 != 0 {
            let b_field = ((instruction >> 5) & 0x1f) as u8;
            let mnemonic = Mnemonic::from_basic_opcode(low5).ok_or(EmulatorError::InvalidBasicOpcode(low5))?;
            let (a, a_extra) = self.decode_operand(a_field, true);
            let (b, b_extra) = self.decode_operand(b_field, false);

            if was_skipping {
                if !mnemonic.is_conditional() {
                    self.skip_next = false;
                }
                1
            } else {
                let extra = self.execute_basic(mnemonic, a, b);
                mnemonic.base_cycles() + a_extra + b_extra + extra
            }
        } else {
            let special_op = ((instruction >> 5) & 0x1f) as u8;
            let mnemonic =
                Mnemonic::from_special_opcode(special_op).ok_or(EmulatorError::InvalidSpecialOpcode(special_op))?;
            let (a, a_extra) = self.decode_operand(a_field, true);

            if was_skipping {
                // Special opcodes are never conditional, so a skip
                // chain always ends here.
                self.skip_next = false;
                1
            } else {
                let extra = self.execute_special(mnemonic, a);
                mnemonic.base_cycles() + a_extra + extra
            }
        };

        self.charge(cycles);

        for message in self.hardware.tick_all() {
            self.send(message);
        }
        self.deliver_pending_interrupt();
        Ok(())
    }

    /// Executes a decoded basic (two-operand) instruction, returning
    /// any cycles beyond the mnemonic's base cost plus operand
    /// extension cost (currently always 0; basic opcodes never charge
    /// extra, unlike `HWI`).
    fn execute_basic(&mut self, mnemonic: Mnemonic, a: Operand, b: Operand) -> u16 {
        use Mnemonic::*;

        let av = a.get(self);
        let bv = b.get(self);

        match mnemonic {
            Set => b.set(self, av),
            Add => {
                let result = bv as u32 + av as u32;
                b.set(self, result as u16);
                self.registers.ex = (result >> 16) as u16;
            }
            Sub => {
                let result = (bv as u32).wrapping_sub(av as u32);
                b.set(self, result as u16);
                self.registers.ex = (result >> 16) as u16;
            }
            Mul => {
                let result = bv as u32 * av as u32;
                b.set(self, result as u16);
                self.registers.ex = (result >> 16) as u16;
            }
            Mli => {
                let result = (bv as i16) as i32 * (av as i16) as i32;
                b.set(self, result as u16);
                self.registers.ex = (result as u32 >> 16) as u16;
            }
            Div => {
                if av == 0 {
                    self.registers.ex = 0;
                    b.set(self, 0);
                } else {
                    let result = ((bv as u32) << 16) / av as u32;
                    self.registers.ex = (result & 0xffff) as u16;
                    b.set(self, (result >> 16) as u16);
                }
            }
            Dvi => {
                let signed_a = (av as i16) as i32;
                if signed_a == 0 {
                    self.registers.ex = 0;
                    b.set(self, 0);
                } else {
                    let signed_b = (bv as i16) as i32;
                    let result = (signed_b << 16) / signed_a;
                    self.registers.ex = (result & 0xffff) as u16;
                    b.set(self, (result >> 16) as u16);
                }
            }
            Mod => {
                if av == 0 {
                    self.registers.ex = 0;
                    b.set(self, 0);
                } else {
                    b.set(self, bv % av);
                }
            }
            Mdi => {
                let signed_a = av as i16;
                if signed_a == 0 {
                    self.registers.ex = 0;
                    b.set(self, 0);
                } else {
                    let signed_b = bv as i16;
                    b.set(self, (signed_b % signed_a) as u16);
                }
            }
            And => b.set(self, bv & av),
            Bor => b.set(self, bv | av),
            Xor => b.set(self, bv ^ av),
            Shr => {
                let shift = (av as u32) & 0x1f;
                b.set(self, (bv as u32 >> shift) as u16);
                self.registers.ex = (((bv as u32) << 16) >> shift) as u16;
            }
            Asr => {
                let shift = (av as u32) & 0x1f;
                let signed_b = bv as i16 as i32;
                b.set(self, (signed_b >> shift) as u16);
                self.registers.ex = ((signed_b << 16) >> shift) as u16;
            }
            Shl => {
                let shift = (av as u32) & 0x1f;
                let result = (bv as u32) << shift;
                b.set(self, result as u16);
                self.registers.ex = (result >> 16) as u16;
            }
            Ifb => {
                if bv & av == 0 {
                    self.skip_next = true;
                }
            }
            Ifc => {
                if bv & av != 0 {
                    self.skip_next = true;
                }
            }
            Ife => {
                if bv != av {
                    self.skip_next = true;
                }
            }
            Ifn => {
                if bv == av {
                    self.skip_next = true;
                }
            }
            Ifg => {
                if bv <= av {
                    self.skip_next = true;
                }
            }
            Ifa => {
                if (bv as i16) <= (av as i16) {
                    self.skip_next = true;
                }
            }
            Ifl => {
                if bv >= av {
                    self.skip_next = true;
                }
            }
            Ifu => {
                if (bv as i16) >= (av as i16) {
                    self.skip_next = true;
                }
            }
            Adx => {
                let result = bv as u32 + av as u32 + self.registers.ex as u32;
                b.set(self, result as u16);
                self.registers.ex = (result >> 16) as u16;
            }
            Sbx => {
                let result = (bv as u32).wrapping_sub(av as u32).wrapping_add(self.registers.ex as u32);
                b.set(self, result as u16);
                self.registers.ex = (result >> 16) as u16;
            }
            Sti => {
                b.set(self, av);
                self.registers.i = self.registers.i.wrapping_add(1);
                self.registers.j = self.registers.j.wrapping_add(1);
            }
            Std => {
                b.set(self, av);
                self.registers.i = self.registers.i.wrapping_sub(1);
                self.registers.j = self.registers.j.wrapping_sub(1);
            }
            Jsr | Hcf | Int | Iag | Ias | Rfi | Iaq | Hwn | Hwq | Hwi | Jmp | Push | Pop => {
                unreachable!("{mnemonic:?} is not a basic opcode")
            }
        }

        0
    }

    fn execute_special(&mut self, mnemonic: Mnemonic, a: Operand) -> u16 {
        use Mnemonic::*;

        match mnemonic {
            Jsr => {
                let target = a.get(self);
                let pc = self.registers.pc;
                self.push(pc);
                self.registers.pc = target;
                0
            }
            Hcf => {
                self.on_fire = true;
                0
            }
            Int => {
                let message = a.get(self);
                self.send(message);
                0
            }
            Iag => {
                a.set(self, self.registers.ia);
                0
            }
            Ias => {
                self.registers.ia = a.get(self);
                0
            }
            Rfi => {
                self.interrupts.set_queueing(false);
                self.registers.a = self.pop();
                self.registers.pc = self.pop();
                0
            }
            Iaq => {
                let enable = a.get(self) != 0;
                self.interrupts.set_queueing(enable);
                0
            }
            Hwn => {
                a.set(self, self.hardware.count());
                0
            }
            Hwq => {
                let index = a.get(self);
                if let Some((hw_id, version, manufacturer)) = self.hardware.query(index) {
                    self.registers.a = (hw_id & 0xffff) as u16;
                    self.registers.b = (hw_id >> 16) as u16;
                    self.registers.c = version;
                    self.registers.x = (manufacturer & 0xffff) as u16;
                    self.registers.y = (manufacturer >> 16) as u16;
                }
                0
            }
            Hwi => {
                let index = a.get(self);
                self.hardware.interrupt(index)
            }
            Set | Add | Sub | Mul | Mli | Div | Dvi | Mod | Mdi | And | Bor | Xor | Shr | Asr | Shl | Ifb | Ifc
            | Ife | Ifn | Ifg | Ifa | Ifl | Ifu | Adx | Sbx | Sti | Std | Jmp | Push | Pop => {
                unreachable!("{mnemonic:?} is not a special opcode")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Register as R;

    fn basic_word(op: u8, a: u8, b: u8) -> u16 {
        ((a as u16) << 10) | ((b as u16) << 5) | op as u16
    }

    fn special_word(op: u8, a: u8) -> u16 {
        ((a as u16) << 10) | (op as u16) << 5
    }

    #[test]
    fn mli_signed_overflow_sets_ex() {
        let mut cpu = Cpu::new();
        // SET A, 0x8000 ; MLI A, 0x8000
        cpu.load(&[
            basic_word(Mnemonic::Set.basic_opcode().unwrap(), 0x1f, 0x00),
            0x8000,
            basic_word(Mnemonic::Mli.basic_opcode().unwrap(), 0x1f, 0x00),
            0x8000,
        ])
        .unwrap();
        cpu.step().unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.registers.get(R::A), 0);
        assert_eq!(cpu.registers.ex, 0x4000);
    }

    #[test]
    fn div_by_nonzero_matches_worked_example() {
        let mut cpu = Cpu::new();
        // SET A, 0xffff ; DIV A, 0x000d
        cpu.load(&[
            basic_word(Mnemonic::Set.basic_opcode().unwrap(), 0x1f, 0x00),
            0xffff,
            basic_word(Mnemonic::Div.basic_opcode().unwrap(), 0x1f, 0x00),
            0x000d,
        ])
        .unwrap();
        cpu.step().unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.registers.get(R::A), 0x13b1);
        assert_eq!(cpu.registers.ex, 0x2762);
    }

    #[test]
    fn asr_sign_extends_and_clears_ex_for_small_shift() {
        let mut cpu = Cpu::new();
        // SET A, -8 ; ASR A, 2
        cpu.load(&[
            basic_word(Mnemonic::Set.basic_opcode().unwrap(), 0x1f, 0x00),
            0xfff8,
            basic_word(Mnemonic::Asr.basic_opcode().unwrap(), 0x22, 0x00),
        ])
        .unwrap();
        cpu.step().unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.registers.get(R::A), 0xfffe);
        assert_eq!(cpu.registers.ex, 0x0000);
    }

    #[test]
    fn sub_underflow_sets_ex_to_all_ones() {
        let mut cpu = Cpu::new();
        // SET A, 0 ; SUB A, 1
        cpu.load(&[
            basic_word(Mnemonic::Set.basic_opcode().unwrap(), 0x21, 0x00),
            basic_word(Mnemonic::Sub.basic_opcode().unwrap(), 0x22, 0x00),
        ])
        .unwrap();
        cpu.step().unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.registers.get(R::A), 0xffff);
        assert_eq!(cpu.registers.ex, 0xffff);
    }

    #[test]
    fn skip_chain_skips_both_conditionals() {
        let mut cpu = Cpu::new();
        // IFE 1, 0 / IFE 1, 0 / SET A, 1 / SET B, 1
        let ife = Mnemonic::Ife.basic_opcode().unwrap();
        let set = Mnemonic::Set.basic_opcode().unwrap();
        cpu.load(&[
            basic_word(ife, 0x22, 0x00), // IFE 1, A(=0)
            basic_word(ife, 0x22, 0x00),
            basic_word(set, 0x22, 0x00), // SET A, 1
            basic_word(set, 0x22, 0x01), // SET B, 1
        ])
        .unwrap();
        for _ in 0..4 {
            cpu.step().unwrap();
        }
        assert_eq!(cpu.registers.get(R::A), 0);
        assert_eq!(cpu.registers.get(R::B), 1);
    }

    #[test]
    fn interrupt_overflow_catches_fire() {
        let mut cpu = Cpu::new();
        cpu.registers.ia = 0x100;
        cpu.registers.sp = 0x200;
        let iaq = Mnemonic::Iaq.special_opcode().unwrap();
        let int = Mnemonic::Int.special_opcode().unwrap();
        cpu.load(&[
            special_word(iaq, 0x22), // IAQ 1
            special_word(int, 0x21), // INT 0 (literal -1..30 range includes 0 at code 0x21)
        ])
        .unwrap();
        cpu.step().unwrap(); // enable queueing
        for _ in 0..257 {
            cpu.registers.pc = 1;
            cpu.step().unwrap();
        }
        assert!(cpu.on_fire);
    }

    #[test]
    fn rfi_restores_pc_and_a() {
        let mut cpu = Cpu::new();
        cpu.registers.ia = 0x100;
        cpu.registers.sp = 0x300;
        cpu.registers.a = 0x42;
        let rfi = Mnemonic::Rfi.special_opcode().unwrap();
        cpu.memory.write(0x100, special_word(rfi, 0x00));

        let original_pc = 0x10;
        let original_a = 0x99;
        cpu.registers.pc = original_pc;
        cpu.registers.a = original_a;
        cpu.send_for_test(0x7);

        assert_eq!(cpu.registers.pc, 0x100);
        cpu.step().unwrap();
        assert_eq!(cpu.registers.pc, original_pc);
        assert_eq!(cpu.registers.a, original_a);
    }

    impl Cpu {
        fn send_for_test(&mut self, message: u16) {
            self.send(message);
        }
    }
}
