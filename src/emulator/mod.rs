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

//! The machine: registers, memory, interrupts, hardware, and the
//! fetch/decode/execute loop (§4.8-§4.10), plus the worker thread and
//! clock pacing that run it against real time (§5).

pub mod clock;
pub mod cpu;
pub mod hardware;
pub mod interrupt;
pub mod memory;
pub mod registers;
pub mod worker;

pub use clock::Clock;
pub use cpu::Cpu;
pub use hardware::{HardwareDevice, HardwareManager};
pub use interrupt::InterruptQueue;
pub use memory::Memory;
pub use registers::Registers;
pub use worker::{Worker, WorkerHandle};
