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

//! Runs a `Cpu` on a background thread so a UI thread stays
//! responsive (§5). The UI signals the worker through an atomic stop
//! flag and is notified back through a channel when the loop ends,
//! whether because it was asked to stop or because the machine caught
//! fire. The worker owns the `Cpu` outright while running; joining
//! the handle is how the caller gets it back to read memory.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::clock::Clock;
use super::cpu::Cpu;
use crate::errors::EmulatorError;

/// Reason the worker loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Requested,
    CaughtFire,
    DecodeError,
}

pub struct Worker {
    cpu: Cpu,
    clock: Clock,
}

impl Worker {
    pub fn new(cpu: Cpu, clock: Clock) -> Self {
        Worker { cpu, clock }
    }

    /// Spawns the fetch/execute loop on its own thread and returns a
    /// handle for stopping it and retrieving the final `Cpu`.
    pub fn spawn(mut self) -> WorkerHandle {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = Arc::clone(&stop);
        let (stopped_tx, stopped_rx) = mpsc::channel();

        let join = thread::spawn(move || {
            tracing::info!("emulator worker starting");
            let reason = loop {
                if stop_for_thread.load(Ordering::Relaxed) {
                    break StopReason::Requested;
                }
                if self.cpu.on_fire {
                    break StopReason::CaughtFire;
                }

                self.clock.tick();

                if let Err(err) = self.cpu.step() {
                    tracing::warn!(error = %err, "emulator worker stopping on decode error");
                    break StopReason::DecodeError;
                }
            };

            match reason {
                StopReason::Requested => tracing::info!("emulator worker stopped"),
                StopReason::CaughtFire => tracing::warn!("emulator worker stopped: machine caught fire"),
                StopReason::DecodeError => {}
            }

            let _ = stopped_tx.send(reason);
            self.cpu
        });

        WorkerHandle { stop, stopped_rx, join: Some(join) }
    }
}

/// A handle to a running worker. Dropping it without calling `stop`
/// leaves the background thread running to completion on its own.
pub struct WorkerHandle {
    stop: Arc<AtomicBool>,
    stopped_rx: Receiver<StopReason>,
    join: Option<JoinHandle<Cpu>>,
}

impl WorkerHandle {
    /// Signals the worker to stop and blocks until it has, returning
    /// the final `Cpu` so its memory and registers can be inspected.
    pub fn stop(mut self) -> Result<(StopReason, Cpu), EmulatorError> {
        self.stop.store(true, Ordering::Relaxed);
        let reason = self.stopped_rx.recv().unwrap_or(StopReason::Requested);
        let cpu = self.join.take().expect("join handle consumed twice").join().expect("emulator worker panicked");
        Ok((reason, cpu))
    }

    /// Blocks until the worker stops on its own (caught fire or a
    /// decode error), without requesting a stop.
    pub fn join(mut self) -> (StopReason, Cpu) {
        let reason = self.stopped_rx.recv().unwrap_or(StopReason::Requested);
        let cpu = self.join.take().expect("join handle consumed twice").join().expect("emulator worker panicked");
        (reason, cpu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Mnemonic, Register};

    #[test]
    fn worker_stops_on_request() {
        let mut cpu = Cpu::new();
        // SET PC, 0: an infinite loop that never advances past address 0.
        let op = Mnemonic::Set.basic_opcode().unwrap();
        cpu.load(&[((0x21u16) << 10) | ((0x1cu16) << 5) | op as u16]).unwrap();

        let worker = Worker::new(cpu, Clock::disabled());
        let handle = worker.spawn();
        let (reason, cpu) = handle.stop().unwrap();
        assert_eq!(reason, StopReason::Requested);
        assert_eq!(cpu.registers.get(Register::Pc), 0);
    }

    #[test]
    fn worker_reports_caught_fire() {
        let mut cpu = Cpu::new();
        let hcf = Mnemonic::Hcf.special_opcode().unwrap();
        cpu.load(&[(hcf as u16) << 5]).unwrap();

        let worker = Worker::new(cpu, Clock::disabled());
        let handle = worker.spawn();
        let (reason, cpu) = handle.join();
        assert_eq!(reason, StopReason::CaughtFire);
        assert!(cpu.on_fire);
    }
}
