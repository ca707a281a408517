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

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use cortex16::emulator::{Clock, Cpu, Worker};
use cortex16::file_reader::{FileReader, OsFileReader};
use cortex16::objfile::{self, Endianness};

#[derive(Parser)]
#[clap(name = "cemu", version = "0.1.0", author = "Connor Nolan", about = "Headless emulator for the cortex16 machine")]
struct Opts {
    /// Binary image to run.
    input: PathBuf,

    /// Clock rate in Hz; 0 disables pacing and runs as fast as possible.
    #[clap(long = "hz", default_value_t = cortex16::emulator::clock::DEFAULT_FREQUENCY_HZ)]
    hz: u64,

    /// Read the input as little-endian rather than the default big-endian.
    #[clap(long = "little-endian")]
    little_endian: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("cemu: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let opts = Opts::parse();

    let reader = OsFileReader;
    let bytes = reader
        .read_binary(&opts.input)
        .with_context(|| format!("failed to read input file: {}", opts.input.display()))?;

    let endianness = if opts.little_endian { Endianness::Little } else { Endianness::Big };
    let words = objfile::read_words(&bytes, endianness).context("malformed binary image")?;

    let mut cpu = Cpu::new();
    cpu.load(&words).context("program image too large for the 64 KiW address space")?;

    let clock = if opts.hz == 0 { Clock::disabled() } else { Clock::new(opts.hz) };
    let worker = Worker::new(cpu, clock);
    let handle = worker.spawn();
    let (reason, cpu) = handle.join();

    tracing::info!(?reason, "emulator run finished");

    println!("--- registers ---");
    let r = &cpu.registers;
    println!("A={:04x} B={:04x} C={:04x} X={:04x} Y={:04x} Z={:04x} I={:04x} J={:04x}", r.a, r.b, r.c, r.x, r.y, r.z, r.i, r.j);
    println!("PC={:04x} SP={:04x} EX={:04x} IA={:04x}", r.pc, r.sp, r.ex, r.ia);
    println!("cycles={} on_fire={}", cpu.cycles, cpu.on_fire);

    println!("--- memory (nonzero) ---");
    print!("{}", cpu.memory.dump_nonzero());

    Ok(())
}
