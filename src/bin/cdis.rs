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

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use cortex16::decode::Radix;
use cortex16::file_reader::{FileReader, OsFileReader};
use cortex16::objfile::{self, Endianness};

#[derive(Parser)]
#[clap(name = "cdis", version = "0.1.0", author = "Connor Nolan", about = "Disassembler for the cortex16 machine")]
struct Opts {
    /// Object file to disassemble.
    input: PathBuf,

    /// Output file (`-` means stdout); defaults to stdout.
    #[clap(short = 'o', long = "output")]
    output: Option<String>,

    /// Format operands as octal.
    #[clap(short = 'c', long = "octal")]
    octal: bool,

    /// Format operands as decimal.
    #[clap(short = 'd', long = "decimal")]
    decimal: bool,

    /// Format operands as hex (the default).
    #[clap(short = 'h', long = "hex")]
    hex: bool,

    /// Read the input as little-endian rather than the default big-endian.
    #[clap(long = "little-endian")]
    little_endian: bool,
}

fn main() -> ExitCode {
    let opts = Opts::parse();
    match run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("cdis: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(opts: &Opts) -> Result<()> {
    let radix = if opts.octal {
        Radix::Octal
    } else if opts.decimal {
        Radix::Decimal
    } else {
        Radix::Hex
    };

    let reader = OsFileReader;
    let bytes = reader
        .read_binary(&opts.input)
        .with_context(|| format!("failed to read input file: {}", opts.input.display()))?;

    let endianness = if opts.little_endian { Endianness::Little } else { Endianness::Big };
    let words = objfile::read_words(&bytes, endianness).context("malformed object file")?;

    let (instructions, error) = cortex16::disassemble(&words, radix);

    let mut text = String::new();
    for instr in &instructions {
        text.push_str(&instr.to_text());
        text.push('\n');
    }
    if let Some(err) = &error {
        eprintln!("cdis: {err}");
    }

    match opts.output.as_deref() {
        None | Some("-") => {
            std::io::stdout().write_all(text.as_bytes())?;
        }
        Some(path) => {
            reader.write_binary(std::path::Path::new(path), text.as_bytes()).with_context(|| format!("failed to write output file: {path}"))?;
        }
    }

    if error.is_some() {
        std::process::exit(1);
    }
    Ok(())
}
