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
use cortex16::ast::{Argument, Expr, LabelKind, Statement, StatementBody};
use cortex16::file_reader::{FileReader, OsFileReader};
use cortex16::objfile::{self, Endianness};
use cortex16::symbols::{SymbolKind, SymbolTable};

#[derive(Parser)]
#[clap(name = "casm", version = "0.1.0", author = "Connor Nolan", about = "Assembler for the cortex16 machine")]
struct Opts {
    /// Source file to assemble.
    input: PathBuf,

    /// Output file (`-` means stdout). Defaults to the input path with
    /// its extension replaced by `.bin`.
    #[clap(short = 'o', long = "output")]
    output: Option<String>,

    /// Include-path, reserved for future use.
    #[clap(short = 'I', long = "include")]
    include: Option<PathBuf>,

    /// Dump the parsed and compressed AST as JSON instead of assembling.
    #[clap(long = "ast-print")]
    ast_print: bool,

    /// Dump the resolved symbol table as JSON instead of assembling.
    #[clap(long = "symbols-print")]
    symbols_print: bool,

    /// Parse and resolve only; do not write an object file.
    #[clap(long = "syntax-only")]
    syntax_only: bool,

    /// Emit the object file little-endian instead of the default big-endian.
    #[clap(long = "little-endian")]
    little_endian: bool,
}

fn main() -> ExitCode {
    let opts = Opts::parse();
    match run(&opts) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("casm: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Runs the assembler end to end. Returns `Ok(false)` for a clean
/// compile-time failure (errors logged, already reported to stderr);
/// `Err` is reserved for I/O failures outside the pipeline itself.
fn run(opts: &Opts) -> Result<bool> {
    let _ = &opts.include; // reserved, not yet consulted by the pipeline

    let reader = OsFileReader;
    let source = reader
        .read_to_string(&opts.input)
        .with_context(|| format!("failed to read input file: {}", opts.input.display()))?;
    let source_name = opts.input.display().to_string();

    let output = cortex16::assemble(&source, &source_name);

    let mut stderr = std::io::stderr();
    for (location, message) in output.log.errors() {
        writeln!(stderr, "{location}: error: {message}")?;
    }
    for (location, message) in output.log.warnings() {
        writeln!(stderr, "{location}: warning: {message}")?;
    }
    output.log.summary(&mut stderr)?;

    if opts.ast_print {
        println!("{}", serde_json::to_string_pretty(&statements_to_json(&output.statements))?);
    }
    if opts.symbols_print {
        println!("{}", serde_json::to_string_pretty(&symbols_to_json(&output.symtab))?);
    }

    if output.log.has_errors() {
        return Ok(false);
    }
    if opts.syntax_only || opts.ast_print || opts.symbols_print {
        return Ok(true);
    }

    let endianness = if opts.little_endian { Endianness::Little } else { Endianness::Big };
    let bytes = objfile::write_words(&output.words, endianness);

    let output_path = resolve_output_path(opts);
    if output_path == "-" {
        std::io::stdout().write_all(&bytes)?;
    } else {
        reader.write_binary(std::path::Path::new(&output_path), &bytes).with_context(|| format!("failed to write output file: {output_path}"))?;
    }

    Ok(true)
}

/// `-o -` means stdout; otherwise an explicit `-o` wins, falling back
/// to the input path with its extension replaced by `.bin`.
fn resolve_output_path(opts: &Opts) -> String {
    if let Some(out) = &opts.output {
        return out.clone();
    }
    opts.input.with_extension("bin").display().to_string()
}

fn statements_to_json(statements: &[Statement]) -> serde_json::Value {
    serde_json::Value::Array(statements.iter().map(statement_to_json).collect())
}

fn statement_to_json(stmt: &Statement) -> serde_json::Value {
    serde_json::json!({
        "location": stmt.location.to_string(),
        "labels": stmt.labels.iter().map(|l| serde_json::json!({
            "name": l.name,
            "kind": match l.kind { LabelKind::Global => "global", LabelKind::Local => "local" },
        })).collect::<Vec<_>>(),
        "body": stmt.body.as_ref().map(body_to_json),
    })
}

fn body_to_json(body: &StatementBody) -> serde_json::Value {
    match body {
        StatementBody::Instruction { opcode, a, b } => serde_json::json!({
            "kind": "instruction",
            "opcode": opcode.to_string(),
            "a": argument_to_json(a),
            "b": b.as_ref().map(argument_to_json),
        }),
        StatementBody::Data(values) => {
            serde_json::json!({ "kind": "data", "values": values.iter().map(expr_to_json).collect::<Vec<_>>() })
        }
        StatementBody::DataBytes(values) => {
            serde_json::json!({ "kind": "data_bytes", "values": values.iter().map(expr_to_json).collect::<Vec<_>>() })
        }
        StatementBody::Org(expr) => serde_json::json!({ "kind": "org", "expr": expr_to_json(expr) }),
        StatementBody::Fill { count, value } => {
            serde_json::json!({ "kind": "fill", "count": expr_to_json(count), "value": expr_to_json(value) })
        }
        StatementBody::Equ(expr) => serde_json::json!({ "kind": "equ", "expr": expr_to_json(expr) }),
        StatementBody::Align(expr) => serde_json::json!({ "kind": "align", "expr": expr_to_json(expr) }),
    }
}

fn argument_to_json(arg: &Argument) -> serde_json::Value {
    match arg {
        Argument::Stack(kind) => serde_json::json!({ "kind": "stack", "op": format!("{kind:?}") }),
        Argument::Pick(expr) => serde_json::json!({ "kind": "pick", "expr": expr_to_json(expr) }),
        Argument::Expression(e) => {
            serde_json::json!({ "kind": "expression", "indirect": e.indirect, "expr": expr_to_json(&e.expr) })
        }
    }
}

fn expr_to_json(expr: &Expr) -> serde_json::Value {
    match expr {
        Expr::Literal(v) => serde_json::json!({ "kind": "literal", "value": v }),
        Expr::Symbol(name) => serde_json::json!({ "kind": "symbol", "name": name }),
        Expr::Register(r) => serde_json::json!({ "kind": "register", "name": r.to_string() }),
        Expr::CurrentPosition => serde_json::json!({ "kind": "current_position" }),
        Expr::Unary(op, inner) => serde_json::json!({ "kind": "unary", "op": format!("{op:?}"), "expr": expr_to_json(inner) }),
        Expr::Binary(op, lhs, rhs) => {
            serde_json::json!({ "kind": "binary", "op": format!("{op:?}"), "lhs": expr_to_json(lhs), "rhs": expr_to_json(rhs) })
        }
        Expr::Evaluated { register, value } => {
            serde_json::json!({ "kind": "evaluated", "register": register.map(|r| r.to_string()), "value": value })
        }
        Expr::Invalid => serde_json::json!({ "kind": "invalid" }),
    }
}

fn symbols_to_json(symtab: &SymbolTable) -> serde_json::Value {
    serde_json::Value::Array(
        symtab
            .entries()
            .iter()
            .map(|entry| {
                serde_json::json!({
                    "name": entry.name,
                    "kind": match entry.kind {
                        SymbolKind::GlobalLabel => "global_label",
                        SymbolKind::LocalLabel => "local_label",
                        SymbolKind::CurrentLocation => "current_location",
                        SymbolKind::Equ => "equ",
                    },
                    "offset": entry.offset,
                    "location": entry.location.to_string(),
                })
            })
            .collect(),
    )
}
