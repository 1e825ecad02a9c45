//! Silica CLI — parse a Verilog-2005 file, report on its modules, and
//! elaborate the top module into a netlist.
//!
//! Exit code 0 on success, 1 when the lexer, parser, or elaborator reports
//! an error. Diagnostics render rustc-style to stderr; warnings do not
//! change the exit code.

#![warn(missing_docs)]

use std::path::PathBuf;
use std::process;

use clap::Parser;
use silica_common::Interner;
use silica_diagnostics::{DiagnosticSink, TerminalRenderer};
use silica_elaborate::elaborate;
use silica_netlist::blif::netlist_to_blif;
use silica_netlist::Netlist;
use silica_source::SourceDb;
use silica_verilog_parser as vp;

/// Silica — a Verilog-2005 front-end and netlist compiler.
#[derive(Parser, Debug)]
#[command(name = "silica", version, about = "Verilog-2005 front-end and netlist compiler")]
struct Cli {
    /// The Verilog source file to compile.
    file: PathBuf,

    /// Top module name (defaults to the last module defined).
    #[arg(short, long)]
    top: Option<String>,

    /// Dump the AST in debug form after parsing.
    #[arg(short, long)]
    verbose: bool,

    /// Print the AST as JSON to stdout.
    #[arg(long)]
    json: bool,

    /// Print the elaborated netlist as JSON to stdout.
    #[arg(long)]
    netlist_json: bool,

    /// Write the elaborated netlist as BLIF to the given path.
    #[arg(long, value_name = "PATH")]
    blif: Option<PathBuf>,

    /// Stop after parsing; skip elaboration.
    #[arg(long)]
    no_elab: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(code) = run(&cli) {
        process::exit(code);
    }
}

fn run(cli: &Cli) -> Result<(), i32> {
    let mut db = SourceDb::new();
    let file_id = match db.load_file(&cli.file) {
        Ok(id) => id,
        Err(err) => {
            eprintln!("error: cannot read {}: {err}", cli.file.display());
            return Err(1);
        }
    };

    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let source = db.file(file_id).content.clone();

    let ast = vp::parse(&source, file_id, &interner, &sink);

    let renderer = TerminalRenderer::new();
    if sink.has_errors() {
        eprint!("{}", renderer.render_all(&sink.take_all(), &db));
        return Err(1);
    }

    if cli.verbose {
        println!("{ast:#?}");
    }
    if cli.json {
        match serde_json::to_string_pretty(&ast) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("error: cannot serialize AST: {err}");
                return Err(1);
            }
        }
    }

    print_module_summary(&ast, &interner);

    if cli.no_elab {
        eprint!("{}", renderer.render_all(&sink.take_all(), &db));
        return Ok(());
    }

    let result = elaborate(&ast, cli.top.as_deref(), &interner, &sink);
    // Warnings accumulated during elaboration render either way.
    eprint!("{}", renderer.render_all(&sink.take_all(), &db));

    let netlist = match result {
        Ok(netlist) => netlist,
        Err(err) => {
            eprint!("{}", renderer.render(&err, &db));
            return Err(1);
        }
    };

    print_netlist_summary(&netlist);

    if cli.netlist_json {
        println!("{}", netlist.to_json());
    }
    if let Some(path) = &cli.blif {
        if let Err(err) = std::fs::write(path, netlist_to_blif(&netlist)) {
            eprintln!("error: cannot write {}: {err}", path.display());
            return Err(1);
        }
        println!("wrote BLIF to {}", path.display());
    }

    Ok(())
}

fn print_module_summary(ast: &vp::ast::VerilogSourceFile, interner: &Interner) {
    for module in ast.modules() {
        let inputs = module
            .ports
            .iter()
            .filter(|p| p.direction == vp::ast::Direction::Input)
            .count();
        let outputs = module.ports.len() - inputs;
        println!(
            "module {}: {} inputs, {} outputs, {} parameters, {} items",
            interner.resolve(module.name),
            inputs,
            outputs,
            module.params.len(),
            module.items.len(),
        );
    }
}

fn print_netlist_summary(netlist: &Netlist) {
    println!(
        "elaborated {}: {} cells, {} nets",
        netlist.name,
        netlist.live_cell_count(),
        netlist.nets.len(),
    );
    let stats = netlist.stats();
    let mut ops: Vec<(&String, &usize)> = stats
        .iter()
        .filter(|(k, _)| k.as_str() != "cells" && k.as_str() != "nets")
        .collect();
    ops.sort();
    for (op, count) in ops {
        println!("  {op:<14} {count}");
    }
}
