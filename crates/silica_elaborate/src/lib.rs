//! Elaboration: Verilog AST → flattened gate-level netlist.
//!
//! [`elaborate`] resolves parameters, unrolls generate constructs, lowers
//! continuous assigns and always blocks into primitive cells, infers
//! memories, and flattens the module hierarchy into one [`Netlist`] with
//! `instance.`-prefixed names. Warnings (inferred latches, undriven nets,
//! unused signals, black boxes) go to the [`DiagnosticSink`]; fatal problems
//! — unresolved names, unsupported constructs, multi-driver conflicts,
//! combinational cycles, division by zero in constant context — come back
//! as the `Err` diagnostic.

#![warn(missing_docs)]

pub mod const_eval;
pub mod context;
pub mod errors;
pub mod expr;
pub mod generate;
pub mod memory;
pub mod module;
pub mod stmt;

pub use const_eval::{ConstEnv, ConstValue};
pub use context::ElabContext;

use silica_common::Interner;
use silica_diagnostics::{Diagnostic, DiagnosticSink};
use silica_netlist::Netlist;
use silica_source::Span;
use silica_verilog_parser::ast::VerilogSourceFile;

/// Elaborates `ast` into a netlist.
///
/// `top` selects the root module by name; when absent, the last module
/// defined is the top (matching common tool behavior for single-file
/// designs).
pub fn elaborate(
    ast: &VerilogSourceFile,
    top: Option<&str>,
    interner: &Interner,
    sink: &DiagnosticSink,
) -> Result<Netlist, Diagnostic> {
    let modules: Vec<_> = ast.modules().collect();
    let top_decl = match top {
        Some(name) => *interner
            .get(name)
            .and_then(|ident| modules.iter().find(|m| m.name == ident))
            .ok_or_else(|| {
                Diagnostic::error(
                    errors::E200,
                    format!("top module `{name}` not found"),
                    Span::DUMMY,
                )
            })?,
        None => *modules.last().ok_or_else(|| {
            Diagnostic::error(errors::E200, "no modules found in source", Span::DUMMY)
        })?,
    };

    let mut ctx = ElabContext::new(
        interner,
        sink,
        modules.iter().copied(),
        interner.resolve(top_decl.name),
    );
    module::elaborate_module_into(&mut ctx, top_decl, &[], String::new(), None)?;

    check_netlist(&ctx);

    let cycles = ctx.netlist.combinational_cycles();
    if let Some(cycle) = cycles.first() {
        let mut path: Vec<String> = cycle
            .iter()
            .map(|&id| ctx.netlist.cell(id).name.clone())
            .collect();
        if let Some(first) = path.first().cloned() {
            path.push(first);
        }
        return Err(errors::combinational_cycle(&path));
    }

    Ok(ctx.netlist)
}

/// Post-lowering structural warnings: undriven nets that something reads,
/// and declared signals nothing reads.
fn check_netlist(ctx: &ElabContext<'_>) {
    for (_, net) in ctx.netlist.nets.iter() {
        let synthesized = net
            .name
            .rsplit('.')
            .next()
            .map(|tail| tail.starts_with('_'))
            .unwrap_or(false);

        if net.driver.is_none() && !net.sinks.is_empty() && !synthesized {
            ctx.sink.emit(Diagnostic::warning(
                errors::W301,
                format!("net `{}` is read but never driven", net.name),
                Span::DUMMY,
            ));
        }
        if net.driver.is_some() && net.sinks.is_empty() && !synthesized {
            ctx.sink.emit(Diagnostic::warning(
                errors::W303,
                format!("net `{}` is driven but never used", net.name),
                Span::DUMMY,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silica_netlist::CellOp;
    use silica_source::FileId;
    use silica_verilog_parser as vp;

    fn run(source: &str) -> (Result<Netlist, Diagnostic>, Vec<Diagnostic>, Interner) {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let ast = vp::parse(source, FileId::from_raw(0), &interner, &sink);
        assert!(
            !sink.has_errors(),
            "parse errors: {:?}",
            sink.diagnostics()
        );
        let result = elaborate(&ast, None, &interner, &sink);
        (result, sink.take_all(), interner)
    }

    fn netlist(source: &str) -> Netlist {
        let (result, diags, _) = run(source);
        result.unwrap_or_else(|e| panic!("elaboration failed: {e:?}; warnings: {diags:?}"))
    }

    #[test]
    fn and_gate_is_exactly_four_cells() {
        let nl = netlist("module m(input a, input b, output c); assign c = a & b; endmodule");
        assert_eq!(nl.live_cell_count(), 4);
        assert_eq!(nl.cells_with_op(CellOp::ModuleInput).len(), 2);
        assert_eq!(nl.cells_with_op(CellOp::And).len(), 1);
        assert_eq!(nl.cells_with_op(CellOp::ModuleOutput).len(), 1);

        // The AND output drives the MODULE_OUTPUT input pin.
        let and = nl.cells_with_op(CellOp::And)[0];
        let out_net = and.output().net.expect("AND output connected");
        let out_cell = nl.cells_with_op(CellOp::ModuleOutput)[0];
        assert!(nl
            .net(out_net)
            .sinks
            .iter()
            .any(|s| s.cell == out_cell.id));
    }

    #[test]
    fn parameters_resolve_widths() {
        let nl = netlist(
            "module m #(parameter WIDTH = 8)(
                input [WIDTH-1:0] a,
                output [WIDTH-1:0] y
            );
                assign y = ~a;
            endmodule",
        );
        let not = nl.cells_with_op(CellOp::Not)[0];
        assert_eq!(not.output().width, 8);
    }

    #[test]
    fn localparam_uses_parameter() {
        let nl = netlist(
            "module m #(parameter DEPTH = 16)(
                input [$clog2(DEPTH)-1:0] addr,
                output [$clog2(DEPTH)-1:0] y
            );
                localparam AW = $clog2(DEPTH);
                assign y = addr + {AW{1'b0}};
            endmodule",
        );
        assert_eq!(nl.cells_with_op(CellOp::Add).len(), 1);
        let input = nl.cells_with_op(CellOp::ModuleInput)[0];
        assert_eq!(input.output().width, 4);
    }

    #[test]
    fn ternary_becomes_mux() {
        let nl = netlist(
            "module m(input s, input [3:0] a, b, output [3:0] y);
                assign y = s ? a : b;
            endmodule",
        );
        let mux = nl.cells_with_op(CellOp::Mux)[0];
        assert!(mux.pin("S").is_some());
        assert!(mux.pin("A").is_some());
        assert!(mux.pin("B").is_some());
        assert_eq!(mux.output().width, 4);
    }

    #[test]
    fn unresolved_identifier_fails() {
        let (result, _, _) = run("module m(output y); assign y = ghost; endmodule");
        let err = result.unwrap_err();
        assert!(err.message.contains("ghost"));
    }

    #[test]
    fn divide_by_zero_in_parameter_fails() {
        let (result, _, _) = run(
            "module m #(parameter BAD = 1 / 0)(output y);
                assign y = 1'b0;
            endmodule",
        );
        assert!(result.unwrap_err().message.contains("division by zero"));
    }

    #[test]
    fn multi_driver_fails() {
        let (result, _, _) = run(
            "module m(input a, b, output y);
                assign y = a;
                assign y = b;
            endmodule",
        );
        assert!(result.unwrap_err().message.contains("multiple drivers"));
    }

    #[test]
    fn combinational_cycle_fails_with_path() {
        let (result, _, _) = run(
            "module m(output y);
                wire a, b;
                assign a = ~b;
                assign b = ~a;
                assign y = a;
            endmodule",
        );
        let err = result.unwrap_err();
        assert!(err.message.contains("combinational cycle"));
        assert!(err.message.contains("->"));
    }

    #[test]
    fn register_feedback_is_fine() {
        let nl = netlist(
            "module m(input clk, output reg [7:0] q);
                always @(posedge clk)
                    q <= q + 8'd1;
            endmodule",
        );
        assert_eq!(nl.cells_with_op(CellOp::Dff).len(), 1);
        assert_eq!(nl.cells_with_op(CellOp::Add).len(), 1);
    }

    #[test]
    fn undriven_net_warns() {
        let (result, diags, _) = run(
            "module m(input a, output y);
                wire floating;
                assign y = a & floating;
            endmodule",
        );
        assert!(result.is_ok());
        assert!(diags
            .iter()
            .any(|d| d.code == errors::W301 && d.message.contains("floating")));
    }

    #[test]
    fn unused_net_warns() {
        let (result, diags, _) = run(
            "module m(input a, output y);
                wire unused_sig;
                assign unused_sig = ~a;
                assign y = a;
            endmodule",
        );
        assert!(result.is_ok());
        assert!(diags
            .iter()
            .any(|d| d.code == errors::W303 && d.message.contains("unused_sig")));
    }

    #[test]
    fn top_module_defaults_to_last() {
        let nl = netlist(
            "module helper(input x, output y); assign y = ~x; endmodule
             module main(input a, output b); assign b = a; endmodule",
        );
        assert_eq!(nl.name, "main");
    }

    #[test]
    fn explicit_top_selection() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let ast = vp::parse(
            "module one(output y); assign y = 1'b1; endmodule
             module two(output y); assign y = 1'b0; endmodule",
            FileId::from_raw(0),
            &interner,
            &sink,
        );
        let nl = elaborate(&ast, Some("one"), &interner, &sink).unwrap();
        assert_eq!(nl.name, "one");

        let missing = elaborate(&ast, Some("three"), &interner, &sink);
        assert!(missing.unwrap_err().message.contains("not found"));
    }

    #[test]
    fn determinism_across_runs() {
        let src = "module m(input clk, input [7:0] d, output reg [7:0] q);
            always @(posedge clk) q <= d;
        endmodule";
        let dump = |_: ()| {
            let (result, _, _) = run(src);
            result.unwrap().to_json()
        };
        assert_eq!(dump(()), dump(()));
    }
}
