//! Round-trip laws and cross-cutting invariants: printer fixpoint,
//! AST⇄JSON losslessness, number-literal canonicalization, token positions,
//! span nesting, and elaboration determinism.

use silica_common::Interner;
use silica_conformance::compile;
use silica_diagnostics::DiagnosticSink;
use silica_source::{FileId, SourceDb, Span};
use silica_verilog_parser as vp;
use silica_verilog_parser::ast::VerilogSourceFile;
use silica_verilog_parser::printer::Printer;

fn parse(source: &str, interner: &Interner) -> VerilogSourceFile {
    let sink = DiagnosticSink::new();
    let ast = vp::parse(source, FileId::from_raw(0), interner, &sink);
    assert!(
        !sink.has_errors(),
        "parse of {source:?} failed: {:?}",
        sink.diagnostics()
    );
    ast
}

/// Strips every `span` field from a JSON tree, leaving pure structure.
fn without_spans(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .filter(|(k, _)| k != "span")
                .map(|(k, v)| (k, without_spans(v)))
                .collect(),
        ),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(without_spans).collect())
        }
        other => other,
    }
}

/// `parse(print(ast))` reproduces the tree modulo spans.
fn assert_reparse_equal(source: &str) {
    let interner = Interner::new();
    let ast = parse(source, &interner);
    let printed = Printer::new(&interner).print_source_file(&ast);
    let reparsed = parse(&printed, &interner);

    let a = without_spans(serde_json::to_value(&ast).unwrap());
    let b = without_spans(serde_json::to_value(&reparsed).unwrap());
    assert_eq!(a, b, "print/reparse changed structure for:\n{printed}");
}

#[test]
fn print_reparse_identity_combinational() {
    assert_reparse_equal(
        "module m(input [7:0] a, b, input s, output [7:0] y);
            assign y = s ? a + b : (a - b) * 8'd2;
        endmodule",
    );
}

#[test]
fn print_reparse_identity_sequential() {
    assert_reparse_equal(
        "module c(input clk, input rst_n, output reg [3:0] q);
            always @(posedge clk or negedge rst_n)
                if (!rst_n)
                    q <= 4'd0;
                else
                    q <= q + 4'd1;
        endmodule",
    );
}

#[test]
fn print_reparse_identity_case_and_selects() {
    assert_reparse_equal(
        "module s(input [1:0] sel, input [7:0] d, output reg [1:0] y);
            always @(*)
                casez (sel)
                    2'b1?: y = d[1:0];
                    default: y = d[3 +: 2];
                endcase
        endmodule",
    );
}

#[test]
fn print_reparse_identity_structural() {
    assert_reparse_equal(
        "module top #(parameter N = 4)(input [N-1:0] a, output [N-1:0] y);
            genvar i;
            generate
                for (i = 0; i < N; i = i + 1) begin : g
                    inv u (.a(a[i]), .y(y[i]));
                end
            endgenerate
        endmodule
        module inv(input a, output y);
            assign y = ~a;
        endmodule",
    );
}

#[test]
fn printer_is_a_fixpoint_for_non_ansi_ports() {
    // Non-ANSI modules normalize to ANSI; after the first print the text is
    // stable.
    let interner = Interner::new();
    let ast = parse(
        "module counter(clk, rst, count);
            input clk;
            input rst;
            output [7:0] count;
            reg [7:0] count;
            always @(posedge clk)
                if (rst) count <= 8'd0;
                else count <= count + 8'd1;
        endmodule",
        &interner,
    );
    let once = Printer::new(&interner).print_source_file(&ast);
    let twice = Printer::new(&interner).print_source_file(&parse(&once, &interner));
    assert_eq!(once, twice);
    assert!(once.contains("output reg [7:0] count"));
}

#[test]
fn ast_json_roundtrip_is_lossless() {
    let interner = Interner::new();
    let ast = parse(
        "(* top *) module m #(parameter W = 8)(input [W-1:0] a, output y);
            wire [W-1:0] t;
            assign t = a ^ {W{1'b1}};
            assign y = &t;
        endmodule",
        &interner,
    );

    let json = serde_json::to_string(&ast).unwrap();
    let back: VerilogSourceFile = serde_json::from_str(&json).unwrap();
    let json_again = serde_json::to_string(&back).unwrap();
    assert_eq!(json, json_again);
}

#[test]
fn ast_json_uses_type_discriminators() {
    let interner = Interner::new();
    let ast = parse("module m(output y); assign y = 1'b0 ? 1'b1 : 1'b0; endmodule", &interner);
    let value = serde_json::to_value(&ast).unwrap();
    let text = value.to_string();
    assert!(text.contains("\"_type\":\"Module\""));
    assert!(text.contains("\"_type\":\"ContinuousAssign\""));
    assert!(text.contains("\"_type\":\"Ternary\""));
    assert!(text.contains("\"_type\":\"Number\""));
}

#[test]
fn equivalent_number_forms_share_resolution() {
    use vp::number::{parse_number, NumberValue};
    let forms = ["8'hFF", "8'hff", "8'b1111_1111", "8'd255", "8'o377"];
    for form in forms {
        match parse_number(form) {
            Some(NumberValue::Int { value, width, .. }) => {
                assert_eq!((value, width), (255, 8), "form {form}");
            }
            other => panic!("{form} resolved to {other:?}"),
        }
    }
}

#[test]
fn number_raw_text_roundtrips_exactly() {
    let interner = Interner::new();
    let ast = parse(
        "module n(output [31:0] y);
            assign y = 32'hDEAD_BEEF + 8'b1010_0101 + 42 + 'o17;
        endmodule",
        &interner,
    );
    let printed = Printer::new(&interner).print_source_file(&ast);
    for raw in ["32'hDEAD_BEEF", "8'b1010_0101", "42", "'o17"] {
        assert!(printed.contains(raw), "missing {raw} in:\n{printed}");
    }
}

#[test]
fn token_positions_point_at_first_byte() {
    let sink = DiagnosticSink::new();
    let mut db = SourceDb::new();
    let source = "module top;\n  wire a;\nendmodule\n";
    let file = db.add_source("t.v", source.to_string());
    let tokens = vp::lexer::lex(source, file, &sink);

    let expected = [
        (1, 1),  // module
        (1, 8),  // top
        (1, 11), // ;
        (2, 3),  // wire
        (2, 8),  // a
        (2, 9),  // ;
        (3, 1),  // endmodule
    ];
    for (token, (line, col)) in tokens.iter().zip(expected) {
        let resolved = db.resolve(token.span);
        assert_eq!(
            (resolved.line, resolved.col),
            (line, col),
            "token {:?}",
            token.kind
        );
    }
}

#[test]
fn ast_spans_nest_within_parents() {
    use vp::ast::*;
    use vp::visitor::{walk_expr, walk_statement, Visit};

    struct NestChecker {
        stack: Vec<Span>,
        checked: usize,
    }

    impl NestChecker {
        fn enter(&mut self, span: Span) {
            if let Some(parent) = self.stack.last() {
                assert!(
                    parent.contains(span),
                    "child {span:?} escapes parent {parent:?}"
                );
                self.checked += 1;
            }
            self.stack.push(span);
        }
    }

    impl Visit for NestChecker {
        fn visit_statement(&mut self, stmt: &Statement) {
            self.enter(stmt.span());
            walk_statement(self, stmt);
            self.stack.pop();
        }

        fn visit_expr(&mut self, expr: &Expr) {
            self.enter(expr.span());
            walk_expr(self, expr);
            self.stack.pop();
        }
    }

    let interner = Interner::new();
    let ast = parse(
        "module m(input clk, input [7:0] d, output reg [7:0] q);
            always @(posedge clk) begin
                if (d[0] & d[1])
                    q <= d + 8'd1;
                else
                    q <= {d[6:0], 1'b0};
            end
        endmodule",
        &interner,
    );

    let mut checker = NestChecker {
        stack: Vec::new(),
        checked: 0,
    };
    for module in ast.modules() {
        checker.stack.push(module.span);
        for item in &module.items {
            if let ModuleItem::AlwaysBlock(ab) = item {
                checker.visit_statement(&ab.body);
            }
        }
        checker.stack.pop();
    }
    assert!(checker.checked > 10, "checked {} nestings", checker.checked);
}

#[test]
fn elaboration_is_deterministic() {
    let source = "module fa(input a, b, cin, output s, cout);
        assign s = a ^ b ^ cin;
        assign cout = (a & b) | (cin & (a ^ b));
    endmodule
    module top(input [3:0] a, b, output [3:0] s, output cout);
        wire [4:0] c;
        assign c[0] = 1'b0;
        genvar i;
        generate
            for (i = 0; i < 4; i = i + 1) begin : bits
                fa u (.a(a[i]), .b(b[i]), .cin(c[i]), .s(s[i]), .cout(c[i+1]));
            end
        endgenerate
        assign cout = c[4];
    endmodule";

    let dump = || compile(source, Some("top")).netlist().to_json();
    assert_eq!(dump(), dump());
}

#[test]
fn blif_export_of_elaborated_design() {
    let result = compile(
        "module m(input a, b, output c);
            assign c = a & b;
        endmodule",
        None,
    );
    let blif = silica_netlist::blif::netlist_to_blif(result.netlist());
    assert!(blif.contains(".model m"));
    assert!(blif.contains(".inputs a b"));
    assert!(blif.contains(".outputs c"));
    assert!(blif.contains("11 1"));
}
