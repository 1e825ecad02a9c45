//! Generate construct unrolling.
//!
//! Runs before lowering, so the rest of the elaborator only ever sees a
//! straight-line item list. `generate for` produces one lexical copy of its
//! body per iteration with the genvar substituted by its constant value and
//! locally declared names prefixed `label[i].`; `generate if` keeps one
//! branch; `generate case` keeps the first matching arm.

use crate::const_eval::{self, ConstEnv, ConstValue};
use crate::context::ElabContext;
use crate::errors;
use silica_common::Ident;
use silica_diagnostics::Diagnostic;
use silica_source::Span;
use silica_verilog_parser::ast::*;
use silica_verilog_parser::visitor::{map_expr, Transform};
use std::collections::{HashMap, HashSet};

/// Iteration bound; a loop running past this is reported instead of hanging.
const MAX_UNROLL: usize = 65_536;

/// Expands every generate construct in `items`, returning a flat item list.
pub fn expand_items(
    ctx: &ElabContext<'_>,
    items: &[ModuleItem],
    env: &ConstEnv,
) -> Result<Vec<ModuleItem>, Diagnostic> {
    let mut out = Vec::new();
    for item in items {
        match item {
            ModuleItem::Generate(block) => expand_generate(ctx, block, env, &mut out)?,
            other => out.push(other.clone()),
        }
    }
    Ok(out)
}

fn expand_generate(
    ctx: &ElabContext<'_>,
    block: &GenerateBlock,
    env: &ConstEnv,
    out: &mut Vec<ModuleItem>,
) -> Result<(), Diagnostic> {
    match block {
        GenerateBlock::For {
            genvar,
            init,
            condition,
            step,
            label,
            items,
            span,
        } => {
            let mut value = const_eval::eval(init, env, ctx.interner)?.as_i64();
            let mut iterations = 0usize;

            loop {
                let iter_env = env.bind(*genvar, ConstValue::Int(value));
                if const_eval::eval(condition, &iter_env, ctx.interner)?.as_i64() == 0 {
                    break;
                }
                iterations += 1;
                if iterations > MAX_UNROLL {
                    return Err(errors::unsupported(
                        "generate loop exceeding 65536 iterations",
                        *span,
                    ));
                }

                let copy = instantiate_iteration(ctx, items, *genvar, value, *label, *span);
                out.extend(expand_items(ctx, &copy, &iter_env)?);

                value = const_eval::eval(step, &iter_env, ctx.interner)?.as_i64();
            }
            Ok(())
        }

        GenerateBlock::If {
            condition,
            then_items,
            else_items,
            ..
        } => {
            let taken = if const_eval::eval(condition, env, ctx.interner)?.as_i64() != 0 {
                then_items
            } else {
                else_items
            };
            out.extend(expand_items(ctx, taken, env)?);
            Ok(())
        }

        GenerateBlock::Case { expr, arms, .. } => {
            let selector = const_eval::eval(expr, env, ctx.interner)?.as_i64();
            let mut default: Option<&GenerateCaseArm> = None;
            for arm in arms {
                if arm.is_default {
                    if default.is_none() {
                        default = Some(arm);
                    }
                    continue;
                }
                for pattern in &arm.patterns {
                    if const_eval::eval(pattern, env, ctx.interner)?.as_i64() == selector {
                        out.extend(expand_items(ctx, &arm.items, env)?);
                        return Ok(());
                    }
                }
            }
            if let Some(arm) = default {
                out.extend(expand_items(ctx, &arm.items, env)?);
            }
            Ok(())
        }

        GenerateBlock::Block { items, .. } => {
            out.extend(expand_items(ctx, items, env)?);
            Ok(())
        }
    }
}

/// Produces one iteration's copy of the loop body: the genvar becomes a
/// literal and names declared inside the body get the `label[i].` prefix
/// (both their declarations and every local use).
fn instantiate_iteration(
    ctx: &ElabContext<'_>,
    items: &[ModuleItem],
    genvar: Ident,
    value: i64,
    label: Option<Ident>,
    span: Span,
) -> Vec<ModuleItem> {
    let label_text = label
        .map(|l| ctx.interner.resolve(l).to_string())
        .unwrap_or_else(|| "genblk".to_string());
    let iter_prefix = format!("{label_text}[{value}].");

    // Names declared by this iteration, which must become iteration-local.
    let mut local: HashMap<Ident, Ident> = HashMap::new();
    for item in items {
        match item {
            ModuleItem::NetDecl(decl) => {
                for name in &decl.names {
                    let renamed = ctx
                        .interner
                        .intern(&format!("{iter_prefix}{}", ctx.interner.resolve(name.name)));
                    local.insert(name.name, renamed);
                }
            }
            ModuleItem::GenvarDecl(decl) => {
                for &name in &decl.names {
                    let renamed = ctx
                        .interner
                        .intern(&format!("{iter_prefix}{}", ctx.interner.resolve(name)));
                    local.insert(name, renamed);
                }
            }
            _ => {}
        }
    }

    let mut rewriter = IterationRewriter {
        genvar,
        value,
        span,
        local: &local,
    };

    items
        .iter()
        .map(|item| {
            let mut copy = rewriter.transform_module_item(item.clone());
            // Declared names and instance names carry the iteration prefix.
            match &mut copy {
                ModuleItem::NetDecl(decl) => {
                    for name in &mut decl.names {
                        if let Some(&renamed) = local.get(&name.name) {
                            name.name = renamed;
                        }
                    }
                }
                ModuleItem::GenvarDecl(decl) => {
                    for name in &mut decl.names {
                        if let Some(&renamed) = local.get(name) {
                            *name = renamed;
                        }
                    }
                }
                ModuleItem::Instantiation(inst) => {
                    for instance in &mut inst.instances {
                        let renamed = format!(
                            "{iter_prefix}{}",
                            ctx.interner.resolve(instance.name)
                        );
                        instance.name = ctx.interner.intern(&renamed);
                    }
                }
                // A nested generate loop carries the outer iteration in its
                // label, so its own iterations stay distinct per outer copy.
                ModuleItem::Generate(GenerateBlock::For { label, .. }) => {
                    let inner = label
                        .map(|l| ctx.interner.resolve(l).to_string())
                        .unwrap_or_else(|| "genblk".to_string());
                    *label = Some(ctx.interner.intern(&format!("{iter_prefix}{inner}")));
                }
                _ => {}
            }
            copy
        })
        .collect()
}

/// Substitutes the genvar with its value and renames iteration-local
/// identifiers at their uses.
struct IterationRewriter<'a> {
    genvar: Ident,
    value: i64,
    span: Span,
    local: &'a HashMap<Ident, Ident>,
}

impl Transform for IterationRewriter<'_> {
    fn transform_expr(&mut self, expr: Expr) -> Expr {
        match expr {
            Expr::Identifier { name, span } if name == self.genvar => Expr::Number {
                value: self.value as u64,
                width: 32,
                signed: true,
                raw: self.value.to_string(),
                span,
            },
            Expr::Identifier { name, span } => match self.local.get(&name) {
                Some(&renamed) => Expr::Identifier {
                    name: renamed,
                    span,
                },
                None => Expr::Identifier { name, span },
            },
            other => map_expr(self, other),
        }
    }
}

/// Names used for sanity checks in tests.
#[allow(dead_code)]
fn declared_names(items: &[ModuleItem]) -> HashSet<Ident> {
    let mut names = HashSet::new();
    for item in items {
        if let ModuleItem::NetDecl(decl) = item {
            for name in &decl.names {
                names.insert(name.name);
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use silica_common::Interner;
    use silica_diagnostics::DiagnosticSink;
    use silica_source::FileId;
    use silica_verilog_parser as vp;

    fn parse_module(source: &str, interner: &Interner) -> ModuleDecl {
        let sink = DiagnosticSink::new();
        let ast = vp::parse(source, FileId::from_raw(0), interner, &sink);
        assert!(!sink.has_errors(), "{:?}", sink.diagnostics());
        let module = ast.modules().next().unwrap().clone();
        module
    }

    fn expand(
        source: &str,
        interner: &Interner,
        sink: &DiagnosticSink,
    ) -> Result<Vec<ModuleItem>, Diagnostic> {
        let module = parse_module(source, interner);
        let file = VerilogSourceFile {
            items: vec![VerilogItem::Module(module.clone())],
            span: module.span,
        };
        // Leak to satisfy the registry lifetime inside the test.
        let file: &'static VerilogSourceFile = Box::leak(Box::new(file));
        let ctx = ElabContext::new(interner, sink, file.modules(), "t");
        expand_items(&ctx, &file.modules().next().unwrap().items, &ConstEnv::new())
    }

    #[test]
    fn for_loop_unrolls_with_substitution() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let items = expand(
            "module t;
                genvar i;
                generate
                    for (i = 0; i < 3; i = i + 1) begin : g
                        assign y[i] = a[i];
                    end
                endgenerate
            endmodule",
            &interner,
            &sink,
        )
        .unwrap();

        let assigns: Vec<_> = items
            .iter()
            .filter_map(|i| match i {
                ModuleItem::ContinuousAssign(a) => Some(a),
                _ => None,
            })
            .collect();
        assert_eq!(assigns.len(), 3);
        // Each iteration's index became a literal.
        for (n, assign) in assigns.iter().enumerate() {
            match &assign.lhs {
                Expr::Index { index, .. } => match index.as_ref() {
                    Expr::Number { value, .. } => assert_eq!(*value, n as u64),
                    other => panic!("expected literal index, got {other:?}"),
                },
                other => panic!("expected index lhs, got {other:?}"),
            }
        }
    }

    #[test]
    fn local_decls_get_iteration_prefix() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let items = expand(
            "module t;
                genvar i;
                generate
                    for (i = 0; i < 2; i = i + 1) begin : stage
                        wire carry;
                        assign carry = 1'b0;
                    end
                endgenerate
            endmodule",
            &interner,
            &sink,
        )
        .unwrap();

        let decl_names: Vec<String> = items
            .iter()
            .filter_map(|i| match i {
                ModuleItem::NetDecl(d) => Some(interner.resolve(d.names[0].name).to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(decl_names, vec!["stage[0].carry", "stage[1].carry"]);

        // Uses were renamed consistently with their declarations.
        let assign_targets: Vec<String> = items
            .iter()
            .filter_map(|i| match i {
                ModuleItem::ContinuousAssign(a) => match &a.lhs {
                    Expr::Identifier { name, .. } => {
                        Some(interner.resolve(*name).to_string())
                    }
                    _ => None,
                },
                _ => None,
            })
            .collect();
        assert_eq!(assign_targets, vec!["stage[0].carry", "stage[1].carry"]);
    }

    #[test]
    fn instances_get_iteration_prefix() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let items = expand(
            "module t;
                genvar i;
                generate
                    for (i = 0; i < 2; i = i + 1) begin : cells
                        inv u (.a(x[i]), .y(z[i]));
                    end
                endgenerate
            endmodule",
            &interner,
            &sink,
        )
        .unwrap();

        let names: Vec<String> = items
            .iter()
            .filter_map(|i| match i {
                ModuleItem::Instantiation(inst) => {
                    Some(interner.resolve(inst.instances[0].name).to_string())
                }
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["cells[0].u", "cells[1].u"]);
    }

    #[test]
    fn generate_if_picks_constant_branch() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let items = expand(
            "module t #(parameter W = 4);
                generate
                    if (1) begin
                        wire taken;
                    end else begin
                        wire skipped;
                    end
                endgenerate
            endmodule",
            &interner,
            &sink,
        )
        .unwrap();
        assert_eq!(items.len(), 1);
        match &items[0] {
            ModuleItem::NetDecl(d) => assert_eq!(interner.resolve(d.names[0].name), "taken"),
            other => panic!("expected decl, got {other:?}"),
        }
    }

    #[test]
    fn generate_case_first_match_wins() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let items = expand(
            "module t;
                generate
                    case (2)
                        1: begin wire one; end
                        2, 3: begin wire two; end
                        2: begin wire shadowed; end
                        default: begin wire other; end
                    endcase
                endgenerate
            endmodule",
            &interner,
            &sink,
        )
        .unwrap();
        assert_eq!(items.len(), 1);
        match &items[0] {
            ModuleItem::NetDecl(d) => assert_eq!(interner.resolve(d.names[0].name), "two"),
            other => panic!("expected decl, got {other:?}"),
        }
    }

    #[test]
    fn non_constant_bound_is_an_error() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let err = expand(
            "module t(input [3:0] n);
                genvar i;
                generate
                    for (i = 0; i < n; i = i + 1) begin : g
                        wire w;
                    end
                endgenerate
            endmodule",
            &interner,
            &sink,
        )
        .unwrap_err();
        assert!(err.message.contains("constant"));
    }
}
