//! Expression lowering: AST expressions into cells and nets.
//!
//! Each visit returns a [`Lowered`] — the driving net, its width, and
//! whether the net was synthesized here. Constant sub-expressions fold
//! through [`const_eval`] into `CONST` cells before any gates are built.
//!
//! Width rules: arithmetic and bitwise results take the widest of their
//! operands and the assignment context (so `{cout, sum} = a + b + cin`
//! produces a 9-bit adder chain); comparisons, logical connectives, and
//! reductions are one bit; shifts take the left operand's width. Unsized
//! literals adopt the context width.

use crate::const_eval::{self, literal_value};
use crate::context::{ElabContext, Lowered, ModuleScope};
use crate::errors;
use crate::memory;
use silica_diagnostics::Diagnostic;
use silica_netlist::{CellOp, NetId};
use silica_source::Span;
use silica_verilog_parser::ast::{BinaryOp, Expr, UnaryOp};

/// Lowers an expression, returning its driving net and width.
///
/// `ctx_width` is the context-determined width from the assignment target
/// (if any); it widens arithmetic and sizes unsized literals.
pub fn lower_expr(
    ctx: &mut ElabContext<'_>,
    scope: &ModuleScope,
    expr: &Expr,
    ctx_width: Option<u32>,
) -> Result<Lowered, Diagnostic> {
    match expr {
        Expr::Number {
            value,
            width,
            signed,
            raw,
            span: _,
        } => {
            let sized = raw.contains('\'');
            let w = if sized {
                *width
            } else {
                ctx_width.unwrap_or(*width)
            };
            let v = literal_value(*value, *width, *signed);
            let net = ctx.const_net(&scope.prefix, v, w);
            // Literals with x/z digits keep their bit pattern alongside the
            // two-state value.
            if raw.contains(['x', 'X', 'z', 'Z', '?']) {
                if let Some(bits) = silica_verilog_parser::number::parse_bits(raw) {
                    let cell = ctx.netlist.net(net).driver.expect("const drives net").cell;
                    ctx.netlist.set_attr(cell, "bits", bits);
                }
            }
            Ok(fresh(net, w))
        }

        Expr::Identifier { name, span } => {
            if let Some(signal) = scope.resolve(*name) {
                return Ok(signal);
            }
            if let Some(value) = scope.consts.lookup(*name) {
                let w = ctx_width.unwrap_or(32);
                return Ok(fresh(
                    ctx.const_net(&scope.prefix, value.as_i64(), w),
                    w,
                ));
            }
            if scope.memories.contains_key(name) {
                return Err(errors::unsupported(
                    &format!(
                        "memory `{}` referenced without an index",
                        ctx.name(*name)
                    ),
                    *span,
                ));
            }
            Err(errors::unresolved_signal(ctx.name(*name), *span))
        }

        Expr::HierarchicalName { span, .. } => Err(errors::unsupported(
            "hierarchical reference across module boundaries",
            *span,
        )),

        Expr::Index { base, index, span } => lower_index(ctx, scope, base, index, *span),

        Expr::RangeSelect {
            base,
            msb,
            lsb,
            span,
        } => {
            let hi = const_eval::eval(msb, &scope.consts, ctx.interner)?.as_i64();
            let lo = const_eval::eval(lsb, &scope.consts, ctx.interner)?.as_i64();
            let (hi, lo) = if hi >= lo { (hi, lo) } else { (lo, hi) };
            let width = (hi - lo + 1) as u32;

            // A range covered by one partial driver reads the piece itself.
            if let Expr::Identifier { name, .. } = base.as_ref() {
                if let Some(piece) = read_partial(ctx, scope, *name, hi as u32, lo as u32) {
                    return Ok(piece);
                }
            }

            let b = lower_expr(ctx, scope, base, None)?;
            check_bit_range(ctx, hi, lo, b.width, *span)?;
            let net = ctx.slice_cell(&scope.prefix, b.net, b.width, hi as u32, lo as u32);
            Ok(fresh(net, width))
        }

        Expr::PartSelect {
            base,
            index,
            ascending,
            width,
            span,
        } => {
            let w = const_eval::eval(width, &scope.consts, ctx.interner)?.as_i64();
            if w <= 0 {
                return Err(errors::not_constant("part-select width", *span));
            }
            let w = w as u32;
            let b = lower_expr(ctx, scope, base, None)?;

            match const_eval::eval(index, &scope.consts, ctx.interner) {
                Ok(idx) => {
                    let idx = idx.as_i64();
                    let (hi, lo) = if *ascending {
                        (idx + w as i64 - 1, idx)
                    } else {
                        (idx, idx - w as i64 + 1)
                    };
                    check_bit_range(ctx, hi, lo, b.width, *span)?;
                    let net =
                        ctx.slice_cell(&scope.prefix, b.net, b.width, hi as u32, lo as u32);
                    Ok(fresh(net, w))
                }
                // Dynamic base index: shift the vector down, then slice the
                // low bits.
                Err(_) => {
                    let idx = lower_expr(ctx, scope, index, None)?;
                    let amount = if *ascending {
                        idx
                    } else {
                        let offset = ctx.const_net(&scope.prefix, w as i64 - 1, idx.width);
                        let net = ctx.binary_cell(
                            &scope.prefix,
                            CellOp::Sub,
                            idx.net,
                            idx.width,
                            offset,
                            idx.width,
                            idx.width,
                        );
                        fresh(net, idx.width)
                    };
                    let shifted = ctx.binary_cell(
                        &scope.prefix,
                        CellOp::Shr,
                        b.net,
                        b.width,
                        amount.net,
                        amount.width,
                        b.width,
                    );
                    let net = ctx.slice_cell(&scope.prefix, shifted, b.width, w - 1, 0);
                    Ok(fresh(net, w))
                }
            }
        }

        Expr::Concat { parts, span } => {
            if parts.is_empty() {
                return Err(errors::unsupported("empty concatenation", *span));
            }
            let lowered: Vec<Lowered> = parts
                .iter()
                .map(|p| lower_expr(ctx, scope, p, None))
                .collect::<Result<_, _>>()?;
            Ok(build_concat(ctx, scope, &lowered, 1))
        }

        Expr::Replication { count, parts, span } => {
            let n = const_eval::eval(count, &scope.consts, ctx.interner)?.as_i64();
            if n <= 0 {
                return Err(errors::not_constant("replication count", *span));
            }
            let lowered: Vec<Lowered> = parts
                .iter()
                .map(|p| lower_expr(ctx, scope, p, None))
                .collect::<Result<_, _>>()?;
            Ok(build_concat(ctx, scope, &lowered, n as u32))
        }

        Expr::Unary { op, operand, span } => lower_unary(ctx, scope, *op, operand, ctx_width, *span),

        Expr::Binary { op, lhs, rhs, .. } => {
            // Fold fully constant subtrees rather than building gates.
            if let Ok(v) = const_eval::eval(expr, &scope.consts, ctx.interner) {
                let w = ctx_width.unwrap_or_else(|| natural_width(v.as_i64()));
                return Ok(fresh(ctx.const_net(&scope.prefix, v.as_i64(), w), w));
            }
            lower_binary(ctx, scope, *op, lhs, rhs, ctx_width)
        }

        Expr::Ternary {
            condition,
            then_expr,
            else_expr,
            ..
        } => {
            let cond = lower_expr(ctx, scope, condition, None)?;
            let sel = ctx.bool_net(&scope.prefix, cond.net, cond.width);
            let t = lower_expr(ctx, scope, then_expr, ctx_width)?;
            let e = lower_expr(ctx, scope, else_expr, ctx_width)?;
            let width = t.width.max(e.width).max(ctx_width.unwrap_or(0));
            let net = ctx.mux_cell(&scope.prefix, sel, e.net, t.net, width);
            Ok(fresh(net, width))
        }

        Expr::SystemCall { name, span, .. } => {
            match const_eval::eval(expr, &scope.consts, ctx.interner) {
                Ok(v) => {
                    let w = ctx_width.unwrap_or_else(|| natural_width(v.as_i64()));
                    Ok(fresh(ctx.const_net(&scope.prefix, v.as_i64(), w), w))
                }
                Err(_) => Err(errors::unsupported(
                    &format!("system function `{}` on non-constant operands", ctx.name(*name)),
                    *span,
                )),
            }
        }

        Expr::FunctionCall { name, span, .. } => Err(errors::unsupported(
            &format!("call to user function `{}`", ctx.name(*name)),
            *span,
        )),

        Expr::RealNumber { span, .. } => Err(errors::unsupported(
            "real value in synthesized logic",
            *span,
        )),

        Expr::StringLiteral { span, .. } => Err(errors::unsupported(
            "string value in synthesized logic",
            *span,
        )),

        Expr::Error(span) => Err(errors::unsupported("erroneous expression", *span)),
    }
}

/// Drives `target` from a lowered expression: fresh nets are spliced (their
/// driver pin moves onto the target), existing nets go through a `BUF`.
pub fn drive_net(
    ctx: &mut ElabContext<'_>,
    scope: &ModuleScope,
    target: NetId,
    value: Lowered,
    span: Span,
) -> Result<(), Diagnostic> {
    if value.net == target {
        return Ok(());
    }
    let target_name = ctx.netlist.net(target).name.clone();
    if value.fresh {
        ctx.netlist
            .move_driver(value.net, target)
            .map_err(|_| errors::multi_driver(&target_name, span))
    } else {
        let target_width = ctx.netlist.net(target).width;
        let cell = ctx.fresh_cell(&scope.prefix, CellOp::Buf);
        let pa = ctx.netlist.add_input_pin(cell, "A", value.width);
        let py = ctx.netlist.add_output_pin(cell, "Y", target_width);
        ctx.netlist.add_sink(value.net, pa);
        ctx.netlist
            .set_driver(target, py)
            .map_err(|_| errors::multi_driver(&target_name, span))
    }
}

fn fresh(net: NetId, width: u32) -> Lowered {
    Lowered {
        net,
        width,
        fresh: true,
    }
}

/// Width of the smallest vector holding `v` (at least 1).
pub fn natural_width(v: i64) -> u32 {
    if v <= 0 {
        32
    } else {
        (64 - (v as u64).leading_zeros()).max(1)
    }
}

fn check_bit_range(
    ctx: &ElabContext<'_>,
    hi: i64,
    lo: i64,
    width: u32,
    span: Span,
) -> Result<(), Diagnostic> {
    let _ = ctx;
    if lo < 0 || hi >= width as i64 {
        return Err(Diagnostic::error(
            errors::E204,
            format!("bit select [{hi}:{lo}] out of range for a {width}-bit signal"),
            span,
        ));
    }
    Ok(())
}

fn lower_index(
    ctx: &mut ElabContext<'_>,
    scope: &ModuleScope,
    base: &Expr,
    index: &Expr,
    span: Span,
) -> Result<Lowered, Diagnostic> {
    // Memory read: `mem[addr]` where `mem` has an unpacked dimension.
    if let Expr::Identifier { name, .. } = base {
        if let Some(mem) = scope.memories.get(name).cloned() {
            let addr = lower_expr(ctx, scope, index, None)?;
            return Ok(memory_read_lowered(ctx, scope, &mem, addr));
        }
    }

    match const_eval::eval(index, &scope.consts, ctx.interner) {
        Ok(idx) => {
            let idx = idx.as_i64();
            // A bit covered by a partial driver reads the piece itself.
            if let Expr::Identifier { name, .. } = base {
                if idx >= 0 {
                    if let Some(piece) = read_partial(ctx, scope, *name, idx as u32, idx as u32) {
                        return Ok(piece);
                    }
                }
            }
            let b = lower_expr(ctx, scope, base, None)?;
            check_bit_range(ctx, idx, idx, b.width, span)?;
            let net = ctx.slice_cell(&scope.prefix, b.net, b.width, idx as u32, idx as u32);
            Ok(fresh(net, 1))
        }
        // Dynamic bit select: shift right by the index, take bit zero.
        Err(_) => {
            let b = lower_expr(ctx, scope, base, None)?;
            let idx = lower_expr(ctx, scope, index, None)?;
            let shifted = ctx.binary_cell(
                &scope.prefix,
                CellOp::Shr,
                b.net,
                b.width,
                idx.net,
                idx.width,
                b.width,
            );
            let net = ctx.slice_cell(&scope.prefix, shifted, b.width, 0, 0);
            Ok(fresh(net, 1))
        }
    }
}

/// Reads `[hi:lo]` of a partially driven signal straight from its covering
/// piece, slicing within the piece when it is wider than the request.
fn read_partial(
    ctx: &mut ElabContext<'_>,
    scope: &ModuleScope,
    name: silica_common::Ident,
    hi: u32,
    lo: u32,
) -> Option<Lowered> {
    let (piece, offset) = scope.partial_piece(name, hi, lo)?;
    let width = hi - lo + 1;
    if offset == 0 && piece.width == width {
        return Some(Lowered {
            net: piece.net,
            width,
            fresh: false,
        });
    }
    let net = ctx.slice_cell(
        &scope.prefix,
        piece.net,
        piece.width,
        offset + width - 1,
        offset,
    );
    Some(fresh(net, width))
}

fn memory_read_lowered(
    ctx: &mut ElabContext<'_>,
    scope: &ModuleScope,
    mem: &crate::context::MemoryInfo,
    addr: Lowered,
) -> Lowered {
    memory::memory_read(ctx, &scope.prefix, mem, addr)
}

fn build_concat(
    ctx: &mut ElabContext<'_>,
    scope: &ModuleScope,
    parts: &[Lowered],
    repetitions: u32,
) -> Lowered {
    let total: u32 = parts.iter().map(|p| p.width).sum::<u32>() * repetitions;
    let cell = ctx.fresh_cell(&scope.prefix, CellOp::Concat);
    let mut index = 0;
    for _ in 0..repetitions {
        for part in parts {
            let pin = ctx
                .netlist
                .add_input_pin(cell, &format!("A{index}"), part.width);
            ctx.netlist.add_sink(part.net, pin);
            index += 1;
        }
    }
    let py = ctx.netlist.add_output_pin(cell, "Y", total);
    let out = ctx.fresh_net(&scope.prefix, CellOp::Concat, total);
    ctx.netlist
        .set_driver(out, py)
        .expect("fresh net has no driver");
    fresh(out, total)
}

fn lower_unary(
    ctx: &mut ElabContext<'_>,
    scope: &ModuleScope,
    op: UnaryOp,
    operand: &Expr,
    ctx_width: Option<u32>,
    _span: Span,
) -> Result<Lowered, Diagnostic> {
    match op {
        UnaryOp::Plus => lower_expr(ctx, scope, operand, ctx_width),

        UnaryOp::Minus => {
            let x = lower_expr(ctx, scope, operand, ctx_width)?;
            let width = x.width.max(ctx_width.unwrap_or(0));
            let zero = ctx.const_net(&scope.prefix, 0, width);
            let net = ctx.binary_cell(
                &scope.prefix,
                CellOp::Sub,
                zero,
                width,
                x.net,
                x.width,
                width,
            );
            Ok(fresh(net, width))
        }

        UnaryOp::BitNot => {
            let x = lower_expr(ctx, scope, operand, ctx_width)?;
            let net = ctx.not_cell(&scope.prefix, x.net, x.width);
            Ok(fresh(net, x.width))
        }

        UnaryOp::LogNot => {
            let x = lower_expr(ctx, scope, operand, None)?;
            let b = ctx.bool_net(&scope.prefix, x.net, x.width);
            let net = ctx.not_cell(&scope.prefix, b, 1);
            Ok(fresh(net, 1))
        }

        UnaryOp::RedAnd
        | UnaryOp::RedOr
        | UnaryOp::RedXor
        | UnaryOp::RedNand
        | UnaryOp::RedNor
        | UnaryOp::RedXnor => {
            let gate = match op {
                UnaryOp::RedAnd => CellOp::And,
                UnaryOp::RedOr => CellOp::Or,
                UnaryOp::RedXor => CellOp::Xor,
                UnaryOp::RedNand => CellOp::Nand,
                UnaryOp::RedNor => CellOp::Nor,
                _ => CellOp::Xnor,
            };
            let x = lower_expr(ctx, scope, operand, None)?;
            let cell = ctx.fresh_cell(&scope.prefix, gate);
            ctx.netlist.set_attr(cell, "reduction", 1i64);
            let pa = ctx.netlist.add_input_pin(cell, "A", x.width);
            let py = ctx.netlist.add_output_pin(cell, "Y", 1);
            ctx.netlist.add_sink(x.net, pa);
            let out = ctx.fresh_net(&scope.prefix, gate, 1);
            ctx.netlist
                .set_driver(out, py)
                .expect("fresh net has no driver");
            Ok(fresh(out, 1))
        }
    }
}

fn lower_binary(
    ctx: &mut ElabContext<'_>,
    scope: &ModuleScope,
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx_width: Option<u32>,
) -> Result<Lowered, Diagnostic> {
    use BinaryOp::*;

    match op {
        // Logical connectives: coerce both sides to booleans.
        LogAnd | LogOr => {
            let l = lower_expr(ctx, scope, lhs, None)?;
            let r = lower_expr(ctx, scope, rhs, None)?;
            let lb = ctx.bool_net(&scope.prefix, l.net, l.width);
            let rb = ctx.bool_net(&scope.prefix, r.net, r.width);
            let cell_op = if op == LogAnd { CellOp::And } else { CellOp::Or };
            let net = ctx.binary_cell(&scope.prefix, cell_op, lb, 1, rb, 1, 1);
            Ok(fresh(net, 1))
        }

        // Comparisons: self-determined operands, one-bit result. The
        // case-equality forms compare the same way once x/z are out of the
        // picture.
        Eq | Ne | CaseEq | CaseNe | Lt | Le | Gt | Ge => {
            let l = lower_expr(ctx, scope, lhs, None)?;
            let r = lower_expr(ctx, scope, rhs, None)?;
            let cell_op = match op {
                Eq | CaseEq => CellOp::Eq,
                Ne | CaseNe => CellOp::Ne,
                Lt => CellOp::Lt,
                Le => CellOp::Le,
                Gt => CellOp::Gt,
                _ => CellOp::Ge,
            };
            let net = ctx.binary_cell(
                &scope.prefix,
                cell_op,
                l.net,
                l.width,
                r.net,
                r.width,
                1,
            );
            Ok(fresh(net, 1))
        }

        // Shifts: the left operand carries the width.
        Shl | AShl | Shr | AShr => {
            let l = lower_expr(ctx, scope, lhs, ctx_width)?;
            let r = lower_expr(ctx, scope, rhs, None)?;
            let width = l.width.max(ctx_width.unwrap_or(0));
            let cell_op = match op {
                Shl | AShl => CellOp::Shl,
                Shr => CellOp::Shr,
                _ => CellOp::Sar,
            };
            let net = ctx.binary_cell(
                &scope.prefix,
                cell_op,
                l.net,
                l.width,
                r.net,
                r.width,
                width,
            );
            Ok(fresh(net, width))
        }

        Pow => Err(errors::unsupported(
            "power operator on non-constant operands",
            lhs.span().merge(rhs.span()),
        )),

        // Arithmetic and bitwise: context-determined widths.
        _ => {
            let l = lower_expr(ctx, scope, lhs, ctx_width)?;
            let r = lower_expr(ctx, scope, rhs, ctx_width)?;
            let width = l.width.max(r.width).max(ctx_width.unwrap_or(0));
            let cell_op = match op {
                Add => CellOp::Add,
                Sub => CellOp::Sub,
                Mul => CellOp::Mul,
                Div => CellOp::Div,
                Mod => CellOp::Mod,
                BitAnd => CellOp::And,
                BitOr => CellOp::Or,
                BitXor => CellOp::Xor,
                _ => CellOp::Xnor, // BitXnor
            };
            let net = ctx.binary_cell(
                &scope.prefix,
                cell_op,
                l.net,
                l.width,
                r.net,
                r.width,
                width,
            );
            Ok(fresh(net, width))
        }
    }
}
