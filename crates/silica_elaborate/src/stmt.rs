//! Lowering of continuous assigns and procedural blocks.
//!
//! Procedural bodies lower through symbolic evaluation: the walker threads a
//! map from assigned signal to its current value net, clones it per branch,
//! and merges branches with muxes. A target missing a value on some path
//! resolves to its own declared net — in a combinational block that is the
//! latch feedback edge (a `LATCH` cell plus a warning), in a sequential
//! block it is ordinary register hold. Case arms merge back-to-front so the
//! first matching arm owns the outermost mux.
//!
//! Sequential classification: a top-level `if` whose taken branch assigns
//! only constants is the reset (async when its signal has a sensitivity
//! edge) and selects `DFFR`; a remaining top-level enable `if` with no
//! `else` selects `DFFE`; everything else is a plain `DFF`.

use crate::const_eval::{self, ConstValue};
use crate::context::{ElabContext, Lowered, ModuleScope, PartialDrive, SignalInfo};
use crate::errors;
use crate::expr::{drive_net, lower_expr};
use crate::memory;
use silica_common::Ident;
use silica_diagnostics::Diagnostic;
use silica_netlist::{CellOp, NetId};
use silica_source::Span;
use silica_verilog_parser::ast::*;
use silica_verilog_parser::number::parse_bits;
use std::collections::{HashMap, HashSet};

const MAX_UNROLL: usize = 65_536;

/// How a procedural body is being lowered.
#[derive(Clone, Copy)]
enum ProcMode {
    Comb,
    Seq { clk: NetId },
}

/// Lowers `assign lhs = rhs;`.
pub fn lower_continuous_assign(
    ctx: &mut ElabContext<'_>,
    scope: &mut ModuleScope,
    assign: &ContinuousAssign,
) -> Result<(), Diagnostic> {
    lower_net_assignment(ctx, scope, &assign.lhs, &assign.rhs, assign.span)
}

fn lower_net_assignment(
    ctx: &mut ElabContext<'_>,
    scope: &mut ModuleScope,
    lhs: &Expr,
    rhs: &Expr,
    span: Span,
) -> Result<(), Diagnostic> {
    match lhs {
        Expr::Identifier { name, span: lspan } => {
            if scope.memories.contains_key(name) {
                return Err(errors::unsupported(
                    "assigning a whole memory",
                    *lspan,
                ));
            }
            let info = *scope
                .nets
                .get(name)
                .ok_or_else(|| errors::unresolved_signal(ctx.name(*name), *lspan))?;
            let value = lower_expr(ctx, scope, rhs, Some(info.width))?;
            drive_net(ctx, scope, info.net, value, span)
        }

        Expr::Index {
            base,
            index,
            span: lspan,
        } => {
            let Expr::Identifier { name, .. } = base.as_ref() else {
                return Err(errors::unsupported("assignment to a computed target", *lspan));
            };
            if scope.memories.contains_key(name) {
                return Err(errors::unsupported(
                    "memory writes outside a clocked always block",
                    *lspan,
                ));
            }
            let idx = const_eval::eval(index, &scope.consts, ctx.interner)
                .map_err(|_| errors::not_constant("assignment target index", *lspan))?
                .as_i64();
            let value = lower_expr(ctx, scope, rhs, Some(1))?;
            push_partial(scope, *name, idx as u32, idx as u32, value, span);
            Ok(())
        }

        Expr::RangeSelect {
            base,
            msb,
            lsb,
            span: lspan,
        } => {
            let Expr::Identifier { name, .. } = base.as_ref() else {
                return Err(errors::unsupported("assignment to a computed target", *lspan));
            };
            let hi = const_eval::eval(msb, &scope.consts, ctx.interner)?.as_i64() as u32;
            let lo = const_eval::eval(lsb, &scope.consts, ctx.interner)?.as_i64() as u32;
            let (hi, lo) = if hi >= lo { (hi, lo) } else { (lo, hi) };
            let value = lower_expr(ctx, scope, rhs, Some(hi - lo + 1))?;
            push_partial(scope, *name, hi, lo, value, span);
            Ok(())
        }

        Expr::PartSelect {
            base,
            index,
            ascending,
            width,
            span: lspan,
        } => {
            let Expr::Identifier { name, .. } = base.as_ref() else {
                return Err(errors::unsupported("assignment to a computed target", *lspan));
            };
            let w = const_eval::eval(width, &scope.consts, ctx.interner)?.as_i64() as u32;
            let idx = const_eval::eval(index, &scope.consts, ctx.interner)
                .map_err(|_| errors::not_constant("assignment target index", *lspan))?
                .as_i64();
            let (hi, lo) = if *ascending {
                ((idx + w as i64 - 1) as u32, idx as u32)
            } else {
                (idx as u32, (idx - w as i64 + 1) as u32)
            };
            let value = lower_expr(ctx, scope, rhs, Some(w))?;
            push_partial(scope, *name, hi, lo, value, span);
            Ok(())
        }

        // `{cout, sum} = rhs` — lower the RHS once at the combined width and
        // split it with SLICE cells, MSB part first.
        Expr::Concat { parts, .. } => {
            let mut widths = Vec::with_capacity(parts.len());
            let mut total = 0u32;
            for part in parts {
                let w = target_width(ctx, scope, part)?;
                widths.push(w);
                total += w;
            }
            let value = lower_expr(ctx, scope, rhs, Some(total))?;

            let mut hi = total;
            for (part, w) in parts.iter().zip(widths) {
                let lo = hi - w;
                let slice = ctx.slice_cell(&scope.prefix, value.net, total, hi - 1, lo);
                let part_value = Lowered {
                    net: slice,
                    width: w,
                    fresh: true,
                };
                assign_lowered_to_net(ctx, scope, part, part_value, span)?;
                hi = lo;
            }
            Ok(())
        }

        other => Err(errors::unsupported(
            "this form of assignment target",
            other.span(),
        )),
    }
}

/// Assigns an already-lowered value to a net-context target (used for
/// concatenation parts).
fn assign_lowered_to_net(
    ctx: &mut ElabContext<'_>,
    scope: &mut ModuleScope,
    lhs: &Expr,
    value: Lowered,
    span: Span,
) -> Result<(), Diagnostic> {
    match lhs {
        Expr::Identifier { name, span: lspan } => {
            let info = *scope
                .nets
                .get(name)
                .ok_or_else(|| errors::unresolved_signal(ctx.name(*name), *lspan))?;
            drive_net(ctx, scope, info.net, value, span)
        }
        Expr::Index { base, index, span: lspan } => {
            let Expr::Identifier { name, .. } = base.as_ref() else {
                return Err(errors::unsupported("assignment to a computed target", *lspan));
            };
            let idx = const_eval::eval(index, &scope.consts, ctx.interner)?.as_i64() as u32;
            push_partial(scope, *name, idx, idx, value, span);
            Ok(())
        }
        Expr::RangeSelect { base, msb, lsb, span: lspan } => {
            let Expr::Identifier { name, .. } = base.as_ref() else {
                return Err(errors::unsupported("assignment to a computed target", *lspan));
            };
            let hi = const_eval::eval(msb, &scope.consts, ctx.interner)?.as_i64() as u32;
            let lo = const_eval::eval(lsb, &scope.consts, ctx.interner)?.as_i64() as u32;
            push_partial(scope, *name, hi.max(lo), hi.min(lo), value, span);
            Ok(())
        }
        other => Err(errors::unsupported(
            "this form of assignment target",
            other.span(),
        )),
    }
}

fn push_partial(
    scope: &mut ModuleScope,
    name: Ident,
    hi: u32,
    lo: u32,
    value: Lowered,
    span: Span,
) {
    scope
        .partials
        .entry(name)
        .or_default()
        .push(PartialDrive { hi, lo, value, span });
}

/// Declared width of an assignment target expression.
fn target_width(
    ctx: &mut ElabContext<'_>,
    scope: &ModuleScope,
    lhs: &Expr,
) -> Result<u32, Diagnostic> {
    match lhs {
        Expr::Identifier { name, span } => {
            if let Some(mem) = scope.memories.get(name) {
                return Ok(mem.width);
            }
            scope
                .nets
                .get(name)
                .map(|i| i.width)
                .ok_or_else(|| errors::unresolved_signal(ctx.name(*name), *span))
        }
        Expr::Index { base, .. } => match base.as_ref() {
            Expr::Identifier { name, .. } if scope.memories.contains_key(name) => {
                Ok(scope.memories[name].width)
            }
            _ => Ok(1),
        },
        Expr::RangeSelect { msb, lsb, .. } => {
            let hi = const_eval::eval(msb, &scope.consts, ctx.interner)?.as_i64();
            let lo = const_eval::eval(lsb, &scope.consts, ctx.interner)?.as_i64();
            Ok((hi - lo).unsigned_abs() as u32 + 1)
        }
        Expr::PartSelect { width, .. } => {
            Ok(const_eval::eval(width, &scope.consts, ctx.interner)?.as_i64() as u32)
        }
        Expr::Concat { parts, .. } => {
            let mut total = 0;
            for p in parts {
                total += target_width(ctx, scope, p)?;
            }
            Ok(total)
        }
        other => Err(errors::unsupported(
            "this form of assignment target",
            other.span(),
        )),
    }
}

/// Applies collected partial drivers: per target, sorts the pieces, checks
/// overlap, and — when something reads the target net as a whole — builds
/// one `CONCAT` driving it. Uncovered bits come from a zero constant and
/// warn as undriven. Targets whose every read resolved directly to a piece
/// need no rebuild at all.
pub fn finalize_partials(
    ctx: &mut ElabContext<'_>,
    scope: &mut ModuleScope,
) -> Result<(), Diagnostic> {
    let partials = std::mem::take(&mut scope.partials);
    let mut entries: Vec<(Ident, Vec<PartialDrive>)> = partials.into_iter().collect();
    // Deterministic processing order.
    entries.sort_by_key(|(name, _)| ctx.name(*name).to_string());

    for (name, mut pieces) in entries {
        let info = scope.nets[&name];
        pieces.sort_by(|a, b| b.hi.cmp(&a.hi));

        // Overlap check, MSB downward.
        for pair in pieces.windows(2) {
            if pair[1].hi >= pair[0].lo {
                return Err(errors::multi_driver(
                    &format!("{}[{}]", ctx.name(name), pair[1].hi),
                    pair[1].span,
                ));
            }
        }

        if ctx.netlist.net(info.net).sinks.is_empty() {
            continue; // every read resolved to a piece directly
        }

        let cell = ctx.fresh_cell(&scope.prefix, CellOp::Concat);
        let mut index = 0;
        let mut cursor = info.width; // next unfilled bit + 1
        let mut gaps = false;
        let connect = |ctx: &mut ElabContext<'_>, net: NetId, width: u32, index: &mut u32| {
            let pin = ctx
                .netlist
                .add_input_pin(cell, &format!("A{index}"), width);
            ctx.netlist.add_sink(net, pin);
            *index += 1;
        };

        for piece in &pieces {
            if piece.hi + 1 < cursor {
                let width = cursor - piece.hi - 1;
                let zero = ctx.const_net(&scope.prefix, 0, width);
                connect(ctx, zero, width, &mut index);
                gaps = true;
            }
            connect(ctx, piece.value.net, piece.value.width, &mut index);
            cursor = piece.lo;
        }
        if cursor > 0 {
            let zero = ctx.const_net(&scope.prefix, 0, cursor);
            connect(ctx, zero, cursor, &mut index);
            gaps = true;
        }

        let py = ctx.netlist.add_output_pin(cell, "Y", info.width);
        ctx.netlist
            .set_driver(info.net, py)
            .map_err(|_| errors::multi_driver(ctx.name(name), Span::DUMMY))?;

        if gaps {
            ctx.sink.emit(Diagnostic::warning(
                errors::W301,
                format!(
                    "not every bit of `{}` is driven; missing bits read as zero",
                    ctx.name(name)
                ),
                Span::DUMMY,
            ));
        }
    }
    Ok(())
}

// ============================================================================
// Always blocks
// ============================================================================

/// Lowers an `always` block, dispatching on its sensitivity.
pub fn lower_always(
    ctx: &mut ElabContext<'_>,
    scope: &mut ModuleScope,
    block: &AlwaysBlock,
) -> Result<(), Diagnostic> {
    let edges = block.edges();
    if edges.is_empty() {
        lower_combinational(ctx, scope, block)
    } else {
        lower_sequential(ctx, scope, block)
    }
}

fn lower_combinational(
    ctx: &mut ElabContext<'_>,
    scope: &mut ModuleScope,
    block: &AlwaysBlock,
) -> Result<(), Diagnostic> {
    scope.overrides.clear();
    let mut holds = HashSet::new();
    walk_stmt(ctx, scope, &block.body, None, ProcMode::Comb, &mut holds)?;

    let mut env: Vec<(Ident, Lowered)> = scope.overrides.drain().collect();
    env.sort_by_key(|(name, _)| ctx.name(*name).to_string());

    for (target, value) in env {
        let info = scope.nets[&target];
        if holds.contains(&target) {
            // Feedback path present: materialize a latch.
            let cell = ctx.fresh_cell(&scope.prefix, CellOp::Latch);
            let pd = ctx.netlist.add_input_pin(cell, "D", info.width);
            let pq = ctx.netlist.add_output_pin(cell, "Q", info.width);
            ctx.netlist.add_sink(value.net, pd);
            ctx.netlist
                .set_driver(info.net, pq)
                .map_err(|_| errors::multi_driver(ctx.name(target), block.span))?;
            ctx.sink
                .emit(errors::inferred_latch(ctx.name(target), block.span));
        } else {
            drive_net(ctx, scope, info.net, value, block.span)?;
        }
    }
    Ok(())
}

fn lower_sequential(
    ctx: &mut ElabContext<'_>,
    scope: &mut ModuleScope,
    block: &AlwaysBlock,
) -> Result<(), Diagnostic> {
    let edges: Vec<(EdgeKind, Ident, Span)> = block
        .edges()
        .iter()
        .map(|item| match &item.signal {
            Expr::Identifier { name, span } => {
                Ok((item.edge.expect("edge item"), *name, *span))
            }
            other => Err(errors::unsupported(
                "edge expression that is not a plain signal",
                other.span(),
            )),
        })
        .collect::<Result<_, _>>()?;
    if edges.len() > 2 {
        return Err(errors::unsupported(
            "more than two edges in a sensitivity list",
            block.span,
        ));
    }

    // Peel `begin ... end` wrappers holding a single statement.
    let mut body = &block.body;
    while let Statement::Block { decls, stmts, .. } = body {
        if decls.is_empty() && stmts.len() == 1 {
            body = &stmts[0];
        } else {
            break;
        }
    }

    // Reset: a top-level if/else whose taken branch assigns only constants.
    let mut reset: Option<ResetInfo> = None;
    let mut remainder = body;
    if let Statement::If {
        condition,
        then_stmt,
        else_stmt: Some(else_stmt),
        ..
    } = body
    {
        if let Some(values) = constant_assignments(then_stmt, &scope.consts, ctx.interner) {
            let cond_signals = identifiers_of(condition);
            let async_edge = edges
                .iter()
                .skip(1)
                .chain(edges.iter().take(1))
                .find(|(_, name, _)| cond_signals.contains(name))
                .filter(|_| edges.len() == 2)
                .map(|(_, name, _)| *name);
            reset = Some(ResetInfo {
                condition: condition.clone(),
                values,
                is_async: async_edge.is_some(),
                async_signal: async_edge,
            });
            remainder = else_stmt;
        }
    }

    // Clock: with an async reset, the edge that is not the reset; otherwise
    // the first (and only) edge.
    let clock_ident = match (&reset, edges.len()) {
        (Some(r), 2) if r.async_signal.is_some() => edges
            .iter()
            .map(|(_, name, _)| *name)
            .find(|n| Some(*n) != r.async_signal)
            .expect("two distinct edges"),
        (_, 1) => edges[0].1,
        (None, 2) => {
            return Err(errors::unsupported(
                "two clock edges without an asynchronous reset pattern",
                block.span,
            ))
        }
        _ => edges[0].1,
    };
    let clock_edge = edges
        .iter()
        .find(|(_, name, _)| *name == clock_ident)
        .map(|(edge, _, _)| *edge)
        .expect("clock edge present");
    let clk = scope
        .resolve(clock_ident)
        .ok_or_else(|| errors::unresolved_signal(ctx.name(clock_ident), block.span))?
        .net;

    // Enable: without a reset, a top-level if with no else gates the block.
    let mut enable: Option<NetId> = None;
    let mut next_body = remainder;
    if reset.is_none() {
        if let Statement::If {
            condition,
            then_stmt,
            else_stmt: None,
            ..
        } = remainder
        {
            let cond = lower_expr(ctx, scope, condition, None)?;
            enable = Some(ctx.bool_net(&scope.prefix, cond.net, cond.width));
            next_body = then_stmt;
        }
    }

    let rst = match &reset {
        Some(r) => {
            let lowered = lower_expr(ctx, scope, &r.condition, None)?;
            Some(ctx.bool_net(&scope.prefix, lowered.net, lowered.width))
        }
        None => None,
    };
    // A guard net is only consumed by MEMWR enables; build the reset gate
    // only when the body actually writes a memory.
    let initial_guard = match (enable, rst) {
        (Some(en), _) => Some(en),
        (None, Some(r)) if contains_memory_write(next_body, scope) => {
            Some(ctx.not_cell(&scope.prefix, r, 1))
        }
        _ => None,
    };

    scope.overrides.clear();
    let mut holds = HashSet::new();
    walk_stmt(
        ctx,
        scope,
        next_body,
        initial_guard,
        ProcMode::Seq { clk },
        &mut holds,
    )?;

    // One register per assigned target (plus reset-only targets).
    let mut targets: Vec<Ident> = scope.overrides.keys().copied().collect();
    if let Some(r) = &reset {
        for name in r.values.keys() {
            if !targets.contains(name) {
                targets.push(*name);
            }
        }
    }
    targets.sort_by_key(|name| ctx.name(*name).to_string());

    let env = std::mem::take(&mut scope.overrides);
    for target in targets {
        let info = *scope.nets.get(&target).ok_or_else(|| {
            errors::unresolved_signal(ctx.name(target), block.span)
        })?;
        let next = env.get(&target).copied().unwrap_or(Lowered {
            net: info.net,
            width: info.width,
            fresh: false,
        });

        let op = match (&reset, enable) {
            (Some(r), _) if r.values.contains_key(&target) => CellOp::Dffr,
            (None, Some(_)) => CellOp::Dffe,
            _ => CellOp::Dff,
        };

        let cell = ctx.fresh_cell(&scope.prefix, op);
        let pc = ctx.netlist.add_input_pin(cell, "CLK", 1);
        ctx.netlist.add_sink(clk, pc);
        let pd = ctx.netlist.add_input_pin(cell, "D", info.width);
        ctx.netlist.add_sink(next.net, pd);

        if op == CellOp::Dffr {
            let r = reset.as_ref().expect("reset info present");
            let prst = ctx.netlist.add_input_pin(cell, "RST", 1);
            ctx.netlist
                .add_sink(rst.expect("reset net lowered"), prst);
            ctx.netlist
                .set_attr(cell, "reset_value", r.values[&target]);
            ctx.netlist.set_attr(cell, "async", r.is_async as i64);
        }
        if op == CellOp::Dffe {
            let pen = ctx.netlist.add_input_pin(cell, "EN", 1);
            ctx.netlist.add_sink(enable.expect("enable net"), pen);
        }
        if clock_edge == EdgeKind::Negedge {
            ctx.netlist.set_attr(cell, "clk_edge", "neg");
        }
        if let Some(&init) = scope.reg_init.get(&target) {
            ctx.netlist.set_attr(cell, "init", init);
        }

        let pq = ctx.netlist.add_output_pin(cell, "Q", info.width);
        ctx.netlist
            .set_driver(info.net, pq)
            .map_err(|_| errors::multi_driver(ctx.name(target), block.span))?;
    }
    Ok(())
}

struct ResetInfo {
    condition: Expr,
    values: HashMap<Ident, i64>,
    is_async: bool,
    async_signal: Option<Ident>,
}

/// If every assignment in `stmt` writes a constant to a plain identifier,
/// returns the target→value map; otherwise `None`.
fn constant_assignments(
    stmt: &Statement,
    consts: &crate::const_eval::ConstEnv,
    interner: &silica_common::Interner,
) -> Option<HashMap<Ident, i64>> {
    let mut out = HashMap::new();
    if collect_constant_assignments(stmt, consts, interner, &mut out) && !out.is_empty() {
        Some(out)
    } else {
        None
    }
}

fn collect_constant_assignments(
    stmt: &Statement,
    consts: &crate::const_eval::ConstEnv,
    interner: &silica_common::Interner,
    out: &mut HashMap<Ident, i64>,
) -> bool {
    match stmt {
        Statement::Blocking { lhs, rhs, .. } | Statement::NonBlocking { lhs, rhs, .. } => {
            let Expr::Identifier { name, .. } = lhs else {
                return false;
            };
            match const_eval::eval(rhs, consts, interner) {
                Ok(v) => {
                    out.insert(*name, v.as_i64());
                    true
                }
                Err(_) => false,
            }
        }
        Statement::Block { decls, stmts, .. } if decls.is_empty() => stmts
            .iter()
            .all(|s| collect_constant_assignments(s, consts, interner, out)),
        Statement::Null { .. } => true,
        _ => false,
    }
}

/// Does this statement write into a declared memory anywhere?
fn contains_memory_write(stmt: &Statement, scope: &ModuleScope) -> bool {
    let is_mem_target = |lhs: &Expr| {
        matches!(
            lhs,
            Expr::Index { base, .. }
                if matches!(base.as_ref(), Expr::Identifier { name, .. } if scope.memories.contains_key(name))
        )
    };
    match stmt {
        Statement::Blocking { lhs, .. } | Statement::NonBlocking { lhs, .. } => is_mem_target(lhs),
        Statement::Block { stmts, .. } => stmts.iter().any(|s| contains_memory_write(s, scope)),
        Statement::If {
            then_stmt,
            else_stmt,
            ..
        } => {
            contains_memory_write(then_stmt, scope)
                || else_stmt
                    .as_deref()
                    .is_some_and(|s| contains_memory_write(s, scope))
        }
        Statement::Case { arms, .. } => {
            arms.iter().any(|a| contains_memory_write(&a.body, scope))
        }
        Statement::For { body, .. } => contains_memory_write(body, scope),
        _ => false,
    }
}

fn identifiers_of(expr: &Expr) -> HashSet<Ident> {
    use silica_verilog_parser::visitor::Visit;
    struct Collect(HashSet<Ident>);
    impl silica_verilog_parser::visitor::Visit for Collect {
        fn visit_expr(&mut self, expr: &Expr) {
            if let Expr::Identifier { name, .. } = expr {
                self.0.insert(*name);
            }
            silica_verilog_parser::visitor::walk_expr(self, expr);
        }
    }
    let mut c = Collect(HashSet::new());
    c.visit_expr(expr);
    c.0
}

// ============================================================================
// Procedural walker
// ============================================================================

fn walk_stmt(
    ctx: &mut ElabContext<'_>,
    scope: &mut ModuleScope,
    stmt: &Statement,
    guard: Option<NetId>,
    mode: ProcMode,
    holds: &mut HashSet<Ident>,
) -> Result<(), Diagnostic> {
    match stmt {
        Statement::Blocking { lhs, rhs, span } | Statement::NonBlocking { lhs, rhs, span } => {
            lower_proc_assignment(ctx, scope, lhs, rhs, guard, mode, *span)
        }

        Statement::Block { decls, stmts, .. } => {
            for decl in decls {
                declare_block_local(ctx, scope, decl)?;
            }
            for s in stmts {
                walk_stmt(ctx, scope, s, guard, mode, holds)?;
            }
            Ok(())
        }

        Statement::If {
            condition,
            then_stmt,
            else_stmt,
            ..
        } => {
            let cond = lower_expr(ctx, scope, condition, None)?;
            let sel = ctx.bool_net(&scope.prefix, cond.net, cond.width);

            let base = scope.overrides.clone();

            // Guard nets exist only for MEMWR enables; skip the gate cells
            // when no memory write sits below this statement.
            let seq = matches!(mode, ProcMode::Seq { .. })
                && (contains_memory_write(then_stmt, scope)
                    || else_stmt
                        .as_deref()
                        .is_some_and(|s| contains_memory_write(s, scope)));
            let guard_then = seq.then(|| and_guard(ctx, scope, guard, sel));
            walk_stmt(ctx, scope, then_stmt, guard_then, mode, holds)?;
            let then_env = std::mem::replace(&mut scope.overrides, base.clone());

            if let Some(else_stmt) = else_stmt {
                let guard_else = seq.then(|| {
                    let not_sel = ctx.not_cell(&scope.prefix, sel, 1);
                    and_guard(ctx, scope, guard, not_sel)
                });
                walk_stmt(ctx, scope, else_stmt, guard_else, mode, holds)?;
            }
            let else_env = std::mem::take(&mut scope.overrides);

            scope.overrides = merge_branches(ctx, scope, sel, then_env, else_env, holds);
            Ok(())
        }

        Statement::Case {
            kind, expr, arms, ..
        } => lower_case(ctx, scope, *kind, expr, arms, guard, mode, holds),

        Statement::For {
            init,
            condition,
            step,
            body,
            span,
        } => lower_proc_for(ctx, scope, init, condition, step, body, guard, mode, holds, *span),

        Statement::SystemTaskCall { .. } | Statement::Null { .. } => Ok(()),

        Statement::EventControl { span, .. } => Err(errors::unsupported(
            "nested event control",
            *span,
        )),
        Statement::Delay { span, .. } => Err(errors::unsupported("delay control", *span)),
        Statement::While { span, .. } => Err(errors::unsupported("while loop", *span)),
        Statement::Repeat { span, .. } => Err(errors::unsupported("repeat loop", *span)),
        Statement::Forever { span, .. } => Err(errors::unsupported("forever loop", *span)),
        Statement::Wait { span, .. } => Err(errors::unsupported("wait statement", *span)),
        Statement::TaskCall { span, .. } => Err(errors::unsupported("task call", *span)),
        Statement::EventTrigger { span, .. } => {
            Err(errors::unsupported("event trigger", *span))
        }
        Statement::Disable { span, .. } => Err(errors::unsupported("disable statement", *span)),
        Statement::Error(span) => Err(errors::unsupported("erroneous statement", *span)),
    }
}

fn lower_proc_assignment(
    ctx: &mut ElabContext<'_>,
    scope: &mut ModuleScope,
    lhs: &Expr,
    rhs: &Expr,
    guard: Option<NetId>,
    mode: ProcMode,
    span: Span,
) -> Result<(), Diagnostic> {
    match lhs {
        Expr::Identifier { name, span: lspan } => {
            if scope.memories.contains_key(name) {
                return Err(errors::unsupported(
                    "assigning a whole memory",
                    *lspan,
                ));
            }
            let info = *scope
                .nets
                .get(name)
                .ok_or_else(|| errors::unresolved_signal(ctx.name(*name), *lspan))?;
            let value = lower_expr(ctx, scope, rhs, Some(info.width))?;
            scope.overrides.insert(*name, value);
            Ok(())
        }

        // `mem[addr] <= data` in a clocked block is a write port.
        Expr::Index {
            base,
            index,
            span: lspan,
        } if matches!(base.as_ref(), Expr::Identifier { name, .. } if scope.memories.contains_key(name)) =>
        {
            let Expr::Identifier { name, .. } = base.as_ref() else {
                unreachable!("guarded by the match arm");
            };
            let ProcMode::Seq { clk } = mode else {
                return Err(errors::unsupported(
                    "memory writes outside a clocked always block",
                    *lspan,
                ));
            };
            let mem = scope.memories[name].clone();
            let addr = lower_expr(ctx, scope, index, None)?;
            let data = lower_expr(ctx, scope, rhs, Some(mem.width))?;
            let enable = match guard {
                Some(g) => g,
                None => ctx.const_net(&scope.prefix, 1, 1),
            };
            memory::memory_write(ctx, &scope.prefix, &mem, clk, addr, data, enable);
            Ok(())
        }

        // Bit/range targets: read-modify-write splice on the running value.
        Expr::Index {
            base,
            index,
            span: lspan,
        } => {
            let Expr::Identifier { name, .. } = base.as_ref() else {
                return Err(errors::unsupported("assignment to a computed target", *lspan));
            };
            let idx = const_eval::eval(index, &scope.consts, ctx.interner)
                .map_err(|_| {
                    errors::unsupported("dynamic bit index on an assignment target", *lspan)
                })?
                .as_i64() as u32;
            let value = lower_expr(ctx, scope, rhs, Some(1))?;
            splice_assign(ctx, scope, *name, idx, idx, value, mode, span)
        }

        Expr::RangeSelect {
            base,
            msb,
            lsb,
            span: lspan,
        } => {
            let Expr::Identifier { name, .. } = base.as_ref() else {
                return Err(errors::unsupported("assignment to a computed target", *lspan));
            };
            let hi = const_eval::eval(msb, &scope.consts, ctx.interner)?.as_i64() as u32;
            let lo = const_eval::eval(lsb, &scope.consts, ctx.interner)?.as_i64() as u32;
            let (hi, lo) = if hi >= lo { (hi, lo) } else { (lo, hi) };
            let value = lower_expr(ctx, scope, rhs, Some(hi - lo + 1))?;
            splice_assign(ctx, scope, *name, hi, lo, value, mode, span)
        }

        other => Err(errors::unsupported(
            "this form of assignment target",
            other.span(),
        )),
    }
}

/// Replaces bits `[hi:lo]` of a target's running value, keeping the rest.
///
/// When a combinational block splices a target that has no value yet, the
/// untouched bits read as zero: feeding the declared net back would create
/// a structural cycle out of the initialize-in-a-loop idiom. A sequential
/// block feeds back the register output, which is the real hold semantics.
fn splice_assign(
    ctx: &mut ElabContext<'_>,
    scope: &mut ModuleScope,
    name: Ident,
    hi: u32,
    lo: u32,
    value: Lowered,
    mode: ProcMode,
    span: Span,
) -> Result<(), Diagnostic> {
    let info = *scope
        .nets
        .get(&name)
        .ok_or_else(|| errors::unresolved_signal(ctx.name(name), span))?;
    if hi >= info.width {
        return Err(Diagnostic::error(
            errors::E204,
            format!(
                "bit select [{hi}:{lo}] out of range for a {}-bit signal",
                info.width
            ),
            span,
        ));
    }

    let old = match (scope.resolve(name), mode) {
        (Some(v), _) if scope.overrides.contains_key(&name) => v,
        (_, ProcMode::Seq { .. }) => Lowered {
            net: info.net,
            width: info.width,
            fresh: false,
        },
        _ => {
            let zero = ctx.const_net(&scope.prefix, 0, info.width);
            Lowered {
                net: zero,
                width: info.width,
                fresh: true,
            }
        }
    };

    let mut parts: Vec<Lowered> = Vec::new();
    if hi + 1 < info.width {
        let net = ctx.slice_cell(&scope.prefix, old.net, info.width, info.width - 1, hi + 1);
        parts.push(Lowered {
            net,
            width: info.width - hi - 1,
            fresh: true,
        });
    }
    parts.push(value);
    if lo > 0 {
        let net = ctx.slice_cell(&scope.prefix, old.net, info.width, lo - 1, 0);
        parts.push(Lowered {
            net,
            width: lo,
            fresh: true,
        });
    }

    let cell = ctx.fresh_cell(&scope.prefix, CellOp::Concat);
    for (i, part) in parts.iter().enumerate() {
        let pin = ctx.netlist.add_input_pin(cell, &format!("A{i}"), part.width);
        ctx.netlist.add_sink(part.net, pin);
    }
    let py = ctx.netlist.add_output_pin(cell, "Y", info.width);
    let out = ctx.fresh_net(&scope.prefix, CellOp::Concat, info.width);
    ctx.netlist
        .set_driver(out, py)
        .expect("fresh net has no driver");

    scope.overrides.insert(
        name,
        Lowered {
            net: out,
            width: info.width,
            fresh: true,
        },
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn lower_case(
    ctx: &mut ElabContext<'_>,
    scope: &mut ModuleScope,
    kind: CaseKind,
    selector: &Expr,
    arms: &[CaseArm],
    guard: Option<NetId>,
    mode: ProcMode,
    holds: &mut HashSet<Ident>,
) -> Result<(), Diagnostic> {
    let sel = lower_expr(ctx, scope, selector, None)?;
    let base = scope.overrides.clone();

    // Per-arm match conditions, in source order.
    let mut matches: Vec<Option<NetId>> = Vec::with_capacity(arms.len());
    for arm in arms {
        if arm.is_default {
            matches.push(None);
            continue;
        }
        let mut arm_match: Option<NetId> = None;
        for pattern in &arm.patterns {
            let m = pattern_match(ctx, scope, &sel, pattern, kind)?;
            arm_match = Some(match arm_match {
                None => m,
                Some(acc) => ctx.binary_cell(&scope.prefix, CellOp::Or, acc, 1, m, 1, 1),
            });
        }
        matches.push(arm_match);
    }

    // Evaluate arm bodies. Priority guards encode "this pattern matches and
    // no earlier arm matched"; they exist only to drive MEMWR enables, so
    // they are built only when some arm writes a memory.
    let seq = matches!(mode, ProcMode::Seq { .. })
        && arms.iter().any(|a| contains_memory_write(&a.body, scope));
    let mut prior: Option<NetId> = None;
    let mut arm_envs: Vec<HashMap<Ident, Lowered>> = Vec::with_capacity(arms.len());
    for (arm, m) in arms.iter().zip(&matches) {
        let arm_guard = if seq {
            let fires = match (m, prior) {
                (Some(m), None) => *m,
                (Some(m), Some(p)) => {
                    let not_p = ctx.not_cell(&scope.prefix, p, 1);
                    ctx.binary_cell(&scope.prefix, CellOp::And, *m, 1, not_p, 1, 1)
                }
                (None, Some(p)) => ctx.not_cell(&scope.prefix, p, 1),
                (None, None) => ctx.const_net(&scope.prefix, 1, 1),
            };
            Some(and_guard(ctx, scope, guard, fires))
        } else {
            None
        };

        scope.overrides = base.clone();
        walk_stmt(ctx, scope, &arm.body, arm_guard, mode, holds)?;
        arm_envs.push(std::mem::take(&mut scope.overrides));

        if seq {
            if let Some(m) = m {
                prior = Some(match prior {
                    None => *m,
                    Some(p) => ctx.binary_cell(&scope.prefix, CellOp::Or, p, 1, *m, 1, 1),
                });
            }
        }
    }

    // Merge back-to-front so the first matching arm owns the outermost mux.
    // The (first) default arm seeds the accumulator; targets untouched by
    // every arm fall back to the pre-case environment.
    let mut acc: Option<HashMap<Ident, Lowered>> = None;
    let mut tail: Vec<(NetId, HashMap<Ident, Lowered>)> = Vec::new();
    for ((arm, m), env) in arms.iter().zip(&matches).zip(arm_envs) {
        match m {
            None if acc.is_none() && arm.is_default => acc = Some(env),
            None => {} // extra default arms never fire
            Some(m) => tail.push((*m, env)),
        }
    }
    let mut acc = acc.unwrap_or_else(|| base.clone());
    for (m, env) in tail.into_iter().rev() {
        acc = merge_branches(ctx, scope, m, env, acc, holds);
    }

    scope.overrides = acc;
    Ok(())
}

fn pattern_match(
    ctx: &mut ElabContext<'_>,
    scope: &ModuleScope,
    sel: &Lowered,
    pattern: &Expr,
    kind: CaseKind,
) -> Result<NetId, Diagnostic> {
    // casex/casez literals with x/z/? bits become masked comparisons.
    if kind != CaseKind::Case {
        if let Expr::Number { raw, .. } = pattern {
            if let Some(bits) = parse_bits(raw) {
                if !bits.is_fully_defined() {
                    let (value, mask) = bits.value_and_mask();
                    let mask_net = ctx.const_net(&scope.prefix, mask as i64, sel.width);
                    let masked = ctx.binary_cell(
                        &scope.prefix,
                        CellOp::And,
                        sel.net,
                        sel.width,
                        mask_net,
                        sel.width,
                        sel.width,
                    );
                    let value_net =
                        ctx.const_net(&scope.prefix, (value & mask) as i64, sel.width);
                    return Ok(ctx.binary_cell(
                        &scope.prefix,
                        CellOp::Eq,
                        masked,
                        sel.width,
                        value_net,
                        sel.width,
                        1,
                    ));
                }
            }
        }
    }

    let p = lower_expr(ctx, scope, pattern, Some(sel.width))?;
    Ok(ctx.binary_cell(
        &scope.prefix,
        CellOp::Eq,
        sel.net,
        sel.width,
        p.net,
        p.width,
        1,
    ))
}

#[allow(clippy::too_many_arguments)]
fn lower_proc_for(
    ctx: &mut ElabContext<'_>,
    scope: &mut ModuleScope,
    init: &Statement,
    condition: &Expr,
    step: &Statement,
    body: &Statement,
    guard: Option<NetId>,
    mode: ProcMode,
    holds: &mut HashSet<Ident>,
    span: Span,
) -> Result<(), Diagnostic> {
    let (var, init_expr) = match init {
        Statement::Blocking { lhs: Expr::Identifier { name, .. }, rhs, .. } => (*name, rhs),
        _ => {
            return Err(errors::unsupported(
                "for loop without a simple index initialization",
                span,
            ))
        }
    };
    let step_expr = match step {
        Statement::Blocking { lhs: Expr::Identifier { name, .. }, rhs, .. } if *name == var => rhs,
        _ => {
            return Err(errors::unsupported(
                "for loop stepping a different variable than it initializes",
                span,
            ))
        }
    };

    // The index variable becomes a compile-time constant; hide any declared
    // integer net of the same name while unrolling.
    let shadowed = scope.nets.remove(&var);
    let saved_consts = scope.consts.clone();

    let mut value = const_eval::eval(init_expr, &scope.consts, ctx.interner)?.as_i64();
    let mut iterations = 0usize;
    let result = loop {
        scope.consts = saved_consts.bind(var, ConstValue::Int(value));
        match const_eval::eval(condition, &scope.consts, ctx.interner) {
            Ok(v) if v.as_i64() == 0 => break Ok(()),
            Ok(_) => {}
            Err(e) => break Err(e),
        }
        iterations += 1;
        if iterations > MAX_UNROLL {
            break Err(errors::unsupported(
                "for loop exceeding 65536 iterations",
                span,
            ));
        }
        if let Err(e) = walk_stmt(ctx, scope, body, guard, mode, holds) {
            break Err(e);
        }
        match const_eval::eval(step_expr, &scope.consts, ctx.interner) {
            Ok(v) => value = v.as_i64(),
            Err(e) => break Err(e),
        }
    };

    scope.consts = saved_consts;
    if let Some(info) = shadowed {
        scope.nets.insert(var, info);
    }
    result
}

fn declare_block_local(
    ctx: &mut ElabContext<'_>,
    scope: &mut ModuleScope,
    item: &ModuleItem,
) -> Result<(), Diagnostic> {
    let ModuleItem::NetDecl(decl) = item else {
        return Ok(());
    };
    let width = match &decl.range {
        Some(range) => {
            let hi = const_eval::eval(&range.msb, &scope.consts, ctx.interner)?.as_i64();
            let lo = const_eval::eval(&range.lsb, &scope.consts, ctx.interner)?.as_i64();
            (hi - lo).unsigned_abs() as u32 + 1
        }
        None => {
            if decl.net_type == NetType::Integer {
                32
            } else {
                1
            }
        }
    };
    for name in &decl.names {
        if scope.nets.contains_key(&name.name) {
            continue;
        }
        let net = ctx.netlist.add_net(
            format!("{}{}", scope.prefix, ctx.name(name.name)),
            width,
        );
        scope.nets.insert(
            name.name,
            SignalInfo {
                net,
                width,
                signed: decl.signed,
                is_reg: true,
            },
        );
    }
    Ok(())
}

fn and_guard(
    ctx: &mut ElabContext<'_>,
    scope: &ModuleScope,
    guard: Option<NetId>,
    condition: NetId,
) -> NetId {
    match guard {
        None => condition,
        Some(g) => ctx.binary_cell(&scope.prefix, CellOp::And, g, 1, condition, 1, 1),
    }
}

/// Merges two branch environments with muxes selected by `sel` (`B` input
/// when `sel` is true). A target missing from one side falls back to its
/// declared net and is recorded as held.
fn merge_branches(
    ctx: &mut ElabContext<'_>,
    scope: &ModuleScope,
    sel: NetId,
    then_env: HashMap<Ident, Lowered>,
    else_env: HashMap<Ident, Lowered>,
    holds: &mut HashSet<Ident>,
) -> HashMap<Ident, Lowered> {
    let mut keys: Vec<Ident> = then_env.keys().chain(else_env.keys()).copied().collect();
    keys.sort_by_key(|name| ctx.name(*name).to_string());
    keys.dedup();

    let mut merged = HashMap::new();
    for key in keys {
        let t = then_env.get(&key).copied();
        let e = else_env.get(&key).copied();
        match (t, e) {
            (Some(tv), Some(ev)) if tv.net == ev.net => {
                merged.insert(key, tv);
            }
            (t, e) => {
                let info = scope.nets[&key];
                let hold = Lowered {
                    net: info.net,
                    width: info.width,
                    fresh: false,
                };
                let tv = t.unwrap_or_else(|| {
                    holds.insert(key);
                    hold
                });
                let ev = e.unwrap_or_else(|| {
                    holds.insert(key);
                    hold
                });
                let net = ctx.mux_cell(&scope.prefix, sel, ev.net, tv.net, info.width);
                merged.insert(
                    key,
                    Lowered {
                        net,
                        width: info.width,
                        fresh: true,
                    },
                );
            }
        }
    }
    merged
}

/// Harvests constant register initializations from an `initial` block.
pub fn collect_initial(
    ctx: &ElabContext<'_>,
    scope: &mut ModuleScope,
    block: &InitialBlock,
) {
    fn walk(
        stmt: &Statement,
        consts: &crate::const_eval::ConstEnv,
        interner: &silica_common::Interner,
        out: &mut HashMap<Ident, i64>,
    ) {
        match stmt {
            Statement::Blocking { lhs, rhs, .. } | Statement::NonBlocking { lhs, rhs, .. } => {
                if let Expr::Identifier { name, .. } = lhs {
                    if let Ok(v) = const_eval::eval(rhs, consts, interner) {
                        out.insert(*name, v.as_i64());
                    }
                }
            }
            Statement::Block { stmts, .. } => {
                for s in stmts {
                    walk(s, consts, interner, out);
                }
            }
            _ => {}
        }
    }
    walk(
        &block.body,
        &scope.consts,
        ctx.interner,
        &mut scope.reg_init,
    );
}

// Sequential classification is covered end-to-end in the conformance crate;
// the unit tests here pin the reset/enable pattern helpers.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::const_eval::ConstEnv;
    use silica_common::Interner;
    use silica_diagnostics::DiagnosticSink;
    use silica_source::FileId;
    use silica_verilog_parser as vp;

    fn parse_always(source: &str, interner: &Interner) -> AlwaysBlock {
        let full = format!("module t; {source} endmodule");
        let sink = DiagnosticSink::new();
        let ast = vp::parse(&full, FileId::from_raw(0), interner, &sink);
        assert!(!sink.has_errors(), "{:?}", sink.diagnostics());
        let module = ast.modules().next().unwrap().clone();
        for item in module.items {
            if let ModuleItem::AlwaysBlock(ab) = item {
                return ab;
            }
        }
        panic!("no always block in {source}");
    }

    #[test]
    fn constant_reset_branch_recognized() {
        let interner = Interner::new();
        let ab = parse_always(
            "always @(posedge clk) begin
                if (rst) begin
                    q <= 8'd0;
                    r <= 8'd3;
                end else
                    q <= d;
            end",
            &interner,
        );
        let mut body = &ab.body;
        while let Statement::Block { stmts, decls, .. } = body {
            if decls.is_empty() && stmts.len() == 1 {
                body = &stmts[0];
            } else {
                break;
            }
        }
        let Statement::If { then_stmt, .. } = body else {
            panic!("expected if");
        };
        let values =
            constant_assignments(then_stmt, &ConstEnv::new(), &interner).expect("reset shape");
        assert_eq!(values.len(), 2);
        assert_eq!(values[&interner.intern("q")], 0);
        assert_eq!(values[&interner.intern("r")], 3);
    }

    #[test]
    fn non_constant_branch_is_not_a_reset() {
        let interner = Interner::new();
        let ab = parse_always(
            "always @(posedge clk)
                if (en) q <= d;
                else q <= q;",
            &interner,
        );
        let Statement::If { then_stmt, .. } = &ab.body else {
            panic!("expected if");
        };
        assert!(constant_assignments(then_stmt, &ConstEnv::new(), &interner).is_none());
    }

    #[test]
    fn identifiers_of_collects_all_names() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let source = "!rst_n && go";
        let tokens = vp::lexer::lex(source, FileId::from_raw(0), &sink);
        let mut p = vp::VerilogParser::new(tokens, source, FileId::from_raw(0), &interner, &sink);
        let expr = p.parse_expr();
        let ids = identifiers_of(&expr);
        assert!(ids.contains(&interner.intern("rst_n")));
        assert!(ids.contains(&interner.intern("go")));
        assert_eq!(ids.len(), 2);
    }
}
