//! Per-module elaboration: parameters, ports, declarations, items, and
//! hierarchy flattening.
//!
//! A module elaborates directly into the shared netlist. At the top level
//! its ports become `MODULE_INPUT`/`MODULE_OUTPUT` cells; as a child
//! instance its ports alias the parent's nets and every cell and net it
//! creates carries the `instance.` prefix. Unknown modules become
//! `SUBCIRCUIT` black boxes.

use crate::const_eval::{self, ConstEnv, ConstValue};
use crate::context::{ElabContext, MemoryInfo, ModuleScope, SignalInfo};
use crate::errors;
use crate::expr::{drive_net, lower_expr};
use crate::generate;
use crate::stmt;
use silica_common::Ident;
use silica_diagnostics::Diagnostic;
use silica_netlist::{CellOp, NetId};
use silica_source::Span;
use silica_verilog_parser::ast::*;
use std::collections::{HashMap, HashSet};

const MAX_DEPTH: usize = 64;

/// Elaborates one module into the netlist.
///
/// `bindings` is `None` at the top level; for a child instance it maps each
/// port name to the parent net it connects to (`None` for an explicit
/// disconnect).
pub fn elaborate_module_into(
    ctx: &mut ElabContext<'_>,
    decl: &ModuleDecl,
    overrides: &[(Ident, ConstValue)],
    prefix: String,
    bindings: Option<HashMap<Ident, Option<NetId>>>,
) -> Result<(), Diagnostic> {
    if ctx.instance_stack.contains(&decl.name) {
        return Err(Diagnostic::error(
            errors::E207,
            format!(
                "recursive instantiation of module `{}`",
                ctx.name(decl.name)
            ),
            decl.span,
        ));
    }
    if ctx.instance_stack.len() >= MAX_DEPTH {
        return Err(errors::unsupported("hierarchy deeper than 64 levels", decl.span));
    }

    ctx.instance_stack.push(decl.name);
    let result = elaborate_module_body(ctx, decl, overrides, prefix, bindings);
    ctx.instance_stack.pop();
    result
}

fn elaborate_module_body(
    ctx: &mut ElabContext<'_>,
    decl: &ModuleDecl,
    overrides: &[(Ident, ConstValue)],
    prefix: String,
    bindings: Option<HashMap<Ident, Option<NetId>>>,
) -> Result<(), Diagnostic> {
    // 1. Parameter resolution: header parameters first, then body
    //    parameters/localparams in declaration order. Each may reference the
    //    ones before it.
    let override_map: HashMap<Ident, ConstValue> = overrides.iter().copied().collect();
    let mut consts = ConstEnv::new();
    for param in &decl.params {
        let value = resolve_parameter(ctx, param, &override_map, &consts)?;
        consts = consts.bind(param.name, value);
    }
    for item in &decl.items {
        if let ModuleItem::ParamDecl(param) = item {
            let value = resolve_parameter(ctx, param, &override_map, &consts)?;
            consts = consts.bind(param.name, value);
        }
    }

    // 2. Generate unrolling, so the rest sees straight-line items.
    let items = generate::expand_items(ctx, &decl.items, &consts)?;

    let mut scope = ModuleScope::new(prefix);
    scope.consts = consts;

    // 3. Ports.
    for port in &decl.ports {
        elaborate_port(ctx, &mut scope, port, bindings.as_ref())?;
    }
    if let Some(b) = &bindings {
        for name in b.keys() {
            if !decl.ports.iter().any(|p| p.name == *name) {
                return Err(Diagnostic::error(
                    errors::E208,
                    format!(
                        "module `{}` has no port named `{}`",
                        ctx.name(decl.name),
                        ctx.name(*name)
                    ),
                    decl.span,
                ));
            }
        }
    }

    // 4. Declarations, including memory registration and initializers.
    let mut declared: HashSet<Ident> = HashSet::new();
    for item in &items {
        if let ModuleItem::NetDecl(net_decl) = item {
            elaborate_net_decl(ctx, &mut scope, net_decl, &mut declared)?;
        }
    }

    // 5. Initial blocks contribute register init values only; harvest them
    //    before any DFF is built.
    for item in &items {
        if let ModuleItem::InitialBlock(block) = item {
            stmt::collect_initial(ctx, &mut scope, block);
        }
    }

    // 6. defparam overrides, applied to this module's direct children.
    let mut defparams: HashMap<Ident, Vec<(Ident, ConstValue)>> = HashMap::new();
    for item in &items {
        if let ModuleItem::DefparamDecl(dp) = item {
            let Expr::HierarchicalName { parts, span } = &dp.target else {
                return Err(errors::unsupported(
                    "defparam on a non-hierarchical target",
                    dp.span,
                ));
            };
            if parts.len() != 2 {
                return Err(errors::unsupported(
                    "defparam reaching deeper than one level",
                    *span,
                ));
            }
            let value = const_eval::eval(&dp.value, &scope.consts, ctx.interner)?;
            defparams.entry(parts[0]).or_default().push((parts[1], value));
        }
    }

    // 7. Structural items.
    for item in &items {
        match item {
            ModuleItem::ContinuousAssign(assign) => {
                stmt::lower_continuous_assign(ctx, &mut scope, assign)?;
            }
            ModuleItem::AlwaysBlock(block) => {
                stmt::lower_always(ctx, &mut scope, block)?;
            }
            ModuleItem::Instantiation(inst) => {
                elaborate_instantiation(ctx, &mut scope, inst, &defparams)?;
            }
            ModuleItem::GateInst(gate) => {
                elaborate_gate(ctx, &mut scope, gate)?;
            }
            ModuleItem::Error(span) => {
                return Err(errors::unsupported(
                    "elaboration of a file with parse errors",
                    *span,
                ));
            }
            // Handled in earlier passes or carrying no netlist meaning.
            ModuleItem::NetDecl(_)
            | ModuleItem::ParamDecl(_)
            | ModuleItem::PortDecl(_)
            | ModuleItem::InitialBlock(_)
            | ModuleItem::Generate(_)
            | ModuleItem::GenvarDecl(_)
            | ModuleItem::FunctionDecl(_)
            | ModuleItem::TaskDecl(_)
            | ModuleItem::DefparamDecl(_) => {}
        }
    }

    stmt::finalize_partials(ctx, &mut scope)
}

fn resolve_parameter(
    ctx: &ElabContext<'_>,
    param: &ParameterDecl,
    overrides: &HashMap<Ident, ConstValue>,
    consts: &ConstEnv,
) -> Result<ConstValue, Diagnostic> {
    if !param.is_localparam {
        if let Some(&value) = overrides.get(&param.name) {
            return Ok(value);
        }
    }
    match &param.value {
        Some(expr) => const_eval::eval(expr, consts, ctx.interner),
        None => Err(Diagnostic::error(
            errors::E209,
            format!(
                "parameter `{}` has no default and no override",
                ctx.name(param.name)
            ),
            param.span,
        )),
    }
}

fn range_width(
    ctx: &ElabContext<'_>,
    consts: &ConstEnv,
    range: &Range,
) -> Result<u32, Diagnostic> {
    let msb = const_eval::eval(&range.msb, consts, ctx.interner)?.as_i64();
    let lsb = const_eval::eval(&range.lsb, consts, ctx.interner)?.as_i64();
    Ok((msb - lsb).unsigned_abs() as u32 + 1)
}

fn elaborate_port(
    ctx: &mut ElabContext<'_>,
    scope: &mut ModuleScope,
    port: &PortDecl,
    bindings: Option<&HashMap<Ident, Option<NetId>>>,
) -> Result<(), Diagnostic> {
    if !port.unpacked_dims.is_empty() {
        return Err(errors::unsupported("array ports", port.span));
    }
    if port.direction == Direction::Inout {
        return Err(errors::unsupported("inout ports", port.span));
    }

    let width = match &port.range {
        Some(range) => range_width(ctx, &scope.consts, range)?,
        None => match port.net_type {
            Some(NetType::Integer) => 32,
            _ => 1,
        },
    };
    let is_reg = matches!(port.net_type, Some(NetType::Reg) | Some(NetType::Integer));
    let info = |net| SignalInfo {
        net,
        width,
        signed: port.signed,
        is_reg,
    };

    match bindings {
        // Top level: ports become I/O cells.
        None => {
            let name = ctx.name(port.name).to_string();
            let net = match port.direction {
                Direction::Input => ctx.netlist.add_module_input(&name, width).1,
                Direction::Output => {
                    let net = ctx.netlist.add_net(&name, width);
                    ctx.netlist.add_module_output(&name, width, net);
                    net
                }
                Direction::Inout => unreachable!("rejected above"),
            };
            scope.nets.insert(port.name, info(net));
        }
        // Child instance: ports alias parent nets.
        Some(map) => {
            let net = match map.get(&port.name) {
                Some(Some(parent_net)) => {
                    let parent_width = ctx.netlist.net(*parent_net).width;
                    if parent_width != width {
                        ctx.sink.emit(Diagnostic::warning(
                            errors::W304,
                            format!(
                                "port `{}` is {width} bits but connects to a {parent_width}-bit signal",
                                ctx.name(port.name)
                            ),
                            port.span,
                        ));
                    }
                    *parent_net
                }
                // Unconnected: a dangling net (undriven inputs warn later).
                _ => ctx
                    .netlist
                    .add_net(format!("{}{}", scope.prefix, ctx.name(port.name)), width),
            };
            scope.nets.insert(port.name, info(net));
        }
    }
    Ok(())
}

fn elaborate_net_decl(
    ctx: &mut ElabContext<'_>,
    scope: &mut ModuleScope,
    decl: &NetDecl,
    declared: &mut HashSet<Ident>,
) -> Result<(), Diagnostic> {
    if matches!(
        decl.net_type,
        NetType::Real | NetType::Realtime | NetType::Time | NetType::Event
    ) {
        ctx.sink.emit(Diagnostic::warning(
            errors::W305,
            format!(
                "`{:?}` declarations have no synthesis meaning and are ignored",
                decl.net_type
            ),
            decl.span,
        ));
        return Ok(());
    }

    let width = match &decl.range {
        Some(range) => range_width(ctx, &scope.consts, range)?,
        None => {
            if decl.net_type == NetType::Integer {
                32
            } else {
                1
            }
        }
    };
    let signed = decl.signed || decl.net_type == NetType::Integer;
    let is_reg = matches!(decl.net_type, NetType::Reg | NetType::Integer);

    for name in &decl.names {
        if !declared.insert(name.name) {
            return Err(Diagnostic::error(
                errors::E202,
                format!("`{}` is declared more than once", ctx.name(name.name)),
                name.span,
            ));
        }

        if !name.unpacked_dims.is_empty() {
            if decl.net_type != NetType::Reg {
                return Err(errors::unsupported(
                    "arrays of nets (only reg arrays infer memories)",
                    name.span,
                ));
            }
            if name.unpacked_dims.len() > 1 {
                return Err(errors::unsupported(
                    "multi-dimensional memories",
                    name.span,
                ));
            }
            let depth = range_width(ctx, &scope.consts, &name.unpacked_dims[0])?;
            scope.memories.insert(
                name.name,
                MemoryInfo {
                    name: format!("{}{}", scope.prefix, ctx.name(name.name)),
                    width,
                    depth,
                },
            );
            continue;
        }

        match scope.nets.get_mut(&name.name) {
            // The body redeclaration of a port (`output q; reg [7:0] q;`):
            // adopt the storage class.
            Some(existing) => {
                if is_reg {
                    existing.is_reg = true;
                }
            }
            None => {
                let net = ctx
                    .netlist
                    .add_net(format!("{}{}", scope.prefix, ctx.name(name.name)), width);
                scope.nets.insert(
                    name.name,
                    SignalInfo {
                        net,
                        width,
                        signed,
                        is_reg,
                    },
                );
            }
        }

        if let Some(init) = &name.init {
            if let Ok(v) = const_eval::eval(init, &scope.consts, ctx.interner) {
                scope.reg_init.insert(name.name, v.as_i64());
            }
        }
    }
    Ok(())
}

fn elaborate_instantiation(
    ctx: &mut ElabContext<'_>,
    scope: &mut ModuleScope,
    inst: &Instantiation,
    defparams: &HashMap<Ident, Vec<(Ident, ConstValue)>>,
) -> Result<(), Diagnostic> {
    for instance in &inst.instances {
        if instance.range.is_some() {
            return Err(errors::unsupported("instance arrays", instance.span));
        }

        let Some(child) = ctx.registry.get(&inst.module_name).copied() else {
            elaborate_black_box(ctx, scope, inst, instance)?;
            continue;
        };

        // Parameter overrides: positional map onto the header parameters in
        // order, named by formal; defparams layer on top.
        let header_params: Vec<Ident> = child
            .params
            .iter()
            .filter(|p| !p.is_localparam)
            .map(|p| p.name)
            .collect();
        let mut overrides: Vec<(Ident, ConstValue)> = Vec::new();
        for (i, conn) in inst.param_overrides.iter().enumerate() {
            let Some(actual) = &conn.actual else { continue };
            let value = const_eval::eval(actual, &scope.consts, ctx.interner)?;
            let name = match conn.formal {
                Some(name) => name,
                None => *header_params.get(i).ok_or_else(|| {
                    Diagnostic::error(
                        errors::E201,
                        format!(
                            "too many parameter overrides for module `{}`",
                            ctx.name(inst.module_name)
                        ),
                        conn.span,
                    )
                })?,
            };
            overrides.push((name, value));
        }
        if let Some(extra) = defparams.get(&instance.name) {
            overrides.extend(extra.iter().copied());
        }

        // Port bindings.
        let named = instance
            .connections
            .first()
            .map(|c| c.formal.is_some())
            .unwrap_or(true);
        let mut bindings: HashMap<Ident, Option<NetId>> = HashMap::new();

        if named {
            // Process in source order; cell and net IDs must not depend on
            // map iteration order.
            for conn in &instance.connections {
                let Some(formal) = conn.formal else {
                    return Err(Diagnostic::error(
                        errors::E201,
                        "cannot mix positional and named connections",
                        conn.span,
                    ));
                };
                let Some(port) = child.ports.iter().find(|p| p.name == formal) else {
                    return Err(Diagnostic::error(
                        errors::E208,
                        format!(
                            "module `{}` has no port named `{}`",
                            ctx.name(inst.module_name),
                            ctx.name(formal)
                        ),
                        conn.span,
                    ));
                };
                if bindings.contains_key(&formal) {
                    return Err(Diagnostic::error(
                        errors::E201,
                        format!("port `{}` is connected twice", ctx.name(formal)),
                        conn.span,
                    ));
                }
                let net = bind_connection(ctx, scope, port, conn.actual.as_ref(), conn.span)?;
                bindings.insert(formal, net);
            }
        } else {
            if instance.connections.len() != child.ports.len() {
                return Err(Diagnostic::error(
                    errors::E201,
                    format!(
                        "module `{}` has {} ports but {} connections were given",
                        ctx.name(inst.module_name),
                        child.ports.len(),
                        instance.connections.len()
                    ),
                    instance.span,
                ));
            }
            for (port, conn) in child.ports.iter().zip(&instance.connections) {
                let net = bind_connection(ctx, scope, port, conn.actual.as_ref(), conn.span)?;
                bindings.insert(port.name, net);
            }
        }

        let child_prefix = format!("{}{}.", scope.prefix, ctx.name(instance.name));
        elaborate_module_into(ctx, child, &overrides, child_prefix, Some(bindings))?;
    }
    Ok(())
}

/// Resolves one port connection to a parent net.
///
/// An output port connected to a constant bit/range select of a parent
/// signal gets an intermediate net plus a partial-driver entry; the module
/// finalize pass concatenates every such piece into the parent net.
fn bind_connection(
    ctx: &mut ElabContext<'_>,
    scope: &mut ModuleScope,
    port: &PortDecl,
    actual: Option<&Expr>,
    span: Span,
) -> Result<Option<NetId>, Diagnostic> {
    let Some(actual) = actual else {
        return Ok(None); // explicit disconnect .p()
    };

    match port.direction {
        Direction::Input => {
            let lowered = lower_expr(ctx, scope, actual, None)?;
            Ok(Some(lowered.net))
        }
        Direction::Output => match actual {
            Expr::Identifier { name, .. } => {
                Ok(Some(resolve_or_implicit(ctx, scope, *name, port)))
            }
            Expr::Index { base, index, .. } => {
                let Expr::Identifier { name, .. } = base.as_ref() else {
                    return Err(errors::unsupported(
                        "output port connections to computed targets",
                        span,
                    ));
                };
                let idx = const_eval::eval(index, &scope.consts, ctx.interner)?.as_i64() as u32;
                Ok(Some(output_piece(ctx, scope, *name, idx, idx, span)))
            }
            Expr::RangeSelect { base, msb, lsb, .. } => {
                let Expr::Identifier { name, .. } = base.as_ref() else {
                    return Err(errors::unsupported(
                        "output port connections to computed targets",
                        span,
                    ));
                };
                let hi = const_eval::eval(msb, &scope.consts, ctx.interner)?.as_i64() as u32;
                let lo = const_eval::eval(lsb, &scope.consts, ctx.interner)?.as_i64() as u32;
                Ok(Some(output_piece(
                    ctx,
                    scope,
                    *name,
                    hi.max(lo),
                    hi.min(lo),
                    span,
                )))
            }
            _ => Err(errors::unsupported(
                "output port connections that are not signals or selects",
                span,
            )),
        },
        Direction::Inout => Err(errors::unsupported("inout ports", span)),
    }
}

/// An intermediate net for a child output driving `target[hi:lo]`.
fn output_piece(
    ctx: &mut ElabContext<'_>,
    scope: &mut ModuleScope,
    target: Ident,
    hi: u32,
    lo: u32,
    span: Span,
) -> NetId {
    let width = hi - lo + 1;
    let net = ctx.fresh_net(&scope.prefix, CellOp::Slice, width);
    scope
        .partials
        .entry(target)
        .or_default()
        .push(crate::context::PartialDrive {
            hi,
            lo,
            value: crate::context::Lowered {
                net,
                width,
                fresh: false,
            },
            span,
        });
    net
}

/// Looks up a signal, creating a one-bit implicit wire if it was never
/// declared (Verilog's implicit-net rule; a wider port then reports a
/// width-mismatch warning at binding time).
fn resolve_or_implicit(
    ctx: &mut ElabContext<'_>,
    scope: &mut ModuleScope,
    name: Ident,
    port: &PortDecl,
) -> NetId {
    let _ = port;
    if let Some(info) = scope.nets.get(&name) {
        return info.net;
    }
    let net = ctx
        .netlist
        .add_net(format!("{}{}", scope.prefix, ctx.name(name)), 1);
    scope.nets.insert(
        name,
        SignalInfo {
            net,
            width: 1,
            signed: false,
            is_reg: false,
        },
    );
    net
}

/// Unknown module: keep the instance as a `SUBCIRCUIT` black box with one
/// input pin per connected actual.
fn elaborate_black_box(
    ctx: &mut ElabContext<'_>,
    scope: &mut ModuleScope,
    inst: &Instantiation,
    instance: &Instance,
) -> Result<(), Diagnostic> {
    ctx.sink.emit(
        Diagnostic::warning(
            errors::W302,
            format!(
                "module `{}` is not defined; instance `{}` becomes a black box",
                ctx.name(inst.module_name),
                ctx.name(instance.name)
            ),
            instance.span,
        )
        .with_help("define the module or provide it in another source file"),
    );

    let cell = ctx.netlist.add_cell(
        format!("{}{}", scope.prefix, ctx.name(instance.name)),
        CellOp::Subcircuit,
    );
    let module_name = ctx.name(inst.module_name).to_string();
    ctx.netlist.set_attr(cell, "module", module_name);

    for (i, conn) in instance.connections.iter().enumerate() {
        let Some(actual) = &conn.actual else { continue };
        let lowered = lower_expr(ctx, scope, actual, None)?;
        let pin_name = match conn.formal {
            Some(formal) => ctx.name(formal).to_string(),
            None => format!("p{i}"),
        };
        let pin = ctx.netlist.add_input_pin(cell, &pin_name, lowered.width);
        ctx.netlist.add_sink(lowered.net, pin);
    }
    Ok(())
}

fn elaborate_gate(
    ctx: &mut ElabContext<'_>,
    scope: &mut ModuleScope,
    gate: &GateInst,
) -> Result<(), Diagnostic> {
    if gate.ports.len() < 2 {
        return Err(Diagnostic::error(
            errors::E201,
            "gate primitives need at least one output and one input",
            gate.span,
        ));
    }

    match gate.kind {
        // buf/not: the last port is the input, every earlier one an output.
        GateKind::Not | GateKind::Buf => {
            let input = lower_expr(ctx, scope, gate.ports.last().expect("checked len"), None)?;
            let op = if gate.kind == GateKind::Not {
                CellOp::Not
            } else {
                CellOp::Buf
            };
            for out_expr in &gate.ports[..gate.ports.len() - 1] {
                let cell = ctx.fresh_cell(&scope.prefix, op);
                let pa = ctx.netlist.add_input_pin(cell, "A", input.width);
                let py = ctx.netlist.add_output_pin(cell, "Y", input.width);
                ctx.netlist.add_sink(input.net, pa);
                let out = ctx.fresh_net(&scope.prefix, op, input.width);
                ctx.netlist
                    .set_driver(out, py)
                    .expect("fresh net has no driver");
                assign_gate_output(
                    ctx,
                    scope,
                    out_expr,
                    crate::context::Lowered {
                        net: out,
                        width: input.width,
                        fresh: true,
                    },
                    gate.span,
                )?;
            }
            Ok(())
        }

        // n-input gates: fold with the base op, applying the inversion (if
        // any) on the final combine, so nand(a,b,c) = nand(and(a,b), c).
        _ => {
            let (base, last) = match gate.kind {
                GateKind::And => (CellOp::And, CellOp::And),
                GateKind::Or => (CellOp::Or, CellOp::Or),
                GateKind::Xor => (CellOp::Xor, CellOp::Xor),
                GateKind::Nand => (CellOp::And, CellOp::Nand),
                GateKind::Nor => (CellOp::Or, CellOp::Nor),
                GateKind::Xnor => (CellOp::Xor, CellOp::Xnor),
                GateKind::Not | GateKind::Buf => unreachable!("handled above"),
            };

            let inputs: Vec<crate::context::Lowered> = gate.ports[1..]
                .iter()
                .map(|p| lower_expr(ctx, scope, p, None))
                .collect::<Result<_, _>>()?;
            if inputs.len() < 2 {
                return Err(Diagnostic::error(
                    errors::E201,
                    "logic gates need at least two inputs",
                    gate.span,
                ));
            }

            let mut acc = inputs[0];
            for (i, input) in inputs[1..].iter().enumerate() {
                let is_last = i == inputs.len() - 2;
                let op = if is_last { last } else { base };
                let width = acc.width.max(input.width);
                let net = ctx.binary_cell(
                    &scope.prefix,
                    op,
                    acc.net,
                    acc.width,
                    input.net,
                    input.width,
                    width,
                );
                acc = crate::context::Lowered {
                    net,
                    width,
                    fresh: true,
                };
            }

            assign_gate_output(ctx, scope, &gate.ports[0], acc, gate.span)
        }
    }
}

fn assign_gate_output(
    ctx: &mut ElabContext<'_>,
    scope: &mut ModuleScope,
    target: &Expr,
    value: crate::context::Lowered,
    span: Span,
) -> Result<(), Diagnostic> {
    let Expr::Identifier { name, span: tspan } = target else {
        return Err(errors::unsupported(
            "gate outputs that are not plain signals",
            target.span(),
        ));
    };
    let net = match scope.nets.get(name) {
        Some(info) => info.net,
        None => {
            let net = ctx
                .netlist
                .add_net(format!("{}{}", scope.prefix, ctx.name(*name)), value.width);
            scope.nets.insert(
                *name,
                SignalInfo {
                    net,
                    width: value.width,
                    signed: false,
                    is_reg: false,
                },
            );
            net
        }
    };
    let _ = tspan;
    drive_net(ctx, scope, net, value, span)
}
