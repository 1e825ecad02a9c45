//! Elaboration context and per-module scopes.

use crate::const_eval::ConstEnv;
use silica_common::{Ident, Interner};
use silica_diagnostics::DiagnosticSink;
use silica_netlist::{CellId, CellOp, NetId, Netlist, PinRef};
use silica_verilog_parser::ast::ModuleDecl;
use std::collections::HashMap;

/// Session-wide elaboration state: the module registry, the netlist being
/// built, and the shared interner/sink.
pub struct ElabContext<'a> {
    /// The string interner.
    pub interner: &'a Interner,
    /// Diagnostics accumulator (warnings; fatal errors are returned).
    pub sink: &'a DiagnosticSink,
    /// All module declarations by name.
    pub registry: HashMap<Ident, &'a ModuleDecl>,
    /// The flattened netlist under construction.
    pub netlist: Netlist,
    /// Modules currently being elaborated, for recursion detection.
    pub instance_stack: Vec<Ident>,
}

impl<'a> ElabContext<'a> {
    /// Creates a context over a source file's modules.
    pub fn new(
        interner: &'a Interner,
        sink: &'a DiagnosticSink,
        modules: impl Iterator<Item = &'a ModuleDecl>,
        top_name: &str,
    ) -> Self {
        let mut registry = HashMap::new();
        for m in modules {
            registry.insert(m.name, m);
        }
        Self {
            interner,
            sink,
            registry,
            netlist: Netlist::new(top_name),
            instance_stack: Vec::new(),
        }
    }

    /// Resolves an ident to its string.
    pub fn name(&self, ident: Ident) -> &'a str {
        self.interner.resolve(ident)
    }

    /// Creates a cell with a synthesized hierarchical name
    /// (`<prefix><op>_<id>`).
    pub fn fresh_cell(&mut self, prefix: &str, op: CellOp) -> CellId {
        let id = self.netlist.cells.len();
        let tag = op_tag(op);
        self.netlist.add_cell(format!("{prefix}{tag}_{id}"), op)
    }

    /// Creates a synthesized net (`<prefix>_<op>_<id>`).
    pub fn fresh_net(&mut self, prefix: &str, op: CellOp, width: u32) -> NetId {
        let id = self.netlist.nets.len();
        let tag = op_tag(op);
        self.netlist.add_net(format!("{prefix}_{tag}_{id}"), width)
    }

    /// Creates a `CONST` cell driving a fresh net with the given value.
    pub fn const_net(&mut self, prefix: &str, value: i64, width: u32) -> NetId {
        let cell = self.fresh_cell(prefix, CellOp::Const);
        self.netlist.set_attr(cell, "value", value);
        self.netlist.set_attr(cell, "width", width);
        let y = self.netlist.add_output_pin(cell, "Y", width);
        let net = self.fresh_net(prefix, CellOp::Const, width);
        self.netlist
            .set_driver(net, y)
            .expect("fresh net has no driver");
        net
    }

    /// Coerces a net to one bit: identity for 1-bit nets, a reduction OR
    /// otherwise.
    pub fn bool_net(&mut self, prefix: &str, net: NetId, width: u32) -> NetId {
        if width <= 1 {
            return net;
        }
        let cell = self.fresh_cell(prefix, CellOp::Or);
        self.netlist.set_attr(cell, "reduction", 1i64);
        let a = self.netlist.add_input_pin(cell, "A", width);
        let y = self.netlist.add_output_pin(cell, "Y", 1);
        self.netlist.add_sink(net, a);
        let out = self.fresh_net(prefix, CellOp::Or, 1);
        self.netlist
            .set_driver(out, y)
            .expect("fresh net has no driver");
        out
    }

    /// Builds a two-input cell over existing nets, returning its output net.
    pub fn binary_cell(
        &mut self,
        prefix: &str,
        op: CellOp,
        a: NetId,
        a_width: u32,
        b: NetId,
        b_width: u32,
        out_width: u32,
    ) -> NetId {
        let cell = self.fresh_cell(prefix, op);
        let pa = self.netlist.add_input_pin(cell, "A", a_width);
        let pb = self.netlist.add_input_pin(cell, "B", b_width);
        let py = self.netlist.add_output_pin(cell, "Y", out_width);
        self.netlist.add_sink(a, pa);
        self.netlist.add_sink(b, pb);
        let out = self.fresh_net(prefix, op, out_width);
        self.netlist
            .set_driver(out, py)
            .expect("fresh net has no driver");
        out
    }

    /// Builds a `MUX` cell: `S ? B : A`.
    pub fn mux_cell(
        &mut self,
        prefix: &str,
        sel: NetId,
        a_false: NetId,
        b_true: NetId,
        width: u32,
    ) -> NetId {
        let cell = self.fresh_cell(prefix, CellOp::Mux);
        let ps = self.netlist.add_input_pin(cell, "S", 1);
        let pa = self.netlist.add_input_pin(cell, "A", width);
        let pb = self.netlist.add_input_pin(cell, "B", width);
        let py = self.netlist.add_output_pin(cell, "Y", width);
        self.netlist.add_sink(sel, ps);
        self.netlist.add_sink(a_false, pa);
        self.netlist.add_sink(b_true, pb);
        let out = self.fresh_net(prefix, CellOp::Mux, width);
        self.netlist
            .set_driver(out, py)
            .expect("fresh net has no driver");
        out
    }

    /// Builds a `SLICE` cell selecting `[msb:lsb]` of `src`.
    pub fn slice_cell(
        &mut self,
        prefix: &str,
        src: NetId,
        src_width: u32,
        msb: u32,
        lsb: u32,
    ) -> NetId {
        let width = msb - lsb + 1;
        let cell = self.fresh_cell(prefix, CellOp::Slice);
        self.netlist.set_attr(cell, "msb", msb);
        self.netlist.set_attr(cell, "lsb", lsb);
        let pa = self.netlist.add_input_pin(cell, "A", src_width);
        let py = self.netlist.add_output_pin(cell, "Y", width);
        self.netlist.add_sink(src, pa);
        let out = self.fresh_net(prefix, CellOp::Slice, width);
        self.netlist
            .set_driver(out, py)
            .expect("fresh net has no driver");
        out
    }

    /// Builds a `NOT` over one net.
    pub fn not_cell(&mut self, prefix: &str, a: NetId, width: u32) -> NetId {
        let cell = self.fresh_cell(prefix, CellOp::Not);
        let pa = self.netlist.add_input_pin(cell, "A", width);
        let py = self.netlist.add_output_pin(cell, "Y", width);
        self.netlist.add_sink(a, pa);
        let out = self.fresh_net(prefix, CellOp::Not, width);
        self.netlist
            .set_driver(out, py)
            .expect("fresh net has no driver");
        out
    }

    /// Output pin reference of a single-output cell.
    pub fn output_pin(&self, cell: CellId) -> PinRef {
        let index = self
            .netlist
            .cell(cell)
            .pins
            .iter()
            .position(|p| p.dir == silica_netlist::PortDir::Out)
            .expect("cell has an output pin");
        PinRef::new(cell, index as u32)
    }
}

/// A lowered expression: its driving net, width, and whether the net was
/// synthesized for this expression (fresh nets can be spliced onto a target,
/// existing nets must be buffered).
#[derive(Clone, Copy, Debug)]
pub struct Lowered {
    /// The driving net.
    pub net: NetId,
    /// Bit width.
    pub width: u32,
    /// `true` if the net was created while lowering this expression.
    pub fresh: bool,
}

/// A declared signal within a module scope.
#[derive(Clone, Copy, Debug)]
pub struct SignalInfo {
    /// The signal's net.
    pub net: NetId,
    /// Declared width.
    pub width: u32,
    /// Declared signed.
    pub signed: bool,
    /// `reg`/`integer` storage class.
    pub is_reg: bool,
}

/// An inferred memory (`reg [W-1:0] mem [0:D-1]`).
#[derive(Clone, Debug)]
pub struct MemoryInfo {
    /// Source-level name (with hierarchy prefix).
    pub name: String,
    /// Word width.
    pub width: u32,
    /// Depth in words.
    pub depth: u32,
}

/// A pending partial (bit/range) driver for a declared net.
///
/// `assign y[i] = …` and child output ports bound to selects register one
/// piece each. Reads of a covered bit range resolve straight to the piece,
/// keeping per-bit feed-forward chains (ripple carries) acyclic at the cell
/// level; the module finalize pass concatenates the pieces onto the target
/// net itself when something reads it whole.
#[derive(Clone, Copy, Debug)]
pub struct PartialDrive {
    /// High bit, inclusive.
    pub hi: u32,
    /// Low bit, inclusive.
    pub lo: u32,
    /// The driving value.
    pub value: Lowered,
    /// Where the assignment was written.
    pub span: silica_source::Span,
}

/// Per-module-instance elaboration scope.
pub struct ModuleScope {
    /// Hierarchical name prefix (`""` at top, `"u1."` inside instance `u1`).
    pub prefix: String,
    /// Declared signals.
    pub nets: HashMap<Ident, SignalInfo>,
    /// Inferred memories.
    pub memories: HashMap<Ident, MemoryInfo>,
    /// Parameters, localparams, and genvar bindings.
    pub consts: ConstEnv,
    /// Procedural value overrides during always-block lowering (blocking
    /// assignment visibility).
    pub overrides: HashMap<Ident, Lowered>,
    /// Register initial values from declarations and initial blocks.
    pub reg_init: HashMap<Ident, i64>,
    /// Pending partial drivers per target signal.
    pub partials: HashMap<Ident, Vec<PartialDrive>>,
}

impl ModuleScope {
    /// Creates an empty scope with the given hierarchy prefix.
    pub fn new(prefix: String) -> Self {
        Self {
            prefix,
            nets: HashMap::new(),
            memories: HashMap::new(),
            consts: ConstEnv::new(),
            overrides: HashMap::new(),
            reg_init: HashMap::new(),
            partials: HashMap::new(),
        }
    }

    /// Resolves a signal, honoring procedural overrides.
    ///
    /// Override values come back with `fresh` cleared: only the entry kept
    /// in the environment may splice its driver onto a target; every other
    /// reader must tap the net without stealing it.
    pub fn resolve(&self, name: Ident) -> Option<Lowered> {
        if let Some(&l) = self.overrides.get(&name) {
            return Some(Lowered { fresh: false, ..l });
        }
        self.nets.get(&name).map(|info| Lowered {
            net: info.net,
            width: info.width,
            fresh: false,
        })
    }

    /// Finds a registered partial driver fully covering `[hi:lo]` of a
    /// signal, returning the piece and the bit offset of `lo` within it.
    pub fn partial_piece(&self, name: Ident, hi: u32, lo: u32) -> Option<(Lowered, u32)> {
        self.partials.get(&name)?.iter().find_map(|piece| {
            (piece.lo <= lo && hi <= piece.hi).then(|| (piece.value, lo - piece.lo))
        })
    }
}

fn op_tag(op: CellOp) -> &'static str {
    match op {
        CellOp::ModuleInput => "in",
        CellOp::ModuleOutput => "out",
        CellOp::Const => "const",
        CellOp::Buf => "buf",
        CellOp::Not => "not",
        CellOp::And => "and",
        CellOp::Or => "or",
        CellOp::Xor => "xor",
        CellOp::Nand => "nand",
        CellOp::Nor => "nor",
        CellOp::Xnor => "xnor",
        CellOp::Add => "add",
        CellOp::Sub => "sub",
        CellOp::Mul => "mul",
        CellOp::Div => "div",
        CellOp::Mod => "mod",
        CellOp::Eq => "eq",
        CellOp::Ne => "ne",
        CellOp::Lt => "lt",
        CellOp::Le => "le",
        CellOp::Gt => "gt",
        CellOp::Ge => "ge",
        CellOp::Shl => "shl",
        CellOp::Shr => "shr",
        CellOp::Sar => "sar",
        CellOp::Mux => "mux",
        CellOp::Concat => "concat",
        CellOp::Slice => "slice",
        CellOp::Dff => "dff",
        CellOp::Dffr => "dffr",
        CellOp::Dffe => "dffe",
        CellOp::Latch => "latch",
        CellOp::MemRd => "memrd",
        CellOp::MemWr => "memwr",
        CellOp::Subcircuit => "subckt",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silica_verilog_parser::ast::VerilogSourceFile;

    fn ctx<'a>(
        interner: &'a Interner,
        sink: &'a DiagnosticSink,
        file: &'a VerilogSourceFile,
    ) -> ElabContext<'a> {
        ElabContext::new(interner, sink, file.modules(), "t")
    }

    fn empty_file() -> VerilogSourceFile {
        VerilogSourceFile {
            items: Vec::new(),
            span: silica_source::Span::DUMMY,
        }
    }

    #[test]
    fn fresh_names_are_unique_and_prefixed() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let file = empty_file();
        let mut ctx = ctx(&interner, &sink, &file);
        let c1 = ctx.fresh_cell("u1.", CellOp::And);
        let c2 = ctx.fresh_cell("u1.", CellOp::And);
        assert_ne!(ctx.netlist.cell(c1).name, ctx.netlist.cell(c2).name);
        assert!(ctx.netlist.cell(c1).name.starts_with("u1.and_"));
    }

    #[test]
    fn const_net_carries_value() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let file = empty_file();
        let mut ctx = ctx(&interner, &sink, &file);
        let net = ctx.const_net("", 42, 8);
        let driver = ctx.netlist.net(net).driver.unwrap();
        let cell = ctx.netlist.cell(driver.cell);
        assert_eq!(cell.op, CellOp::Const);
        assert_eq!(cell.attr("value").and_then(|a| a.as_int()), Some(42));
    }

    #[test]
    fn bool_net_reduces_wide_signals_only() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let file = empty_file();
        let mut ctx = ctx(&interner, &sink, &file);
        let narrow = ctx.netlist.add_net("n1", 1);
        assert_eq!(ctx.bool_net("", narrow, 1), narrow);

        let wide = ctx.netlist.add_net("n8", 8);
        let reduced = ctx.bool_net("", wide, 8);
        assert_ne!(reduced, wide);
        assert_eq!(ctx.netlist.net(reduced).width, 1);
    }

    #[test]
    fn scope_overrides_shadow_declared_nets() {
        let interner = Interner::new();
        let mut scope = ModuleScope::new(String::new());
        let q = interner.intern("q");
        scope.nets.insert(
            q,
            SignalInfo {
                net: NetId::from_raw(0),
                width: 8,
                signed: false,
                is_reg: true,
            },
        );
        assert_eq!(scope.resolve(q).unwrap().net, NetId::from_raw(0));
        scope.overrides.insert(
            q,
            Lowered {
                net: NetId::from_raw(5),
                width: 8,
                fresh: true,
            },
        );
        assert_eq!(scope.resolve(q).unwrap().net, NetId::from_raw(5));
    }
}
