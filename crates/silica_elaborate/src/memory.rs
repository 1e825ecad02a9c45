//! Memory inference: `MEMRD`/`MEMWR` creation for array-of-registers.
//!
//! A `reg` with an unpacked dimension registers a [`MemoryInfo`]; reads
//! become combinational `MEMRD` cells, clocked writes become `MEMWR` cells.
//! Both carry `memory`/`depth`/`width` attributes naming their array, which
//! is how downstream consumers pair the ports back up.

use crate::context::{ElabContext, Lowered, MemoryInfo};
use silica_netlist::{CellOp, NetId};

/// Creates a combinational read port: pins `ADDR` (in) and `DATA` (out).
pub fn memory_read(
    ctx: &mut ElabContext<'_>,
    prefix: &str,
    mem: &MemoryInfo,
    addr: Lowered,
) -> Lowered {
    let cell = ctx.fresh_cell(prefix, CellOp::MemRd);
    ctx.netlist.set_attr(cell, "memory", mem.name.as_str());
    ctx.netlist.set_attr(cell, "depth", mem.depth);
    ctx.netlist.set_attr(cell, "width", mem.width);

    let pa = ctx.netlist.add_input_pin(cell, "ADDR", addr.width);
    let pd = ctx.netlist.add_output_pin(cell, "DATA", mem.width);
    ctx.netlist.add_sink(addr.net, pa);

    let data = ctx.fresh_net(prefix, CellOp::MemRd, mem.width);
    ctx.netlist
        .set_driver(data, pd)
        .expect("fresh net has no driver");
    Lowered {
        net: data,
        width: mem.width,
        fresh: true,
    }
}

/// Creates a clocked write port: pins `CLK`, `ADDR`, `DATA`, `EN` (all in).
pub fn memory_write(
    ctx: &mut ElabContext<'_>,
    prefix: &str,
    mem: &MemoryInfo,
    clk: NetId,
    addr: Lowered,
    data: Lowered,
    enable: NetId,
) {
    let cell = ctx.fresh_cell(prefix, CellOp::MemWr);
    ctx.netlist.set_attr(cell, "memory", mem.name.as_str());
    ctx.netlist.set_attr(cell, "depth", mem.depth);
    ctx.netlist.set_attr(cell, "width", mem.width);

    let pc = ctx.netlist.add_input_pin(cell, "CLK", 1);
    let pa = ctx.netlist.add_input_pin(cell, "ADDR", addr.width);
    let pd = ctx.netlist.add_input_pin(cell, "DATA", data.width);
    let pe = ctx.netlist.add_input_pin(cell, "EN", 1);
    ctx.netlist.add_sink(clk, pc);
    ctx.netlist.add_sink(addr.net, pa);
    ctx.netlist.add_sink(data.net, pd);
    ctx.netlist.add_sink(enable, pe);
}

#[cfg(test)]
mod tests {
    use super::*;
    use silica_common::Interner;
    use silica_diagnostics::DiagnosticSink;

    fn mem() -> MemoryInfo {
        MemoryInfo {
            name: "mem".into(),
            width: 8,
            depth: 256,
        }
    }

    #[test]
    fn read_port_shape() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let mut ctx = ElabContext::new(&interner, &sink, std::iter::empty(), "t");
        let addr = ctx.netlist.add_net("addr", 8);
        let lowered = memory_read(
            &mut ctx,
            "",
            &mem(),
            Lowered {
                net: addr,
                width: 8,
                fresh: false,
            },
        );
        assert_eq!(lowered.width, 8);

        let rd = &ctx.netlist.cells_with_op(CellOp::MemRd)[0];
        assert!(rd.pin("ADDR").is_some());
        assert!(rd.pin("DATA").is_some());
        assert_eq!(rd.attr("memory").and_then(|a| a.as_str()), Some("mem"));
        assert_eq!(rd.attr("depth").and_then(|a| a.as_int()), Some(256));
    }

    #[test]
    fn write_port_shape() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let mut ctx = ElabContext::new(&interner, &sink, std::iter::empty(), "t");
        let clk = ctx.netlist.add_net("clk", 1);
        let addr = ctx.netlist.add_net("addr", 8);
        let data = ctx.netlist.add_net("din", 8);
        let en = ctx.netlist.add_net("we", 1);
        memory_write(
            &mut ctx,
            "",
            &mem(),
            clk,
            Lowered {
                net: addr,
                width: 8,
                fresh: false,
            },
            Lowered {
                net: data,
                width: 8,
                fresh: false,
            },
            en,
        );

        let wr = &ctx.netlist.cells_with_op(CellOp::MemWr)[0];
        for pin in ["CLK", "ADDR", "DATA", "EN"] {
            assert!(wr.pin(pin).is_some(), "missing pin {pin}");
        }
    }
}
