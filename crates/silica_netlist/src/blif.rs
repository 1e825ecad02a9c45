//! BLIF (Berkeley Logic Interchange Format) export.
//!
//! Maps cells to `.names` truth tables where a direct encoding exists
//! (BUF/NOT/AND/OR/XOR/MUX/CONST), `.latch` for the DFF family, and a
//! `.subckt` fallback for everything else, so the output always loads into
//! ABC/Yosys for verification even when a cell has no native BLIF form.

use crate::cell::{Cell, CellOp};
use crate::netlist::Netlist;
use std::fmt::Write;

/// Renders the netlist as BLIF text.
pub fn netlist_to_blif(netlist: &Netlist) -> String {
    let mut out = String::new();
    let _ = writeln!(out, ".model {}", netlist.name);

    let inputs: Vec<&str> = netlist.inputs.iter().map(|(n, _)| n.as_str()).collect();
    if !inputs.is_empty() {
        let _ = writeln!(out, ".inputs {}", inputs.join(" "));
    }
    let outputs: Vec<&str> = netlist.outputs.iter().map(|(n, _)| n.as_str()).collect();
    if !outputs.is_empty() {
        let _ = writeln!(out, ".outputs {}", outputs.join(" "));
    }
    out.push('\n');

    for id in netlist.topological_sort() {
        let cell = netlist.cell(id);
        write_cell(&mut out, netlist, cell);
    }

    out.push_str(".end\n");
    out
}

fn pin_net_name(netlist: &Netlist, cell: &Cell, pin: &str) -> String {
    match cell.pin(pin).and_then(|p| p.net) {
        Some(net) => {
            let n = netlist.net(net);
            if n.name.is_empty() {
                format!("_n{}", n.id.as_raw())
            } else {
                n.name.clone()
            }
        }
        None => "?".to_string(),
    }
}

fn write_cell(out: &mut String, netlist: &Netlist, cell: &Cell) {
    match cell.op {
        // Primary inputs are declared in the header.
        CellOp::ModuleInput => {}

        CellOp::ModuleOutput => {
            let src = pin_net_name(netlist, cell, "A");
            let _ = writeln!(out, ".names {src} {}\n1 1\n", cell.name);
        }

        CellOp::Const => {
            let y = pin_net_name(netlist, cell, "Y");
            let value = cell.attr("value").and_then(|a| a.as_int()).unwrap_or(0);
            let _ = writeln!(out, ".names {y}");
            if value != 0 {
                out.push_str("1\n");
            }
            out.push('\n');
        }

        CellOp::Buf => {
            let a = pin_net_name(netlist, cell, "A");
            let y = pin_net_name(netlist, cell, "Y");
            let _ = writeln!(out, ".names {a} {y}\n1 1\n");
        }

        CellOp::Not => {
            let a = pin_net_name(netlist, cell, "A");
            let y = pin_net_name(netlist, cell, "Y");
            let _ = writeln!(out, ".names {a} {y}\n0 1\n");
        }

        CellOp::And => {
            let a = pin_net_name(netlist, cell, "A");
            let b = pin_net_name(netlist, cell, "B");
            let y = pin_net_name(netlist, cell, "Y");
            let _ = writeln!(out, ".names {a} {b} {y}\n11 1\n");
        }

        CellOp::Or => {
            let a = pin_net_name(netlist, cell, "A");
            let b = pin_net_name(netlist, cell, "B");
            let y = pin_net_name(netlist, cell, "Y");
            let _ = writeln!(out, ".names {a} {b} {y}\n1- 1\n-1 1\n");
        }

        CellOp::Xor => {
            let a = pin_net_name(netlist, cell, "A");
            let b = pin_net_name(netlist, cell, "B");
            let y = pin_net_name(netlist, cell, "Y");
            let _ = writeln!(out, ".names {a} {b} {y}\n10 1\n01 1\n");
        }

        CellOp::Mux => {
            let s = pin_net_name(netlist, cell, "S");
            let a = pin_net_name(netlist, cell, "A");
            let b = pin_net_name(netlist, cell, "B");
            let y = pin_net_name(netlist, cell, "Y");
            // S ? B : A
            let _ = writeln!(out, ".names {s} {a} {b} {y}\n01- 1\n1-1 1\n");
        }

        CellOp::Dff | CellOp::Dffr | CellOp::Dffe => {
            let d = pin_net_name(netlist, cell, "D");
            let q = pin_net_name(netlist, cell, "Q");
            let clk = pin_net_name(netlist, cell, "CLK");
            let init = cell.attr("init").and_then(|a| a.as_int()).unwrap_or(0);
            let _ = writeln!(out, ".latch {d} {q} re {clk} {init}\n");
        }

        // No direct BLIF encoding — emit a subcircuit reference.
        _ => {
            let mut parts = Vec::new();
            for pin in &cell.pins {
                let net = pin_net_name(netlist, cell, &pin.name);
                parts.push(format!("{}={net}", pin.name));
            }
            let _ = writeln!(out, ".subckt {:?} {}\n", cell.op, parts.join(" "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellOp;

    fn and_gate_netlist() -> Netlist {
        let mut nl = Netlist::new("m");
        let (_, a_net) = nl.add_module_input("a", 1);
        let (_, b_net) = nl.add_module_input("b", 1);
        let and = nl.add_cell("and_0", CellOp::And);
        let pa = nl.add_input_pin(and, "A", 1);
        let pb = nl.add_input_pin(and, "B", 1);
        let py = nl.add_output_pin(and, "Y", 1);
        nl.add_sink(a_net, pa);
        nl.add_sink(b_net, pb);
        let y = nl.add_net("c", 1);
        nl.set_driver(y, py).unwrap();
        nl.add_module_output("c", 1, y);
        nl
    }

    #[test]
    fn and_gate_blif() {
        let blif = netlist_to_blif(&and_gate_netlist());
        assert!(blif.starts_with(".model m\n"));
        assert!(blif.contains(".inputs a b"));
        assert!(blif.contains(".outputs c"));
        assert!(blif.contains(".names a b c\n11 1"));
        assert!(blif.trim_end().ends_with(".end"));
    }

    #[test]
    fn const_cells() {
        let mut nl = Netlist::new("k");
        let c1 = nl.add_cell("one", CellOp::Const);
        let y1 = nl.add_output_pin(c1, "Y", 1);
        let n1 = nl.add_net("hi", 1);
        nl.set_driver(n1, y1).unwrap();
        nl.set_attr(c1, "value", 1i64);
        nl.add_module_output("hi", 1, n1);

        let blif = netlist_to_blif(&nl);
        assert!(blif.contains(".names hi\n1\n"));
    }

    #[test]
    fn dff_becomes_latch() {
        let mut nl = Netlist::new("r");
        let (_, clk) = nl.add_module_input("clk", 1);
        let (_, d_net) = nl.add_module_input("d", 1);
        let dff = nl.add_cell("q_reg", CellOp::Dff);
        let pc = nl.add_input_pin(dff, "CLK", 1);
        let pd = nl.add_input_pin(dff, "D", 1);
        let pq = nl.add_output_pin(dff, "Q", 1);
        nl.add_sink(clk, pc);
        nl.add_sink(d_net, pd);
        let q = nl.add_net("q", 1);
        nl.set_driver(q, pq).unwrap();
        nl.add_module_output("q", 1, q);

        let blif = netlist_to_blif(&nl);
        assert!(blif.contains(".latch d q re clk 0"));
    }

    #[test]
    fn unsupported_cell_falls_back_to_subckt() {
        let mut nl = Netlist::new("s");
        let add = nl.add_cell("add_0", CellOp::Add);
        nl.add_input_pin(add, "A", 8);
        nl.add_input_pin(add, "B", 8);
        let y = nl.add_output_pin(add, "Y", 8);
        let n = nl.add_net("sum", 8);
        nl.set_driver(n, y).unwrap();
        nl.add_module_output("sum", 8, n);

        let blif = netlist_to_blif(&nl);
        assert!(blif.contains(".subckt Add"));
        assert!(blif.contains("Y=sum"));
    }
}
