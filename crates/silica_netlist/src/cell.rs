//! Cells: the nodes of the netlist hypergraph.

use crate::attr::AttrValue;
use crate::ids::{CellId, NetId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The primitive operation a cell performs. Closed set; anything the
/// elaborator cannot express with these becomes a `Subcircuit` black box.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum CellOp {
    // Structural
    ModuleInput,
    ModuleOutput,
    Const,

    // Bitwise / logical
    Buf,
    Not,
    And,
    Or,
    Xor,
    Nand,
    Nor,
    Xnor,

    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Shift
    Shl,
    Shr,
    Sar,

    // Selection and bit manipulation
    Mux,
    Concat,
    Slice,

    // Sequential
    Dff,
    /// DFF with reset (the `async` attribute distinguishes async from sync).
    Dffr,
    /// DFF with clock enable.
    Dffe,
    Latch,

    // Memory ports
    MemRd,
    MemWr,

    // Unexpanded black box
    Subcircuit,
}

impl CellOp {
    /// Returns `true` for state-holding cells. These break combinational
    /// paths: topological ordering and cycle detection do not traverse
    /// through them.
    pub fn is_sequential(self) -> bool {
        matches!(
            self,
            CellOp::Dff | CellOp::Dffr | CellOp::Dffe | CellOp::Latch | CellOp::MemRd | CellOp::MemWr
        )
    }

    /// Returns `true` for the module I/O pseudo-cells.
    pub fn is_module_io(self) -> bool {
        matches!(self, CellOp::ModuleInput | CellOp::ModuleOutput)
    }
}

/// Pin direction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PortDir {
    /// Data flows into the cell.
    In,
    /// Data flows out of the cell.
    Out,
}

/// A named connection point on a cell. A pin belongs to exactly one cell and
/// attaches to at most one net.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pin {
    /// Pin name (`A`, `B`, `Y`, `CLK`, …).
    pub name: String,
    /// Direction.
    pub dir: PortDir,
    /// Bit width.
    pub width: u32,
    /// The attached net, if any.
    pub net: Option<NetId>,
}

/// A cell: one primitive operation with named pins and attributes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cell {
    /// This cell's ID (its canonical handle).
    pub id: CellId,
    /// Instance name; unique by convention, hierarchical names are
    /// dot-separated (`u1.add_3`).
    pub name: String,
    /// The operation.
    pub op: CellOp,
    /// Pins in creation order.
    pub pins: Vec<Pin>,
    /// Attributes (`value`, `memory`, `depth`, `msb`/`lsb`, `init`, …).
    pub attrs: BTreeMap<String, AttrValue>,
}

impl Cell {
    /// Finds a pin by name.
    pub fn pin(&self, name: &str) -> Option<&Pin> {
        self.pins.iter().find(|p| p.name == name)
    }

    /// Finds a pin's index by name.
    pub fn pin_index(&self, name: &str) -> Option<u32> {
        self.pins.iter().position(|p| p.name == name).map(|i| i as u32)
    }

    /// Iterates the input pins.
    pub fn inputs(&self) -> impl Iterator<Item = &Pin> {
        self.pins.iter().filter(|p| p.dir == PortDir::In)
    }

    /// Iterates the output pins.
    pub fn outputs(&self) -> impl Iterator<Item = &Pin> {
        self.pins.iter().filter(|p| p.dir == PortDir::Out)
    }

    /// The single output pin of a one-output cell.
    ///
    /// # Panics
    ///
    /// Panics if the cell does not have exactly one output.
    pub fn output(&self) -> &Pin {
        let mut outs = self.outputs();
        let first = outs.next().expect("cell has no output pin");
        assert!(outs.next().is_none(), "cell has multiple output pins");
        first
    }

    /// An attribute's value.
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(op: CellOp, pins: Vec<Pin>) -> Cell {
        Cell {
            id: CellId::from_raw(0),
            name: "c".into(),
            op,
            pins,
            attrs: BTreeMap::new(),
        }
    }

    fn pin(name: &str, dir: PortDir) -> Pin {
        Pin {
            name: name.into(),
            dir,
            width: 1,
            net: None,
        }
    }

    #[test]
    fn sequential_classification() {
        for op in [
            CellOp::Dff,
            CellOp::Dffr,
            CellOp::Dffe,
            CellOp::Latch,
            CellOp::MemRd,
            CellOp::MemWr,
        ] {
            assert!(op.is_sequential());
        }
        for op in [CellOp::And, CellOp::Mux, CellOp::Const, CellOp::ModuleInput] {
            assert!(!op.is_sequential());
        }
    }

    #[test]
    fn pin_lookup() {
        let c = cell(
            CellOp::And,
            vec![
                pin("A", PortDir::In),
                pin("B", PortDir::In),
                pin("Y", PortDir::Out),
            ],
        );
        assert_eq!(c.pin_index("B"), Some(1));
        assert!(c.pin("Y").is_some());
        assert!(c.pin("Z").is_none());
        assert_eq!(c.inputs().count(), 2);
        assert_eq!(c.output().name, "Y");
    }

    #[test]
    fn serde_roundtrip() {
        let mut c = cell(CellOp::Const, vec![pin("Y", PortDir::Out)]);
        c.attrs.insert("value".into(), AttrValue::Int(5));
        let json = serde_json::to_string(&c).unwrap();
        let back: Cell = serde_json::from_str(&json).unwrap();
        assert_eq!(back.op, CellOp::Const);
        assert_eq!(back.attr("value").and_then(|a| a.as_int()), Some(5));
    }
}
