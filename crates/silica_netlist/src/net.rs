//! Nets: the hyperedges of the netlist graph.

use crate::ids::{CellId, NetId};
use serde::{Deserialize, Serialize};

/// A reference to one pin: the owning cell plus the pin's index within it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct PinRef {
    /// The owning cell.
    pub cell: CellId,
    /// Index into the cell's pin list.
    pub pin: u32,
}

impl PinRef {
    /// Creates a pin reference.
    pub fn new(cell: CellId, pin: u32) -> Self {
        Self { cell, pin }
    }
}

/// A signal net: at most one driver pin, any number of sinks.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Net {
    /// This net's ID.
    pub id: NetId,
    /// Signal name; synthesized nets get `_<op>_<id>` names.
    pub name: String,
    /// Bit width.
    pub width: u32,
    /// The driving pin, if the net is driven.
    pub driver: Option<PinRef>,
    /// The reading pins.
    pub sinks: Vec<PinRef>,
}

impl Net {
    /// Number of sink pins.
    pub fn fanout(&self) -> usize {
        self.sinks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fanout_counts_sinks() {
        let net = Net {
            id: NetId::from_raw(0),
            name: "n".into(),
            width: 1,
            driver: None,
            sinks: vec![
                PinRef::new(CellId::from_raw(1), 0),
                PinRef::new(CellId::from_raw(2), 1),
            ],
        };
        assert_eq!(net.fanout(), 2);
    }
}
