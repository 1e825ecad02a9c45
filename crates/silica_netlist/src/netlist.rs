//! The netlist container and its construction API.

use crate::arena::Arena;
use crate::attr::AttrValue;
use crate::cell::{Cell, CellOp, Pin, PortDir};
use crate::ids::{CellId, NetId};
use crate::net::{Net, PinRef};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Structural errors raised while wiring a netlist.
#[derive(Debug, thiserror::Error)]
pub enum NetlistError {
    /// Two drivers were connected to the same net.
    #[error("net `{net}` already has a driver")]
    MultiDriver {
        /// The net's name.
        net: String,
    },
}

/// A flattened gate-level netlist for one elaborated module.
///
/// Cells and nets are stored in append-only arenas; removal is logical, via
/// a tombstone set, so IDs stay valid. Because the ID counters live inside
/// the netlist, elaborating the same source twice produces byte-identical
/// serialized dumps.
#[derive(Debug, Serialize, Deserialize)]
pub struct Netlist {
    /// The elaborated module's name.
    pub name: String,
    /// All cells, live and dead.
    pub cells: Arena<CellId, Cell>,
    /// All nets.
    pub nets: Arena<NetId, Net>,
    /// Primary inputs, in port order: `(port name, MODULE_INPUT cell)`.
    pub inputs: Vec<(String, CellId)>,
    /// Primary outputs, in port order: `(port name, MODULE_OUTPUT cell)`.
    pub outputs: Vec<(String, CellId)>,
    /// Logically removed cells.
    dead: BTreeSet<CellId>,
}

impl Netlist {
    /// Creates an empty netlist for the named module.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: Arena::new(),
            nets: Arena::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            dead: BTreeSet::new(),
        }
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Adds a cell with no pins.
    pub fn add_cell(&mut self, name: impl Into<String>, op: CellOp) -> CellId {
        let id = CellId::from_raw(self.cells.len() as u32);
        self.cells.alloc(Cell {
            id,
            name: name.into(),
            op,
            pins: Vec::new(),
            attrs: BTreeMap::new(),
        })
    }

    /// Adds an input pin to a cell.
    pub fn add_input_pin(&mut self, cell: CellId, name: &str, width: u32) -> PinRef {
        self.add_pin(cell, name, PortDir::In, width)
    }

    /// Adds an output pin to a cell.
    pub fn add_output_pin(&mut self, cell: CellId, name: &str, width: u32) -> PinRef {
        self.add_pin(cell, name, PortDir::Out, width)
    }

    fn add_pin(&mut self, cell: CellId, name: &str, dir: PortDir, width: u32) -> PinRef {
        let c = self.cells.get_mut(cell);
        c.pins.push(Pin {
            name: name.to_string(),
            dir,
            width,
            net: None,
        });
        PinRef::new(cell, (c.pins.len() - 1) as u32)
    }

    /// Sets an attribute on a cell.
    pub fn set_attr(&mut self, cell: CellId, name: &str, value: impl Into<AttrValue>) {
        self.cells
            .get_mut(cell)
            .attrs
            .insert(name.to_string(), value.into());
    }

    /// Creates a net.
    pub fn add_net(&mut self, name: impl Into<String>, width: u32) -> NetId {
        let id = NetId::from_raw(self.nets.len() as u32);
        self.nets.alloc(Net {
            id,
            name: name.into(),
            width,
            driver: None,
            sinks: Vec::new(),
        })
    }

    /// Connects `pin` as the driver of `net`.
    ///
    /// Fails if the net already has a (different) driver; re-connecting the
    /// same pin is a no-op.
    pub fn set_driver(&mut self, net: NetId, pin: PinRef) -> Result<(), NetlistError> {
        let n = self.nets.get_mut(net);
        match n.driver {
            Some(existing) if existing == pin => return Ok(()),
            Some(_) => {
                return Err(NetlistError::MultiDriver {
                    net: n.name.clone(),
                })
            }
            None => n.driver = Some(pin),
        }
        self.pin_mut(pin).net = Some(net);
        Ok(())
    }

    /// Connects `pin` as a sink of `net`.
    pub fn add_sink(&mut self, net: NetId, pin: PinRef) {
        self.nets.get_mut(net).sinks.push(pin);
        self.pin_mut(pin).net = Some(net);
    }

    /// Moves `src`'s driver pin onto `dst`, leaving `src` undriven.
    ///
    /// This is how an expression's freshly synthesized output net is spliced
    /// onto a named target net. Fails if `dst` is already driven; does
    /// nothing if `src` has no driver.
    pub fn move_driver(&mut self, src: NetId, dst: NetId) -> Result<(), NetlistError> {
        let Some(pin) = self.nets.get(src).driver else {
            return Ok(());
        };
        if self.nets.get(dst).driver.is_some() {
            return Err(NetlistError::MultiDriver {
                net: self.nets.get(dst).name.clone(),
            });
        }
        self.nets.get_mut(src).driver = None;
        self.nets.get_mut(dst).driver = Some(pin);
        self.pin_mut(pin).net = Some(dst);
        Ok(())
    }

    /// Adds a primary input: a `MODULE_INPUT` cell whose `Y` pin drives a
    /// net carrying the port's name. Returns the cell and the net.
    pub fn add_module_input(&mut self, name: &str, width: u32) -> (CellId, NetId) {
        let cell = self.add_cell(name, CellOp::ModuleInput);
        let y = self.add_output_pin(cell, "Y", width);
        let net = self.add_net(name, width);
        self.set_driver(net, y).expect("fresh net has no driver");
        self.inputs.push((name.to_string(), cell));
        (cell, net)
    }

    /// Adds a primary output: a `MODULE_OUTPUT` cell whose `A` pin sinks
    /// `net`.
    pub fn add_module_output(&mut self, name: &str, width: u32, net: NetId) -> CellId {
        let cell = self.add_cell(name, CellOp::ModuleOutput);
        let a = self.add_input_pin(cell, "A", width);
        self.add_sink(net, a);
        self.outputs.push((name.to_string(), cell));
        cell
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Logically removes a cell, detaching its pins from their nets.
    pub fn remove_cell(&mut self, id: CellId) {
        if !self.dead.insert(id) {
            return;
        }
        let pin_count = self.cells.get(id).pins.len();
        for index in 0..pin_count {
            let pref = PinRef::new(id, index as u32);
            if let Some(net) = self.cells.get(id).pins[index].net {
                let n = self.nets.get_mut(net);
                n.sinks.retain(|&s| s != pref);
                if n.driver == Some(pref) {
                    n.driver = None;
                }
            }
            self.pin_mut(pref).net = None;
        }
        self.inputs.retain(|(_, c)| *c != id);
        self.outputs.retain(|(_, c)| *c != id);
    }

    /// Returns `true` if the cell has been removed.
    pub fn is_dead(&self, id: CellId) -> bool {
        self.dead.contains(&id)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Returns a cell by ID.
    pub fn cell(&self, id: CellId) -> &Cell {
        self.cells.get(id)
    }

    /// Returns a net by ID.
    pub fn net(&self, id: NetId) -> &Net {
        self.nets.get(id)
    }

    /// Resolves a pin reference.
    pub fn pin(&self, pref: PinRef) -> &Pin {
        &self.cells.get(pref.cell).pins[pref.pin as usize]
    }

    fn pin_mut(&mut self, pref: PinRef) -> &mut Pin {
        &mut self.cells.get_mut(pref.cell).pins[pref.pin as usize]
    }

    /// Iterates the live cells in allocation order.
    pub fn live_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells
            .iter()
            .filter(|(id, _)| !self.dead.contains(id))
            .map(|(_, c)| c)
    }

    /// Number of live cells.
    pub fn live_cell_count(&self) -> usize {
        self.cells.len() - self.dead.len()
    }

    /// Live cells with the given op.
    pub fn cells_with_op(&self, op: CellOp) -> Vec<&Cell> {
        self.live_cells().filter(|c| c.op == op).collect()
    }

    /// Per-op live cell counts, plus totals, for reporting.
    pub fn stats(&self) -> BTreeMap<String, usize> {
        let mut stats = BTreeMap::new();
        for cell in self.live_cells() {
            *stats.entry(format!("{:?}", cell.op)).or_insert(0) += 1;
        }
        stats.insert("cells".to_string(), self.live_cell_count());
        stats.insert("nets".to_string(), self.nets.len());
        stats
    }

    /// Serializes the netlist to JSON. Deterministic: equal netlists dump to
    /// byte-identical text.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("netlist serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_input_drives_named_net() {
        let mut nl = Netlist::new("t");
        let (cell, net) = nl.add_module_input("a", 1);
        assert_eq!(nl.net(net).name, "a");
        assert_eq!(nl.net(net).driver, Some(PinRef::new(cell, 0)));
        assert_eq!(nl.inputs.len(), 1);
    }

    #[test]
    fn multi_driver_rejected() {
        let mut nl = Netlist::new("t");
        let c1 = nl.add_cell("c1", CellOp::Const);
        let y1 = nl.add_output_pin(c1, "Y", 1);
        let c2 = nl.add_cell("c2", CellOp::Const);
        let y2 = nl.add_output_pin(c2, "Y", 1);
        let net = nl.add_net("n", 1);
        nl.set_driver(net, y1).unwrap();
        assert!(nl.set_driver(net, y2).is_err());
        // Same pin again is fine.
        assert!(nl.set_driver(net, y1).is_ok());
    }

    #[test]
    fn remove_cell_detaches_pins() {
        let mut nl = Netlist::new("t");
        let (_, a_net) = nl.add_module_input("a", 1);
        let inv = nl.add_cell("inv", CellOp::Not);
        let a = nl.add_input_pin(inv, "A", 1);
        let y = nl.add_output_pin(inv, "Y", 1);
        nl.add_sink(a_net, a);
        let out = nl.add_net("out", 1);
        nl.set_driver(out, y).unwrap();

        assert_eq!(nl.net(a_net).fanout(), 1);
        nl.remove_cell(inv);
        assert!(nl.is_dead(inv));
        assert_eq!(nl.net(a_net).fanout(), 0);
        assert!(nl.net(out).driver.is_none());
        assert_eq!(nl.live_cell_count(), 1);
    }

    #[test]
    fn stats_count_ops() {
        let mut nl = Netlist::new("t");
        nl.add_cell("a1", CellOp::And);
        nl.add_cell("a2", CellOp::And);
        nl.add_cell("x", CellOp::Xor);
        let stats = nl.stats();
        assert_eq!(stats.get("And"), Some(&2));
        assert_eq!(stats.get("Xor"), Some(&1));
        assert_eq!(stats.get("cells"), Some(&3));
    }

    #[test]
    fn json_dump_deterministic() {
        let build = || {
            let mut nl = Netlist::new("t");
            let (_, a) = nl.add_module_input("a", 1);
            let inv = nl.add_cell("inv", CellOp::Not);
            let ain = nl.add_input_pin(inv, "A", 1);
            let y = nl.add_output_pin(inv, "Y", 1);
            nl.add_sink(a, ain);
            let out = nl.add_net("y", 1);
            nl.set_driver(out, y).unwrap();
            nl.add_module_output("y", 1, out);
            nl.set_attr(inv, "keep", 1i64);
            nl.to_json()
        };
        assert_eq!(build(), build());
    }
}
