//! Graph algorithms over the netlist.
//!
//! The combinational portion of a netlist is a DAG; sequential cells
//! (`DFF*`, `LATCH`, `MEMRD`, `MEMWR`) break the feedback loops. Every
//! algorithm here treats edges out of sequential cells as cut: topological
//! ordering seeds them at depth zero, and cycle detection refuses to
//! traverse through them, so only genuinely combinational loops surface.

use crate::cell::CellOp;
use crate::ids::CellId;
use crate::netlist::Netlist;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

impl Netlist {
    /// The cells driving this cell's input pins (one hop of fanin).
    pub fn fanin_cells(&self, id: CellId) -> Vec<CellId> {
        let mut result = Vec::new();
        for pin in self.cell(id).inputs() {
            if let Some(net) = pin.net {
                if let Some(driver) = self.net(net).driver {
                    if !self.is_dead(driver.cell) {
                        result.push(driver.cell);
                    }
                }
            }
        }
        result
    }

    /// The cells reading this cell's output pins (one hop of fanout).
    pub fn fanout_cells(&self, id: CellId) -> Vec<CellId> {
        let mut result = Vec::new();
        for pin in self.cell(id).outputs() {
            if let Some(net) = pin.net {
                for sink in &self.net(net).sinks {
                    if !self.is_dead(sink.cell) {
                        result.push(sink.cell);
                    }
                }
            }
        }
        result
    }

    /// Returns the live cells in topological order, inputs toward outputs
    /// (Kahn's algorithm). Edges out of sequential cells are ignored for
    /// ordering, so designs with register feedback still order; cells left
    /// unordered by a combinational cycle are appended at the end.
    pub fn topological_sort(&self) -> Vec<CellId> {
        let live: Vec<CellId> = self
            .cells
            .iter()
            .filter(|(id, _)| !self.is_dead(*id))
            .map(|(id, _)| id)
            .collect();

        let mut in_degree: HashMap<CellId, usize> = HashMap::new();
        for &id in &live {
            let degree = self
                .fanin_cells(id)
                .into_iter()
                .filter(|&pred| !self.cell(pred).op.is_sequential())
                .count();
            in_degree.insert(id, degree);
        }

        let mut queue: VecDeque<CellId> = live
            .iter()
            .copied()
            .filter(|id| in_degree[id] == 0)
            .collect();
        let mut order = Vec::with_capacity(live.len());
        let mut seen: HashSet<CellId> = HashSet::new();

        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            if self.cell(id).op.is_sequential() {
                continue;
            }
            for succ in self.fanout_cells(id) {
                if let Some(deg) = in_degree.get_mut(&succ) {
                    *deg = deg.saturating_sub(1);
                    if *deg == 0 {
                        queue.push_back(succ);
                    }
                }
            }
        }

        // Cells stranded by a cycle still belong in the order.
        for &id in &live {
            if !seen.contains(&id) {
                order.push(id);
            }
        }
        order
    }

    /// The transitive fanin cone of a cell, including the cell itself (BFS).
    pub fn fanin_cone(&self, id: CellId) -> BTreeSet<CellId> {
        self.cone(id, |nl, c| nl.fanin_cells(c))
    }

    /// The transitive fanout cone of a cell, including the cell itself (BFS).
    pub fn fanout_cone(&self, id: CellId) -> BTreeSet<CellId> {
        self.cone(id, |nl, c| nl.fanout_cells(c))
    }

    fn cone(&self, id: CellId, step: impl Fn(&Self, CellId) -> Vec<CellId>) -> BTreeSet<CellId> {
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::from([id]);
        while let Some(c) = queue.pop_front() {
            if !visited.insert(c) {
                continue;
            }
            for next in step(self, c) {
                queue.push_back(next);
            }
        }
        visited
    }

    /// Cells not transitively reachable (through fanin) from any primary
    /// output or memory write port. Removing them cannot change observable
    /// behavior.
    pub fn find_dead_cells(&self) -> BTreeSet<CellId> {
        let mut live: HashSet<CellId> = HashSet::new();
        let mut stack: Vec<CellId> = self.outputs.iter().map(|(_, c)| *c).collect();
        // MEMWR cells have no fanout but feed reads through memory state.
        for cell in self.live_cells() {
            if cell.op == CellOp::MemWr {
                stack.push(cell.id);
            }
        }

        while let Some(id) = stack.pop() {
            if !live.insert(id) {
                continue;
            }
            for pred in self.fanin_cells(id) {
                stack.push(pred);
            }
        }

        self.cells
            .iter()
            .filter(|(id, _)| !self.is_dead(*id) && !live.contains(id))
            .map(|(id, _)| id)
            .collect()
    }

    /// Removes all dead cells. Returns how many were removed.
    pub fn remove_dead_logic(&mut self) -> usize {
        let dead = self.find_dead_cells();
        for id in &dead {
            self.remove_cell(*id);
        }
        dead.len()
    }

    /// Detects combinational cycles: non-trivial strongly connected
    /// components of the subgraph with sequential cells removed (Tarjan's
    /// algorithm, iterative).
    pub fn combinational_cycles(&self) -> Vec<Vec<CellId>> {
        let comb: Vec<CellId> = self
            .cells
            .iter()
            .filter(|(id, c)| !self.is_dead(*id) && !c.op.is_sequential())
            .map(|(id, _)| id)
            .collect();

        let mut index: HashMap<CellId, u32> = HashMap::new();
        let mut lowlink: HashMap<CellId, u32> = HashMap::new();
        let mut on_stack: HashSet<CellId> = HashSet::new();
        let mut stack: Vec<CellId> = Vec::new();
        let mut next_index = 0u32;
        let mut sccs = Vec::new();

        // Explicit DFS frames: (cell, successor list, next successor index).
        for &root in &comb {
            if index.contains_key(&root) {
                continue;
            }
            let mut frames: Vec<(CellId, Vec<CellId>, usize)> = Vec::new();
            let succs = self.comb_successors(root);
            index.insert(root, next_index);
            lowlink.insert(root, next_index);
            next_index += 1;
            stack.push(root);
            on_stack.insert(root);
            frames.push((root, succs, 0));

            while !frames.is_empty() {
                let (cell, next) = {
                    let frame = frames.last_mut().expect("non-empty");
                    let cell = frame.0;
                    if frame.2 < frame.1.len() {
                        let succ = frame.1[frame.2];
                        frame.2 += 1;
                        (cell, Some(succ))
                    } else {
                        (cell, None)
                    }
                };

                if let Some(succ) = next {
                    if !index.contains_key(&succ) {
                        index.insert(succ, next_index);
                        lowlink.insert(succ, next_index);
                        next_index += 1;
                        stack.push(succ);
                        on_stack.insert(succ);
                        let succ_succs = self.comb_successors(succ);
                        frames.push((succ, succ_succs, 0));
                    } else if on_stack.contains(&succ) {
                        let low = lowlink[&cell].min(index[&succ]);
                        lowlink.insert(cell, low);
                    }
                } else {
                    frames.pop();
                    if let Some(parent) = frames.last() {
                        let low = lowlink[&parent.0].min(lowlink[&cell]);
                        lowlink.insert(parent.0, low);
                    }
                    if lowlink[&cell] == index[&cell] {
                        let mut scc = Vec::new();
                        loop {
                            let w = stack.pop().expect("tarjan stack underflow");
                            on_stack.remove(&w);
                            scc.push(w);
                            if w == cell {
                                break;
                            }
                        }
                        if scc.len() > 1 {
                            scc.reverse();
                            sccs.push(scc);
                        }
                    }
                }
            }
        }

        sccs
    }

    fn comb_successors(&self, id: CellId) -> Vec<CellId> {
        self.fanout_cells(id)
            .into_iter()
            .filter(|&succ| !self.cell(succ).op.is_sequential())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::PinRef;

    /// in → NOT → NOT → out
    fn inverter_chain() -> (Netlist, CellId, CellId) {
        let mut nl = Netlist::new("chain");
        let (_, in_net) = nl.add_module_input("a", 1);

        let inv1 = nl.add_cell("inv1", CellOp::Not);
        let a1 = nl.add_input_pin(inv1, "A", 1);
        let y1 = nl.add_output_pin(inv1, "Y", 1);
        nl.add_sink(in_net, a1);
        let mid = nl.add_net("mid", 1);
        nl.set_driver(mid, y1).unwrap();

        let inv2 = nl.add_cell("inv2", CellOp::Not);
        let a2 = nl.add_input_pin(inv2, "A", 1);
        let y2 = nl.add_output_pin(inv2, "Y", 1);
        nl.add_sink(mid, a2);
        let out = nl.add_net("y", 1);
        nl.set_driver(out, y2).unwrap();
        nl.add_module_output("y", 1, out);

        (nl, inv1, inv2)
    }

    #[test]
    fn fanin_fanout_one_hop() {
        let (nl, inv1, inv2) = inverter_chain();
        assert_eq!(nl.fanout_cells(inv1), vec![inv2]);
        assert_eq!(nl.fanin_cells(inv2), vec![inv1]);
    }

    #[test]
    fn topological_order_respects_edges() {
        let (nl, inv1, inv2) = inverter_chain();
        let order = nl.topological_sort();
        let pos = |id| order.iter().position(|&c| c == id).unwrap();
        assert!(pos(inv1) < pos(inv2));
        assert_eq!(order.len(), 4); // input, 2 inverters, output
    }

    #[test]
    fn cones_are_transitive() {
        let (nl, inv1, inv2) = inverter_chain();
        let cone = nl.fanout_cone(inv1);
        assert!(cone.contains(&inv1));
        assert!(cone.contains(&inv2));
        let fi = nl.fanin_cone(inv2);
        assert!(fi.contains(&inv1));
    }

    #[test]
    fn dead_cells_found_and_removed() {
        let (mut nl, _, _) = inverter_chain();
        // A cell driving nothing reachable from the outputs.
        let orphan = nl.add_cell("orphan", CellOp::And);
        nl.add_input_pin(orphan, "A", 1);
        nl.add_output_pin(orphan, "Y", 1);

        let dead = nl.find_dead_cells();
        assert!(dead.contains(&orphan));
        assert_eq!(dead.len(), 1);

        let removed = nl.remove_dead_logic();
        assert_eq!(removed, 1);
        assert!(nl.is_dead(orphan));
    }

    #[test]
    fn memwr_is_not_dead() {
        let (mut nl, _, _) = inverter_chain();
        let wr = nl.add_cell("mem_wr", CellOp::MemWr);
        nl.add_input_pin(wr, "CLK", 1);
        nl.add_input_pin(wr, "ADDR", 8);
        nl.add_input_pin(wr, "DATA", 8);
        nl.add_input_pin(wr, "EN", 1);
        assert!(!nl.find_dead_cells().contains(&wr));
    }

    #[test]
    fn acyclic_design_has_no_cycles() {
        let (nl, _, _) = inverter_chain();
        assert!(nl.combinational_cycles().is_empty());
    }

    #[test]
    fn combinational_loop_detected() {
        // Two NOT cells feeding each other.
        let mut nl = Netlist::new("loop");
        let inv1 = nl.add_cell("inv1", CellOp::Not);
        let a1 = nl.add_input_pin(inv1, "A", 1);
        let y1 = nl.add_output_pin(inv1, "Y", 1);
        let inv2 = nl.add_cell("inv2", CellOp::Not);
        let a2 = nl.add_input_pin(inv2, "A", 1);
        let y2 = nl.add_output_pin(inv2, "Y", 1);

        let n1 = nl.add_net("n1", 1);
        nl.set_driver(n1, y1).unwrap();
        nl.add_sink(n1, a2);
        let n2 = nl.add_net("n2", 1);
        nl.set_driver(n2, y2).unwrap();
        nl.add_sink(n2, a1);

        let cycles = nl.combinational_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 2);
    }

    #[test]
    fn register_feedback_is_not_a_cycle() {
        // count → ADD → DFF → count (feedback through the register).
        let mut nl = Netlist::new("counter");
        let add = nl.add_cell("add", CellOp::Add);
        let add_a = nl.add_input_pin(add, "A", 8);
        let add_y = nl.add_output_pin(add, "Y", 8);
        let dff = nl.add_cell("count_reg", CellOp::Dff);
        let d = nl.add_input_pin(dff, "D", 8);
        let q = nl.add_output_pin(dff, "Q", 8);

        let next = nl.add_net("next", 8);
        nl.set_driver(next, add_y).unwrap();
        nl.add_sink(next, d);
        let count = nl.add_net("count", 8);
        nl.set_driver(count, q).unwrap();
        nl.add_sink(count, add_a);

        assert!(nl.combinational_cycles().is_empty());
        let order = nl.topological_sort();
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn removed_cells_are_invisible_to_traversal() {
        let (mut nl, inv1, inv2) = inverter_chain();
        nl.remove_cell(inv2);
        assert!(nl.fanout_cells(inv1).is_empty());
        let _ = PinRef::new(inv2, 0); // ids stay valid after removal
    }
}
