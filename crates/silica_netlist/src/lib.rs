//! The Silica gate-level netlist.
//!
//! A [`Netlist`] is a directed hypergraph: [`Cell`]s perform primitive
//! operations, [`Net`]s connect one driver [`Pin`] to any number of sinks.
//! Cells and nets live in append-only [`Arena`]s keyed by opaque IDs, and
//! pins refer to their cell and net by ID, so sequential feedback loops live
//! in ID space rather than in ownership. ID counters are scoped to the
//! netlist, which makes elaboration deterministic run-to-run.
//!
//! Graph utilities (topological sort, fanin/fanout cones, dead-cell removal,
//! combinational-cycle detection) live in [`graph`]; BLIF export in [`blif`].

#![warn(missing_docs)]

pub mod arena;
pub mod attr;
pub mod blif;
pub mod cell;
pub mod graph;
pub mod ids;
pub mod net;
pub mod netlist;

pub use arena::{Arena, ArenaId};
pub use attr::AttrValue;
pub use cell::{Cell, CellOp, Pin, PortDir};
pub use ids::{CellId, NetId};
pub use net::{Net, PinRef};
pub use netlist::{Netlist, NetlistError};
