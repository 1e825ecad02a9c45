//! Shared foundational types used across the Silica Verilog front-end.
//!
//! This crate provides interned identifiers, 4-state logic values, and packed
//! logic vectors. Everything downstream — tokens, AST, netlist — builds on
//! these.

#![warn(missing_docs)]

pub mod ident;
pub mod logic;
pub mod logic_vec;

pub use ident::{Ident, Interner};
pub use logic::Logic;
pub use logic_vec::LogicVec;
