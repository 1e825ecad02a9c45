//! Attribute values attached to cells.

use serde::{Deserialize, Serialize};
use silica_common::LogicVec;
use std::fmt;

/// A cell attribute value.
///
/// Attributes record facts the cell op alone does not carry: a `CONST`
/// cell's value, a `SLICE` cell's selected range, a memory cell's name and
/// depth, a `DFF`'s initial value. They live in a `BTreeMap` so serialized
/// netlists are byte-stable.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum AttrValue {
    /// An integer attribute.
    Int(i64),
    /// A string attribute.
    Str(String),
    /// A bit-pattern attribute (carries `x`/`z`).
    Bits(LogicVec),
}

impl AttrValue {
    /// The integer value, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The string value, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Int(v) => write!(f, "{v}"),
            AttrValue::Str(s) => write!(f, "{s}"),
            AttrValue::Bits(b) => write!(f, "{b}"),
        }
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<u32> for AttrValue {
    fn from(v: u32) -> Self {
        AttrValue::Int(v as i64)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Str(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Str(v)
    }
}

impl From<LogicVec> for AttrValue {
    fn from(v: LogicVec) -> Self {
        AttrValue::Bits(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        assert_eq!(AttrValue::Int(42).as_int(), Some(42));
        assert_eq!(AttrValue::Str("mem".into()).as_str(), Some("mem"));
        assert_eq!(AttrValue::Int(1).as_str(), None);
    }

    #[test]
    fn conversions() {
        assert_eq!(AttrValue::from(8u32), AttrValue::Int(8));
        assert_eq!(AttrValue::from("x"), AttrValue::Str("x".into()));
    }
}
