//! Opaque ID newtypes for netlist entities.

use crate::arena::ArenaId;
use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize,
        )]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID of a cell within a netlist.
    CellId
);

define_id!(
    /// Opaque, copyable ID of a net within a netlist.
    NetId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn roundtrip_and_equality() {
        let a = CellId::from_raw(7);
        assert_eq!(a.as_raw(), 7);
        assert_eq!(a, CellId::from_raw(7));
        assert_ne!(a, CellId::from_raw(8));
    }

    #[test]
    fn ordered_for_deterministic_sets() {
        let mut set = BTreeSet::new();
        set.insert(NetId::from_raw(3));
        set.insert(NetId::from_raw(1));
        let order: Vec<u32> = set.iter().map(|n| n.as_raw()).collect();
        assert_eq!(order, vec![1, 3]);
    }

    #[test]
    fn serde_roundtrip() {
        let id = NetId::from_raw(99);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(id, serde_json::from_str::<NetId>(&json).unwrap());
    }
}
