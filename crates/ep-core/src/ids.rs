//! Strongly typed, zero-cost identifier wrappers.
//!
//! `CenterId` and `EdgeId` are dense indices into the network's CSR arrays
//! and are only meaningful for the `NetworkGraph` that issued them.  They are
//! never persisted: path nodes store center codes and connection indices,
//! which survive a network reload.  `NodeId` is the store-assigned identity of
//! a path node and is strictly increasing in creation order.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[derive(serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID".
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// Index of a center (graph vertex) in a `NetworkGraph`.
    pub struct CenterId(u32);
}

typed_id! {
    /// Index of a connection (directed graph edge) in CSR order.
    pub struct EdgeId(u32);
}

typed_id! {
    /// Store-assigned identity of a path node.
    pub struct NodeId(u64);
}

impl NodeId {
    /// The id following `self` in allocation order.
    #[inline]
    pub fn next(self) -> NodeId {
        NodeId(self.0 + 1)
    }
}
