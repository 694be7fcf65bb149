// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 32-bit tagged-integer handles. Never pointers: garbage collection
//! physically moves rows, and property columns may reallocate on growth, so
//! nothing may hold a reference that survives a structural mutation.

macro_rules! def_handle {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            pub const INVALID: Self = Self(u32::MAX);

            pub fn new(index: u32) -> Self {
                Self(index)
            }

            pub fn is_valid(self) -> bool {
                self.0 != u32::MAX
            }

            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                if self.is_valid() {
                    write!(f, concat!(stringify!($name), "({})"), self.0)
                } else {
                    write!(f, concat!(stringify!($name), "(INVALID)"))
                }
            }
        }

        impl From<$name> for usize {
            fn from(h: $name) -> usize {
                h.0 as usize
            }
        }
    };
}

def_handle!(VertexHandle, "Identifies a vertex row.");
def_handle!(HalfedgeHandle, "Identifies a halfedge row. `opposite(h) = h XOR 1`.");
def_handle!(EdgeHandle, "Identifies an edge row. `edge(h) = h >> 1`.");
def_handle!(FaceHandle, "Identifies a face row.");

impl HalfedgeHandle {
    /// `opposite(h) = h XOR 1`.
    pub fn opposite(self) -> HalfedgeHandle {
        debug_assert!(self.is_valid());
        HalfedgeHandle(self.0 ^ 1)
    }

    /// `edge(h) = h >> 1`.
    pub fn edge(self) -> EdgeHandle {
        debug_assert!(self.is_valid());
        EdgeHandle(self.0 >> 1)
    }

    /// True if this is the even (canonical) halfedge of its edge.
    pub fn is_canonical(self) -> bool {
        self.0 & 1 == 0
    }
}

impl EdgeHandle {
    /// The `i`-th (0 or 1) halfedge of this edge.
    pub fn halfedge(self, i: u32) -> HalfedgeHandle {
        debug_assert!(i < 2);
        HalfedgeHandle((self.0 << 1) | i)
    }

    /// The canonical (even) halfedge of this edge.
    pub fn canonical_halfedge(self) -> HalfedgeHandle {
        self.halfedge(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_is_involution() {
        let h = HalfedgeHandle(4);
        assert_eq!(h.opposite().opposite(), h);
    }

    #[test]
    fn edge_from_either_halfedge_agrees() {
        let h0 = HalfedgeHandle(6);
        let h1 = h0.opposite();
        assert_eq!(h0.edge(), h1.edge());
        assert_eq!(h0.edge(), EdgeHandle(3));
    }

    #[test]
    fn invalid_sentinel() {
        assert!(!VertexHandle::INVALID.is_valid());
        assert!(VertexHandle::new(0).is_valid());
    }
}
