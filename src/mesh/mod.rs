// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! C4: the property-backed halfedge mesh.
//!
//! [`MeshConnectivity`] is the public mesh type: four [`crate::property::PropertyRegistry`]s
//! (vertices, halfedges, edges, faces) plus the built-in columns every mesh
//! needs (`connectivity.rs`), the Euler operators that mutate them
//! (`euler_ops.rs`), tombstone compaction (`garbage_collection.rs`), and
//! custom per-entity properties (`properties.rs`).

pub mod connectivity;
mod euler_ops;
mod garbage_collection;
pub mod handle;
mod properties;

pub use connectivity::MeshConnectivity;
pub use handle::{EdgeHandle, FaceHandle, HalfedgeHandle, VertexHandle};
