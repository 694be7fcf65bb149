// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A geometry processing kernel: a property-backed halfedge mesh with full
//! topological editing, a discrete exterior calculus operator assembly with
//! a Jacobi-preconditioned conjugate-gradient solver, a quickhull convex-hull
//! builder, and a loose-octree spatial index.
//!
//! Module layout mirrors the dependency order leaves-first:
//! [`property`] (C1) underlies [`mesh`] (C4); [`shapes`] (C2) underlies
//! [`octree`] (C3); [`mesh`] feeds [`dec`] (C5) and [`hull`] (C6) can
//! optionally emit a [`mesh::MeshConnectivity`].

pub mod dec;
pub mod error;
pub mod hull;
pub mod mesh;
pub mod octree;
pub mod property;
pub mod shapes;
pub(crate) mod sync;
pub(crate) mod util;

pub use error::{GeoError, Result};
