// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interior mutability primitives used across the crate.
//!
//! By default this crate is single-threaded and uses `Rc`/`RefCell`. Enabling
//! the `sync` feature swaps in `Arc`/`AtomicRefCell` so a mesh, octree, or
//! operator bundle can be moved to another thread; the "exclusive access per
//! call" contract in the concurrency model is unchanged either way.

#[cfg(not(feature = "sync"))]
mod imp {
    use std::cell::{Ref, RefCell, RefMut};
    use std::rc::Rc;

    pub type RefCounted<T> = Rc<T>;
    pub type InteriorMutable<T> = RefCell<T>;
    pub type BorrowedRef<'a, T> = Ref<'a, T>;
    pub type MutableRef<'a, T> = RefMut<'a, T>;
}

#[cfg(feature = "sync")]
mod imp {
    use atomic_refcell::{AtomicRef, AtomicRefCell, AtomicRefMut};
    use std::sync::Arc;

    pub type RefCounted<T> = Arc<T>;
    pub type InteriorMutable<T> = AtomicRefCell<T>;
    pub type BorrowedRef<'a, T> = AtomicRef<'a, T>;
    pub type MutableRef<'a, T> = AtomicRefMut<'a, T>;
}

pub use imp::*;

/// Marker trait requiring `Send + Sync` only when the `sync` feature is on.
#[cfg(not(feature = "sync"))]
pub trait MaybeSync {}
#[cfg(not(feature = "sync"))]
impl<T> MaybeSync for T {}

#[cfg(feature = "sync")]
pub trait MaybeSync: Send + Sync + 'static {}
#[cfg(feature = "sync")]
impl<T: Send + Sync + 'static> MaybeSync for T {}

#[cfg(feature = "sync")]
#[allow(dead_code)]
fn is_sync<T: Send + Sync>() {}
