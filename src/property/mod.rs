// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! C1: the property arena.
//!
//! A [`PropertyRegistry`] is an ordered collection of named, typed, parallel
//! columns, all sharing one logical row count (`size()`). Every connectivity
//! store in [`crate::mesh`] is built on top of one registry per entity kind,
//! grouped together by a [`PropertySet`].
//!
//! This is the generalized, Lua-free, slotmap-free descendant of the
//! teacher's `mesh::halfedge::channels` module: the same named/typed-column
//! shape, but backed by dense `Vec<T>`s indexed by plain row offsets instead
//! of a `SecondaryMap` over generational keys, because garbage collection
//! here physically compacts rows rather than relying on key invalidation.

use std::any::{Any, TypeId};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::rc::Rc;

/// Values storable in a property column. `Default` supplies the per-row
/// value used by `resize`/`push_back`; `Clone` is needed to fan that default
/// out across rows.
pub trait PropertyValue: Clone + Default + 'static {}
impl<T: Clone + Default + 'static> PropertyValue for T {}

/// A single named column: `size()` elements of type `T`, all initialized to
/// `default` when grown.
#[derive(Debug, Clone)]
pub struct Column<T> {
    data: Vec<T>,
    default: T,
}

impl<T: PropertyValue> Column<T> {
    fn new(default: T) -> Self {
        Self {
            data: Vec::new(),
            default,
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }
}

impl<T, Idx> std::ops::Index<Idx> for Column<T>
where
    Idx: Into<usize>,
{
    type Output = T;
    fn index(&self, index: Idx) -> &T {
        &self.data[index.into()]
    }
}

impl<T, Idx> std::ops::IndexMut<Idx> for Column<T>
where
    Idx: Into<usize>,
{
    fn index_mut(&mut self, index: Idx) -> &mut T {
        &mut self.data[index.into()]
    }
}

/// A typed, stable identifier for one column. Carries no borrow; re-fetch a
/// [`Property`] view through the registry whenever you need to read/write.
pub struct PropertyId<T> {
    slot: usize,
    _marker: PhantomData<fn() -> T>,
}

// Manual impls: `#[derive]` would require `T: Copy`/`T: Eq` etc. because of
// the (phantom, zero-size) type parameter.
impl<T> Clone for PropertyId<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for PropertyId<T> {}
impl<T> PartialEq for PropertyId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
    }
}
impl<T> Eq for PropertyId<T> {}
impl<T> std::fmt::Debug for PropertyId<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PropertyId({})", self.slot)
    }
}

/// A typed, cloneable handle onto one column's storage. Obtained from
/// [`PropertyRegistry::property`]; reading/writing borrows the underlying
/// `RefCell` dynamically, so overlapping a read view with a structural
/// mutation panics rather than silently aliasing.
pub struct Property<T> {
    inner: Rc<RefCell<Column<T>>>,
}

impl<T: PropertyValue> Property<T> {
    pub fn read(&self) -> Ref<'_, Column<T>> {
        self.inner.borrow()
    }

    pub fn write(&self) -> RefMut<'_, Column<T>> {
        self.inner.borrow_mut()
    }
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Type-erased column operations the registry needs to perform uniformly
/// across heterogeneous column types: resize, swap, shrink, etc.
trait AnyColumn: Any {
    fn as_any(&self) -> &dyn Any;
    fn len(&self) -> usize;
    fn resize(&self, n: usize);
    fn push_back(&self);
    fn swap_rows(&self, i: usize, j: usize);
    fn truncate(&self, n: usize);
    fn shrink_to_fit(&self);
    fn type_name(&self) -> &'static str;
}

impl<T: PropertyValue> AnyColumn for Rc<RefCell<Column<T>>> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn len(&self) -> usize {
        self.borrow().data.len()
    }

    fn resize(&self, n: usize) {
        let mut col = self.borrow_mut();
        let default = col.default.clone();
        col.data.resize(n, default);
    }

    fn push_back(&self) {
        let mut col = self.borrow_mut();
        let default = col.default.clone();
        col.data.push(default);
    }

    fn swap_rows(&self, i: usize, j: usize) {
        self.borrow_mut().data.swap(i, j);
    }

    fn truncate(&self, n: usize) {
        self.borrow_mut().data.truncate(n);
    }

    fn shrink_to_fit(&self) {
        self.borrow_mut().data.shrink_to_fit();
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

struct ColumnSlot {
    name: String,
    type_id: TypeId,
    column: Box<dyn AnyColumn>,
}

/// An ordered collection of typed, named, parallel columns sharing one
/// logical row count.
pub struct PropertyRegistry {
    size: usize,
    slots: Vec<Option<ColumnSlot>>,
    name_to_slot: HashMap<String, usize>,
}

impl Default for PropertyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyRegistry {
    pub fn new() -> Self {
        Self {
            size: 0,
            slots: Vec::new(),
            name_to_slot: HashMap::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Registers a new column. Fails if `name` is already taken.
    pub fn add<T: PropertyValue>(&mut self, name: &str, default: T) -> Option<PropertyId<T>> {
        if self.name_to_slot.contains_key(name) {
            return None;
        }
        let column: Rc<RefCell<Column<T>>> = Rc::new(RefCell::new(Column::new(default)));
        column.resize(self.size);
        let slot_index = self.slots.len();
        self.slots.push(Some(ColumnSlot {
            name: name.to_string(),
            type_id: TypeId::of::<T>(),
            column: Box::new(column),
        }));
        self.name_to_slot.insert(name.to_string(), slot_index);
        Some(PropertyId {
            slot: slot_index,
            _marker: PhantomData,
        })
    }

    /// Looks up a column by name, yielding `None` if missing or if the
    /// stored type doesn't match `T`.
    pub fn get<T: PropertyValue>(&self, name: &str) -> Option<Property<T>> {
        let slot_index = *self.name_to_slot.get(name)?;
        self.property_at::<T>(slot_index)
    }

    pub fn get_by_id<T: PropertyValue>(&self, id: PropertyId<T>) -> Option<Property<T>> {
        self.property_at::<T>(id.slot)
    }

    fn property_at<T: PropertyValue>(&self, slot_index: usize) -> Option<Property<T>> {
        let slot = self.slots.get(slot_index)?.as_ref()?;
        if slot.type_id != TypeId::of::<T>() {
            return None;
        }
        let rc = slot
            .column
            .as_any()
            .downcast_ref::<Rc<RefCell<Column<T>>>>()
            .expect("type_id matched but downcast failed")
            .clone();
        Some(Property { inner: rc })
    }

    /// Idempotent `add`: returns the existing column if the name is
    /// present and its type matches. A name collision with a *different*
    /// type is a programming error — see open question in `SPEC_FULL.md`
    /// §9 — so in debug builds this panics; in release it returns `None`.
    pub fn get_or_add<T: PropertyValue>(&mut self, name: &str, default: T) -> Option<PropertyId<T>> {
        if let Some(&slot_index) = self.name_to_slot.get(name) {
            let slot = self.slots[slot_index].as_ref().expect("slot removed but indexed");
            if slot.type_id == TypeId::of::<T>() {
                return Some(PropertyId {
                    slot: slot_index,
                    _marker: PhantomData,
                });
            }
            debug_assert!(
                false,
                "get_or_add: column {name:?} exists with a different type (expected {}, found {})",
                std::any::type_name::<T>(),
                slot.column.type_name(),
            );
            return None;
        }
        self.add(name, default)
    }

    /// Drops a column. Subsequent `get` by that name is `None`.
    pub fn remove<T>(&mut self, id: PropertyId<T>) {
        if let Some(slot) = self.slots.get_mut(id.slot) {
            if let Some(entry) = slot.take() {
                self.name_to_slot.remove(&entry.name);
            }
        }
    }

    pub fn remove_by_name(&mut self, name: &str) {
        if let Some(slot_index) = self.name_to_slot.remove(name) {
            self.slots[slot_index] = None;
        }
    }

    /// Grows every column to `n` rows, filling new rows with each column's
    /// default. Never shrinks (use `truncate` for that, invoked internally
    /// by garbage collection).
    pub fn resize(&mut self, n: usize) {
        if n <= self.size {
            return;
        }
        for slot in self.slots.iter().flatten() {
            slot.column.resize(n);
        }
        self.size = n;
    }

    /// Shrinks every column down to exactly `n` rows. Used by garbage
    /// collection after compaction; callers must ensure `n <= size()`.
    pub fn truncate(&mut self, n: usize) {
        debug_assert!(n <= self.size);
        for slot in self.slots.iter().flatten() {
            slot.column.truncate(n);
        }
        self.size = n;
    }

    /// Appends one default-initialized row across every column, returning
    /// its index.
    pub fn push_back(&mut self) -> usize {
        for slot in self.slots.iter().flatten() {
            slot.column.push_back();
        }
        let row = self.size;
        self.size += 1;
        row
    }

    /// Swaps row `i` and row `j` across every column.
    pub fn swap(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        for slot in self.slots.iter().flatten() {
            slot.column.swap_rows(i, j);
        }
    }

    pub fn shrink_to_fit(&mut self) {
        for slot in self.slots.iter().flatten() {
            slot.column.shrink_to_fit();
        }
    }
}

/// Which entity kind a registry inside a [`PropertySet`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Vertices,
    Halfedges,
    Edges,
    Faces,
    Nodes,
}

/// Five distinct [`PropertyRegistry`]s, one per entity kind. [`crate::mesh`]
/// uses `vertices`/`halfedges`/`edges`/`faces`; [`crate::octree`] uses
/// `nodes`. Each subsystem only ever touches the registries it owns.
#[derive(Default)]
pub struct PropertySet {
    pub vertices: PropertyRegistry,
    pub halfedges: PropertyRegistry,
    pub edges: PropertyRegistry,
    pub faces: PropertyRegistry,
    pub nodes: PropertyRegistry,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self, kind: EntityKind) -> &PropertyRegistry {
        match kind {
            EntityKind::Vertices => &self.vertices,
            EntityKind::Halfedges => &self.halfedges,
            EntityKind::Edges => &self.edges,
            EntityKind::Faces => &self.faces,
            EntityKind::Nodes => &self.nodes,
        }
    }

    pub fn registry_mut(&mut self, kind: EntityKind) -> &mut PropertyRegistry {
        match kind {
            EntityKind::Vertices => &mut self.vertices,
            EntityKind::Halfedges => &mut self.halfedges,
            EntityKind::Edges => &mut self.edges,
            EntityKind::Faces => &mut self.faces,
            EntityKind::Nodes => &mut self.nodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_get_roundtrip() {
        let mut reg = PropertyRegistry::new();
        reg.resize(3);
        let id = reg.add::<f32>("weight", 1.0).unwrap();
        let prop = reg.get_by_id(id).unwrap();
        assert_eq!(prop.read().as_slice(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn add_duplicate_name_fails() {
        let mut reg = PropertyRegistry::new();
        reg.add::<f32>("x", 0.0).unwrap();
        assert!(reg.add::<f32>("x", 0.0).is_none());
    }

    #[test]
    fn get_wrong_type_is_absent() {
        let mut reg = PropertyRegistry::new();
        reg.add::<f32>("x", 0.0).unwrap();
        assert!(reg.get::<i32>("x").is_none());
    }

    #[test]
    fn get_or_add_is_idempotent() {
        let mut reg = PropertyRegistry::new();
        let a = reg.get_or_add::<f32>("w", 1.0).unwrap();
        let b = reg.get_or_add::<f32>("w", 1.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn resize_fills_default_and_never_shrinks() {
        let mut reg = PropertyRegistry::new();
        let id = reg.add::<i32>("v", 7).unwrap();
        reg.resize(3);
        reg.resize(1);
        assert_eq!(reg.size(), 3);
        let prop = reg.get_by_id(id).unwrap();
        assert_eq!(prop.read().len(), 3);
    }

    #[test]
    fn push_back_grows_all_columns() {
        let mut reg = PropertyRegistry::new();
        let a = reg.add::<i32>("a", 0).unwrap();
        let b = reg.add::<f32>("b", 0.5).unwrap();
        let row = reg.push_back();
        assert_eq!(row, 0);
        assert_eq!(reg.get_by_id(a).unwrap().read().len(), 1);
        assert_eq!(reg.get_by_id(b).unwrap().read().as_slice(), &[0.5]);
    }

    #[test]
    fn swap_touches_every_column() {
        let mut reg = PropertyRegistry::new();
        let a = reg.add::<i32>("a", 0).unwrap();
        reg.resize(2);
        {
            let prop = reg.get_by_id(a).unwrap();
            prop.write().as_mut_slice()[0] = 10;
            prop.write().as_mut_slice()[1] = 20;
        }
        reg.swap(0, 1);
        let prop = reg.get_by_id(a).unwrap();
        assert_eq!(prop.read().as_slice(), &[20, 10]);
    }

    #[test]
    fn remove_drops_column() {
        let mut reg = PropertyRegistry::new();
        let id = reg.add::<i32>("a", 0).unwrap();
        reg.remove(id);
        assert!(reg.get::<i32>("a").is_none());
    }

    #[test]
    fn truncate_shrinks_every_column() {
        let mut reg = PropertyRegistry::new();
        let id = reg.add::<i32>("a", 0).unwrap();
        reg.resize(5);
        reg.truncate(2);
        assert_eq!(reg.size(), 2);
        assert_eq!(reg.get_by_id(id).unwrap().read().len(), 2);
    }
}
