// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Custom per-entity properties. Callers attach their own named columns to
//! any of the mesh's four registries the same way the built-in `v:point`,
//! `h:connectivity`, etc. columns are stored — generalizing the teacher's
//! `HalfEdgeMesh::{add,remove}_channel` (`mesh::halfedge::channels.rs`) from a
//! fixed Lua-facing channel set to arbitrary `T: PropertyValue` columns.

use crate::mesh::connectivity::MeshConnectivity;
use crate::property::{Property, PropertyId, PropertyValue};

impl MeshConnectivity {
    pub fn get_or_add_vertex_property<T: PropertyValue>(&mut self, name: &str, default: T) -> Option<PropertyId<T>> {
        self.vertex_registry_mut().get_or_add(name, default)
    }
    pub fn get_vertex_property<T: PropertyValue>(&self, name: &str) -> Option<Property<T>> {
        self.vertex_registry().get(name)
    }
    pub fn remove_vertex_property<T>(&mut self, id: PropertyId<T>) {
        self.vertex_registry_mut().remove(id);
    }

    pub fn get_or_add_halfedge_property<T: PropertyValue>(
        &mut self,
        name: &str,
        default: T,
    ) -> Option<PropertyId<T>> {
        self.halfedge_registry_mut().get_or_add(name, default)
    }
    pub fn get_halfedge_property<T: PropertyValue>(&self, name: &str) -> Option<Property<T>> {
        self.halfedge_registry().get(name)
    }
    pub fn remove_halfedge_property<T>(&mut self, id: PropertyId<T>) {
        self.halfedge_registry_mut().remove(id);
    }

    pub fn get_or_add_edge_property<T: PropertyValue>(&mut self, name: &str, default: T) -> Option<PropertyId<T>> {
        self.edge_registry_mut().get_or_add(name, default)
    }
    pub fn get_edge_property<T: PropertyValue>(&self, name: &str) -> Option<Property<T>> {
        self.edge_registry().get(name)
    }
    pub fn remove_edge_property<T>(&mut self, id: PropertyId<T>) {
        self.edge_registry_mut().remove(id);
    }

    pub fn get_or_add_face_property<T: PropertyValue>(&mut self, name: &str, default: T) -> Option<PropertyId<T>> {
        self.face_registry_mut().get_or_add(name, default)
    }
    pub fn get_face_property<T: PropertyValue>(&self, name: &str) -> Option<Property<T>> {
        self.face_registry().get(name)
    }
    pub fn remove_face_property<T>(&mut self, id: PropertyId<T>) {
        self.face_registry_mut().remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn custom_vertex_property_survives_growth() {
        let mut m = MeshConnectivity::new();
        let id = m.get_or_add_vertex_property::<f32>("v:curvature", 0.0).unwrap();
        let a = m.add_vertex(Some(Vec3::ZERO));
        let prop = m.get_vertex_property::<f32>("v:curvature").unwrap();
        prop.write().as_mut_slice()[a.index()] = 2.5;
        assert_eq!(prop.read()[a], 2.5);
        m.remove_vertex_property(id);
        assert!(m.get_vertex_property::<f32>("v:curvature").is_none());
    }

    #[test]
    fn get_or_add_is_idempotent_across_mesh_calls() {
        let mut m = MeshConnectivity::new();
        let a = m.get_or_add_face_property::<i32>("f:group", -1).unwrap();
        let b = m.get_or_add_face_property::<i32>("f:group", -1).unwrap();
        assert_eq!(a, b);
    }
}
