// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `garbage_collection`: compacts every registry in place, swapping
//! tombstoned rows to the tail, then rewrites every connectivity field
//! through the old-to-new handle map the compaction produced.
//!
//! Edges and halfedges are compacted in lockstep (`edge = h >> 1`): a swap of
//! edge rows `i`/`j` swaps halfedge rows `2i`/`2j` and `2i+1`/`2j+1`, which is
//! what keeps the `opposite(h) = h XOR 1` pairing intact through compaction.

use crate::mesh::connectivity::MeshConnectivity;
use crate::mesh::handle::{EdgeHandle, FaceHandle, HalfedgeHandle, VertexHandle};

impl MeshConnectivity {
    pub fn garbage_collection(&mut self) {
        if !self.has_garbage() {
            return;
        }
        tracing::debug!(
            deleted_vertices = self.deleted_vertex_count,
            deleted_edges = self.deleted_edge_count,
            deleted_faces = self.deleted_face_count,
            "garbage_collection: compacting mesh"
        );

        let n_v = self.vertex_registry().size();
        let mut v_deleted: Vec<bool> =
            (0..n_v).map(|i| self.vertex_deleted(VertexHandle::new(i as u32))).collect();
        let (v_new_to_old, v_new_count) = compact(n_v, &mut v_deleted, |i, j| {
            self.vertex_registry_mut().swap(i, j);
        });

        let n_e = self.edge_registry().size();
        let mut e_deleted: Vec<bool> =
            (0..n_e).map(|i| self.edge_deleted(EdgeHandle::new(i as u32))).collect();
        let (e_new_to_old, e_new_count) = compact(n_e, &mut e_deleted, |i, j| {
            self.edge_registry_mut().swap(i, j);
            self.halfedge_registry_mut().swap(2 * i, 2 * j);
            self.halfedge_registry_mut().swap(2 * i + 1, 2 * j + 1);
        });

        let n_f = self.face_registry().size();
        let mut f_deleted: Vec<bool> =
            (0..n_f).map(|i| self.face_deleted(FaceHandle::new(i as u32))).collect();
        let (f_new_to_old, f_new_count) = compact(n_f, &mut f_deleted, |i, j| {
            self.face_registry_mut().swap(i, j);
        });

        let v_old_to_new = invert(&v_new_to_old, n_v);
        let e_old_to_new = invert(&e_new_to_old, n_e);
        let f_old_to_new = invert(&f_new_to_old, n_f);

        let remap_v = |old: VertexHandle| -> VertexHandle {
            if old.is_valid() {
                VertexHandle::new(v_old_to_new[old.index()])
            } else {
                VertexHandle::INVALID
            }
        };
        let remap_f = |old: FaceHandle| -> FaceHandle {
            if old.is_valid() {
                FaceHandle::new(f_old_to_new[old.index()])
            } else {
                FaceHandle::INVALID
            }
        };
        let remap_h = |old: HalfedgeHandle| -> HalfedgeHandle {
            if old.is_valid() {
                let old_edge = (old.0 >> 1) as usize;
                let parity = old.0 & 1;
                HalfedgeHandle::new((e_old_to_new[old_edge] << 1) | parity)
            } else {
                HalfedgeHandle::INVALID
            }
        };

        for i in 0..v_new_count {
            let v = VertexHandle::new(i as u32);
            let h = self.halfedge_of_vertex(v);
            self.set_halfedge_of_vertex(v, remap_h(h));
        }
        for i in 0..(e_new_count * 2) {
            let h = HalfedgeHandle::new(i as u32);
            let to = self.to_vertex(h);
            self.set_to_vertex(h, remap_v(to));
            let next = self.next(h);
            self.set_next_raw(h, remap_h(next));
            let prev = self.prev(h);
            self.set_prev_raw(h, remap_h(prev));
            if let Some(f) = self.face(h) {
                self.set_face(h, Some(remap_f(f)));
            }
        }
        for i in 0..f_new_count {
            let f = FaceHandle::new(i as u32);
            let h = self.halfedge_of_face(f);
            self.set_halfedge_of_face(f, remap_h(h));
        }

        self.vertex_registry_mut().truncate(v_new_count);
        self.edge_registry_mut().truncate(e_new_count);
        self.halfedge_registry_mut().truncate(e_new_count * 2);
        self.face_registry_mut().truncate(f_new_count);
        self.vertex_registry_mut().shrink_to_fit();
        self.halfedge_registry_mut().shrink_to_fit();
        self.edge_registry_mut().shrink_to_fit();
        self.face_registry_mut().shrink_to_fit();

        self.deleted_vertex_count = 0;
        self.deleted_edge_count = 0;
        self.deleted_face_count = 0;
        self.has_garbage = false;

        if let Err(err) = self.validate_compacted() {
            tracing::error!(%err, "garbage_collection produced an inconsistent mesh");
            debug_assert!(false, "{err}");
        }
    }

    /// Sanity-checks the `opposite(h) = h XOR 1` / `edge(h) = h >> 1` pairing
    /// across every surviving halfedge once compaction has finished. Internal
    /// plumbing only, phrased the way the teacher's own `compact_mesh`
    /// post-pass is: private, `anyhow::Result`-returning, never surfaced
    /// through the public `Option`/`bool` contract.
    fn validate_compacted(&self) -> anyhow::Result<()> {
        for h in self.iter_halfedges() {
            let opp = self.opposite(h);
            if self.opposite(opp) != h {
                anyhow::bail!("halfedge {h:?} is not its own opposite's opposite after gc");
            }
            if self.edge(h) != self.edge(opp) {
                anyhow::bail!("halfedge {h:?} and its opposite disagree on their edge after gc");
            }
        }
        Ok(())
    }
}

/// Two-pointer tombstone compaction (the classic "swap deleted rows to the
/// tail" sweep): `swap_rows(i, j)` is called exactly when rows `i` and `j`
/// trade places, keeping `deleted` and the returned permutation in lockstep.
/// Returns `(new_to_old, new_count)` where `new_to_old[k]` is the original
/// index of the row now occupying position `k`.
fn compact(n: usize, deleted: &mut [bool], mut swap_rows: impl FnMut(usize, usize)) -> (Vec<u32>, usize) {
    let mut new_to_old: Vec<u32> = (0..n as u32).collect();
    if n == 0 {
        return (new_to_old, 0);
    }
    let mut i = 0usize;
    let mut j = n - 1;
    loop {
        while i < j && !deleted[i] {
            i += 1;
        }
        while i < j && deleted[j] {
            j -= 1;
        }
        if i >= j {
            break;
        }
        swap_rows(i, j);
        deleted.swap(i, j);
        new_to_old.swap(i, j);
    }
    let new_count = if deleted[i] { i } else { i + 1 };
    (new_to_old, new_count)
}

/// Inverts a `new_to_old` permutation into `old_to_new`, sized to the
/// pre-compaction row count. Entries for rows that didn't survive are never
/// read (nothing live can still reference a deleted row).
fn invert(new_to_old: &[u32], old_count: usize) -> Vec<u32> {
    let mut old_to_new = vec![0u32; old_count];
    for (new_idx, &old_idx) in new_to_old.iter().enumerate() {
        old_to_new[old_idx as usize] = new_idx as u32;
    }
    old_to_new
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn gc_is_noop_without_tombstones() {
        let mut m = MeshConnectivity::new();
        let a = m.add_vertex(Some(Vec3::ZERO));
        let b = m.add_vertex(Some(Vec3::X));
        let c = m.add_vertex(Some(Vec3::Y));
        m.add_triangle(a, b, c).unwrap();
        m.garbage_collection();
        assert_eq!(m.num_vertices(), 3);
        assert_eq!(m.num_faces(), 1);
    }

    #[test]
    fn gc_compacts_after_deleting_a_face() {
        let mut m = MeshConnectivity::new();
        let a = m.add_vertex(Some(Vec3::ZERO));
        let b = m.add_vertex(Some(Vec3::X));
        let c = m.add_vertex(Some(Vec3::Y));
        let d = m.add_vertex(Some(Vec3::Z));
        m.add_triangle(a, b, c).unwrap();
        m.add_triangle(a, c, d).unwrap();
        m.add_triangle(a, d, b).unwrap();
        m.add_triangle(b, d, c).unwrap();
        let e = m.find_halfedge(a, b).unwrap().edge();
        m.collapse(e, Vec3::new(0.5, 0.0, 0.0)).unwrap();
        assert!(m.has_garbage());

        let before_valence_a = m.valence(a);
        m.garbage_collection();
        assert!(!m.has_garbage());
        assert_eq!(m.num_vertices(), 3);
        assert_eq!(m.vertex_capacity(), 3);
        assert_eq!(m.num_faces(), 2);
        assert_eq!(m.num_edges(), 3);
        assert_eq!(m.valence(a), before_valence_a);

        for h in m.iter_halfedges() {
            assert_eq!(m.opposite(m.opposite(h)), h);
            assert_eq!(m.edge(h), EdgeHandle::new(h.0 >> 1));
        }
        for f in m.iter_faces() {
            let hs = m.face_halfedges(f).unwrap();
            for h in &hs {
                assert_eq!(m.face(*h), Some(f));
            }
        }
    }

    #[test]
    fn gc_queries_agree_with_pre_gc_topology() {
        let mut m = MeshConnectivity::new();
        let a = m.add_vertex(Some(Vec3::ZERO));
        let b = m.add_vertex(Some(Vec3::X));
        let c = m.add_vertex(Some(Vec3::Y));
        m.add_triangle(a, b, c).unwrap();
        let f = m.find_halfedge(a, b).unwrap().edge().halfedge(0);
        let f = m.face(f).unwrap();
        m.delete_face(f);

        m.garbage_collection();
        // a, b, c all survive (vertices aren't deleted by delete_face).
        assert_eq!(m.num_vertices(), 3);
        assert_eq!(m.num_faces(), 0);
    }
}
