// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! C3: the loose octree.
//!
//! Grounded in shape on `voxel_plugin::octree` (the reference pack's own
//! octree, `api-haus-bevy_voxel_world/crates/voxel_plugin/src/octree/`) for
//! the node/child-mask/contiguous-children layout, but that octree indexes a
//! sparse voxel LOD grid by implicit coordinates, whereas this one is an
//! *element* index over arbitrary [`crate::shapes::Aabb`]s with the loose
//! straddler/descended-element partitioning the spec calls for — closer in
//! spirit to a bounding-volume hierarchy than a voxel grid. Children of an
//! internal node are always stored contiguously starting at
//! `base_child_index`, and every node's `[first_element, first_element +
//! num_elements)` range already holds every element under that subtree
//! (straddlers first, then each child's run in order) — which is what makes
//! the "query fully contains this node" fast path in `query_aabb`/
//! `query_sphere` a plain slice copy instead of a subtree walk.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use float_ord::FloatOrd;
use glam::Vec3;

use crate::shapes::{Aabb, Ray, Sphere};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitPoint {
    Center,
    Mean,
    Median,
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct SplitPolicy {
    pub split_point: SplitPoint,
    pub tight_children: bool,
    /// Padding applied when shrinking a tight child's AABB to its elements'
    /// union, and the minimum clamp margin keeping a split plane off an
    /// element's exact coordinate. `0.0` uses a small built-in default margin
    /// for the latter (an exact `0.0` margin would let an element sit exactly
    /// on a split plane, which the point/AABB partitioning rule can't classify).
    pub epsilon: f32,
}

impl Default for SplitPolicy {
    fn default() -> Self {
        Self {
            split_point: SplitPoint::Center,
            tight_children: true,
            epsilon: 0.0,
        }
    }
}

const DEFAULT_CLAMP_MARGIN: f32 = 1e-5;

#[derive(Debug, Clone, Copy)]
pub struct OctreeNode {
    pub aabb: Aabb,
    pub base_child_index: u32,
    pub child_mask: u8,
    pub first_element: u32,
    pub num_elements: u32,
    pub num_straddlers: u32,
    pub is_leaf: bool,
}

impl OctreeNode {
    fn leaf(aabb: Aabb, first_element: u32, num_elements: u32) -> Self {
        Self {
            aabb,
            base_child_index: 0,
            child_mask: 0,
            first_element,
            num_elements,
            num_straddlers: 0,
            is_leaf: true,
        }
    }

    pub fn child_count(&self) -> u32 {
        self.child_mask.count_ones()
    }
}

/// Index of octant `octant` among the node's present children (the number of
/// set bits in `mask` below bit `octant`), used to find a child's slot inside
/// the contiguous `[base_child_index, base_child_index + child_count)` run.
fn child_slot(mask: u8, octant: u8) -> usize {
    (mask & ((1u8 << octant).wrapping_sub(1))).count_ones() as usize
}

#[derive(Default)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
    element_aabbs: Vec<Aabb>,
    element_indices: Vec<u32>,
    policy: SplitPolicy,
    max_per_node: usize,
    max_depth: usize,
}

impl Octree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn element_count(&self) -> usize {
        self.element_aabbs.len()
    }

    pub fn nodes(&self) -> &[OctreeNode] {
        &self.nodes
    }

    /// Takes ownership of `aabbs` as the element list, then builds the
    /// octree over it. Returns `false` (leaving the octree empty) if `aabbs`
    /// is empty.
    pub fn build(&mut self, aabbs: Vec<Aabb>, policy: SplitPolicy, max_per_node: usize, max_depth: usize) -> bool {
        self.policy = policy;
        self.max_per_node = max_per_node.max(1);
        self.max_depth = max_depth;
        self.nodes.clear();
        let n = aabbs.len();
        self.element_indices = (0..n as u32).collect();
        self.element_aabbs = aabbs;
        if n == 0 {
            return false;
        }

        let root_aabb = Aabb::union_all(self.element_aabbs.iter()).expect("n > 0 implies a union exists");
        self.nodes.push(OctreeNode::leaf(root_aabb, 0, n as u32));

        let mut stack: Vec<(usize, usize)> = vec![(0, 0)];
        while let Some((node_idx, depth)) = stack.pop() {
            self.subdivide(node_idx, depth, &mut stack);
        }

        tracing::info!(elements = n, nodes = self.nodes.len(), "octree build complete");
        true
    }

    fn subdivide(&mut self, node_idx: usize, depth: usize, stack: &mut Vec<(usize, usize)>) {
        let (aabb, first, num) = {
            let node = &self.nodes[node_idx];
            (node.aabb, node.first_element as usize, node.num_elements as usize)
        };
        if depth >= self.max_depth || num <= self.max_per_node {
            return;
        }

        let split = self.split_point(aabb, first, num);
        let octant_aabbs: [Aabb; 8] = std::array::from_fn(|o| aabb.octant_aabb(split, o as u8));

        let mut straddlers: Vec<u32> = Vec::new();
        let mut buckets: [Vec<u32>; 8] = Default::default();
        for &elem in &self.element_indices[first..first + num] {
            let elem_aabb = self.element_aabbs[elem as usize];
            let octant = classify(&elem_aabb, split, &octant_aabbs, self.policy.tight_children);
            match octant {
                Some(o) => buckets[o as usize].push(elem),
                None => straddlers.push(elem),
            }
        }

        if buckets.iter().all(Vec::is_empty) {
            // Every element straddles; subdividing further wouldn't help.
            return;
        }

        let margin = if self.policy.epsilon > 0.0 { self.policy.epsilon } else { DEFAULT_CLAMP_MARGIN };
        let num_straddlers = straddlers.len();
        let mut write = first;
        for &e in &straddlers {
            self.element_indices[write] = e;
            write += 1;
        }

        let base_child_index = self.nodes.len() as u32;
        let mut child_mask = 0u8;
        let mut new_children: Vec<(usize, u32, u32, Aabb)> = Vec::new();
        for (o, bucket) in buckets.iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            let child_first = write;
            for &e in bucket {
                self.element_indices[write] = e;
                write += 1;
            }
            let child_aabb = if self.policy.tight_children {
                let union = Aabb::union_all(bucket.iter().map(|&e| &self.element_aabbs[e as usize]))
                    .unwrap_or(octant_aabbs[o]);
                Aabb::new(union.min - Vec3::splat(margin), union.max + Vec3::splat(margin))
            } else {
                octant_aabbs[o]
            };
            child_mask |= 1 << o;
            new_children.push((o, child_first as u32, bucket.len() as u32, child_aabb));
        }
        debug_assert_eq!(write, first + num);

        for (_, child_first, child_num, child_aabb) in &new_children {
            self.nodes.push(OctreeNode::leaf(*child_aabb, *child_first, *child_num));
        }

        {
            let node = &mut self.nodes[node_idx];
            node.is_leaf = false;
            node.num_straddlers = num_straddlers as u32;
            node.base_child_index = base_child_index;
            node.child_mask = child_mask;
        }

        for i in 0..new_children.len() {
            stack.push((base_child_index as usize + i, depth + 1));
        }
    }

    fn split_point(&self, aabb: Aabb, first: usize, num: usize) -> Vec3 {
        let margin = if self.policy.epsilon > 0.0 { self.policy.epsilon } else { DEFAULT_CLAMP_MARGIN };
        let raw = match self.policy.split_point {
            SplitPoint::Center => aabb.center(),
            SplitPoint::Mean => {
                let sum: Vec3 = self.element_indices[first..first + num]
                    .iter()
                    .map(|&e| self.element_aabbs[e as usize].center())
                    .sum();
                sum / num as f32
            }
            SplitPoint::Median => {
                let mut xs: Vec<f32> = Vec::with_capacity(num);
                let mut ys: Vec<f32> = Vec::with_capacity(num);
                let mut zs: Vec<f32> = Vec::with_capacity(num);
                for &e in &self.element_indices[first..first + num] {
                    let c = self.element_aabbs[e as usize].center();
                    xs.push(c.x);
                    ys.push(c.y);
                    zs.push(c.z);
                }
                xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
                ys.sort_by(|a, b| a.partial_cmp(b).unwrap());
                zs.sort_by(|a, b| a.partial_cmp(b).unwrap());
                Vec3::new(xs[num / 2], ys[num / 2], zs[num / 2])
            }
        };
        Vec3::new(
            raw.x.clamp(aabb.min.x + margin, aabb.max.x - margin),
            raw.y.clamp(aabb.min.y + margin, aabb.max.y - margin),
            raw.z.clamp(aabb.min.z + margin, aabb.max.z - margin),
        )
    }

    fn collect_range(&self, node_idx: usize, out: &mut Vec<u32>) {
        let node = &self.nodes[node_idx];
        let first = node.first_element as usize;
        let num = node.num_elements as usize;
        out.extend_from_slice(&self.element_indices[first..first + num]);
    }

    pub fn query_aabb(&self, query: &Aabb) -> Vec<u32> {
        self.query_with(query, |q, aabb| q.overlaps_aabb(aabb), |q, aabb| q.contains_aabb(aabb), |q| q.volume())
    }

    pub fn query_sphere(&self, query: &Sphere) -> Vec<u32> {
        self.query_with(
            query,
            |q, aabb| q.overlaps_aabb(aabb),
            |q, aabb| q.contains_aabb(aabb),
            |q| q.volume(),
        )
    }

    pub fn query_ray(&self, query: &Ray) -> Vec<u32> {
        let mut out = Vec::new();
        if self.nodes.is_empty() {
            return out;
        }
        let mut stack: Vec<usize> = Vec::with_capacity(128);
        stack.push(0);
        while let Some(idx) = stack.pop() {
            let node = self.nodes[idx];
            if !query.overlaps_aabb(&node.aabb) {
                continue;
            }
            self.visit_straddlers(&node, |e, aabb| {
                if query.overlaps_aabb(aabb) {
                    out.push(e);
                }
            });
            if node.is_leaf {
                self.visit_leaf_rest(&node, |e, aabb| {
                    if query.overlaps_aabb(aabb) {
                        out.push(e);
                    }
                });
            } else {
                for o in (0..8u8).rev() {
                    if node.child_mask & (1 << o) != 0 {
                        stack.push(node.base_child_index as usize + child_slot(node.child_mask, o));
                    }
                }
            }
        }
        out
    }

    /// Shared traversal for volumetric shapes (sphere/AABB), which get a
    /// fast path: if the query strictly contains a node's AABB and is
    /// strictly larger by volume, the node's whole element range can be
    /// emitted without per-element tests.
    fn query_with<Q>(
        &self,
        query: &Q,
        overlaps: impl Fn(&Q, &Aabb) -> bool,
        contains: impl Fn(&Q, &Aabb) -> bool,
        volume: impl Fn(&Q) -> f32,
    ) -> Vec<u32> {
        let mut out = Vec::new();
        if self.nodes.is_empty() {
            return out;
        }
        let query_volume = volume(query);
        let mut stack: Vec<usize> = Vec::with_capacity(128);
        stack.push(0);
        while let Some(idx) = stack.pop() {
            let node = self.nodes[idx];
            if !overlaps(query, &node.aabb) {
                continue;
            }
            if contains(query, &node.aabb) && query_volume > node.aabb.volume() {
                self.collect_range(idx, &mut out);
                continue;
            }
            self.visit_straddlers(&node, |e, aabb| {
                if overlaps(query, aabb) {
                    out.push(e);
                }
            });
            if node.is_leaf {
                self.visit_leaf_rest(&node, |e, aabb| {
                    if overlaps(query, aabb) {
                        out.push(e);
                    }
                });
            } else {
                for o in (0..8u8).rev() {
                    if node.child_mask & (1 << o) != 0 {
                        stack.push(node.base_child_index as usize + child_slot(node.child_mask, o));
                    }
                }
            }
        }
        out
    }

    fn visit_straddlers(&self, node: &OctreeNode, mut f: impl FnMut(u32, &Aabb)) {
        let first = node.first_element as usize;
        for i in 0..node.num_straddlers as usize {
            let e = self.element_indices[first + i];
            f(e, &self.element_aabbs[e as usize]);
        }
    }

    fn visit_leaf_rest(&self, node: &OctreeNode, mut f: impl FnMut(u32, &Aabb)) {
        let first = node.first_element as usize;
        for i in node.num_straddlers as usize..node.num_elements as usize {
            let e = self.element_indices[first + i];
            f(e, &self.element_aabbs[e as usize]);
        }
    }

    /// Best-first nearest-neighbor search using a min-heap keyed by
    /// `distance²(node.aabb, point)`.
    pub fn query_nearest(&self, point: Vec3) -> Option<u32> {
        if self.nodes.is_empty() {
            return None;
        }
        let mut frontier = BinaryHeap::new();
        frontier.push(Reverse((FloatOrd(self.nodes[0].aabb.squared_distance_to_point(point)), Candidate::Node(0))));
        let mut best: Option<(f32, u32)> = None;

        while let Some(Reverse((FloatOrd(d), candidate))) = frontier.pop() {
            if let Some((bd, _)) = best {
                if d >= bd {
                    break;
                }
            }
            match candidate {
                Candidate::Element(e) => {
                    let dist = self.element_aabbs[e as usize].squared_distance_to_point(point);
                    if best.map_or(true, |(bd, bi)| dist < bd || (dist == bd && e < bi)) {
                        best = Some((dist, e));
                    }
                }
                Candidate::Node(idx) => {
                    let node = self.nodes[idx];
                    self.visit_straddlers(&node, |e, aabb| {
                        let dist = aabb.squared_distance_to_point(point);
                        frontier.push(Reverse((FloatOrd(dist), Candidate::Element(e))));
                    });
                    if node.is_leaf {
                        self.visit_leaf_rest(&node, |e, aabb| {
                            let dist = aabb.squared_distance_to_point(point);
                            frontier.push(Reverse((FloatOrd(dist), Candidate::Element(e))));
                        });
                    } else {
                        for o in 0..8u8 {
                            if node.child_mask & (1 << o) != 0 {
                                let child_idx = node.base_child_index as usize + child_slot(node.child_mask, o);
                                let cd = self.nodes[child_idx].aabb.squared_distance_to_point(point);
                                frontier.push(Reverse((FloatOrd(cd), Candidate::Node(child_idx))));
                            }
                        }
                    }
                }
            }
        }
        best.map(|(_, e)| e)
    }

    /// Best-first KNN using a bounded max-heap of size `k` for the current
    /// best set; a child/straddler is only pushed onto the search frontier
    /// if its lower bound doesn't exceed `τ` (the current k-th best distance,
    /// or `+∞` while the best set isn't yet full). Returns ascending by
    /// distance, ties broken by element index.
    pub fn query_knn(&self, point: Vec3, k: usize) -> Vec<u32> {
        if k == 0 || self.nodes.is_empty() {
            return Vec::new();
        }
        let mut frontier = BinaryHeap::new();
        frontier.push(Reverse((FloatOrd(self.nodes[0].aabb.squared_distance_to_point(point)), Candidate::Node(0))));
        let mut best: BinaryHeap<(FloatOrd<f32>, u32)> = BinaryHeap::new();

        while let Some(Reverse((FloatOrd(d), candidate))) = frontier.pop() {
            let tau = if best.len() >= k { best.peek().unwrap().0 .0 } else { f32::INFINITY };
            if d > tau {
                break;
            }
            match candidate {
                Candidate::Element(e) => {
                    let dist = self.element_aabbs[e as usize].squared_distance_to_point(point);
                    if best.len() < k {
                        best.push((FloatOrd(dist), e));
                    } else if dist < tau || (dist == tau && e < best.peek().unwrap().1) {
                        best.pop();
                        best.push((FloatOrd(dist), e));
                    }
                }
                Candidate::Node(idx) => {
                    let node = self.nodes[idx];
                    let tau_now = if best.len() >= k { best.peek().unwrap().0 .0 } else { f32::INFINITY };
                    self.visit_straddlers(&node, |e, aabb| {
                        let dist = aabb.squared_distance_to_point(point);
                        if dist <= tau_now {
                            frontier.push(Reverse((FloatOrd(dist), Candidate::Element(e))));
                        }
                    });
                    if node.is_leaf {
                        self.visit_leaf_rest(&node, |e, aabb| {
                            let dist = aabb.squared_distance_to_point(point);
                            if dist <= tau_now {
                                frontier.push(Reverse((FloatOrd(dist), Candidate::Element(e))));
                            }
                        });
                    } else {
                        for o in 0..8u8 {
                            if node.child_mask & (1 << o) != 0 {
                                let child_idx = node.base_child_index as usize + child_slot(node.child_mask, o);
                                let cd = self.nodes[child_idx].aabb.squared_distance_to_point(point);
                                if cd <= tau_now {
                                    frontier.push(Reverse((FloatOrd(cd), Candidate::Node(child_idx))));
                                }
                            }
                        }
                    }
                }
            }
        }

        let mut result: Vec<(f32, u32)> = best.into_iter().map(|(d, e)| (d.0, e)).collect();
        result.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap().then(a.1.cmp(&b.1)));
        result.into_iter().map(|(_, e)| e).collect()
    }

    /// Checks the parent/child range invariants from the data model: child
    /// ranges are disjoint, lie inside the parent's range, and their sizes
    /// (plus straddlers) sum to the parent's `num_elements`; a leaf has no
    /// straddlers recorded separately from its own elements.
    pub fn validate_structure(&self) -> bool {
        if self.nodes.is_empty() {
            return true;
        }
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            let node = self.nodes[idx];
            if node.is_leaf {
                if node.num_straddlers != 0 {
                    return false;
                }
                continue;
            }
            let mut covered = node.num_straddlers;
            let mut expect_first = node.first_element + node.num_straddlers;
            for o in 0..8u8 {
                if node.child_mask & (1 << o) == 0 {
                    continue;
                }
                let child_idx = node.base_child_index as usize + child_slot(node.child_mask, o);
                let child = self.nodes[child_idx];
                if child.first_element != expect_first {
                    return false;
                }
                if child.first_element < node.first_element
                    || child.first_element + child.num_elements > node.first_element + node.num_elements
                {
                    return false;
                }
                expect_first += child.num_elements;
                covered += child.num_elements;
                stack.push(child_idx);
            }
            if covered != node.num_elements {
                return false;
            }
        }
        true
    }
}

#[derive(Clone, Copy)]
enum Candidate {
    Node(usize),
    Element(u32),
}

/// Classifies one element's AABB into an octant (`Some`) or a straddler
/// (`None`) per the build-time partitioning rule: points go by their octant
/// bitcode, AABBs wholly inside exactly one octant go there, and anything
/// else is either a straddler or (if `tight_children`) classified by its
/// center's bitcode.
fn classify(elem: &Aabb, split: Vec3, octant_aabbs: &[Aabb; 8], tight_children: bool) -> Option<u8> {
    if elem.is_point() {
        return Some(Aabb::octant_of_point(split, elem.min));
    }
    let mut contained_in: Option<u8> = None;
    let mut contained_count = 0;
    for (o, oct) in octant_aabbs.iter().enumerate() {
        if oct.contains_aabb(elem) {
            contained_in = Some(o as u8);
            contained_count += 1;
        }
    }
    if contained_count == 1 {
        return contained_in;
    }
    if tight_children {
        Some(Aabb::octant_of_point(split, elem.center()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn point_aabbs(points: &[Vec3]) -> Vec<Aabb> {
        points.iter().map(|&p| Aabb::from_point(p)).collect()
    }

    #[test]
    fn build_fails_on_empty_input() {
        let mut oct = Octree::new();
        assert!(!oct.build(vec![], SplitPolicy::default(), 4, 6));
    }

    #[test]
    fn query_aabb_matches_brute_force() {
        let points = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::new(5.0, 5.0, 5.0),
            Vec3::new(-3.0, -3.0, -3.0),
        ];
        let aabbs = point_aabbs(&points);
        let mut oct = Octree::new();
        oct.build(aabbs.clone(), SplitPolicy::default(), 2, 6);
        assert!(oct.validate_structure());

        let query = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let mut got = oct.query_aabb(&query);
        got.sort();
        let mut expected: Vec<u32> =
            aabbs.iter().enumerate().filter(|(_, a)| a.overlaps_aabb(&query)).map(|(i, _)| i as u32).collect();
        expected.sort();
        assert_eq!(got, expected);
    }

    #[test]
    fn knn_on_integer_lattice_scenario_s6() {
        let mut points = Vec::new();
        for x in 0..3 {
            for y in 0..3 {
                for z in 0..3 {
                    points.push(Vec3::new(x as f32, y as f32, z as f32));
                }
            }
        }
        let aabbs = point_aabbs(&points);
        let mut oct = Octree::new();
        oct.build(aabbs, SplitPolicy::default(), 4, 6);

        let knn = oct.query_knn(Vec3::ZERO, 4);
        let expected_points = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        assert_eq!(knn.len(), 4);
        for (idx, expected) in knn.iter().zip(expected_points.iter()) {
            assert_eq!(points[*idx as usize], *expected);
        }
    }

    #[test]
    fn nearest_matches_brute_force() {
        let points = vec![Vec3::new(10.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0), Vec3::new(-5.0, 0.0, 0.0)];
        let aabbs = point_aabbs(&points);
        let mut oct = Octree::new();
        oct.build(aabbs, SplitPolicy::default(), 1, 8);
        let nearest = oct.query_nearest(Vec3::ZERO).unwrap();
        assert_eq!(points[nearest as usize], Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn ray_query_finds_intersecting_boxes() {
        let aabbs = vec![
            Aabb::new(Vec3::new(5.0, -0.5, -0.5), Vec3::new(6.0, 0.5, 0.5)),
            Aabb::new(Vec3::new(5.0, 10.0, 10.0), Vec3::new(6.0, 11.0, 11.0)),
        ];
        let mut oct = Octree::new();
        oct.build(aabbs, SplitPolicy::default(), 1, 6);
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let hits = oct.query_ray(&ray);
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn validate_structure_on_many_points() {
        let mut points = Vec::new();
        for i in 0..200u32 {
            points.push(Vec3::new((i % 7) as f32, (i % 11) as f32, (i % 13) as f32));
        }
        let aabbs = point_aabbs(&points);
        let mut oct = Octree::new();
        oct.build(aabbs, SplitPolicy { tight_children: false, ..Default::default() }, 4, 6);
        assert!(oct.validate_structure());
    }
}
