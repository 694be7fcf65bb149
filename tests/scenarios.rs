// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end scenarios exercised entirely through the public API, one per
//! subsystem, matching the six literal-input/expected-output walkthroughs
//! named S1-S6.

use geokernel::dec::{build_exterior_derivative_0, build_exterior_derivative_1, build_hodge_star_1, solve_cg, CgParams, DiagonalMatrix, SparseMatrix};
use geokernel::hull::{build, ConvexHullParams};
use geokernel::mesh::MeshConnectivity;
use geokernel::octree::{Octree, SplitPoint, SplitPolicy};
use geokernel::shapes::Aabb;
use glam::Vec3;
use pretty_assertions::assert_eq;

/// Installs a `fmt` subscriber reading `RUST_LOG` (default: this crate at
/// `info`), so `RUST_LOG=geokernel=trace cargo test -- --nocapture` surfaces
/// the `tracing` instrumentation from mesh mutation, solver iterations, and
/// quickhull expansion. Idempotent: every test calls it, only the first
/// `try_init` wins.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "geokernel=info".into()))
        .with_test_writer()
        .try_init();
}

fn icosahedron_vertices() -> Vec<Vec3> {
    let phi = (1.0 + 5f32.sqrt()) / 2.0;
    let mut verts = Vec::with_capacity(12);
    for &sx in &[-1.0f32, 1.0] {
        for &sy in &[-1.0f32, 1.0] {
            verts.push(Vec3::new(0.0, sx, sy * phi));
            verts.push(Vec3::new(sx, sy * phi, 0.0));
            verts.push(Vec3::new(sy * phi, 0.0, sx));
        }
    }
    verts
}

#[test]
fn s1_unit_sphere_hull() {
    init_tracing();
    let points = icosahedron_vertices();
    let result = build(&points, ConvexHullParams::default()).expect("icosahedron is non-degenerate");
    assert_eq!(result.vertex_count, 12);
    assert_eq!(result.face_count, 20);
    assert_eq!(result.edge_count, 30);

    let planes = result.planes.expect("compute_planes defaults to true");
    for (face, plane) in result.faces.iter().zip(planes.iter()) {
        let centroid = (result.vertices[face[0] as usize] + result.vertices[face[1] as usize] + result.vertices[face[2] as usize]) / 3.0;
        assert!(plane.normal.dot(centroid) > 0.0, "face normal should point away from the origin-centered polytope");
    }
}

#[test]
fn s2_tetrahedron_collapse() {
    init_tracing();
    let mut m = MeshConnectivity::new();
    let a = m.add_vertex(Some(Vec3::new(0.0, 0.0, 0.0)));
    let b = m.add_vertex(Some(Vec3::new(1.0, 0.0, 0.0)));
    let c = m.add_vertex(Some(Vec3::new(0.0, 1.0, 0.0)));
    let d = m.add_vertex(Some(Vec3::new(0.0, 0.0, 1.0)));
    m.add_triangle(a, b, c).unwrap();
    m.add_triangle(a, d, b).unwrap();
    m.add_triangle(b, d, c).unwrap();
    m.add_triangle(a, c, d).unwrap();

    let e = m.find_halfedge(a, b).unwrap().edge();
    assert!(m.is_collapse_ok(e));
    let survivor = m.collapse(e, Vec3::new(0.5, 0.0, 0.0)).unwrap();

    assert_eq!(m.num_vertices(), 3);
    assert_eq!(m.num_faces(), 2);
    assert_eq!(m.num_edges(), 3);
    assert_eq!(m.position(survivor), Vec3::new(0.5, 0.0, 0.0));
}

#[test]
fn s3_flip_shared_diagonal() {
    init_tracing();
    let mut m = MeshConnectivity::new();
    let v0 = m.add_vertex(Some(Vec3::new(0.0, 0.0, 0.0)));
    let v1 = m.add_vertex(Some(Vec3::new(1.0, 0.0, 0.0)));
    let v2 = m.add_vertex(Some(Vec3::new(1.0, 1.0, 0.0)));
    let v3 = m.add_vertex(Some(Vec3::new(0.0, 1.0, 0.0)));
    m.add_triangle(v0, v1, v2).unwrap();
    m.add_triangle(v0, v2, v3).unwrap();

    let e = m.find_halfedge(v0, v2).unwrap().edge();
    assert!(m.is_flip_ok(e));
    assert!(m.flip(e));

    assert_eq!(m.num_faces(), 2);
    assert!(m.find_halfedge(v1, v3).is_some() || m.find_halfedge(v3, v1).is_some());
}

#[test]
fn s4_cg_on_3x3_spd() {
    init_tracing();
    let mut a = SparseMatrix::zeros(3, 3);
    a.add(0, 0, 4.0);
    a.add(0, 1, 1.0);
    a.add(1, 0, 1.0);
    a.add(1, 1, 3.0);
    a.add(2, 2, 2.0);
    let b = vec![1.0, 2.0, 3.0];
    let jacobi = DiagonalMatrix::new(vec![4.0, 3.0, 2.0]).inverse();

    let result = solve_cg(&a, &b, &jacobi, CgParams { max_iterations: 100, tolerance: 1e-10 }).unwrap();
    assert!(result.converged);
    assert!(result.iterations <= 3);
    assert!((result.x[0] - 1.0 / 11.0).abs() < 1e-8);
    assert!((result.x[1] - 7.0 / 11.0).abs() < 1e-8);
    assert!((result.x[2] - 1.5).abs() < 1e-8);
}

#[test]
fn s5_hodge_star_1_on_equilateral_triangle() {
    init_tracing();
    let mut m = MeshConnectivity::new();
    let a = m.add_vertex(Some(Vec3::new(0.0, 0.0, 0.0)));
    let b = m.add_vertex(Some(Vec3::new(1.0, 0.0, 0.0)));
    let c = m.add_vertex(Some(Vec3::new(0.5, 3f32.sqrt() / 2.0, 0.0)));
    m.add_triangle(a, b, c).unwrap();

    let star1 = build_hodge_star_1(&m);
    let expected = 0.5 / 3f64.sqrt();
    for &value in &star1.diag {
        assert!((value - expected).abs() < 1e-6, "{value} vs {expected}");
    }

    // d1 . d0 vanishes on any closed-enough patch; check it here too since
    // this mesh already exists for the Hodge check.
    let d0 = build_exterior_derivative_0(&m);
    let d1 = build_exterior_derivative_1(&m);
    let product = d1.mul_mat(&d0);
    for row in 0..product.rows {
        for &(_, v) in product.row(row) {
            assert!(v.abs() < 1e-9);
        }
    }
}

#[test]
fn s6_octree_knn_on_integer_lattice() {
    init_tracing();
    let mut points = Vec::new();
    for x in 0..3 {
        for y in 0..3 {
            for z in 0..3 {
                points.push(Vec3::new(x as f32, y as f32, z as f32));
            }
        }
    }
    let aabbs: Vec<Aabb> = points.iter().map(|&p| Aabb::new(p, p)).collect();

    let mut octree = Octree::new();
    let policy = SplitPolicy { split_point: SplitPoint::Center, tight_children: true, epsilon: 0.0 };
    assert!(octree.build(aabbs, policy, 4, 6));

    let knn = octree.query_knn(Vec3::ZERO, 4);
    let expected_positions = [Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 1.0)];
    assert_eq!(knn.len(), 4);
    for (&idx, expected) in knn.iter().zip(expected_positions.iter()) {
        assert_eq!(points[idx as usize], *expected);
    }
}
