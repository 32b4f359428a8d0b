// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surface planes - mapping between surface-local clip coordinates and world
//! space
//!
//! Local coordinates are `(u, v, w)`: `u` along the horizontal extent, `v`
//! along the vertical extent (walls) or depth (floors), `w` through the
//! thickness. Both mappings are proper rotations, so winding is preserved.

use crate::mesh::Mesh;
use nalgebra::{Point2, Point3, Vector3};
use surfclip_core::Bounds2;

/// Orientation of a cuttable surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SurfacePlane {
    /// Vertical panel: u → +X, v → +Y, thickness along +Z
    #[default]
    Wall,
    /// Horizontal panel: u → +X, v → -Z, thickness along +Y
    Floor,
}

impl SurfacePlane {
    /// World directions of the local `(u, v, w)` axes
    #[inline]
    pub fn axes(&self) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
        match self {
            SurfacePlane::Wall => (Vector3::x(), Vector3::y(), Vector3::z()),
            SurfacePlane::Floor => (Vector3::x(), -Vector3::z(), Vector3::y()),
        }
    }

    /// Outward normal of the front face
    #[inline]
    pub fn normal(&self) -> Vector3<f64> {
        self.axes().2
    }

    #[inline]
    pub fn to_world(&self, u: f64, v: f64, w: f64) -> Point3<f64> {
        let (ua, va, wa) = self.axes();
        Point3::from(ua * u + va * v + wa * w)
    }

    /// Surface coordinates of a world point, plus its offset through the thickness
    #[inline]
    pub fn to_local(&self, point: &Point3<f64>) -> (Point2<f64>, f64) {
        let (ua, va, wa) = self.axes();
        let p = point.coords;
        (Point2::new(p.dot(&ua), p.dot(&va)), p.dot(&wa))
    }

    /// World-space half extents of a local box with half sizes `(hu, hv, hw)`
    #[inline]
    pub fn half_extents(&self, hu: f64, hv: f64, hw: f64) -> Vector3<f64> {
        let (ua, va, wa) = self.axes();
        ua.abs() * hu + va.abs() * hv + wa.abs() * hw
    }

    /// Local bounds and thickness range of a mesh, `None` if it is empty
    pub fn local_extent(&self, mesh: &Mesh) -> Option<(Bounds2, f64, f64)> {
        if mesh.is_empty() {
            return None;
        }

        let mut min = Point2::new(f64::MAX, f64::MAX);
        let mut max = Point2::new(f64::MIN, f64::MIN);
        let mut w_min = f64::MAX;
        let mut w_max = f64::MIN;

        for i in 0..mesh.vertex_count() {
            let (p, w) = self.to_local(&mesh.position(i));
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            w_min = w_min.min(w);
            w_max = w_max.max(w);
        }

        Bounds2::new(min, max).ok().map(|b| (b, w_min, w_max))
    }
}

/// Build a closed box panel spanning `bounds` on the surface and
/// `[w_min, w_max]` through its thickness, with planar UVs that run 0..1
/// across the bounds
pub fn panel_mesh(plane: SurfacePlane, bounds: &Bounds2, w_min: f64, w_max: f64) -> Mesh {
    let (ua, va, wa) = plane.axes();
    let mut mesh = Mesh::with_capacity(24, 36);

    let uv_of = |u: f64, v: f64| {
        Point2::new(
            (u - bounds.min.x) / bounds.width(),
            (v - bounds.min.y) / bounds.height(),
        )
    };

    let (u0, u1) = (bounds.min.x, bounds.max.x);
    let (v0, v1) = (bounds.min.y, bounds.max.y);

    // Each face: four (u, v, w) corners counter-clockwise seen from outside
    let faces: [([(f64, f64, f64); 4], Vector3<f64>); 6] = [
        ([(u0, v0, w_max), (u1, v0, w_max), (u1, v1, w_max), (u0, v1, w_max)], wa),
        ([(u0, v0, w_min), (u0, v1, w_min), (u1, v1, w_min), (u1, v0, w_min)], -wa),
        ([(u1, v0, w_min), (u1, v1, w_min), (u1, v1, w_max), (u1, v0, w_max)], ua),
        ([(u0, v0, w_min), (u0, v0, w_max), (u0, v1, w_max), (u0, v1, w_min)], -ua),
        ([(u0, v1, w_min), (u0, v1, w_max), (u1, v1, w_max), (u1, v1, w_min)], va),
        ([(u0, v0, w_min), (u1, v0, w_min), (u1, v0, w_max), (u0, v0, w_max)], -va),
    ];

    for (corners, normal) in faces {
        let base = mesh.vertex_count() as u32;
        for (u, v, w) in corners {
            mesh.add_vertex_uv(plane.to_world(u, v, w), normal, uv_of(u, v));
        }
        mesh.add_triangle(base, base + 1, base + 2);
        mesh.add_triangle(base, base + 2, base + 3);
    }

    mesh
}
