// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Solid clipper - boolean subtraction of clip regions from a surface mesh
//!
//! Each rectangle becomes a box cutter that passes through the whole
//! thickness; each free-form shape becomes a prism. Every clip starts again
//! from the pristine mesh and folds the cutters onto the running solid in
//! registry order, so the result depends only on the current region list and
//! removing a region restores exactly what it covered.

use crate::csg::{mesh_to_polygons, polygons_to_mesh, prism_polygons, CsgrsKernel, SolidKernel};
use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::plane::SurfacePlane;
use crate::rebuild::CancelToken;
use crate::uv::UvFrame;
use std::panic::{catch_unwind, AssertUnwindSafe};
use surfclip_core::{Bounds2, ClipConfig, ClipPolygon, ClipRectangle};
use tracing::{debug, trace};

/// Clips one surface's pristine mesh against a list of regions
#[derive(Debug)]
pub struct SolidClipper<K: SolidKernel = CsgrsKernel> {
    kernel: K,
    plane: SurfacePlane,
    original: Mesh,
    bounds: Bounds2,
    w_min: f64,
    w_max: f64,
    cutter_depth: f64,
    uv_frame: UvFrame,
}

impl SolidClipper<CsgrsKernel> {
    /// Clipper backed by csgrs
    pub fn csgrs(original: Mesh, plane: SurfacePlane, config: &ClipConfig) -> Result<Self> {
        Self::new(CsgrsKernel::new(), original, plane, config)
    }
}

impl<K: SolidKernel> SolidClipper<K> {
    /// Capture the pristine mesh and its UV frame
    ///
    /// Fails with [`Error::EmptyMesh`] for meshes without extent and with
    /// [`Error::InvalidMesh`] for broken index buffers.
    pub fn new(kernel: K, original: Mesh, plane: SurfacePlane, config: &ClipConfig) -> Result<Self> {
        original.validate()?;
        let (bounds, w_min, w_max) = plane
            .local_extent(&original)
            .ok_or_else(|| Error::EmptyMesh("surface mesh has no area".to_string()))?;

        let uv_frame = UvFrame::capture(&original, plane).unwrap_or_else(|| {
            debug!("surface mesh has no usable UVs, mapping its bounds to the unit square");
            UvFrame::from_bounds(&bounds)
        });

        Ok(Self {
            kernel,
            plane,
            original,
            bounds,
            w_min,
            w_max,
            cutter_depth: config.cutter_depth,
            uv_frame,
        })
    }

    #[inline]
    pub fn original(&self) -> &Mesh {
        &self.original
    }

    #[inline]
    pub fn bounds(&self) -> &Bounds2 {
        &self.bounds
    }

    #[inline]
    pub fn plane(&self) -> SurfacePlane {
        self.plane
    }

    #[inline]
    pub fn uv_frame(&self) -> &UvFrame {
        &self.uv_frame
    }

    #[inline]
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Half depth of every cutter along the thickness axis
    #[inline]
    fn half_depth(&self) -> f64 {
        // Never shallower than the surface itself
        self.cutter_depth.max(self.w_max - self.w_min)
    }

    #[inline]
    fn mid_depth(&self) -> f64 {
        (self.w_min + self.w_max) * 0.5
    }

    /// Push rectangle sides lying on a surface edge out by `margin`, so the
    /// cutter never shares a face with the surface
    fn extend_past_edges(&self, rect: &ClipRectangle, margin: f64) -> ClipRectangle {
        let mut cut = *rect;
        if cut.min.x <= self.bounds.min.x {
            cut.min.x -= margin;
        }
        if cut.max.x >= self.bounds.max.x {
            cut.max.x += margin;
        }
        if cut.min.y <= self.bounds.min.y {
            cut.min.y -= margin;
        }
        if cut.max.y >= self.bounds.max.y {
            cut.max.y += margin;
        }
        cut
    }

    /// Subtract every region from the pristine mesh
    ///
    /// An empty region list returns the pristine mesh untouched without
    /// calling the kernel. `cancel` is checked between subtractions. Any kernel
    /// failure, including a panic, is reported as [`Error::CsgFailure`].
    pub fn clip(
        &self,
        rectangles: &[ClipRectangle],
        shapes: &[ClipPolygon],
        cancel: &CancelToken,
    ) -> Result<Mesh> {
        if rectangles.is_empty() && shapes.is_empty() {
            return Ok(self.original.clone());
        }

        catch_unwind(AssertUnwindSafe(|| self.subtract_all(rectangles, shapes, cancel)))
            .unwrap_or_else(|_| Err(Error::csg("kernel panicked while clipping")))
    }

    fn subtract_all(
        &self,
        rectangles: &[ClipRectangle],
        shapes: &[ClipPolygon],
        cancel: &CancelToken,
    ) -> Result<Mesh> {
        let mut solid = self.kernel.from_polygons(&mesh_to_polygons(&self.original))?;
        let depth = self.half_depth();
        let mid = self.mid_depth();
        let mut cuts = 0usize;

        for rect in rectangles {
            cancel.check()?;
            if rect.is_degenerate() {
                trace!(?rect, "skipping degenerate rectangle cutter");
                continue;
            }

            let cut = self.extend_past_edges(rect, depth);
            let center = cut.center();
            let cutter = self.kernel.make_cuboid(
                self.plane.to_world(center.x, center.y, mid),
                self.plane
                    .half_extents(cut.width() * 0.5, cut.height() * 0.5, depth),
            )?;
            solid = self.kernel.subtract(&solid, &cutter)?;
            cuts += 1;
        }

        for shape in shapes {
            cancel.check()?;
            let prism = prism_polygons(shape, self.plane, mid - depth, mid + depth)?;
            if prism.is_empty() {
                trace!(id = %shape.id, "skipping degenerate shape cutter");
                continue;
            }

            let cutter = self.kernel.from_polygons(&prism)?;
            solid = self.kernel.subtract(&solid, &cutter)?;
            cuts += 1;
        }

        cancel.check()?;
        let polygons = self.kernel.to_polygons(&solid)?;
        let mesh = polygons_to_mesh(&polygons, self.plane, Some(&self.uv_frame))?;
        mesh.validate()
            .map_err(|e| Error::csg(format!("kernel produced an invalid mesh: {}", e)))?;

        debug!(
            cuts,
            triangles = mesh.triangle_count(),
            "solid clip finished"
        );
        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csg::{cuboid_polygons, Polygon};
    use crate::plane::panel_mesh;
    use nalgebra::{Point2, Point3, Vector3};

    fn config() -> ClipConfig {
        ClipConfig::defaults()
    }

    fn wall_panel() -> Mesh {
        panel_mesh(
            SurfacePlane::Wall,
            &Bounds2::centered(500.0, 300.0).unwrap(),
            -10.0,
            10.0,
        )
    }

    fn front_area(mesh: &Mesh, plane: SurfacePlane) -> f64 {
        let front = plane.normal();
        mesh.triangles()
            .filter(|&[a, _, _]| mesh.normal(a).dot(&front) > 0.9)
            .map(|[a, b, c]| {
                let (pa, pb, pc) = (mesh.position(a), mesh.position(b), mesh.position(c));
                (pb - pa).cross(&(pc - pa)).norm() * 0.5
            })
            .sum()
    }

    /// Kernel over plain polygon lists whose subtraction always fails
    struct FailingKernel;

    impl SolidKernel for FailingKernel {
        type Solid = Vec<Polygon>;

        fn from_polygons(&self, polygons: &[Polygon]) -> Result<Self::Solid> {
            Ok(polygons.to_vec())
        }

        fn to_polygons(&self, solid: &Self::Solid) -> Result<Vec<Polygon>> {
            Ok(solid.clone())
        }

        fn subtract(&self, _: &Self::Solid, _: &Self::Solid) -> Result<Self::Solid> {
            Err(Error::csg("boolean engine refused the operands"))
        }

        fn make_cuboid(&self, center: Point3<f64>, half: Vector3<f64>) -> Result<Self::Solid> {
            Ok(cuboid_polygons(center, half))
        }
    }

    struct PanickingKernel;

    impl SolidKernel for PanickingKernel {
        type Solid = Vec<Polygon>;

        fn from_polygons(&self, polygons: &[Polygon]) -> Result<Self::Solid> {
            Ok(polygons.to_vec())
        }

        fn to_polygons(&self, solid: &Self::Solid) -> Result<Vec<Polygon>> {
            Ok(solid.clone())
        }

        fn subtract(&self, _: &Self::Solid, _: &Self::Solid) -> Result<Self::Solid> {
            panic!("bsp split overflow");
        }

        fn make_cuboid(&self, center: Point3<f64>, half: Vector3<f64>) -> Result<Self::Solid> {
            Ok(cuboid_polygons(center, half))
        }
    }

    fn centered_cut() -> ClipRectangle {
        ClipRectangle::new(Point2::new(-50.0, 100.0), Point2::new(50.0, 200.0))
    }

    #[test]
    fn test_empty_list_returns_original() {
        let clipper = SolidClipper::new(FailingKernel, wall_panel(), SurfacePlane::Wall, &config())
            .unwrap();
        let mesh = clipper.clip(&[], &[], &CancelToken::new()).unwrap();
        assert_eq!(&mesh, clipper.original());
    }

    #[test]
    fn test_empty_mesh_is_rejected() {
        let result = SolidClipper::csgrs(Mesh::new(), SurfacePlane::Wall, &config());
        assert!(matches!(result, Err(Error::EmptyMesh(_))));
    }

    #[test]
    fn test_centered_cut_removes_front_area() {
        let clipper = SolidClipper::csgrs(wall_panel(), SurfacePlane::Wall, &config()).unwrap();
        let mesh = clipper
            .clip(&[centered_cut()], &[], &CancelToken::new())
            .unwrap();

        let area = front_area(&mesh, SurfacePlane::Wall);
        assert!((area - (150_000.0 - 10_000.0)).abs() < 1e-2, "front area {}", area);
        assert!(mesh.has_uvs());
        for i in 0..mesh.vertex_count() {
            let uv = mesh.uv(i).unwrap();
            assert!((-1e-6..=1.0 + 1e-6).contains(&uv.x));
            assert!((-1e-6..=1.0 + 1e-6).contains(&uv.y));
        }
    }

    #[test]
    fn test_uvs_follow_the_captured_frame() {
        let clipper = SolidClipper::csgrs(wall_panel(), SurfacePlane::Wall, &config()).unwrap();
        let mesh = clipper
            .clip(&[centered_cut()], &[], &CancelToken::new())
            .unwrap();

        for i in 0..mesh.vertex_count() {
            let (local, _) = SurfacePlane::Wall.to_local(&mesh.position(i));
            let uv = mesh.uv(i).unwrap();
            assert!((uv.x - (local.x + 250.0) / 500.0).abs() < 1e-6);
            assert!((uv.y - local.y / 300.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_shape_prism_cut() {
        let clipper = SolidClipper::csgrs(wall_panel(), SurfacePlane::Wall, &config()).unwrap();
        let triangle = ClipPolygon::new(
            "vent",
            vec![Point2::new(0.0, 50.0), Point2::new(100.0, 50.0), Point2::new(0.0, 150.0)],
        )
        .unwrap();

        let mesh = clipper
            .clip(&[], &[triangle], &CancelToken::new())
            .unwrap();
        let area = front_area(&mesh, SurfacePlane::Wall);
        assert!((area - (150_000.0 - 5_000.0)).abs() < 1e-2, "front area {}", area);
    }

    fn remaining_area(rectangles: &[ClipRectangle], shapes: &[ClipPolygon]) -> f64 {
        let clipper = SolidClipper::csgrs(wall_panel(), SurfacePlane::Wall, &config()).unwrap();
        let mesh = clipper
            .clip(rectangles, shapes, &CancelToken::new())
            .unwrap();
        front_area(&mesh, SurfacePlane::Wall)
    }

    #[test]
    fn test_overlapping_cuts_remove_their_union() {
        let a = centered_cut();
        let b = ClipRectangle::new(Point2::new(0.0, 150.0), Point2::new(100.0, 250.0));
        let expected = 150_000.0 - (10_000.0 + 10_000.0 - 2_500.0);

        let forward = remaining_area(&[a, b], &[]);
        let backward = remaining_area(&[b, a], &[]);
        assert!((forward - expected).abs() < 1e-2, "front area {}", forward);
        assert!((backward - forward).abs() < 1e-2, "{} != {}", backward, forward);
    }

    #[test]
    fn test_abutting_cuts_remove_their_union() {
        let left = ClipRectangle::new(Point2::new(-50.0, 0.0), Point2::new(50.0, 300.0));
        let right = ClipRectangle::new(Point2::new(50.0, 0.0), Point2::new(100.0, 300.0));
        let area = remaining_area(&[left, right], &[]);
        assert!((area - (150_000.0 - 150.0 * 300.0)).abs() < 1e-2, "front area {}", area);
    }

    #[test]
    fn test_duplicate_cuts_remove_once() {
        let area = remaining_area(&[centered_cut(), centered_cut()], &[]);
        assert!((area - (150_000.0 - 10_000.0)).abs() < 1e-2, "front area {}", area);
    }

    #[test]
    fn test_rectangle_and_shape_sharing_an_edge() {
        let rect = ClipRectangle::new(Point2::new(0.0, 50.0), Point2::new(100.0, 150.0));
        let wedge = ClipPolygon::new(
            "wedge",
            vec![Point2::new(100.0, 50.0), Point2::new(200.0, 50.0), Point2::new(100.0, 150.0)],
        )
        .unwrap();
        let area = remaining_area(&[rect], &[wedge]);
        assert!((area - (150_000.0 - 15_000.0)).abs() < 1e-2, "front area {}", area);
    }

    #[test]
    fn test_floor_cut() {
        let bounds = Bounds2::centered(4.0, 3.0).unwrap();
        let floor = panel_mesh(SurfacePlane::Floor, &bounds, 0.0, 0.2);
        let clipper = SolidClipper::csgrs(floor, SurfacePlane::Floor, &config()).unwrap();
        let cut = ClipRectangle::new(Point2::new(-0.5, 1.0), Point2::new(0.5, 2.0));

        let mesh = clipper.clip(&[cut], &[], &CancelToken::new()).unwrap();
        let area = front_area(&mesh, SurfacePlane::Floor);
        assert!((area - 11.0).abs() < 1e-6, "front area {}", area);
    }

    #[test]
    fn test_degenerate_rectangle_is_skipped() {
        let clipper = SolidClipper::new(FailingKernel, wall_panel(), SurfacePlane::Wall, &config())
            .unwrap();
        let sliver = ClipRectangle::new(Point2::new(10.0, 0.0), Point2::new(10.0, 300.0));
        assert!(clipper.clip(&[sliver], &[], &CancelToken::new()).is_ok());
    }

    #[test]
    fn test_kernel_error_is_csg_failure() {
        let clipper = SolidClipper::new(FailingKernel, wall_panel(), SurfacePlane::Wall, &config())
            .unwrap();
        let result = clipper.clip(&[centered_cut()], &[], &CancelToken::new());
        assert!(matches!(result, Err(Error::CsgFailure(_))));
    }

    #[test]
    fn test_kernel_panic_is_csg_failure() {
        let clipper =
            SolidClipper::new(PanickingKernel, wall_panel(), SurfacePlane::Wall, &config())
                .unwrap();
        let result = clipper.clip(&[centered_cut()], &[], &CancelToken::new());
        assert!(matches!(result, Err(Error::CsgFailure(_))));
    }

    #[test]
    fn test_cancelled_before_first_cut() {
        let clipper = SolidClipper::csgrs(wall_panel(), SurfacePlane::Wall, &config()).unwrap();
        let token = CancelToken::new();
        token.cancel();
        let result = clipper.clip(&[centered_cut()], &[], &token);
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
