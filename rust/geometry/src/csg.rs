// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CSG (Constructive Solid Geometry) kernel and mesh adapter
//!
//! The boolean algebra itself is delegated to a [`SolidKernel`]. This module
//! owns the narrow contract the solid clipper relies on, the csgrs-backed
//! implementation of it, and the conversions between the renderer's indexed
//! triangle meshes and the kernel's polygon soup.

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::plane::SurfacePlane;
use crate::triangulation::{
    calculate_polygon_normal, fan_triangulate, is_convex, orient_counter_clockwise,
    plane_deviation, project_to_2d, triangulate_polygon,
};
use crate::uv::UvFrame;
use nalgebra::{Point2, Point3, Vector3};
use smallvec::SmallVec;
use std::panic::{catch_unwind, AssertUnwindSafe};
use surfclip_core::ClipPolygon;

/// Allowed distance of a polygon vertex from the polygon's plane, relative to
/// the polygon's size
const PLANARITY_TOLERANCE: f64 = 1e-4;

/// Allowed mismatch between an ear-clipped polygon's area and the area of its
/// triangles, relative to the polygon's area
const COVERAGE_TOLERANCE: f64 = 1e-6;

/// Polygon vertex as exchanged with the kernel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Vertex {
    #[inline]
    pub fn new(position: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self { position, normal }
    }
}

/// Planar polygon in kernel vertex order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    pub vertices: SmallVec<[Vertex; 4]>,
}

impl Polygon {
    pub fn new(vertices: impl IntoIterator<Item = Vertex>) -> Self {
        Self {
            vertices: vertices.into_iter().collect(),
        }
    }

    /// Polygon whose vertices all share one normal
    pub fn flat(points: &[Point3<f64>], normal: Vector3<f64>) -> Self {
        Self::new(points.iter().map(|&p| Vertex::new(p, normal)))
    }

    pub fn positions(&self) -> SmallVec<[Point3<f64>; 4]> {
        self.vertices.iter().map(|v| v.position).collect()
    }
}

/// Boolean solid operations required by the solid clipper
///
/// Implementations must be shareable across threads: solid rebuilds run on
/// the rayon pool.
pub trait SolidKernel: Send + Sync {
    type Solid: Clone;

    fn from_polygons(&self, polygons: &[Polygon]) -> Result<Self::Solid>;

    fn to_polygons(&self, solid: &Self::Solid) -> Result<Vec<Polygon>>;

    /// `base - cutter`
    fn subtract(&self, base: &Self::Solid, cutter: &Self::Solid) -> Result<Self::Solid>;

    /// Axis-aligned box
    fn make_cuboid(&self, center: Point3<f64>, half_extents: Vector3<f64>) -> Result<Self::Solid>;
}

/// [`SolidKernel`] backed by the csgrs BSP implementation
///
/// csgrs does not report failures; a panic inside it is caught and turned into
/// [`Error::CsgFailure`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CsgrsKernel;

impl CsgrsKernel {
    pub fn new() -> Self {
        Self
    }
}

impl SolidKernel for CsgrsKernel {
    type Solid = csgrs::mesh::Mesh<()>;

    fn from_polygons(&self, polygons: &[Polygon]) -> Result<Self::Solid> {
        use csgrs::mesh::{polygon::Polygon as CsgPolygon, vertex::Vertex as CsgVertex, Mesh as CsgMesh};

        let csg_polygons: Vec<CsgPolygon<()>> = polygons
            .iter()
            .filter(|p| p.vertices.len() >= 3)
            .map(|p| {
                let vertices = p
                    .vertices
                    .iter()
                    .map(|v| CsgVertex::new(v.position, v.normal))
                    .collect();
                CsgPolygon::new(vertices, None)
            })
            .collect();

        catch_unwind(AssertUnwindSafe(|| CsgMesh::from_polygons(&csg_polygons, None)))
            .map_err(|_| Error::csg("kernel panicked while building a solid"))
    }

    fn to_polygons(&self, solid: &Self::Solid) -> Result<Vec<Polygon>> {
        Ok(solid
            .polygons
            .iter()
            .map(|polygon| {
                Polygon::new(
                    polygon
                        .vertices
                        .iter()
                        .map(|v| Vertex::new(v.pos, v.normal)),
                )
            })
            .collect())
    }

    fn subtract(&self, base: &Self::Solid, cutter: &Self::Solid) -> Result<Self::Solid> {
        use csgrs::traits::CSG;

        catch_unwind(AssertUnwindSafe(|| base.difference(cutter)))
            .map_err(|_| Error::csg("kernel panicked during subtraction"))
    }

    fn make_cuboid(&self, center: Point3<f64>, half_extents: Vector3<f64>) -> Result<Self::Solid> {
        self.from_polygons(&cuboid_polygons(center, half_extents))
    }
}

/// The six outward-facing quads of an axis-aligned box
pub fn cuboid_polygons(center: Point3<f64>, half_extents: Vector3<f64>) -> Vec<Polygon> {
    let min = center - half_extents;
    let max = center + half_extents;

    let v0 = Point3::new(min.x, min.y, min.z); // 0: front-bottom-left
    let v1 = Point3::new(max.x, min.y, min.z); // 1: front-bottom-right
    let v2 = Point3::new(max.x, max.y, min.z); // 2: front-top-right
    let v3 = Point3::new(min.x, max.y, min.z); // 3: front-top-left
    let v4 = Point3::new(min.x, min.y, max.z); // 4: back-bottom-left
    let v5 = Point3::new(max.x, min.y, max.z); // 5: back-bottom-right
    let v6 = Point3::new(max.x, max.y, max.z); // 6: back-top-right
    let v7 = Point3::new(min.x, max.y, max.z); // 7: back-top-left

    // Counter-clockwise seen from outside
    vec![
        Polygon::flat(&[v0, v3, v2, v1], -Vector3::z()),
        Polygon::flat(&[v4, v5, v6, v7], Vector3::z()),
        Polygon::flat(&[v0, v4, v7, v3], -Vector3::x()),
        Polygon::flat(&[v1, v2, v6, v5], Vector3::x()),
        Polygon::flat(&[v0, v1, v5, v4], -Vector3::y()),
        Polygon::flat(&[v3, v7, v6, v2], Vector3::y()),
    ]
}

/// Closed prism extruding a clip shape's outline through `[w_min, w_max]`
///
/// Caps are ear-clipped into triangles so concave outlines stay valid kernel
/// input. Degenerate shapes yield no polygons.
pub fn prism_polygons(
    shape: &ClipPolygon,
    plane: SurfacePlane,
    w_min: f64,
    w_max: f64,
) -> Result<Vec<Polygon>> {
    if shape.is_degenerate() {
        return Ok(Vec::new());
    }
    let points = shape.counter_clockwise_points();

    let (_, _, w_axis) = plane.axes();
    let cap = triangulate_polygon(&points)?;
    let mut polygons = Vec::with_capacity(cap.len() / 3 * 2 + points.len());

    for tri in cap.chunks_exact(3) {
        let top: SmallVec<[Point3<f64>; 4]> = tri
            .iter()
            .map(|&i| plane.to_world(points[i].x, points[i].y, w_max))
            .collect();
        polygons.push(Polygon::flat(&top, w_axis));

        let bottom: SmallVec<[Point3<f64>; 4]> = tri
            .iter()
            .rev()
            .map(|&i| plane.to_world(points[i].x, points[i].y, w_min))
            .collect();
        polygons.push(Polygon::flat(&bottom, -w_axis));
    }

    for i in 0..points.len() {
        let (p0, p1) = (points[i], points[(i + 1) % points.len()]);
        let edge = p1 - p0;
        let Some(outward) = Vector3::new(edge.y, -edge.x, 0.0).try_normalize(1e-12) else {
            continue;
        };
        let normal = plane.to_world(outward.x, outward.y, 0.0).coords;
        polygons.push(Polygon::flat(
            &[
                plane.to_world(p0.x, p0.y, w_min),
                plane.to_world(p1.x, p1.y, w_min),
                plane.to_world(p1.x, p1.y, w_max),
                plane.to_world(p0.x, p0.y, w_max),
            ],
            normal,
        ));
    }

    Ok(polygons)
}

/// Split an indexed mesh into one kernel polygon per triangle
///
/// Vertex normals are carried over when present and finite; otherwise the
/// face normal is used. Degenerate triangles are skipped.
pub fn mesh_to_polygons(mesh: &Mesh) -> Vec<Polygon> {
    let has_normals = mesh.normals.len() == mesh.positions.len();
    let mut polygons = Vec::with_capacity(mesh.triangle_count());

    for [i0, i1, i2] in mesh.triangles() {
        let (v0, v1, v2) = (mesh.position(i0), mesh.position(i1), mesh.position(i2));

        let face_normal = match (v1 - v0).cross(&(v2 - v0)).try_normalize(1e-10) {
            Some(n) => n,
            None => continue,
        };

        let normal_of = |i: usize| {
            if has_normals {
                let n = mesh.normal(i);
                if n.iter().all(|c| c.is_finite()) && n.norm_squared() > 0.0 {
                    return n;
                }
            }
            face_normal
        };

        polygons.push(Polygon::new([
            Vertex::new(v0, normal_of(i0)),
            Vertex::new(v1, normal_of(i1)),
            Vertex::new(v2, normal_of(i2)),
        ]));
    }

    polygons
}

/// Rebuild an indexed mesh from kernel polygons
///
/// Every polygon contributes its own vertices (no welding). Convex polygons
/// are fanned in their own vertex order; concave ones are ear-clipped. A
/// non-planar polygon means the kernel produced an invalid solid and fails the
/// whole conversion. When `uv` is given every vertex gets a planar UV.
pub fn polygons_to_mesh(
    polygons: &[Polygon],
    plane: SurfacePlane,
    uv: Option<&UvFrame>,
) -> Result<Mesh> {
    let mut mesh = Mesh::with_capacity(polygons.len() * 4, polygons.len() * 6);

    for polygon in polygons {
        let vertices = &polygon.vertices;
        if vertices.len() < 3 {
            continue;
        }

        let points = polygon.positions();
        if points.iter().any(|p| !p.coords.iter().all(|c| c.is_finite())) {
            return Err(Error::csg("kernel produced a non-finite vertex"));
        }

        let normal = match calculate_polygon_normal(&points) {
            Some(n) => n,
            None => continue,
        };

        let size = points
            .iter()
            .map(|p| (p - points[0]).norm())
            .fold(0.0, f64::max);
        let deviation = plane_deviation(&points, &normal);
        if deviation > PLANARITY_TOLERANCE * size.max(1.0) {
            return Err(Error::csg(format!(
                "kernel produced a non-planar polygon ({} vertices, deviation {:.3e})",
                points.len(),
                deviation
            )));
        }

        let (points_2d, _, _, _) = project_to_2d(&points, &normal);
        let indices = if is_convex(&points_2d) {
            let mut fan = fan_triangulate(points.len());
            orient_counter_clockwise(&points_2d, &mut fan);
            fan
        } else {
            ear_clip(&points_2d)?
        };

        let base_idx = mesh.vertex_count() as u32;
        for v in vertices {
            match uv {
                Some(frame) => {
                    let (local, _) = plane.to_local(&v.position);
                    mesh.add_vertex_uv(v.position, v.normal, frame.project(&local));
                }
                None => mesh.add_vertex(v.position, v.normal),
            }
        }

        for tri in indices.chunks_exact(3) {
            mesh.add_triangle(
                base_idx + tri[0] as u32,
                base_idx + tri[1] as u32,
                base_idx + tri[2] as u32,
            );
        }
    }

    Ok(mesh)
}

/// Ear-clip a concave kernel polygon, failing unless the triangles cover it
fn ear_clip(points: &[Point2<f64>]) -> Result<Vec<usize>> {
    let indices = triangulate_polygon(points)
        .map_err(|e| Error::csg(format!("kernel polygon could not be triangulated: {}", e)))?;

    let n = points.len();
    let area = (0..n)
        .map(|i| {
            let (p0, p1) = (points[i], points[(i + 1) % n]);
            p0.x * p1.y - p1.x * p0.y
        })
        .sum::<f64>()
        .abs()
        * 0.5;
    let covered: f64 = indices
        .chunks_exact(3)
        .map(|tri| {
            let (a, b, c) = (points[tri[0]], points[tri[1]], points[tri[2]]);
            ((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)).abs() * 0.5
        })
        .sum();

    if (covered - area).abs() > COVERAGE_TOLERANCE * area.max(1.0) {
        return Err(Error::csg(format!(
            "kernel polygon could not be triangulated ({} vertices, area {:.3e}, covered {:.3e})",
            n, area, covered
        )));
    }
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plane::panel_mesh;
    use surfclip_core::Bounds2;

    fn outward(polygon: &Polygon) -> bool {
        let points = polygon.positions();
        let normal = calculate_polygon_normal(&points).unwrap();
        normal.dot(&polygon.vertices[0].normal) > 0.99
    }

    #[test]
    fn test_cuboid_faces_point_outward() {
        let polygons = cuboid_polygons(Point3::new(1.0, 2.0, 3.0), Vector3::new(0.5, 1.0, 2.0));
        assert_eq!(polygons.len(), 6);
        assert!(polygons.iter().all(outward));
    }

    #[test]
    fn test_prism_faces_point_outward() {
        // Clockwise L outline
        let outline = ClipPolygon::new(
            "l",
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(0.0, 2.0),
                Point2::new(1.0, 2.0),
                Point2::new(1.0, 1.0),
                Point2::new(2.0, 1.0),
                Point2::new(2.0, 0.0),
            ],
        )
        .unwrap();
        for plane in [SurfacePlane::Wall, SurfacePlane::Floor] {
            let polygons = prism_polygons(&outline, plane, -1.0, 1.0).unwrap();
            // 4 cap triangles per side plus 6 walls
            assert_eq!(polygons.len(), 14);
            assert!(polygons.iter().all(outward));
        }
    }

    #[test]
    fn test_degenerate_prism_is_empty() {
        let outline = ClipPolygon::new(
            "line",
            vec![Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), Point2::new(2.0, 2.0)],
        )
        .unwrap();
        assert!(prism_polygons(&outline, SurfacePlane::Wall, -1.0, 1.0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_mesh_polygon_round_trip_keeps_attributes() {
        let bounds = Bounds2::centered(4.0, 2.0).unwrap();
        let mesh = panel_mesh(SurfacePlane::Wall, &bounds, -0.5, 0.5);

        let polygons = mesh_to_polygons(&mesh);
        assert_eq!(polygons.len(), mesh.triangle_count());

        let frame = UvFrame::from_bounds(&bounds);
        let rebuilt = polygons_to_mesh(&polygons, SurfacePlane::Wall, Some(&frame)).unwrap();
        assert_eq!(rebuilt.triangle_count(), mesh.triangle_count());
        assert_eq!(rebuilt.vertex_count(), mesh.triangle_count() * 3);
        assert!(rebuilt.has_uvs());
        assert!(rebuilt.validate().is_ok());

        for [a, b, c] in rebuilt.triangles() {
            let (pa, pb, pc) = (rebuilt.position(a), rebuilt.position(b), rebuilt.position(c));
            let geometric = (pb - pa).cross(&(pc - pa));
            assert!(geometric.dot(&rebuilt.normal(a)) > 0.0);
        }
    }

    #[test]
    fn test_non_planar_polygon_is_a_kernel_failure() {
        let warped = Polygon::flat(
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.5),
                Point3::new(0.0, 1.0, 0.0),
            ],
            Vector3::z(),
        );
        let result = polygons_to_mesh(&[warped], SurfacePlane::Wall, None);
        assert!(matches!(result, Err(Error::CsgFailure(_))));
    }

    #[test]
    fn test_concave_polygon_is_ear_clipped() {
        let l_shape = Polygon::flat(
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(2.0, 1.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(1.0, 2.0, 0.0),
                Point3::new(0.0, 2.0, 0.0),
            ],
            Vector3::z(),
        );
        let mesh = polygons_to_mesh(&[l_shape], SurfacePlane::Wall, None).unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.triangle_count(), 4);
    }

    #[test]
    fn test_untriangulable_polygon_is_a_kernel_failure() {
        // Planar but self-intersecting: its lobes have areas 6.4 and 0.4 with
        // opposite windings, which no set of its own corner triangles covers
        let crossed = Polygon::flat(
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(4.0, 0.0, 0.0),
                Point3::new(0.0, 4.0, 0.0),
                Point3::new(1.0, 4.0, 0.0),
            ],
            Vector3::z(),
        );
        let result = polygons_to_mesh(&[crossed], SurfacePlane::Wall, None);
        assert!(matches!(result, Err(Error::CsgFailure(_))));
    }

    #[test]
    fn test_csgrs_subtract_box_from_box() {
        let kernel = CsgrsKernel::new();
        let base = kernel
            .make_cuboid(Point3::origin(), Vector3::new(2.0, 2.0, 0.5))
            .unwrap();
        let cutter = kernel
            .make_cuboid(Point3::origin(), Vector3::new(0.5, 0.5, 5.0))
            .unwrap();

        let result = kernel.subtract(&base, &cutter).unwrap();
        let polygons = kernel.to_polygons(&result).unwrap();
        let mesh = polygons_to_mesh(&polygons, SurfacePlane::Wall, None).unwrap();

        let front_area: f64 = mesh
            .triangles()
            .filter(|&[a, _, _]| mesh.normal(a).z > 0.9)
            .map(|[a, b, c]| {
                let (pa, pb, pc) = (mesh.position(a), mesh.position(b), mesh.position(c));
                (pb - pa).cross(&(pc - pa)).norm() * 0.5
            })
            .sum();
        assert!((front_area - 15.0).abs() < 1e-3, "front area {}", front_area);
    }
}
