// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar UV re-projection for clipped geometry
//!
//! UVs do not survive the CSG pipeline. Instead, two reference samples are
//! captured once from the pristine mesh: the surface-local position where
//! `(u, v) = (0, 0)` and the one where `(u, v) = (1, 1)`. Every output vertex
//! is then mapped linearly between them, so texturing stays continuous no
//! matter how many cuts are applied.

use crate::mesh::Mesh;
use crate::plane::SurfacePlane;
use nalgebra::Point2;
use surfclip_core::Bounds2;

/// Minimum spread between the samples of one axis
const SAMPLE_EPSILON: f64 = 1e-9;

/// Reference samples for planar UV mapping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvFrame {
    /// Local position mapping to UV (0, 0)
    pub origin: Point2<f64>,
    /// Local position mapping to UV (1, 1)
    pub extent: Point2<f64>,
}

impl UvFrame {
    /// Frame that maps `bounds` onto the unit square
    pub fn from_bounds(bounds: &Bounds2) -> Self {
        Self {
            origin: bounds.min,
            extent: bounds.max,
        }
    }

    /// Capture the frame from a mesh's own UV attribute
    ///
    /// Only front-facing vertices are sampled when there are any, so side faces
    /// with their own unwrap cannot skew the fit. Returns `None` if the mesh has
    /// no UVs or they do not vary along both axes.
    pub fn capture(mesh: &Mesh, plane: SurfacePlane) -> Option<Self> {
        if !mesh.has_uvs() {
            return None;
        }

        let front = plane.normal();
        let facing: Vec<usize> = (0..mesh.vertex_count())
            .filter(|&i| mesh.normal(i).dot(&front) > 0.9)
            .collect();
        let samples: Vec<(Point2<f64>, Point2<f64>)> = if facing.is_empty() {
            (0..mesh.vertex_count())
                .filter_map(|i| Some((plane.to_local(&mesh.position(i)).0, mesh.uv(i)?)))
                .collect()
        } else {
            facing
                .into_iter()
                .filter_map(|i| Some((plane.to_local(&mesh.position(i)).0, mesh.uv(i)?)))
                .collect()
        };

        let (u0, u1) = fit_axis(&samples, |(p, uv)| (p.x, uv.x))?;
        let (v0, v1) = fit_axis(&samples, |(p, uv)| (p.y, uv.y))?;

        Some(Self {
            origin: Point2::new(u0, v0),
            extent: Point2::new(u1, v1),
        })
    }

    /// UV of a surface-local position
    #[inline]
    pub fn project(&self, local: &Point2<f64>) -> Point2<f64> {
        Point2::new(
            (local.x - self.origin.x) / (self.extent.x - self.origin.x),
            (local.y - self.origin.y) / (self.extent.y - self.origin.y),
        )
    }
}

/// Positions along one axis where the texture coordinate reaches 0 and 1,
/// extrapolated from the samples with the smallest and largest coordinate
fn fit_axis<F>(samples: &[(Point2<f64>, Point2<f64>)], pick: F) -> Option<(f64, f64)>
where
    F: Fn(&(Point2<f64>, Point2<f64>)) -> (f64, f64),
{
    let mut lo: Option<(f64, f64)> = None;
    let mut hi: Option<(f64, f64)> = None;
    for sample in samples {
        let (pos, t) = pick(sample);
        if lo.map_or(true, |(_, lt)| t < lt) {
            lo = Some((pos, t));
        }
        if hi.map_or(true, |(_, ht)| t > ht) {
            hi = Some((pos, t));
        }
    }

    let (p_lo, t_lo) = lo?;
    let (p_hi, t_hi) = hi?;
    if (t_hi - t_lo).abs() < SAMPLE_EPSILON || (p_hi - p_lo).abs() < SAMPLE_EPSILON {
        return None;
    }

    let slope = (p_hi - p_lo) / (t_hi - t_lo);
    Some((p_lo - t_lo * slope, p_lo + (1.0 - t_lo) * slope))
}
