// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis-aligned clip rectangles and surface bounds
//!
//! All coordinates are surface-local: `x` runs along the horizontal extent of
//! the surface, `y` along its vertical extent (walls) or depth (floors).

use crate::error::{Error, Result};
use nalgebra::Point2;

/// Default rounding step for clip coordinates (two decimals, centimetres)
pub const DEFAULT_PRECISION: f64 = 0.01;

/// Round a value to the nearest multiple of `step`
///
/// Rounds through the reciprocal so that a step of 0.01 yields the closest
/// two-decimal f64 rather than an accumulated `n * 0.01` product.
#[inline]
pub fn round_to_step(value: f64, step: f64) -> f64 {
    if step <= 0.0 || !step.is_finite() {
        return value;
    }
    let scale = 1.0 / step;
    (value * scale).round() / scale
}

/// Axis-aligned bounds of a surface in its local 2D coordinate system
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds2 {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl Bounds2 {
    /// Create bounds, rejecting non-finite or inverted corners
    pub fn new(min: Point2<f64>, max: Point2<f64>) -> Result<Self> {
        if !(min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite()) {
            return Err(Error::NonFinite("surface bounds"));
        }
        if min.x > max.x || min.y > max.y {
            return Err(Error::InvalidBounds(format!(
                "min ({}, {}) exceeds max ({}, {})",
                min.x, min.y, max.x, max.y
            )));
        }
        Ok(Self { min, max })
    }

    /// Bounds horizontally centred on the origin, vertically anchored at zero.
    /// This is the layout of a wall panel.
    pub fn centered(width: f64, height: f64) -> Result<Self> {
        Self::new(
            Point2::new(-width * 0.5, 0.0),
            Point2::new(width * 0.5, height),
        )
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn center(&self) -> Point2<f64> {
        Point2::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
        )
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Clamp a point into the bounds
    #[inline]
    pub fn clamp_point(&self, point: Point2<f64>) -> Point2<f64> {
        Point2::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
        )
    }
}

/// A rectangular clip region
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClipRectangle {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl ClipRectangle {
    /// Create a rectangle from two corners in any order
    pub fn new(a: Point2<f64>, b: Point2<f64>) -> Self {
        Self {
            min: Point2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Create a rectangle from its centre and full size
    pub fn from_center(center: Point2<f64>, width: f64, height: f64) -> Self {
        let hw = width.abs() * 0.5;
        let hh = height.abs() * 0.5;
        Self {
            min: Point2::new(center.x - hw, center.y - hh),
            max: Point2::new(center.x + hw, center.y + hh),
        }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn center(&self) -> Point2<f64> {
        Point2::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
        )
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// True if the rectangle has zero extent on either axis
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Projection onto the primary (horizontal) axis
    #[inline]
    pub fn projection(&self) -> (f64, f64) {
        (self.min.x, self.max.x)
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.min.x.is_finite() && self.min.y.is_finite() && self.max.x.is_finite() && self.max.y.is_finite()
    }

    /// Clamp both corners into `bounds`
    pub fn clamped(&self, bounds: &Bounds2) -> Self {
        Self {
            min: bounds.clamp_point(self.min),
            max: bounds.clamp_point(self.max),
        }
    }

    /// Snap both corners to multiples of `step`
    pub fn rounded(&self, step: f64) -> Self {
        Self {
            min: Point2::new(round_to_step(self.min.x, step), round_to_step(self.min.y, step)),
            max: Point2::new(round_to_step(self.max.x, step), round_to_step(self.max.y, step)),
        }
    }

    /// Clamp, snap, and clamp again so off-grid bounds still contain the result
    pub fn normalized(&self, bounds: &Bounds2, step: f64) -> Self {
        self.clamped(bounds).rounded(step).clamped(bounds)
    }
}

/// A clip request: either a full-height range along the primary axis or an
/// explicit rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClipRegion {
    /// Horizontal range spanning the whole surface height
    Range { min_x: f64, max_x: f64 },
    /// Explicit rectangle
    Rect { min: Point2<f64>, max: Point2<f64> },
}

impl ClipRegion {
    /// All coordinates are finite
    pub fn is_finite(&self) -> bool {
        match *self {
            ClipRegion::Range { min_x, max_x } => min_x.is_finite() && max_x.is_finite(),
            ClipRegion::Rect { min, max } => {
                min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite()
            }
        }
    }

    /// Resolve to a rectangle against the surface bounds
    pub fn to_rectangle(&self, bounds: &Bounds2) -> ClipRectangle {
        match *self {
            ClipRegion::Range { min_x, max_x } => ClipRectangle::new(
                Point2::new(min_x, bounds.min.y),
                Point2::new(max_x, bounds.max.y),
            ),
            ClipRegion::Rect { min, max } => ClipRectangle::new(min, max),
        }
    }
}

impl From<ClipRectangle> for ClipRegion {
    fn from(rect: ClipRectangle) -> Self {
        ClipRegion::Rect {
            min: rect.min,
            max: rect.max,
        }
    }
}
