// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Free-form clip shapes

use crate::error::{Error, Result};
use nalgebra::Point2;

/// Named free-form cutout in surface-local coordinates
///
/// The polygon is implicitly closed. Zero-area polygons are allowed and clip
/// nothing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClipPolygon {
    pub id: String,
    pub points: Vec<Point2<f64>>,
}

impl ClipPolygon {
    /// Create a shape, rejecting non-finite coordinates
    pub fn new(id: impl Into<String>, points: Vec<Point2<f64>>) -> Result<Self> {
        let id = id.into();
        if let Some(bad) = points.iter().position(|p| !(p.x.is_finite() && p.y.is_finite())) {
            return Err(Error::InvalidShape {
                id,
                reason: format!("point {} is not finite", bad),
            });
        }
        Ok(Self { id, points })
    }

    /// Signed area (shoelace). Positive for counter-clockwise winding.
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..n {
            let p0 = &self.points[i];
            let p1 = &self.points[(i + 1) % n];
            sum += p0.x * p1.y - p1.x * p0.y;
        }
        sum * 0.5
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    #[inline]
    pub fn is_counter_clockwise(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Fewer than three points or zero enclosed area
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 3 || self.area() <= f64::EPSILON
    }

    /// Points in counter-clockwise order
    pub fn counter_clockwise_points(&self) -> Vec<Point2<f64>> {
        let mut points = self.points.clone();
        if self.signed_area() < 0.0 {
            points.reverse();
        }
        points
    }
}
