// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Clip registry - the ordered clip-region list of one surface
//!
//! The registry only records intent. Every effective mutation bumps the
//! generation counter and marks the registry dirty; regenerating the mask or
//! geometry is the owner's job (see the `surface` module of the geometry crate).

use crate::error::{Error, Result};
use crate::interval::{free_intervals_in, FreeInterval};
use crate::rect::{Bounds2, ClipRectangle, ClipRegion, DEFAULT_PRECISION};
use crate::shape::ClipPolygon;
use nalgebra::Point2;
use rustc_hash::FxHashMap;
use tracing::trace;

/// How a surface turns its clip regions into something visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClipStrategy {
    /// Raster transparency mask over the unmodified mesh
    AlphaMask,
    /// Boolean subtraction producing new geometry
    Solid,
}

/// Immutable copy of a registry's regions, tagged with the generation it was
/// taken at. This is what rebuild jobs consume.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipSnapshot {
    pub generation: u64,
    pub bounds: Bounds2,
    pub rectangles: Vec<ClipRectangle>,
    pub shapes: Vec<ClipPolygon>,
}

impl ClipSnapshot {
    /// No rectangles and no shapes
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rectangles.is_empty() && self.shapes.is_empty()
    }
}

/// Ordered clip regions of a single surface
#[derive(Debug, Clone)]
pub struct ClipRegistry {
    rectangles: Vec<ClipRectangle>,
    shapes: Vec<ClipPolygon>,
    shape_index: FxHashMap<String, usize>,
    bounds: Bounds2,
    strategy: ClipStrategy,
    precision: f64,
    generation: u64,
    dirty: bool,
}

impl ClipRegistry {
    /// Create an empty registry for a surface with the given local bounds
    pub fn new(bounds: Bounds2, strategy: ClipStrategy) -> Self {
        Self {
            rectangles: Vec::new(),
            shapes: Vec::new(),
            shape_index: FxHashMap::default(),
            bounds,
            strategy,
            precision: DEFAULT_PRECISION,
            generation: 0,
            dirty: false,
        }
    }

    /// Override the rounding step (0 disables rounding)
    pub fn with_precision(mut self, precision: f64) -> Self {
        self.precision = precision;
        self
    }

    #[inline]
    pub fn bounds(&self) -> &Bounds2 {
        &self.bounds
    }

    #[inline]
    pub fn strategy(&self) -> ClipStrategy {
        self.strategy
    }

    /// Switch strategy; the surface must be regenerated afterwards
    pub fn set_strategy(&mut self, strategy: ClipStrategy) {
        if self.strategy != strategy {
            self.strategy = strategy;
            self.touch();
        }
    }

    /// Push an explicit rectangle. Corners may be given in any order; the
    /// stored rectangle is clamped into the bounds and snapped to the
    /// precision grid. Degenerate results are still recorded.
    pub fn push_rect(&mut self, min: Point2<f64>, max: Point2<f64>) -> Result<ClipRectangle> {
        self.push(ClipRegion::Rect { min, max })
    }

    /// Push a full-height cut covering `[min_x, max_x]`
    pub fn push_range(&mut self, min_x: f64, max_x: f64) -> Result<ClipRectangle> {
        self.push(ClipRegion::Range { min_x, max_x })
    }

    /// Push either form of clip request
    pub fn push(&mut self, region: ClipRegion) -> Result<ClipRectangle> {
        if !region.is_finite() {
            return Err(Error::NonFinite("clip rectangle"));
        }
        let raw = region.to_rectangle(&self.bounds);

        let rect = raw.normalized(&self.bounds, self.precision);
        if rect != raw {
            trace!(?raw, ?rect, "clip rectangle clamped");
        }

        self.rectangles.push(rect);
        self.touch();
        Ok(rect)
    }

    /// Remove the most recently pushed rectangle
    pub fn pop(&mut self) -> Option<ClipRectangle> {
        let rect = self.rectangles.pop()?;
        self.touch();
        Some(rect)
    }

    /// Replace the rectangle list with a snapshot of another registry's list
    pub fn copy_from(&mut self, source: &ClipRegistry) {
        self.rectangles = source
            .rectangles
            .iter()
            .map(|r| r.normalized(&self.bounds, self.precision))
            .collect();
        self.touch();
    }

    /// Remove every rectangle and shape
    pub fn clear(&mut self) {
        if self.rectangles.is_empty() && self.shapes.is_empty() {
            return;
        }
        self.rectangles.clear();
        self.shapes.clear();
        self.shape_index.clear();
        self.touch();
    }

    /// Add a free-form cutout, replacing any shape with the same id
    pub fn add_shape(&mut self, id: impl Into<String>, points: Vec<Point2<f64>>) -> Result<()> {
        let shape = ClipPolygon::new(id, points)?;
        match self.shape_index.get(&shape.id) {
            Some(&slot) => self.shapes[slot] = shape,
            None => {
                self.shape_index.insert(shape.id.clone(), self.shapes.len());
                self.shapes.push(shape);
            }
        }
        self.touch();
        Ok(())
    }

    /// Remove a shape by id. Unknown ids are ignored.
    pub fn remove_shape(&mut self, id: &str) -> Option<ClipPolygon> {
        let slot = self.shape_index.remove(id)?;
        let shape = self.shapes.remove(slot);
        for index in self.shape_index.values_mut() {
            if *index > slot {
                *index -= 1;
            }
        }
        self.touch();
        Some(shape)
    }

    pub fn shape(&self, id: &str) -> Option<&ClipPolygon> {
        self.shape_index.get(id).map(|&slot| &self.shapes[slot])
    }

    /// Shapes in insertion order
    #[inline]
    pub fn shapes(&self) -> &[ClipPolygon] {
        &self.shapes
    }

    /// Owned copy of the current rectangle list
    pub fn rectangles(&self) -> Vec<ClipRectangle> {
        self.rectangles.clone()
    }

    /// Borrowed view of the rectangle list in push order
    #[inline]
    pub fn as_rectangles(&self) -> &[ClipRectangle] {
        &self.rectangles
    }

    #[inline]
    pub fn rectangle_count(&self) -> usize {
        self.rectangles.len()
    }

    /// No rectangles and no shapes
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rectangles.is_empty() && self.shapes.is_empty()
    }

    /// Free spans along the primary axis
    pub fn areas(&self) -> Vec<FreeInterval> {
        free_intervals_in(
            &self.rectangles,
            self.bounds.min.x,
            self.bounds.max.x,
            self.bounds.height(),
        )
    }

    /// Copy of the regions tagged with the current generation
    pub fn snapshot(&self) -> ClipSnapshot {
        ClipSnapshot {
            generation: self.generation,
            bounds: self.bounds,
            rectangles: self.rectangles.clone(),
            shapes: self.shapes.clone(),
        }
    }

    /// Mutations since the last `mark_clean`
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Force a regeneration without changing any region
    pub fn touch(&mut self) {
        self.generation += 1;
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn registry() -> ClipRegistry {
        ClipRegistry::new(Bounds2::centered(500.0, 300.0).unwrap(), ClipStrategy::AlphaMask)
    }

    #[test]
    fn test_push_clamps_and_rounds() {
        let mut reg = registry();
        let rect = reg
            .push_rect(Point2::new(-20.004, -15.0), Point2::new(30.126, 320.0))
            .unwrap();
        assert_eq!(rect.min, Point2::new(-20.0, 0.0));
        assert_eq!(rect.max, Point2::new(30.13, 300.0));
        assert_eq!(reg.rectangles(), vec![rect]);
        assert!(reg.is_dirty());
    }

    #[test]
    fn test_push_then_pop_restores_list() {
        let mut reg = registry();
        reg.push_range(-200.0, -150.0).unwrap();
        reg.push_rect(Point2::new(0.0, 50.0), Point2::new(80.0, 200.0)).unwrap();
        let before = reg.rectangles();

        let pushed = reg.push_range(100.0, 160.0).unwrap();
        assert_eq!(reg.pop(), Some(pushed));
        assert_eq!(reg.rectangles(), before);
    }

    #[test]
    fn test_pop_empty_is_none_and_clean() {
        let mut reg = registry();
        assert_eq!(reg.pop(), None);
        assert!(!reg.is_dirty());
        assert_eq!(reg.generation(), 0);
    }

    #[test]
    fn test_degenerate_push_is_recorded() {
        let mut reg = registry();
        let rect = reg.push_range(400.0, 500.0).unwrap();
        assert!(rect.is_degenerate());
        assert_eq!(reg.rectangle_count(), 1);
        assert_eq!(reg.areas().len(), 1);
    }

    #[test]
    fn test_non_finite_push_rejected() {
        let mut reg = registry();
        assert!(reg.push_range(f64::NAN, 10.0).is_err());
        assert_eq!(reg.rectangle_count(), 0);
        assert!(!reg.is_dirty());
    }

    #[test]
    fn test_areas_for_centered_opening() {
        let mut reg = registry();
        reg.push_rect(Point2::new(-50.0, 0.0), Point2::new(50.0, 300.0)).unwrap();
        let areas = reg.areas();
        assert_eq!(areas.len(), 2);
        assert_relative_eq!(areas[0].width, 200.0);
        assert_relative_eq!(areas[0].center, -150.0);
        assert_relative_eq!(areas[1].width, 200.0);
        assert_relative_eq!(areas[1].center, 150.0);
        assert_relative_eq!(areas[0].height, 300.0);
    }

    #[test]
    fn test_copy_from_replaces_rectangles() {
        let mut source = registry();
        source.push_range(-10.0, 10.0).unwrap();
        source.push_range(50.0, 70.0).unwrap();

        let mut target = registry();
        target.push_range(-200.0, -100.0).unwrap();
        let generation = target.generation();
        target.copy_from(&source);

        assert_eq!(target.rectangles(), source.rectangles());
        assert_eq!(target.generation(), generation + 1);
    }

    #[test]
    fn test_shapes_by_id() {
        let mut reg = registry();
        let tri = vec![Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), Point2::new(5.0, 10.0)];
        reg.add_shape("a", tri.clone()).unwrap();
        reg.add_shape("b", tri.clone()).unwrap();
        reg.add_shape("c", tri.clone()).unwrap();

        assert!(reg.remove_shape("b").is_some());
        assert_eq!(reg.shapes().len(), 2);
        assert_eq!(reg.shape("c").map(|s| s.id.as_str()), Some("c"));

        let generation = reg.generation();
        assert!(reg.remove_shape("missing").is_none());
        assert_eq!(reg.generation(), generation);
    }

    #[test]
    fn test_add_shape_replaces_same_id() {
        let mut reg = registry();
        reg.add_shape("w1", vec![Point2::new(0.0, 0.0)]).unwrap();
        reg.add_shape("w1", vec![Point2::new(1.0, 1.0), Point2::new(2.0, 2.0)]).unwrap();
        assert_eq!(reg.shapes().len(), 1);
        assert_eq!(reg.shape("w1").unwrap().points.len(), 2);
    }

    #[test]
    fn test_snapshot_carries_generation() {
        let mut reg = registry();
        reg.push_range(0.0, 10.0).unwrap();
        reg.mark_clean();
        let snap = reg.snapshot();
        assert_eq!(snap.generation, reg.generation());
        assert_eq!(snap.rectangles.len(), 1);
        assert!(!reg.is_dirty());

        reg.clear();
        assert!(reg.is_empty());
        assert!(reg.snapshot().generation > snap.generation);
    }
}
