// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Clippable surface - registry, strategy dispatch and flushing
//!
//! A [`ClippableSurface`] owns the clip registry of one renderer surface and
//! keeps the surface's visible state in sync with it. Mutations only mark the
//! registry dirty; the [`FlushPolicy`] decides when the configured
//! [`ClipStrategy`] regenerates the mask or the geometry.
//!
//! Solid rebuilds run on the rayon pool. Their outcome is applied by
//! [`ClippableSurface::publish`] only if nothing changed since the rebuild
//! was started, so a slow rebuild can never overwrite a newer state.

use crate::binding::SurfaceBinding;
use crate::csg::{CsgrsKernel, SolidKernel};
use crate::error::{Error, Result};
use crate::mask::{AlphaMask, MaskRasterizer};
use crate::mesh::Mesh;
use crate::plane::SurfacePlane;
use crate::rebuild::{RebuildOutcome, SolidRebuilder};
use crate::solid::SolidClipper;
use nalgebra::Point2;
use std::time::{Duration, Instant};
use surfclip_core::{
    Bounds2, ClipConfig, ClipPolygon, ClipRectangle, ClipRegion, ClipRegistry, ClipStrategy,
    FreeInterval,
};
use tracing::{debug, warn};

/// When a dirty surface is regenerated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushPolicy {
    /// Regenerate before every mutation returns; solid rebuilds block
    #[default]
    Immediate,
    /// Only on an explicit [`ClippableSurface::flush`]
    Manual,
    /// On [`ClippableSurface::tick`], once no mutation happened for the delay
    Debounced(Duration),
}

impl FlushPolicy {
    /// Debounced with the configured delay
    pub fn debounced(config: &ClipConfig) -> Self {
        FlushPolicy::Debounced(config.debounce())
    }
}

/// One clippable renderer surface
pub struct ClippableSurface<B: SurfaceBinding, K: SolidKernel = CsgrsKernel> {
    registry: ClipRegistry,
    binding: B,
    policy: FlushPolicy,
    mask: AlphaMask,
    rasterizer: MaskRasterizer,
    rebuilder: SolidRebuilder<K>,
    last_mutation: Option<Instant>,
    last_error: Option<Error>,
    mask_bound: bool,
    geometry_clipped: bool,
}

impl<B: SurfaceBinding> ClippableSurface<B, CsgrsKernel> {
    /// Surface clipped with the csgrs kernel
    pub fn new(
        binding: B,
        plane: SurfacePlane,
        strategy: ClipStrategy,
        config: &ClipConfig,
    ) -> Result<Self> {
        Self::with_kernel(binding, plane, strategy, config, CsgrsKernel::new())
    }
}

impl<B, K> ClippableSurface<B, K>
where
    B: SurfaceBinding,
    K: SolidKernel + 'static,
{
    /// Wrap a bound surface. Its current geometry becomes the pristine mesh
    /// every solid clip starts from, and its extent in `plane` becomes the
    /// registry bounds.
    pub fn with_kernel(
        binding: B,
        plane: SurfacePlane,
        strategy: ClipStrategy,
        config: &ClipConfig,
        kernel: K,
    ) -> Result<Self> {
        config.validate()?;

        let clipper = SolidClipper::new(kernel, binding.geometry().clone(), plane, config)?;
        let bounds = *clipper.bounds();
        let mask = AlphaMask::for_surface(&bounds, config);

        debug!(
            ?plane,
            ?strategy,
            width = bounds.width(),
            height = bounds.height(),
            mask_width = mask.width(),
            mask_height = mask.height(),
            "clippable surface ready"
        );

        Ok(Self {
            registry: ClipRegistry::new(bounds, strategy).with_precision(config.precision),
            binding,
            policy: FlushPolicy::default(),
            mask,
            rasterizer: MaskRasterizer::new(bounds),
            rebuilder: SolidRebuilder::new(clipper),
            last_mutation: None,
            last_error: None,
            mask_bound: false,
            geometry_clipped: false,
        })
    }

    pub fn with_policy(mut self, policy: FlushPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[inline]
    pub fn policy(&self) -> FlushPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: FlushPolicy) {
        self.policy = policy;
    }

    // ---- Mutations ----

    /// Push an explicit rectangle, see [`ClipRegistry::push_rect`]
    pub fn push_rect(&mut self, min: Point2<f64>, max: Point2<f64>) -> Result<ClipRectangle> {
        let rect = self.registry.push_rect(min, max)?;
        self.mutated()?;
        Ok(rect)
    }

    /// Push a full-height cut, see [`ClipRegistry::push_range`]
    pub fn push_range(&mut self, min_x: f64, max_x: f64) -> Result<ClipRectangle> {
        let rect = self.registry.push_range(min_x, max_x)?;
        self.mutated()?;
        Ok(rect)
    }

    pub fn push(&mut self, region: ClipRegion) -> Result<ClipRectangle> {
        let rect = self.registry.push(region)?;
        self.mutated()?;
        Ok(rect)
    }

    /// Remove the most recent rectangle. Popping an empty list changes nothing.
    pub fn pop(&mut self) -> Result<Option<ClipRectangle>> {
        let rect = self.registry.pop();
        if rect.is_some() {
            self.mutated()?;
        }
        Ok(rect)
    }

    /// Replace the rectangle list with another registry's list
    pub fn copy_from(&mut self, source: &ClipRegistry) -> Result<()> {
        self.registry.copy_from(source);
        self.mutated()
    }

    pub fn add_shape(&mut self, id: impl Into<String>, points: Vec<Point2<f64>>) -> Result<()> {
        self.registry.add_shape(id, points)?;
        self.mutated()
    }

    /// Remove a shape by id. Unknown ids change nothing.
    pub fn remove_shape(&mut self, id: &str) -> Result<Option<ClipPolygon>> {
        let shape = self.registry.remove_shape(id);
        if shape.is_some() {
            self.mutated()?;
        }
        Ok(shape)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.registry.clear();
        self.mutated()
    }

    pub fn set_strategy(&mut self, strategy: ClipStrategy) -> Result<()> {
        self.registry.set_strategy(strategy);
        self.mutated()
    }

    fn mutated(&mut self) -> Result<()> {
        if !self.registry.is_dirty() {
            return Ok(());
        }
        self.last_mutation = Some(Instant::now());
        match self.policy {
            FlushPolicy::Immediate => self.flush_blocking(),
            FlushPolicy::Manual | FlushPolicy::Debounced(_) => Ok(()),
        }
    }

    // ---- Queries ----

    #[inline]
    pub fn registry(&self) -> &ClipRegistry {
        &self.registry
    }

    /// Free spans along the surface's primary axis
    pub fn areas(&self) -> Vec<FreeInterval> {
        self.registry.areas()
    }

    /// Snapshot of the rectangle list
    pub fn rectangles(&self) -> Vec<ClipRectangle> {
        self.registry.rectangles()
    }

    #[inline]
    pub fn shapes(&self) -> &[ClipPolygon] {
        self.registry.shapes()
    }

    #[inline]
    pub fn bounds(&self) -> &Bounds2 {
        self.registry.bounds()
    }

    #[inline]
    pub fn strategy(&self) -> ClipStrategy {
        self.registry.strategy()
    }

    #[inline]
    pub fn binding(&self) -> &B {
        &self.binding
    }

    pub fn into_binding(self) -> B {
        self.binding
    }

    /// The mask as last rasterized
    #[inline]
    pub fn mask(&self) -> &AlphaMask {
        &self.mask
    }

    /// Pristine geometry solid clips start from
    #[inline]
    pub fn original_geometry(&self) -> &Mesh {
        self.rebuilder.clipper().original()
    }

    /// Mutations not yet regenerated
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.registry.is_dirty()
    }

    /// A solid rebuild was started and its outcome not yet collected
    #[inline]
    pub fn is_rebuilding(&self) -> bool {
        self.rebuilder.in_flight().is_some()
    }

    /// Failure of the most recent solid rebuild, cleared by the next success
    #[inline]
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    // ---- Regeneration ----

    /// Regenerate if dirty. Alpha masks are repainted synchronously; solid
    /// rebuilds are started in the background and applied by [`Self::publish`].
    pub fn flush(&mut self) -> Result<()> {
        if !self.registry.is_dirty() {
            return Ok(());
        }

        match self.registry.strategy() {
            ClipStrategy::AlphaMask => {
                self.rebuilder.cancel();
                self.apply_mask();
                self.registry.mark_clean();
            }
            ClipStrategy::Solid => {
                self.detach_mask();
                let snapshot = self.registry.snapshot();
                self.registry.mark_clean();
                self.rebuilder.spawn(snapshot);
            }
        }
        Ok(())
    }

    /// Regenerate if dirty, running solid rebuilds on the calling thread
    ///
    /// A failed solid rebuild leaves the previous geometry bound and returns
    /// [`Error::CsgFailure`].
    pub fn flush_blocking(&mut self) -> Result<()> {
        if !self.registry.is_dirty() {
            return Ok(());
        }

        match self.registry.strategy() {
            ClipStrategy::AlphaMask => self.flush(),
            ClipStrategy::Solid => {
                self.detach_mask();
                let snapshot = self.registry.snapshot();
                self.registry.mark_clean();
                let outcome = self.rebuilder.run_blocking(&snapshot);
                self.apply_outcome(outcome).map(|_| ())
            }
        }
    }

    /// Flush a debounced surface whose last mutation is at least the delay
    /// before `now`, then publish any finished rebuild. Returns `true` if
    /// anything was flushed or published.
    pub fn tick(&mut self, now: Instant) -> Result<bool> {
        let mut flushed = false;
        if let FlushPolicy::Debounced(delay) = self.policy {
            let quiet = self
                .last_mutation
                .map_or(true, |at| now.saturating_duration_since(at) >= delay);
            if self.registry.is_dirty() && quiet {
                self.flush()?;
                flushed = true;
            }
        }

        let published = self.publish()?;
        Ok(flushed || published)
    }

    /// Apply a finished solid rebuild if it is still current
    ///
    /// Returns `Ok(true)` when new geometry was bound, `Ok(false)` when there
    /// was nothing to apply or the outcome was stale, and the rebuild's error
    /// when it failed.
    pub fn publish(&mut self) -> Result<bool> {
        match self.rebuilder.poll() {
            Some(outcome) => self.apply_outcome(outcome),
            None => Ok(false),
        }
    }

    /// Block until the running solid rebuild finishes, then publish it
    ///
    /// Outcomes of superseded jobs that are still in the slot are skipped.
    pub fn wait_for_rebuild(&mut self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        while self.rebuilder.in_flight().is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let Some(outcome) = self.rebuilder.wait(remaining) else {
                return Ok(false);
            };
            if self.rebuilder.in_flight().is_none() {
                return self.apply_outcome(outcome);
            }
            debug!(generation = outcome.generation, "skipping superseded rebuild");
        }
        self.publish()
    }

    fn apply_mask(&mut self) {
        let painted = self.rasterizer.rasterize(
            &mut self.mask,
            self.registry.as_rectangles(),
            self.registry.shapes(),
        );

        if self.geometry_clipped {
            self.binding
                .set_geometry(self.rebuilder.clipper().original().clone());
            self.geometry_clipped = false;
        }

        if painted {
            self.binding.bind_alpha_mask(&self.mask);
            self.binding.set_transparent(true);
            self.mask_bound = true;
        } else {
            self.detach_mask();
        }

        debug!(
            generation = self.registry.generation(),
            cut_pixels = self.mask.transparent_pixel_count(),
            "alpha mask regenerated"
        );
    }

    fn detach_mask(&mut self) {
        if self.mask_bound {
            self.binding.unbind_alpha_mask();
            self.binding.set_transparent(false);
            self.mask_bound = false;
        }
    }

    fn apply_outcome(&mut self, outcome: RebuildOutcome) -> Result<bool> {
        let RebuildOutcome { generation, result } = outcome;
        let current = self.registry.generation();
        if generation != current || self.registry.strategy() != ClipStrategy::Solid {
            debug!(generation, current, "discarding stale solid rebuild");
            return Ok(false);
        }

        match result {
            Ok(mesh) => {
                debug!(
                    generation,
                    triangles = mesh.triangle_count(),
                    "publishing solid rebuild"
                );
                self.binding.set_geometry(mesh);
                self.geometry_clipped = true;
                self.last_error = None;
                Ok(true)
            }
            Err(Error::Cancelled) => Ok(false),
            Err(error) => {
                warn!(generation, %error, "solid clip failed, keeping previous geometry");
                self.last_error = Some(error.clone());
                Err(error)
            }
        }
    }
}

impl<B, K> std::fmt::Debug for ClippableSurface<B, K>
where
    B: SurfaceBinding,
    K: SolidKernel,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClippableSurface")
            .field("registry", &self.registry)
            .field("policy", &self.policy)
            .field("mask_bound", &self.mask_bound)
            .field("geometry_clipped", &self.geometry_clipped)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}
