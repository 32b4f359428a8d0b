// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rendering-side hooks of a clippable surface

use crate::mask::AlphaMask;
use crate::mesh::Mesh;

/// What a renderer exposes for one surface
///
/// The clipping engine never owns renderer state; it reads the initial
/// geometry through this trait and pushes masks and replacement geometry back
/// through it.
pub trait SurfaceBinding {
    /// Current geometry of the surface
    fn geometry(&self) -> &Mesh;

    /// Replace the surface's geometry
    fn set_geometry(&mut self, mesh: Mesh);

    /// Bind `mask` as the surface material's alpha map
    fn bind_alpha_mask(&mut self, mask: &AlphaMask);

    /// Remove the alpha map
    fn unbind_alpha_mask(&mut self);

    /// Toggle alpha blending on the surface material
    fn set_transparent(&mut self, transparent: bool);
}

/// In-memory binding that keeps the last state pushed to it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBinding {
    pub mesh: Mesh,
    pub alpha_mask: Option<AlphaMask>,
    pub transparent: bool,
    /// Number of geometry replacements received
    pub geometry_updates: usize,
}

impl MeshBinding {
    pub fn new(mesh: Mesh) -> Self {
        Self {
            mesh,
            ..Self::default()
        }
    }
}

impl SurfaceBinding for MeshBinding {
    fn geometry(&self) -> &Mesh {
        &self.mesh
    }

    fn set_geometry(&mut self, mesh: Mesh) {
        self.mesh = mesh;
        self.geometry_updates += 1;
    }

    fn bind_alpha_mask(&mut self, mask: &AlphaMask) {
        match self.alpha_mask.as_mut() {
            Some(bound) => bound.clone_from(mask),
            None => self.alpha_mask = Some(mask.clone()),
        }
    }

    fn unbind_alpha_mask(&mut self) {
        self.alpha_mask = None;
    }

    fn set_transparent(&mut self, transparent: bool) {
        self.transparent = transparent;
    }
}
