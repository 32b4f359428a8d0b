// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surfclip Geometry
//!
//! Turns clip registries into something a renderer can draw: an alpha mask
//! rasterized with the image crate, or new geometry cut with csgrs and
//! re-triangulated with earcutr.

pub mod binding;
pub mod csg;
pub mod error;
pub mod mask;
pub mod mesh;
pub mod plane;
pub mod rebuild;
pub mod solid;
pub mod surface;
pub mod triangulation;
pub mod uv;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector3};

pub use binding::{MeshBinding, SurfaceBinding};
pub use csg::{CsgrsKernel, Polygon, SolidKernel, Vertex};
pub use error::{Error, Result};
pub use mask::{mask_size, AlphaMask, MaskRasterizer};
pub use mesh::Mesh;
pub use plane::{panel_mesh, SurfacePlane};
pub use rebuild::{CancelToken, RebuildOutcome, RebuildSlot, SolidRebuilder};
pub use solid::SolidClipper;
pub use surface::{ClippableSurface, FlushPolicy};
pub use triangulation::triangulate_polygon;
pub use uv::UvFrame;

pub use surfclip_core::{
    Bounds2, ClipConfig, ClipPolygon, ClipRectangle, ClipRegion, ClipRegistry, ClipSnapshot,
    ClipStrategy, FreeInterval,
};
