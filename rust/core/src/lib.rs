// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Surfclip Core
//!
//! Clip regions and their bookkeeping for cuttable surfaces (walls, floors,
//! truss panels). This crate has no mesh or raster dependency:
//!
//! - **Clip primitives**: [`ClipRectangle`] and [`ClipPolygon`] in surface-local 2D
//! - **Interval algebra**: [`free_intervals`] computes the uncut spans of a surface
//! - **Clip registry**: [`ClipRegistry`] owns the ordered region list of one surface
//! - **Configuration**: [`ClipConfig`] loaded from defaults or the environment
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use surfclip_core::{Bounds2, ClipRegistry, ClipStrategy, Point2};
//!
//! let bounds = Bounds2::new(Point2::new(-250.0, 0.0), Point2::new(250.0, 300.0))?;
//! let mut registry = ClipRegistry::new(bounds, ClipStrategy::AlphaMask);
//! registry.push_range(-50.0, 50.0)?;
//!
//! for span in registry.areas() {
//!     println!("free span {:.2} wide at {:.2}", span.width, span.center);
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization support for clip primitives and configuration

pub mod config;
pub mod error;
pub mod interval;
pub mod rect;
pub mod registry;
pub mod shape;

pub use nalgebra::Point2;

pub use config::{ClipConfig, MAX_MASK_SIZE};
pub use error::{Error, Result};
pub use interval::{free_intervals, free_intervals_in, merge_spans, FreeInterval};
pub use rect::{round_to_step, Bounds2, ClipRectangle, ClipRegion};
pub use registry::{ClipRegistry, ClipSnapshot, ClipStrategy};
pub use shape::ClipPolygon;
