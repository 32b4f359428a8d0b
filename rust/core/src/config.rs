// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Clipping configuration loaded from defaults or environment variables.

use crate::error::{Error, Result};
use crate::rect::DEFAULT_PRECISION;
use std::time::Duration;

/// Largest alpha mask side accepted in pixels.
pub const MAX_MASK_SIZE: u32 = 16384;

/// Clipping configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClipConfig {
    /// Rounding step applied to pushed rectangle coordinates.
    pub precision: f64,
    /// Half depth of solid cutters; must exceed any surface thickness.
    pub cutter_depth: f64,
    /// Smallest alpha mask side in pixels.
    pub min_mask_size: u32,
    /// Largest alpha mask side in pixels.
    pub max_mask_size: u32,
    /// Mask pixels per surface unit before power-of-two rounding.
    pub pixels_per_unit: f64,
    /// Quiet period before a debounced flush runs, in milliseconds.
    pub debounce_ms: u64,
}

impl ClipConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::defaults();
        Self {
            precision: env_or("SURFCLIP_PRECISION", defaults.precision),
            cutter_depth: env_or("SURFCLIP_CUTTER_DEPTH", defaults.cutter_depth),
            min_mask_size: env_or("SURFCLIP_MIN_MASK_SIZE", defaults.min_mask_size),
            max_mask_size: env_or("SURFCLIP_MAX_MASK_SIZE", defaults.max_mask_size),
            pixels_per_unit: env_or("SURFCLIP_PIXELS_PER_UNIT", defaults.pixels_per_unit),
            debounce_ms: env_or("SURFCLIP_DEBOUNCE_MS", defaults.debounce_ms),
        }
    }

    /// Built-in defaults, ignoring the environment.
    pub fn defaults() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            cutter_depth: 20.0,
            min_mask_size: 2,
            max_mask_size: 4096,
            pixels_per_unit: 1.0,
            debounce_ms: 120,
        }
    }

    /// Quiet period for debounced flushing.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.precision.is_finite() && self.precision >= 0.0) {
            return Err(Error::InvalidConfig(format!("precision {} must be >= 0", self.precision)));
        }
        if !(self.cutter_depth.is_finite() && self.cutter_depth > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "cutter depth {} must be positive",
                self.cutter_depth
            )));
        }
        if self.min_mask_size < 2
            || self.min_mask_size > self.max_mask_size
            || self.max_mask_size > MAX_MASK_SIZE
        {
            return Err(Error::InvalidConfig(format!(
                "mask size range {}..={} is invalid (sides must lie in 2..={})",
                self.min_mask_size, self.max_mask_size, MAX_MASK_SIZE
            )));
        }
        if !(self.pixels_per_unit.is_finite() && self.pixels_per_unit > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "pixels per unit {} must be positive",
                self.pixels_per_unit
            )));
        }
        Ok(())
    }
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
