// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Alpha-mask rasterization
//!
//! Clip regions are painted into a single-channel power-of-two raster that the
//! renderer binds as the surface's alpha map: 255 keeps a texel, 0 cuts it.
//! This is a visual approximation only; cut edges snap to whole pixels.
//!
//! Pixel mapping for a surface with local bounds `B` and a `tw × th` mask:
//!
//! ```text
//! px = (x - B.min.x) / B.width  * tw      (tw * 0.5 + x / width * tw when centred)
//! py = (B.max.y - y) / B.height * th      (raster origin is top-left)
//! ```

use image::{GrayImage, Luma};
use nalgebra::Point2;
use surfclip_core::{Bounds2, ClipConfig, ClipPolygon, ClipRectangle, MAX_MASK_SIZE};

/// Owned raster transparency mask
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaMask {
    image: GrayImage,
}

impl AlphaMask {
    /// Texel kept
    pub const OPAQUE: u8 = 255;
    /// Texel cut away
    pub const CUT: u8 = 0;

    /// Fully opaque mask of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::from_pixel(width.max(1), height.max(1), Luma([Self::OPAQUE])),
        }
    }

    /// Fully opaque mask sized for a surface
    pub fn for_surface(bounds: &Bounds2, config: &ClipConfig) -> Self {
        Self::new(
            mask_size(bounds.width(), config),
            mask_size(bounds.height(), config),
        )
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Pixel value, `None` outside the raster
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        self.image.get_pixel_checked(x, y).map(|p| p.0[0])
    }

    /// Overwrite every pixel
    pub fn fill(&mut self, value: u8) {
        self.image.pixels_mut().for_each(|p| p.0[0] = value);
    }

    /// Fill the half-open pixel rectangle `[x0, x1) × [y0, y1)`, clipped to
    /// the raster
    pub fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, value: u8) {
        let (w, h) = (self.width() as i64, self.height() as i64);
        let (x0, x1) = (x0.clamp(0, w), x1.clamp(0, w));
        let (y0, y1) = (y0.clamp(0, h), y1.clamp(0, h));
        for y in y0..y1 {
            for x in x0..x1 {
                self.image.put_pixel(x as u32, y as u32, Luma([value]));
            }
        }
    }

    /// Fill a closed polygon given in pixel coordinates (even-odd rule,
    /// sampled at pixel centres)
    pub fn fill_path(&mut self, path: &[Point2<f64>], value: u8) {
        if path.len() < 3 {
            return;
        }

        let (min_y, max_y) = path
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
        let row_start = ((min_y - 0.5).ceil().max(0.0)) as i64;
        let row_end = ((max_y - 0.5).ceil().min(self.height() as f64)) as i64;

        let mut crossings: Vec<f64> = Vec::with_capacity(path.len());
        for row in row_start..row_end {
            let yc = row as f64 + 0.5;
            crossings.clear();

            for i in 0..path.len() {
                let a = path[i];
                let b = path[(i + 1) % path.len()];
                if (a.y <= yc && yc < b.y) || (b.y <= yc && yc < a.y) {
                    crossings.push(a.x + (yc - a.y) * (b.x - a.x) / (b.y - a.y));
                }
            }
            crossings.sort_by(f64::total_cmp);

            for span in crossings.chunks_exact(2) {
                let x0 = (span[0] - 0.5).ceil() as i64;
                let x1 = (span[1] - 0.5).ceil() as i64;
                self.fill_rect(x0, row, x1, row + 1, value);
            }
        }
    }

    /// Number of cut pixels
    pub fn transparent_pixel_count(&self) -> usize {
        self.image.pixels().filter(|p| p.0[0] != Self::OPAQUE).count()
    }

    /// Fraction of the raster that is cut
    pub fn coverage(&self) -> f64 {
        self.transparent_pixel_count() as f64 / (self.width() as f64 * self.height() as f64)
    }

    /// Row-major bytes, ready for texture upload
    #[inline]
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    #[inline]
    pub fn image(&self) -> &GrayImage {
        &self.image
    }
}

/// Power-of-two mask side covering `extent` surface units
///
/// Never exceeds [`MAX_MASK_SIZE`], whatever the configured range.
pub fn mask_size(extent: f64, config: &ClipConfig) -> u32 {
    let min = config
        .min_mask_size
        .clamp(2, MAX_MASK_SIZE)
        .next_power_of_two();
    let max = config.max_mask_size.min(MAX_MASK_SIZE).max(min);
    let wanted = (extent * config.pixels_per_unit).ceil();
    if !wanted.is_finite() || wanted <= min as f64 {
        return min;
    }
    if wanted >= max as f64 {
        return max;
    }
    (wanted as u32).next_power_of_two().min(max)
}

/// Paints clip regions of one surface into its mask
#[derive(Debug, Clone, Copy)]
pub struct MaskRasterizer {
    bounds: Bounds2,
}

impl MaskRasterizer {
    pub fn new(bounds: Bounds2) -> Self {
        Self { bounds }
    }

    /// Map a surface-local point into pixel space of `mask`
    #[inline]
    pub fn to_pixel(&self, mask: &AlphaMask, point: &Point2<f64>) -> Point2<f64> {
        let tw = mask.width() as f64;
        let th = mask.height() as f64;
        Point2::new(
            (point.x - self.bounds.min.x) / self.bounds.width() * tw,
            (self.bounds.max.y - point.y) / self.bounds.height() * th,
        )
    }

    /// Repaint `mask` from scratch. Returns `true` if any region was painted.
    pub fn rasterize(
        &self,
        mask: &mut AlphaMask,
        rectangles: &[ClipRectangle],
        shapes: &[ClipPolygon],
    ) -> bool {
        mask.fill(AlphaMask::OPAQUE);

        for rect in rectangles {
            // max.y maps to the top row after the flip
            let top_left = self.to_pixel(mask, &Point2::new(rect.min.x, rect.max.y));
            let bottom_right = self.to_pixel(mask, &Point2::new(rect.max.x, rect.min.y));
            mask.fill_rect(
                top_left.x.round() as i64,
                top_left.y.round() as i64,
                bottom_right.x.round() as i64,
                bottom_right.y.round() as i64,
                AlphaMask::CUT,
            );
        }

        for shape in shapes {
            let path: Vec<Point2<f64>> = shape
                .points
                .iter()
                .map(|p| self.to_pixel(mask, p))
                .collect();
            mask.fill_path(&path, AlphaMask::CUT);
        }

        !(rectangles.is_empty() && shapes.is_empty())
    }
}
