// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Free-interval algebra
//!
//! Computes the uncut spans of a surface along its primary axis from the
//! horizontal projections of its clip rectangles. Projections are merged before
//! the boundaries are paired, so overlapping or out-of-order cuts can never
//! produce a negative-width span or a misplaced centre.

use crate::rect::ClipRectangle;

/// Spans narrower than this are treated as closed
const SPAN_EPSILON: f64 = 1e-9;

/// A contiguous unclipped span along the surface's primary axis
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FreeInterval {
    pub width: f64,
    pub height: f64,
    pub center: f64,
}

impl FreeInterval {
    #[inline]
    pub fn start(&self) -> f64 {
        self.center - self.width * 0.5
    }

    #[inline]
    pub fn end(&self) -> f64 {
        self.center + self.width * 0.5
    }

    /// True if `[start, end]` of the span contains `[min, max]`
    pub fn fits(&self, min: f64, max: f64) -> bool {
        min >= self.start() - SPAN_EPSILON && max <= self.end() + SPAN_EPSILON
    }
}

/// Free spans of a surface centred on the origin (`[-half_width, half_width]`)
pub fn free_intervals(rectangles: &[ClipRectangle], half_width: f64, height: f64) -> Vec<FreeInterval> {
    free_intervals_in(rectangles, -half_width, half_width, height)
}

/// Free spans of a surface covering `[span_min, span_max]` on its primary axis
pub fn free_intervals_in(
    rectangles: &[ClipRectangle],
    span_min: f64,
    span_max: f64,
    height: f64,
) -> Vec<FreeInterval> {
    let cuts = merge_spans(
        rectangles
            .iter()
            .map(|r| (r.min.x.clamp(span_min, span_max), r.max.x.clamp(span_min, span_max)))
            .filter(|(a, b)| b - a > SPAN_EPSILON),
    );

    let mut boundaries = Vec::with_capacity(cuts.len() * 2 + 2);
    boundaries.push(span_min);
    for (start, end) in cuts {
        boundaries.push(start);
        boundaries.push(end);
    }
    boundaries.push(span_max);

    boundaries
        .chunks_exact(2)
        .filter_map(|pair| {
            let width = pair[1] - pair[0];
            if width <= SPAN_EPSILON {
                return None;
            }
            Some(FreeInterval {
                width,
                height,
                center: (pair[0] + pair[1]) * 0.5,
            })
        })
        .collect()
}

/// Sort spans and merge every overlapping or touching pair
pub fn merge_spans(spans: impl IntoIterator<Item = (f64, f64)>) -> Vec<(f64, f64)> {
    let mut spans: Vec<(f64, f64)> = spans
        .into_iter()
        .map(|(a, b)| if a <= b { (a, b) } else { (b, a) })
        .collect();
    spans.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match merged.last_mut() {
            Some(last) if start <= last.1 + SPAN_EPSILON => {
                last.1 = last.1.max(end);
            }
            _ => merged.push((start, end)),
        }
    }
    merged
}
