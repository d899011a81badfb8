//! Per-level photometric patch cache.
//!
//! Patches for one pyramid level are stored as flat parallel arrays indexed by
//! `cell * samples + k`, aligned with the keyframe point array.

use image::GrayImage;
use nalgebra::Point2;

use crate::pyramid::{gradient_at, interp_bilinear, is_in_bounds, ImageSize};

/// Borrowed view of one point's patch.
#[derive(Debug, Clone, Copy)]
pub struct Patch<'a> {
    pub vals: &'a [f32],
    pub gxs: &'a [f32],
    pub gys: &'a [f32],
}

impl Patch<'_> {
    pub fn len(&self) -> usize {
        self.vals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vals.is_empty()
    }

    pub fn mean(&self) -> f32 {
        if self.vals.is_empty() {
            return 0.0;
        }
        self.vals.iter().sum::<f32>() / self.vals.len() as f32
    }
}

/// All patches of one pyramid level.
#[derive(Debug, Clone, Default)]
pub struct PatchLevel {
    half: usize,
    samples: usize,
    vals: Vec<f32>,
    gxs: Vec<f32>,
    gys: Vec<f32>,
    good: Vec<bool>,
}

impl PatchLevel {
    /// Pixels of clearance a patch of half size `half` needs, including the
    /// gradient stencil.
    pub fn footprint_margin(half: usize) -> f64 {
        half as f64 + 1.0
    }

    /// Resize for `cells` points with square patches of half size `half` and
    /// mark every patch bad.
    pub fn reset(&mut self, cells: usize, half: usize) {
        let side = 2 * half + 1;
        self.half = half;
        self.samples = side * side;
        self.vals.clear();
        self.vals.resize(cells * self.samples, 0.0);
        self.gxs.clear();
        self.gxs.resize(cells * self.samples, 0.0);
        self.gys.clear();
        self.gys.resize(cells * self.samples, 0.0);
        self.good.clear();
        self.good.resize(cells, false);
    }

    pub fn half(&self) -> usize {
        self.half
    }

    /// Samples per patch.
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn cells(&self) -> usize {
        self.good.len()
    }

    /// Sample the patch centred at `px` (coordinates of this level).
    ///
    /// Returns false and marks the slot bad when the footprint leaves the image.
    pub fn extract(&mut self, idx: usize, image: &GrayImage, px: &Point2<f64>) -> bool {
        let size = ImageSize::of(image);
        if !is_in_bounds(size, px.x, px.y, Self::footprint_margin(self.half)) {
            self.good[idx] = false;
            return false;
        }

        let half = self.half as i32;
        let base = idx * self.samples;
        let mut k = base;
        for dy in -half..=half {
            for dx in -half..=half {
                let x = px.x + dx as f64;
                let y = px.y + dy as f64;
                let grad = gradient_at(image, x, y);
                self.vals[k] = interp_bilinear(image, x, y) as f32;
                self.gxs[k] = grad.x as f32;
                self.gys[k] = grad.y as f32;
                k += 1;
            }
        }
        self.good[idx] = true;
        true
    }

    pub fn mark_bad(&mut self, idx: usize) {
        self.good[idx] = false;
    }

    pub fn is_good(&self, idx: usize) -> bool {
        self.good.get(idx).copied().unwrap_or(false)
    }

    pub fn get(&self, idx: usize) -> Option<Patch<'_>> {
        if !self.is_good(idx) {
            return None;
        }
        let range = idx * self.samples..(idx + 1) * self.samples;
        Some(Patch {
            vals: &self.vals[range.clone()],
            gxs: &self.gxs[range.clone()],
            gys: &self.gys[range],
        })
    }

    pub fn num_good(&self) -> usize {
        self.good.iter().filter(|g| **g).count()
    }
}
