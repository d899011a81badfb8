//! Grayscale image pyramids and sub-pixel sampling.
//!
//! Level 0 is the full-resolution image; every following level halves both
//! dimensions (rounding up, like `pyrDown`). Coordinates at level `k` are the
//! level-0 coordinates scaled by `2^-k`.

use std::fmt;

use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Luma};
use nalgebra::Vector2;

/// Ordered sequence of progressively downsampled grayscale images.
pub type ImagePyramid = Vec<GrayImage>;

/// Dense per-pixel metric depth, same size as pyramid level 0.
///
/// Non-positive and non-finite values mean "no depth".
pub type DepthMap = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn of<P: image::Pixel>(image: &ImageBuffer<P, Vec<P::Subpixel>>) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size of the pyramid level directly below this one.
    pub fn half(&self) -> Self {
        Self {
            width: self.width.div_ceil(2),
            height: self.height.div_ceil(2),
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Build a pyramid with `num_levels` levels from `image`.
///
/// Returns an empty pyramid for an empty image or `num_levels == 0`.
pub fn make_image_pyramid(image: &GrayImage, num_levels: usize) -> ImagePyramid {
    let mut pyramid = ImagePyramid::with_capacity(num_levels);
    if num_levels == 0 || ImageSize::of(image).is_empty() {
        return pyramid;
    }

    pyramid.push(image.clone());
    for level in 1..num_levels {
        let prev = &pyramid[level - 1];
        let size = ImageSize::of(prev).half();
        let down = imageops::resize(prev, size.width, size.height, FilterType::Triangle);
        pyramid.push(down);
    }
    pyramid
}

/// Scale factor from level-0 coordinates to `level` coordinates.
#[inline]
pub fn level_scale(level: usize) -> f64 {
    0.5_f64.powi(level as i32)
}

/// Whether (x, y) lies at least `margin` pixels inside the image.
#[inline]
pub fn is_in_bounds(size: ImageSize, x: f64, y: f64, margin: f64) -> bool {
    x >= margin
        && y >= margin
        && x <= size.width as f64 - 1.0 - margin
        && y <= size.height as f64 - 1.0 - margin
}

#[inline]
fn pixel(image: &GrayImage, x: u32, y: u32) -> f64 {
    image.as_raw()[y as usize * image.width() as usize + x as usize] as f64
}

/// Bilinear intensity at sub-pixel (x, y). The caller guarantees the
/// coordinate is inside the image.
pub fn interp_bilinear(image: &GrayImage, x: f64, y: f64) -> f64 {
    let x0 = x.floor();
    let y0 = y.floor();
    let (ax, ay) = (x - x0, y - y0);

    let (x0, y0) = (x0 as u32, y0 as u32);
    let x1 = (x0 + 1).min(image.width() - 1);
    let y1 = (y0 + 1).min(image.height() - 1);

    let top = (1.0 - ax) * pixel(image, x0, y0) + ax * pixel(image, x1, y0);
    let bottom = (1.0 - ax) * pixel(image, x0, y1) + ax * pixel(image, x1, y1);
    (1.0 - ay) * top + ay * bottom
}

/// Central-difference gradient at sub-pixel (x, y).
///
/// Needs one pixel of clearance on every side.
pub fn gradient_at(image: &GrayImage, x: f64, y: f64) -> Vector2<f64> {
    let gx = interp_bilinear(image, x + 1.0, y) - interp_bilinear(image, x - 1.0, y);
    let gy = interp_bilinear(image, x, y + 1.0) - interp_bilinear(image, x, y - 1.0);
    Vector2::new(gx, gy) * 0.5
}
