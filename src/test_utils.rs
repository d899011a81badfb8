//! Shared fixtures for unit tests.

use image::{GrayImage, Luma};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::camera::CameraModel;
use crate::frame::PixelGrid;
use crate::pyramid::ImageSize;

pub const IMAGE_SIZE: u32 = 640;
pub const CELL_SIZE: u32 = 16;
pub const NUM_LEVELS: usize = 4;

/// Square image of uniform noise, seeded so every test sees the same pixels.
pub fn make_rand_image(size: u32) -> GrayImage {
    let mut rng = StdRng::seed_from_u64(42);
    GrayImage::from_fn(size, size, |_, _| Luma([rng.gen::<u8>()]))
}

/// Monocular camera matching `IMAGE_SIZE` with unit intrinsics.
pub fn make_test_camera() -> CameraModel {
    CameraModel::new(ImageSize::new(IMAGE_SIZE, IMAGE_SIZE), [1.0; 4], 0.0)
}

/// Every cell holding its centre pixel.
pub fn make_test_pixels() -> PixelGrid {
    PixelGrid::from_cell_centers(ImageSize::new(IMAGE_SIZE, IMAGE_SIZE), CELL_SIZE)
}
