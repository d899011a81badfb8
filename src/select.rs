//! Gradient-based pixel selection.
//!
//! One candidate per grid cell: the pixel with the strongest intensity
//! gradient on the selection level, mapped back to level 0. The result feeds
//! [`Keyframe::init_points`](crate::frame::Keyframe::init_points).

use image::GrayImage;
use nalgebra::Point2;
use tracing::debug;

use crate::config::SelectConfig;
use crate::frame::{GridSize, PixelGrid};
use crate::pyramid::{is_in_bounds, ImageSize};

#[derive(Debug, Clone)]
pub struct PixelSelector {
    cfg: SelectConfig,
    pixels: PixelGrid,
}

impl PixelSelector {
    pub fn new(cfg: SelectConfig) -> Self {
        Self {
            cfg,
            pixels: PixelGrid::default(),
        }
    }

    pub fn cfg(&self) -> &SelectConfig {
        &self.cfg
    }

    /// Grid of the last `select` call.
    pub fn pixels(&self) -> &PixelGrid {
        &self.pixels
    }

    /// Select pixels on `grays` (a pyramid, level 0 first).
    ///
    /// The selection level is clamped to the pyramid depth. Returns the
    /// number of selected cells.
    pub fn select(&mut self, grays: &[GrayImage]) -> usize {
        let Some(image0) = grays.first() else {
            self.pixels = PixelGrid::default();
            return 0;
        };

        let size0 = ImageSize::of(image0);
        let grid_size = GridSize::for_image(size0, self.cfg.cell_size);
        if self.pixels.grid_size() != grid_size {
            self.pixels = PixelGrid::new(grid_size);
        } else {
            self.pixels.clear_all();
        }

        let level = self.cfg.sel_level.min(grays.len() - 1);
        let image = &grays[level];
        let cell = self.cfg.cell_size;
        let stride = 1u32 << level;
        let border = self.cfg.border as f64;

        let mut n_selected = 0;
        for gr in 0..grid_size.rows {
            for gc in 0..grid_size.cols {
                // Level pixels whose level-0 position falls inside this cell
                let x_range = (gc as u32 * cell).div_ceil(stride)
                    ..((gc as u32 + 1) * cell).div_ceil(stride);
                let y_range = (gr as u32 * cell).div_ceil(stride)
                    ..((gr as u32 + 1) * cell).div_ceil(stride);

                let mut best: Option<(f64, Point2<i32>)> = None;
                for y in y_range {
                    for x in x_range.clone() {
                        let px = Point2::new((x << level) as i32, (y << level) as i32);
                        if !is_in_bounds(size0, px.x as f64, px.y as f64, border) {
                            continue;
                        }
                        let Some(grad) = gradient_norm(image, x, y) else {
                            continue;
                        };
                        if grad < self.cfg.min_grad as f64 {
                            continue;
                        }
                        let grad = grad.min(self.cfg.max_grad as f64);
                        if best.map_or(true, |(g, _)| grad > g) {
                            best = Some((grad, px));
                        }
                    }
                }

                if let Some((_, px)) = best {
                    self.pixels.set(gr, gc, px);
                    n_selected += 1;
                }
            }
        }

        debug!(
            n_selected,
            cells = grid_size.area(),
            level,
            "select pixels"
        );
        n_selected
    }
}

/// Central-difference gradient magnitude at an integer pixel, `None` on the
/// one-pixel image rim.
fn gradient_norm(image: &GrayImage, x: u32, y: u32) -> Option<f64> {
    let (w, h) = image.dimensions();
    if x == 0 || y == 0 || x + 1 >= w || y + 1 >= h {
        return None;
    }
    let at = |x: u32, y: u32| image.get_pixel(x, y)[0] as f64;
    let gx = (at(x + 1, y) - at(x - 1, y)) * 0.5;
    let gy = (at(x, y + 1) - at(x, y - 1)) * 0.5;
    Some(gx.hypot(gy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pyramid::make_image_pyramid;
    use crate::test_utils::make_rand_image;
    use image::Luma;

    fn step_image() -> GrayImage {
        GrayImage::from_fn(64, 64, |x, _| Luma([if x < 32 { 0 } else { 200 }]))
    }

    fn config(sel_level: usize) -> SelectConfig {
        SelectConfig {
            sel_level,
            cell_size: 16,
            min_grad: 8,
            max_grad: 64,
            border: 4,
        }
    }

    #[test]
    fn test_flat_image_selects_nothing() {
        let mut selector = PixelSelector::new(config(0));
        let grays = vec![GrayImage::from_pixel(64, 64, Luma([90]))];
        assert_eq!(selector.select(&grays), 0);
        assert_eq!(selector.pixels().grid_size(), GridSize::new(4, 4));
    }

    #[test]
    fn test_step_edge_on_level_zero() {
        let mut selector = PixelSelector::new(config(0));
        let n = selector.select(&[step_image()]);

        assert_eq!(n, 8);
        let pixels = selector.pixels();
        assert_eq!(pixels.num_selected(), 8);
        assert_eq!(pixels.at(0, 0), None);
        // Saturated gradients tie, so the first pixel in raster order wins
        assert_eq!(pixels.at(0, 1), Some(Point2::new(31, 4)));
        assert_eq!(pixels.at(0, 2), Some(Point2::new(32, 4)));
        assert_eq!(pixels.at(3, 3), None);
    }

    #[test]
    fn test_selection_level_maps_back_to_level_zero() {
        let mut selector = PixelSelector::new(config(1));
        let grays = make_image_pyramid(&step_image(), 3);
        assert!(selector.select(&grays) > 0);

        let pixels = selector.pixels();
        for (idx, px) in pixels.iter_selected() {
            let gc = idx % pixels.cols();
            assert!(gc == 1 || gc == 2);
            assert_eq!(px.x % 2, 0);
            assert_eq!(px.y % 2, 0);
            assert_eq!(px.x as usize / 16, gc);
        }
    }

    #[test]
    fn test_cell_size_not_divisible_by_level_stride() {
        let cfg = SelectConfig {
            sel_level: 2,
            cell_size: 10,
            min_grad: 1,
            max_grad: 255,
            border: 4,
        };
        let mut selector = PixelSelector::new(cfg);
        let grays = make_image_pyramid(&make_rand_image(80), 3);
        assert!(selector.select(&grays) > 0);

        let pixels = selector.pixels();
        for (idx, px) in pixels.iter_selected() {
            let (gr, gc) = (idx / pixels.cols(), idx % pixels.cols());
            assert_eq!(px.x as usize / 10, gc, "{:?} stored in cell ({}, {})", px, gr, gc);
            assert_eq!(px.y as usize / 10, gr, "{:?} stored in cell ({}, {})", px, gr, gc);
        }
    }

    #[test]
    fn test_level_is_clamped() {
        let mut selector = PixelSelector::new(config(5));
        assert_eq!(selector.select(&[step_image()]), 8);
        assert_eq!(selector.select(&[]), 0);
        assert!(selector.pixels().is_empty());
    }

    #[test]
    fn test_min_grad_threshold() {
        let mut cfg = config(0);
        cfg.min_grad = 120;
        let mut selector = PixelSelector::new(cfg);
        assert_eq!(selector.select(&[step_image()]), 0);
    }
}
