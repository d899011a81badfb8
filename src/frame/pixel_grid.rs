//! Cell-quantized pixel grid.
//!
//! The image is divided into `cell_size × cell_size` blocks and every cell
//! holds at most one candidate pixel. The row-major cell index is the index
//! space shared by all per-point keyframe arrays.

use nalgebra::Point2;

use crate::pyramid::ImageSize;

/// Grid dimensions in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct GridSize {
    pub rows: usize,
    pub cols: usize,
}

impl GridSize {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// `floor(image_size / cell_size)` per axis.
    ///
    /// # Panics
    /// If `cell_size` is zero.
    pub fn for_image(size: ImageSize, cell_size: u32) -> Self {
        assert!(cell_size > 0, "cell size must be positive");
        Self {
            rows: (size.height / cell_size) as usize,
            cols: (size.width / cell_size) as usize,
        }
    }

    pub fn area(&self) -> usize {
        self.rows * self.cols
    }
}

/// One optional level-0 pixel per cell. `None` means unselected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PixelGrid {
    size: GridSize,
    cells: Vec<Option<Point2<i32>>>,
}

impl PixelGrid {
    pub fn new(size: GridSize) -> Self {
        Self {
            size,
            cells: vec![None; size.area()],
        }
    }

    pub fn for_image(image_size: ImageSize, cell_size: u32) -> Self {
        Self::new(GridSize::for_image(image_size, cell_size))
    }

    /// Grid with every cell holding its own centre pixel.
    pub fn from_cell_centers(image_size: ImageSize, cell_size: u32) -> Self {
        let mut grid = Self::for_image(image_size, cell_size);
        let half = (cell_size / 2) as i32;
        for gr in 0..grid.size.rows {
            for gc in 0..grid.size.cols {
                let x = gc as i32 * cell_size as i32 + half;
                let y = gr as i32 * cell_size as i32 + half;
                grid.set(gr, gc, Point2::new(x, y));
            }
        }
        grid
    }

    pub fn grid_size(&self) -> GridSize {
        self.size
    }

    pub fn rows(&self) -> usize {
        self.size.rows
    }

    pub fn cols(&self) -> usize {
        self.size.cols
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn index(&self, gr: usize, gc: usize) -> usize {
        debug_assert!(gr < self.size.rows && gc < self.size.cols);
        gr * self.size.cols + gc
    }

    pub fn at(&self, gr: usize, gc: usize) -> Option<Point2<i32>> {
        self.cells[self.index(gr, gc)]
    }

    pub fn set(&mut self, gr: usize, gc: usize, px: Point2<i32>) {
        let idx = self.index(gr, gc);
        self.cells[idx] = Some(px);
    }

    pub fn clear(&mut self, gr: usize, gc: usize) {
        let idx = self.index(gr, gc);
        self.cells[idx] = None;
    }

    pub fn clear_all(&mut self) {
        self.cells.fill(None);
    }

    pub fn cells(&self) -> &[Option<Point2<i32>>] {
        &self.cells
    }

    /// (cell index, pixel) for every selected cell.
    pub fn iter_selected(&self) -> impl Iterator<Item = (usize, Point2<i32>)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(idx, cell)| cell.map(|px| (idx, px)))
    }

    pub fn num_selected(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_size_floors() {
        let size = GridSize::for_image(ImageSize::new(650, 479), 16);
        assert_eq!(size, GridSize::new(29, 40));
        assert_eq!(size.area(), 29 * 40);
    }

    #[test]
    fn test_cell_centers() {
        let grid = PixelGrid::from_cell_centers(ImageSize::new(64, 32), 16);
        assert_eq!(grid.grid_size(), GridSize::new(2, 4));
        assert_eq!(grid.num_selected(), 8);
        assert_eq!(grid.at(0, 0), Some(Point2::new(8, 8)));
        assert_eq!(grid.at(1, 3), Some(Point2::new(56, 24)));
    }

    #[test]
    fn test_set_and_clear() {
        let mut grid = PixelGrid::new(GridSize::new(3, 3));
        assert!(grid.iter_selected().next().is_none());

        grid.set(1, 2, Point2::new(5, 7));
        assert_eq!(grid.iter_selected().collect::<Vec<_>>(), vec![(5, Point2::new(5, 7))]);

        grid.clear(1, 2);
        assert_eq!(grid.num_selected(), 0);
        assert_eq!(grid.len(), 9);
    }
}
