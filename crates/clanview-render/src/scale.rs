//! Grid-to-surface scale computation.

use crate::surface::Point;

/// Smallest cell edge in pixels.
pub const MIN_CELL_SIZE: f64 = 8.0;

/// Largest cell edge in pixels.
pub const MAX_CELL_SIZE: f64 = 16.0;

/// Cell edge for a container of `container_width` pixels showing `cols` columns.
///
/// `max` wins when the bounds are inverted.
pub fn cell_size(container_width: f64, cols: usize, min: f64, max: f64) -> f64 {
    if cols == 0 || !container_width.is_finite() {
        return min.min(max);
    }
    (container_width / cols as f64).max(min).min(max)
}

/// Placement of one frame on the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGeometry {
    pub rows: usize,
    pub cols: usize,
    pub cell_size: f64,
}

impl FrameGeometry {
    pub fn new(rows: usize, cols: usize, container_width: f64) -> Self {
        Self::with_bounds(rows, cols, container_width, MIN_CELL_SIZE, MAX_CELL_SIZE)
    }

    pub fn with_bounds(rows: usize, cols: usize, container_width: f64, min: f64, max: f64) -> Self {
        Self {
            rows,
            cols,
            cell_size: cell_size(container_width, cols, min, max),
        }
    }

    /// Surface width in pixels.
    pub fn width(&self) -> f64 {
        self.cols as f64 * self.cell_size
    }

    /// Surface height in pixels.
    pub fn height(&self) -> f64 {
        self.rows as f64 * self.cell_size
    }

    /// Map a grid-unit position to surface pixels.
    pub fn to_screen(&self, position: [f64; 2]) -> Point {
        Point::new(position[0] * self.cell_size, position[1] * self.cell_size)
    }

    /// Top-left corner of cell `(row, col)`.
    pub fn cell_origin(&self, row: usize, col: usize) -> Point {
        Point::new(col as f64 * self.cell_size, row as f64 * self.cell_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_size_is_clamped() {
        assert_eq!(cell_size(800.0, 100, MIN_CELL_SIZE, MAX_CELL_SIZE), 8.0);
        assert_eq!(cell_size(800.0, 10, MIN_CELL_SIZE, MAX_CELL_SIZE), 16.0);
        assert_eq!(cell_size(600.0, 50, MIN_CELL_SIZE, MAX_CELL_SIZE), 12.0);
        assert_eq!(cell_size(0.0, 50, MIN_CELL_SIZE, MAX_CELL_SIZE), 8.0);
        assert_eq!(cell_size(f64::NAN, 50, MIN_CELL_SIZE, MAX_CELL_SIZE), 8.0);
        assert_eq!(cell_size(600.0, 0, MIN_CELL_SIZE, MAX_CELL_SIZE), 8.0);
    }

    #[test]
    fn inverted_bounds_do_not_panic() {
        assert_eq!(cell_size(800.0, 10, 16.0, 8.0), 8.0);
        assert_eq!(cell_size(800.0, 200, 16.0, 8.0), 8.0);
        assert_eq!(cell_size(800.0, 0, 16.0, 8.0), 8.0);
    }

    #[test]
    fn surface_dimensions_follow_grid() {
        let geometry = FrameGeometry::new(30, 50, 600.0);
        assert_eq!(geometry.cell_size, 12.0);
        assert_eq!(geometry.width(), 600.0);
        assert_eq!(geometry.height(), 360.0);
    }

    #[test]
    fn positions_scale_by_cell_size() {
        let geometry = FrameGeometry::new(10, 10, 160.0);
        assert_eq!(geometry.to_screen([2.5, 4.0]), Point::new(40.0, 64.0));
        assert_eq!(geometry.cell_origin(1, 3), Point::new(48.0, 16.0));
    }
}
