use image::{GrayImage, Luma};

use crate::grid::{Cell, OccupancyGrid, Point};

/// Dark pixels (ink) become walls, everything else is open
pub fn grid_from_binary(img: &GrayImage) -> OccupancyGrid {
    let mut grid = OccupancyGrid::new(img.height() as usize, img.width() as usize);

    for (col, row, p) in img.enumerate_pixels() {
        if p.0[0] < 128 {
            grid.set(Point::new(row as usize, col as usize), Cell::Wall);
        }
    }

    grid
}

/// One pixel per cell: walls black, paths white, solution cells mid grey
pub fn grid_to_image(grid: &OccupancyGrid) -> GrayImage {
    GrayImage::from_fn(grid.columns() as u32, grid.rows() as u32, |x, y| {
        Luma([match grid.get(Point::new(y as usize, x as usize)) {
            Cell::Wall => 0,
            Cell::Path => 255,
            Cell::Solution => 128,
        }])
    })
}
