use log::debug;

use crate::grid::{Cell, OccupancyGrid};

/// Seals rows that contain no wall at all by turning their last `margin` cells into walls.
///
/// Thresholding sometimes leaves a fully open row along the edge of the crop, which the
/// search would happily use as a shortcut around the outside of the maze. This only patches
/// that one artifact; the margin is empirical and does not scale with the image.
///
/// Returns the number of rows that were sealed.
pub fn seal_empty_rows(grid: &mut OccupancyGrid, margin: usize) -> usize {
    let columns = grid.columns();
    let from = columns.saturating_sub(margin);
    let mut sealed = 0;

    for row in 0..grid.rows() {
        let cells = grid.row_mut(row);
        if cells.iter().any(|c| *c == Cell::Wall) {
            continue;
        }
        cells[from..].fill(Cell::Wall);
        sealed += 1;
    }

    if sealed > 0 {
        debug!("sealed {} open rows ({} trailing columns)", sealed, columns - from);
    }

    sealed
}
