use image::{
    imageops::{self, FilterType},
    Rgba, RgbaImage,
};
use log::debug;

use crate::error::SolveError;
use crate::grid::{Cell, OccupancyGrid, Point};
use crate::rectify::unwarp_overlay;
use crate::segment::RenderRegion;

pub fn mark_solution(grid: &mut OccupancyGrid, path: &[Point]) {
    for p in path {
        grid.set(*p, Cell::Solution);
    }
}

/// Bloom radius in grid cells. Grows with the photo area the grid covers so the line keeps
/// the same visual weight whatever the resolution.
pub fn bloom_radius(grid: &OccupancyGrid, scale: u32, divisor: f64) -> usize {
    let area = grid.rows() as f64 * grid.columns() as f64 * (scale as f64).powi(2);
    (area / divisor) as usize
}

/// Every open cell within `radius` of a solution cell, not reaching past walls
fn bloom(grid: &OccupancyGrid, radius: usize) -> Vec<bool> {
    let (rows, columns) = (grid.rows() as isize, grid.columns() as isize);
    let mut painted = vec![false; grid.rows() * grid.columns()];
    let r2 = (radius * radius) as f64;

    let open = |row: isize, col: isize| {
        row >= 0
            && col >= 0
            && row < rows
            && col < columns
            && !grid.is_wall(Point::new(row as usize, col as usize))
    };

    for center in grid.points().filter(|p| grid.get(*p) == Cell::Solution) {
        let (r0, c0) = (center.row as isize, center.col as isize);

        for sx in [-1isize, 1] {
            for dx in 0..=radius as isize {
                let col = c0 + sx * dx;
                if !open(r0, col) {
                    break;
                }

                let extent = (r2 - (dx * dx) as f64).sqrt().round() as isize;
                for sy in [-1isize, 1] {
                    for dy in 0..=extent {
                        let row = r0 + sy * dy;
                        if !open(row, col) {
                            break;
                        }
                        painted[(row * columns + col) as usize] = true;
                    }
                }
            }
        }
    }

    painted
}

/// One pixel per cell. Bloomed solution cells get `color`, everything else the same colour
/// fully transparent so scaling it up does not darken the line's edge.
pub fn rasterize(grid: &OccupancyGrid, radius: usize, color: [u8; 4]) -> RgbaImage {
    let painted = bloom(grid, radius);
    let clear = Rgba([color[0], color[1], color[2], 0]);

    RgbaImage::from_fn(grid.columns() as u32, grid.rows() as u32, |x, y| {
        if painted[y as usize * grid.columns() + x as usize] {
            Rgba(color)
        } else {
            clear
        }
    })
}

/// Composites the solution in `grid` onto `photo` at `region`
pub fn render_overlay(
    photo: &RgbaImage,
    grid: &OccupancyGrid,
    region: &RenderRegion,
    radius: usize,
    color: [u8; 4],
) -> Result<RgbaImage, SolveError> {
    if !region.matches(grid) {
        return Err(SolveError::InternalInvariant(format!(
            "render region {}x{} does not fit a {}x{} grid at scale {}",
            region.width,
            region.height,
            grid.rows(),
            grid.columns(),
            region.scale
        )));
    }

    let small = rasterize(grid, radius, color);
    let overlay = if region.scale > 1 {
        imageops::resize(&small, region.width, region.height, FilterType::Triangle)
    } else {
        small
    };

    debug!(
        "overlay {}x{} at {} with bloom radius {}",
        overlay.width(),
        overlay.height(),
        region.origin,
        radius
    );

    let mut out = photo.clone();
    match &region.rectification {
        None => {
            imageops::overlay(
                &mut out,
                &overlay,
                region.origin.x as i64,
                region.origin.y as i64,
            );
        }
        Some(rectification) => {
            let mut canvas = RgbaImage::new(rectification.width, rectification.height);
            imageops::overlay(
                &mut canvas,
                &overlay,
                region.origin.x as i64,
                region.origin.y as i64,
            );
            let unwarped =
                unwarp_overlay(&canvas, &rectification.quad, photo.width(), photo.height())?;
            imageops::overlay(&mut out, &unwarped, 0, 0);
        }
    }

    Ok(out)
}
