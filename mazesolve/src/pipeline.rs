use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use image::{imageops, RgbaImage};
use log::{debug, info};

use crate::config::{RectifyMode, SolverConfig};
use crate::entrance::Endpoints;
use crate::error::{SolveError, SolveFailure};
use crate::find::{PathFinder, PathFinderState};
use crate::geometry::{order_points, Point2D};
use crate::grid::{OccupancyGrid, Point};
use crate::rectify::{crop_to_quadrilateral, perspective_transform};
use crate::render::{bloom_radius, mark_solution, render_overlay};
use crate::sanitize::seal_empty_rows;
use crate::segment::{segment, Rectification, RenderRegion, Segmentation};

/// Shared flag a caller flips to abandon a solve. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn check(&self) -> Result<(), SolveError> {
        if self.is_cancelled() {
            Err(SolveError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Shortest route through a grid
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridSolution {
    pub path: Vec<Point>,
    pub endpoints: Endpoints,
    pub total_cost: usize,
    pub expanded: usize,
}

#[derive(Clone, Debug)]
pub struct Solution {
    /// The input photo with the route drawn on it
    pub overlay: RgbaImage,
    pub path: Vec<Point>,
    pub endpoints: Endpoints,
    pub total_cost: usize,
    pub expanded: usize,
    pub region: RenderRegion,
}

/// Runs A* between two given cells
pub fn find_path(
    grid: &OccupancyGrid,
    endpoints: Endpoints,
    cancel: &CancelToken,
) -> Result<GridSolution, SolveError> {
    for p in [endpoints.entrance, endpoints.exit] {
        if !grid.contains(p) {
            return Err(SolveError::InternalInvariant(format!(
                "endpoint {:?} outside of a {}x{} grid",
                p,
                grid.rows(),
                grid.columns()
            )));
        }
        if grid.is_wall(p) {
            return Err(SolveError::EndpointUnresolved(p));
        }
    }

    match PathFinder::new(grid, endpoints.entrance, endpoints.exit).finish_with(grid, cancel) {
        PathFinderState::PathFound(result) => {
            debug_assert!(result.path.iter().all(|p| !grid.is_wall(*p)));
            Ok(GridSolution {
                path: result.path,
                endpoints,
                total_cost: result.total_cost,
                expanded: result.expanded,
            })
        }
        PathFinderState::NoPathFound => Err(SolveError::Unsolvable),
        PathFinderState::Cancelled => Err(SolveError::Cancelled),
        PathFinderState::Computing => Err(SolveError::InternalInvariant(
            "search stopped while still computing".to_string(),
        )),
    }
}

/// Seals open rows, finds the entrance and exit and routes between them
pub fn solve_grid(
    grid: &mut OccupancyGrid,
    config: &SolverConfig,
    cancel: &CancelToken,
) -> Result<GridSolution, SolveError> {
    seal_empty_rows(grid, config.seal_margin);

    let endpoints = config
        .entrance
        .strategy
        .locator(&config.entrance)
        .locate(grid)?;
    info!(
        "entrance at {:?}, exit at {:?}",
        endpoints.entrance, endpoints.exit
    );

    cancel.check()?;
    find_path(grid, endpoints, cancel)
}

#[derive(Clone, Debug, Default)]
pub struct MazeSolver {
    config: SolverConfig,
}

impl MazeSolver {
    pub fn new(config: SolverConfig) -> Result<Self, SolveError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solves the maze inside `corners` and returns `photo` with the route drawn on it
    pub fn solve(&self, photo: &RgbaImage, corners: [Point2D; 4]) -> Result<RgbaImage, SolveError> {
        self.solve_with_cancel(photo, corners, &CancelToken::default())
            .map(|solution| solution.overlay)
    }

    pub fn solve_with_cancel(
        &self,
        photo: &RgbaImage,
        corners: [Point2D; 4],
        cancel: &CancelToken,
    ) -> Result<Solution, SolveError> {
        cancel.check()?;

        let quad = order_points(corners);
        if quad.is_degenerate() {
            return Err(SolveError::DegenerateSelection(format!(
                "corners {}, {}, {}, {} enclose no area",
                corners[0], corners[1], corners[2], corners[3]
            )));
        }
        debug!("ordered corners {:?}", quad);

        let gray = imageops::grayscale(photo);

        let (rectified, placement) = match self.config.rectify {
            RectifyMode::Crop => {
                let (cropped, bounds) = crop_to_quadrilateral(&gray, &quad)?;
                (cropped, Placement::Offset(bounds.left(), bounds.top()))
            }
            RectifyMode::Perspective => {
                let warped = perspective_transform(&gray, &quad, false)?;
                let rectification = Rectification {
                    quad,
                    width: warped.width(),
                    height: warped.height(),
                };
                (warped, Placement::Warped(rectification))
            }
        };
        cancel.check()?;

        let Segmentation { mut grid, region } = segment(&rectified, &self.config)?;
        let region = match placement {
            Placement::Offset(dx, dy) => region.offset(dx, dy),
            Placement::Warped(rectification) => RenderRegion {
                rectification: Some(rectification),
                ..region
            },
        };
        cancel.check()?;

        let found = solve_grid(&mut grid, &self.config, cancel)?;
        info!(
            "solved: {} cells, cost {}, {} expansions",
            found.path.len(),
            found.total_cost,
            found.expanded
        );
        cancel.check()?;

        mark_solution(&mut grid, &found.path);
        let radius = bloom_radius(&grid, region.scale, self.config.bloom_divisor);
        let overlay = render_overlay(photo, &grid, &region, radius, self.config.marker_color)?;

        Ok(Solution {
            overlay,
            path: found.path,
            endpoints: found.endpoints,
            total_cost: found.total_cost,
            expanded: found.expanded,
            region,
        })
    }

    /// Runs the solve on tokio's blocking pool so the calling task is never held up
    pub async fn solve_async(
        &self,
        photo: RgbaImage,
        corners: [Point2D; 4],
        cancel: CancelToken,
    ) -> Result<Solution, SolveFailure> {
        let solver = self.clone();
        let result =
            tokio::task::spawn_blocking(move || solver.solve_with_cancel(&photo, corners, &cancel))
                .await
                .map_err(|e| SolveError::InternalInvariant(format!("solver task failed: {}", e)))?;

        result.map_err(SolveFailure::from)
    }
}

/// How the segmented region relates back to the photo
enum Placement {
    Offset(i32, i32),
    Warped(Rectification),
}
