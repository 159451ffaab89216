use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::EntranceConfig;
use crate::error::SolveError;
use crate::grid::{OccupancyGrid, Point};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntranceStrategy {
    /// Look for jumps in how deep the wall line sits along each edge
    #[default]
    Derivative,
    /// Slide a wall-free probe square along each edge
    BoundarySquare,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Endpoints {
    pub entrance: Point,
    pub exit: Point,
}

pub trait EntranceLocator {
    fn locate(&self, grid: &OccupancyGrid) -> Result<Endpoints, SolveError>;
}

impl EntranceStrategy {
    pub fn locator(self, config: &EntranceConfig) -> Box<dyn EntranceLocator + Send + Sync> {
        match self {
            EntranceStrategy::Derivative => Box::new(DerivativeLocator {
                margin_fraction: config.margin_fraction,
            }),
            EntranceStrategy::BoundarySquare => Box::new(BoundarySquareLocator {
                square_size: config.square_size,
            }),
        }
    }
}

/// The four grid boundaries, in the order they are scanned
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

impl Edge {
    const ALL: [Edge; 4] = [Edge::Top, Edge::Bottom, Edge::Left, Edge::Right];

    /// Number of positions along the edge
    fn length(self, grid: &OccupancyGrid) -> usize {
        match self {
            Edge::Top | Edge::Bottom => grid.columns(),
            Edge::Left | Edge::Right => grid.rows(),
        }
    }

    /// How far one can walk inwards from the edge
    fn span(self, grid: &OccupancyGrid) -> usize {
        match self {
            Edge::Top | Edge::Bottom => grid.rows(),
            Edge::Left | Edge::Right => grid.columns(),
        }
    }

    /// Grid cell `depth` cells in from the edge at position `along`
    fn cell(self, grid: &OccupancyGrid, depth: usize, along: usize) -> Point {
        match self {
            Edge::Top => Point::new(depth, along),
            Edge::Bottom => Point::new(grid.rows() - 1 - depth, along),
            Edge::Left => Point::new(along, depth),
            Edge::Right => Point::new(along, grid.columns() - 1 - depth),
        }
    }
}

/// Boundary-derivative scan.
///
/// For every edge the depth of the first wall is sampled along the edge (ignoring
/// `margin_fraction` of it at both ends). An opening shows up as a large positive jump in
/// that depth followed later by a large negative one. The two edges with the widest openings
/// become entrance and exit, the widest one being the entrance.
#[derive(Clone, Debug)]
pub struct DerivativeLocator {
    pub margin_fraction: f64,
}

#[derive(Debug)]
struct Opening {
    edge: Edge,
    width: usize,
    endpoint: Point,
}

impl DerivativeLocator {
    fn scan(&self, grid: &OccupancyGrid, edge: Edge) -> Option<Opening> {
        let length = edge.length(grid);
        let span = edge.span(grid);
        let start = (self.margin_fraction * length as f64).floor() as usize;
        let end = length.saturating_sub(start);
        if span == 0 || end <= start + 1 {
            return None;
        }

        let depths: Vec<usize> = (start..end)
            .map(|along| {
                (0..span)
                    .find(|&depth| grid.is_wall(edge.cell(grid, depth, along)))
                    .unwrap_or(span)
            })
            .collect();

        let mut diffs = vec![0isize; depths.len()];
        for i in 1..depths.len() {
            diffs[i] = depths[i] as isize - depths[i - 1] as isize;
        }

        // first occurrence of the largest jump inwards
        let mut rise = 0;
        for i in 1..diffs.len() {
            if diffs[i] > diffs[rise] {
                rise = i;
            }
        }

        // first occurrence of the largest jump back out, after the rise
        let mut fall = rise;
        for i in rise + 1..diffs.len() {
            if fall == rise || diffs[i] < diffs[fall] {
                fall = i;
            }
        }

        let width = if diffs[rise] > 0 && fall > rise {
            fall - rise
        } else {
            0
        };

        let depth = depths[rise.saturating_sub(1)].min(span - 1);
        let middle = if width > 0 { (rise + fall - 1) / 2 } else { rise };
        let mut endpoint = edge.cell(grid, depth, start + middle);

        // the middle of a lopsided opening can land on a wall, take any open cell in it instead
        if grid.is_wall(endpoint) && width > 0 {
            if let Some(open) = (rise..fall)
                .map(|i| edge.cell(grid, depth, start + i))
                .find(|p| !grid.is_wall(*p))
            {
                endpoint = open;
            }
        }

        debug!("{:?} edge: opening of width {} at {:?}", edge, width, endpoint);

        Some(Opening {
            edge,
            width,
            endpoint,
        })
    }
}

impl EntranceLocator for DerivativeLocator {
    fn locate(&self, grid: &OccupancyGrid) -> Result<Endpoints, SolveError> {
        let mut openings: Vec<Opening> = Edge::ALL
            .iter()
            .filter_map(|edge| self.scan(grid, *edge))
            .collect();

        // stable, so equally wide openings keep the top, bottom, left, right order
        openings.sort_by(|a, b| b.width.cmp(&a.width));

        match openings.as_slice() {
            [entrance, exit, ..] => {
                if exit.width == 0 {
                    warn!(
                        "only found openings on {:?}, endpoints are a guess",
                        openings
                            .iter()
                            .filter(|o| o.width > 0)
                            .map(|o| o.edge)
                            .collect::<Vec<_>>()
                    );
                }
                Ok(Endpoints {
                    entrance: entrance.endpoint,
                    exit: exit.endpoint,
                })
            }
            _ => {
                warn!(
                    "grid of {}x{} is too small to scan for openings",
                    grid.rows(),
                    grid.columns()
                );
                Err(SolveError::Unsolvable)
            }
        }
    }
}

/// Boundary-square scan.
///
/// Slides a `square_size` probe square along each edge, starting and stopping one square
/// away from the corners, and takes the first position where all four sides of the square
/// are free of walls. The first two edges (top, bottom, left, right) with a hit are used.
#[derive(Clone, Debug)]
pub struct BoundarySquareLocator {
    pub square_size: usize,
}

impl BoundarySquareLocator {
    fn is_clear(&self, grid: &OccupancyGrid, edge: Edge, along: usize) -> bool {
        let s = self.square_size;
        (0..=s).all(|o| {
            !grid.is_wall(edge.cell(grid, 0, along + o))
                && !grid.is_wall(edge.cell(grid, s, along + o))
                && !grid.is_wall(edge.cell(grid, o, along))
                && !grid.is_wall(edge.cell(grid, o, along + s))
        })
    }

    fn scan(&self, grid: &OccupancyGrid, edge: Edge) -> Option<Point> {
        let s = self.square_size;
        let length = edge.length(grid);
        if s >= edge.span(grid) || 2 * s >= length {
            return None;
        }

        (s..length - s)
            .find(|&along| self.is_clear(grid, edge, along))
            .map(|along| edge.cell(grid, 0, along + s / 2))
    }
}

impl EntranceLocator for BoundarySquareLocator {
    fn locate(&self, grid: &OccupancyGrid) -> Result<Endpoints, SolveError> {
        let found: Vec<Point> = Edge::ALL
            .iter()
            .filter_map(|edge| {
                let hit = self.scan(grid, *edge);
                if let Some(p) = hit {
                    debug!("{:?} edge: clear square at {:?}", edge, p);
                }
                hit
            })
            .take(2)
            .collect();

        match found.as_slice() {
            [entrance, exit] => Ok(Endpoints {
                entrance: *entrance,
                exit: *exit,
            }),
            _ => {
                warn!(
                    "found {} of 2 openings with a {} cell probe",
                    found.len(),
                    self.square_size
                );
                Err(SolveError::Unsolvable)
            }
        }
    }
}
