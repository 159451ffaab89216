pub mod config;
pub mod entrance;
pub mod error;
pub mod find;
pub mod geometry;
pub mod grid;
pub mod pipeline;
pub mod rectify;
pub mod render;
pub mod sanitize;
pub mod segment;
pub mod util;

pub use config::{RectifyMode, SolverConfig};
pub use entrance::{EntranceStrategy, Endpoints};
pub use error::{FailureKind, SolveError, SolveFailure};
pub use find::{MapTrait, PathFinder, PathFinderState};
pub use geometry::{order_points, Point2D, Quad};
pub use grid::{Cell, OccupancyGrid, Point};
pub use pipeline::{CancelToken, MazeSolver, Solution};
