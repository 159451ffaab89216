use crate::find::{MapStorage, MapTrait, NodeReference};
use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// Cost of a horizontal or vertical step
pub const STRAIGHT_COST: usize = 10;
/// Cost of a diagonal step, 10 * sqrt(2) rounded
pub const DIAGONAL_COST: usize = 14;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Wall,
    Path,
    Solution,
}

impl Default for Cell {
    fn default() -> Self {
        Self::Path
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Cell::Wall => "#",
                Cell::Path => ".",
                Cell::Solution => "o",
            }
        )
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

impl Point {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl NodeReference for Point {}

/// Rectangular occupancy grid of the maze, row major.
///
/// The dimensions are fixed when the grid is created; cells are only ever changed in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyGrid {
    rows: usize,
    columns: usize,
    cells: Vec<Cell>,
}

impl OccupancyGrid {
    /// A grid where every cell is open
    pub fn new(rows: usize, columns: usize) -> Self {
        Self::filled(rows, columns, Cell::Path)
    }

    pub fn filled(rows: usize, columns: usize, cell: Cell) -> Self {
        Self {
            rows,
            columns,
            cells: vec![cell; rows * columns],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn contains(&self, p: Point) -> bool {
        p.row < self.rows && p.col < self.columns
    }

    pub fn get(&self, p: Point) -> Cell {
        self.cells[p.row * self.columns + p.col]
    }

    pub fn set(&mut self, p: Point, cell: Cell) {
        self.cells[p.row * self.columns + p.col] = cell;
    }

    pub fn is_wall(&self, p: Point) -> bool {
        self.get(p) == Cell::Wall
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        &self.cells[row * self.columns..(row + 1) * self.columns]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [Cell] {
        &mut self.cells[row * self.columns..(row + 1) * self.columns]
    }

    /// Fills the inclusive rectangle spanned by `from` and `to`
    pub fn fill(&mut self, from: Point, to: Point, cell: Cell) {
        for row in from.row.min(to.row)..=from.row.max(to.row) {
            for col in from.col.min(to.col)..=from.col.max(to.col) {
                self.set(Point { row, col }, cell);
            }
        }
    }

    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|c| **c == cell).count()
    }

    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.columns).map(move |col| Point { row, col }))
    }
}

impl Display for OccupancyGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in 0..self.rows {
            for cell in self.row(row) {
                write!(f, "{}", cell)?;
            }
            write!(f, "\n")?;
        }

        Ok(())
    }
}

/// Parses the format written by `Display`: `#` wall, `.` or space path, `o` solution
impl FromStr for OccupancyGrid {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lines: Vec<&str> = s.lines().filter(|l| !l.trim().is_empty()).collect();
        let columns = lines.first().map(|l| l.chars().count()).unwrap_or(0);

        let mut cells = Vec::with_capacity(lines.len() * columns);
        for (row, line) in lines.iter().enumerate() {
            if line.chars().count() != columns {
                return Err(anyhow::anyhow!(
                    "Row {} has {} columns, expected {}",
                    row,
                    line.chars().count(),
                    columns
                ));
            }
            for c in line.chars() {
                cells.push(match c {
                    '#' => Cell::Wall,
                    '.' | ' ' => Cell::Path,
                    'o' => Cell::Solution,
                    _ => return Err(anyhow::anyhow!("Invalid cell: {}", c)),
                });
            }
        }

        Ok(OccupancyGrid {
            rows: lines.len(),
            columns,
            cells,
        })
    }
}

/// A MapStorage that keeps one value per grid cell in a single row major vec
#[derive(Debug)]
pub struct CellStorage<T> {
    columns: usize,
    data: Vec<T>,
}

impl<T: Copy + 'static> MapStorage<T> for CellStorage<T> {
    type Reference = Point;

    fn get(&self, node: Self::Reference) -> T {
        self.data[node.row * self.columns + node.col]
    }

    fn get_mut(&mut self, node: Self::Reference) -> &mut T {
        &mut self.data[node.row * self.columns + node.col]
    }
}

impl MapTrait for OccupancyGrid {
    type Reference = Point;
    type Storage<T: Default + Copy + Clone + 'static> = CellStorage<T>;

    fn is_valid(&self, node: Self::Reference) -> bool {
        self.contains(node)
    }

    fn is_blocked(&self, node: Self::Reference) -> bool {
        self.is_wall(node)
    }

    /// All eight neighbours that are inside the grid and not walls. Diagonal moves may squeeze
    /// between two walls touching at a corner.
    fn neighbors_of(&self, node: Self::Reference) -> impl Iterator<Item = (Self::Reference, usize)> {
        let mut points = Vec::with_capacity(8);

        if self.is_wall(node) {
            return points.into_iter();
        }

        for dr in -1isize..=1 {
            for dc in -1isize..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let row = node.row as isize + dr;
                let col = node.col as isize + dc;
                if row < 0 || col < 0 || row >= self.rows as isize || col >= self.columns as isize {
                    continue;
                }

                let cost = if dr != 0 && dc != 0 {
                    DIAGONAL_COST
                } else {
                    STRAIGHT_COST
                };
                points.push((
                    Point {
                        row: row as usize,
                        col: col as usize,
                    },
                    cost,
                ));
            }
        }

        // filter to only keep open cells
        points.retain(|(p, _)| !self.is_wall(*p));

        points.into_iter()
    }

    /// Manhattan distance in cells. Step costs are scaled by ten, so this never overestimates.
    fn heuristic(&self, from: Self::Reference, to: Self::Reference) -> usize {
        from.row.abs_diff(to.row) + from.col.abs_diff(to.col)
    }

    fn nodes(&self) -> impl Iterator<Item = Self::Reference> {
        self.points()
    }

    fn create_storage<T: Default + Copy + Clone + 'static>(&self) -> Self::Storage<T> {
        CellStorage {
            columns: self.columns,
            data: vec![Default::default(); self.rows * self.columns],
        }
    }
}

#[cfg(test)]
mod test {

    use super::*;

    fn create_basic_map() -> OccupancyGrid {
        "#######
         #.###.#
         #.###.#
         #.#...#
         #.#.###
         #......
         #######"
            .lines()
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n")
            .parse()
            .unwrap()
    }

    #[test]
    fn test_parse_and_print() {
        let map = create_basic_map();
        assert_eq!(map.rows(), 7);
        assert_eq!(map.columns(), 7);
        assert_eq!(map.get(Point::new(1, 1)), Cell::Path);
        assert_eq!(map.get(Point::new(1, 2)), Cell::Wall);
        assert_eq!(map.get(Point::new(5, 6)), Cell::Path);

        let printed = map.to_string();
        let reparsed: OccupancyGrid = printed.parse().unwrap();
        assert_eq!(reparsed, map);
    }

    #[test]
    fn test_parse_rejects_ragged_rows() {
        assert!("###\n##".parse::<OccupancyGrid>().is_err());
        assert!("#x#".parse::<OccupancyGrid>().is_err());
    }

    #[test]
    fn test_neighbors_skip_walls_and_edges() {
        let map = create_basic_map();

        let mut around: Vec<_> = map.neighbors_of(Point::new(3, 4)).collect();
        around.sort_by_key(|(p, _)| (p.row, p.col));
        assert_eq!(
            around,
            vec![
                (Point::new(2, 5), DIAGONAL_COST),
                (Point::new(3, 3), STRAIGHT_COST),
                (Point::new(3, 5), STRAIGHT_COST),
                (Point::new(4, 3), DIAGONAL_COST),
            ]
        );

        // corner of an open grid only has three neighbours
        let open = OccupancyGrid::new(3, 3);
        assert_eq!(open.neighbors_of(Point::new(0, 0)).count(), 3);
        assert_eq!(open.neighbors_of(Point::new(1, 1)).count(), 8);

        // walls have no neighbours at all
        assert_eq!(map.neighbors_of(Point::new(0, 0)).count(), 0);
    }

    #[test]
    fn test_fill_and_rows() {
        let mut grid = OccupancyGrid::new(4, 5);
        grid.fill(Point::new(1, 3), Point::new(2, 1), Cell::Wall);
        assert_eq!(grid.count(Cell::Wall), 6);
        assert!(grid.row(0).iter().all(|c| *c == Cell::Path));
        assert_eq!(grid.row(1)[1..4], [Cell::Wall; 3]);

        grid.row_mut(3)[4] = Cell::Solution;
        assert_eq!(grid.get(Point::new(3, 4)), Cell::Solution);
        assert_eq!(grid.points().count(), 20);
    }

    #[test]
    fn test_heuristic_is_manhattan() {
        let grid = OccupancyGrid::new(10, 10);
        assert_eq!(grid.heuristic(Point::new(1, 8), Point::new(7, 2)), 12);
        assert_eq!(grid.heuristic(Point::new(4, 4), Point::new(4, 4)), 0);
    }
}
