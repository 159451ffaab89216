use std::{cmp::Ordering, collections::BinaryHeap, fmt::Debug};

use serde::Serialize;

use crate::pipeline::CancelToken;

/// Supertrait that collects all the requirements on the NodeReference values
/// Must be copy, comparable and not references (hence 'static)
pub trait NodeReference: Copy + Eq + Debug + 'static {}

pub trait MapTrait {
    /// The type that can be used to reference nodes in the map
    type Reference: NodeReference;

    /// The type that the map uses for storage
    type Storage<T: Default + Copy + Clone + 'static>: MapStorage<T, Reference = Self::Reference>;

    /// Check if the provided node reference is inside the map
    fn is_valid(&self, node: Self::Reference) -> bool;

    /// Blocked nodes are never entered
    fn is_blocked(&self, node: Self::Reference) -> bool;

    /// Return an iterator over the neighbors of the provided node and the cost required to go there
    fn neighbors_of(&self, node: Self::Reference) -> impl Iterator<Item = (Self::Reference, usize)>;

    /// Estimated cost between two nodes, fixed per node for a given goal
    fn heuristic(&self, from: Self::Reference, to: Self::Reference) -> usize;

    /// Every node of the map
    fn nodes(&self) -> impl Iterator<Item = Self::Reference>;

    /// Create a storage for values of type T
    fn create_storage<T: Default + Copy + Clone + 'static>(&self) -> Self::Storage<T>;
}

pub trait MapStorage<T> {
    type Reference: NodeReference;

    fn get(&self, node: Self::Reference) -> T;
    fn get_mut(&mut self, node: Self::Reference) -> &mut T;
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SearchState {
    #[default]
    Unvisited,
    Open,
    Closed,
}

/// Search bookkeeping for one open cell. Blocked cells have no SearchCell at all.
#[derive(Copy, Clone, Debug)]
pub struct SearchCell<R> {
    pub heuristic: usize,
    pub cost: usize,
    pub parent: Option<R>,
    pub state: SearchState,
}

impl<R> SearchCell<R> {
    fn new(heuristic: usize) -> Self {
        Self {
            heuristic,
            cost: 0,
            parent: None,
            state: SearchState::Unvisited,
        }
    }
}

/// The objects that we store in the priority queue
#[derive(Debug)]
struct ToVisit<R> {
    priority: usize,
    cost: usize,
    sequence: u64,
    point: R,
}

impl<R> Ord for ToVisit<R> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // reversed for BinaryHeap to be a min-heap, earlier insertions win ties
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl<R> PartialOrd for ToVisit<R> {
    fn partial_cmp(&self, other: &ToVisit<R>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<R> PartialEq for ToVisit<R> {
    fn eq(&self, other: &ToVisit<R>) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<R> Eq for ToVisit<R> {}

#[derive(Debug, PartialEq, Clone, Eq, Serialize)]
pub struct PathResult<R> {
    pub path: Vec<R>,
    pub start: R,
    pub goal: R,
    pub total_cost: usize,
    pub expanded: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathFinderState<R> {
    Computing,
    NoPathFound,
    Cancelled,
    PathFound(PathResult<R>),
}

impl<R> PathFinderState<R> {
    pub fn is_done(&self) -> bool {
        !matches!(self, PathFinderState::Computing)
    }
}

/// A* search over a [`MapTrait`], driven one expansion at a time with [`PathFinder::step`]
pub struct PathFinder<M: MapTrait> {
    start: M::Reference,
    goal: M::Reference,
    cells: M::Storage<Option<SearchCell<M::Reference>>>,
    open: BinaryHeap<ToVisit<M::Reference>>,
    sequence: u64,
    expanded: usize,
    state: PathFinderState<M::Reference>,
}

impl<M: MapTrait> PathFinder<M> {
    pub fn new(map: &M, start: M::Reference, goal: M::Reference) -> Self {
        let mut cells = map.create_storage::<Option<SearchCell<M::Reference>>>();
        for node in map.nodes() {
            if !map.is_blocked(node) {
                *cells.get_mut(node) = Some(SearchCell::new(map.heuristic(node, goal)));
            }
        }

        let mut finder = Self {
            start,
            goal,
            cells,
            open: BinaryHeap::new(),
            sequence: 0,
            expanded: 0,
            state: PathFinderState::Computing,
        };

        let start_cell = if map.is_valid(start) && map.is_valid(goal) {
            finder.cells.get(start)
        } else {
            None
        };

        match start_cell {
            Some(mut cell) => {
                cell.state = SearchState::Open;
                *finder.cells.get_mut(start) = Some(cell);
                finder.push(start, 0, cell.heuristic);
            }
            // a blocked or out of range start can never reach anything
            None => finder.state = PathFinderState::NoPathFound,
        }

        finder
    }

    fn push(&mut self, point: M::Reference, cost: usize, heuristic: usize) {
        self.open.push(ToVisit {
            priority: cost + heuristic,
            cost,
            sequence: self.sequence,
            point,
        });
        self.sequence += 1;
    }

    pub fn finish(self, map: &M) -> PathFinderState<M::Reference> {
        self.finish_with(map, &CancelToken::default())
    }

    /// Runs to completion, checking `cancel` between expansions
    pub fn finish_with(mut self, map: &M, cancel: &CancelToken) -> PathFinderState<M::Reference> {
        loop {
            if cancel.is_cancelled() {
                self.state = PathFinderState::Cancelled;
                return self.state;
            }
            match self.step(map) {
                PathFinderState::Computing => {}
                s => return s,
            }
        }
    }

    pub fn step(&mut self, map: &M) -> PathFinderState<M::Reference> {
        if self.state.is_done() {
            return self.state.clone();
        }

        let Some(visit) = self.open.pop() else {
            self.state = PathFinderState::NoPathFound;
            return self.state.clone();
        };

        let Some(mut current) = self.cells.get(visit.point) else {
            return self.state.clone();
        };

        // skip entries that were superseded by a cheaper route
        if current.state == SearchState::Closed || visit.cost != current.cost {
            return self.state.clone();
        }

        current.state = SearchState::Closed;
        *self.cells.get_mut(visit.point) = Some(current);
        self.expanded += 1;

        if visit.point == self.goal {
            self.state = PathFinderState::PathFound(PathResult {
                path: self.backtrack(),
                start: self.start,
                goal: self.goal,
                total_cost: current.cost,
                expanded: self.expanded,
            });
            return self.state.clone();
        }

        for (point, move_cost) in map.neighbors_of(visit.point) {
            let Some(mut next) = self.cells.get(point) else {
                continue;
            };
            if next.state == SearchState::Closed {
                continue;
            }

            let cost = current.cost + move_cost;
            if next.state == SearchState::Unvisited || cost < next.cost {
                next.cost = cost;
                next.parent = Some(visit.point);
                next.state = SearchState::Open;
                *self.cells.get_mut(point) = Some(next);
                self.push(point, cost, next.heuristic);
            }
        }

        self.state.clone()
    }

    /// Follows the parent links from the goal back to the start
    fn backtrack(&self) -> Vec<M::Reference> {
        let mut path = vec![self.goal];
        let mut current = self.goal;

        loop {
            match self.cells.get(current) {
                Some(SearchCell { parent: None, .. }) => break,
                Some(SearchCell {
                    parent: Some(parent),
                    ..
                }) => {
                    path.push(parent);
                    current = parent;
                }
                None => panic!("Backtracking lead to a blocked cell {:?}", current),
            }
        }

        path.reverse();
        path
    }

    pub fn state(&self) -> &PathFinderState<M::Reference> {
        &self.state
    }

    pub fn search_cell(&self, node: M::Reference) -> Option<SearchCell<M::Reference>> {
        self.cells.get(node)
    }

    pub fn expanded(&self) -> usize {
        self.expanded
    }

    pub fn start(&self) -> M::Reference {
        self.start
    }

    pub fn goal(&self) -> M::Reference {
        self.goal
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::grid::{Cell, OccupancyGrid, Point, DIAGONAL_COST, STRAIGHT_COST};

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

    fn octile(a: Point, b: Point) -> usize {
        let dr = a.row.abs_diff(b.row);
        let dc = a.col.abs_diff(b.col);
        let diagonal = dr.min(dc);
        (dr + dc - 2 * diagonal) * STRAIGHT_COST + diagonal * DIAGONAL_COST
    }

    #[test]
    fn test_basic_route() {
        let map = create_basic_map();

        let finder = PathFinder::new(&map, Point::new(1, 1), Point::new(1, 5));

        // down the left corridor, then diagonally up through the middle
        match finder.finish(&map) {
            PathFinderState::PathFound(result) => {
                assert_eq!(result.path.first(), Some(&Point::new(1, 1)));
                assert_eq!(result.path.last(), Some(&Point::new(1, 5)));
                assert_eq!(result.total_cost, 3 * STRAIGHT_COST + 4 * DIAGONAL_COST + STRAIGHT_COST);
                for pair in result.path.windows(2) {
                    assert!(pair[0].row.abs_diff(pair[1].row) <= 1);
                    assert!(pair[0].col.abs_diff(pair[1].col) <= 1);
                    assert!(!map.is_wall(pair[1]));
                }
            }
            other => panic!("expected a path, got {:?}", other),
        }
    }

    #[test]
    fn test_basic_no_route() {
        let map = create_basic_map();

        let finder = PathFinder::new(&map, Point::new(1, 1), Point::new(0, 5));
        // goal is a wall
        assert!(matches!(finder.finish(&map), PathFinderState::NoPathFound));
    }

    #[test]
    fn test_walled_in_goal() {
        let mut map = OccupancyGrid::new(9, 9);
        map.fill(Point::new(3, 3), Point::new(5, 5), Cell::Wall);
        map.set(Point::new(4, 4), Cell::Path);

        let finder = PathFinder::new(&map, Point::new(0, 0), Point::new(4, 4));
        assert!(matches!(finder.finish(&map), PathFinderState::NoPathFound));
    }

    #[test]
    fn test_open_grid_costs_are_octile() {
        let map = OccupancyGrid::new(12, 15);
        let pairs = [
            (Point::new(0, 0), Point::new(11, 14)),
            (Point::new(3, 9), Point::new(10, 1)),
            (Point::new(6, 2), Point::new(6, 13)),
            (Point::new(11, 7), Point::new(0, 5)),
        ];

        for (start, goal) in pairs {
            let state = PathFinder::new(&map, start, goal).finish(&map);
            match state {
                PathFinderState::PathFound(result) => {
                    assert_eq!(result.total_cost, octile(start, goal), "{:?} -> {:?}", start, goal);
                    assert_eq!(result.path.len(), start.row.abs_diff(goal.row).max(start.col.abs_diff(goal.col)) + 1);
                }
                other => panic!("expected a path, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_start_is_goal() {
        let map = OccupancyGrid::new(5, 5);
        let mut finder = PathFinder::new(&map, Point::new(2, 3), Point::new(2, 3));

        let state = finder.step(&map);
        assert_eq!(
            state,
            PathFinderState::PathFound(PathResult {
                path: vec![Point::new(2, 3)],
                start: Point::new(2, 3),
                goal: Point::new(2, 3),
                total_cost: 0,
                expanded: 1,
            })
        );
        // finished finders stay finished
        assert_eq!(finder.step(&map), state);
    }

    #[test]
    fn test_step_state_machine() {
        let map = OccupancyGrid::new(3, 3);
        let mut finder = PathFinder::new(&map, Point::new(0, 0), Point::new(2, 2));

        assert_eq!(
            finder.search_cell(Point::new(0, 0)).map(|c| c.state),
            Some(SearchState::Open)
        );
        assert_eq!(finder.step(&map), PathFinderState::Computing);
        assert_eq!(
            finder.search_cell(Point::new(0, 0)).map(|c| c.state),
            Some(SearchState::Closed)
        );
        let diagonal = finder.search_cell(Point::new(1, 1)).unwrap();
        assert_eq!(diagonal.state, SearchState::Open);
        assert_eq!(diagonal.cost, DIAGONAL_COST);
        assert_eq!(diagonal.heuristic, 2);
        assert_eq!(diagonal.parent, Some(Point::new(0, 0)));
    }

    #[test]
    fn test_blocked_cells_have_no_search_cell() {
        let map = create_basic_map();
        let finder = PathFinder::new(&map, Point::new(1, 1), Point::new(1, 5));
        assert!(finder.search_cell(Point::new(0, 0)).is_none());
        assert_eq!(
            finder.search_cell(Point::new(5, 6)).map(|c| c.heuristic),
            Some(4 + 1)
        );
    }

    #[test]
    fn test_cancelled_search() {
        let map = OccupancyGrid::new(50, 50);
        let cancel = CancelToken::default();
        cancel.cancel();

        let finder = PathFinder::new(&map, Point::new(0, 0), Point::new(49, 49));
        assert_eq!(finder.finish_with(&map, &cancel), PathFinderState::Cancelled);
    }
}
