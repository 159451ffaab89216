use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mazesolve::{
    grid::{Cell, OccupancyGrid, Point},
    PathFinder, PathFinderState,
};

/// Horizontal walls every fourth row, alternately open at the right and left end, so the
/// route has to snake through the whole grid
fn serpentine(size: usize) -> (OccupancyGrid, Point, Point) {
    let mut map = OccupancyGrid::new(size, size);

    for (i, row) in (3..size - 1).step_by(4).enumerate() {
        if i % 2 == 0 {
            map.fill(Point::new(row, 0), Point::new(row, size - 3), Cell::Wall);
        } else {
            map.fill(Point::new(row, 2), Point::new(row, size - 1), Cell::Wall);
        }
    }

    (map, Point::new(0, 0), Point::new(size - 1, size - 1))
}

fn bench_serpentine(c: &mut Criterion, size: usize) {
    let (map, start, goal) = serpentine(size);

    c.bench_function(&format!("serpentine_{}", size), |b| {
        b.iter(|| {
            let res = PathFinder::new(&map, black_box(start), black_box(goal)).finish(&map);
            assert!(matches!(res, PathFinderState::PathFound(_)));
        })
    });
}

pub fn map_small(c: &mut Criterion) {
    bench_serpentine(c, 64);
}

pub fn map_medium(c: &mut Criterion) {
    bench_serpentine(c, 128);
}

pub fn map_large(c: &mut Criterion) {
    bench_serpentine(c, 256);
}

criterion_group!(benches, map_small, map_medium, map_large);
criterion_main!(benches);
