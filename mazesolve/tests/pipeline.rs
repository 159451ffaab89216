use image::{Rgba, RgbaImage};
use imageproc::{drawing::draw_filled_rect_mut, rect::Rect};
use mazesolve::{
    CancelToken, FailureKind, MazeSolver, Point2D, RectifyMode, SolveError, SolverConfig,
};

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// A 120x120 "photo" of a maze drawn with 2 pixel walls. The border runs from 20 to 99
/// with openings at x 55..=64 on the top and bottom, two inner walls hang off the border.
fn photo() -> RgbaImage {
    let mut image = RgbaImage::from_pixel(120, 120, WHITE);
    let mut wall = |x: i32, y: i32, w: u32, h: u32| {
        draw_filled_rect_mut(&mut image, Rect::at(x, y).of_size(w, h), BLACK)
    };

    // top and bottom, each split by the opening
    wall(20, 20, 35, 2);
    wall(65, 20, 35, 2);
    wall(20, 98, 35, 2);
    wall(65, 98, 35, 2);
    // sides
    wall(20, 20, 2, 80);
    wall(98, 20, 2, 80);
    // inner walls
    wall(40, 20, 2, 56);
    wall(78, 45, 2, 55);

    image
}

fn corners() -> [Point2D; 4] {
    [
        Point2D::new(114, 114),
        Point2D::new(5, 5),
        Point2D::new(114, 5),
        Point2D::new(5, 114),
    ]
}

fn is_marked(pixel: &Rgba<u8>) -> bool {
    pixel[0] == 255 && pixel[1] < 128 && pixel[2] < 128
}

fn solver(rectify: RectifyMode) -> MazeSolver {
    MazeSolver::new(SolverConfig {
        rectify,
        blur_kernel_size: 1,
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn test_solves_cropped_photo() {
    let photo = photo();
    let solution = solver(RectifyMode::Crop)
        .solve_with_cancel(&photo, corners(), &CancelToken::new())
        .unwrap();

    assert_eq!(solution.overlay.dimensions(), (120, 120));
    assert_eq!(solution.region.origin, Point2D::new(20, 20));
    assert_eq!(solution.region.scale, 2);
    assert_eq!(solution.path.first(), Some(&solution.endpoints.entrance));
    assert_eq!(solution.path.last(), Some(&solution.endpoints.exit));
    assert_eq!(solution.endpoints.entrance.row, 0);

    // the route runs down the corridor between the inner walls
    assert!((52..=68).any(|x| is_marked(solution.overlay.get_pixel(x, 60))));
    assert_eq!(*solution.overlay.get_pixel(30, 60), WHITE);
    assert_eq!(*solution.overlay.get_pixel(2, 2), WHITE);
}

#[test]
fn test_solves_warped_photo() {
    let photo = photo();
    let overlay = solver(RectifyMode::Perspective)
        .solve(&photo, corners())
        .unwrap();

    assert_eq!(overlay.dimensions(), (120, 120));
    assert!((50..=70).any(|x| is_marked(overlay.get_pixel(x, 60))));
    assert_eq!(*overlay.get_pixel(30, 60), WHITE);
}

#[test]
fn test_collinear_corners() {
    let photo = photo();
    let corners = [
        Point2D::new(10, 10),
        Point2D::new(40, 40),
        Point2D::new(70, 70),
        Point2D::new(100, 100),
    ];

    assert!(matches!(
        solver(RectifyMode::Crop).solve(&photo, corners),
        Err(SolveError::DegenerateSelection(_))
    ));
}

#[test]
fn test_diamond_corners_enclose_area() {
    let photo = photo();
    let corners = [
        Point2D::new(60, 5),
        Point2D::new(115, 60),
        Point2D::new(5, 60),
        Point2D::new(60, 115),
    ];

    for mode in [RectifyMode::Crop, RectifyMode::Perspective] {
        let result = solver(mode).solve(&photo, corners);
        assert!(
            !matches!(result, Err(SolveError::DegenerateSelection(_))),
            "diamond selection rejected in {:?} mode",
            mode
        );
    }
}

#[tokio::test]
async fn test_async_solve() {
    let solution = solver(RectifyMode::Crop)
        .solve_async(photo(), corners(), CancelToken::new())
        .await
        .unwrap();
    assert!(solution.total_cost > 0);

    let cancel = CancelToken::new();
    cancel.cancel();
    let failure = solver(RectifyMode::Crop)
        .solve_async(photo(), corners(), cancel)
        .await
        .unwrap_err();
    assert_eq!(failure.kind, FailureKind::Cancelled);
}
