use image::{
    imageops::{self, FilterType},
    GrayImage, Luma,
};
use imageproc::{
    contours::{find_contours, BorderType, Contour},
    filter::{box_filter, gaussian_blur_f32},
    geometry::{approximate_polygon_dp, arc_length},
    point::Point,
    rect::Rect,
};
use log::{debug, warn};
use serde::Serialize;

use crate::config::SolverConfig;
use crate::error::SolveError;
use crate::geometry::{clamp_rect, distance, union_rect, Point2D, Quad};
use crate::grid::OccupancyGrid;
use crate::util::grid_from_binary;

/// The homography the grid was solved under, when the photo was warped instead of cropped
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Rectification {
    pub quad: Quad,
    pub width: u32,
    pub height: u32,
}

/// Where the solved grid sits in the photo.
///
/// One grid cell covers `scale` x `scale` pixels starting at `origin`. Without a
/// rectification `origin` is in photo coordinates, otherwise it is in the rectified image
/// and the overlay has to be warped back through `rectification`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RenderRegion {
    pub origin: Point2D,
    pub width: u32,
    pub height: u32,
    pub scale: u32,
    pub rectification: Option<Rectification>,
}

impl RenderRegion {
    pub fn offset(mut self, dx: i32, dy: i32) -> Self {
        self.origin.x += dx;
        self.origin.y += dy;
        self
    }

    /// The region was derived from this grid
    pub fn matches(&self, grid: &OccupancyGrid) -> bool {
        self.width == grid.columns() as u32 * self.scale
            && self.height == grid.rows() as u32 * self.scale
    }
}

#[derive(Clone, Debug)]
pub struct Segmentation {
    pub grid: OccupancyGrid,
    pub region: RenderRegion,
}

/// Mean adaptive threshold: a pixel stays white when it is brighter than the mean of the
/// `block_size` window around it minus `constant`, everything else becomes black.
pub fn adaptive_threshold_mean(image: &GrayImage, block_size: u32, constant: i16) -> GrayImage {
    let radius = block_size / 2;
    let means = box_filter(image, radius, radius);

    let mut out = GrayImage::new(image.width(), image.height());
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let value = image.get_pixel(x, y)[0] as i16;
        let mean = means.get_pixel(x, y)[0] as i16;
        *pixel = if value > mean - constant {
            Luma([255])
        } else {
            Luma([0])
        };
    }

    out
}

fn blur(image: &GrayImage, kernel_size: u32) -> GrayImage {
    if kernel_size <= 1 {
        return image.clone();
    }

    // sigma a kernel of this size would get when none is given
    let sigma = 0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    gaussian_blur_f32(image, sigma)
}

fn contour_bounds(points: &[Point<i32>]) -> Option<Rect> {
    let left = points.iter().map(|p| p.x).min()?;
    let right = points.iter().map(|p| p.x).max()?;
    let top = points.iter().map(|p| p.y).min()?;
    let bottom = points.iter().map(|p| p.y).max()?;

    Some(Rect::at(left, top).of_size((right - left + 1) as u32, (bottom - top + 1) as u32))
}

/// Number of corners of the simplified contour, with vertices closer than `epsilon` to the
/// previous one merged
fn corner_count(points: &[Point<i32>], epsilon: f64) -> usize {
    let approx = approximate_polygon_dp(points, epsilon, true);
    let merge = epsilon.max(1.0);

    let mut corners: Vec<Point<i32>> = Vec::with_capacity(approx.len());
    for p in approx {
        let close = corners.last().map_or(false, |last| {
            distance(Point2D::new(last.x, last.y), Point2D::new(p.x, p.y)) <= merge
        });
        if !close {
            corners.push(p);
        }
    }
    while corners.len() > 1 {
        let (first, last) = (corners[0], corners[corners.len() - 1]);
        if distance(Point2D::new(first.x, first.y), Point2D::new(last.x, last.y)) > merge {
            break;
        }
        corners.pop();
    }

    corners.len()
}

/// Tightens the crop to the maze itself.
///
/// `binary` has ink black. Outer borders of ink blobs are traced, any that simplify to a
/// quadrilateral are taken for the photo or paper edge and dropped, and the bounding boxes
/// of the two longest remaining ones are joined. Two, because a maze that already has a
/// line drawn through it often falls apart in two halves.
pub fn refine_bounds(binary: &GrayImage, epsilon: f64, inset: u32) -> Result<Rect, SolveError> {
    let mut ink = binary.clone();
    imageops::invert(&mut ink);

    let contours: Vec<Contour<i32>> = find_contours(&ink);
    let total = contours.len();

    let mut kept: Vec<(f64, Rect)> = contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.points.len() >= 3)
        .filter_map(|c| {
            let perimeter = arc_length(&c.points, true);
            if perimeter <= 0.0 || corner_count(&c.points, epsilon * perimeter) == 4 {
                return None;
            }
            Some((perimeter, contour_bounds(&c.points)?))
        })
        .collect();

    debug!("{} contours, {} outer non-square", total, kept.len());

    kept.sort_by(|a, b| b.0.total_cmp(&a.0));
    let rect = kept
        .into_iter()
        .take(2)
        .map(|(_, rect)| rect)
        .reduce(union_rect)
        .ok_or(SolveError::SegmentationAmbiguous)?;

    let rect = if inset > 0 && rect.width() > 2 * inset && rect.height() > 2 * inset {
        Rect::at(rect.left() + inset as i32, rect.top() + inset as i32)
            .of_size(rect.width() - 2 * inset, rect.height() - 2 * inset)
    } else {
        rect
    };

    clamp_rect(rect, binary.width(), binary.height()).ok_or(SolveError::SegmentationAmbiguous)
}

/// Segments a rectified, single channel image into the solving grid.
///
/// The returned region is relative to `image`; callers shift it by wherever `image` came
/// from.
pub fn segment(image: &GrayImage, config: &SolverConfig) -> Result<Segmentation, SolveError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(SolveError::InternalInvariant(
            "nothing to segment in an empty image".to_string(),
        ));
    }

    let blurred = blur(image, config.blur_kernel_size);
    let binary = adaptive_threshold_mean(
        &blurred,
        config.threshold_block_size,
        config.threshold_constant,
    );

    let bounds = match refine_bounds(&binary, config.square_epsilon, config.refine_inset) {
        Ok(rect) => rect,
        Err(e) => {
            warn!("{}, keeping the unrefined crop", e);
            Rect::at(0, 0).of_size(width, height)
        }
    };
    debug!(
        "maze bounds {}x{} at ({}, {})",
        bounds.width(),
        bounds.height(),
        bounds.left(),
        bounds.top()
    );

    let refined = imageops::crop_imm(
        &binary,
        bounds.left() as u32,
        bounds.top() as u32,
        bounds.width(),
        bounds.height(),
    )
    .to_image();

    let scale = config.downscale;
    let small = if scale > 1 {
        let resized = imageops::resize(
            &refined,
            (refined.width() / scale).max(1),
            (refined.height() / scale).max(1),
            FilterType::Triangle,
        );
        adaptive_threshold_mean(
            &resized,
            config.threshold_block_size,
            config.threshold_constant,
        )
    } else {
        refined
    };

    let grid = grid_from_binary(&small);
    debug!(
        "grid of {}x{} cells, {} walls",
        grid.rows(),
        grid.columns(),
        grid.count(crate::grid::Cell::Wall)
    );

    let region = RenderRegion {
        origin: Point2D::new(bounds.left(), bounds.top()),
        width: grid.columns() as u32 * scale,
        height: grid.rows() as u32 * scale,
        scale,
        rectification: None,
    };

    Ok(Segmentation { grid, region })
}
