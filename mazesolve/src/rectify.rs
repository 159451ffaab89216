use image::{GrayImage, Luma, RgbaImage};
use imageproc::{
    drawing::draw_polygon_mut,
    geometric_transformations::{warp_into, Interpolation, Projection},
    point::Point,
    rect::Rect,
};
use log::debug;

use crate::error::SolveError;
use crate::geometry::{bounding_rect, clamp_rect, Quad};

/// Projection from photo coordinates onto the `width` x `height` rectangle the quad
/// straightens into
pub fn rectifying_projection(quad: &Quad) -> Result<(Projection, u32, u32), SolveError> {
    let (width, height) = quad.rectified_size();
    if width < 2 || height < 2 {
        return Err(SolveError::DegenerateSelection(format!(
            "selection straightens to {}x{}",
            width, height
        )));
    }

    let from = quad.corners().map(|p| (p.x as f32, p.y as f32));
    let (w, h) = ((width - 1) as f32, (height - 1) as f32);
    let to = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)];

    let projection = Projection::from_control_points(from, to).ok_or_else(|| {
        SolveError::DegenerateSelection("corners do not define a perspective".to_string())
    })?;

    Ok((projection, width, height))
}

/// Warps the quad onto an axis aligned rectangle whose sides are the longer of each pair of
/// opposing edges. With `inverse` the mapping is run backwards, taking a rectified image of
/// that size back towards the quad's shape.
pub fn perspective_transform(
    image: &GrayImage,
    quad: &Quad,
    inverse: bool,
) -> Result<GrayImage, SolveError> {
    let (projection, width, height) = rectifying_projection(quad)?;
    let projection = if inverse {
        projection.invert()
    } else {
        projection
    };

    let mut out = GrayImage::new(width, height);
    warp_into(
        image,
        &projection,
        Interpolation::Bilinear,
        Luma([255]),
        &mut out,
    );

    debug!(
        "perspective transform {}x{} -> {}x{} (inverse: {})",
        image.width(),
        image.height(),
        width,
        height,
        inverse
    );

    Ok(out)
}

/// Puts a rectified overlay back into photo space
pub fn unwarp_overlay(
    overlay: &RgbaImage,
    quad: &Quad,
    photo_width: u32,
    photo_height: u32,
) -> Result<RgbaImage, SolveError> {
    let (projection, _, _) = rectifying_projection(quad)?;

    let mut out = RgbaImage::new(photo_width, photo_height);
    warp_into(
        overlay,
        &projection.invert(),
        Interpolation::Bilinear,
        image::Rgba([0, 0, 0, 0]),
        &mut out,
    );

    Ok(out)
}

/// Crops the quadrilateral out of `image`.
///
/// Everything outside the quad is painted white, then the result is cut down to the quad's
/// bounding box clamped to the image. Returns the crop and where it sits in `image`.
pub fn crop_to_quadrilateral(
    image: &GrayImage,
    quad: &Quad,
) -> Result<(GrayImage, Rect), SolveError> {
    if quad.is_degenerate() {
        return Err(SolveError::DegenerateSelection(
            "corners are collinear or coincident".to_string(),
        ));
    }

    let bounds = clamp_rect(bounding_rect(quad), image.width(), image.height()).ok_or_else(
        || SolveError::DegenerateSelection("selection lies outside the image".to_string()),
    )?;

    // walking tl, tr, br, bl keeps the polygon from crossing itself
    let mut polygon: Vec<Point<i32>> = Vec::with_capacity(4);
    for corner in quad.outline() {
        let p = Point::new(corner.x, corner.y);
        if polygon.last() != Some(&p) {
            polygon.push(p);
        }
    }
    while polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }

    let mut mask = GrayImage::new(image.width(), image.height());
    draw_polygon_mut(&mut mask, &polygon, Luma([255]));

    let mut out = GrayImage::from_pixel(bounds.width(), bounds.height(), Luma([255]));
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let sx = bounds.left() as u32 + x;
        let sy = bounds.top() as u32 + y;
        if mask.get_pixel(sx, sy)[0] != 0 {
            *pixel = *image.get_pixel(sx, sy);
        }
    }

    debug!(
        "cropped {}x{} at ({}, {})",
        bounds.width(),
        bounds.height(),
        bounds.left(),
        bounds.top()
    );

    Ok((out, bounds))
}
