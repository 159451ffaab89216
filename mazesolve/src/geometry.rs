use std::{fmt::Display, str::FromStr};

use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

/// Integer pixel coordinate inside one image frame (photo, crop or solving grid)
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Point2D {
    pub x: i32,
    pub y: i32,
}

impl Point2D {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    fn sum(&self) -> i64 {
        self.x as i64 + self.y as i64
    }

    fn diff(&self) -> i64 {
        self.y as i64 - self.x as i64
    }
}

impl Display for Point2D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for Point2D {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| anyhow::anyhow!("Invalid point, expected x,y: {}", s))?;
        Ok(Point2D {
            x: x.trim().parse()?,
            y: y.trim().parse()?,
        })
    }
}

/// Four corners in canonical order, see [`order_points`]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub top_left: Point2D,
    pub top_right: Point2D,
    pub bottom_left: Point2D,
    pub bottom_right: Point2D,
}

impl Quad {
    /// Corners as `[top_left, top_right, bottom_left, bottom_right]`
    pub fn corners(&self) -> [Point2D; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_left,
            self.bottom_right,
        ]
    }

    /// Corners walked around the outline (tl, tr, br, bl) so that a polygon built from them
    /// does not cross itself.
    pub fn outline(&self) -> [Point2D; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Twice the signed shoelace area of the outline
    pub fn doubled_area(&self) -> i64 {
        let pts = self.outline();
        let mut acc = 0i64;
        for i in 0..pts.len() {
            let a = pts[i];
            let b = pts[(i + 1) % pts.len()];
            acc += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
        }
        acc
    }

    pub fn is_degenerate(&self) -> bool {
        self.doubled_area() == 0
    }

    /// Width and height of the rectangle the quad straightens into: the longer of each pair of
    /// opposing edges, rounded.
    pub fn rectified_size(&self) -> (u32, u32) {
        let width = distance(self.top_left, self.top_right)
            .max(distance(self.bottom_left, self.bottom_right));
        let height = distance(self.top_left, self.bottom_left)
            .max(distance(self.top_right, self.bottom_right));
        (width.round() as u32, height.round() as u32)
    }
}

/// Orders four arbitrary points into a [`Quad`].
///
/// Top left has the smallest `x + y`, bottom right the largest; top right has the smallest
/// `y - x`, bottom left the largest. Ties are broken going round the quad: top left takes the
/// upper point, top right the rightmost, bottom right the lower and bottom left the leftmost,
/// so a selection rotated by 45 degrees still gets four distinct corners. Every choice only
/// depends on the set of points, so ordering an ordered quad returns it unchanged and any
/// permutation of the input gives the same result.
pub fn order_points(pts: [Point2D; 4]) -> Quad {
    let min_by = |key: fn(&Point2D) -> (i64, i64)| {
        pts.iter()
            .copied()
            .min_by_key(key)
            .unwrap_or(pts[0])
    };

    Quad {
        top_left: min_by(|p| (p.sum(), p.y as i64)),
        bottom_right: min_by(|p| (-p.sum(), -(p.y as i64))),
        top_right: min_by(|p| (p.diff(), -(p.x as i64))),
        bottom_left: min_by(|p| (-p.diff(), p.x as i64)),
    }
}

pub fn distance(a: Point2D, b: Point2D) -> f64 {
    let dx = (a.x - b.x) as f64;
    let dy = (a.y - b.y) as f64;
    (dx * dx + dy * dy).sqrt()
}

/// Axis aligned bounding box of the quad, both ends inclusive
pub fn bounding_rect(quad: &Quad) -> Rect {
    let corners = quad.corners();
    let left = corners.iter().map(|p| p.x).min().unwrap_or(0);
    let right = corners.iter().map(|p| p.x).max().unwrap_or(0);
    let top = corners.iter().map(|p| p.y).min().unwrap_or(0);
    let bottom = corners.iter().map(|p| p.y).max().unwrap_or(0);

    Rect::at(left, top).of_size((right - left + 1) as u32, (bottom - top + 1) as u32)
}

/// Smallest rectangle containing both
pub fn union_rect(a: Rect, b: Rect) -> Rect {
    let left = a.left().min(b.left());
    let top = a.top().min(b.top());
    let right = a.right().max(b.right());
    let bottom = a.bottom().max(b.bottom());
    Rect::at(left, top).of_size((right - left + 1) as u32, (bottom - top + 1) as u32)
}

/// Restricts `rect` to a `width` x `height` image, `None` if nothing is left
pub fn clamp_rect(rect: Rect, width: u32, height: u32) -> Option<Rect> {
    let left = rect.left().max(0);
    let top = rect.top().max(0);
    let right = rect.right().min(width as i32 - 1);
    let bottom = rect.bottom().min(height as i32 - 1);

    if right < left || bottom < top {
        return None;
    }

    Some(Rect::at(left, top).of_size((right - left + 1) as u32, (bottom - top + 1) as u32))
}
