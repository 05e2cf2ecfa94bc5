//! Points, vectors, and bounding boxes in internal units.

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::units::decideg_to_deg;

/// A 2D point (or displacement vector) in internal units.
///
/// The Y axis grows downward, mirroring the board file coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: Point) -> f64 {
        let dx = (other.x - self.x) as f64;
        let dy = (other.y - self.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, rhs: Point) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Rotates `p` around `center` by `angle` decidegrees (counterclockwise in
/// board coordinates).
pub fn rotate_point(p: Point, center: Point, angle_decideg: i32) -> Point {
    if angle_decideg == 0 {
        return p;
    }
    let rad = decideg_to_deg(angle_decideg).to_radians();
    let (sin_a, cos_a) = rad.sin_cos();
    let dx = (p.x - center.x) as f64;
    let dy = (p.y - center.y) as f64;
    Point::new(
        center.x + (dx * cos_a - dy * sin_a).round() as i32,
        center.y + (dx * sin_a + dy * cos_a).round() as i32,
    )
}

/// Mirrors `p` across the horizontal axis through `center` (the flip
/// transform: items keep X, negate Y about the flip center).
pub fn mirror_point_y(p: Point, center: Point) -> Point {
    Point::new(p.x, 2 * center.y - p.y)
}

/// An axis-aligned bounding rectangle in internal units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    min: Point,
    max: Point,
}

impl BoundingBox {
    /// Builds a box from any two opposite corners.
    pub fn new(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn from_points(points: &[Point]) -> Self {
        let mut bbox = match points.first() {
            Some(p) => BoundingBox::new(*p, *p),
            None => BoundingBox::default(),
        };
        for p in &points[1..] {
            bbox.merge_point(*p);
        }
        bbox
    }

    pub fn min(&self) -> Point {
        self.min
    }

    pub fn max(&self) -> Point {
        self.max
    }

    pub fn width(&self) -> i32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> i32 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.min.x + self.width() / 2,
            self.min.y + self.height() / 2,
        )
    }

    /// Grows the box by `amount` in every direction.
    pub fn inflate(&mut self, amount: i32) {
        self.min.x -= amount;
        self.min.y -= amount;
        self.max.x += amount;
        self.max.y += amount;
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn merge_point(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    pub fn merge(&mut self, other: &BoundingBox) {
        self.merge_point(other.min);
        self.merge_point(other.max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_quarter_turn() {
        let center = Point::new(0, 0);
        let p = Point::new(1_000_000, 0);
        let r = rotate_point(p, center, 900);
        assert_eq!(r, Point::new(0, 1_000_000));
        let r = rotate_point(r, center, 900);
        assert_eq!(r, Point::new(-1_000_000, 0));
    }

    #[test]
    fn rotate_about_offset_center() {
        let center = Point::new(10, 10);
        assert_eq!(rotate_point(center, center, 450), center);
        let p = rotate_point(Point::new(20, 10), center, 1800);
        assert_eq!(p, Point::new(0, 10));
    }

    #[test]
    fn mirror_about_center() {
        let c = Point::new(0, 100);
        assert_eq!(mirror_point_y(Point::new(5, 150), c), Point::new(5, 50));
    }

    #[test]
    fn bbox_merge_and_tests() {
        let mut b = BoundingBox::new(Point::new(0, 0), Point::new(10, 10));
        assert!(b.contains(Point::new(5, 5)));
        assert!(!b.contains(Point::new(11, 5)));
        b.merge_point(Point::new(-5, 20));
        assert_eq!(b.min(), Point::new(-5, 0));
        assert_eq!(b.max(), Point::new(10, 20));

        let other = BoundingBox::new(Point::new(8, 8), Point::new(30, 30));
        assert!(b.intersects(&other));
        assert!(!b.contains_box(&other));
    }

    #[test]
    fn bbox_center() {
        let b = BoundingBox::new(Point::new(0, 0), Point::new(10, 20));
        assert_eq!(b.center(), Point::new(5, 10));
    }
}
