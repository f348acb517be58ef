//! Plane geometry used by the cloner.
//!
//! All coordinates are board millimetres in KiCad's frame: x grows to the
//! right, y grows downwards, angles are degrees counter-clockwise as seen on
//! screen.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Rotates a footprint-local point by a footprint orientation.
    ///
    /// KiCad's y axis points down, so a positive (counter-clockwise on screen)
    /// orientation is a negative rotation in the usual maths convention.
    pub fn rotated(self, angle_deg: f64) -> Self {
        if angle_deg == 0.0 {
            return self;
        }
        let angle_rad = (-angle_deg).to_radians();
        let (sin_a, cos_a) = angle_rad.sin_cos();
        Self {
            x: self.x * cos_a - self.y * sin_a,
            y: self.x * sin_a + self.y * cos_a,
        }
    }
}

/// A translation between two points.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Vector {
    pub dx: f64,
    pub dy: f64,
}

impl Vector {
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }
}

impl Add<Vector> for Point {
    type Output = Point;

    fn add(self, v: Vector) -> Point {
        Point::new(self.x + v.dx, self.y + v.dy)
    }
}

impl Sub for Point {
    type Output = Vector;

    fn sub(self, other: Point) -> Vector {
        Vector::new(self.x - other.x, self.y - other.y)
    }
}

/// Axis-aligned box, edges inclusive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    pub fn new(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        Some(iter.fold(BoundingBox::new(first, first), |bbox, p| bbox.including(*p)))
    }

    pub fn around(center: Point, half_size: f64) -> Self {
        Self::new(
            Point::new(center.x - half_size, center.y - half_size),
            Point::new(center.x + half_size, center.y + half_size),
        )
    }

    fn including(self, p: Point) -> Self {
        Self {
            min: Point::new(self.min.x.min(p.x), self.min.y.min(p.y)),
            max: Point::new(self.max.x.max(p.x), self.max.y.max(p.y)),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    /// True when the segment touches or crosses the box.
    pub fn intersects_segment(&self, a: Point, b: Point) -> bool {
        if self.contains(a) || self.contains(b) {
            return true;
        }
        if !self.intersects(&BoundingBox::new(a, b)) {
            return false;
        }
        let corners = [
            self.min,
            Point::new(self.max.x, self.min.y),
            self.max,
            Point::new(self.min.x, self.max.y),
        ];
        (0..4).any(|i| segments_intersect(a, b, corners[i], corners[(i + 1) % 4]))
    }
}

fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Closed-segment intersection, collinear overlaps included.
pub fn segments_intersect(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(q1, q2, p1))
        || (d2 == 0.0 && on_segment(q1, q2, p2))
        || (d3 == 0.0 && on_segment(p1, p2, q1))
        || (d4 == 0.0 && on_segment(p1, p2, q2))
}

/// Even-odd point-in-polygon test. The polygon is implicitly closed.
pub fn polygon_contains(polygon: &[Point], p: Point) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Normalises an angle to the half-open range (-180, 180].
pub fn normalize_angle(angle_deg: f64) -> f64 {
    let mut a = angle_deg % 360.0;
    if a <= -180.0 {
        a += 360.0;
    } else if a > 180.0 {
        a -= 360.0;
    }
    if a == 0.0 {
        0.0
    } else {
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Vec<Point> {
        vec![
            Point::new(x0, y0),
            Point::new(x0 + size, y0),
            Point::new(x0 + size, y0 + size),
            Point::new(x0, y0 + size),
        ]
    }

    #[test]
    fn test_rotation_follows_kicad_orientation() {
        // A pad to the right of the origin ends up above it after +90 degrees
        let p = Point::new(1.0, 0.0).rotated(90.0);
        assert!((p.x - 0.0).abs() < 1e-9);
        assert!((p.y + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_polygon_contains() {
        let poly = square(2.0, 2.0, 4.0);
        assert!(polygon_contains(&poly, Point::new(3.0, 4.0)));
        assert!(!polygon_contains(&poly, Point::new(7.0, 4.0)));
        assert!(!polygon_contains(&poly[..2], Point::new(3.0, 4.0)));
    }

    #[test]
    fn test_concave_polygon() {
        // U shape: the notch between the arms is outside
        let poly = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 2.0),
            Point::new(2.0, 2.0),
            Point::new(2.0, 0.0),
            Point::new(3.0, 0.0),
            Point::new(3.0, 3.0),
            Point::new(0.0, 3.0),
        ];
        assert!(!polygon_contains(&poly, Point::new(1.5, 1.0)));
        assert!(polygon_contains(&poly, Point::new(0.5, 1.0)));
        assert!(polygon_contains(&poly, Point::new(1.5, 2.5)));
    }

    #[test]
    fn test_bbox_segment_intersection() {
        let bbox = BoundingBox::new(Point::new(0.0, 0.0), Point::new(8.0, 8.0));
        // inside
        assert!(bbox.intersects_segment(Point::new(1.0, 1.0), Point::new(2.0, 2.0)));
        // crossing with both ends outside
        assert!(bbox.intersects_segment(Point::new(-2.0, 4.0), Point::new(10.0, 4.0)));
        // touching an edge
        assert!(!bbox.intersects_segment(Point::new(8.0, 10.0), Point::new(8.0, 12.0)));
        assert!(bbox.intersects_segment(Point::new(8.0, 8.0), Point::new(12.0, 12.0)));
        // outside
        assert!(!bbox.intersects_segment(Point::new(20.0, 20.0), Point::new(30.0, 20.0)));
        // diagonal passing the corner without touching
        assert!(!bbox.intersects_segment(Point::new(9.0, -2.0), Point::new(12.0, 1.0)));
    }

    #[test]
    fn test_bbox_from_points() {
        let bbox = BoundingBox::from_points(&square(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(bbox.min, Point::new(1.0, 2.0));
        assert_eq!(bbox.width(), 3.0);
        assert_eq!(bbox.height(), 3.0);
        assert!(BoundingBox::from_points(&[]).is_none());
    }

    #[test]
    fn test_normalize_angle() {
        assert_eq!(normalize_angle(270.0), -90.0);
        assert_eq!(normalize_angle(-180.0), 180.0);
        assert_eq!(normalize_angle(180.0), 180.0);
        assert_eq!(normalize_angle(360.0), 0.0);
        assert_eq!(normalize_angle(-450.0), -90.0);
    }
}
