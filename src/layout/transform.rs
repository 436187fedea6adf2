//! Rotation of resolved asset boxes.
//!
//! Rotation never feeds back into resolution: a sibling that references a rotated
//! asset sees its unrotated displayed box. Rotation only affects what is drawn and
//! the visual bounds used for hit areas and snapping.
//!
//! ## Loose bounds
//!
//! The visual bounds of a rotated box are the axis-aligned box around its four
//! rotated corners. This matches how SVG/CSS transforms report bounds.
//!
//! ## Convention
//!
//! Clockwise positive angles in degrees, Y-axis pointing down.

use super::types::{BoundingBox, Point};

/// Clockwise turn of an asset around its pivot
#[derive(Debug, Clone, Copy)]
pub struct Rotation {
    pub degrees: f64,
    pub pivot: Point,
}

impl Rotation {
    pub fn new(degrees: f64, pivot: Point) -> Self {
        Self { degrees, pivot }
    }

    /// Whole turns draw exactly like no rotation
    pub fn is_whole_turn(&self) -> bool {
        self.degrees.rem_euclid(360.0).abs() < f64::EPSILON
    }

    pub fn apply(&self, point: Point) -> Point {
        if self.is_whole_turn() {
            return point;
        }
        let (sin, cos) = self.degrees.to_radians().sin_cos();
        let (rx, ry) = (point.x - self.pivot.x, point.y - self.pivot.y);
        Point::new(
            self.pivot.x + rx * cos - ry * sin,
            self.pivot.y + rx * sin + ry * cos,
        )
    }

    /// The four corners of `bounds` after rotation, clockwise from top-left
    pub fn corners(&self, bounds: &BoundingBox) -> [Point; 4] {
        [
            Point::new(bounds.x, bounds.y),
            Point::new(bounds.right(), bounds.y),
            Point::new(bounds.right(), bounds.bottom()),
            Point::new(bounds.x, bounds.bottom()),
        ]
        .map(|p| self.apply(p))
    }

    /// Axis-aligned box around the rotated corners of `bounds`
    pub fn loose_bounds(&self, bounds: &BoundingBox) -> BoundingBox {
        if self.is_whole_turn() {
            return *bounds;
        }

        let rotated = self.corners(bounds);
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in rotated {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }

        BoundingBox::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_identity_keeps_bounds() {
        let bounds = BoundingBox::new(10.0, 20.0, 30.0, 40.0);
        let rotation = Rotation::new(360.0, Point::new(0.0, 0.0));
        assert!(rotation.is_whole_turn());
        assert_eq!(rotation.loose_bounds(&bounds), bounds);
    }

    #[test]
    fn test_quarter_turn_is_clockwise() {
        let rotation = Rotation::new(90.0, Point::new(0.0, 0.0));
        let p = rotation.apply(Point::new(10.0, 0.0));
        // right becomes down with Y pointing down
        assert!(close(p.x, 0.0));
        assert!(close(p.y, 10.0));
    }

    #[test]
    fn test_quarter_turn_swaps_bounds_around_center() {
        let bounds = BoundingBox::new(0.0, 0.0, 100.0, 50.0);
        let rotation = Rotation::new(90.0, bounds.center());
        let rotated = rotation.loose_bounds(&bounds);

        assert!(close(rotated.width, 50.0));
        assert!(close(rotated.height, 100.0));
        assert!(close(rotated.center().x, 50.0));
        assert!(close(rotated.center().y, 25.0));
    }

    #[test]
    fn test_diagonal_rotation_grows_loose_bounds() {
        let bounds = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let rotated = Rotation::new(45.0, bounds.center()).loose_bounds(&bounds);
        let diagonal = 10.0 * std::f64::consts::SQRT_2;
        assert!(close(rotated.width, diagonal));
        assert!(close(rotated.height, diagonal));
    }
}
