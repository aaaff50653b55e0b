//! A single 2D point in pixel space.

use serde::{Deserialize, Serialize};

/// An (x, y) coordinate pair.
///
/// Coordinates are absolute pixel positions with (0, 0) at the top-left
/// corner of the image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns true if both coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Returns the point as a GeoJSON position `[x, y]`.
    #[inline]
    pub fn to_position(&self) -> [f64; 2] {
        [self.x, self.y]
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Point::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_is_finite() {
        assert!(Point::new(1.0, 2.0).is_finite());
        assert!(!Point::new(f64::NAN, 2.0).is_finite());
        assert!(!Point::new(1.0, f64::NEG_INFINITY).is_finite());
    }

    #[test]
    fn test_point_conversions() {
        assert_eq!(Point::from((3.0, 4.0)), Point::new(3.0, 4.0));
        assert_eq!(Point::from([3.0, 4.0]).to_position(), [3.0, 4.0]);
    }
}
