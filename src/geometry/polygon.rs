//! Polygons: validated rings of points with GeoJSON export and rasterization.

use serde::{Deserialize, Serialize};

use super::bbox::BBox;
use super::geojson::GeoJson;
use super::mask::Bitmap;
use super::point::Point;
use crate::error::SdkError;

/// Minimum number of points a polygon must carry.
pub const MIN_POLYGON_POINTS: usize = 3;

/// A polygon described by an ordered ring of points.
///
/// Point order defines the ring traversal. The ring may be stored open or
/// closed (last point equal to the first); [`Polygon::geometry`] closes it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Builds a polygon, failing when fewer than three points are supplied.
    pub fn new(points: Vec<Point>) -> Result<Self, SdkError> {
        if points.len() < MIN_POLYGON_POINTS {
            return Err(SdkError::InvalidGeometry(format!(
                "a polygon must have at least {} points to be valid, found {:?}",
                MIN_POLYGON_POINTS, points
            )));
        }
        Ok(Self { points })
    }

    /// Builds a polygon from a flat `[x1, y1, x2, y2, ...]` list.
    pub fn from_flat(coords: &[f64]) -> Result<Self, SdkError> {
        if coords.len() % 2 != 0 {
            return Err(SdkError::InvalidGeometry(format!(
                "flat polygon has an odd number of coordinates ({})",
                coords.len()
            )));
        }
        let points = coords
            .chunks_exact(2)
            .map(|pair| Point::new(pair[0], pair[1]))
            .collect();
        Self::new(points)
    }

    /// Returns the ring as a flat `[x1, y1, x2, y2, ...]` list without the
    /// closing point.
    pub fn to_flat(&self) -> Vec<f64> {
        self.open_ring()
            .iter()
            .flat_map(|p| [p.x, p.y])
            .collect()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// True if the stored ring ends where it starts.
    pub fn is_closed(&self) -> bool {
        self.points.first() == self.points.last()
    }

    /// Appends the first point when the ring is not closed yet.
    pub fn close_ring(&mut self) {
        if !self.is_closed() {
            let first = self.points[0];
            self.points.push(first);
        }
    }

    /// Closes the ring and returns it as a GeoJSON polygon `[[[x, y], ...]]`.
    pub fn geometry(&mut self) -> GeoJson {
        self.close_ring();
        GeoJson::Polygon {
            coordinates: vec![self.points.iter().map(Point::to_position).collect()],
        }
    }

    /// The ring without a trailing duplicate of the first point, unless
    /// dropping it would leave fewer than three points.
    pub fn open_ring(&self) -> &[Point] {
        if self.points.len() > MIN_POLYGON_POINTS && self.is_closed() {
            &self.points[..self.points.len() - 1]
        } else {
            &self.points
        }
    }

    pub fn is_finite(&self) -> bool {
        self.points.iter().all(Point::is_finite)
    }

    /// Enclosed area by the shoelace formula, independent of winding.
    pub fn area(&self) -> f64 {
        let ring = self.open_ring();
        let n = ring.len();
        let twice: f64 = (0..n)
            .map(|i| {
                let (a, b) = (ring[i], ring[(i + 1) % n]);
                a.x * b.y - b.x * a.y
            })
            .sum();
        twice.abs() / 2.0
    }

    pub fn bounding_box(&self) -> BBox {
        // At least three points are guaranteed by construction.
        BBox::enclosing(&self.points).unwrap_or_default()
    }

    /// Rasterizes the polygon interior onto a fresh `height × width` canvas.
    ///
    /// Interior pixels are set to 1. A pixel belongs to the interior when its
    /// center lies inside the ring under the even-odd rule; there is no
    /// anti-aliasing.
    pub fn raster(&self, height: u32, width: u32) -> Bitmap {
        let mut canvas = Bitmap::new(height, width);
        self.fill_into(&mut canvas, 1);
        canvas
    }

    /// Scanline fill of the interior into an existing canvas.
    pub fn fill_into(&self, canvas: &mut Bitmap, value: u8) {
        let ring = self.open_ring();
        let n = ring.len();
        let mut crossings: Vec<f64> = Vec::with_capacity(n);

        for row in 0..canvas.height() {
            let y = row as f64 + 0.5;
            crossings.clear();
            for i in 0..n {
                let (a, b) = (ring[i], ring[(i + 1) % n]);
                if (a.y <= y && y < b.y) || (b.y <= y && y < a.y) {
                    crossings.push(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y));
                }
            }
            crossings.sort_by(f64::total_cmp);

            for span in crossings.chunks_exact(2) {
                let start = first_center_at_or_after(span[0]);
                let end = first_center_at_or_after(span[1]);
                canvas.fill_span(row, start, end, value);
            }
        }
    }
}

/// Index of the first pixel column whose center is at or right of `x`.
fn first_center_at_or_after(x: f64) -> u32 {
    let col = (x - 0.5).ceil();
    if col.is_nan() || col <= 0.0 {
        0
    } else if col >= u32::MAX as f64 {
        u32::MAX
    } else {
        col as u32
    }
}

impl TryFrom<Vec<Point>> for Polygon {
    type Error = SdkError;

    fn try_from(points: Vec<Point>) -> Result<Self, Self::Error> {
        Polygon::new(points)
    }
}

impl From<Polygon> for Vec<Point> {
    fn from(polygon: Polygon) -> Self {
        polygon.points
    }
}

impl From<BBox> for Polygon {
    fn from(bbox: BBox) -> Self {
        Polygon {
            points: bbox.corners().to_vec(),
        }
    }
}
