//! Geometry types for annotations.
//!
//! Everything here lives in pixel space: (0, 0) is the top-left corner of the
//! image, x grows to the right and y grows downwards.
//!
//! # Example
//!
//! ```
//! use labelsdk::geometry::{Point, Polygon};
//!
//! let mut triangle = Polygon::new(vec![
//!     Point::new(0.0, 0.0),
//!     Point::new(4.0, 0.0),
//!     Point::new(4.0, 3.0),
//! ])?;
//! assert_eq!(triangle.area(), 6.0);
//!
//! // Exporting closes the ring.
//! triangle.geometry();
//! assert!(triangle.is_closed());
//! # Ok::<(), labelsdk::SdkError>(())
//! ```

mod bbox;
mod geojson;
mod mask;
mod point;
mod polygon;

pub use bbox::BBox;
pub use geojson::{GeoJson, Position};
pub use mask::{Bitmap, Mask, Rle, RleEncoding};
pub use point::Point;
pub use polygon::{Polygon, MIN_POLYGON_POINTS};

use serde::{Deserialize, Serialize};

use crate::error::SdkError;

/// The shape carried by an object annotation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Geometry {
    Rectangle(BBox),
    Polygon(Polygon),
    /// Several disjoint parts of one object.
    MultiPolygon(Vec<Polygon>),
    Mask(Mask),
}

impl Geometry {
    /// Tight bounding box. `None` for an empty mask or multipolygon.
    pub fn bounding_box(&self) -> Option<BBox> {
        match self {
            Geometry::Rectangle(bbox) => Some(*bbox),
            Geometry::Polygon(polygon) => Some(polygon.bounding_box()),
            Geometry::MultiPolygon(parts) => parts
                .iter()
                .map(Polygon::bounding_box)
                .reduce(|a, b| a.union(&b)),
            Geometry::Mask(mask) => mask.bounding_box(),
        }
    }

    /// Covered area: geometric for vector shapes, pixel count for masks.
    pub fn area(&self) -> f64 {
        match self {
            Geometry::Rectangle(bbox) => bbox.area(),
            Geometry::Polygon(polygon) => polygon.area(),
            Geometry::MultiPolygon(parts) => parts.iter().map(Polygon::area).sum(),
            Geometry::Mask(mask) => mask.area() as f64,
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Geometry::Rectangle(bbox) => bbox.is_finite(),
            Geometry::Polygon(polygon) => polygon.is_finite(),
            Geometry::MultiPolygon(parts) => parts.iter().all(Polygon::is_finite),
            Geometry::Mask(_) => true,
        }
    }

    /// Renders the shape onto a `height × width` canvas.
    ///
    /// Masks must already have exactly that size.
    pub fn to_bitmap(&self, height: u32, width: u32) -> Result<Bitmap, SdkError> {
        match self {
            Geometry::Rectangle(bbox) => Ok(Polygon::from(*bbox).raster(height, width)),
            Geometry::Polygon(polygon) => Ok(polygon.raster(height, width)),
            Geometry::MultiPolygon(parts) => {
                let mut canvas = Bitmap::new(height, width);
                for part in parts {
                    part.fill_into(&mut canvas, 1);
                }
                Ok(canvas)
            }
            Geometry::Mask(mask) => {
                if mask.rle.size != [height, width] {
                    return Err(SdkError::InvalidGeometry(format!(
                        "mask of size {:?} does not match a {}x{} canvas",
                        mask.rle.size, height, width
                    )));
                }
                mask.to_bitmap()
            }
        }
    }

    /// GeoJSON export for vector shapes; closes every ring.
    ///
    /// Returns `None` for masks, which have no vector form.
    pub fn geojson(&mut self) -> Option<GeoJson> {
        match self {
            Geometry::Rectangle(bbox) => Some(Polygon::from(*bbox).geometry()),
            Geometry::Polygon(polygon) => Some(polygon.geometry()),
            Geometry::MultiPolygon(parts) => Some(GeoJson::MultiPolygon {
                coordinates: parts
                    .iter_mut()
                    .map(|part| match part.geometry() {
                        GeoJson::Polygon { coordinates } => coordinates,
                        GeoJson::MultiPolygon { mut coordinates } => {
                            coordinates.pop().unwrap_or_default()
                        }
                    })
                    .collect(),
            }),
            Geometry::Mask(_) => None,
        }
    }
}
