//! Minimal GeoJSON geometry objects for exporting shapes.

use serde::{Deserialize, Serialize};

/// A GeoJSON position, `[x, y]`.
pub type Position = [f64; 2];

/// The GeoJSON geometries this crate produces.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJson {
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
}
