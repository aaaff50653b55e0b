//! The internal annotation representation.
//!
//! A [`Dataset`] holds images, categories, object annotations and the
//! relationships between them. Interchange formats (see [`crate::coco`])
//! read into and write from this model.
//!
//! # Example
//!
//! ```
//! use labelsdk::annotation::{Category, Dataset, Image, ObjectAnnotation, Relationship,
//!     RelationshipAnnotation};
//! use labelsdk::geometry::{BBox, Geometry};
//!
//! let dataset = Dataset {
//!     images: vec![Image::new(1u64, "image.jpg", 640, 480)],
//!     categories: vec![Category::new(1u64, "person")],
//!     annotations: vec![
//!         ObjectAnnotation::new(1u64, 1u64, 1u64,
//!             Geometry::Rectangle(BBox::from_xyxy(10.0, 20.0, 100.0, 200.0))),
//!         ObjectAnnotation::new(2u64, 1u64, 1u64,
//!             Geometry::Rectangle(BBox::from_xyxy(50.0, 20.0, 150.0, 200.0))),
//!     ],
//!     relationships: vec![RelationshipAnnotation::new(1u64, Relationship::new(1u64, 2u64))],
//!     ..Default::default()
//! };
//! assert!(dataset.resolve_relationship(&dataset.relationships[0].value).is_some());
//! ```

mod ids;
pub mod io_json;
mod model;
mod relationship;

pub use ids::{AnnotationId, CategoryId, ImageId};
pub use model::{
    Category, Dataset, DatasetInfo, Image, ObjectAnnotation, ATTR_AREA, ATTR_ISCROWD,
    ATTR_SEGMENT_ID,
};
pub use relationship::{Relationship, RelationshipAnnotation, RelationshipType};
