//! COCO dataset format conversion.
//!
//! Two flavours are supported:
//!
//! - [`instances`]: object annotations as polygons, run-length masks or
//!   plain boxes (`instances_*.json`).
//! - [`panoptic`]: per-pixel segment maps stored as PNG files next to a
//!   JSON file listing each segment's category (`panoptic_*.json`).
//!
//! Both convert to and from [`Dataset`](crate::annotation::Dataset).
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use labelsdk::coco;
//!
//! let json = std::fs::read_to_string("instances.json")?;
//! let dataset = coco::deserialize_instances(&json, Path::new("images"))?;
//! let back = coco::serialize_instances(&dataset, Path::new("/tmp/images_instances"))?;
//! # let _ = back;
//! # Ok::<(), labelsdk::SdkError>(())
//! ```

pub mod instances;
pub mod panoptic;
pub mod rle;
mod schema;

pub use instances::{
    deserialize_instances, read_instances_json, serialize_instances, write_instances_json,
};
pub use panoptic::{
    deserialize_panoptic, read_panoptic_json, rgb_to_segment_id, segment_id_to_rgb,
    serialize_panoptic, write_panoptic_json,
};
pub use rle::{decode_counts, encode_counts};
