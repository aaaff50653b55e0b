//! labelsdk: client-side building blocks for a labeling platform.
//!
//! The crate models annotations locally (polygons, masks, relationships),
//! converts them to and from COCO, and proxies server-side resources such
//! as model runs and roles through a caller-supplied [`remote::Client`].
//!
//! # Modules
//!
//! - [`geometry`]: Points, boxes, polygons and run-length masks
//! - [`annotation`]: Dataset, images, categories, object annotations and
//!   relationships, plus native JSON I/O
//! - [`coco`]: COCO instances and panoptic conversion
//! - [`validation`]: Dataset validation and error reporting
//! - [`remote`]: Model runs, roles, pagination and task polling
//! - [`config`]: Client settings
//! - [`error`]: Error types for labelsdk operations

pub mod annotation;
pub mod coco;
pub mod config;
pub mod error;
pub mod geometry;
pub mod remote;
pub mod validation;

pub use config::ClientConfig;
pub use error::SdkError;
