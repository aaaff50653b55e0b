//! Core dataset model for annotations.
//!
//! Every interchange reader produces a [`Dataset`] and every writer consumes
//! one, so conversions between formats always pass through this model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::ids::{AnnotationId, CategoryId, ImageId};
use super::relationship::{Relationship, RelationshipAnnotation};
use crate::geometry::Geometry;

/// Attribute key for the COCO crowd flag.
pub const ATTR_ISCROWD: &str = "iscrowd";
/// Attribute key for a stored COCO area.
pub const ATTR_AREA: &str = "area";
/// Attribute key for a panoptic segment id.
pub const ATTR_SEGMENT_ID: &str = "segment_id";

/// A collection of labelled images.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub info: DatasetInfo,

    pub images: Vec<Image>,

    pub categories: Vec<Category>,

    /// Object annotations (rectangles, polygons, masks).
    pub annotations: Vec<ObjectAnnotation>,

    /// Edges between object annotations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<RelationshipAnnotation>,
}

impl Dataset {
    pub fn image(&self, id: ImageId) -> Option<&Image> {
        self.images.iter().find(|img| img.id == id)
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|cat| cat.id == id)
    }

    pub fn annotation(&self, id: AnnotationId) -> Option<&ObjectAnnotation> {
        self.annotations.iter().find(|ann| ann.id == id)
    }

    /// Object annotations of one image, in stored order.
    pub fn annotations_for(&self, image_id: ImageId) -> impl Iterator<Item = &ObjectAnnotation> {
        self.annotations
            .iter()
            .filter(move |ann| ann.image_id == image_id)
    }

    /// Looks up both endpoints of a relationship.
    ///
    /// Returns `None` if either endpoint is not an annotation of this dataset.
    pub fn resolve_relationship(
        &self,
        relationship: &Relationship,
    ) -> Option<(&ObjectAnnotation, &ObjectAnnotation)> {
        let source = self.annotation(relationship.source)?;
        let target = self.annotation(relationship.target)?;
        Some((source, target))
    }

    /// Smallest annotation id not yet in use.
    pub fn next_annotation_id(&self) -> AnnotationId {
        let max = self.annotations.iter().map(|a| a.id.as_u64()).max();
        AnnotationId::new(max.map_or(1, |m| m + 1))
    }
}

/// Metadata about the dataset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
}

/// An image (data row) in the dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,

    /// File name relative to the image directory.
    pub file_name: String,

    pub width: u32,

    pub height: u32,

    /// Where the image file was found on disk, if anywhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl Image {
    pub fn new(id: impl Into<ImageId>, file_name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            width,
            height,
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// A category (class label).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supercategory: Option<String>,

    /// Panoptic only: countable object ("thing") versus region ("stuff").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isthing: Option<bool>,

    /// Panoptic only: display color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<[u8; 3]>,
}

impl Category {
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            supercategory: None,
            isthing: None,
            color: None,
        }
    }

    pub fn with_supercategory(mut self, supercategory: impl Into<String>) -> Self {
        self.supercategory = Some(supercategory.into());
        self
    }

    pub fn with_isthing(mut self, isthing: bool) -> Self {
        self.isthing = Some(isthing);
        self
    }
}

/// A labelled shape on one image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectAnnotation {
    pub id: AnnotationId,

    pub image_id: ImageId,

    pub category_id: CategoryId,

    pub geometry: Geometry,

    /// Confidence score for model predictions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// Format-specific extras such as `iscrowd` or `segment_id`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl ObjectAnnotation {
    pub fn new(
        id: impl Into<AnnotationId>,
        image_id: impl Into<ImageId>,
        category_id: impl Into<CategoryId>,
        geometry: Geometry,
    ) -> Self {
        Self {
            id: id.into(),
            image_id: image_id.into(),
            category_id: category_id.into(),
            geometry,
            confidence: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Parses an attribute, ignoring values that do not parse.
    pub fn attribute<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.attributes.get(key).and_then(|v| v.parse().ok())
    }
}
