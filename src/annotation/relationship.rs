//! Relationships: typed edges between two object annotations.

use serde::{Deserialize, Serialize};

use super::ids::{AnnotationId, ImageId};

/// Direction of a relationship.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipType {
    /// Source points at target.
    #[default]
    Unidirectional,
    /// Source and target point at each other.
    Bidirectional,
}

/// An edge from `source` to `target`.
///
/// Endpoints are references into the owning dataset's object annotations;
/// resolve them with [`Dataset::resolve_relationship`](super::Dataset::resolve_relationship).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: AnnotationId,
    pub target: AnnotationId,
    #[serde(default, rename = "type")]
    pub kind: RelationshipType,
}

impl Relationship {
    /// A unidirectional relationship.
    pub fn new(source: impl Into<AnnotationId>, target: impl Into<AnnotationId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: RelationshipType::Unidirectional,
        }
    }

    pub fn bidirectional(source: impl Into<AnnotationId>, target: impl Into<AnnotationId>) -> Self {
        Self {
            kind: RelationshipType::Bidirectional,
            ..Self::new(source, target)
        }
    }

    /// True if this edge links `a` and `b`, honouring direction.
    pub fn connects(&self, a: AnnotationId, b: AnnotationId) -> bool {
        (self.source == a && self.target == b)
            || (self.kind == RelationshipType::Bidirectional && self.source == b && self.target == a)
    }
}

/// A relationship attached to an image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelationshipAnnotation {
    pub image_id: ImageId,
    pub value: Relationship,
}

impl RelationshipAnnotation {
    pub fn new(image_id: impl Into<ImageId>, value: Relationship) -> Self {
        Self {
            image_id: image_id.into(),
            value,
        }
    }
}
