//! Dataset validation.
//!
//! Checks a [`Dataset`] for:
//! - structural integrity (unique IDs, valid references)
//! - data quality (non-empty names, valid dimensions)
//! - geometric validity (finite, ordered, within image bounds, masks sized
//!   to their image)
//! - relationship endpoints (present, distinct, on the same image)

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::{HashMap, HashSet};

use crate::annotation::{
    AnnotationId, CategoryId, Dataset, Image, ImageId, ObjectAnnotation,
};
use crate::error::SdkError;
use crate::geometry::Geometry;

/// Coordinates may overshoot the image edge by this much before being
/// reported.
const BOUNDS_TOLERANCE: f64 = 0.5;

#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// If true, [`ensure_valid`] also fails on warnings.
    pub strict: bool,
}

/// Validates a dataset and returns every issue found.
pub fn validate_dataset(dataset: &Dataset, _opts: &ValidateOptions) -> ValidationReport {
    let mut report = ValidationReport::new();

    let image_ids: HashSet<ImageId> = dataset.images.iter().map(|i| i.id).collect();
    let category_ids: HashSet<CategoryId> = dataset.categories.iter().map(|c| c.id).collect();

    validate_images(dataset, &mut report);
    validate_categories(dataset, &mut report);
    validate_annotations(dataset, &image_ids, &category_ids, &mut report);
    validate_relationships(dataset, &mut report);

    report
}

/// Like [`validate_dataset`], but turns a failing report into
/// [`SdkError::ValidationFailed`].
pub fn ensure_valid(
    dataset: &Dataset,
    opts: &ValidateOptions,
) -> Result<ValidationReport, SdkError> {
    let report = validate_dataset(dataset, opts);
    let passed = if opts.strict {
        report.is_clean()
    } else {
        report.is_ok()
    };

    if passed {
        Ok(report)
    } else {
        log::debug!("dataset failed validation:\n{}", report);
        Err(SdkError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    }
}

fn validate_images(dataset: &Dataset, report: &mut ValidationReport) {
    let mut seen_ids: HashMap<ImageId, usize> = HashMap::new();

    for (idx, image) in dataset.images.iter().enumerate() {
        let id = image.id.as_u64();

        if let Some(first_idx) = seen_ids.get(&image.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateImageId,
                format!(
                    "Duplicate image ID {} (first seen at index {})",
                    id, first_idx
                ),
                IssueContext::Image { id },
            ));
        } else {
            seen_ids.insert(image.id, idx);
        }

        if image.width == 0 || image.height == 0 {
            report.add(ValidationIssue::error(
                IssueCode::InvalidImageDimensions,
                format!(
                    "Invalid dimensions {}x{} (must be positive)",
                    image.width, image.height
                ),
                IssueContext::Image { id },
            ));
        }

        if image.file_name.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyFileName,
                "Empty filename",
                IssueContext::Image { id },
            ));
        }
    }
}

fn validate_categories(dataset: &Dataset, report: &mut ValidationReport) {
    let mut seen_ids: HashMap<CategoryId, usize> = HashMap::new();
    let mut seen_names: HashMap<&str, CategoryId> = HashMap::new();

    for (idx, category) in dataset.categories.iter().enumerate() {
        let id = category.id.as_u64();

        if let Some(first_idx) = seen_ids.get(&category.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateCategoryId,
                format!(
                    "Duplicate category ID {} (first seen at index {})",
                    id, first_idx
                ),
                IssueContext::Category { id },
            ));
        } else {
            seen_ids.insert(category.id, idx);
        }

        if category.name.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyCategoryName,
                "Empty category name",
                IssueContext::Category { id },
            ));
        } else if let Some(first_id) = seen_names.get(category.name.as_str()) {
            report.add(ValidationIssue::warning(
                IssueCode::DuplicateCategoryName,
                format!(
                    "Duplicate category name '{}' (also used by category {})",
                    category.name, first_id
                ),
                IssueContext::Category { id },
            ));
        } else {
            seen_names.insert(&category.name, category.id);
        }
    }
}

fn validate_annotations(
    dataset: &Dataset,
    image_ids: &HashSet<ImageId>,
    category_ids: &HashSet<CategoryId>,
    report: &mut ValidationReport,
) {
    let mut seen_ids: HashMap<AnnotationId, usize> = HashMap::new();
    let images: HashMap<ImageId, &Image> = dataset.images.iter().map(|i| (i.id, i)).collect();

    for (idx, annotation) in dataset.annotations.iter().enumerate() {
        let id = annotation.id.as_u64();

        if let Some(first_idx) = seen_ids.get(&annotation.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateAnnotationId,
                format!(
                    "Duplicate annotation ID {} (first seen at index {})",
                    id, first_idx
                ),
                IssueContext::Annotation { id },
            ));
        } else {
            seen_ids.insert(annotation.id, idx);
        }

        if !image_ids.contains(&annotation.image_id) {
            report.add(ValidationIssue::error(
                IssueCode::MissingImageRef,
                format!("References non-existent image {}", annotation.image_id),
                IssueContext::Annotation { id },
            ));
        }

        if !category_ids.contains(&annotation.category_id) {
            report.add(ValidationIssue::error(
                IssueCode::MissingCategoryRef,
                format!(
                    "References non-existent category {}",
                    annotation.category_id
                ),
                IssueContext::Annotation { id },
            ));
        }

        validate_geometry(
            annotation,
            images.get(&annotation.image_id).copied(),
            report,
        );
    }
}

fn validate_geometry(
    annotation: &ObjectAnnotation,
    image: Option<&Image>,
    report: &mut ValidationReport,
) {
    let id = annotation.id.as_u64();
    let geometry = &annotation.geometry;

    if !geometry.is_finite() {
        report.add(ValidationIssue::error(
            IssueCode::GeometryNotFinite,
            "Geometry has NaN or infinite coordinates",
            IssueContext::Annotation { id },
        ));
        return;
    }

    match geometry {
        Geometry::Rectangle(bbox) if !bbox.is_ordered() => {
            report.add(ValidationIssue::error(
                IssueCode::InvalidBBoxOrdering,
                format!(
                    "Invalid ordering: min ({}, {}) should be <= max ({}, {})",
                    bbox.min.x, bbox.min.y, bbox.max.x, bbox.max.y
                ),
                IssueContext::Annotation { id },
            ));
        }
        Geometry::Mask(mask) => {
            let [h, w] = mask.rle.size;
            let total: u64 = mask.rle.counts.iter().map(|&c| c as u64).sum();
            if total != h as u64 * w as u64 {
                report.add(ValidationIssue::error(
                    IssueCode::InvalidMaskCounts,
                    format!("Run lengths cover {} pixels, mask size is {}x{}", total, h, w),
                    IssueContext::Annotation { id },
                ));
                return;
            }
            if let Some(image) = image {
                if (image.height, image.width) != (h, w) {
                    report.add(ValidationIssue::error(
                        IssueCode::MaskSizeMismatch,
                        format!(
                            "Mask is {}x{} (h x w) but image {} is {}x{}",
                            h, w, image.id, image.height, image.width
                        ),
                        IssueContext::Annotation { id },
                    ));
                }
            }
        }
        _ => {}
    }

    let area = geometry.area();
    if area <= 0.0 {
        report.add(ValidationIssue::warning(
            IssueCode::EmptyGeometry,
            format!("Zero or negative area: {:.2}", area),
            IssueContext::Annotation { id },
        ));
    }

    // Masks are bounded by their own size.
    if matches!(geometry, Geometry::Mask(_)) {
        return;
    }
    let (Some(image), Some(bbox)) = (image, geometry.bounding_box()) else {
        return;
    };
    let (w, h) = (image.width as f64, image.height as f64);
    if bbox.min.x < -BOUNDS_TOLERANCE
        || bbox.min.y < -BOUNDS_TOLERANCE
        || bbox.max.x > w + BOUNDS_TOLERANCE
        || bbox.max.y > h + BOUNDS_TOLERANCE
    {
        report.add(ValidationIssue::error(
            IssueCode::GeometryOutOfBounds,
            format!(
                "Extent ({:.1}, {:.1}, {:.1}, {:.1}) lies outside image bounds (0, 0, {}, {})",
                bbox.min.x, bbox.min.y, bbox.max.x, bbox.max.y, image.width, image.height
            ),
            IssueContext::Annotation { id },
        ));
    }
}

fn validate_relationships(dataset: &Dataset, report: &mut ValidationReport) {
    let annotations: HashMap<AnnotationId, &ObjectAnnotation> =
        dataset.annotations.iter().map(|a| (a.id, a)).collect();

    for (index, relationship) in dataset.relationships.iter().enumerate() {
        let context = || IssueContext::Relationship { index };
        let edge = &relationship.value;

        let source = annotations.get(&edge.source);
        let target = annotations.get(&edge.target);
        for (role, id, found) in [
            ("source", edge.source, source.is_some()),
            ("target", edge.target, target.is_some()),
        ] {
            if !found {
                report.add(ValidationIssue::error(
                    IssueCode::DanglingRelationship,
                    format!("{} annotation {} does not exist", role, id),
                    context(),
                ));
            }
        }

        if edge.source == edge.target {
            report.add(ValidationIssue::warning(
                IssueCode::SelfRelationship,
                format!("Annotation {} is related to itself", edge.source),
                context(),
            ));
        }

        if let (Some(source), Some(target)) = (source, target) {
            if source.image_id != target.image_id || source.image_id != relationship.image_id {
                report.add(ValidationIssue::warning(
                    IssueCode::CrossImageRelationship,
                    format!(
                        "Relationship on image {} links annotations on images {} and {}",
                        relationship.image_id, source.image_id, target.image_id
                    ),
                    context(),
                ));
            }
        }
    }
}
