//! COCO instance annotations: polygons, run-length masks and plain boxes.
//!
//! # Mapping
//!
//! | COCO `segmentation`            | Geometry                         |
//! |--------------------------------|----------------------------------|
//! | one polygon list               | `Polygon`                        |
//! | several polygon lists          | `MultiPolygon`                   |
//! | `{size, counts: [..]}`         | `Mask` (uncompressed)            |
//! | `{size, counts: "..."}`        | `Mask` (compressed)              |
//! | absent or `[]`                 | `Rectangle` from `bbox`          |
//!
//! `iscrowd` and `area` are kept as annotation attributes and `score` as the
//! confidence, so a read-write cycle reproduces them. The writer sorts every
//! list by id for deterministic output.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use super::rle::{decode_counts, encode_counts};
use super::schema::{
    category_from_model, category_to_model, copy_images, image_from_model, images_to_model,
    info_from_model, info_to_model, CocoAnnotation, CocoInstances, CocoRle, CocoRleCounts,
    CocoSegmentation,
};
use crate::annotation::{
    AnnotationId, CategoryId, Dataset, ImageId, ObjectAnnotation, ATTR_AREA, ATTR_ISCROWD,
};
use crate::error::SdkError;
use crate::geometry::{BBox, Geometry, Mask, Polygon, Rle, RleEncoding};

// ============================================================================
// Public API
// ============================================================================

/// Reads COCO instance JSON.
///
/// `image_dir` is where the image files live; it is used to record each
/// image's source path and to probe missing dimensions.
pub fn deserialize_instances(json: &str, image_dir: &Path) -> Result<Dataset, SdkError> {
    let coco: CocoInstances = serde_json::from_str(json).map_err(SdkError::CocoJson)?;
    instances_to_model(coco, image_dir)
}

/// Writes COCO instance JSON and copies known image files into `image_root`.
pub fn serialize_instances(dataset: &Dataset, image_root: &Path) -> Result<String, SdkError> {
    copy_images(dataset, image_root)?;
    let coco = model_to_instances(dataset);
    serde_json::to_string_pretty(&coco).map_err(SdkError::CocoJson)
}

/// Reads a COCO instance JSON file.
pub fn read_instances_json(path: &Path, image_dir: &Path) -> Result<Dataset, SdkError> {
    let file = File::open(path).map_err(SdkError::Io)?;
    let reader = BufReader::new(file);

    let coco: CocoInstances =
        serde_json::from_reader(reader).map_err(|source| SdkError::CocoJsonParse {
            path: path.to_path_buf(),
            source,
        })?;

    instances_to_model(coco, image_dir)
}

/// Writes a COCO instance JSON file and copies known image files into
/// `image_root`.
pub fn write_instances_json(
    path: &Path,
    dataset: &Dataset,
    image_root: &Path,
) -> Result<(), SdkError> {
    copy_images(dataset, image_root)?;

    let file = File::create(path).map_err(SdkError::Io)?;
    let writer = BufWriter::new(file);

    let coco = model_to_instances(dataset);
    serde_json::to_writer_pretty(writer, &coco).map_err(|source| SdkError::CocoJsonWrite {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!(
        "wrote {} COCO instance annotation(s) to {}",
        coco.annotations.len(),
        path.display()
    );
    Ok(())
}

// ============================================================================
// Conversion: COCO -> model
// ============================================================================

fn instances_to_model(coco: CocoInstances, image_dir: &Path) -> Result<Dataset, SdkError> {
    let info = info_to_model(coco.info);
    let images = images_to_model(coco.images, image_dir)?;
    let categories = coco.categories.into_iter().map(category_to_model).collect();

    let annotations = coco
        .annotations
        .into_iter()
        .map(annotation_to_model)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Dataset {
        info,
        images,
        categories,
        annotations,
        relationships: Vec::new(),
    })
}

fn annotation_to_model(ann: CocoAnnotation) -> Result<ObjectAnnotation, SdkError> {
    let context = |err: SdkError| SdkError::CocoInvalid(format!("annotation {}: {}", ann.id, err));

    let geometry = match ann.segmentation {
        Some(CocoSegmentation::Polygons(parts)) if !parts.is_empty() => {
            let mut polygons = parts
                .iter()
                .map(|flat| Polygon::from_flat(flat))
                .collect::<Result<Vec<_>, _>>()
                .map_err(context)?;
            if polygons.len() == 1 {
                Geometry::Polygon(polygons.remove(0))
            } else {
                Geometry::MultiPolygon(polygons)
            }
        }
        Some(CocoSegmentation::Rle(rle)) => Geometry::Mask(rle_to_mask(rle).map_err(context)?),
        _ => {
            let [x, y, w, h] = ann.bbox.ok_or_else(|| {
                SdkError::CocoInvalid(format!(
                    "annotation {} has neither a segmentation nor a bbox",
                    ann.id
                ))
            })?;
            Geometry::Rectangle(BBox::from_xywh(x, y, w, h))
        }
    };

    let mut annotation = ObjectAnnotation::new(
        AnnotationId::new(ann.id),
        ImageId::new(ann.image_id),
        CategoryId::new(ann.category_id),
        geometry,
    );
    annotation.confidence = ann.score;

    if let Some(iscrowd) = ann.iscrowd {
        annotation
            .attributes
            .insert(ATTR_ISCROWD.to_string(), iscrowd.to_string());
    }
    if let Some(area) = ann.area {
        annotation
            .attributes
            .insert(ATTR_AREA.to_string(), area.to_string());
    }

    Ok(annotation)
}

fn rle_to_mask(rle: CocoRle) -> Result<Mask, SdkError> {
    let (counts, encoding) = match rle.counts {
        CocoRleCounts::Uncompressed(counts) => (counts, RleEncoding::Uncompressed),
        CocoRleCounts::Compressed(encoded) => (decode_counts(&encoded)?, RleEncoding::Compressed),
    };

    let [height, width] = rle.size;
    let covered: u64 = counts.iter().map(|&c| c as u64).sum();
    if covered != height as u64 * width as u64 {
        return Err(SdkError::Rle(format!(
            "runs cover {} pixels but size is {}x{}",
            covered, height, width
        )));
    }

    Ok(Mask::new(
        Rle {
            size: rle.size,
            counts,
        },
        encoding,
    ))
}

// ============================================================================
// Conversion: model -> COCO
// ============================================================================

fn model_to_instances(dataset: &Dataset) -> CocoInstances {
    if !dataset.relationships.is_empty() {
        log::warn!(
            "COCO cannot represent relationships; dropping {} relationship annotation(s)",
            dataset.relationships.len()
        );
    }

    let mut images: Vec<_> = dataset.images.iter().map(image_from_model).collect();
    images.sort_by_key(|img| img.id);

    let mut categories: Vec<_> = dataset.categories.iter().map(category_from_model).collect();
    categories.sort_by_key(|cat| cat.id);

    let mut annotations: Vec<_> = dataset.annotations.iter().map(annotation_from_model).collect();
    annotations.sort_by_key(|ann| ann.id);

    CocoInstances {
        info: info_from_model(&dataset.info),
        images,
        annotations,
        categories,
    }
}

fn annotation_from_model(ann: &ObjectAnnotation) -> CocoAnnotation {
    let segmentation = match &ann.geometry {
        Geometry::Rectangle(_) => CocoSegmentation::Polygons(Vec::new()),
        Geometry::Polygon(polygon) => CocoSegmentation::Polygons(vec![polygon.to_flat()]),
        Geometry::MultiPolygon(parts) => {
            CocoSegmentation::Polygons(parts.iter().map(Polygon::to_flat).collect())
        }
        Geometry::Mask(mask) => CocoSegmentation::Rle(mask_to_rle(mask)),
    };

    let bbox = ann
        .geometry
        .bounding_box()
        .map(|b| b.to_xywh())
        .unwrap_or([0.0; 4]);

    // Stored values win so a read-write cycle does not drift.
    let area = ann
        .attribute::<f64>(ATTR_AREA)
        .unwrap_or_else(|| ann.geometry.area());
    let default_crowd = u8::from(matches!(ann.geometry, Geometry::Mask(_)));
    let iscrowd = ann.attribute::<u8>(ATTR_ISCROWD).unwrap_or(default_crowd);

    CocoAnnotation {
        id: ann.id.as_u64(),
        image_id: ann.image_id.as_u64(),
        category_id: ann.category_id.as_u64(),
        segmentation: Some(segmentation),
        bbox: Some(bbox),
        area: Some(area),
        iscrowd: Some(iscrowd),
        score: ann.confidence,
    }
}

fn mask_to_rle(mask: &Mask) -> CocoRle {
    let counts = match mask.encoding {
        RleEncoding::Uncompressed => CocoRleCounts::Uncompressed(mask.rle.counts.clone()),
        RleEncoding::Compressed => CocoRleCounts::Compressed(encode_counts(&mask.rle.counts)),
    };
    CocoRle {
        size: mask.rle.size,
        counts,
    }
}

// ============================================================================
// Tests
// ============================================================================
