//! Native JSON serialization of a [`Dataset`].
//!
//! Unlike COCO, this format is lossless: relationships, mask encodings and
//! attributes all survive a round trip.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use super::model::Dataset;
use crate::error::SdkError;

/// Reads a dataset from a native JSON file.
pub fn read_json(path: &Path) -> Result<Dataset, SdkError> {
    let file = File::open(path).map_err(SdkError::Io)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| SdkError::JsonParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a dataset to a native JSON file.
pub fn write_json(path: &Path, dataset: &Dataset) -> Result<(), SdkError> {
    let file = File::create(path).map_err(SdkError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, dataset).map_err(|source| SdkError::JsonWrite {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("wrote dataset JSON to {}", path.display());
    Ok(())
}

pub fn from_json_str(json: &str) -> Result<Dataset, serde_json::Error> {
    serde_json::from_str(json)
}

pub fn to_json_string(dataset: &Dataset) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{
        Category, Image, ObjectAnnotation, Relationship, RelationshipAnnotation,
    };
    use crate::geometry::{Bitmap, Geometry, Mask, Polygon, RleEncoding};

    fn sample_dataset() -> Dataset {
        let mut bitmap = Bitmap::new(4, 4);
        bitmap.set(1, 2, 1);
        let mut mask = Mask::from_bitmap(&bitmap);
        mask.encoding = RleEncoding::Compressed;

        Dataset {
            images: vec![Image::new(1u64, "image001.jpg", 4, 4)],
            categories: vec![
                Category::new(1u64, "person"),
                Category::new(2u64, "dog").with_supercategory("animal"),
            ],
            annotations: vec![
                ObjectAnnotation::new(
                    1u64,
                    1u64,
                    1u64,
                    Geometry::Polygon(
                        Polygon::from_flat(&[0.0, 0.0, 3.0, 0.0, 3.0, 3.0]).unwrap(),
                    ),
                )
                .with_confidence(0.95),
                ObjectAnnotation::new(2u64, 1u64, 2u64, Geometry::Mask(mask)),
            ],
            relationships: vec![RelationshipAnnotation::new(
                1u64,
                Relationship::bidirectional(1u64, 2u64),
            )],
            ..Default::default()
        }
    }

    #[test]
    fn test_json_roundtrip_is_lossless() {
        let original = sample_dataset();
        let json = to_json_string(&original).expect("serialize");
        let restored = from_json_str(&json).expect("deserialize");

        assert_eq!(restored.images, original.images);
        assert_eq!(restored.categories, original.categories);
        assert_eq!(restored.annotations, original.annotations);
        assert_eq!(restored.relationships, original.relationships);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("dataset.json");

        write_json(&path, &sample_dataset()).expect("write");
        let restored = read_json(&path).expect("read");
        assert_eq!(restored.annotations.len(), 2);
    }

    #[test]
    fn test_invalid_polygon_is_rejected() {
        let json = r#"{
            "images": [],
            "categories": [],
            "annotations": [{
                "id": 1, "image_id": 1, "category_id": 1,
                "geometry": {"type": "polygon", "value": [{"x": 0, "y": 0}]}
            }]
        }"#;
        assert!(from_json_str(json).is_err());
    }
}
