//! Integration tests for COCO instance (polygon, box and RLE) conversion.

use std::path::Path;

use labelsdk::annotation::{AnnotationId, Dataset, ATTR_AREA, ATTR_ISCROWD};
use labelsdk::coco::{
    deserialize_instances, read_instances_json, serialize_instances, write_instances_json,
};
use labelsdk::geometry::{BBox, Geometry, RleEncoding};
use labelsdk::validation::{validate_dataset, ValidateOptions};
use labelsdk::SdkError;

mod common;

fn load_instances(image_dir: &Path) -> Dataset {
    deserialize_instances(&common::fixture("instances.json"), image_dir)
        .expect("parse instances fixture")
}

fn annotation(dataset: &Dataset, id: u64) -> &labelsdk::annotation::ObjectAnnotation {
    dataset
        .annotation(AnnotationId::new(id))
        .unwrap_or_else(|| panic!("annotation {} missing", id))
}

#[test]
fn instances_fixture_maps_every_segmentation_kind() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let image_dir = temp.path().join("images");
    common::write_bmp(&image_dir.join("park.bmp"), 40, 30);

    let dataset = load_instances(&image_dir);

    assert_eq!(dataset.info.description.as_deref(), Some("street scenes"));
    assert_eq!(dataset.images.len(), 2);
    assert_eq!(dataset.categories.len(), 3);
    assert_eq!(dataset.annotations.len(), 3);

    // Dimensions probed from the file, source recorded.
    let park = &dataset.images[1];
    assert_eq!((park.width, park.height), (40, 30));
    assert_eq!(park.source.as_deref(), Some(image_dir.join("park.bmp").as_path()));
    assert!(dataset.images[0].source.is_none());

    match &annotation(&dataset, 1).geometry {
        Geometry::Polygon(polygon) => assert_eq!(polygon.points().len(), 4),
        other => panic!("expected polygon, got {:?}", other),
    }
    match &annotation(&dataset, 2).geometry {
        Geometry::MultiPolygon(parts) => assert_eq!(parts.len(), 2),
        other => panic!("expected multipolygon, got {:?}", other),
    }
    let tree = annotation(&dataset, 3);
    assert_eq!(
        tree.geometry,
        Geometry::Rectangle(BBox::from_xyxy(1.0, 2.0, 6.0, 8.0))
    );
    assert_eq!(tree.confidence, Some(0.875));
    assert_eq!(tree.attribute::<f64>(ATTR_AREA), Some(30.0));
    assert_eq!(tree.attribute::<u8>(ATTR_ISCROWD), Some(0));

    let report = validate_dataset(&dataset, &ValidateOptions::default());
    assert!(report.is_ok(), "{}", report);
}

#[test]
fn instances_roundtrip_preserves_labels_geometry_and_images() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let image_dir = temp.path().join("images");
    let image_root = temp.path().join("images_instances");
    common::write_bmp(&image_dir.join("park.bmp"), 40, 30);

    let dataset = load_instances(&image_dir);
    let json = serialize_instances(&dataset, &image_root).expect("serialize instances");

    // Only images with a known source file are copied.
    assert!(image_root.join("park.bmp").is_file());
    assert!(!image_root.join("street.jpg").exists());

    let restored = deserialize_instances(&json, &image_root).expect("parse serialized instances");
    assert_eq!(restored.categories, dataset.categories);
    assert_eq!(restored.annotations, dataset.annotations);
    assert_eq!(restored.info, dataset.info);

    let dims = |d: &Dataset| -> Vec<(String, u32, u32)> {
        d.images
            .iter()
            .map(|i| (i.file_name.clone(), i.width, i.height))
            .collect()
    };
    assert_eq!(dims(&restored), dims(&dataset));
    assert_eq!(
        restored.images[1].source.as_deref(),
        Some(image_root.join("park.bmp").as_path())
    );
}

#[test]
fn serialize_into_source_dir_spelled_differently_keeps_images() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let image_dir = temp.path().join("images");
    let source = image_dir.join("park.bmp");
    common::write_bmp(&source, 40, 30);
    let original_len = std::fs::metadata(&source).unwrap().len();

    let dataset = load_instances(&image_dir);
    let same_dir = image_dir.join("..").join("images");
    serialize_instances(&dataset, &same_dir).expect("serialize in place");

    assert_eq!(std::fs::metadata(&source).unwrap().len(), original_len);
    assert_eq!(
        imagesize::size(&source).map(|s| (s.width, s.height)).ok(),
        Some((40, 30))
    );
}

#[test]
fn rle_fixture_keeps_both_count_encodings() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let dataset = deserialize_instances(&common::fixture("rle.json"), temp.path())
        .expect("parse rle fixture");

    let Geometry::Mask(plain) = &annotation(&dataset, 10).geometry else {
        panic!("expected a mask");
    };
    assert_eq!(plain.encoding, RleEncoding::Uncompressed);
    assert_eq!(plain.rle.counts, vec![1, 2, 4, 1, 4]);
    assert_eq!(plain.area(), 3);
    assert_eq!(
        plain.bounding_box().map(|b| b.to_xywh()),
        Some([0.0, 1.0, 3.0, 2.0])
    );

    let Geometry::Mask(compact) = &annotation(&dataset, 11).geometry else {
        panic!("expected a mask");
    };
    assert_eq!(compact.encoding, RleEncoding::Compressed);
    assert_eq!(compact.rle.counts, vec![4, 4, 4]);
    assert_eq!(compact.area(), 4);

    let image_root = temp.path().join("images_rle");
    let json = serialize_instances(&dataset, &image_root).expect("serialize rle");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    let annotations = value["annotations"].as_array().expect("annotations");
    assert_eq!(annotations[0]["segmentation"]["counts"], serde_json::json!([1, 2, 4, 1, 4]));
    assert_eq!(annotations[1]["segmentation"]["counts"], serde_json::json!("444"));
    assert_eq!(annotations[1]["bbox"], serde_json::json!([1.0, 0.0, 2.0, 3.0]));
    assert_eq!(annotations[1]["iscrowd"], serde_json::json!(1));

    let restored = deserialize_instances(&json, &image_root).expect("parse serialized rle");
    assert_eq!(restored.annotations, dataset.annotations);
}

#[test]
fn instances_file_helpers_roundtrip() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let dataset = deserialize_instances(&common::fixture("rle.json"), temp.path())
        .expect("parse rle fixture");

    let path = temp.path().join("out/instances.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    write_instances_json(&path, &dataset, &temp.path().join("copied")).expect("write file");

    let restored = read_instances_json(&path, temp.path()).expect("read file");
    assert_eq!(restored.annotations, dataset.annotations);
}

#[test]
fn read_instances_reports_path_on_bad_json() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let path = temp.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();

    match read_instances_json(&path, temp.path()) {
        Err(SdkError::CocoJsonParse { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected CocoJsonParse, got {:?}", other.map(|_| ())),
    }
}
