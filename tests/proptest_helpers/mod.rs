#![allow(dead_code)]

use std::collections::BTreeMap;

use labelsdk::annotation::{
    AnnotationId, Category, CategoryId, Dataset, Image, ImageId, ObjectAnnotation,
};
use labelsdk::geometry::{BBox, Bitmap, Geometry, Mask, Point, Polygon};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Quarter-pixel coordinates: exact in binary and in JSON text.
fn quarter(max: u32) -> impl Strategy<Value = f64> {
    (0..=max * 4).prop_map(|q| q as f64 / 4.0)
}

pub fn arb_point(width: u32, height: u32) -> BoxedStrategy<Point> {
    (quarter(width), quarter(height))
        .prop_map(|(x, y)| Point::new(x, y))
        .boxed()
}

/// Raw point lists of any length, including too-short ones.
pub fn arb_points(width: u32, height: u32, len: std::ops::Range<usize>) -> BoxedStrategy<Vec<Point>> {
    proptest::collection::vec(arb_point(width, height), len).boxed()
}

/// Polygons whose stored ring is open, as COCO writes them.
pub fn arb_polygon(width: u32, height: u32) -> BoxedStrategy<Polygon> {
    arb_points(width, height, 3..16)
        .prop_map(|points| Polygon::new(points).expect("at least three points"))
        .prop_filter("ring is already closed", |polygon| !polygon.is_closed())
        .boxed()
}

pub fn arb_bbox(width: u32, height: u32) -> BoxedStrategy<BBox> {
    (quarter(width), quarter(height), quarter(width), quarter(height))
        .prop_map(|(x0, y0, x1, y1)| BBox::from_xyxy(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)))
        .boxed()
}

pub fn arb_bitmap(max_side: u32) -> BoxedStrategy<Bitmap> {
    (1..=max_side, 1..=max_side)
        .prop_flat_map(|(height, width)| {
            proptest::collection::vec(prop_oneof![3 => Just(0u8), 1 => Just(1u8)], (height * width) as usize)
                .prop_map(move |data| Bitmap::from_raw(height, width, data).expect("sized buffer"))
        })
        .boxed()
}

/// Any geometry that fits a `height × width` image.
pub fn arb_geometry(width: u32, height: u32) -> BoxedStrategy<Geometry> {
    let mask = proptest::collection::vec(any::<bool>(), (height * width) as usize).prop_map(
        move |bits| {
            let data = bits.into_iter().map(u8::from).collect();
            let bitmap = Bitmap::from_raw(height, width, data).expect("sized buffer");
            Geometry::Mask(Mask::from_bitmap(&bitmap))
        },
    );
    prop_oneof![
        arb_bbox(width, height).prop_map(Geometry::Rectangle),
        arb_polygon(width, height).prop_map(Geometry::Polygon),
        proptest::collection::vec(arb_polygon(width, height), 2..4).prop_map(Geometry::MultiPolygon),
        mask,
    ]
    .boxed()
}

/// Datasets with small images, unique names and valid references.
pub fn arb_dataset(max_images: usize, max_cats: usize, max_anns: usize) -> BoxedStrategy<Dataset> {
    (
        proptest::collection::vec((2u32..=12, 2u32..=12), 1..=max_images),
        1usize..=max_cats,
        0usize..=max_anns,
    )
        .prop_flat_map(|(dims, category_count, ann_count)| {
            let images: Vec<Image> = dims
                .iter()
                .enumerate()
                .map(|(idx, &(w, h))| Image::new((idx + 1) as u64, format!("img_{idx}.jpg"), w, h))
                .collect();
            let categories: Vec<Category> = (0..category_count)
                .map(|idx| Category::new((idx + 1) as u64, format!("cat_{idx}")))
                .collect();

            let anns = proptest::collection::vec(
                (0..images.len(), 0..categories.len()).prop_flat_map({
                    let images = images.clone();
                    move |(image_idx, category_idx)| {
                        let image = &images[image_idx];
                        (
                            Just(image.id),
                            Just(CategoryId::new((category_idx + 1) as u64)),
                            arb_geometry(image.width, image.height),
                            proptest::option::of(0u16..=1024),
                        )
                    }
                }),
                ann_count,
            );

            (Just(images), Just(categories), anns).prop_map(|(images, categories, anns)| {
                let annotations = anns
                    .into_iter()
                    .enumerate()
                    .map(|(idx, (image_id, category_id, geometry, conf))| {
                        let mut ann = ObjectAnnotation::new(
                            AnnotationId::new((idx + 1) as u64),
                            image_id,
                            category_id,
                            geometry,
                        );
                        ann.confidence = conf.map(|c| c as f64 / 1024.0);
                        ann
                    })
                    .collect();
                Dataset {
                    images,
                    categories,
                    annotations,
                    ..Default::default()
                }
            })
        })
        .boxed()
}

/// What a converter must preserve per annotation: image file, category
/// name, shape and confidence.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnSem {
    pub image_file: String,
    pub category: String,
    pub geometry: Geometry,
    pub confidence: Option<f64>,
}

pub fn ann_semantics(dataset: &Dataset) -> Result<BTreeMap<AnnotationId, AnnSem>, String> {
    let image_by_id: BTreeMap<ImageId, &str> = dataset
        .images
        .iter()
        .map(|img| (img.id, img.file_name.as_str()))
        .collect();
    let category_by_id: BTreeMap<CategoryId, &str> = dataset
        .categories
        .iter()
        .map(|cat| (cat.id, cat.name.as_str()))
        .collect();

    dataset
        .annotations
        .iter()
        .map(|ann| {
            let image_file = image_by_id
                .get(&ann.image_id)
                .ok_or_else(|| format!("annotation {} references missing image {}", ann.id, ann.image_id))?;
            let category = category_by_id.get(&ann.category_id).ok_or_else(|| {
                format!(
                    "annotation {} references missing category {}",
                    ann.id, ann.category_id
                )
            })?;
            Ok((
                ann.id,
                AnnSem {
                    image_file: image_file.to_string(),
                    category: category.to_string(),
                    geometry: ann.geometry.clone(),
                    confidence: ann.confidence,
                },
            ))
        })
        .collect()
}

pub fn assert_annotations_equivalent(a: &Dataset, b: &Dataset) -> Result<(), String> {
    let left = ann_semantics(a)?;
    let right = ann_semantics(b)?;
    if left.len() != right.len() {
        return Err(format!(
            "annotation count mismatch: left={} right={}",
            left.len(),
            right.len()
        ));
    }
    for (id, wanted) in &left {
        match right.get(id) {
            Some(found) if found == wanted => {}
            Some(found) => {
                return Err(format!(
                    "annotation {} differs:\n  left:  {:?}\n  right: {:?}",
                    id, wanted, found
                ))
            }
            None => return Err(format!("annotation {} missing on the right", id)),
        }
    }
    Ok(())
}
