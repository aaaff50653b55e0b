//! COCO panoptic segmentation: JSON segment lists plus PNG label maps.
//!
//! Each image has one RGB PNG in the mask directory where every pixel holds
//! a segment id encoded as `id = R + 256·G + 256²·B` (0 is void). The JSON
//! lists, per image, which category each segment id belongs to.
//!
//! Reading turns every segment into an [`ObjectAnnotation`] with a
//! [`Geometry::Mask`] and records the segment id and crowd flag as
//! attributes. Writing rasterizes every geometry (so polygons and boxes work
//! too), paints segments in annotation-id order with later segments winning
//! on overlap, and recomputes area and bbox from the painted pixels.

use std::collections::{BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgb, RgbImage};

use super::schema::{
    category_from_model, category_to_model, copy_images, ensure_unique_image_ids,
    image_from_model, images_to_model, info_from_model, info_to_model, CocoPanoptic,
    PanopticAnnotation, SegmentInfo,
};
use crate::annotation::{
    AnnotationId, CategoryId, Dataset, Image, ImageId, ObjectAnnotation,
    ATTR_ISCROWD, ATTR_SEGMENT_ID,
};
use crate::error::SdkError;
use crate::geometry::{Bitmap, Geometry, Mask};

/// Largest id representable in 24-bit RGB.
const MAX_SEGMENT_ID: u32 = (1 << 24) - 1;

/// Decodes a segment id from an RGB label-map pixel.
#[inline]
pub fn rgb_to_segment_id(rgb: [u8; 3]) -> u32 {
    rgb[0] as u32 + 256 * rgb[1] as u32 + 256 * 256 * rgb[2] as u32
}

/// Encodes a segment id as an RGB label-map pixel.
#[inline]
pub fn segment_id_to_rgb(id: u32) -> [u8; 3] {
    [(id & 0xff) as u8, ((id >> 8) & 0xff) as u8, ((id >> 16) & 0xff) as u8]
}

// ============================================================================
// Public API
// ============================================================================

/// Reads panoptic JSON, loading label maps from `mask_dir`.
pub fn deserialize_panoptic(
    json: &str,
    image_dir: &Path,
    mask_dir: &Path,
) -> Result<Dataset, SdkError> {
    let coco: CocoPanoptic = serde_json::from_str(json).map_err(SdkError::CocoJson)?;
    panoptic_to_model(coco, image_dir, mask_dir)
}

/// Writes panoptic JSON, label maps into `mask_root` and known image files
/// into `image_root`.
pub fn serialize_panoptic(
    dataset: &Dataset,
    image_root: &Path,
    mask_root: &Path,
) -> Result<String, SdkError> {
    let coco = model_to_panoptic(dataset, image_root, mask_root)?;
    serde_json::to_string_pretty(&coco).map_err(SdkError::CocoJson)
}

/// Reads a panoptic JSON file.
pub fn read_panoptic_json(
    path: &Path,
    image_dir: &Path,
    mask_dir: &Path,
) -> Result<Dataset, SdkError> {
    let file = File::open(path).map_err(SdkError::Io)?;
    let reader = BufReader::new(file);

    let coco: CocoPanoptic =
        serde_json::from_reader(reader).map_err(|source| SdkError::CocoJsonParse {
            path: path.to_path_buf(),
            source,
        })?;

    panoptic_to_model(coco, image_dir, mask_dir)
}

/// Writes a panoptic JSON file along with its label maps and images.
pub fn write_panoptic_json(
    path: &Path,
    dataset: &Dataset,
    image_root: &Path,
    mask_root: &Path,
) -> Result<(), SdkError> {
    let coco = model_to_panoptic(dataset, image_root, mask_root)?;

    let file = File::create(path).map_err(SdkError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, &coco).map_err(|source| SdkError::CocoJsonWrite {
        path: path.to_path_buf(),
        source,
    })
}

// ============================================================================
// Conversion: COCO -> model
// ============================================================================

fn panoptic_to_model(
    coco: CocoPanoptic,
    image_dir: &Path,
    mask_dir: &Path,
) -> Result<Dataset, SdkError> {
    let info = info_to_model(coco.info);
    let mut images = images_to_model(coco.images, image_dir)?;
    ensure_unique_image_ids(&images)?;
    let categories = coco.categories.into_iter().map(category_to_model).collect();

    let image_index: HashMap<ImageId, usize> = images
        .iter()
        .enumerate()
        .map(|(idx, img)| (img.id, idx))
        .collect();

    let mut annotations = Vec::new();
    let mut next_id: u64 = 1;

    for entry in coco.annotations {
        let image_id = ImageId::new(entry.image_id);
        let Some(&idx) = image_index.get(&image_id) else {
            return Err(SdkError::CocoInvalid(format!(
                "segments for '{}' reference unknown image {}",
                entry.file_name, image_id
            )));
        };

        let mask_path = mask_dir.join(&entry.file_name);
        let label_map = load_label_map(&mask_path)?;
        let image = &mut images[idx];
        adopt_label_map_size(image, &label_map, &mask_path)?;

        let bitmaps = split_segments(&label_map, &entry.segments_info, &mask_path);

        for (segment, bitmap) in entry.segments_info.iter().zip(bitmaps) {
            if bitmap.area() == 0 {
                log::warn!(
                    "segment {} of {} has no pixels in the label map",
                    segment.id,
                    mask_path.display()
                );
            }
            let annotation = ObjectAnnotation::new(
                AnnotationId::new(next_id),
                image_id,
                CategoryId::new(segment.category_id),
                Geometry::Mask(Mask::from_bitmap(&bitmap)),
            )
            .with_attribute(ATTR_SEGMENT_ID, segment.id.to_string())
            .with_attribute(ATTR_ISCROWD, segment.iscrowd.unwrap_or(0).to_string());
            annotations.push(annotation);
            next_id += 1;
        }
    }

    Ok(Dataset {
        info,
        images,
        categories,
        annotations,
        relationships: Vec::new(),
    })
}

fn load_label_map(path: &Path) -> Result<RgbImage, SdkError> {
    let decoded = image::open(path).map_err(|source| SdkError::MaskImage {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decoded.to_rgb8())
}

/// Fills in missing image dimensions from the label map, or checks they agree.
fn adopt_label_map_size(image: &mut Image, label_map: &RgbImage, path: &Path) -> Result<(), SdkError> {
    let (width, height) = label_map.dimensions();
    if image.width == 0 || image.height == 0 {
        image.width = width;
        image.height = height;
        return Ok(());
    }
    if (image.width, image.height) != (width, height) {
        return Err(SdkError::CocoInvalid(format!(
            "label map {} is {}x{} but image {} is {}x{}",
            path.display(),
            width,
            height,
            image.id,
            image.width,
            image.height
        )));
    }
    Ok(())
}

/// One bitmap per listed segment, in `segments` order.
fn split_segments(label_map: &RgbImage, segments: &[SegmentInfo], path: &Path) -> Vec<Bitmap> {
    let (width, height) = label_map.dimensions();
    let index: HashMap<u32, usize> = segments
        .iter()
        .enumerate()
        .map(|(idx, seg)| (seg.id, idx))
        .collect();

    let mut bitmaps = vec![Bitmap::new(height, width); segments.len()];
    let mut unlisted: BTreeSet<u32> = BTreeSet::new();

    for (x, y, pixel) in label_map.enumerate_pixels() {
        let id = rgb_to_segment_id(pixel.0);
        if id == 0 {
            continue;
        }
        match index.get(&id) {
            Some(&idx) => bitmaps[idx].set(x, y, 1),
            None => {
                unlisted.insert(id);
            }
        }
    }

    if !unlisted.is_empty() {
        log::warn!(
            "{} contains segment id(s) {:?} missing from segments_info; treating them as void",
            path.display(),
            unlisted
        );
    }
    bitmaps
}

// ============================================================================
// Conversion: model -> COCO
// ============================================================================

fn model_to_panoptic(
    dataset: &Dataset,
    image_root: &Path,
    mask_root: &Path,
) -> Result<CocoPanoptic, SdkError> {
    ensure_unique_image_ids(&dataset.images)?;
    ensure_annotations_have_images(dataset)?;
    copy_images(dataset, image_root)?;
    fs::create_dir_all(mask_root)?;

    if !dataset.relationships.is_empty() {
        log::warn!(
            "COCO panoptic cannot represent relationships; dropping {} relationship annotation(s)",
            dataset.relationships.len()
        );
    }

    let mut images: Vec<&Image> = dataset.images.iter().collect();
    images.sort_by_key(|img| img.id);

    let mut entries = Vec::with_capacity(images.len());
    for image in &images {
        entries.push(write_label_map(dataset, image, mask_root)?);
    }

    let mut categories: Vec<_> = dataset
        .categories
        .iter()
        .map(|cat| {
            let mut out = category_from_model(cat);
            out.isthing = Some(u8::from(cat.isthing.unwrap_or(true)));
            out
        })
        .collect();
    categories.sort_by_key(|cat| cat.id);

    Ok(CocoPanoptic {
        info: info_from_model(&dataset.info),
        images: images.into_iter().map(image_from_model).collect(),
        annotations: entries,
        categories,
    })
}

/// Label maps are written per image, so an annotation on an unknown image
/// has nowhere to go.
fn ensure_annotations_have_images(dataset: &Dataset) -> Result<(), SdkError> {
    let image_ids: BTreeSet<ImageId> = dataset.images.iter().map(|img| img.id).collect();
    let orphans: Vec<u64> = dataset
        .annotations
        .iter()
        .filter(|ann| !image_ids.contains(&ann.image_id))
        .map(|ann| ann.id.as_u64())
        .collect();
    if orphans.is_empty() {
        return Ok(());
    }
    Err(SdkError::CocoInvalid(format!(
        "annotation(s) {:?} reference images missing from the dataset",
        orphans
    )))
}

/// Paints one image's segments into a label map and writes it as PNG.
fn write_label_map(
    dataset: &Dataset,
    image: &Image,
    mask_root: &Path,
) -> Result<PanopticAnnotation, SdkError> {
    let mut anns: Vec<&ObjectAnnotation> = dataset.annotations_for(image.id).collect();
    anns.sort_by_key(|ann| ann.id);

    let segment_ids = assign_segment_ids(&anns)?;
    let mut canvas = RgbImage::new(image.width, image.height);

    for (ann, &segment_id) in anns.iter().zip(&segment_ids) {
        let bitmap = ann
            .geometry
            .to_bitmap(image.height, image.width)
            .map_err(|err| {
                SdkError::CocoInvalid(format!("annotation {}: {}", ann.id, err))
            })?;
        let color = Rgb(segment_id_to_rgb(segment_id));
        for y in 0..image.height {
            for x in 0..image.width {
                if bitmap.get(x, y) {
                    canvas.put_pixel(x, y, color);
                }
            }
        }
    }

    let stats = segment_stats(&canvas);
    let segments_info = anns
        .iter()
        .zip(&segment_ids)
        .map(|(ann, &segment_id)| {
            let (area, bbox) = match stats.get(&segment_id) {
                Some(s) => (s.area as f64, s.bbox()),
                None => {
                    log::warn!(
                        "annotation {} covers no pixels of image {} after painting",
                        ann.id,
                        image.id
                    );
                    (0.0, [0.0; 4])
                }
            };
            SegmentInfo {
                id: segment_id,
                category_id: ann.category_id.as_u64(),
                area: Some(area),
                bbox: Some(bbox),
                iscrowd: Some(ann.attribute::<u8>(ATTR_ISCROWD).unwrap_or(0)),
            }
        })
        .collect();

    let file_name = label_map_name(&image.file_name);
    let path = mask_root.join(&file_name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    canvas
        .save_with_format(&path, ImageFormat::Png)
        .map_err(|source| SdkError::MaskImage {
            path: path.clone(),
            source,
        })?;
    log::debug!("wrote label map {}", path.display());

    Ok(PanopticAnnotation {
        image_id: image.id.as_u64(),
        file_name,
        segments_info,
    })
}

/// Keeps valid, unique stored segment ids and hands out fresh ones otherwise.
fn assign_segment_ids(anns: &[&ObjectAnnotation]) -> Result<Vec<u32>, SdkError> {
    assign_segment_ids_up_to(anns, MAX_SEGMENT_ID)
}

fn assign_segment_ids_up_to(
    anns: &[&ObjectAnnotation],
    max_id: u32,
) -> Result<Vec<u32>, SdkError> {
    let mut used: BTreeSet<u32> = BTreeSet::new();
    let mut assigned: Vec<Option<u32>> = anns
        .iter()
        .map(|ann| {
            ann.attribute::<u32>(ATTR_SEGMENT_ID)
                .filter(|&id| id > 0 && id <= max_id)
                .filter(|id| used.insert(*id))
        })
        .collect();

    let mut next = 1;
    for slot in assigned.iter_mut().filter(|slot| slot.is_none()) {
        while used.contains(&next) {
            next += 1;
        }
        if next > max_id {
            return Err(SdkError::CocoInvalid(format!(
                "{} segments on one image exceed the largest segment id {}",
                anns.len(),
                max_id
            )));
        }
        used.insert(next);
        *slot = Some(next);
    }
    Ok(assigned.into_iter().flatten().collect())
}

struct SegmentStats {
    area: u64,
    min: (u32, u32),
    max: (u32, u32),
}

impl SegmentStats {
    /// COCO `[x, y, width, height]` in pixel extents.
    fn bbox(&self) -> [f64; 4] {
        [
            self.min.0 as f64,
            self.min.1 as f64,
            (self.max.0 - self.min.0 + 1) as f64,
            (self.max.1 - self.min.1 + 1) as f64,
        ]
    }
}

fn segment_stats(canvas: &RgbImage) -> HashMap<u32, SegmentStats> {
    let mut stats: HashMap<u32, SegmentStats> = HashMap::new();
    for (x, y, pixel) in canvas.enumerate_pixels() {
        let id = rgb_to_segment_id(pixel.0);
        if id == 0 {
            continue;
        }
        stats
            .entry(id)
            .and_modify(|s| {
                s.area += 1;
                s.min = (s.min.0.min(x), s.min.1.min(y));
                s.max = (s.max.0.max(x), s.max.1.max(y));
            })
            .or_insert(SegmentStats {
                area: 1,
                min: (x, y),
                max: (x, y),
            });
    }
    stats
}

/// `photos/img_01.jpg` -> `photos/img_01.png`
fn label_map_name(file_name: &str) -> String {
    PathBuf::from(file_name)
        .with_extension("png")
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Category;
    use crate::geometry::{BBox, Polygon};

    #[test]
    fn test_segment_id_rgb_roundtrip() {
        assert_eq!(rgb_to_segment_id([1, 0, 0]), 1);
        assert_eq!(rgb_to_segment_id([0, 1, 0]), 256);
        assert_eq!(rgb_to_segment_id([0, 0, 1]), 65536);
        for id in [0, 1, 255, 256, 70_000, MAX_SEGMENT_ID] {
            assert_eq!(rgb_to_segment_id(segment_id_to_rgb(id)), id);
        }
    }

    #[test]
    fn test_label_map_name() {
        assert_eq!(label_map_name("a.jpg"), "a.png");
        assert_eq!(label_map_name("dir/b.jpeg"), "dir/b.png");
        assert_eq!(label_map_name("noext"), "noext.png");
    }

    #[test]
    fn test_assign_segment_ids_keeps_stored_and_fills_gaps() {
        let geometry = Geometry::Rectangle(BBox::from_xyxy(0.0, 0.0, 1.0, 1.0));
        let a = ObjectAnnotation::new(1u64, 1u64, 1u64, geometry.clone())
            .with_attribute(ATTR_SEGMENT_ID, "2");
        let b = ObjectAnnotation::new(2u64, 1u64, 1u64, geometry.clone());
        let c = ObjectAnnotation::new(3u64, 1u64, 1u64, geometry.clone())
            .with_attribute(ATTR_SEGMENT_ID, "2");
        let d = ObjectAnnotation::new(4u64, 1u64, 1u64, geometry)
            .with_attribute(ATTR_SEGMENT_ID, "0");

        let ids = assign_segment_ids(&[&a, &b, &c, &d]).unwrap();
        assert_eq!(ids, vec![2, 1, 3, 4]);
    }

    #[test]
    fn test_assign_segment_ids_stops_at_max_id() {
        let geometry = Geometry::Rectangle(BBox::from_xyxy(0.0, 0.0, 1.0, 1.0));
        let a = ObjectAnnotation::new(1u64, 1u64, 1u64, geometry.clone())
            .with_attribute(ATTR_SEGMENT_ID, "2");
        let b = ObjectAnnotation::new(2u64, 1u64, 1u64, geometry.clone());
        let c = ObjectAnnotation::new(3u64, 1u64, 1u64, geometry);

        assert_eq!(assign_segment_ids_up_to(&[&a, &b], 2).unwrap(), vec![2, 1]);
        assert!(matches!(
            assign_segment_ids_up_to(&[&a, &b, &c], 2),
            Err(SdkError::CocoInvalid(_))
        ));
    }

    #[test]
    fn test_annotation_on_unknown_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let rect = Geometry::Rectangle(BBox::from_xyxy(0.0, 0.0, 1.0, 1.0));
        let dataset = Dataset {
            images: vec![Image::new(1u64, "a.jpg", 2, 2)],
            categories: vec![Category::new(1u64, "thing")],
            annotations: vec![
                ObjectAnnotation::new(1u64, 1u64, 1u64, rect.clone()),
                ObjectAnnotation::new(7u64, 9u64, 1u64, rect),
            ],
            ..Default::default()
        };

        match serialize_panoptic(&dataset, &dir.path().join("images"), &dir.path().join("masks")) {
            Err(SdkError::CocoInvalid(message)) => assert!(message.contains("[7]")),
            other => panic!("expected CocoInvalid, got {:?}", other.map(|_| ())),
        }
        assert!(!dir.path().join("masks").exists());
    }

    #[test]
    fn test_roundtrip_through_label_maps() {
        let dir = tempfile::tempdir().unwrap();
        let (images_out, masks_out) = (dir.path().join("images"), dir.path().join("masks"));

        let dataset = Dataset {
            images: vec![Image::new(1u64, "scene.jpg", 6, 4)],
            categories: vec![
                Category::new(1u64, "person").with_isthing(true),
                Category::new(2u64, "sky").with_isthing(false),
            ],
            annotations: vec![
                ObjectAnnotation::new(
                    1u64,
                    1u64,
                    2u64,
                    Geometry::Rectangle(BBox::from_xyxy(0.0, 0.0, 6.0, 2.0)),
                ),
                ObjectAnnotation::new(
                    2u64,
                    1u64,
                    1u64,
                    Geometry::Polygon(
                        Polygon::from_flat(&[1.0, 1.0, 3.0, 1.0, 3.0, 4.0, 1.0, 4.0]).unwrap(),
                    ),
                ),
            ],
            ..Default::default()
        };

        let json = serialize_panoptic(&dataset, &images_out, &masks_out).expect("serialize");
        assert!(masks_out.join("scene.png").is_file());

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let segments = &parsed["annotations"][0]["segments_info"];
        // Sky loses columns 1 and 2 of row 1 to the person painted on top.
        assert_eq!(segments[0]["area"], 10.0);
        assert_eq!(segments[1]["area"], 6.0);
        assert_eq!(segments[1]["bbox"], serde_json::json!([1.0, 1.0, 2.0, 3.0]));
        assert_eq!(parsed["categories"][1]["isthing"], 0);

        let restored =
            deserialize_panoptic(&json, &images_out, &masks_out).expect("deserialize");
        assert_eq!(restored.annotations.len(), 2);
        assert_eq!(restored.annotations[0].category_id, CategoryId(2));
        assert_eq!(restored.annotations[1].geometry.area(), 6.0);
        assert_eq!(
            restored.annotations[1].attribute::<u32>(ATTR_SEGMENT_ID),
            Some(2)
        );
    }

    #[test]
    fn test_missing_label_map_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{
            "images": [{"id": 1, "width": 2, "height": 2, "file_name": "a.jpg"}],
            "categories": [{"id": 1, "name": "x"}],
            "annotations": [{"image_id": 1, "file_name": "a.png", "segments_info": []}]
        }"#;
        let err = deserialize_panoptic(json, dir.path(), dir.path()).unwrap_err();
        assert!(matches!(err, SdkError::MaskImage { .. }));
    }

    #[test]
    fn test_unknown_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{
            "images": [],
            "categories": [],
            "annotations": [{"image_id": 9, "file_name": "a.png", "segments_info": []}]
        }"#;
        assert!(matches!(
            deserialize_panoptic(json, dir.path(), dir.path()),
            Err(SdkError::CocoInvalid(_))
        ));
    }
}
