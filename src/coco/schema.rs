//! COCO schema types and the pieces shared by the instance and panoptic
//! converters (info, images, categories, image files).

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::annotation::{Category, CategoryId, Dataset, DatasetInfo, Image, ImageId};
use crate::error::SdkError;

// ============================================================================
// Shared schema types
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct CocoInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CocoImage {
    pub id: u64,
    /// Optional on input; probed from the image file when missing.
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    pub file_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CocoCategory {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supercategory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isthing: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<[u8; 3]>,
}

// ============================================================================
// Instance schema types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CocoInstances {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<CocoInfo>,
    pub images: Vec<CocoImage>,
    pub annotations: Vec<CocoAnnotation>,
    pub categories: Vec<CocoCategory>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CocoAnnotation {
    pub id: u64,
    pub image_id: u64,
    pub category_id: u64,

    /// Polygon list or RLE object; absent or empty means bbox-only.
    #[serde(default)]
    pub segmentation: Option<CocoSegmentation>,

    /// `[x, y, width, height]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iscrowd: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum CocoSegmentation {
    /// One flat `[x1, y1, x2, y2, ...]` list per polygon part.
    Polygons(Vec<Vec<f64>>),
    Rle(CocoRle),
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CocoRle {
    /// `[height, width]`
    pub size: [u32; 2],
    pub counts: CocoRleCounts,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum CocoRleCounts {
    Uncompressed(Vec<u32>),
    Compressed(String),
}

// ============================================================================
// Panoptic schema types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CocoPanoptic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<CocoInfo>,
    pub images: Vec<CocoImage>,
    pub annotations: Vec<PanopticAnnotation>,
    pub categories: Vec<CocoCategory>,
}

/// One label map per image.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PanopticAnnotation {
    pub image_id: u64,
    /// PNG file in the mask directory.
    pub file_name: String,
    pub segments_info: Vec<SegmentInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SegmentInfo {
    pub id: u32,
    pub category_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iscrowd: Option<u8>,
}

// ============================================================================
// Shared conversions
// ============================================================================

pub(crate) fn info_to_model(info: Option<CocoInfo>) -> DatasetInfo {
    let info = info.unwrap_or_default();
    DatasetInfo {
        description: info.description,
        version: info.version,
        year: info.year,
        contributor: info.contributor,
        url: info.url,
        date_created: info.date_created,
    }
}

pub(crate) fn info_from_model(info: &DatasetInfo) -> Option<CocoInfo> {
    if *info == DatasetInfo::default() {
        return None;
    }
    Some(CocoInfo {
        year: info.year,
        version: info.version.clone(),
        description: info.description.clone(),
        contributor: info.contributor.clone(),
        url: info.url.clone(),
        date_created: info.date_created.clone(),
    })
}

/// Converts image entries, recording where each file lives under
/// `image_dir` and probing dimensions the JSON leaves out.
///
/// Images whose dimensions are missing and whose file cannot be found keep
/// a zero width/height; validation reports them.
pub(crate) fn images_to_model(
    images: Vec<CocoImage>,
    image_dir: &Path,
) -> Result<Vec<Image>, SdkError> {
    images
        .into_iter()
        .map(|img| {
            let path = image_dir.join(&img.file_name);
            let exists = path.is_file();

            let (width, height) = match (img.width, img.height) {
                (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
                _ if exists => {
                    let size = imagesize::size(&path).map_err(|source| {
                        SdkError::ImageDimensionRead {
                            path: path.clone(),
                            source,
                        }
                    })?;
                    (size.width as u32, size.height as u32)
                }
                (w, h) => {
                    log::warn!(
                        "image {} has no dimensions and {} was not found",
                        img.id,
                        path.display()
                    );
                    (w.unwrap_or(0), h.unwrap_or(0))
                }
            };

            let mut image = Image::new(img.id, img.file_name, width, height);
            if exists {
                image.source = Some(path);
            }
            Ok(image)
        })
        .collect()
}

pub(crate) fn image_from_model(image: &Image) -> CocoImage {
    CocoImage {
        id: image.id.as_u64(),
        width: Some(image.width),
        height: Some(image.height),
        file_name: image.file_name.clone(),
    }
}

pub(crate) fn category_to_model(cat: CocoCategory) -> Category {
    Category {
        id: CategoryId::new(cat.id),
        name: cat.name,
        supercategory: cat.supercategory,
        isthing: cat.isthing.map(|v| v != 0),
        color: cat.color,
    }
}

pub(crate) fn category_from_model(cat: &Category) -> CocoCategory {
    CocoCategory {
        id: cat.id.as_u64(),
        name: cat.name.clone(),
        supercategory: cat.supercategory.clone(),
        isthing: cat.isthing.map(u8::from),
        color: cat.color,
    }
}

/// Fails on two images sharing an id; converters key per-image data by id.
pub(crate) fn ensure_unique_image_ids(images: &[Image]) -> Result<(), SdkError> {
    let mut seen: HashSet<ImageId> = HashSet::new();
    for image in images {
        if !seen.insert(image.id) {
            return Err(SdkError::CocoInvalid(format!(
                "duplicate image id {}",
                image.id
            )));
        }
    }
    Ok(())
}

/// Copies every image with a known source file into `image_root`.
pub(crate) fn copy_images(dataset: &Dataset, image_root: &Path) -> Result<(), SdkError> {
    fs::create_dir_all(image_root)?;

    for image in &dataset.images {
        let Some(source) = &image.source else {
            log::debug!("image {} has no source file, not copying", image.id);
            continue;
        };
        if !source.is_file() {
            log::warn!(
                "source {} for image {} no longer exists, not copying",
                source.display(),
                image.id
            );
            continue;
        }

        let dest = image_root.join(&image.file_name);
        if is_same_file(source, &dest) {
            log::debug!("image {} already at {}", image.id, dest.display());
            continue;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, &dest)?;
    }
    Ok(())
}

/// True when both paths resolve to the same existing file, however spelled.
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
