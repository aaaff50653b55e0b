//! Binary masks: a dense [`Bitmap`] and its run-length encoded form [`Rle`].
//!
//! The RLE layout follows COCO: runs are taken in column-major order, they
//! alternate background/foreground, and the first run is always background
//! (possibly of length zero). `size` is `[height, width]`.

use serde::{Deserialize, Serialize};

use super::bbox::BBox;
use crate::error::SdkError;

/// A dense single-channel canvas in row-major order.
///
/// Any non-zero byte counts as "set".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    height: u32,
    width: u32,
    data: Vec<u8>,
}

impl Bitmap {
    /// Creates an empty `height × width` canvas.
    pub fn new(height: u32, width: u32) -> Self {
        Self {
            height,
            width,
            data: vec![0; height as usize * width as usize],
        }
    }

    /// Wraps existing row-major pixel data.
    pub fn from_raw(height: u32, width: u32, data: Vec<u8>) -> Result<Self, SdkError> {
        let expected = height as usize * width as usize;
        if data.len() != expected {
            return Err(SdkError::InvalidGeometry(format!(
                "bitmap of {}x{} needs {} bytes, got {}",
                height,
                width,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            height,
            width,
            data,
        })
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Returns whether pixel (x, y) is set. Out-of-range pixels are unset.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.data[self.index(x, y)] != 0
    }

    /// Sets pixel (x, y) to `value`. Out-of-range writes are ignored.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            self.data[idx] = value;
        }
    }

    /// Marks pixels `x0..x1` of row `y` with `value`, clamped to the canvas.
    pub(crate) fn fill_span(&mut self, y: u32, x0: u32, x1: u32, value: u8) {
        if y >= self.height {
            return;
        }
        let x1 = x1.min(self.width);
        if x0 >= x1 {
            return;
        }
        let start = self.index(x0, y);
        let end = self.index(x1 - 1, y) + 1;
        self.data[start..end].fill(value);
    }

    /// Number of set pixels.
    pub fn area(&self) -> u64 {
        self.data.iter().filter(|&&v| v != 0).count() as u64
    }

    /// Pixel-extent bounding box of the set pixels.
    ///
    /// A single set pixel at (x, y) yields `[x, y, x + 1, y + 1]`.
    pub fn bounding_box(&self) -> Option<BBox> {
        let mut extent: Option<(u32, u32, u32, u32)> = None;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.data[self.index(x, y)] == 0 {
                    continue;
                }
                extent = Some(match extent {
                    None => (x, y, x, y),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                });
            }
        }
        extent.map(|(x0, y0, x1, y1)| {
            BBox::from_xyxy(x0 as f64, y0 as f64, (x1 + 1) as f64, (y1 + 1) as f64)
        })
    }

    /// Sets every pixel of `self` that is set in `other`.
    pub fn union(&mut self, other: &Bitmap) -> Result<(), SdkError> {
        if self.height != other.height || self.width != other.width {
            return Err(SdkError::InvalidGeometry(format!(
                "cannot combine a {}x{} mask with a {}x{} mask",
                self.height, self.width, other.height, other.width
            )));
        }
        for (dst, src) in self.data.iter_mut().zip(&other.data) {
            if *src != 0 {
                *dst = (*dst).max(*src);
            }
        }
        Ok(())
    }
}

/// Uncompressed run-length encoding of a binary mask.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rle {
    /// `[height, width]`
    pub size: [u32; 2],
    pub counts: Vec<u32>,
}

impl Rle {
    /// Encodes a bitmap in column-major order.
    pub fn encode(bitmap: &Bitmap) -> Rle {
        let mut counts = Vec::new();
        let mut current = false;
        let mut run: u32 = 0;

        for x in 0..bitmap.width {
            for y in 0..bitmap.height {
                let value = bitmap.get(x, y);
                if value != current {
                    counts.push(run);
                    run = 0;
                    current = value;
                }
                run += 1;
            }
        }
        counts.push(run);

        Rle {
            size: [bitmap.height, bitmap.width],
            counts,
        }
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.size[0]
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.size[1]
    }

    /// Number of foreground pixels.
    pub fn area(&self) -> u64 {
        self.counts.iter().skip(1).step_by(2).map(|&c| c as u64).sum()
    }

    /// Decodes back into a dense bitmap.
    ///
    /// Fails when the runs do not cover exactly `height × width` pixels.
    pub fn decode(&self) -> Result<Bitmap, SdkError> {
        let (height, width) = (self.height(), self.width());
        let total = height as u64 * width as u64;
        let covered: u64 = self.counts.iter().map(|&c| c as u64).sum();
        if covered != total {
            return Err(SdkError::Rle(format!(
                "runs cover {} pixels but size {}x{} has {}",
                covered, height, width, total
            )));
        }

        let mut bitmap = Bitmap::new(height, width);
        let mut pos: u64 = 0;
        for (i, &count) in self.counts.iter().enumerate() {
            if i % 2 == 1 {
                for p in pos..pos + count as u64 {
                    let x = (p / height as u64) as u32;
                    let y = (p % height as u64) as u32;
                    bitmap.set(x, y, 1);
                }
            }
            pos += count as u64;
        }
        Ok(bitmap)
    }

    /// Pixel-extent bounding box computed from the runs without decoding.
    pub fn bounding_box(&self) -> Option<BBox> {
        let h = self.height() as u64;
        if h == 0 {
            return None;
        }
        let mut bbox: Option<BBox> = None;
        let mut pos: u64 = 0;
        for (i, &count) in self.counts.iter().enumerate() {
            let count = count as u64;
            if i % 2 == 1 && count > 0 {
                let (first, last) = (pos, pos + count - 1);
                let (x0, x1) = (first / h, last / h);
                let (y0, y1) = if x0 == x1 {
                    (first % h, last % h)
                } else {
                    // A run spilling into the next column touches both the
                    // bottom row of the first column and the top row of the last.
                    (0, h - 1)
                };
                let run_box =
                    BBox::from_xyxy(x0 as f64, y0 as f64, (x1 + 1) as f64, (y1 + 1) as f64);
                bbox = Some(match bbox {
                    None => run_box,
                    Some(b) => b.union(&run_box),
                });
            }
            pos += count;
        }
        bbox
    }
}

/// How a mask's counts were (or should be) written in COCO JSON.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RleEncoding {
    /// `counts` as a list of integers.
    #[default]
    Uncompressed,
    /// `counts` as the compact pycocotools string.
    Compressed,
}

/// A binary segmentation mask.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mask {
    pub rle: Rle,
    #[serde(default)]
    pub encoding: RleEncoding,
}

impl Mask {
    pub fn new(rle: Rle, encoding: RleEncoding) -> Self {
        Self { rle, encoding }
    }

    pub fn from_bitmap(bitmap: &Bitmap) -> Self {
        Self::new(Rle::encode(bitmap), RleEncoding::Uncompressed)
    }

    pub fn to_bitmap(&self) -> Result<Bitmap, SdkError> {
        self.rle.decode()
    }

    pub fn area(&self) -> u64 {
        self.rle.area()
    }

    pub fn bounding_box(&self) -> Option<BBox> {
        self.rle.bounding_box()
    }
}
