//! The compact string form of COCO run-length counts.
//!
//! Compatible with pycocotools `rleToString` / `rleFrString`: each count
//! (after the third is delta-coded against the count two positions back) is
//! split into 5-bit groups, least significant first. Every group becomes one
//! ASCII character `48 + group`, with bit `0x20` marking that more groups
//! follow and bit `0x10` of the last group carrying the sign.

use crate::error::SdkError;

const CHAR_OFFSET: u8 = 48;
const MAX_GROUPS: u32 = 12;

/// Encodes run lengths into the compact string form.
pub fn encode_counts(counts: &[u32]) -> String {
    let mut out = String::with_capacity(counts.len() * 2);
    for (i, &count) in counts.iter().enumerate() {
        let mut x = count as i64;
        if i > 2 {
            x -= counts[i - 2] as i64;
        }
        loop {
            let mut c = (x & 0x1f) as u8;
            x >>= 5;
            let more = if c & 0x10 != 0 { x != -1 } else { x != 0 };
            if more {
                c |= 0x20;
            }
            out.push((c + CHAR_OFFSET) as char);
            if !more {
                break;
            }
        }
    }
    out
}

/// Decodes the compact string form back into run lengths.
pub fn decode_counts(encoded: &str) -> Result<Vec<u32>, SdkError> {
    let bytes = encoded.as_bytes();
    let mut counts: Vec<u32> = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let mut x: i64 = 0;
        let mut groups: u32 = 0;
        loop {
            let Some(&byte) = bytes.get(pos) else {
                return Err(SdkError::Rle(format!(
                    "truncated count at byte {} of {:?}",
                    pos, encoded
                )));
            };
            if !(CHAR_OFFSET..CHAR_OFFSET + 64).contains(&byte) {
                return Err(SdkError::Rle(format!(
                    "invalid character {:?} at byte {}",
                    byte as char, pos
                )));
            }
            if groups >= MAX_GROUPS {
                return Err(SdkError::Rle(format!("count too long at byte {}", pos)));
            }

            let c = (byte - CHAR_OFFSET) as i64;
            x |= (c & 0x1f) << (5 * groups);
            pos += 1;
            groups += 1;

            if c & 0x20 == 0 {
                if c & 0x10 != 0 {
                    x |= -1i64 << (5 * groups);
                }
                break;
            }
        }

        if counts.len() > 2 {
            x += counts[counts.len() - 2] as i64;
        }
        let count = u32::try_from(x).map_err(|_| {
            SdkError::Rle(format!("decoded count {} is out of range", x))
        })?;
        counts.push(count);
    }

    Ok(counts)
}
