//! Fuzz target for the compressed COCO counts decoder.
//!
//! Whatever decodes must encode back to the same counts.
//!
//! Run with:
//!   cargo +nightly fuzz run rle_counts_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use labelsdk::coco::{decode_counts, encode_counts};

fuzz_target!(|data: &[u8]| {
    let Ok(encoded) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(counts) = decode_counts(encoded) {
        let again = decode_counts(&encode_counts(&counts)).expect("re-encoded counts decode");
        assert_eq!(again, counts);
    }
});
