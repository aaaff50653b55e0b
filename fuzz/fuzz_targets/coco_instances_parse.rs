//! Fuzz target for COCO instance JSON parsing.
//!
//! Arbitrary input is fed to the instance reader, including its polygon,
//! RLE and bbox-only branches. Errors are fine; panics are not.
//!
//! Run with:
//!   cargo +nightly fuzz run coco_instances_parse

#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use labelsdk::coco::deserialize_instances;

fuzz_target!(|data: &[u8]| {
    // 10MB is generous for annotation files.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };
    // A directory that never exists keeps dimension probing off the disk.
    let _ = deserialize_instances(json, Path::new("/nonexistent/labelsdk-fuzz"));
});
