//! Fuzz target for the native dataset JSON reader.
//!
//! Run with:
//!   cargo +nightly fuzz run dataset_json_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use labelsdk::annotation::io_json::from_json_str;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }
    if let Ok(json) = std::str::from_utf8(data) {
        let _ = from_json_str(json);
    }
});
