//! Fuzz target for the incremental build-status reader.
//!
//! Run with: cargo +nightly fuzz run fuzz_status_reader
//!
//! Feeds arbitrary byte sequences through `StatusReader::push` one byte at a
//! time, the same way a response body arrives, to find panics or hangs in the
//! segment accumulation and JSON shape dispatch.

#![no_main]

use hermit_core::docker::StatusReader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut reader = StatusReader::new();
    for &byte in data {
        // Events and non-events are both fine; only a panic is a bug
        let _ = reader.push(byte);
    }
    let _ = reader.into_transcript();
});
