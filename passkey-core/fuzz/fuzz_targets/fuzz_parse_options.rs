#![no_main]

//! Fuzz target for parse_creation_options() / parse_request_options()
//!
//! Server replies are untrusted JSON. Parsing must reject, never panic.
//!
//! Run with: cargo +nightly fuzz run fuzz_parse_options

use libfuzzer_sys::fuzz_target;
use passkey_core::{parse_creation_options, parse_request_options};

fuzz_target!(|data: &[u8]| {
    if let Ok(reply) = serde_json::from_slice::<serde_json::Value>(data) {
        let _ = parse_creation_options(reply.clone());
        let _ = parse_request_options(reply);
    }
});
