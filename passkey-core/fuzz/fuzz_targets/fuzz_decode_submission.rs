#![no_main]

//! Fuzz target for decoding store_credential / authenticate_credential payloads
//!
//! Run with: cargo +nightly fuzz run fuzz_decode_submission

use libfuzzer_sys::fuzz_target;
use passkey_core::{decode_submission, EncodedAssertion, EncodedRegistration};

fuzz_target!(|data: &[u8]| {
    let Ok(payload) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    if let Ok(registration) = decode_submission::<EncodedRegistration>(payload.clone()) {
        let _ = registration.raw_id_bytes();
        let _ = registration.into_register_credential();
    }
    if let Ok(assertion) = decode_submission::<EncodedAssertion>(payload) {
        let _ = assertion.into_public_key_credential();
    }
});
