#![no_main]

use libfuzzer_sys::fuzz_target;
use reelay::fuzz_api::{decode_hidden_id, encode_hidden_id};

fuzz_target!(|text: &str| {
    if let Some(id) = decode_hidden_id(text) {
        assert!(id.bytes().all(|b| b.is_ascii_digit()));
        assert_eq!(decode_hidden_id(&encode_hidden_id(&id)).as_deref(), Some(id.as_str()));
    }
});
