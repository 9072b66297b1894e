#![no_main]

use libfuzzer_sys::fuzz_target;
use reelay::fuzz_api::WebhookPayload;

fuzz_target!(|data: &[u8]| {
    if let Ok(payload) = WebhookPayload::parse(data) {
        let _ = payload.events();
    }
});
