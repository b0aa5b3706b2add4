#![no_main]

use libfuzzer_sys::fuzz_target;
use rest_oauth2::auth::bearer_from_header;

fuzz_target!(|data: &[u8]| {
    if let Ok(value) = std::str::from_utf8(data) {
        if let Some(token) = bearer_from_header(value) {
            assert!(!token.is_empty());
        }
    }
});
