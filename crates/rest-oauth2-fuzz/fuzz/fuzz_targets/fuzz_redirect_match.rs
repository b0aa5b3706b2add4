#![no_main]

use libfuzzer_sys::fuzz_target;
use rest_oauth2::redirect::{matches_any, validate_registration};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    // First line is the registered URI, the rest the candidate
    let (registered, candidate) = input.split_once('\n').unwrap_or((input, input));
    if validate_registration(registered).is_ok() {
        let registered = vec![registered.to_owned()];
        let _ = matches_any(&registered, candidate);
    }
});
