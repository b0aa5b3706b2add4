#![no_main]

use libfuzzer_sys::fuzz_target;
use rest_oauth2::exchange::TokenRequest;
use rest_oauth2::pkce::{self, CodeChallenge};

fuzz_target!(|data: &[u8]| {
    let Ok(request) = serde_urlencoded::from_bytes::<TokenRequest>(data) else {
        return;
    };
    if let Some(verifier) = request.code_verifier.as_deref() {
        if pkce::check_format(verifier).is_ok() {
            let challenge = pkce::s256_challenge(verifier);
            let stored = CodeChallenge::from_request(Some(challenge.as_str()), Some("S256"), true);
            assert!(stored.is_ok_and(|c| c.is_some_and(|c| c.verify(verifier))));
        }
    }
});
