//! Fuzzing library for rest-oauth2.
//!
//! This crate provides fuzzing targets for the request parsing that runs on
//! untrusted input: redirect URI matching, bearer token extraction, PKCE
//! parameters and token endpoint form bodies.
//!
//! # Usage
//!
//! ```bash
//! cd crates/rest-oauth2-fuzz
//! cargo +nightly fuzz run fuzz_token_request -- -max_total_time=60
//! ```

pub use rest_oauth2::{auth, exchange, pkce, redirect};
