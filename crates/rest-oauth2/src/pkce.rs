//! PKCE (Proof Key for Code Exchange) validation and verification.
//!
//! Implements `plain` and `S256` code challenges per RFC 7636.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Shortest allowed challenge or verifier.
pub const MIN_LENGTH: usize = 43;
/// Longest allowed challenge or verifier.
pub const MAX_LENGTH: usize = 128;
/// Verifier length used by the generator when none is given.
pub const DEFAULT_VERIFIER_LENGTH: usize = 64;

/// RFC 7636 unreserved characters.
const UNRESERVED: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// PKCE validation failures.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PkceError {
    #[error("Code challenge is required.")]
    MissingChallenge,

    #[error("Code challenge must be between 43 and 128 characters, got {0}.")]
    InvalidLength(usize),

    #[error("Code challenge contains characters outside [A-Za-z0-9.-_~].")]
    InvalidCharacters,

    #[error("Code challenge method {0} is not supported.")]
    UnsupportedMethod(String),
}

impl PkceError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingChallenge => "missing_code_challenge",
            Self::UnsupportedMethod(_) => "invalid_code_challenge_method",
            Self::InvalidLength(_) | Self::InvalidCharacters => "invalid_code_challenge",
        }
    }
}

/// Transformation applied to the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CodeChallengeMethod {
    #[default]
    #[serde(rename = "plain")]
    Plain,
    S256,
}

impl CodeChallengeMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::S256 => "S256",
        }
    }
}

impl fmt::Display for CodeChallengeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodeChallengeMethod {
    type Err = PkceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("plain") {
            Ok(Self::Plain)
        } else if s.eq_ignore_ascii_case("s256") {
            Ok(Self::S256)
        } else {
            Err(PkceError::UnsupportedMethod(s.to_owned()))
        }
    }
}

/// A validated code challenge bound to an authorization code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeChallenge {
    pub challenge: String,
    pub method: CodeChallengeMethod,
}

impl CodeChallenge {
    /// Validate the PKCE parameters of an authorization request.
    ///
    /// Returns `Ok(None)` when no challenge was sent and PKCE is not required.
    pub fn from_request(
        challenge: Option<&str>,
        method: Option<&str>,
        required: bool,
    ) -> Result<Option<Self>, PkceError> {
        let challenge = match challenge.filter(|c| !c.is_empty()) {
            Some(c) => c,
            None if required => return Err(PkceError::MissingChallenge),
            None => return Ok(None),
        };

        check_format(challenge)?;

        let method = match method.filter(|m| !m.is_empty()) {
            Some(m) => m.parse()?,
            None => CodeChallengeMethod::Plain,
        };

        Ok(Some(Self { challenge: challenge.to_owned(), method }))
    }

    /// Check a `code_verifier` against this challenge in constant time.
    #[must_use]
    pub fn verify(&self, verifier: &str) -> bool {
        if check_format(verifier).is_err() {
            return false;
        }
        match self.method {
            CodeChallengeMethod::Plain => {
                verifier.as_bytes().ct_eq(self.challenge.as_bytes()).into()
            }
            CodeChallengeMethod::S256 => verify_s256(verifier, &self.challenge),
        }
    }
}

/// Length and charset rules shared by challenges and verifiers.
pub fn check_format(value: &str) -> Result<(), PkceError> {
    let len = value.len();
    if !(MIN_LENGTH..=MAX_LENGTH).contains(&len) {
        return Err(PkceError::InvalidLength(len));
    }
    if !value.bytes().all(|b| UNRESERVED.contains(&b)) {
        return Err(PkceError::InvalidCharacters);
    }
    Ok(())
}

/// Compute `BASE64URL(SHA256(code_verifier))`.
#[must_use]
pub fn s256_challenge(code_verifier: &str) -> String {
    let hash = Sha256::digest(code_verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Verify a PKCE S256 code challenge.
pub fn verify_s256(code_verifier: &str, code_challenge: &str) -> bool {
    let computed = s256_challenge(code_verifier);
    computed.as_bytes().ct_eq(code_challenge.as_bytes()).into()
}

/// Generate a `(code_verifier, code_challenge)` pair for testing clients.
///
/// With a seed the seed becomes the verifier; otherwise a random verifier of
/// `length` unreserved characters is generated.
pub fn generate_pair(seed: Option<&str>, length: usize) -> Result<(String, String), PkceError> {
    let verifier = match seed {
        Some(seed) => {
            check_format(seed)?;
            seed.to_owned()
        }
        None => {
            if !(MIN_LENGTH..=MAX_LENGTH).contains(&length) {
                return Err(PkceError::InvalidLength(length));
            }
            let mut rng = rand::thread_rng();
            (0..length).map(|_| UNRESERVED[rng.gen_range(0..UNRESERVED.len())] as char).collect()
        }
    };
    let challenge = s256_challenge(&verifier);
    Ok((verifier, challenge))
}
