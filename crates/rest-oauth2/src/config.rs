//! Configuration for the OAuth 2.0 server.

use std::time::Duration;

use anyhow::Context;

/// Default values.
pub mod defaults {
    use std::time::Duration;

    /// Public base URL of the server.
    pub const BASE_URL: &str = "http://localhost:8080";

    /// Conventional header a fronting proxy sets to the logged-in identity.
    /// Only trusted when configured explicitly.
    pub const IDENTITY_HEADER: &str = "x-remote-user";

    /// Path of the login page, relative to the base URL.
    pub const LOGIN_PATH: &str = "/login";

    /// How often expired authorization codes are swept.
    pub const CODE_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);
}

/// Server configuration.
#[derive(Clone)]
pub struct Config {
    /// Public base URL, used for the endpoint URLs in the API index.
    pub base_url: String,

    /// HMAC key for approval-form nonces. A random key is used when unset.
    pub nonce_secret: Option<String>,

    /// Require PKCE on every authorization request.
    pub force_pkce: bool,

    /// Revoke a client's access tokens when the client is deleted.
    pub revoke_tokens_on_client_delete: bool,

    /// Trusted header carrying the logged-in identity. Without one, only
    /// bearer tokens authenticate and nobody can log in to approve requests.
    pub identity_header: Option<String>,

    /// Where anonymous users are sent to log in.
    pub login_url: String,

    /// Expired code sweep interval.
    pub code_cleanup_interval: Duration,
}

impl Config {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            login_url: format!("{base_url}{}", defaults::LOGIN_PATH),
            base_url,
            nonce_secret: None,
            force_pkce: false,
            revoke_tokens_on_client_delete: false,
            identity_header: None,
            code_cleanup_interval: defaults::CODE_CLEANUP_INTERVAL,
        }
    }

    /// Deterministic configuration for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            nonce_secret: Some("test-nonce-secret".to_owned()),
            identity_header: Some(defaults::IDENTITY_HEADER.to_owned()),
            ..Self::new("http://as.test")
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns error if a boolean variable cannot be parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = std::env::var("OAUTH2_BASE_URL").unwrap_or_else(|_| defaults::BASE_URL.into());
        let mut config = Self::new(base_url);

        config.nonce_secret = std::env::var("OAUTH2_NONCE_SECRET").ok().filter(|s| !s.is_empty());
        config.force_pkce = env_flag("OAUTH2_FORCE_PKCE")?;
        config.revoke_tokens_on_client_delete = env_flag("OAUTH2_REVOKE_ON_CLIENT_DELETE")?;
        config.identity_header =
            std::env::var("OAUTH2_IDENTITY_HEADER").ok().filter(|h| !h.trim().is_empty());
        if let Ok(login_url) = std::env::var("OAUTH2_LOGIN_URL") {
            config.login_url = login_url;
        }
        Ok(config)
    }

    /// Replace the base URL. A login URL derived from the old base follows it.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let derived_login = self.url_for(defaults::LOGIN_PATH);
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        if self.login_url == derived_login {
            self.login_url = self.url_for(defaults::LOGIN_PATH);
        }
        self
    }

    /// Absolute URL of a server path.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(defaults::BASE_URL)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("nonce_secret", &self.nonce_secret.as_ref().map(|_| "<redacted>"))
            .field("force_pkce", &self.force_pkce)
            .field("revoke_tokens_on_client_delete", &self.revoke_tokens_on_client_delete)
            .field("identity_header", &self.identity_header)
            .field("login_url", &self.login_url)
            .finish()
    }
}

fn env_flag(name: &str) -> anyhow::Result<bool> {
    match std::env::var(name) {
        Ok(value) => parse_flag(&value).with_context(|| format!("{name} must be a boolean, got '{value}'")),
        Err(_) => Ok(false),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
