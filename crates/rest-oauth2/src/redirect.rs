//! Redirect URI rules.
//!
//! Registration requires an absolute URI with a host and no userinfo. Matching
//! compares scheme, userinfo, host, port and path exactly and ignores the query
//! and fragment. Scheme and host case and dot segments in the path are
//! normalised before comparing. Ports are compared as written, so an explicit
//! default port does not match a URI without one.

use url::Url;

/// Characters a registered host may not contain.
const FORBIDDEN_HOST_CHARS: &[char] = &[':', '#', '?', '[', ']'];

/// Validate a redirect URI submitted for registration.
pub fn validate_registration(uri: &str) -> Result<Url, String> {
    let url = Url::parse(uri.trim()).map_err(|e| format!("'{uri}' is not a valid URI: {e}"))?;

    let Some(host) = url.host_str().filter(|h| !h.is_empty()) else {
        return Err(format!("'{uri}' must include a host"));
    };
    if !url.username().is_empty() || url.password().is_some() {
        return Err(format!("'{uri}' must not include user credentials"));
    }
    if host.contains(FORBIDDEN_HOST_CHARS) {
        return Err(format!("'{uri}' has an invalid host"));
    }
    Ok(url)
}

/// Whether `uri` matches one of the registered URIs.
#[must_use]
pub fn matches_any(registered: &[String], uri: &str) -> bool {
    let Ok(candidate) = Url::parse(uri) else {
        return false;
    };
    let candidate_port = written_port(uri);
    registered.iter().any(|r| {
        Url::parse(r).is_ok_and(|parsed| {
            written_port(r) == candidate_port && same_target(&parsed, &candidate)
        })
    })
}

fn same_target(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.username() == b.username()
        && a.password() == b.password()
        && a.host_str() == b.host_str()
        && a.path() == b.path()
}

/// The port exactly as it appears in the authority, if any.
///
/// `Url` drops a port equal to the scheme default, so this reads the raw text.
fn written_port(uri: &str) -> Option<&str> {
    let (_, rest) = uri.trim().split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    let after_host = match host_port.strip_prefix('[') {
        Some(bracketed) => bracketed.split_once(']').map_or("", |(_, tail)| tail),
        None => host_port,
    };
    after_host.split_once(':').map(|(_, port)| port)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registered() -> Vec<String> {
        vec!["https://app.example/cb".into()]
    }

    #[test]
    fn test_query_and_fragment_ignored() {
        assert!(matches_any(&registered(), "https://app.example/cb"));
        assert!(matches_any(&registered(), "https://app.example/cb?x=1"));
        assert!(matches_any(&registered(), "https://app.example/cb#frag"));
    }

    #[test]
    fn test_path_scheme_host_port_must_match() {
        assert!(!matches_any(&registered(), "https://app.example/cb/"));
        assert!(!matches_any(&registered(), "http://app.example/cb"));
        assert!(!matches_any(&registered(), "https://evil.example/cb"));
        assert!(!matches_any(&registered(), "https://app.example:8443/cb"));
        assert!(!matches_any(&registered(), "https://user@app.example/cb"));
    }

    #[test]
    fn test_explicit_default_port_is_distinct() {
        assert!(!matches_any(&registered(), "https://app.example:443/cb"));
        assert!(!matches_any(&["https://app.example:443/cb".into()], "https://app.example/cb"));
        assert!(matches_any(&["https://app.example:443/cb".into()], "https://app.example:443/cb"));
        assert!(matches_any(&["http://[::1]:8080/cb".into()], "http://[::1]:8080/cb?x=1"));
        assert!(!matches_any(&["http://[::1]:8080/cb".into()], "http://[::1]/cb"));
    }

    #[test]
    fn test_host_case_and_dot_segments_normalised() {
        assert!(matches_any(&registered(), "https://APP.example/cb"));
        assert!(matches_any(&registered(), "https://app.example/x/../cb"));
    }

    #[test]
    fn test_written_port() {
        assert_eq!(written_port("https://app.example:443/cb"), Some("443"));
        assert_eq!(written_port("https://app.example/cb"), None);
        assert_eq!(written_port("https://u:p@app.example/cb"), None);
        assert_eq!(written_port("https://u:p@app.example:81?x=1"), Some("81"));
        assert_eq!(written_port("http://[::1]:8080/cb"), Some("8080"));
        assert_eq!(written_port("myapp:callback"), None);
    }

    #[test]
    fn test_unparsable_or_relative_rejected() {
        assert!(!matches_any(&registered(), "/cb"));
        assert!(!matches_any(&registered(), "app.example/cb"));
        assert!(!matches_any(&registered(), ""));
    }

    #[test]
    fn test_registration_rules() {
        assert!(validate_registration("https://app.example/cb").is_ok());
        assert!(validate_registration("myapp://callback").is_ok());
        assert!(validate_registration("not a uri").is_err());
        assert!(validate_registration("https://user:pw@app.example/cb").is_err());
        assert!(validate_registration("https://[::1]/cb").is_err());
        assert!(validate_registration("mailto:someone@example.com").is_err());
    }
}
