//! Per-host header injection

use reqwest::header::HeaderMap;
use std::collections::HashMap;

/// Supplies extra HTTP headers for requests to a given host.
///
/// The host is the authority of the outgoing request (`host` or
/// `host:port`). Returning `None` means there is nothing configured for that
/// host and the request goes out unauthenticated.
pub trait HeaderProvider: Send + Sync {
    fn headers_for(&self, host: &str) -> Option<HeaderMap>;
}

/// Provider that never adds anything.
#[derive(Debug, Default, Clone)]
pub struct NoAuth;

impl HeaderProvider for NoAuth {
    fn headers_for(&self, _host: &str) -> Option<HeaderMap> {
        None
    }
}

/// Fixed host to headers table.
#[derive(Debug, Default, Clone)]
pub struct StaticHeaders {
    per_host: HashMap<String, HeaderMap>,
}

impl StaticHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>, headers: HeaderMap) -> Self {
        self.per_host.insert(host.into(), headers);
        self
    }
}

impl HeaderProvider for StaticHeaders {
    fn headers_for(&self, host: &str) -> Option<HeaderMap> {
        self.per_host.get(host).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{AUTHORIZATION, HeaderValue};

    #[test]
    fn static_headers_match_on_exact_authority() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        let provider = StaticHeaders::new().with_host("example.com:8443", headers);

        assert!(provider.headers_for("example.com").is_none());
        let found = provider.headers_for("example.com:8443").unwrap();
        assert_eq!(found.get(AUTHORIZATION).unwrap(), "Bearer abc");
    }

    #[test]
    fn no_auth_never_matches() {
        assert!(NoAuth.headers_for("example.com").is_none());
    }
}
