//! App names and push endpoint discovery
//!
//! An app name such as `example.com/app:1.0.0,os=linux` is resolved to the
//! push endpoints that accept initiation requests. The lookup itself sits
//! behind [`NameResolver`]; [`MetaDiscovery`] implements it with appc HTTP
//! meta-tag discovery.

pub mod meta;

pub use meta::MetaDiscovery;

use crate::error::{PusherError, Result};
use crate::logging::Logger;
use async_trait::async_trait;
use regex_lite::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

pub const ARCH_LABEL: &str = "arch";
pub const OS_LABEL: &str = "os";
pub const EXT_LABEL: &str = "ext";
pub const VERSION_LABEL: &str = "version";

static AC_IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+([-._~/@][a-z0-9]+)*$").expect("AC identifier pattern is valid")
});

static AC_LABEL_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+([-._~][a-z0-9]+)*$").expect("label name pattern is valid")
});

/// Target app name plus its labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppName {
    pub name: String,
    pub labels: BTreeMap<String, String>,
}

impl AppName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !AC_IDENTIFIER.is_match(&name) {
            return Err(PusherError::InvalidName(format!(
                "{:?} is not a valid AC identifier",
                name
            )));
        }
        Ok(Self {
            name,
            labels: BTreeMap::new(),
        })
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

impl FromStr for AppName {
    type Err = PusherError;

    /// Parses `NAME[:VERSION][,KEY=VALUE]...`.
    fn from_str(raw: &str) -> Result<Self> {
        let mut parts = raw.split(',');
        let head = parts.next().unwrap_or_default();
        let (name, version) = match head.split_once(':') {
            Some((name, version)) => (name, Some(version)),
            None => (head, None),
        };

        let mut app = AppName::new(name)?;
        if let Some(version) = version {
            app.labels
                .insert(VERSION_LABEL.to_string(), version.to_string());
        }

        for part in parts {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                PusherError::InvalidName(format!("label {:?} is not of the form key=value", part))
            })?;
            if !AC_LABEL_NAME.is_match(key) {
                return Err(PusherError::InvalidName(format!(
                    "{:?} is not a valid label name",
                    key
                )));
            }
            if app.labels.contains_key(key) {
                return Err(PusherError::InvalidName(format!(
                    "label {:?} given more than once",
                    key
                )));
            }
            app.labels.insert(key.to_string(), value.to_string());
        }

        Ok(app)
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for (key, value) in &self.labels {
            write!(f, ",{}={}", key, value)?;
        }
        Ok(())
    }
}

/// A discovery prefix that produced no endpoint, kept for diagnostics only.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedAttempt {
    pub prefix: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discovery {
    pub push_endpoints: Vec<String>,
    pub failed_attempts: Vec<FailedAttempt>,
}

/// Resolves an app name to push endpoints.
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn discover(&self, app: &AppName, insecure: bool) -> Result<Discovery>;
}

/// Returns the first push endpoint for `app`.
pub async fn discover_endpoint(
    resolver: &dyn NameResolver,
    app: &AppName,
    insecure: bool,
    logger: &Logger,
) -> Result<String> {
    logger.debug("searching for push endpoint via meta discovery");
    let discovery = resolver
        .discover(app, insecure)
        .await
        .map_err(|err| match err {
            discovery @ PusherError::Discovery(_) => discovery,
            other => PusherError::Discovery(other.to_string()),
        })?;

    for attempt in &discovery.failed_attempts {
        logger.debug(&format!(
            "meta tag 'ac-push-discovery' not found on {}: {}",
            attempt.prefix, attempt.error
        ));
    }

    let endpoint = discovery
        .push_endpoints
        .into_iter()
        .next()
        .ok_or(PusherError::NoEndpoint)?;
    logger.debug(&format!("push endpoint found: {}", endpoint));
    Ok(endpoint)
}
