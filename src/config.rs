//! Credential configuration
//!
//! Credentials live in `auth.d/*.json` files under a system and a local
//! configuration directory:
//!
//! ```json
//! { "rktKind": "auth", "rktVersion": "v1", "domains": ["example.com"],
//!   "type": "basic", "credentials": { "user": "bob", "password": "secret" } }
//! ```
//!
//! The local directory overrides the system directory host by host. The
//! result is a plain [`CredentialStore`] table handed to the transport as a
//! [`HeaderProvider`].

use crate::error::{PusherError, Result};
use crate::transport::HeaderProvider;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_SYSTEM_CONFIG_DIR: &str = "/usr/lib/rkt";
pub const DEFAULT_LOCAL_CONFIG_DIR: &str = "/etc/rkt";

const AUTH_SUBDIR: &str = "auth.d";
const AUTH_KIND: &str = "auth";
const AUTH_VERSION_V1: &str = "v1";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigHeader {
    #[serde(default)]
    rkt_kind: String,
    #[serde(default)]
    rkt_version: String,
}

#[derive(Debug, Deserialize)]
struct AuthV1 {
    #[serde(default)]
    domains: Vec<String>,
    #[serde(rename = "type")]
    auth_type: String,
    credentials: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct BasicCredentials {
    user: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct OauthCredentials {
    token: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Credential {
    Basic { user: String, password: String },
    Bearer { token: String },
}

impl Credential {
    pub fn headers(&self) -> Result<HeaderMap> {
        let value = match self {
            Credential::Basic { user, password } => {
                format!("Basic {}", STANDARD.encode(format!("{}:{}", user, password)))
            }
            Credential::Bearer { token } => format!("Bearer {}", token),
        };
        let value = HeaderValue::from_str(&value)
            .map_err(|e| PusherError::Config(format!("invalid credential header: {}", e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }
}

/// Per-host credentials.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    per_host: HashMap<String, Credential>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `system`, then `local` on top of it.
    pub fn load(system: &Path, local: &Path) -> Result<Self> {
        let mut store = Self::load_dir(system)?;
        store.merge(Self::load_dir(local)?);
        Ok(store)
    }

    /// Loads one configuration directory. A missing directory is empty.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut store = Self::new();
        if !valid_dir(dir)? {
            return Ok(store);
        }
        let auth_dir = dir.join(AUTH_SUBDIR);
        if !valid_dir(&auth_dir)? {
            return Ok(store);
        }

        for path in config_files(&auth_dir)? {
            store.read_file(&path)?;
        }
        Ok(store)
    }

    pub fn insert(&mut self, host: impl Into<String>, credential: Credential) {
        self.per_host.insert(host.into(), credential);
    }

    pub fn get(&self, host: &str) -> Option<&Credential> {
        self.per_host.get(host)
    }

    pub fn len(&self) -> usize {
        self.per_host.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_host.is_empty()
    }

    /// Entries of `other` replace ours for the same host.
    pub fn merge(&mut self, other: CredentialStore) {
        self.per_host.extend(other.per_host);
    }

    fn read_file(&mut self, path: &Path) -> Result<()> {
        let raw = std::fs::read(path)?;
        let header: ConfigHeader = serde_json::from_slice(&raw).map_err(|e| {
            PusherError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;

        if header.rkt_kind.is_empty() {
            return Err(PusherError::Config(format!(
                "no rktKind specified in {}",
                path.display()
            )));
        }
        if header.rkt_version.is_empty() {
            return Err(PusherError::Config(format!(
                "no rktVersion specified in {}",
                path.display()
            )));
        }
        if header.rkt_kind != AUTH_KIND {
            return Err(PusherError::Config(format!(
                "the configuration directory {} expects configuration files of kind {:?}, but {} has kind {:?}",
                path.parent().unwrap_or(path).display(),
                AUTH_KIND,
                path.display(),
                header.rkt_kind
            )));
        }
        if header.rkt_version != AUTH_VERSION_V1 {
            return Err(PusherError::Config(format!(
                "no parser available for configuration of kind {:?} and version {:?}",
                header.rkt_kind, header.rkt_version
            )));
        }

        self.parse_auth_v1(&raw)
            .map_err(|e| PusherError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    fn parse_auth_v1(&mut self, raw: &[u8]) -> std::result::Result<(), String> {
        let auth: AuthV1 = serde_json::from_slice(raw).map_err(|e| e.to_string())?;
        if auth.domains.is_empty() {
            return Err("no domains specified".to_string());
        }

        let credential = match auth.auth_type.as_str() {
            "basic" => {
                let creds: BasicCredentials =
                    serde_json::from_value(auth.credentials).map_err(|e| e.to_string())?;
                Credential::Basic {
                    user: creds.user,
                    password: creds.password,
                }
            }
            "oauth" => {
                let creds: OauthCredentials =
                    serde_json::from_value(auth.credentials).map_err(|e| e.to_string())?;
                Credential::Bearer { token: creds.token }
            }
            other => return Err(format!("unknown auth type: {:?}", other)),
        };
        credential.headers().map_err(|e| e.to_string())?;

        for domain in auth.domains {
            self.per_host.insert(domain, credential.clone());
        }
        Ok(())
    }
}

impl HeaderProvider for CredentialStore {
    fn headers_for(&self, host: &str) -> Option<HeaderMap> {
        self.per_host
            .get(host)
            .and_then(|credential| credential.headers().ok())
    }
}

fn valid_dir(path: &Path) -> Result<bool> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(true),
        Ok(_) => Err(PusherError::Config(format!(
            "expected {} to be a directory",
            path.display()
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// `*.json` regular files directly inside `dir`, sorted by path.
fn config_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_auth(root: &Path, file: &str, body: &str) {
        let dir = root.join(AUTH_SUBDIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(file), body).unwrap();
    }

    fn basic(domain: &str, user: &str) -> String {
        format!(
            r#"{{"rktKind":"auth","rktVersion":"v1","domains":["{}"],"type":"basic","credentials":{{"user":"{}","password":"pw"}}}}"#,
            domain, user
        )
    }

    #[test]
    fn missing_directories_load_empty() {
        let tmp = TempDir::new().unwrap();
        let store =
            CredentialStore::load(&tmp.path().join("nope"), &tmp.path().join("also-nope")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn basic_credentials_become_an_authorization_header() {
        let tmp = TempDir::new().unwrap();
        write_auth(tmp.path(), "a.json", &basic("example.com", "bob"));

        let store = CredentialStore::load_dir(tmp.path()).unwrap();
        let headers = store.headers_for("example.com").unwrap();
        let expected = format!("Basic {}", STANDARD.encode("bob:pw"));
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), expected.as_str());
        assert!(store.headers_for("other.com").is_none());
    }

    #[test]
    fn oauth_credentials_become_a_bearer_token() {
        let tmp = TempDir::new().unwrap();
        write_auth(
            tmp.path(),
            "token.json",
            r#"{"rktKind":"auth","rktVersion":"v1","domains":["a.com","b.com"],"type":"oauth","credentials":{"token":"t0k"}}"#,
        );

        let store = CredentialStore::load_dir(tmp.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.get("b.com"),
            Some(&Credential::Bearer {
                token: "t0k".to_string()
            })
        );
    }

    #[test]
    fn local_overrides_system() {
        let system = TempDir::new().unwrap();
        let local = TempDir::new().unwrap();
        write_auth(system.path(), "auth.json", &basic("example.com", "system"));
        write_auth(system.path(), "other.json", &basic("other.com", "system"));
        write_auth(local.path(), "auth.json", &basic("example.com", "local"));

        let store = CredentialStore::load(system.path(), local.path()).unwrap();
        assert!(matches!(
            store.get("example.com"),
            Some(Credential::Basic { user, .. }) if user == "local"
        ));
        assert!(matches!(
            store.get("other.com"),
            Some(Credential::Basic { user, .. }) if user == "system"
        ));
    }

    #[test]
    fn non_json_files_are_ignored() {
        let tmp = TempDir::new().unwrap();
        write_auth(tmp.path(), "README", "not a config");
        assert!(CredentialStore::load_dir(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let tmp = TempDir::new().unwrap();
        write_auth(
            tmp.path(),
            "paths.json",
            r#"{"rktKind":"paths","rktVersion":"v1"}"#,
        );
        let err = CredentialStore::load_dir(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("has kind \"paths\""));
    }

    #[test]
    fn missing_version_is_rejected() {
        let tmp = TempDir::new().unwrap();
        write_auth(tmp.path(), "a.json", r#"{"rktKind":"auth"}"#);
        let err = CredentialStore::load_dir(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("no rktVersion"));
    }

    #[test]
    fn unknown_auth_type_is_rejected() {
        let tmp = TempDir::new().unwrap();
        write_auth(
            tmp.path(),
            "a.json",
            r#"{"rktKind":"auth","rktVersion":"v1","domains":["a.com"],"type":"kerberos","credentials":{}}"#,
        );
        let err = CredentialStore::load_dir(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("unknown auth type"));
    }

    #[test]
    fn file_in_place_of_directory_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("conf");
        fs::write(&file, "").unwrap();
        assert!(matches!(
            CredentialStore::load_dir(&file),
            Err(PusherError::Config(_))
        ));
    }
}
