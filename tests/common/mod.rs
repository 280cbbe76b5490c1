#![allow(dead_code)]

use aci_pusher::discovery::{AppName, Discovery, NameResolver};
use aci_pusher::transport::HeaderProvider;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Header provider that records every host it is asked about.
#[derive(Default)]
pub struct CountingHeaders {
    headers: Option<HeaderMap>,
    hosts: Mutex<Vec<String>>,
}

impl CountingHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returning(headers: HeaderMap) -> Self {
        Self {
            headers: Some(headers),
            hosts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.hosts.lock().unwrap().len()
    }

    pub fn hosts(&self) -> Vec<String> {
        self.hosts.lock().unwrap().clone()
    }
}

impl HeaderProvider for CountingHeaders {
    fn headers_for(&self, host: &str) -> Option<HeaderMap> {
        self.hosts.lock().unwrap().push(host.to_string());
        self.headers.clone()
    }
}

/// Resolver answering every name with the same endpoints.
pub struct FixedResolver {
    endpoints: Vec<String>,
    calls: AtomicUsize,
}

impl FixedResolver {
    pub fn new(endpoints: Vec<String>) -> Self {
        Self {
            endpoints,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NameResolver for FixedResolver {
    async fn discover(&self, _app: &AppName, _insecure: bool) -> aci_pusher::Result<Discovery> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Discovery {
            push_endpoints: self.endpoints.clone(),
            failed_attempts: Vec::new(),
        })
    }
}

/// Writes a tar ACI whose manifest carries `labels`.
pub fn write_aci(dir: &Path, labels: &[(&str, &str)]) -> PathBuf {
    let labels: Vec<serde_json::Value> = labels
        .iter()
        .map(|(name, value)| serde_json::json!({"name": name, "value": value}))
        .collect();
    let manifest = serde_json::json!({
        "acKind": "ImageManifest",
        "acVersion": "0.7.0",
        "name": "example.com/app",
        "labels": labels,
    })
    .to_string();

    let mut builder = tar::Builder::new(Vec::new());
    for (path, data) in [("manifest", manifest.as_bytes()), ("rootfs/hello", b"hello world".as_slice())] {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, data).unwrap();
    }

    let path = dir.join("app.aci");
    std::fs::write(&path, builder.into_inner().unwrap()).unwrap();
    path
}

pub fn write_signature(dir: &Path) -> PathBuf {
    let path = dir.join("app.aci.asc");
    std::fs::write(&path, SIGNATURE).unwrap();
    path
}

pub const SIGNATURE: &str = "-----BEGIN PGP SIGNATURE-----\nfake\n-----END PGP SIGNATURE-----\n";
