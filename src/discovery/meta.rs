//! appc meta-tag discovery of push endpoints
//!
//! Every path prefix of the app name is fetched as
//! `https://PREFIX?ac-discovery=1`, longest prefix first. Pages advertise push
//! endpoints with
//! `<meta name="ac-push-discovery" content="PREFIX URL-TEMPLATE">`.

use crate::discovery::{AppName, Discovery, FailedAttempt, NameResolver};
use crate::error::{PusherError, Result};
use crate::logging::Logger;
use async_trait::async_trait;
use regex_lite::Regex;
use reqwest::Client;
use std::sync::LazyLock;

const PUSH_META_NAME: &str = "ac-push-discovery";

static META_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\s[^>]*>").expect("meta tag pattern is valid"));

static META_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\b(name|content)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("meta attribute pattern is valid")
});

pub struct MetaDiscovery {
    logger: Logger,
}

impl MetaDiscovery {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    fn client(insecure: bool) -> Result<Client> {
        let mut builder = Client::builder();
        if insecure {
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }
        builder
            .build()
            .map_err(|e| PusherError::Discovery(format!("failed to create HTTP client: {}", e)))
    }

    async fn fetch(
        &self,
        client: &Client,
        prefix: &str,
        insecure: bool,
    ) -> std::result::Result<String, String> {
        let secure = self.fetch_page(client, "https", prefix).await;
        match secure {
            Err(err) if insecure => {
                self.logger
                    .detail(&format!("https discovery on {} failed ({}), trying http", prefix, err));
                self.fetch_page(client, "http", prefix).await
            }
            other => other,
        }
    }

    async fn fetch_page(
        &self,
        client: &Client,
        scheme: &str,
        prefix: &str,
    ) -> std::result::Result<String, String> {
        let url = format!("{}://{}?ac-discovery=1", scheme, prefix);
        self.logger.detail(&format!("fetching {}", url));

        let response = client.get(&url).send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("unexpected HTTP status {}", status));
        }
        response.text().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl NameResolver for MetaDiscovery {
    async fn discover(&self, app: &AppName, insecure: bool) -> Result<Discovery> {
        let client = Self::client(insecure)?;
        let mut discovery = Discovery::default();

        for prefix in prefixes(&app.name) {
            match self.fetch(&client, prefix, insecure).await {
                Ok(page) => {
                    let endpoints = push_endpoints(&page, app);
                    if !endpoints.is_empty() {
                        discovery.push_endpoints = endpoints;
                        break;
                    }
                    discovery.failed_attempts.push(FailedAttempt {
                        prefix: prefix.to_string(),
                        error: "no matching meta tags".to_string(),
                    });
                }
                Err(error) => discovery.failed_attempts.push(FailedAttempt {
                    prefix: prefix.to_string(),
                    error,
                }),
            }
        }

        Ok(discovery)
    }
}

/// Path prefixes of `name`, longest first.
pub fn prefixes(name: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut current = name.trim_end_matches('/');
    while !current.is_empty() {
        out.push(current);
        match current.rfind('/') {
            Some(idx) => current = &current[..idx],
            None => break,
        }
    }
    out
}

/// `(prefix, template)` pairs of every push discovery meta tag on a page.
pub fn push_meta_tags(page: &str) -> Vec<(String, String)> {
    let mut tags = Vec::new();
    for tag in META_TAG.find_iter(page) {
        let mut name = None;
        let mut content = None;
        for attr in META_ATTR.captures_iter(tag.as_str()) {
            let value = attr
                .get(2)
                .or_else(|| attr.get(3))
                .map(|m| m.as_str().to_string());
            match attr[1].to_ascii_lowercase().as_str() {
                "name" => name = value,
                "content" => content = value,
                _ => {}
            }
        }

        if name.as_deref() != Some(PUSH_META_NAME) {
            continue;
        }
        let Some(content) = content else { continue };
        let fields: Vec<&str> = content.split_whitespace().collect();
        if let [prefix, template] = fields.as_slice() {
            tags.push((prefix.to_string(), template.to_string()));
        }
    }
    tags
}

/// Substitutes `{name}` and `{LABEL}` placeholders; `None` when any remain.
pub fn render_template(template: &str, app: &AppName) -> Option<String> {
    let mut rendered = template.replace("{name}", &app.name);
    for (key, value) in &app.labels {
        rendered = rendered.replace(&format!("{{{}}}", key), value);
    }
    if rendered.contains(['{', '}']) {
        None
    } else {
        Some(rendered)
    }
}

fn push_endpoints(page: &str, app: &AppName) -> Vec<String> {
    push_meta_tags(page)
        .into_iter()
        .filter(|(prefix, _)| app.name.starts_with(prefix.as_str()))
        .filter_map(|(_, template)| render_template(&template, app))
        .collect()
}
