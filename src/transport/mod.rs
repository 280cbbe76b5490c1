//! HTTP transport shared by every step of a push session
//!
//! All requests of a session go through [`Transport::execute`], which applies
//! one consistent policy:
//! - TLS verification is disabled when the session is insecure
//! - the [`HeaderProvider`] is consulted for the first request and again for
//!   every redirect target before it is sent
//! - redirects are followed by hand, up to [`MAX_REQUESTS`] requests in total
//! - only `200` and `400` responses are handed back; `400` carries a body the
//!   caller interprets, everything else becomes an error

pub mod auth;

pub use auth::{HeaderProvider, NoAuth, StaticHeaders};

use crate::error::{PusherError, Result};
use crate::logging::Logger;
use reqwest::header::LOCATION;
use reqwest::{Body, Client, Method, RequestBuilder, Response, StatusCode, redirect};
use std::sync::Arc;
use url::Url;

/// Requests sent for one call, the original one included.
pub const MAX_REQUESTS: usize = 10;

/// Payload of an outgoing request.
pub enum RequestBody {
    Empty,
    /// In-memory payload; resent when a 307/308 redirect asks for it.
    Bytes(Vec<u8>),
    /// One-shot streamed payload; it cannot follow a 307/308 redirect.
    Stream(Body),
}

enum PendingBody {
    Empty,
    Replayable(Vec<u8>),
    Stream(Option<Body>),
}

impl PendingBody {
    fn next(&mut self) -> Option<Body> {
        match self {
            PendingBody::Empty => None,
            PendingBody::Replayable(bytes) => Some(Body::from(bytes.clone())),
            PendingBody::Stream(body) => body.take(),
        }
    }

    fn can_replay(&self) -> bool {
        !matches!(self, PendingBody::Stream(_))
    }
}

impl From<RequestBody> for PendingBody {
    fn from(body: RequestBody) -> Self {
        match body {
            RequestBody::Empty => PendingBody::Empty,
            RequestBody::Bytes(bytes) => PendingBody::Replayable(bytes),
            RequestBody::Stream(body) => PendingBody::Stream(Some(body)),
        }
    }
}

#[derive(Clone)]
pub struct Transport {
    client: Client,
    headers: Arc<dyn HeaderProvider>,
    logger: Logger,
}

impl Transport {
    pub fn new(insecure: bool, headers: Arc<dyn HeaderProvider>, logger: Logger) -> Result<Self> {
        let mut builder = Client::builder().redirect(redirect::Policy::none());
        if insecure {
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            headers,
            logger,
        })
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Sends one logical request and returns the response when its status is
    /// `200` or `400`.
    ///
    /// The response is owned by the caller; dropping it releases the
    /// connection.
    pub async fn execute(&self, method: Method, url: &str, body: RequestBody) -> Result<Response> {
        let mut url = parse_url(url)?;
        let mut method = method;
        let mut body = PendingBody::from(body);

        for _ in 0..MAX_REQUESTS {
            let mut request = self.client.request(method.clone(), url.clone());
            request = self.with_injected_headers(request, &url);
            if let Some(payload) = body.next() {
                request = request.body(payload);
            }

            let response = request.send().await?;
            let Some(target) = redirect_target(&response, &url)? else {
                return classify(response);
            };

            match response.status() {
                StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER => {
                    if method != Method::GET && method != Method::HEAD {
                        method = Method::GET;
                    }
                    body = PendingBody::Empty;
                }
                _ => {
                    if !body.can_replay() {
                        return classify(response);
                    }
                }
            }

            self.logger
                .debug(&format!("following redirect from {} to {}", url, target));
            url = target;
        }

        Err(PusherError::TooManyRedirects)
    }

    fn with_injected_headers(&self, request: RequestBuilder, url: &Url) -> RequestBuilder {
        let host = authority(url);
        match self.headers.headers_for(&host) {
            Some(extra) => extra
                .iter()
                .fold(request, |request, (name, value)| request.header(name, value)),
            None => {
                self.logger
                    .debug(&format!("No auth present in config for domain {}.", host));
                request
            }
        }
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|source| PusherError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

/// `host` or `host:port` of a URL, the key credentials are looked up by.
///
/// URL parsing normalizes away a scheme's default port even when it is
/// written out, so `https://example.com:443/` is looked up as `example.com`.
/// Credential domains are therefore written without default ports.
pub fn authority(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

fn redirect_target(response: &Response, current: &Url) -> Result<Option<Url>> {
    if !is_redirect(response.status()) {
        return Ok(None);
    }
    let Some(location) = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
    else {
        return Ok(None);
    };

    current
        .join(location)
        .map(Some)
        .map_err(|source| PusherError::InvalidUrl {
            url: location.to_string(),
            source,
        })
}

fn classify(response: Response) -> Result<Response> {
    match response.status() {
        StatusCode::OK | StatusCode::BAD_REQUEST => Ok(response),
        other => Err(PusherError::UnexpectedStatus(other.as_u16())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_keeps_explicit_ports_only() {
        let with_port = Url::parse("http://127.0.0.1:8080/path").unwrap();
        assert_eq!(authority(&with_port), "127.0.0.1:8080");

        let default_port = Url::parse("https://example.com:443/path").unwrap();
        assert_eq!(authority(&default_port), "example.com");
    }

    #[test]
    fn stream_bodies_are_sent_once() {
        let mut body = PendingBody::from(RequestBody::Stream(Body::from("payload")));
        assert!(body.next().is_some());
        assert!(body.next().is_none());
        assert!(!body.can_replay());
    }

    #[test]
    fn byte_bodies_are_resent() {
        let mut body = PendingBody::from(RequestBody::Bytes(b"{}".to_vec()));
        assert!(body.next().is_some());
        assert!(body.next().is_some());
        assert!(body.can_replay());
    }

    #[test]
    fn malformed_urls_are_reported_with_the_input() {
        match parse_url("not a url") {
            Err(PusherError::InvalidUrl { url, .. }) => assert_eq!(url, "not a url"),
            other => panic!("unexpected result: {:?}", other.map(|u| u.to_string())),
        }
    }
}
