//! Single-part transfer

use crate::error::{PusherError, Result};
use crate::transport::{RequestBody, Transport};
use crate::upload::progress::ProgressReader;
use reqwest::{Body, Method};
use std::fmt;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// The three parts of a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Manifest,
    Signature,
    Image,
}

impl PartKind {
    pub fn label(self) -> &'static str {
        match self {
            PartKind::Manifest => "manifest",
            PartKind::Signature => "signature",
            PartKind::Image => "ACI",
        }
    }
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub enum PartSource {
    Bytes(Vec<u8>),
    File(File),
}

/// PUTs one part to `url`.
///
/// Progress is only drawn for file-backed sources, and only when asked.
pub async fn upload_part(
    transport: &Transport,
    url: &str,
    source: PartSource,
    kind: PartKind,
    show_progress: bool,
) -> Result<()> {
    transfer(transport, url, source, kind, show_progress)
        .await
        .map_err(|cause| PusherError::PartUpload {
            label: kind.label().to_string(),
            cause: Box::new(cause),
        })
}

async fn transfer(
    transport: &Transport,
    url: &str,
    source: PartSource,
    kind: PartKind,
    show_progress: bool,
) -> Result<()> {
    let body = match source {
        PartSource::Bytes(bytes) => RequestBody::Bytes(bytes),
        PartSource::File(file) if show_progress => {
            let total = file.metadata().await.ok().map(|meta| meta.len());
            let reader = ProgressReader::new(file, kind.label(), total, transport.logger().clone());
            RequestBody::Stream(Body::wrap_stream(ReaderStream::new(reader)))
        }
        PartSource::File(file) => RequestBody::Stream(Body::wrap_stream(ReaderStream::new(file))),
    };

    transport.logger().step(&format!("uploading {}", kind));
    // Only the status matters; the body is dropped unread.
    let _response = transport.execute(Method::PUT, url, body).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_reasons_name_the_part() {
        let labels: Vec<String> = [PartKind::Manifest, PartKind::Signature, PartKind::Image]
            .iter()
            .map(|kind| kind.to_string())
            .collect();
        assert_eq!(labels, vec!["manifest", "signature", "ACI"]);
    }
}
