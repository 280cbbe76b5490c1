//! Upload initiation against a discovered push endpoint

use crate::error::Result;
use crate::transport::{RequestBody, Transport};
use reqwest::Method;
use serde::{Deserialize, Serialize};

/// Per-session URLs handed out by the server when an upload is initiated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiationDetails {
    #[serde(rename = "aci_push_version", default)]
    pub protocol_version: String,
    /// Advisory only; parts are always sent whole.
    #[serde(default)]
    pub multipart: bool,
    #[serde(rename = "upload_manifest_url")]
    pub manifest_url: String,
    #[serde(rename = "upload_signature_url")]
    pub signature_url: String,
    #[serde(rename = "upload_aci_url")]
    pub image_url: String,
    pub completed_url: String,
}

/// POSTs an empty body to `endpoint` and decodes the upload URLs.
pub async fn initiate_upload(transport: &Transport, endpoint: &str) -> Result<InitiationDetails> {
    let logger = transport.logger();
    logger.debug("initiating upload");

    let response = transport
        .execute(Method::POST, endpoint, RequestBody::Empty)
        .await?;
    let body = response.bytes().await?;
    let details: InitiationDetails = serde_json::from_slice(&body)?;

    logger.debug("upload initiated");
    logger.detail(&format!(" - manifest endpoint: {}", details.manifest_url));
    logger.detail(&format!(" - signature endpoint: {}", details.signature_url));
    logger.detail(&format!(" - aci endpoint: {}", details.image_url));

    Ok(details)
}
