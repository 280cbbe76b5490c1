//! Terminal success/failure report

use crate::error::{PusherError, Result};
use crate::transport::{RequestBody, Transport};
use reqwest::Method;
use serde::{Deserialize, Serialize};

/// Sent as the final report and decoded from the server's acknowledgment.
///
/// Outbound messages fill `success` and `reason`; the server answers with
/// `success` and, when it refuses, `server_reason`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMessage {
    pub success: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server_reason: String,
}

impl CompletionMessage {
    pub fn success() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: reason.into(),
            ..Self::default()
        }
    }
}

/// POSTs `message` to the completion URL and checks the acknowledgment.
pub async fn report_completion(
    transport: &Transport,
    url: &str,
    message: &CompletionMessage,
) -> Result<()> {
    let payload = serde_json::to_vec(message)?;
    let response = transport
        .execute(Method::POST, url, RequestBody::Bytes(payload))
        .await?;
    let body = response.bytes().await?;
    let reply: CompletionMessage = serde_json::from_slice(&body)?;

    if !reply.success {
        return Err(PusherError::ReportRejected {
            server_reason: reply.server_reason,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_omits_empty_reasons() {
        let json = serde_json::to_string(&CompletionMessage::success()).unwrap();
        assert_eq!(json, r#"{"success":true}"#);
    }

    #[test]
    fn failure_carries_reason() {
        let json =
            serde_json::to_string(&CompletionMessage::failure("error uploading ACI: boom")).unwrap();
        assert_eq!(json, r#"{"success":false,"reason":"error uploading ACI: boom"}"#);
    }

    #[test]
    fn server_reply_decodes_server_reason() {
        let reply: CompletionMessage =
            serde_json::from_str(r#"{"success":false,"server_reason":"quota exceeded"}"#).unwrap();
        assert!(!reply.success);
        assert_eq!(reply.server_reason, "quota exceeded");
        assert!(reply.reason.is_empty());
    }
}
