//! Error handling module for the ACI pusher

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PusherError {
    #[error("error opening {label} file {}: {source}", path.display())]
    SourceOpen {
        label: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error reading image manifest: {0}")]
    ManifestExtract(String),

    #[error("manifest is missing label: {0:?}")]
    MissingLabel(String),

    #[error("invalid app name: {0}")]
    InvalidName(String),

    #[error("discovery failed: {0}")]
    Discovery(String),

    #[error("no endpoints discovered")]
    NoEndpoint,

    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("bad HTTP status code: {0}")]
    UnexpectedStatus(u16),

    #[error("error decoding server response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("error uploading {label}: {cause}")]
    PartUpload {
        label: String,
        cause: Box<PusherError>,
    },

    #[error("error reporting completion: {0}")]
    ReportTransport(Box<PusherError>),

    #[error("server rejected upload: {server_reason}")]
    ReportRejected { server_reason: String },

    #[error("{part}; additionally, reporting the failure to the server failed: {report}")]
    Combined {
        part: Box<PusherError>,
        report: Box<PusherError>,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PusherError {
    /// Wraps a failure from the completion call, keeping server rejections distinct.
    pub fn from_report(err: PusherError) -> Self {
        match err {
            rejected @ PusherError::ReportRejected { .. } => rejected,
            other => PusherError::ReportTransport(Box::new(other)),
        }
    }
}

pub type Result<T> = std::result::Result<T, PusherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_upload_message_names_part_and_cause() {
        let err = PusherError::PartUpload {
            label: "signature".to_string(),
            cause: Box::new(PusherError::UnexpectedStatus(500)),
        };
        assert_eq!(
            err.to_string(),
            "error uploading signature: bad HTTP status code: 500"
        );
    }

    #[test]
    fn combined_message_mentions_both_failures() {
        let err = PusherError::Combined {
            part: Box::new(PusherError::PartUpload {
                label: "ACI".to_string(),
                cause: Box::new(PusherError::UnexpectedStatus(502)),
            }),
            report: Box::new(PusherError::ReportTransport(Box::new(
                PusherError::UnexpectedStatus(503),
            ))),
        };
        let text = err.to_string();
        assert!(text.contains("error uploading ACI: bad HTTP status code: 502"));
        assert!(text.contains("error reporting completion: bad HTTP status code: 503"));
    }

    #[test]
    fn from_report_keeps_rejections() {
        let rejected = PusherError::from_report(PusherError::ReportRejected {
            server_reason: "nope".to_string(),
        });
        assert!(matches!(rejected, PusherError::ReportRejected { .. }));

        let wrapped = PusherError::from_report(PusherError::TooManyRedirects);
        assert!(matches!(wrapped, PusherError::ReportTransport(_)));
    }
}
