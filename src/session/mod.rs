//! Push session orchestration
//!
//! A push runs as a fixed sequence of states:
//!
//! ```text
//! Init -> LabelResolving -> Discovering -> Initiating
//!      -> UploadingManifest -> UploadingSignature -> UploadingImage
//!      -> ReportingCompletion -> Done
//! ```
//!
//! Any state past `Init` may end in `Failed`. Until initiation succeeds there
//! is no completion URL, so earlier failures are returned as they are. After
//! it, every outcome is reported to the server exactly once.

pub mod labels;

pub use labels::resolve_labels;

use crate::discovery::{AppName, MetaDiscovery, NameResolver, discover_endpoint};
use crate::error::{PusherError, Result};
use crate::image::{AciReader, ImageReader};
use crate::logging::Logger;
use crate::transport::{HeaderProvider, NoAuth, Transport};
use crate::upload::{
    CompletionMessage, InitiationDetails, PartKind, PartSource, initiate_upload,
    report_completion, upload_part,
};
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    LabelResolving,
    Discovering,
    Initiating,
    UploadingManifest,
    UploadingSignature,
    UploadingImage,
    ReportingCompletion,
    Done,
    Failed,
}

impl SessionState {
    fn uploading(kind: PartKind) -> Self {
        match kind {
            PartKind::Manifest => SessionState::UploadingManifest,
            PartKind::Signature => SessionState::UploadingSignature,
            PartKind::Image => SessionState::UploadingImage,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Done | SessionState::Failed)
    }
}

/// Everything needed to push one image and its signature.
pub struct Uploader {
    image_path: PathBuf,
    signature_path: PathBuf,
    name: AppName,
    insecure: bool,
    debug: bool,
    headers: Arc<dyn HeaderProvider>,
    resolver: Arc<dyn NameResolver>,
    image_reader: Arc<dyn ImageReader>,
    logger: Logger,
}

pub struct UploaderBuilder {
    image_path: PathBuf,
    signature_path: PathBuf,
    name: AppName,
    insecure: bool,
    debug: bool,
    headers: Option<Arc<dyn HeaderProvider>>,
    resolver: Option<Arc<dyn NameResolver>>,
    image_reader: Option<Arc<dyn ImageReader>>,
    logger: Option<Logger>,
}

impl UploaderBuilder {
    pub fn new(image_path: impl Into<PathBuf>, signature_path: impl Into<PathBuf>, name: AppName) -> Self {
        Self {
            image_path: image_path.into(),
            signature_path: signature_path.into(),
            name,
            insecure: false,
            debug: false,
            headers: None,
            resolver: None,
            image_reader: None,
            logger: None,
        }
    }

    /// Skips TLS verification and lets discovery fall back to plain HTTP.
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_headers(mut self, headers: Arc<dyn HeaderProvider>) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn NameResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_image_reader(mut self, image_reader: Arc<dyn ImageReader>) -> Self {
        self.image_reader = Some(image_reader);
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> Uploader {
        let logger = self.logger.unwrap_or_else(|| Logger::new(self.debug));
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(MetaDiscovery::new(logger.clone())));

        Uploader {
            image_path: self.image_path,
            signature_path: self.signature_path,
            name: self.name,
            insecure: self.insecure,
            debug: self.debug,
            headers: self.headers.unwrap_or_else(|| Arc::new(NoAuth)),
            resolver,
            image_reader: self.image_reader.unwrap_or_else(|| Arc::new(AciReader::new())),
            logger,
        }
    }
}

impl Uploader {
    pub fn builder(
        image_path: impl Into<PathBuf>,
        signature_path: impl Into<PathBuf>,
        name: AppName,
    ) -> UploaderBuilder {
        UploaderBuilder::new(image_path, signature_path, name)
    }

    /// Runs one complete push session.
    pub async fn upload(&self) -> Result<()> {
        self.start()?.run().await
    }

    /// Creates a fresh session without running it.
    pub fn start(&self) -> Result<PushSession<'_>> {
        let transport = Transport::new(self.insecure, self.headers.clone(), self.logger.clone())?;
        Ok(PushSession {
            uploader: self,
            transport,
            name: self.name.clone(),
            state: SessionState::Init,
            initiation: None,
        })
    }
}

/// State of one push in progress. Lives for a single [`Uploader::upload`].
pub struct PushSession<'a> {
    uploader: &'a Uploader,
    transport: Transport,
    name: AppName,
    state: SessionState,
    initiation: Option<InitiationDetails>,
}

impl PushSession<'_> {
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Target name with the labels resolved so far.
    pub fn name(&self) -> &AppName {
        &self.name
    }

    pub fn initiation(&self) -> Option<&InitiationDetails> {
        self.initiation.as_ref()
    }

    pub async fn run(&mut self) -> Result<()> {
        let result = self.drive().await;
        match &result {
            Ok(()) => self.enter(SessionState::Done),
            Err(err) => {
                self.enter(SessionState::Failed);
                self.uploader.logger.debug(&format!("push failed: {}", err));
            }
        }
        result
    }

    async fn drive(&mut self) -> Result<()> {
        let uploader = self.uploader;
        let logger = &uploader.logger;

        self.enter(SessionState::LabelResolving);
        let mut image = open_source("image", &uploader.image_path)?;
        let signature = open_source("signature", &uploader.signature_path)?;
        let manifest = uploader.image_reader.extract_manifest(&mut image)?;
        // The manifest read may have moved the cursor.
        image.seek(SeekFrom::Start(0)).map_err(|e| {
            PusherError::ManifestExtract(format!("failed to rewind image: {}", e))
        })?;
        let manifest_json = manifest.to_json()?;
        resolve_labels(&mut self.name, &manifest)?;
        logger.detail(&format!("resolved name: {}", self.name));

        self.enter(SessionState::Discovering);
        let endpoint = discover_endpoint(
            uploader.resolver.as_ref(),
            &self.name,
            uploader.insecure,
            logger,
        )
        .await?;

        self.enter(SessionState::Initiating);
        let details = initiate_upload(&self.transport, &endpoint).await?;
        self.initiation = Some(details.clone());

        let parts = [
            (
                PartKind::Manifest,
                details.manifest_url.as_str(),
                PartSource::Bytes(manifest_json),
            ),
            (
                PartKind::Signature,
                details.signature_url.as_str(),
                PartSource::File(tokio::fs::File::from_std(signature)),
            ),
            (
                PartKind::Image,
                details.image_url.as_str(),
                PartSource::File(tokio::fs::File::from_std(image)),
            ),
        ];

        for (kind, url, source) in parts {
            self.enter(SessionState::uploading(kind));
            let show_progress = uploader.debug && kind != PartKind::Manifest;
            if let Err(part_error) =
                upload_part(&self.transport, url, source, kind, show_progress).await
            {
                return Err(self.report_failure(&details.completed_url, part_error).await);
            }
        }

        self.enter(SessionState::ReportingCompletion);
        report_completion(
            &self.transport,
            &details.completed_url,
            &CompletionMessage::success(),
        )
        .await
        .map_err(PusherError::from_report)
    }

    /// Tells the server a part failed and returns the error to surface.
    async fn report_failure(&mut self, completed_url: &str, part_error: PusherError) -> PusherError {
        self.enter(SessionState::ReportingCompletion);
        let message = CompletionMessage::failure(part_error.to_string());
        match report_completion(&self.transport, completed_url, &message).await {
            Ok(()) => part_error,
            Err(report_error) => PusherError::Combined {
                part: Box::new(part_error),
                report: Box::new(PusherError::from_report(report_error)),
            },
        }
    }

    fn enter(&mut self, next: SessionState) {
        self.uploader
            .logger
            .debug(&format!("session state {:?} -> {:?}", self.state, next));
        self.state = next;
    }
}

fn open_source(label: &'static str, path: &Path) -> Result<File> {
    File::open(path).map_err(|source| PusherError::SourceOpen {
        label,
        path: path.to_path_buf(),
        source,
    })
}
