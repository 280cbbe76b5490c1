//! Runs one push from parsed command-line arguments

use crate::cli::args::Args;
use crate::config::CredentialStore;
use crate::discovery::AppName;
use crate::error::{PusherError, Result};
use crate::logging::Logger;
use crate::session::Uploader;
use std::sync::Arc;

/// Exit status for usage and push failures.
pub const EXIT_FAILURE: u8 = 1;
/// Exit status when the credential configuration cannot be loaded.
pub const EXIT_CONFIG: u8 = 2;

pub struct Runner {
    args: Args,
    logger: Logger,
}

impl Runner {
    pub fn new(args: Args) -> Self {
        let logger = Logger::new(args.debug);
        Self { args, logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub async fn run(&self) -> Result<()> {
        self.logger.section("ACI Pusher");

        let credentials = self.load_credentials()?;
        let name: AppName = self.args.name.parse()?;

        self.logger.detail(&format!("image: {}", self.args.image.display()));
        self.logger
            .detail(&format!("signature: {}", self.args.signature.display()));
        self.logger.detail(&format!("name: {}", name));

        let uploader = Uploader::builder(&self.args.image, &self.args.signature, name)
            .with_insecure(self.args.insecure)
            .with_debug(self.args.debug)
            .with_headers(Arc::new(credentials))
            .with_logger(self.logger.clone())
            .build();

        uploader.upload().await?;

        self.logger.success("Upload successful");
        self.logger.verbose(&format!(
            "push finished in {}",
            self.logger.format_duration(self.logger.elapsed())
        ));
        Ok(())
    }

    fn load_credentials(&self) -> Result<CredentialStore> {
        let system = self.args.system_conf_dir();
        let local = self.args.local_conf_dir();
        self.logger.detail(&format!(
            "loading credentials from {} and {}",
            system.display(),
            local.display()
        ));

        let store = CredentialStore::load(&system, &local).map_err(|err| match err {
            config @ PusherError::Config(_) => config,
            other => PusherError::Config(format!("error loading config: {}", other)),
        })?;
        self.logger
            .detail(&format!("credentials configured for {} host(s)", store.len()));
        Ok(store)
    }
}

/// Maps a failed run to the process exit status.
pub fn exit_code(err: &PusherError) -> u8 {
    match err {
        PusherError::Config(_) => EXIT_CONFIG,
        _ => EXIT_FAILURE,
    }
}
