//! Command-line argument parsing

use crate::cli::runner::EXIT_FAILURE;
use crate::config::{DEFAULT_LOCAL_CONFIG_DIR, DEFAULT_SYSTEM_CONFIG_DIR};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "aci-pusher")]
#[command(about = "A utility for pushing ACI files to remote servers")]
#[command(version)]
pub struct Args {
    /// Path to the ACI image
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,

    /// Path to the detached signature of the image
    #[arg(value_name = "SIGNATURE")]
    pub signature: PathBuf,

    /// App name used for discovery
    #[arg(
        value_name = "NAME",
        help = "App name used for discovery, e.g. example.com/app:1.0.0,os=linux"
    )]
    pub name: String,

    /// Debug output
    #[arg(long = "debug", help = "Enables debug messages")]
    pub debug: bool,

    /// Skip TLS verification
    #[arg(long = "insecure", help = "Permits unencrypted traffic")]
    pub insecure: bool,

    #[arg(
        long = "system-conf",
        value_name = "DIR",
        help = "Directory for system configuration [default: /usr/lib/rkt]"
    )]
    pub system_conf: Option<PathBuf>,

    #[arg(
        long = "local-conf",
        value_name = "DIR",
        help = "Directory for local configuration [default: /etc/rkt]"
    )]
    pub local_conf: Option<PathBuf>,
}

impl Args {
    /// Parses the process arguments.
    ///
    /// On failure clap's message has already been printed and the error holds
    /// the exit status to use.
    pub fn parse_args() -> Result<Self, u8> {
        Args::try_parse().map_err(|err| {
            let _ = err.print();
            usage_exit_code(&err)
        })
    }

    /// Fills options not given on the command line from the environment.
    pub fn from_env(mut self) -> Self {
        if std::env::var("ACI_PUSHER_DEBUG").is_ok() {
            self.debug = true;
        }

        if std::env::var("ACI_PUSHER_INSECURE").is_ok() {
            self.insecure = true;
        }

        if self.system_conf.is_none() {
            self.system_conf = std::env::var_os("ACI_PUSHER_SYSTEM_CONF").map(PathBuf::from);
        }

        if self.local_conf.is_none() {
            self.local_conf = std::env::var_os("ACI_PUSHER_LOCAL_CONF").map(PathBuf::from);
        }

        self
    }

    pub fn system_conf_dir(&self) -> PathBuf {
        self.system_conf
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SYSTEM_CONFIG_DIR))
    }

    pub fn local_conf_dir(&self) -> PathBuf {
        self.local_conf
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCAL_CONFIG_DIR))
    }
}

/// Exit status for a command line clap refused. `--help` and `--version`
/// exit cleanly; usage errors share the push failure status.
pub fn usage_exit_code(err: &clap::Error) -> u8 {
    if err.exit_code() == 0 { 0 } else { EXIT_FAILURE }
}
