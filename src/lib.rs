//! ACI Pusher Library
//!
//! Pushes a signed ACI image to a server found through appc meta discovery,
//! using the initiate / upload parts / complete protocol. The entry point is
//! [`Uploader`]; the modules below hold the individual steps and the
//! collaborators they are built on.

pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod image;
pub mod logging;
pub mod session;
pub mod transport;
pub mod upload;

pub use config::CredentialStore;
pub use discovery::AppName;
pub use error::{PusherError, Result};
pub use logging::Logger;
pub use session::{SessionState, Uploader};
