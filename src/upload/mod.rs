//! Protocol steps of a push session
//!
//! Each step is a free function over a shared [`Transport`]:
//! initiation, one transfer per part, and the completion report.
//!
//! [`Transport`]: crate::transport::Transport

pub mod complete;
pub mod initiate;
pub mod part;
pub mod progress;

pub use complete::{CompletionMessage, report_completion};
pub use initiate::{InitiationDetails, initiate_upload};
pub use part::{PartKind, PartSource, upload_part};
pub use progress::ProgressReader;
