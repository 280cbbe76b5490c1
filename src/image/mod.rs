//! ACI image handling
//!
//! The push protocol only needs one thing from an image: its manifest, both
//! to read the `arch`/`os` labels and to upload it as the first part. The
//! [`ImageReader`] trait is the seam; [`AciReader`] is the implementation for
//! tar and gzip-compressed tar images.

pub mod manifest;
pub mod parser;

pub use manifest::{ImageManifest, Label};
pub use parser::{AciReader, ImageReader};
