//! Completion of the labels discovery needs

use crate::discovery::{ARCH_LABEL, AppName, EXT_LABEL, OS_LABEL};
use crate::error::{PusherError, Result};
use crate::image::ImageManifest;

/// File extension of ACI images.
pub const ACI_EXTENSION: &str = ".aci";

/// Fills `arch`, `os` and `ext` on `app`.
///
/// Labels already on the name win. `arch` and `os` otherwise come from the
/// manifest and are required; `ext` defaults to the ACI extension.
pub fn resolve_labels(app: &mut AppName, manifest: &ImageManifest) -> Result<()> {
    for key in [ARCH_LABEL, OS_LABEL] {
        if app.labels.contains_key(key) {
            continue;
        }
        let value = manifest
            .label(key)
            .ok_or_else(|| PusherError::MissingLabel(key.to_string()))?;
        app.labels.insert(key.to_string(), value.to_string());
    }

    app.labels
        .entry(EXT_LABEL.to_string())
        .or_insert_with(|| ACI_EXTENSION.trim_matches('.').to_string());
    Ok(())
}
