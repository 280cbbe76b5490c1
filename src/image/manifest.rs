//! ACI image manifest as far as the push protocol needs it

use crate::error::{PusherError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

/// Image manifest with its labels broken out.
///
/// Fields this tool does not look at are kept verbatim in `extra` so the
/// manifest uploaded to the server carries everything the image declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ac_kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ac_version: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ImageManifest {
    /// Value of the first label called `name`.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|label| label.name == name)
            .map(|label| label.value.as_str())
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| {
            PusherError::ManifestExtract(format!("failed to serialize manifest: {}", e))
        })
    }
}
