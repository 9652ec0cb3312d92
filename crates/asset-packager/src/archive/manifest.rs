use serde::{Deserialize, Serialize};

use crate::error::{PackagerError, Result};

/// Outcome record embedded as the last entry of every package.
///
/// `failed` is always a subsequence of `requested`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    #[serde(rename = "ResourcesRequested")]
    pub requested: Vec<String>,
    #[serde(rename = "ResourcesFailed")]
    pub failed: Vec<String>,
}

impl PackageManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_requested(&mut self, path: &str) {
        self.requested.push(path.to_string());
    }

    pub fn record_failed(&mut self, path: &str) {
        self.failed.push(path.to_string());
    }

    /// Requested paths that were written to the archive, in request order.
    pub fn succeeded(&self) -> Vec<&str> {
        let mut failed = self.failed.iter().peekable();
        let mut succeeded = Vec::with_capacity(self.requested.len().saturating_sub(self.failed.len()));
        for path in &self.requested {
            if failed.peek().is_some_and(|failed_path| *failed_path == path) {
                failed.next();
            } else {
                succeeded.push(path.as_str());
            }
        }
        succeeded
    }

    /// Tab-indented JSON, `ResourcesRequested` first.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut serializer = serde_json::Serializer::with_formatter(&mut bytes, formatter);
        self.serialize(&mut serializer)
            .map_err(|error| PackagerError::Serialization(format!("package manifest: {error}")))?;
        Ok(bytes)
    }
}
