//! Loaded report documents

use medimind_foundation::{content_hash, ContentHash};
use medimind_provider::DocumentFormat;
use std::path::Path;
use std::sync::Arc;

use crate::error::{AssistantError, Result};

/// A report held in memory with its content hash
///
/// The hash is computed once and reused by every fingerprint that refers to
/// this document.
#[derive(Debug, Clone)]
pub struct Document {
    name: String,
    format: DocumentFormat,
    bytes: Arc<[u8]>,
    hash: ContentHash,
}

impl Document {
    pub fn new(name: impl Into<String>, format: DocumentFormat, bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            format,
            hash: content_hash(&bytes),
            bytes,
        }
    }

    /// Read a report from disk, detecting the format from its extension
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = DocumentFormat::from_path(path)?;
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            AssistantError::invalid_input(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, format, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn hash(&self) -> ContentHash {
        self.hash
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
