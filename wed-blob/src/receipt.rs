use serde::{Deserialize, Serialize};

use crate::BlobMetadata;

/// Receipt returned after successfully storing a photo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobReceipt {
    /// Full object path, e.g. `photos/{uid}/{id}`
    pub key: String,
    /// Durable download URL
    pub url: String,
    pub size_bytes: u64,
    pub content_type: Option<String>,
    pub original_name: Option<String>,
    pub etag: Option<String>,
    pub created_at: i64,
}

impl BlobReceipt {
    /// Create a new blob receipt
    pub fn new(key: String, url: String, size_bytes: u64) -> Self {
        Self {
            key,
            url,
            size_bytes,
            content_type: None,
            original_name: None,
            etag: None,
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Set content type
    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set original filename
    pub fn with_original_name<S: Into<String>>(mut self, name: S) -> Self {
        self.original_name = Some(name.into());
        self
    }

    /// Set etag
    pub fn with_etag<S: Into<String>>(mut self, etag: S) -> Self {
        self.etag = Some(etag.into());
        self
    }
}

/// An object found under a user's prefix, with its URL and metadata resolved
#[derive(Debug, Clone)]
pub struct StoredPhoto {
    pub key: String,
    /// Object name (last key segment)
    pub name: String,
    pub url: String,
    pub metadata: BlobMetadata,
}

impl StoredPhoto {
    /// Original filename if recorded, else the object name.
    pub fn display_name(&self) -> &str {
        self.metadata.original_name().unwrap_or(&self.name)
    }
}
