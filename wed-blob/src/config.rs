/// Configuration for blob operations
#[derive(Debug, Clone)]
pub struct BlobConfig {
    /// Absolute max size allowed for a single photo (safety guard)
    pub max_blob_bytes: u64,

    /// Media type prefix a blob must carry to be accepted
    pub accepted_media_prefix: String,

    /// Top-level folder all user photos live under
    pub root_prefix: String,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            max_blob_bytes: 25 * 1024 * 1024, // 25MB
            accepted_media_prefix: "image/".to_string(),
            root_prefix: "photos".to_string(),
        }
    }
}

impl BlobConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max blob size
    pub fn with_max_blob_bytes(mut self, bytes: u64) -> Self {
        self.max_blob_bytes = bytes;
        self
    }

    /// Set the accepted media type prefix (e.g. `image/`)
    pub fn with_accepted_media_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.accepted_media_prefix = prefix.into();
        self
    }

    /// Set the top-level folder for user photos
    pub fn with_root_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.root_prefix = prefix.into();
        self
    }

    pub fn accepts_media_type(&self, content_type: &str) -> bool {
        content_type.starts_with(&self.accepted_media_prefix)
    }
}
