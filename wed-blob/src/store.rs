use async_trait::async_trait;
use crate::{BlobMetadata, BlobResult, ByteStream};

/// Core blob storage operations - must be implemented by all storage backends
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a blob from a stream together with its metadata
    async fn put(
        &self,
        key: &str,
        metadata: BlobMetadata,
        stream: ByteStream,
    ) -> BlobResult<PutResult>;

    /// Durable, publicly fetchable URL for an existing blob
    async fn download_url(&self, key: &str) -> BlobResult<String>;

    /// List objects whose key starts with `prefix`
    async fn list(&self, prefix: &str) -> BlobResult<Vec<BlobInfo>>;

    /// Get blob metadata without content
    async fn head(&self, key: &str) -> BlobResult<BlobMetadata>;

    /// Delete a blob
    async fn delete(&self, key: &str) -> BlobResult<()>;
}

/// Result of a successful put operation
#[derive(Debug, Clone)]
pub struct PutResult {
    pub etag: Option<String>,
    pub size_bytes: u64,
}

/// Entry returned by `list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobInfo {
    pub key: String,
    pub size_bytes: u64,
}

impl BlobInfo {
    /// Last path segment of the key.
    pub fn name(&self) -> &str {
        object_name(&self.key)
    }
}

/// Last path segment of an object key.
pub fn object_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Strategy for generating blob keys
pub trait BlobKeyStrategy: Send + Sync {
    /// Key for a user's object
    fn object_key(&self, user_id: &str, object_name: &str) -> String;

    /// Prefix under which all of a user's objects live
    fn user_prefix(&self, user_id: &str) -> String;
}

/// Photo layout: `{root}/{uid}/{object_name}`
#[derive(Debug, Clone)]
pub struct PhotoKeyStrategy {
    root: String,
}

impl PhotoKeyStrategy {
    pub fn new<S: Into<String>>(root: S) -> Self {
        Self { root: root.into() }
    }
}

impl Default for PhotoKeyStrategy {
    fn default() -> Self {
        Self::new("photos")
    }
}

impl BlobKeyStrategy for PhotoKeyStrategy {
    fn object_key(&self, user_id: &str, object_name: &str) -> String {
        format!("{}/{}/{}", self.root, user_id, object_name)
    }

    fn user_prefix(&self, user_id: &str) -> String {
        format!("{}/{}/", self.root, user_id)
    }
}
