use bytes::Bytes;
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::pin::Pin;
use uuid::Uuid;

/// Stream of bytes for blob content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Custom metadata key holding the filename the user picked.
///
/// Object paths are built from identity keys, so this is the only place the
/// human-readable name survives a reload.
pub const ORIGINAL_NAME_KEY: &str = "originalName";

/// Wrap an in-memory buffer as a single-chunk stream.
pub fn bytes_stream(data: Bytes) -> ByteStream {
    Box::pin(futures::stream::once(async move { Ok(data) }))
}

/// Context for blob operations (owning user, request correlation)
#[derive(Debug, Clone)]
pub struct BlobCtx {
    pub user_id: String,
    pub request_id: String,
}

impl BlobCtx {
    pub fn new<S: Into<String>>(user_id: S) -> Self {
        Self {
            user_id: user_id.into(),
            request_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_request_id(mut self, request_id: String) -> Self {
        self.request_id = request_id;
        self
    }
}

/// Request to store a photo
#[derive(Debug, Clone, Default)]
pub struct BlobPut {
    /// Identity key of the local file; becomes the object name
    pub object_name: String,
    pub content_type: Option<String>,
    pub original_name: Option<String>,
    pub size_hint: Option<u64>,
}

impl BlobPut {
    pub fn new<S: Into<String>>(object_name: S) -> Self {
        Self {
            object_name: object_name.into(),
            ..Self::default()
        }
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_original_name<S: Into<String>>(mut self, name: S) -> Self {
        self.original_name = Some(name.into());
        self
    }

    pub fn with_size_hint(mut self, size: u64) -> Self {
        self.size_hint = Some(size);
        self
    }

    /// Metadata written alongside the bytes.
    pub fn metadata(&self) -> BlobMetadata {
        let mut custom = BTreeMap::new();
        if let Some(name) = &self.original_name {
            custom.insert(ORIGINAL_NAME_KEY.to_string(), name.clone());
        }
        BlobMetadata {
            content_type: self.content_type.clone(),
            custom,
            ..BlobMetadata::default()
        }
    }
}

/// Metadata stored with a blob
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMetadata {
    pub content_type: Option<String>,
    pub size_bytes: u64,
    pub updated_at: Option<i64>,
    pub custom: BTreeMap<String, String>,
}

impl BlobMetadata {
    /// Look up a custom entry. Keys compare case-insensitively because
    /// S3-compatible backends lower-case user metadata.
    pub fn custom_value(&self, key: &str) -> Option<&str> {
        self.custom
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn original_name(&self) -> Option<&str> {
        self.custom_value(ORIGINAL_NAME_KEY)
    }
}
