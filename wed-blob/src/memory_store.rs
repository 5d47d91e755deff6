use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use parking_lot::RwLock;

use crate::{BlobError, BlobInfo, BlobMetadata, BlobResult, BlobStore, ByteStream, PutResult};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    metadata: BlobMetadata,
}

/// In-memory store for tests and local development
#[derive(Clone)]
pub struct MemoryBlobStore {
    objects: Arc<RwLock<BTreeMap<String, StoredObject>>>,
    public_base_url: String,
    quota_bytes: Option<u64>,
}

impl MemoryBlobStore {
    pub fn new<S: Into<String>>(public_base_url: S) -> Self {
        Self {
            objects: Arc::new(RwLock::new(BTreeMap::new())),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            quota_bytes: None,
        }
    }

    /// Reject writes that would push the total stored size past `bytes`
    pub fn with_quota(mut self, bytes: u64) -> Self {
        self.quota_bytes = Some(bytes);
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Raw bytes of a stored object
    pub fn bytes(&self, key: &str) -> Option<Bytes> {
        self.objects.read().get(key).map(|o| o.data.clone())
    }

    fn used_bytes_excluding(&self, key: &str) -> u64 {
        self.objects
            .read()
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, o)| o.data.len() as u64)
            .sum()
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new("memory://photos")
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        key: &str,
        mut metadata: BlobMetadata,
        mut stream: ByteStream,
    ) -> BlobResult<PutResult> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        let data = buf.freeze();

        if let Some(limit) = self.quota_bytes {
            let used = self.used_bytes_excluding(key) + data.len() as u64;
            if used > limit {
                return Err(BlobError::QuotaExceeded { used, limit });
            }
        }

        let size_bytes = data.len() as u64;
        metadata.size_bytes = size_bytes;
        metadata.updated_at = Some(chrono::Utc::now().timestamp_millis());

        self.objects
            .write()
            .insert(key.to_string(), StoredObject { data, metadata });

        Ok(PutResult {
            etag: Some(format!("{:x}", size_bytes)),
            size_bytes,
        })
    }

    async fn download_url(&self, key: &str) -> BlobResult<String> {
        if !self.contains(key) {
            return Err(BlobError::not_found(key));
        }
        Ok(format!("{}/{}", self.public_base_url, key))
    }

    async fn list(&self, prefix: &str) -> BlobResult<Vec<BlobInfo>> {
        Ok(self
            .objects
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, o)| BlobInfo {
                key: k.clone(),
                size_bytes: o.data.len() as u64,
            })
            .collect())
    }

    async fn head(&self, key: &str) -> BlobResult<BlobMetadata> {
        self.objects
            .read()
            .get(key)
            .map(|o| o.metadata.clone())
            .ok_or_else(|| BlobError::not_found(key))
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        self.objects
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| BlobError::not_found(key))
    }
}
