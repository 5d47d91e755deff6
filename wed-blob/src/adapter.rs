use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;

use crate::{
    BlobConfig, BlobCtx, BlobError, BlobKeyStrategy, BlobMetadata, BlobPut, BlobReceipt,
    BlobResult, BlobStore, ByteStream, PhotoKeyStrategy, StoredPhoto,
};

/// The photo blob adapter - what the upload sync embeds
#[derive(Clone)]
pub struct BlobAdapter {
    store: Arc<dyn BlobStore>,
    keys: Arc<dyn BlobKeyStrategy>,
    config: BlobConfig,
}

impl BlobAdapter {
    /// Create a new blob adapter
    pub fn new<S: BlobStore + 'static>(store: S, config: BlobConfig) -> Self {
        Self::from_shared(Arc::new(store), config)
    }

    /// Create from a store that is shared with other owners
    pub fn from_shared(store: Arc<dyn BlobStore>, config: BlobConfig) -> Self {
        let keys = PhotoKeyStrategy::new(config.root_prefix.clone());
        Self {
            store,
            keys: Arc::new(keys),
            config,
        }
    }

    /// Create with custom key strategy
    pub fn with_key_strategy<K: BlobKeyStrategy + 'static>(mut self, keys: K) -> Self {
        self.keys = Arc::new(keys);
        self
    }

    /// Storage path a photo of this user would be written to
    pub fn object_key(&self, ctx: &BlobCtx, object_name: &str) -> String {
        self.keys.object_key(&ctx.user_id, object_name)
    }

    /// Store a photo and resolve its durable download URL
    pub async fn put(
        &self,
        ctx: BlobCtx,
        put: BlobPut,
        body: ByteStream,
    ) -> BlobResult<BlobReceipt> {
        if put.object_name.is_empty() || put.object_name.contains('/') {
            return Err(BlobError::invalid(format!(
                "Object name {:?} must be a single non-empty path segment",
                put.object_name
            )));
        }

        // Validate size if known
        if let Some(size) = put.size_hint {
            if size > self.config.max_blob_bytes {
                return Err(BlobError::invalid(format!(
                    "Blob size {} exceeds maximum {}",
                    size, self.config.max_blob_bytes
                )));
            }
        }

        if let Some(ct) = put.content_type.as_deref() {
            if !self.config.accepts_media_type(ct) {
                return Err(BlobError::invalid(format!("Media type {} is not accepted", ct)));
            }
        }

        let key = self.object_key(&ctx, &put.object_name);
        debug!(request_id = %ctx.request_id, key = %key, "storing photo");

        let result = self.store.put(&key, put.metadata(), body).await?;
        let url = self.store.download_url(&key).await?;

        let mut receipt = BlobReceipt::new(key, url, result.size_bytes);
        if let Some(ct) = put.content_type {
            receipt = receipt.with_content_type(ct);
        }
        if let Some(name) = put.original_name {
            receipt = receipt.with_original_name(name);
        }
        if let Some(etag) = result.etag {
            receipt = receipt.with_etag(etag);
        }

        Ok(receipt)
    }

    /// Every photo under the user's prefix, with download URL and metadata
    /// fetched concurrently per object. Order follows the store's listing.
    pub async fn list_photos(&self, ctx: &BlobCtx) -> BlobResult<Vec<StoredPhoto>> {
        let prefix = self.keys.user_prefix(&ctx.user_id);
        let objects = self.store.list(&prefix).await?;
        debug!(request_id = %ctx.request_id, prefix = %prefix, count = objects.len(), "listed photos");

        try_join_all(objects.into_iter().map(|info| {
            let store = self.store.clone();
            async move {
                let (url, metadata) =
                    futures::try_join!(store.download_url(&info.key), store.head(&info.key))?;
                Ok::<_, BlobError>(StoredPhoto {
                    name: info.name().to_string(),
                    key: info.key,
                    url,
                    metadata,
                })
            }
        }))
        .await
    }

    /// Get blob metadata
    pub async fn head(&self, key: &str) -> BlobResult<BlobMetadata> {
        self.store.head(key).await
    }

    /// Resolve the download URL of an existing blob
    pub async fn download_url(&self, key: &str) -> BlobResult<String> {
        self.store.download_url(key).await
    }

    /// Delete a blob
    pub async fn delete(&self, key: &str) -> BlobResult<()> {
        self.store.delete(key).await
    }

    /// Get configuration
    pub fn config(&self) -> &BlobConfig {
        &self.config
    }
}
