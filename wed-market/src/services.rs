// Process-wide platform clients, handed to components explicitly.

use std::sync::Arc;

use tracing::info;
use wed_auth::IdentityProvider;
use wed_blob::{BlobAdapter, MemoryBlobStore, S3CompatibleStore};
use wed_docs::{DocumentStore, MemoryDocumentStore};

use crate::config::{MarketConfig, StorageBackend};

/// Identity, blob and document handles shared by every component
#[derive(Clone)]
pub struct MarketServices {
    pub identity: Arc<dyn IdentityProvider>,
    pub blobs: BlobAdapter,
    pub docs: Arc<dyn DocumentStore>,
    pub config: Arc<MarketConfig>,
}

impl MarketServices {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        blobs: BlobAdapter,
        docs: Arc<dyn DocumentStore>,
        config: MarketConfig,
    ) -> Self {
        Self {
            identity,
            blobs,
            docs,
            config: Arc::new(config),
        }
    }

    /// Build the blob backend selected by `config`. Documents stay in
    /// process memory.
    pub async fn connect(config: MarketConfig, identity: Arc<dyn IdentityProvider>) -> Self {
        let blobs = match config.backend {
            StorageBackend::Memory => BlobAdapter::new(
                MemoryBlobStore::new(config.public_base_url.clone()),
                config.blob_config(),
            ),
            StorageBackend::S3 => BlobAdapter::new(
                S3CompatibleStore::connect(config.s3_config()).await,
                config.blob_config(),
            ),
        };
        info!(backend = ?config.backend, "marketplace services ready");

        Self::new(identity, blobs, Arc::new(MemoryDocumentStore::new()), config)
    }
}
