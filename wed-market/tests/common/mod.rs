#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Notify;
use wed_blob::{
    BlobAdapter, BlobConfig, BlobError, BlobInfo, BlobMetadata, BlobResult, BlobStore, ByteStream,
    MemoryBlobStore, PutResult,
};
use wed_core::{UserContext, WedError, WedResult};
use wed_docs::{DocRef, Document, DocumentStore, MemoryDocumentStore, Query};
use wed_market::{
    staging::shared_files, CandidateFile, MemoryPreviews, SharedFiles, TagAnnotator, UploadSync,
};

pub const CDN: &str = "https://cdn.example.test";

pub fn user() -> UserContext {
    UserContext::new("u1")
}

pub fn image(name: &str, modified: i64) -> CandidateFile {
    CandidateFile::new(name, "image/jpeg", modified, Bytes::from(format!("bytes of {name}")))
}

/// Blob store wrapper with switchable failures and optional gates that
/// hold `put` or `list` until released.
#[derive(Clone)]
pub struct FaultyBlobs {
    pub inner: MemoryBlobStore,
    pub fail_put: Arc<AtomicBool>,
    pub fail_delete: Arc<AtomicBool>,
    pub fail_list: Arc<AtomicBool>,
    pub put_gate: Arc<Mutex<Option<Arc<Notify>>>>,
    pub list_gate: Arc<Mutex<Option<Arc<Notify>>>>,
}

impl FaultyBlobs {
    pub fn new() -> Self {
        Self {
            inner: MemoryBlobStore::new(CDN),
            fail_put: Arc::new(AtomicBool::new(false)),
            fail_delete: Arc::new(AtomicBool::new(false)),
            fail_list: Arc::new(AtomicBool::new(false)),
            put_gate: Arc::new(Mutex::new(None)),
            list_gate: Arc::new(Mutex::new(None)),
        }
    }

    /// Hold every `put` until the returned notify fires
    pub fn gate_puts(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.put_gate.lock() = Some(gate.clone());
        gate
    }

    /// Hold every `list` until the returned notify fires
    pub fn gate_lists(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.list_gate.lock() = Some(gate.clone());
        gate
    }

    pub fn adapter(&self) -> BlobAdapter {
        BlobAdapter::new(self.clone(), BlobConfig::default())
    }
}

#[async_trait]
impl BlobStore for FaultyBlobs {
    async fn put(&self, key: &str, metadata: BlobMetadata, body: ByteStream) -> BlobResult<PutResult> {
        let gate = self.put_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(BlobError::QuotaExceeded { used: 10, limit: 10 });
        }
        self.inner.put(key, metadata, body).await
    }

    async fn download_url(&self, key: &str) -> BlobResult<String> {
        self.inner.download_url(key).await
    }

    async fn list(&self, prefix: &str) -> BlobResult<Vec<BlobInfo>> {
        let gate = self.list_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(BlobError::forbidden(prefix));
        }
        self.inner.list(prefix).await
    }

    async fn head(&self, key: &str) -> BlobResult<BlobMetadata> {
        self.inner.head(key).await
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(BlobError::forbidden(key));
        }
        self.inner.delete(key).await
    }
}

/// Document store wrapper with switchable failures and per-image query
/// gates for the tag fetch race.
#[derive(Clone, Default)]
pub struct FaultyDocs {
    pub inner: MemoryDocumentStore,
    pub fail_add: Arc<AtomicBool>,
    pub fail_query: Arc<AtomicBool>,
    pub fail_delete: Arc<AtomicBool>,
    gated_images: Arc<Mutex<HashSet<String>>>,
    gate: Arc<Notify>,
}

impl FaultyDocs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold queries filtering on `imageId == image_id` until `release`
    pub fn gate_image(&self, image_id: &str) {
        self.gated_images.lock().insert(image_id.to_string());
    }

    pub fn release(&self) {
        self.gated_images.lock().clear();
        self.gate.notify_waiters();
    }
}

#[async_trait]
impl DocumentStore for FaultyDocs {
    async fn add(&self, collection: &str, data: Value) -> WedResult<String> {
        if self.fail_add.load(Ordering::SeqCst) {
            return Err(WedError::unavailable("document store offline").into_anyhow());
        }
        self.inner.add(collection, data).await
    }

    async fn query(&self, collection: &str, query: Query) -> WedResult<Vec<Document>> {
        let gated = query.filters.iter().any(|f| {
            f.field == "imageId"
                && f.value
                    .as_str()
                    .map(|v| self.gated_images.lock().contains(v))
                    .unwrap_or(false)
        });
        if gated {
            self.gate.notified().await;
        }
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(WedError::unavailable("document store offline").into_anyhow());
        }
        self.inner.query(collection, query).await
    }

    async fn delete(&self, reference: &DocRef) -> WedResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(WedError::forbidden("delete not permitted").into_anyhow());
        }
        self.inner.delete(reference).await
    }
}

pub struct Harness {
    pub blobs: FaultyBlobs,
    pub docs: FaultyDocs,
    pub previews: MemoryPreviews,
    pub files: SharedFiles,
    pub sync: UploadSync,
    pub tags: TagAnnotator,
}

impl Harness {
    pub fn new() -> Self {
        let blobs = FaultyBlobs::new();
        let docs = FaultyDocs::new();
        let previews = MemoryPreviews::new();
        let files = shared_files(Arc::new(previews.clone()));
        let sync = UploadSync::new(blobs.adapter(), Arc::new(docs.clone()), files.clone(), "listings");
        let tags = TagAnnotator::new(Arc::new(docs.clone()), files.clone(), "tags");
        Self {
            blobs,
            docs,
            previews,
            files,
            sync,
            tags,
        }
    }

    pub fn stage(&self, candidates: Vec<CandidateFile>) -> Vec<String> {
        self.files.lock().add_candidates(candidates)
    }
}
