//! Remote upload sync.
//!
//! Drives staged files through `idle -> uploading -> {done, error}` against
//! blob storage and mirrors a listing document for every successful upload.
//! Blob and document writes are separate calls; nothing is rolled back when
//! one of them fails.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use wed_blob::{bytes_stream, BlobAdapter, BlobCtx, BlobPut};
use wed_core::UserContext;
use wed_docs::{DocRef, DocumentStore, Query};

use crate::error::{MarketError, MarketResult};
use crate::records::NewListing;
use crate::staging::{SharedFiles, StagedFile, UploadAttempt};

/// How an upload attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Blob stored, listing written, record is `done`
    Uploaded {
        id: String,
        storage_path: String,
        url: String,
        listing_id: String,
    },
    /// The record was removed while its upload was in flight; the remote
    /// copies were cleaned up
    Discarded { id: String },
}

/// What a deletion removed remotely
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteReport {
    /// False when the blob was already gone
    pub blob_removed: bool,
    pub listings_removed: usize,
}

#[derive(Clone)]
pub struct UploadSync {
    blobs: BlobAdapter,
    docs: Arc<dyn DocumentStore>,
    files: SharedFiles,
    listings: String,
}

impl UploadSync {
    pub fn new(
        blobs: BlobAdapter,
        docs: Arc<dyn DocumentStore>,
        files: SharedFiles,
        listings: impl Into<String>,
    ) -> Self {
        Self {
            blobs,
            docs,
            files,
            listings: listings.into(),
        }
    }

    /// Upload one idle staged file for `user`.
    pub async fn upload(&self, user: &UserContext, id: &str) -> MarketResult<UploadOutcome> {
        let (UploadAttempt { attempt, payload }, name, content_type) = {
            let mut files = self.files.lock();
            let file = files
                .get_mut(id)
                .ok_or_else(|| MarketError::UnknownFile(id.to_string()))?;
            let started = file.begin_upload()?;
            (started, file.name.clone(), file.content_type.clone())
        };

        let mut put = BlobPut::new(id)
            .with_original_name(name.clone())
            .with_size_hint(payload.len() as u64);
        if let Some(ct) = content_type {
            put = put.with_content_type(ct);
        }

        let ctx = BlobCtx::new(user.uid());
        let receipt = match self.blobs.put(ctx, put, bytes_stream(payload)).await {
            Ok(receipt) => receipt,
            Err(source) => {
                error!(id = %id, user_id = %user.uid(), error = %source, "upload failed");
                self.mark_failed(id, attempt);
                return Err(MarketError::Upload {
                    id: id.to_string(),
                    source,
                });
            }
        };

        // Swap the preview for the durable URL, releasing the preview first.
        // A record staged again under the same id is not ours.
        let still_staged = {
            let mut files = self.files.lock();
            match files.attempt_mut(id, attempt) {
                Some(file) => {
                    let superseded = file.attach_remote(receipt.url.clone(), receipt.key.clone());
                    if let Some(preview) = superseded {
                        files.release_preview(&preview);
                    }
                    true
                }
                None => false,
            }
        };
        if !still_staged {
            info!(id = %id, key = %receipt.key, "file removed during upload, discarding blob");
            self.discard_blob(id, &receipt.key).await;
            return Ok(UploadOutcome::Discarded { id: id.to_string() });
        }

        let listing = NewListing {
            url: receipt.url.clone(),
            storage_path: receipt.key.clone(),
            name,
            user_id: user.uid().to_string(),
        };
        let listing_id = match self.docs.add(&self.listings, listing.to_document()).await {
            Ok(listing_id) => listing_id,
            Err(source) => {
                error!(id = %id, key = %receipt.key, error = %source, "listing write failed");
                self.mark_failed(id, attempt);
                return Err(MarketError::write("listing", source));
            }
        };

        let finished = {
            let mut files = self.files.lock();
            match files.attempt_mut(id, attempt) {
                Some(file) => {
                    file.mark_done()?;
                    true
                }
                None => false,
            }
        };
        if !finished {
            info!(id = %id, key = %receipt.key, "file removed during listing write, discarding");
            let reference = DocRef::new(self.listings.clone(), listing_id);
            if let Err(e) = self.docs.delete(&reference).await {
                warn!(listing = %reference.id, error = %e, "could not remove orphaned listing");
            }
            self.discard_blob(id, &receipt.key).await;
            return Ok(UploadOutcome::Discarded { id: id.to_string() });
        }

        info!(id = %id, key = %receipt.key, "upload complete");
        Ok(UploadOutcome::Uploaded {
            id: id.to_string(),
            storage_path: receipt.key,
            url: receipt.url,
            listing_id,
        })
    }

    /// Start every idle file concurrently. Results come back in staging order.
    pub async fn upload_pending(
        &self,
        user: &UserContext,
    ) -> Vec<(String, MarketResult<UploadOutcome>)> {
        let ids = self.files.lock().idle_ids();
        let uploads = ids.iter().map(|id| self.upload(user, id));
        ids.iter().cloned().zip(join_all(uploads).await).collect()
    }

    /// Rebuild `done` records for everything under the user's storage prefix.
    /// Order follows the store's listing.
    pub async fn rehydrate(&self, user: &UserContext) -> MarketResult<Vec<StagedFile>> {
        let photos = self
            .blobs
            .list_photos(&BlobCtx::new(user.uid()))
            .await
            .map_err(|e| MarketError::fetch("stored photos", e))?;

        Ok(photos
            .into_iter()
            .map(|photo| {
                StagedFile::from_remote(
                    photo.name.clone(),
                    photo.display_name(),
                    photo.url.clone(),
                    photo.key.clone(),
                )
            })
            .collect())
    }

    /// Merge the user's stored photos into the staged collection. On failure
    /// the current collection is left as is.
    pub async fn reload(&self, user: &UserContext) -> MarketResult<usize> {
        match self.rehydrate(user).await {
            Ok(files) => {
                let added = self.files.lock().merge_remote(files);
                debug!(user_id = %user.uid(), added, "reloaded stored photos");
                Ok(added)
            }
            Err(e) => {
                warn!(user_id = %user.uid(), error = %e, "reload failed, keeping current files");
                Err(e)
            }
        }
    }

    /// Delete the blob at `storage_path` and every listing pointing at it.
    pub async fn delete(&self, storage_path: &str) -> MarketResult<DeleteReport> {
        let mut report = DeleteReport {
            blob_removed: false,
            listings_removed: 0,
        };

        let blob_error = match self.blobs.delete(storage_path).await {
            Ok(()) => {
                report.blob_removed = true;
                None
            }
            Err(e) if e.is_not_found() => None,
            Err(e) => Some(e.to_string()),
        };

        let listing_error = match self.remove_listings(storage_path).await {
            Ok(count) => {
                report.listings_removed = count;
                None
            }
            Err((count, e)) => {
                report.listings_removed = count;
                Some(e.to_string())
            }
        };

        if blob_error.is_some() || listing_error.is_some() {
            error!(
                storage_path = %storage_path,
                blob_error = ?blob_error,
                listing_error = ?listing_error,
                "delete left remote state inconsistent"
            );
            return Err(MarketError::PartialDelete {
                storage_path: storage_path.to_string(),
                blob_error,
                listing_error,
            });
        }

        info!(storage_path = %storage_path, listings = report.listings_removed, "deleted photo");
        Ok(report)
    }

    async fn remove_listings(&self, storage_path: &str) -> Result<usize, (usize, anyhow::Error)> {
        let matches = self
            .docs
            .query(
                &self.listings,
                Query::new().where_eq("storagePath", storage_path),
            )
            .await
            .map_err(|e| (0, e))?;

        let mut removed = 0;
        for doc in matches {
            self.docs
                .delete(&doc.reference)
                .await
                .map_err(|e| (removed, e))?;
            removed += 1;
        }
        Ok(removed)
    }

    async fn discard_blob(&self, id: &str, key: &str) {
        // A newer record under the same id may already own the object.
        let claimed = self
            .files
            .lock()
            .get(id)
            .is_some_and(|f| f.storage_path() == Some(key));
        if claimed {
            debug!(id = %id, key = %key, "blob now belongs to a newer record, keeping it");
            return;
        }
        if let Err(e) = self.blobs.delete(key).await {
            if !e.is_not_found() {
                warn!(key = %key, error = %e, "could not remove discarded blob");
            }
        }
    }

    fn mark_failed(&self, id: &str, attempt: Uuid) {
        if let Some(file) = self.files.lock().attempt_mut(id, attempt) {
            if let Err(e) = file.mark_failed() {
                warn!(id = %id, error = %e, "could not flag upload failure");
            }
        }
    }
}
