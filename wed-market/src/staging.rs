//! Local file staging.
//!
//! Candidate files become [`StagedFile`] records with a local preview before
//! any network activity. The staged collection is the single owner of the
//! previews; removing a record releases its preview, never a remote URL.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{MarketError, MarketResult};

/// A file offered by a picker, camera capture or drop event
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    pub size: u64,
    /// Last modification time, epoch millis
    pub last_modified: i64,
    pub media_type: String,
    pub bytes: Bytes,
}

impl CandidateFile {
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        last_modified: i64,
        bytes: Bytes,
    ) -> Self {
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            last_modified,
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Deduplication key. Two distinct files sharing name, size and
    /// modification time collide.
    pub fn identity_key(&self) -> String {
        format!("{}-{}-{}", self.name, self.size, self.last_modified)
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

/// Handle to a memory-backed local preview
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreviewUrl(pub String);

impl PreviewUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Where a staged file's image can be fetched from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageUrl {
    Preview(PreviewUrl),
    Remote(String),
}

impl ImageUrl {
    pub fn as_str(&self) -> &str {
        match self {
            ImageUrl::Preview(p) => p.as_str(),
            ImageUrl::Remote(u) => u,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, ImageUrl::Remote(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadState {
    Idle,
    Uploading,
    Done,
    Error,
}

impl UploadState {
    /// Checked forward transition: `idle -> uploading -> {done, error}`
    pub fn advance(self, to: UploadState) -> MarketResult<UploadState> {
        use UploadState::*;
        match (self, to) {
            (Idle, Uploading) | (Uploading, Done) | (Uploading, Error) => Ok(to),
            (from, to) => Err(MarketError::InvalidTransition { from, to }),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, UploadState::Done | UploadState::Error)
    }
}

/// Creates and releases local preview references
pub trait PreviewRegistry: Send + Sync {
    fn create(&self, file: &CandidateFile) -> PreviewUrl;
    fn revoke(&self, url: &PreviewUrl);
}

/// Preview registry that hands out `blob:` style handles and tracks which
/// are still live.
#[derive(Clone, Default)]
pub struct MemoryPreviews {
    live: Arc<RwLock<HashSet<PreviewUrl>>>,
}

impl MemoryPreviews {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_live(&self, url: &PreviewUrl) -> bool {
        self.live.read().contains(url)
    }

    pub fn live_count(&self) -> usize {
        self.live.read().len()
    }
}

impl PreviewRegistry for MemoryPreviews {
    fn create(&self, _file: &CandidateFile) -> PreviewUrl {
        let url = PreviewUrl(format!("blob:local/{}", Uuid::new_v4()));
        self.live.write().insert(url.clone());
        url
    }

    fn revoke(&self, url: &PreviewUrl) {
        self.live.write().remove(url);
    }
}

/// A photo the user has added, before and after durable upload
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub id: String,
    pub name: String,
    url: ImageUrl,
    storage_path: Option<String>,
    upload_state: UploadState,
    pub content_type: Option<String>,
    payload: Option<Bytes>,
    attempt: Option<Uuid>,
}

/// Bytes to send for one upload attempt, tagged so the completion can tell
/// this record from a later one staged under the same id.
#[derive(Debug, Clone)]
pub struct UploadAttempt {
    pub attempt: Uuid,
    pub payload: Bytes,
}

impl StagedFile {
    fn staged(file: CandidateFile, preview: PreviewUrl) -> Self {
        Self {
            id: file.identity_key(),
            name: file.name,
            url: ImageUrl::Preview(preview),
            storage_path: None,
            upload_state: UploadState::Idle,
            content_type: Some(file.media_type),
            payload: Some(file.bytes),
            attempt: None,
        }
    }

    /// A record rebuilt from remote storage, already `done`
    pub fn from_remote(
        id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        storage_path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: ImageUrl::Remote(url.into()),
            storage_path: Some(storage_path.into()),
            upload_state: UploadState::Done,
            content_type: None,
            payload: None,
            attempt: None,
        }
    }

    pub fn url(&self) -> &ImageUrl {
        &self.url
    }

    pub fn storage_path(&self) -> Option<&str> {
        self.storage_path.as_deref()
    }

    pub fn upload_state(&self) -> UploadState {
        self.upload_state
    }

    pub fn preview(&self) -> Option<&PreviewUrl> {
        match &self.url {
            ImageUrl::Preview(p) => Some(p),
            ImageUrl::Remote(_) => None,
        }
    }

    /// Enter `uploading` and hand over the bytes to send
    pub fn begin_upload(&mut self) -> MarketResult<UploadAttempt> {
        self.upload_state = self.upload_state.advance(UploadState::Uploading)?;
        let attempt = Uuid::new_v4();
        self.attempt = Some(attempt);
        Ok(UploadAttempt {
            attempt,
            payload: self.payload.take().unwrap_or_default(),
        })
    }

    /// True if this record started the given upload attempt
    pub fn is_attempt(&self, attempt: Uuid) -> bool {
        self.attempt == Some(attempt)
    }

    /// Swap in the durable URL and set the storage path. Returns the
    /// superseded preview, which the caller must release.
    pub fn attach_remote(
        &mut self,
        url: impl Into<String>,
        storage_path: impl Into<String>,
    ) -> Option<PreviewUrl> {
        if self.storage_path.is_none() {
            self.storage_path = Some(storage_path.into());
        }
        match std::mem::replace(&mut self.url, ImageUrl::Remote(url.into())) {
            ImageUrl::Preview(p) => Some(p),
            ImageUrl::Remote(_) => None,
        }
    }

    pub fn mark_done(&mut self) -> MarketResult<()> {
        self.upload_state = self.upload_state.advance(UploadState::Done)?;
        Ok(())
    }

    pub fn mark_failed(&mut self) -> MarketResult<()> {
        self.upload_state = self.upload_state.advance(UploadState::Error)?;
        Ok(())
    }
}

/// The ordered staged collection
pub struct StagedFiles {
    files: Vec<StagedFile>,
    previews: Arc<dyn PreviewRegistry>,
}

impl StagedFiles {
    pub fn new(previews: Arc<dyn PreviewRegistry>) -> Self {
        Self {
            files: Vec::new(),
            previews,
        }
    }

    /// Stage the image candidates whose identity key is not present yet.
    /// Returns the ids that were accepted, in order.
    pub fn add_candidates<I>(&mut self, candidates: I) -> Vec<String>
    where
        I: IntoIterator<Item = CandidateFile>,
    {
        let mut seen: HashSet<String> = self.files.iter().map(|f| f.id.clone()).collect();
        let mut accepted = Vec::new();

        for file in candidates {
            if !file.is_image() {
                debug!(name = %file.name, media_type = %file.media_type, "skipping non-image file");
                continue;
            }
            let key = file.identity_key();
            if !seen.insert(key.clone()) {
                debug!(id = %key, "file already staged");
                continue;
            }
            let preview = self.previews.create(&file);
            self.files.push(StagedFile::staged(file, preview));
            accepted.push(key);
        }
        accepted
    }

    /// Remove a record, releasing its preview if it still has one
    pub fn remove(&mut self, id: &str) -> Option<StagedFile> {
        let index = self.files.iter().position(|f| f.id == id)?;
        let file = self.files.remove(index);
        if let Some(preview) = file.preview() {
            self.previews.revoke(preview);
        }
        Some(file)
    }

    /// Add rehydrated records whose id is not already staged
    pub fn merge_remote<I>(&mut self, files: I) -> usize
    where
        I: IntoIterator<Item = StagedFile>,
    {
        let mut added = 0;
        for file in files {
            if self.contains(&file.id) {
                continue;
            }
            self.files.push(file);
            added += 1;
        }
        added
    }

    /// Drop everything, releasing all live previews
    pub fn clear(&mut self) {
        for file in self.files.drain(..) {
            if let Some(preview) = file.preview() {
                self.previews.revoke(preview);
            }
        }
    }

    pub fn release_preview(&self, preview: &PreviewUrl) {
        self.previews.revoke(preview);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.files.iter().any(|f| f.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&StagedFile> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut StagedFile> {
        self.files.iter_mut().find(|f| f.id == id)
    }

    /// The record that started `attempt`. A record removed and staged again
    /// under the same id does not match.
    pub fn attempt_mut(&mut self, id: &str, attempt: Uuid) -> Option<&mut StagedFile> {
        self.get_mut(id).filter(|f| f.is_attempt(attempt))
    }

    pub fn iter(&self) -> impl Iterator<Item = &StagedFile> {
        self.files.iter()
    }

    /// Ids still waiting for an upload
    pub fn idle_ids(&self) -> Vec<String> {
        self.files
            .iter()
            .filter(|f| f.upload_state == UploadState::Idle)
            .map(|f| f.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Staged collection shared between the components. The lock is never held
/// across an await point.
pub type SharedFiles = Arc<Mutex<StagedFiles>>;

pub fn shared_files(previews: Arc<dyn PreviewRegistry>) -> SharedFiles {
    Arc::new(Mutex::new(StagedFiles::new(previews)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str, modified: i64) -> CandidateFile {
        CandidateFile::new(name, "image/png", modified, Bytes::from_static(b"\x89PNG"))
    }

    #[test]
    fn identity_key_joins_name_size_and_mtime() {
        assert_eq!(png("veil.png", 1700).identity_key(), "veil.png-4-1700");
    }

    #[test]
    fn only_forward_transitions_are_allowed() {
        use UploadState::*;
        assert_eq!(Idle.advance(Uploading).unwrap(), Uploading);
        assert_eq!(Uploading.advance(Done).unwrap(), Done);
        assert_eq!(Uploading.advance(Error).unwrap(), Error);

        for (from, to) in [
            (Idle, Done),
            (Idle, Error),
            (Idle, Idle),
            (Done, Idle),
            (Done, Uploading),
            (Error, Uploading),
            (Error, Done),
            (Uploading, Idle),
        ] {
            assert!(matches!(
                from.advance(to),
                Err(MarketError::InvalidTransition { .. })
            ));
        }
    }

    #[test]
    fn attach_remote_keeps_first_storage_path() {
        let previews = Arc::new(MemoryPreviews::new());
        let mut files = StagedFiles::new(previews);
        files.add_candidates([png("a.png", 1)]);
        let file = files.get_mut("a.png-4-1").unwrap();

        let old = file.attach_remote("https://cdn/one", "photos/u1/a.png-4-1");
        assert!(old.is_some());
        assert!(file.attach_remote("https://cdn/two", "photos/u1/other").is_none());
        assert_eq!(file.storage_path(), Some("photos/u1/a.png-4-1"));
        assert_eq!(file.url().as_str(), "https://cdn/two");
    }

    #[test]
    fn begin_upload_takes_payload_once() {
        let previews = Arc::new(MemoryPreviews::new());
        let mut files = StagedFiles::new(previews);
        files.add_candidates([png("a.png", 1)]);
        let file = files.get_mut("a.png-4-1").unwrap();

        let attempt = file.begin_upload().unwrap();
        assert_eq!(attempt.payload.len(), 4);
        assert!(file.is_attempt(attempt.attempt));
        assert!(file.begin_upload().is_err());
    }

    #[test]
    fn restaged_record_does_not_match_old_attempt() {
        let previews = Arc::new(MemoryPreviews::new());
        let mut files = StagedFiles::new(previews);
        files.add_candidates([png("a.png", 1)]);
        let old = files.get_mut("a.png-4-1").unwrap().begin_upload().unwrap();

        files.remove("a.png-4-1");
        files.add_candidates([png("a.png", 1)]);
        assert!(files.attempt_mut("a.png-4-1", old.attempt).is_none());
        assert!(files.get("a.png-4-1").is_some());
    }
}
