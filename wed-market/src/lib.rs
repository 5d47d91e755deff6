//! # wed-market: the Buy My Wedding marketplace client
//!
//! Components, leaves first:
//!
//! - [`staging`]: picked files become previewable [`StagedFile`] records
//! - [`sync`]: uploads to blob storage, listing documents, reload, delete
//! - [`tags`]: per-image item markers with stale-fetch protection
//! - [`session`]: landing vs. dashboard, driven by session notifications
//!
//! ```rust
//! use std::sync::Arc;
//! use bytes::Bytes;
//! use wed_auth::{AuthUser, MemoryIdentityProvider, SignInProvider};
//! use wed_blob::{BlobAdapter, MemoryBlobStore};
//! use wed_docs::MemoryDocumentStore;
//! use wed_market::{CandidateFile, MarketConfig, MarketServices, MemoryPreviews, SessionController, UploadState};
//!
//! # #[tokio::main]
//! # async fn main() -> wed_market::MarketResult<()> {
//! let identity = MemoryIdentityProvider::default()
//!     .with_account(SignInProvider::Google, AuthUser::new("u1"));
//! let config = MarketConfig::default();
//! let services = MarketServices::new(
//!     Arc::new(identity),
//!     BlobAdapter::new(MemoryBlobStore::default(), config.blob_config()),
//!     Arc::new(MemoryDocumentStore::new()),
//!     config,
//! );
//! let session = SessionController::new(services, Arc::new(MemoryPreviews::new()));
//!
//! let user = session.sign_in(SignInProvider::Google).await?;
//! session.apply_session(Some(user)).await?;
//!
//! let file = CandidateFile::new("arch.jpg", "image/jpeg", 1_700_000_000_000, Bytes::from_static(b"jpg"));
//! session.add_files([file])?;
//! session.upload_pending().await?;
//! assert_eq!(session.files()[0].upload_state(), UploadState::Done);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod gallery;
pub mod records;
pub mod services;
pub mod session;
pub mod staging;
pub mod sync;
pub mod tags;
pub mod telemetry;

pub use config::{MarketConfig, StorageBackend};
pub use error::{MarketError, MarketResult};
pub use gallery::{ContactForm, ContactFormError, PublicGallery};
pub use records::{ListingRecord, NewListing, TagRecord};
pub use services::MarketServices;
pub use session::{SessionController, View};
pub use staging::{
    CandidateFile, ImageUrl, MemoryPreviews, PreviewRegistry, PreviewUrl, SharedFiles,
    StagedFile, StagedFiles, UploadAttempt, UploadState,
};
pub use sync::{DeleteReport, UploadOutcome, UploadSync};
pub use tags::{Bounds, Click, ClickResult, FetchTicket, LoadOutcome, PendingMarker, TagAnnotator, TagPhase};
