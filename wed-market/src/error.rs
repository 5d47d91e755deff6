use thiserror::Error;
use wed_blob::BlobError;

use crate::staging::UploadState;

/// Result type for marketplace operations
pub type MarketResult<T> = Result<T, MarketError>;

/// Failures surfaced by the marketplace components.
///
/// Callers at the view boundary log these and, where a state flag exists,
/// reflect them in it (`UploadState::Error`); nothing is retried.
#[derive(Error, Debug)]
pub enum MarketError {
    /// Sign-in or sign-out rejected by the identity provider
    #[error("Authentication failed: {source}")]
    Auth {
        #[source]
        source: anyhow::Error,
    },

    /// Blob write failed (network, permission, quota)
    #[error("Upload of {id} failed: {source}")]
    Upload {
        id: String,
        #[source]
        source: BlobError,
    },

    /// Listing reload or tag query failed
    #[error("Could not fetch {what}: {source}")]
    Fetch {
        what: String,
        #[source]
        source: anyhow::Error,
    },

    /// A document write (listing or tag) failed
    #[error("Could not save {what}: {source}")]
    Write {
        what: String,
        #[source]
        source: anyhow::Error,
    },

    /// One side of a blob + listing deletion failed; nothing is rolled back
    #[error("Delete of {storage_path} left remote state inconsistent (blob: {blob_error:?}, listings: {listing_error:?})")]
    PartialDelete {
        storage_path: String,
        blob_error: Option<String>,
        listing_error: Option<String>,
    },

    #[error("Upload state cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: UploadState, to: UploadState },

    #[error("No user is signed in")]
    NotSignedIn,

    #[error("No staged file with id {0}")]
    UnknownFile(String),

    #[error("File {id} cannot be selected while {state:?}")]
    NotSelectable { id: String, state: UploadState },

    #[error("No image is selected")]
    NoSelection,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MarketError {
    pub fn fetch(what: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Fetch {
            what: what.into(),
            source: source.into(),
        }
    }

    pub fn write(what: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Write {
            what: what.into(),
            source: source.into(),
        }
    }
}
