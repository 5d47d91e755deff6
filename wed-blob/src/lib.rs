//! # wed-blob: photo storage for the marketplace
//!
//! Stores user photos under `photos/{uid}/{id}`, keeps the picked filename
//! as out-of-band metadata, and hands back durable download URLs.
//!
//! ```rust
//! use wed_blob::prelude::*;
//! use wed_blob::{bytes_stream, MemoryBlobStore};
//!
//! # #[tokio::main]
//! # async fn main() -> BlobResult<()> {
//! let adapter = BlobAdapter::new(MemoryBlobStore::default(), BlobConfig::default());
//! let ctx = BlobCtx::new("u1");
//!
//! let put = BlobPut::new("veil.png-512-1700000000000")
//!     .with_content_type("image/png")
//!     .with_original_name("veil.png");
//! let receipt = adapter.put(ctx.clone(), put, bytes_stream("png".into())).await?;
//! assert_eq!(receipt.key, "photos/u1/veil.png-512-1700000000000");
//!
//! let photos = adapter.list_photos(&ctx).await?;
//! assert_eq!(photos[0].display_name(), "veil.png");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   Upload sync   │  ← staged-file lifecycle
//! ├─────────────────┤
//! │   BlobAdapter   │  ← keys, validation, URL + metadata resolution
//! ├─────────────────┤
//! │   BlobStore     │  ← storage primitives (memory, S3-compatible)
//! └─────────────────┘
//! ```

pub mod adapter;
mod config;
mod error;
mod memory_store;
mod receipt;
mod s3_store;
pub mod store;
mod types;

pub use adapter::BlobAdapter;
pub use config::BlobConfig;
pub use error::{BlobError, BlobResult};
pub use memory_store::MemoryBlobStore;
pub use receipt::{BlobReceipt, StoredPhoto};
pub use s3_store::{S3CompatibleStore, S3Config};
pub use store::{object_name, BlobInfo, BlobKeyStrategy, BlobStore, PhotoKeyStrategy, PutResult};
pub use types::{bytes_stream, BlobCtx, BlobMetadata, BlobPut, ByteStream, ORIGINAL_NAME_KEY};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BlobAdapter, BlobConfig, BlobCtx, BlobError, BlobPut, BlobReceipt, BlobResult, BlobStore,
        ByteStream,
    };
}
