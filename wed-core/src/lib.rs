//! wed-core: shared building blocks for the marketplace crates.

pub mod config;
pub mod context;
pub mod errors;

pub use config::{WedConfig, WedConfigSnapshot};
pub use context::{UserContext, UserId};
pub use errors::{ErrorKind, WedError, WedResult};
