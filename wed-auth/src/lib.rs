//! wed-auth: identity provider integration.
//!
//! The provider owns sign-in, sign-out and session notifications; callers
//! only see `AuthUser` values.

pub mod memory;
pub mod options;
pub mod provider;

pub use memory::*;
pub use options::*;
pub use provider::*;
