//! wed-docs: document store integration.
//!
//! Collections of small JSON records queried by field equality. The
//! marketplace keeps `listings` and `tags` here.

mod memory;
mod query;
mod store;

pub use memory::MemoryDocumentStore;
pub use query::{Direction, Filter, Query};
pub use store::{server_timestamp, DocRef, Document, DocumentStore};
