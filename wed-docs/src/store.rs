use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use wed_core::{WedError, WedResult};

use crate::Query;

/// Field sentinel replaced by the store's clock (epoch millis) on `add`.
pub fn server_timestamp() -> Value {
    json!({ "$serverTimestamp": true })
}

pub(crate) fn is_server_timestamp(v: &Value) -> bool {
    v.get("$serverTimestamp") == Some(&Value::Bool(true))
}

/// Reference to one stored document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocRef {
    pub collection: String,
    pub id: String,
}

impl DocRef {
    pub fn new<C: Into<String>, I: Into<String>>(collection: C, id: I) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

/// A stored document: its id plus the JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub reference: DocRef,
    pub data: Value,
}

impl Document {
    pub fn id(&self) -> &str {
        &self.reference.id
    }

    /// Deserialize the body into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> WedResult<T> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            WedError::unprocessable(format!(
                "document {}/{} does not match the expected shape: {}",
                self.reference.collection, self.reference.id, e
            ))
            .into_anyhow()
        })
    }
}

/// Document database operations
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a record, returning the generated document id
    async fn add(&self, collection: &str, data: Value) -> WedResult<String>;

    /// All documents of a collection matching the query
    async fn query(&self, collection: &str, query: Query) -> WedResult<Vec<Document>>;

    /// Delete one document
    async fn delete(&self, reference: &DocRef) -> WedResult<()>;
}
