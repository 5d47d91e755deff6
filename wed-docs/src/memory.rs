use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;
use wed_core::{bail_wed, WedResult};

use crate::query::compare_fields;
use crate::store::is_server_timestamp;
use crate::{Direction, DocRef, Document, DocumentStore, Query};

/// In-memory document store for testing and development.
///
/// Collections keep insertion order, which is also the order of unsorted
/// query results.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<RwLock<HashMap<String, Vec<Document>>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    /// Insert with a caller-chosen id, bypassing timestamp resolution
    pub fn insert_raw(&self, collection: &str, id: &str, data: Value) {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .push(Document {
                reference: DocRef::new(collection, id),
                data,
            });
    }

    fn resolve_timestamps(mut data: Value) -> Value {
        if let Value::Object(map) = &mut data {
            let now = chrono::Utc::now().timestamp_millis();
            for value in map.values_mut() {
                if is_server_timestamp(value) {
                    *value = Value::from(now);
                }
            }
        }
        data
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn add(&self, collection: &str, data: Value) -> WedResult<String> {
        if !data.is_object() {
            bail_wed!(bad_request, "documents in {} must be JSON objects", collection);
        }

        let id = Uuid::new_v4().simple().to_string();
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .push(Document {
                reference: DocRef::new(collection, id.clone()),
                data: Self::resolve_timestamps(data),
            });
        Ok(id)
    }

    async fn query(&self, collection: &str, query: Query) -> WedResult<Vec<Document>> {
        let mut docs: Vec<Document> = self
            .collections
            .read()
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| query.matches(&d.data))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some((field, direction)) = &query.order_by {
            docs.sort_by(|a, b| {
                let ord = compare_fields(a.data.get(field), b.data.get(field));
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            docs.truncate(limit);
        }
        Ok(docs)
    }

    async fn delete(&self, reference: &DocRef) -> WedResult<()> {
        let mut collections = self.collections.write();
        let Some(docs) = collections.get_mut(&reference.collection) else {
            bail_wed!(not_found, "no document {}/{}", reference.collection, reference.id);
        };
        let before = docs.len();
        docs.retain(|d| d.reference.id != reference.id);
        if docs.len() == before {
            bail_wed!(not_found, "no document {}/{}", reference.collection, reference.id);
        }
        Ok(())
    }
}
