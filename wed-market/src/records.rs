// Documents kept in the `listings` and `tags` collections.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use wed_docs::server_timestamp;

use crate::error::{MarketError, MarketResult};

pub const LISTINGS: &str = "listings";
pub const TAGS: &str = "tags";

/// A publicly listed uploaded photo, as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub url: String,
    pub storage_path: String,
    pub name: String,
    pub user_id: String,
    /// Server clock, epoch millis
    pub uploaded_at: i64,
}

/// Listing fields the client supplies; `uploadedAt` is assigned by the store
#[derive(Debug, Clone)]
pub struct NewListing {
    pub url: String,
    pub storage_path: String,
    pub name: String,
    pub user_id: String,
}

impl NewListing {
    pub fn to_document(&self) -> Value {
        serde_json::json!({
            "url": self.url,
            "storagePath": self.storage_path,
            "name": self.name,
            "userId": self.user_id,
            "uploadedAt": server_timestamp(),
        })
    }
}

/// One annotation marker on an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRecord {
    /// Document id, not part of the stored body
    #[serde(skip)]
    pub id: String,
    /// Pixel offset from the rendered image box at tagging time
    pub x: f64,
    pub y: f64,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    pub user_id: String,
    /// Owning staged file id (also the storage object name)
    pub image_id: String,
}

impl TagRecord {
    pub fn to_document(&self) -> MarketResult<Value> {
        serde_json::to_value(self).map_err(|e| MarketError::write("tag", e))
    }
}
