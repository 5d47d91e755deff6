//! Typed marketplace configuration.
//!
//! Read from a [`WedConfigSnapshot`]; absent keys fall back to defaults,
//! malformed values are rejected.
//!
//! | key                         | default            |
//! |-----------------------------|--------------------|
//! | `storage.backend`           | `memory`           |
//! | `storage.bucket`            | `wedding-photos`   |
//! | `storage.region`            | `us-east-1`        |
//! | `storage.endpoint`          | unset              |
//! | `storage.access_key_id`     | empty              |
//! | `storage.secret_access_key` | empty              |
//! | `storage.public_base_url`   | `memory://photos`  |
//! | `storage.max_image_bytes`   | 25 MiB             |
//! | `storage.photos_root`       | `photos`           |
//! | `docs.listings`             | `listings`         |
//! | `docs.tags`                 | `tags`             |
//! | `gallery.size`              | `12`               |
//! | `auth.sign_in_timeout`      | `2m`               |

use std::str::FromStr;
use std::time::Duration;

use wed_auth::AuthOptions;
use wed_blob::{BlobConfig, S3Config};
use wed_core::{WedConfig, WedConfigSnapshot};

use crate::error::{MarketError, MarketResult};
use crate::records::{LISTINGS, TAGS};

pub const ENV_PREFIX: &str = "WEDMARKET__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    S3,
}

impl FromStr for StorageBackend {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "s3" => Ok(StorageBackend::S3),
            other => Err(MarketError::Config(format!(
                "storage.backend must be `memory` or `s3`, got {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MarketConfig {
    pub backend: StorageBackend,
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub public_base_url: String,
    pub max_image_bytes: u64,
    pub photos_root: String,
    pub listings_collection: String,
    pub tags_collection: String,
    pub gallery_size: usize,
    pub auth: AuthOptions,
}

impl Default for MarketConfig {
    fn default() -> Self {
        let blob = BlobConfig::default();
        Self {
            backend: StorageBackend::Memory,
            bucket: "wedding-photos".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key_id: String::new(),
            secret_access_key: String::new(),
            public_base_url: "memory://photos".to_string(),
            max_image_bytes: blob.max_blob_bytes,
            photos_root: blob.root_prefix,
            listings_collection: LISTINGS.to_string(),
            tags_collection: TAGS.to_string(),
            gallery_size: 12,
            auth: AuthOptions::default(),
        }
    }
}

impl MarketConfig {
    /// Defaults overlaid with `WEDMARKET__*` environment variables
    pub fn from_env() -> MarketResult<Self> {
        let mut config = WedConfig::new();
        config.load_env(ENV_PREFIX);
        Self::from_snapshot(&config.snapshot())
    }

    pub fn from_snapshot(snapshot: &WedConfigSnapshot) -> MarketResult<Self> {
        let defaults = Self::default();
        let text = |key: &str, default: String| snapshot.get_string(key).unwrap_or(default);

        let config = Self {
            backend: parse(snapshot, "storage.backend")?.unwrap_or(defaults.backend),
            bucket: text("storage.bucket", defaults.bucket),
            region: text("storage.region", defaults.region),
            endpoint: snapshot
                .get_string("storage.endpoint")
                .filter(|e| !e.trim().is_empty()),
            access_key_id: text("storage.access_key_id", defaults.access_key_id),
            secret_access_key: text("storage.secret_access_key", defaults.secret_access_key),
            public_base_url: text("storage.public_base_url", defaults.public_base_url),
            max_image_bytes: parse(snapshot, "storage.max_image_bytes")?
                .unwrap_or(defaults.max_image_bytes),
            photos_root: text("storage.photos_root", defaults.photos_root),
            listings_collection: text("docs.listings", defaults.listings_collection),
            tags_collection: text("docs.tags", defaults.tags_collection),
            gallery_size: parse(snapshot, "gallery.size")?.unwrap_or(defaults.gallery_size),
            auth: AuthOptions {
                sign_in_timeout: duration(snapshot, "auth.sign_in_timeout")?
                    .unwrap_or(defaults.auth.sign_in_timeout),
            },
        };

        if config.backend == StorageBackend::S3 && config.bucket.trim().is_empty() {
            return Err(MarketError::Config(
                "storage.bucket is required for the s3 backend".into(),
            ));
        }
        Ok(config)
    }

    pub fn blob_config(&self) -> BlobConfig {
        BlobConfig::new()
            .with_max_blob_bytes(self.max_image_bytes)
            .with_root_prefix(self.photos_root.clone())
    }

    pub fn s3_config(&self) -> S3Config {
        S3Config {
            bucket: self.bucket.clone(),
            region: self.region.clone(),
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
            endpoint_url: self.endpoint.clone(),
            public_base_url: self.public_base_url.clone(),
        }
    }
}

fn parse<T>(snapshot: &WedConfigSnapshot, key: &str) -> MarketResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    snapshot
        .get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| MarketError::Config(format!("{key}: {e}")))
        })
        .transpose()
}

fn duration(snapshot: &WedConfigSnapshot, key: &str) -> MarketResult<Option<Duration>> {
    snapshot
        .get(key)
        .map(|raw| {
            humantime::parse_duration(raw.trim())
                .map_err(|e| MarketError::Config(format!("{key}: {e}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pairs: &[(&str, &str)]) -> WedConfigSnapshot {
        let mut config = WedConfig::new();
        for (k, v) in pairs {
            config.set(*k, *v);
        }
        config.snapshot()
    }

    #[test]
    fn defaults_when_empty() {
        let config = MarketConfig::from_snapshot(&snapshot(&[])).unwrap();
        assert_eq!(config.backend, StorageBackend::Memory);
        assert_eq!(config.listings_collection, "listings");
        assert_eq!(config.tags_collection, "tags");
        assert_eq!(config.gallery_size, 12);
        assert_eq!(config.photos_root, "photos");
        assert_eq!(config.auth.sign_in_timeout, Duration::from_secs(120));
    }

    #[test]
    fn overrides_are_applied() {
        let config = MarketConfig::from_snapshot(&snapshot(&[
            ("storage.backend", "S3"),
            ("storage.bucket", "photos-prod"),
            ("storage.endpoint", "http://localhost:9000"),
            ("storage.max_image_bytes", "1024"),
            ("gallery.size", "6"),
            ("auth.sign_in_timeout", "45s"),
        ]))
        .unwrap();
        assert_eq!(config.backend, StorageBackend::S3);
        assert_eq!(config.s3_config().bucket, "photos-prod");
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.blob_config().max_blob_bytes, 1024);
        assert_eq!(config.gallery_size, 6);
        assert_eq!(config.auth.sign_in_timeout, Duration::from_secs(45));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = MarketConfig::from_snapshot(&snapshot(&[("gallery.size", "lots")])).unwrap_err();
        assert!(matches!(err, MarketError::Config(msg) if msg.starts_with("gallery.size")));

        let err = MarketConfig::from_snapshot(&snapshot(&[("storage.backend", "ftp")])).unwrap_err();
        assert!(matches!(err, MarketError::Config(_)));

        let err = MarketConfig::from_snapshot(&snapshot(&[("auth.sign_in_timeout", "soon")]))
            .unwrap_err();
        assert!(matches!(err, MarketError::Config(msg) if msg.starts_with("auth.sign_in_timeout")));
    }
}
