//! # Configuration
//!
//! A minimal string key/value store. Typed views (see `MarketConfig` in
//! `wed-market`) read from a `WedConfigSnapshot` so the store itself stays
//! format-agnostic.
//!
//! ```rust
//! use wed_core::WedConfig;
//!
//! let mut config = WedConfig::new();
//! config.set("storage.bucket", "wedding-photos");
//! config.set("gallery.size", "12");
//!
//! let snapshot = config.snapshot();
//! assert_eq!(snapshot.get("storage.bucket"), Some("wedding-photos"));
//! assert_eq!(snapshot.get_usize("gallery.size"), Some(12));
//! ```
//!
//! ## Environment overrides
//!
//! `load_env` maps prefixed variables onto dotted keys:
//!
//! ```bash
//! export WEDMARKET__STORAGE__BUCKET=wedding-photos   # storage.bucket
//! ```

use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct WedConfig {
    values: HashMap<String, String>,
}

impl WedConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Check whether a key is present.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Overlay variables named `{prefix}SECTION__KEY` as `section.key`.
    pub fn load_env(&mut self, prefix: &str) {
        self.load_vars(prefix, std::env::vars());
    }

    /// Same as `load_env`, over an explicit set of variables.
    pub fn load_vars<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                if !normalized.is_empty() {
                    self.set(normalized, value);
                }
            }
        }
    }

    pub fn snapshot(&self) -> WedConfigSnapshot {
        WedConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct WedConfigSnapshot {
    map: HashMap<String, String>,
}

impl WedConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.parse::<u64>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.parse::<bool>().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_vars_become_dotted_keys() {
        let mut config = WedConfig::new();
        config.load_vars(
            "WEDMARKET__",
            vec![
                ("WEDMARKET__STORAGE__BUCKET".to_string(), "photos-bucket".to_string()),
                ("WEDMARKET__GALLERY__SIZE".to_string(), "6".to_string()),
                ("HOME".to_string(), "/root".to_string()),
                ("WEDMARKET__".to_string(), "ignored".to_string()),
            ],
        );

        assert_eq!(config.get("storage.bucket"), Some("photos-bucket"));
        assert_eq!(config.snapshot().get_usize("gallery.size"), Some(6));
        assert!(!config.has("home"));
        assert!(!config.has(""));
    }

    #[test]
    fn snapshot_is_detached_from_later_writes() {
        let mut config = WedConfig::new();
        config.set("storage.backend", "memory");
        let snapshot = config.snapshot();
        config.set("storage.backend", "s3");

        assert_eq!(snapshot.get("storage.backend"), Some("memory"));
        assert_eq!(snapshot.get_bool("storage.backend"), None);
    }
}
