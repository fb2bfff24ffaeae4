//! Session-scoped persistence of list state.
//!
//! A list's whole [`ListState`] is stored as one JSON blob under a key that
//! combines the navigation location and the list's logical name:
//!
//! ```text
//! <location>:<component key>      e.g. "/customers?q=acme:infinitelistcustomers"
//! ```
//!
//! Entries have no TTL. They live until the storage is dropped (the session
//! ends) or a reset overwrites them with blank state.

mod memory;

pub use memory::{DisabledStorage, MemoryStorage};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

use crate::list::ListState;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to serialize list state: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The stored blob exists but is not valid list state.
    #[error("Corrupt cache entry '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

// ============================================================================
// Storage Contract
// ============================================================================

/// Session-scoped string key/value storage.
///
/// Implementations that can be switched off report it through
/// [`is_available`](SessionStorage::is_available); the cache then skips every
/// read and write.
pub trait SessionStorage: Send + Sync {
    fn is_available(&self) -> bool {
        true
    }

    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: String);
}

// ============================================================================
// Key Derivation
// ============================================================================

/// Prefix of every default component key.
pub const COMPONENT_KEY_PREFIX: &str = "infinitelist";

/// Default logical key of a list: the prefix followed by its id, else its name.
pub fn component_key(id: Option<&str>, name: Option<&str>) -> String {
    format!("{COMPONENT_KEY_PREFIX}{}", id.or(name).unwrap_or_default())
}

/// Full storage key for a list mounted at `location`.
pub fn cache_key(location: &str, component_key: &str) -> String {
    format!("{location}:{component_key}")
}

// ============================================================================
// List Cache
// ============================================================================

/// Reads and writes list state through a [`SessionStorage`].
///
/// Also tracks which keys are held by live lists so that two lists resolving
/// to the same key can be reported. Such lists share the entry and the last
/// one to persist wins.
pub struct ListCache {
    storage: Arc<dyn SessionStorage>,
    claims: Mutex<HashMap<String, usize>>,
}

impl ListCache {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            storage,
            claims: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.storage.is_available()
    }

    /// Load the state stored under `key`.
    ///
    /// Returns `Ok(None)` when storage is unavailable or nothing is stored.
    ///
    /// # Errors
    ///
    /// [`CacheError::Corrupt`] when the stored blob does not parse.
    pub fn read(&self, key: &str) -> Result<Option<ListState>, CacheError> {
        if !self.storage.is_available() {
            return Ok(None);
        }
        let Some(raw) = self.storage.get(key) else {
            return Ok(None);
        };
        let state = serde_json::from_str(&raw).map_err(|source| CacheError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        tracing::debug!(key = %key, bytes = raw.len(), "Restored list state from cache");
        Ok(Some(state))
    }

    /// Store `state` under `key`. A no-op when storage is unavailable.
    pub fn write(&self, key: &str, state: &ListState) -> Result<(), CacheError> {
        if !self.storage.is_available() {
            return Ok(());
        }
        let raw = serde_json::to_string(state).map_err(CacheError::Serialize)?;
        tracing::debug!(key = %key, bytes = raw.len(), "Persisted list state");
        self.storage.set(key, raw);
        Ok(())
    }

    /// Register a live list under `key`. Returns `false` (and warns) when
    /// another live list already holds it.
    pub fn claim(&self, key: &str) -> bool {
        let mut claims = self.claims.lock().unwrap_or_else(PoisonError::into_inner);
        let holders = claims.entry(key.to_string()).or_insert(0);
        *holders += 1;
        if *holders > 1 {
            tracing::warn!(
                key = %key,
                holders = *holders,
                "Cache key already held by another list; entries will be shared"
            );
            return false;
        }
        true
    }

    /// Release one claim on `key`.
    pub fn release(&self, key: &str) {
        let mut claims = self.claims.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(holders) = claims.get_mut(key) {
            *holders = holders.saturating_sub(1);
            if *holders == 0 {
                claims.remove(key);
            }
        }
    }
}

impl std::fmt::Debug for ListCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListCache")
            .field("available", &self.storage.is_available())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::Item;
    use pretty_assertions::assert_eq;

    fn memory_cache() -> ListCache {
        ListCache::new(Arc::new(MemoryStorage::new(8)))
    }

    #[test]
    fn test_component_key_prefers_id_over_name() {
        assert_eq!(component_key(Some("7"), Some("grid")), "infinitelist7");
        assert_eq!(component_key(None, Some("grid")), "infinitelistgrid");
        assert_eq!(component_key(None, None), "infinitelist");
    }

    #[test]
    fn test_cache_key_joins_location_and_component() {
        assert_eq!(
            cache_key("/customers?page=2", "infinitelistgrid"),
            "/customers?page=2:infinitelistgrid"
        );
    }

    #[test]
    fn test_read_missing_returns_none() {
        let cache = memory_cache();
        assert!(cache.read("/a:infinitelist").unwrap().is_none());
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let cache = memory_cache();
        let mut state = ListState::blank(true);
        state.items.push(Item::default().with("id", 1));
        state.records = Some(1);
        state.loaded = true;
        state.scroll_top = 120;
        state.scroll_left = 4;

        cache.write("/a:infinitelist", &state).unwrap();
        let restored = cache.read("/a:infinitelist").unwrap().unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_corrupt_entry_reported() {
        let storage = Arc::new(MemoryStorage::new(8));
        storage.set("/a:infinitelist", "{not json".to_string());
        let cache = ListCache::new(storage);

        let err = cache.read("/a:infinitelist").unwrap_err();
        assert!(matches!(err, CacheError::Corrupt { .. }));
        assert!(err.to_string().contains("/a:infinitelist"));
    }

    #[test]
    fn test_disabled_storage_degrades_silently() {
        let cache = ListCache::new(Arc::new(DisabledStorage));
        assert!(!cache.is_available());
        cache.write("/a:infinitelist", &ListState::default()).unwrap();
        assert!(cache.read("/a:infinitelist").unwrap().is_none());
    }

    #[test]
    fn test_claims_detect_collisions() {
        let cache = memory_cache();
        assert!(cache.claim("/a:infinitelistgrid"));
        assert!(!cache.claim("/a:infinitelistgrid"));
        cache.release("/a:infinitelistgrid");
        cache.release("/a:infinitelistgrid");
        assert!(cache.claim("/a:infinitelistgrid"));
    }
}
