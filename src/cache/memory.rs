use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use super::SessionStorage;

/// In-process session storage bounded to a fixed number of entries.
///
/// Least recently used entries are evicted first, so lists the user has not
/// visited for a while are the ones that lose their cached state.
pub struct MemoryStorage {
    entries: Mutex<LruCache<String, String>>,
}

impl MemoryStorage {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((evicted, _)) = entries.push(key.to_string(), value) {
            if evicted != key {
                tracing::debug!(key = %evicted, "Evicted least recently used list state");
            }
        }
    }
}

/// Storage that is switched off: reads miss and writes are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledStorage;

impl SessionStorage for DisabledStorage {
    fn is_available(&self) -> bool {
        false
    }

    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: String) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let storage = MemoryStorage::new(4);
        storage.set("a", "1".to_string());
        assert_eq!(storage.get("a").as_deref(), Some("1"));
        assert_eq!(storage.get("b"), None);
    }

    #[test]
    fn test_overwrite_keeps_single_entry() {
        let storage = MemoryStorage::new(4);
        storage.set("a", "1".to_string());
        storage.set("a", "2".to_string());
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.get("a").as_deref(), Some("2"));
    }

    #[test]
    fn test_least_recently_used_evicted() {
        let storage = MemoryStorage::new(2);
        storage.set("a", "1".to_string());
        storage.set("b", "2".to_string());
        // Touch "a" so "b" becomes the eviction candidate
        assert!(storage.get("a").is_some());
        storage.set("c", "3".to_string());

        assert!(storage.get("a").is_some());
        assert!(storage.get("b").is_none());
        assert!(storage.get("c").is_some());
    }

    #[test]
    fn test_zero_capacity_holds_one_entry() {
        let storage = MemoryStorage::new(0);
        storage.set("a", "1".to_string());
        storage.set("b", "2".to_string());
        assert_eq!(storage.len(), 1);
        assert!(storage.get("b").is_some());
    }

    #[test]
    fn test_disabled_storage_drops_writes() {
        let storage = DisabledStorage;
        storage.set("a", "1".to_string());
        assert!(!storage.is_available());
        assert!(storage.get("a").is_none());
    }
}
