use std::sync::Arc;

use crate::cache::{DisabledStorage, ListCache, MemoryStorage, SessionStorage};
use crate::config::Config;
use crate::list::ListOptions;

/// Shared settings and session cache for every list in an application.
///
/// Created once by the application root and passed to each list at mount.
/// Cloning is cheap; clones share the same cache.
#[derive(Debug, Clone)]
pub struct ListContext {
    config: Arc<Config>,
    cache: Arc<ListCache>,
}

impl ListContext {
    pub fn new(config: Config, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            config: Arc::new(config),
            cache: Arc::new(ListCache::new(storage)),
        }
    }

    /// Build the storage the config asks for: a bounded in-memory session
    /// store, or nothing at all when caching is switched off.
    pub fn from_config(config: Config) -> Self {
        let storage: Arc<dyn SessionStorage> = if config.cache {
            Arc::new(MemoryStorage::new(config.session_capacity))
        } else {
            tracing::debug!("List caching disabled by configuration");
            Arc::new(DisabledStorage)
        };
        Self::new(config, storage)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> Arc<ListCache> {
        Arc::clone(&self.cache)
    }

    /// Default options for a list named `name`.
    pub fn options(&self, name: &str) -> ListOptions {
        ListOptions::from_config(&self.config).with_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_follow_config() {
        let config = Config {
            page_size: 50,
            has_header: true,
            ..Config::default()
        };
        let context = ListContext::from_config(config);
        let options = context.options("customers");

        assert_eq!(options.page_size, 50);
        assert!(options.has_header);
        assert_eq!(options.component_key(), "infinitelistcustomers");
    }

    #[test]
    fn test_cache_disabled_by_config() {
        let config = Config {
            cache: false,
            ..Config::default()
        };
        let context = ListContext::from_config(config);
        assert!(!context.cache().is_available());
    }

    #[test]
    fn test_clones_share_cache() {
        let context = ListContext::from_config(Config::default());
        let clone = context.clone();
        assert!(Arc::ptr_eq(&context.cache(), &clone.cache()));
    }
}
