//! Resource data caching.
//!
//! Cached values are property-map snapshots, partitioned into named regions
//! (one per resource type by default) and keyed by canonical URI string:
//!
//! - [`Cache`] / [`CacheManager`]: the storage seam
//! - [`DefaultCacheManager`]: concurrent in-memory regions with TTL/TTI expiry
//! - [`DisabledCacheManager`]: a null object whose caches store nothing
//! - [`CacheResolver`]: type-aware access used by the cache filters
//!
//! # Example
//!
//! ```rust
//! use idm_sdk::cache::{cache_manager_for, CacheManager};
//! use idm_sdk::CacheSettings;
//! use serde_json::json;
//!
//! let manager = cache_manager_for(&CacheSettings::default());
//! let accounts = manager.cache("Account");
//!
//! let entry = json!({"href": "https://api.example.com/v1/accounts/1", "email": "a@b.c"});
//! accounts.put("https://api.example.com/v1/accounts/1", entry.as_object().unwrap().clone());
//! assert!(accounts.get("https://api.example.com/v1/accounts/1").is_some());
//! ```

mod memory;

use std::fmt;
use std::sync::Arc;

pub use memory::{DefaultCache, DefaultCacheManager, DisabledCache, DisabledCacheManager};

use crate::config::CacheSettings;
use crate::ds::{PropertyMap, ResourceType};

/// A named cache region.
pub trait Cache: Send + Sync {
    /// Returns the region name.
    fn name(&self) -> &str;

    /// Returns the live value stored under `key`.
    fn get(&self, key: &str) -> Option<PropertyMap>;

    /// Stores `value` under `key`, returning the previous value.
    fn put(&self, key: &str, value: PropertyMap) -> Option<PropertyMap>;

    /// Removes and returns the value stored under `key`.
    fn remove(&self, key: &str) -> Option<PropertyMap>;
}

/// Provides cache regions by name.
pub trait CacheManager: Send + Sync {
    /// Returns the region called `name`, creating it if needed.
    fn cache(&self, name: &str) -> Arc<dyn Cache>;
}

/// Returns the cache manager matching `settings`.
#[must_use]
pub fn cache_manager_for(settings: &CacheSettings) -> Arc<dyn CacheManager> {
    if settings.is_enabled() {
        Arc::new(DefaultCacheManager::from_settings(settings))
    } else {
        Arc::new(DisabledCacheManager)
    }
}

/// Maps resource types to cache region names.
pub trait CacheRegionNameResolver: Send + Sync {
    /// Returns the region holding entries of `resource_type`.
    fn region_name(&self, resource_type: &ResourceType) -> String;
}

/// Uses the resource type's public name as region name.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultCacheRegionNameResolver;

impl CacheRegionNameResolver for DefaultCacheRegionNameResolver {
    fn region_name(&self, resource_type: &ResourceType) -> String {
        resource_type.name().to_string()
    }
}

/// Type-aware cache access.
#[derive(Clone)]
pub struct CacheResolver {
    manager: Arc<dyn CacheManager>,
    regions: Arc<dyn CacheRegionNameResolver>,
}

impl CacheResolver {
    /// Creates a resolver over `manager` using the default region names.
    #[must_use]
    pub fn new(manager: Arc<dyn CacheManager>) -> Self {
        Self::with_region_names(manager, Arc::new(DefaultCacheRegionNameResolver))
    }

    /// Creates a resolver with custom region names.
    #[must_use]
    pub fn with_region_names(
        manager: Arc<dyn CacheManager>,
        regions: Arc<dyn CacheRegionNameResolver>,
    ) -> Self {
        Self { manager, regions }
    }

    /// Returns the region for `resource_type`.
    #[must_use]
    pub fn cache_for(&self, resource_type: &ResourceType) -> Arc<dyn Cache> {
        self.manager.cache(&self.regions.region_name(resource_type))
    }

    /// Reads a cached entry.
    #[must_use]
    pub fn get(&self, resource_type: &ResourceType, key: &str) -> Option<PropertyMap> {
        let hit = self.cache_for(resource_type).get(key);
        tracing::trace!(
            region = resource_type.name(),
            key,
            hit = hit.is_some(),
            "Cache lookup"
        );
        hit
    }

    /// Writes a cache entry.
    pub fn put(&self, resource_type: &ResourceType, key: &str, value: PropertyMap) {
        tracing::trace!(region = resource_type.name(), key, "Cache put");
        self.cache_for(resource_type).put(key, value);
    }

    /// Removes a cache entry.
    pub fn evict(&self, resource_type: &ResourceType, key: &str) {
        tracing::trace!(region = resource_type.name(), key, "Cache evict");
        self.cache_for(resource_type).remove(key);
    }
}

impl fmt::Debug for CacheResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static WIDGET: ResourceType = ResourceType::instance("Widget");

    struct Prefixed;

    impl CacheRegionNameResolver for Prefixed {
        fn region_name(&self, resource_type: &ResourceType) -> String {
            format!("app.{}", resource_type.name())
        }
    }

    fn entry() -> PropertyMap {
        json!({"href": "w/1", "name": "w"}).as_object().unwrap().clone()
    }

    #[test]
    fn test_resolver_uses_type_name_as_region() {
        let manager = Arc::new(DefaultCacheManager::from_settings(&CacheSettings::default()));
        let resolver = CacheResolver::new(manager.clone());

        resolver.put(&WIDGET, "w/1", entry());
        assert!(manager.cache("Widget").get("w/1").is_some());

        resolver.evict(&WIDGET, "w/1");
        assert!(resolver.get(&WIDGET, "w/1").is_none());
    }

    #[test]
    fn test_custom_region_names() {
        let manager = Arc::new(DefaultCacheManager::from_settings(&CacheSettings::default()));
        let resolver = CacheResolver::with_region_names(manager.clone(), Arc::new(Prefixed));

        resolver.put(&WIDGET, "w/1", entry());
        assert!(manager.cache("app.Widget").get("w/1").is_some());
        assert!(manager.cache("Widget").get("w/1").is_none());
    }

    #[test]
    fn test_disabled_settings_store_nothing() {
        let resolver = CacheResolver::new(cache_manager_for(&CacheSettings::disabled()));
        resolver.put(&WIDGET, "w/1", entry());
        assert!(resolver.get(&WIDGET, "w/1").is_none());
    }
}
