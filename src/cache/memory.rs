//! In-memory cache regions.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::cache::{Cache, CacheManager};
use crate::config::{CacheSettings, RegionTimeouts};
use crate::ds::PropertyMap;

#[derive(Debug)]
struct Entry {
    value: PropertyMap,
    created: Instant,
    last_accessed: Instant,
}

impl Entry {
    fn new(value: PropertyMap, now: Instant) -> Self {
        Self {
            value,
            created: now,
            last_accessed: now,
        }
    }

    fn is_expired(&self, timeouts: &RegionTimeouts, now: Instant) -> bool {
        let outlived = timeouts
            .time_to_live
            .map_or(false, |ttl| now.saturating_duration_since(self.created) > ttl);
        let idled = timeouts
            .time_to_idle
            .map_or(false, |tti| now.saturating_duration_since(self.last_accessed) > tti);
        outlived || idled
    }
}

/// A concurrent cache region with time-to-live and time-to-idle expiry.
///
/// An expired entry is dropped when it is next read. Writes also sweep the
/// whole region, at most once per sweep interval, so keys that are never read
/// again are reclaimed too. The sweep interval is the shorter of the two
/// timeouts; a region with neither never expires anything.
#[derive(Debug)]
pub struct DefaultCache {
    name: String,
    timeouts: RegionTimeouts,
    entries: DashMap<String, Entry>,
    last_sweep: Mutex<Option<Instant>>,
}

impl DefaultCache {
    /// Creates an empty region.
    #[must_use]
    pub fn new(name: impl Into<String>, timeouts: RegionTimeouts) -> Self {
        Self {
            name: name.into(),
            timeouts,
            entries: DashMap::new(),
            last_sweep: Mutex::new(None),
        }
    }

    /// Returns the region's expiration policy.
    #[must_use]
    pub const fn timeouts(&self) -> RegionTimeouts {
        self.timeouts
    }

    /// Returns the number of stored entries, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the region stores nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<PropertyMap> {
        self.entries
            .remove_if(key, |_, entry| entry.is_expired(&self.timeouts, now));

        let mut entry = self.entries.get_mut(key)?;
        entry.last_accessed = now;
        Some(entry.value.clone())
    }

    fn put_at(&self, key: &str, value: PropertyMap, now: Instant) -> Option<PropertyMap> {
        self.sweep_if_due(now);
        self.entries
            .insert(key.to_string(), Entry::new(value, now))
            .map(|previous| previous.value)
    }

    fn sweep_interval(&self) -> Option<Duration> {
        match (self.timeouts.time_to_live, self.timeouts.time_to_idle) {
            (Some(ttl), Some(tti)) => Some(ttl.min(tti)),
            (ttl, tti) => ttl.or(tti),
        }
    }

    fn sweep_if_due(&self, now: Instant) {
        let Some(interval) = self.sweep_interval() else {
            return;
        };
        {
            let mut last_sweep = self.last_sweep.lock();
            match *last_sweep {
                Some(last) if now.saturating_duration_since(last) < interval => return,
                Some(_) => *last_sweep = Some(now),
                None => {
                    *last_sweep = Some(now);
                    return;
                }
            }
        }

        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.is_expired(&self.timeouts, now));
        tracing::trace!(
            region = %self.name,
            swept = before.saturating_sub(self.entries.len()),
            "Swept expired cache entries"
        );
    }
}

impl Cache for DefaultCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<PropertyMap> {
        self.get_at(key, Instant::now())
    }

    fn put(&self, key: &str, value: PropertyMap) -> Option<PropertyMap> {
        self.put_at(key, value, Instant::now())
    }

    fn remove(&self, key: &str) -> Option<PropertyMap> {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }
}

/// Creates [`DefaultCache`] regions on demand.
#[derive(Debug)]
pub struct DefaultCacheManager {
    settings: CacheSettings,
    regions: DashMap<String, Arc<DefaultCache>>,
}

// Verify DefaultCacheManager is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultCacheManager>();
};

impl DefaultCacheManager {
    /// Creates a manager whose regions follow `settings`.
    #[must_use]
    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self {
            settings: settings.clone(),
            regions: DashMap::new(),
        }
    }

    /// Returns the concrete region called `name`, creating it if needed.
    #[must_use]
    pub fn region(&self, name: &str) -> Arc<DefaultCache> {
        self.regions
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(region = name, "Creating cache region");
                Arc::new(DefaultCache::new(name, self.settings.timeouts_for(name)))
            })
            .clone()
    }
}

impl Default for DefaultCacheManager {
    fn default() -> Self {
        Self::from_settings(&CacheSettings::default())
    }
}

impl CacheManager for DefaultCacheManager {
    fn cache(&self, name: &str) -> Arc<dyn Cache> {
        self.region(name)
    }
}

/// A region that stores nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledCache;

impl Cache for DisabledCache {
    fn name(&self) -> &str {
        "disabled"
    }

    fn get(&self, _key: &str) -> Option<PropertyMap> {
        None
    }

    fn put(&self, _key: &str, _value: PropertyMap) -> Option<PropertyMap> {
        None
    }

    fn remove(&self, _key: &str) -> Option<PropertyMap> {
        None
    }
}

/// A manager whose every region is a [`DisabledCache`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledCacheManager;

impl CacheManager for DisabledCacheManager {
    fn cache(&self, _name: &str) -> Arc<dyn Cache> {
        Arc::new(DisabledCache)
    }
}
