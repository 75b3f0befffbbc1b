//! Identity map.
//!
//! An [`Enlistment`] is the single shared property map for one href. The
//! [`EnlistmentRegistry`] guarantees that at most one live enlistment exists
//! per href: enlisting fresh data for an href that is already enlisted replaces
//! the existing map's contents in place, so every holder observes the update.
//!
//! The registry holds weak references. An enlistment lives as long as some
//! resource instance holds it; once the last holder is dropped the next load of
//! that href transparently creates a new one. Dead entries are pruned when the
//! registry grows past its configured capacity, and after that only once it
//! has doubled past the live size left by the previous prune.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use idm_sdk::ds::EnlistmentRegistry;
//! use serde_json::json;
//!
//! let registry = EnlistmentRegistry::new(64);
//! let props = |name: &str| json!({"href": "h", "name": name}).as_object().unwrap().clone();
//!
//! let first = registry.enlist("h", props("a"));
//! let second = registry.enlist("h", props("b"));
//!
//! assert!(Arc::ptr_eq(&first, &second));
//! assert_eq!(first.get("name"), Some(json!("b")));
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;

use crate::ds::resource::PropertyMap;

/// A lock-guarded property map shared by every instance of one href.
///
/// Reads take the read lock and mutations the write lock, so a reader never
/// observes a partially replaced map.
#[derive(Debug)]
pub struct Enlistment {
    href: String,
    properties: RwLock<PropertyMap>,
}

impl Enlistment {
    /// Creates an enlistment holding `properties`.
    #[must_use]
    pub fn new(href: impl Into<String>, properties: PropertyMap) -> Self {
        Self {
            href: href.into(),
            properties: RwLock::new(properties),
        }
    }

    /// Returns the href this enlistment is registered under.
    #[must_use]
    pub fn href(&self) -> &str {
        &self.href
    }

    /// Replaces the whole property map.
    pub fn set_properties(&self, properties: PropertyMap) {
        *self.properties.write() = properties;
    }

    /// Returns a copy of a property value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.properties.read().get(name).cloned()
    }

    /// Returns `true` if `name` is present.
    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.properties.read().contains_key(name)
    }

    /// Sets a property, returning the previous value.
    pub fn insert(&self, name: &str, value: Value) -> Option<Value> {
        self.properties.write().insert(name.to_string(), value)
    }

    /// Removes a property, returning its value.
    pub fn remove(&self, name: &str) -> Option<Value> {
        self.properties.write().shift_remove(name)
    }

    /// Returns a copy of the whole property map.
    #[must_use]
    pub fn snapshot(&self) -> PropertyMap {
        self.properties.read().clone()
    }

    /// Returns the property names in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.properties.read().keys().cloned().collect()
    }

    /// Returns the number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.read().len()
    }

    /// Returns `true` if there are no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.read().is_empty()
    }
}

/// Registry of live enlistments keyed by href.
#[derive(Debug)]
pub struct EnlistmentRegistry {
    entries: DashMap<String, Weak<Enlistment>>,
    capacity: usize,
    prune_threshold: AtomicUsize,
}

// Verify EnlistmentRegistry is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<EnlistmentRegistry>();
    assert_send_sync::<Enlistment>();
};

impl EnlistmentRegistry {
    /// Creates a registry that prunes dead entries beyond `capacity` hrefs.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: DashMap::new(),
            capacity,
            prune_threshold: AtomicUsize::new(capacity),
        }
    }

    /// Binds `properties` to the enlistment for `href`.
    ///
    /// A live enlistment is refreshed in place; otherwise a new one is created
    /// and registered. Both paths are atomic with respect to other callers
    /// enlisting the same href.
    pub fn enlist(&self, href: &str, properties: PropertyMap) -> Arc<Enlistment> {
        let enlistment = match self.entries.entry(href.to_string()) {
            Entry::Occupied(mut occupied) => {
                if let Some(live) = occupied.get().upgrade() {
                    live.set_properties(properties);
                    live
                } else {
                    let fresh = Arc::new(Enlistment::new(href, properties));
                    occupied.insert(Arc::downgrade(&fresh));
                    fresh
                }
            }
            Entry::Vacant(vacant) => {
                let fresh = Arc::new(Enlistment::new(href, properties));
                vacant.insert(Arc::downgrade(&fresh));
                fresh
            }
        };

        if self.entries.len() > self.prune_threshold.load(Ordering::Relaxed) {
            self.prune();
        }

        enlistment
    }

    /// Refreshes the live enlistment for `href`, if any.
    ///
    /// Returns `true` when an enlistment was updated.
    pub fn refresh_existing(&self, href: &str, properties: PropertyMap) -> bool {
        self.lookup(href).map_or(false, |live| {
            live.set_properties(properties);
            true
        })
    }

    /// Returns the live enlistment for `href`.
    #[must_use]
    pub fn lookup(&self, href: &str) -> Option<Arc<Enlistment>> {
        self.entries.get(href).and_then(|entry| entry.upgrade())
    }

    /// Removes `href` from the registry.
    ///
    /// Existing holders keep their (now detached) map; the next load of `href`
    /// creates a fresh enlistment.
    pub fn evict(&self, href: &str) -> bool {
        self.entries.remove(href).is_some()
    }

    /// Drops entries whose enlistment is no longer held by any resource.
    ///
    /// The next automatic prune happens once the registry holds more than
    /// twice the surviving entries, and never below the capacity.
    pub fn prune(&self) {
        let before = self.entries.len();
        self.entries.retain(|_, weak| weak.strong_count() > 0);
        let live = self.entries.len();
        let threshold = live.saturating_mul(2).max(self.capacity);
        self.prune_threshold.store(threshold, Ordering::Relaxed);
        tracing::trace!(
            pruned = before.saturating_sub(live),
            next_prune_above = threshold,
            "Pruned identity map"
        );
    }

    /// Returns the number of registered hrefs, live or not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no href is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
