//! Cache population and invalidation.

use serde_json::Value;

use crate::cache::CacheResolver;
use crate::ds::errors::DataStoreError;
use crate::ds::filter::{
    Filter, FilterChain, ResourceAction, ResourceDataRequest, ResourceDataResult,
};
use crate::ds::filters::cache_key;
use crate::ds::resource::{
    is_materialized, reference, PropertyMap, ResourceTag, ResourceType, CUSTOM_DATA, HREF, ITEMS,
};

/// Evicts entries a write invalidates and caches whatever the server returns.
///
/// Cached entries hold nested resources as `{"href": ...}` references; the
/// nested state itself is cached under its own type when the owner declares
/// the reference (or, for collections, under the item type).
#[derive(Debug)]
pub struct WriteCacheFilter {
    cache: CacheResolver,
    collection_caching: bool,
}

impl WriteCacheFilter {
    /// Creates the filter.
    #[must_use]
    pub const fn new(cache: CacheResolver, collection_caching: bool) -> Self {
        Self {
            cache,
            collection_caching,
        }
    }

    /// Caches `data` and its materialized nested resources.
    fn cache_data(&self, resource_type: &ResourceType, data: &PropertyMap, key: Option<&str>) {
        let Some(href) = data.get(HREF).and_then(Value::as_str) else {
            return;
        };

        if resource_type.tag() == ResourceTag::CustomData {
            self.cache.put(resource_type, href, data.clone());
            return;
        }

        let mut entry = PropertyMap::new();
        for (name, value) in data {
            if resource_type.is_sensitive(name) {
                continue;
            }
            if resource_type.is_raw_map(name) {
                entry.insert(name.clone(), value.clone());
                continue;
            }

            let cached = match value {
                Value::Array(items) if name == ITEMS => match resource_type.item_type() {
                    Some(item_type) => Value::Array(
                        items
                            .iter()
                            .map(|item| self.cache_nested(item_type, item))
                            .collect(),
                    ),
                    None => value.clone(),
                },
                Value::Object(_) => match resource_type.reference_type(name) {
                    Some(nested_type) => self.cache_nested(nested_type, value),
                    None => to_reference(value),
                },
                _ => value.clone(),
            };
            entry.insert(name.clone(), cached);
        }

        if resource_type.is_collection() {
            if self.collection_caching {
                self.cache.put(resource_type, key.unwrap_or(href), entry);
            }
        } else {
            self.cache.put(resource_type, href, entry);
        }
    }

    /// Caches a nested resource if it is materialized and returns its reference.
    fn cache_nested(&self, resource_type: &ResourceType, value: &Value) -> Value {
        if let Value::Object(map) = value {
            if is_materialized(map) && resource_type.writes_to_cache() {
                self.cache_data(resource_type, map, None);
            }
        }
        to_reference(value)
    }

    /// Merges submitted custom data into the cached custom data entry.
    fn merge_custom_data(
        &self,
        custom_data_type: &ResourceType,
        href: &str,
        submitted: &PropertyMap,
    ) {
        let mut merged = PropertyMap::new();
        merged.insert(HREF.to_string(), Value::from(href));
        if let Some(existing) = self.cache.get(custom_data_type, href) {
            merged.extend(existing);
        }
        for (name, value) in submitted {
            if name != HREF {
                merged.insert(name.clone(), value.clone());
            }
        }
        self.cache.put(custom_data_type, href, merged);
    }
}

/// Reduces a nested resource to its reference when it has an href.
fn to_reference(value: &Value) -> Value {
    match value.get(HREF).and_then(Value::as_str) {
        Some(href) if value.is_object() => reference(href),
        _ => value.clone(),
    }
}

impl Filter for WriteCacheFilter {
    fn filter(
        &self,
        request: ResourceDataRequest,
        chain: FilterChain<'_>,
    ) -> Result<ResourceDataResult, DataStoreError> {
        let request_type = request.resource_type;
        let key = cache_key(&request.uri, request_type);

        if matches!(request.action, ResourceAction::Update | ResourceAction::Delete) {
            self.cache.evict(request_type, &key);
        }

        let submitted_custom_data = match request.data.get(CUSTOM_DATA) {
            Some(Value::Object(map)) if request_type.is_extendable() => Some(map.clone()),
            _ => None,
        };
        let request_path = request.uri.absolute_path().to_string();

        let result = chain.filter(request)?;

        if request_type.tag() == ResourceTag::EmailVerificationToken
            && result.resource_type.tag() == ResourceTag::Account
        {
            if let Some(href) = result.data.get(HREF).and_then(Value::as_str) {
                self.cache.evict(result.resource_type, href);
            }
        }

        if result.action == ResourceAction::Delete {
            return Ok(result);
        }

        if result.resource_type.writes_to_cache() && is_materialized(&result.data) {
            self.cache_data(result.resource_type, &result.data, Some(&key));
        }

        if let Some(submitted) = submitted_custom_data {
            if let Some(custom_data_type) = result.resource_type.reference_type(CUSTOM_DATA) {
                let owner = result
                    .data
                    .get(HREF)
                    .and_then(Value::as_str)
                    .unwrap_or(&request_path);
                let href = format!("{owner}/{CUSTOM_DATA}");
                self.merge_custom_data(custom_data_type, &href, &submitted);
            }
        }

        Ok(result)
    }

    fn name(&self) -> &'static str {
        "write-cache"
    }
}
