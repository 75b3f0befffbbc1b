//! Cache lookups for reads.

use serde_json::Value;

use crate::cache::CacheResolver;
use crate::ds::errors::DataStoreError;
use crate::ds::filter::{
    Filter, FilterChain, ResourceAction, ResourceDataRequest, ResourceDataResult,
};
use crate::ds::filters::cache_key;
use crate::ds::marshal::DEFAULT_LIMIT;
use crate::ds::resource::{
    is_materialized, PropertyMap, ResourceTag, ResourceType, HREF, ITEMS, LIMIT, OFFSET, SIZE,
};
use crate::http::Canonicalizer;

/// Answers reads from the cache when a live entry exists.
///
/// Requests that ask for expansion always go to the server, since cached
/// entries hold nested resources as bare references.
#[derive(Debug)]
pub struct ReadCacheFilter {
    cache: CacheResolver,
    canonicalizer: Canonicalizer,
    collection_caching: bool,
}

impl ReadCacheFilter {
    /// Creates the filter.
    #[must_use]
    pub const fn new(
        cache: CacheResolver,
        canonicalizer: Canonicalizer,
        collection_caching: bool,
    ) -> Self {
        Self {
            cache,
            canonicalizer,
            collection_caching,
        }
    }

    fn is_api_key_query(request: &ResourceDataRequest) -> bool {
        request.resource_type.is_collection()
            && request.resource_type.tag() == ResourceTag::ApiKey
            && request.uri.query().contains_key("id")
    }

    fn is_cache_retrieval_enabled(&self, request: &ResourceDataRequest) -> bool {
        request.action == ResourceAction::Read
            && request.resource_type.reads_from_cache()
            && !request.uri.query().contains_key("expand")
            && (!request.resource_type.is_collection()
                || self.collection_caching
                || Self::is_api_key_query(request))
    }

    fn lookup(&self, request: &ResourceDataRequest) -> Option<PropertyMap> {
        if Self::is_api_key_query(request) {
            return self.lookup_api_key(request);
        }

        let resource_type = request.resource_type;
        let mut data = self
            .cache
            .get(resource_type, &cache_key(&request.uri, resource_type))?;

        if let Some(item_type) = resource_type.item_type() {
            self.resolve_items(item_type, &mut data)?;
        }

        Some(data)
    }

    /// Replaces href-only items by their cached state; any missing item is a miss.
    fn resolve_items(&self, item_type: &ResourceType, data: &mut PropertyMap) -> Option<()> {
        let Some(Value::Array(items)) = data.get_mut(ITEMS) else {
            return Some(());
        };

        for item in items.iter_mut() {
            let Value::Object(map) = item else { continue };
            if is_materialized(map) {
                continue;
            }
            let href = map.get(HREF).and_then(Value::as_str)?;
            *map = self.cache.get(item_type, href)?;
        }

        Some(())
    }

    /// Serves `apiKeys?id=...` from the cached key, wrapped as a one-item page.
    fn lookup_api_key(&self, request: &ResourceDataRequest) -> Option<PropertyMap> {
        let item_type = request.resource_type.item_type()?;
        let query = request.uri.query();
        let id = query.get("id")?;

        let href = self.canonicalizer.qualify(&format!("/apiKeys/{id}"));
        let key = self.cache.get(item_type, &href)?;

        let offset = query
            .get(OFFSET)
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        let limit = query
            .get(LIMIT)
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_LIMIT);

        let mut page = PropertyMap::new();
        page.insert(HREF.to_string(), Value::from(request.uri.absolute_path()));
        page.insert(OFFSET.to_string(), Value::from(offset));
        page.insert(LIMIT.to_string(), Value::from(limit));
        page.insert(SIZE.to_string(), Value::from(1));
        page.insert(ITEMS.to_string(), Value::Array(vec![Value::Object(key)]));
        Some(page)
    }
}

impl Filter for ReadCacheFilter {
    fn filter(
        &self,
        request: ResourceDataRequest,
        chain: FilterChain<'_>,
    ) -> Result<ResourceDataResult, DataStoreError> {
        if self.is_cache_retrieval_enabled(&request) {
            if let Some(data) = self.lookup(&request) {
                tracing::debug!(uri = %request.uri, "Serving resource data from cache");
                return Ok(ResourceDataResult::new(
                    ResourceAction::Read,
                    request.uri,
                    request.return_type,
                    data,
                ));
            }
        }

        chain.filter(request)
    }

    fn name(&self) -> &'static str {
        "read-cache"
    }
}
