//! Identity-map binding.

use std::sync::Arc;

use serde_json::Value;

use crate::ds::enlistment::EnlistmentRegistry;
use crate::ds::errors::DataStoreError;
use crate::ds::filter::{
    Filter, FilterChain, ResourceAction, ResourceDataRequest, ResourceDataResult,
};
use crate::ds::resource::{is_instance_shaped, PropertyMap, HREF};

/// Binds instance results to their enlistment and keeps nested ones fresh.
///
/// Deletes evict the target href before the request is sent, whatever the
/// outcome of the call.
#[derive(Debug)]
pub struct EnlistmentFilter {
    registry: Arc<EnlistmentRegistry>,
}

impl EnlistmentFilter {
    /// Creates the filter over `registry`.
    #[must_use]
    pub const fn new(registry: Arc<EnlistmentRegistry>) -> Self {
        Self { registry }
    }

    fn refresh_nested(&self, data: &PropertyMap) {
        for value in data.values() {
            self.refresh_value(value);
        }
    }

    fn refresh_value(&self, value: &Value) {
        match value {
            Value::Object(map) => {
                if is_instance_shaped(map) {
                    if let Some(href) = map.get(HREF).and_then(Value::as_str) {
                        self.registry.refresh_existing(href, map.clone());
                    }
                }
                self.refresh_nested(map);
            }
            Value::Array(values) => {
                for value in values {
                    self.refresh_value(value);
                }
            }
            _ => {}
        }
    }
}

impl Filter for EnlistmentFilter {
    fn filter(
        &self,
        request: ResourceDataRequest,
        chain: FilterChain<'_>,
    ) -> Result<ResourceDataResult, DataStoreError> {
        if request.action == ResourceAction::Delete {
            self.registry.evict(request.uri.absolute_path());
            return chain.filter(request);
        }

        let mut result = chain.filter(request)?;

        self.refresh_nested(&result.data);

        if !result.resource_type.is_collection() && is_instance_shaped(&result.data) {
            if let Some(href) = result.data.get(HREF).and_then(Value::as_str) {
                tracing::trace!(href, "Enlisting resource data");
                result.enlistment = Some(self.registry.enlist(href, result.data.clone()));
            }
        }

        Ok(result)
    }

    fn name(&self) -> &'static str {
        "enlistment"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ds::filter::{FilterPipeline, Handler};
    use crate::ds::resource::ResourceType;
    use crate::http::CanonicalUri;
    use serde_json::json;

    static ITEM: ResourceType = ResourceType::instance("Item");
    static ITEM_LIST: ResourceType = ResourceType::collection("ItemList", &ITEM);

    struct Fixed(Value);

    impl Handler for Fixed {
        fn handle(
            &self,
            request: ResourceDataRequest,
        ) -> Result<ResourceDataResult, DataStoreError> {
            Ok(ResourceDataResult::new(
                request.action,
                request.uri,
                request.return_type,
                self.0.as_object().cloned().unwrap_or_default(),
            ))
        }
    }

    fn props(value: Value) -> PropertyMap {
        value.as_object().unwrap().clone()
    }

    fn pipeline(registry: &Arc<EnlistmentRegistry>, body: Value) -> FilterPipeline {
        FilterPipeline::new(Arc::new(Fixed(body)))
            .with_filter(Arc::new(EnlistmentFilter::new(registry.clone())))
    }

    fn read(resource_type: &'static ResourceType, uri: &str) -> ResourceDataRequest {
        ResourceDataRequest::new(ResourceAction::Read, CanonicalUri::parse(uri), resource_type)
    }

    #[test]
    fn test_instance_result_is_enlisted() {
        let registry = Arc::new(EnlistmentRegistry::new(16));
        let result = pipeline(&registry, json!({"href": "i/1", "name": "a"}))
            .run(read(&ITEM, "i/1"))
            .unwrap();

        let enlistment = result.enlistment.unwrap();
        assert!(Arc::ptr_eq(&enlistment, &registry.lookup("i/1").unwrap()));
    }

    #[test]
    fn test_collection_items_refresh_live_enlistments_only() {
        let registry = Arc::new(EnlistmentRegistry::new(16));
        let held = registry.enlist("i/1", props(json!({"href": "i/1", "name": "old"})));

        let body = json!({
            "href": "i",
            "items": [
                {"href": "i/1", "name": "new"},
                {"href": "i/2", "name": "other"},
            ],
        });
        let result = pipeline(&registry, body).run(read(&ITEM_LIST, "i")).unwrap();

        assert!(result.enlistment.is_none());
        assert_eq!(held.get("name"), Some(json!("new")));
        assert!(registry.lookup("i/2").is_none());
    }

    #[test]
    fn test_delete_evicts_before_sending() {
        let registry = Arc::new(EnlistmentRegistry::new(16));
        let held = registry.enlist("i/1", props(json!({"href": "i/1", "name": "a"})));

        let request =
            ResourceDataRequest::new(ResourceAction::Delete, CanonicalUri::parse("i/1"), &ITEM);
        pipeline(&registry, json!({})).run(request).unwrap();

        assert!(registry.lookup("i/1").is_none());
        drop(held);
    }

    #[test]
    fn test_href_only_result_is_not_enlisted() {
        let registry = Arc::new(EnlistmentRegistry::new(16));
        let result = pipeline(&registry, json!({"href": "i/1"}))
            .run(read(&ITEM, "i/1"))
            .unwrap();
        assert!(result.enlistment.is_none());
        assert!(registry.is_empty());
    }
}
