//! Custom data.

use serde_json::Value;

use crate::ds::{ResourceData, ResourceTag, ResourceType};

pub(crate) static CUSTOM_DATA_TYPE: ResourceType =
    ResourceType::instance("CustomData").tagged(ResourceTag::CustomData);

resource!(
    /// Free-form properties attached to an extendable resource.
    ///
    /// Custom data is never sanitized: nested maps are kept as they are, both
    /// when it is sent and when it is cached.
    CustomData => CUSTOM_DATA_TYPE
);

impl CustomData {
    /// Creates empty, unsaved custom data.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: ResourceData::new(),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.get(key)
    }

    pub fn put(&mut self, key: &str, value: impl Into<Value>) {
        self.data.set(key, value);
    }

    /// Removes `key` locally. Use `DataStore::delete_property` to remove it
    /// on the server.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.data.property_names()
    }
}

impl Default for CustomData {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ds::{ConversionMode, Resource, ResourceConverter};
    use serde_json::json;

    #[test]
    fn test_nested_maps_are_not_reduced() {
        let mut custom = CustomData::new();
        custom.put("profile", json!({"href": "elsewhere", "tier": "gold"}));

        let converted =
            ResourceConverter.convert(&CUSTOM_DATA_TYPE, custom.data(), ConversionMode::Full);
        assert_eq!(converted["profile"]["tier"], "gold");
    }
}
