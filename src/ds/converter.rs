//! Resource to wire-map conversion.
//!
//! The converter decides which properties of a resource are submitted and in
//! which shape. Nested resources are reduced to `{"href": ...}` references.
//! Lists and the properties the owning type declares as raw maps or embedded
//! documents are submitted verbatim. Rule sets become `{"items": [...]}`.

use serde_json::Value;

use crate::ds::resource::{
    reference, PropertyMap, ResourceData, ResourceTag, ResourceType, HREF, ITEMS,
};

/// Which properties to emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversionMode {
    /// Every property currently set (used for create).
    Full,
    /// Only the properties changed since load or save (used for update).
    Partial,
}

/// Converts resource data into the property map sent to the server.
///
/// # Example
///
/// ```rust
/// use idm_sdk::ds::{ConversionMode, ResourceConverter, ResourceData, ResourceType};
/// use serde_json::json;
///
/// static NOTE: ResourceType = ResourceType::instance("Note");
///
/// let mut data = ResourceData::new();
/// data.set("title", "hello");
/// data.set("author", json!({"href": "https://api.example.com/v1/accounts/1", "name": "x"}));
///
/// let map = ResourceConverter.convert(&NOTE, &data, ConversionMode::Full);
/// assert_eq!(map["author"], json!({"href": "https://api.example.com/v1/accounts/1"}));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct ResourceConverter;

impl ResourceConverter {
    /// Produces the wire map for `data` of type `resource_type`.
    #[must_use]
    pub fn convert(
        &self,
        resource_type: &'static ResourceType,
        data: &ResourceData,
        mode: ConversionMode,
    ) -> PropertyMap {
        let source = match mode {
            ConversionMode::Full => data.snapshot(),
            ConversionMode::Partial => data.dirty_properties().clone(),
        };

        if resource_type.tag() == ResourceTag::CustomData {
            return source;
        }

        source
            .into_iter()
            .map(|(name, value)| {
                let converted = convert_property(resource_type, &name, value);
                (name, converted)
            })
            .collect()
    }
}

fn convert_property(resource_type: &ResourceType, name: &str, value: Value) -> Value {
    if resource_type.is_raw_map(name) || resource_type.is_embedded(name) {
        return value;
    }

    if resource_type.is_rule_set(name) {
        return convert_rule_set(value);
    }

    // Lists are submitted as they are; only single nested resources are reduced.
    match value {
        Value::Object(map) => to_reference(map),
        other => other,
    }
}

/// Reduces a nested resource to its href, or keeps its pending properties.
fn to_reference(map: PropertyMap) -> Value {
    match map.get(HREF).and_then(Value::as_str) {
        Some(href) => reference(href),
        None => Value::Object(map),
    }
}

fn convert_rule_set(value: Value) -> Value {
    match value {
        Value::Array(rules) => {
            let mut unique: Vec<Value> = Vec::with_capacity(rules.len());
            for rule in rules {
                if !unique.contains(&rule) {
                    unique.push(rule);
                }
            }
            let mut map = PropertyMap::new();
            map.insert(ITEMS.to_string(), Value::Array(unique));
            Value::Object(map)
        }
        other => other,
    }
}
