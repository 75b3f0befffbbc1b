//! Property map (un)marshalling.

use serde::de::Error as _;
use serde_json::Value;

use crate::ds::errors::{MarshalDirection, MarshalingError};
use crate::ds::resource::{PropertyMap, HREF, ITEMS, LIMIT, LOCAL_HREF, OFFSET, SIZE};

/// Default page size reported for synthesized collections.
pub const DEFAULT_LIMIT: u64 = 25;

/// Converts property maps to and from wire text.
pub trait MapMarshaller: Send + Sync {
    /// Serializes `map`, preserving property order.
    ///
    /// # Errors
    ///
    /// Returns [`MarshalingError`] if the map cannot be serialized.
    fn marshal(&self, map: &PropertyMap) -> Result<String, MarshalingError>;

    /// Parses wire text into a property map.
    ///
    /// # Errors
    ///
    /// Returns [`MarshalingError`] if the text is malformed or is neither an
    /// object nor an array.
    fn unmarshal(&self, text: &str) -> Result<PropertyMap, MarshalingError>;
}

/// JSON implementation of [`MapMarshaller`].
///
/// A top-level JSON array is wrapped into a collection-shaped map with the
/// synthetic href `local`, offset `0`, limit `25` and `size` equal to the
/// array length.
///
/// # Example
///
/// ```rust
/// use idm_sdk::ds::{JsonMapMarshaller, MapMarshaller};
///
/// let map = JsonMapMarshaller.unmarshal(r#"[{"name":"a"},{"name":"b"}]"#).unwrap();
/// assert_eq!(map["href"], "local");
/// assert_eq!(map["size"], 2);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonMapMarshaller;

impl MapMarshaller for JsonMapMarshaller {
    fn marshal(&self, map: &PropertyMap) -> Result<String, MarshalingError> {
        serde_json::to_string(map).map_err(|source| MarshalingError {
            direction: MarshalDirection::ToWire,
            source,
        })
    }

    fn unmarshal(&self, text: &str) -> Result<PropertyMap, MarshalingError> {
        let from_wire = |source| MarshalingError {
            direction: MarshalDirection::FromWire,
            source,
        };

        match serde_json::from_str::<Value>(text).map_err(from_wire)? {
            Value::Object(map) => Ok(map),
            Value::Array(items) => Ok(wrap_items(items)),
            other => Err(from_wire(serde_json::Error::custom(format!(
                "expected a JSON object or array, found {}",
                kind(&other)
            )))),
        }
    }
}

fn wrap_items(items: Vec<Value>) -> PropertyMap {
    let mut map = PropertyMap::new();
    map.insert(HREF.to_string(), Value::from(LOCAL_HREF));
    map.insert(OFFSET.to_string(), Value::from(0));
    map.insert(LIMIT.to_string(), Value::from(DEFAULT_LIMIT));
    map.insert(SIZE.to_string(), Value::from(items.len()));
    map.insert(ITEMS.to_string(), Value::Array(items));
    map
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_marshal_preserves_insertion_order() {
        let mut map = PropertyMap::new();
        map.insert("zeta".to_string(), json!(1));
        map.insert("alpha".to_string(), json!(2));
        map.insert("mid".to_string(), json!({"b": 1, "a": 2}));

        let text = JsonMapMarshaller.marshal(&map).unwrap();
        assert_eq!(text, r#"{"zeta":1,"alpha":2,"mid":{"b":1,"a":2}}"#);
    }

    #[test]
    fn test_unmarshal_of_marshal_is_equal() {
        let beyond_u64: Value = serde_json::from_str("123456789012345678901234567890").unwrap();
        let original = json!({
            "href": "https://api.example.com/v1/accounts/1",
            "givenName": "Jean",
            "middleName": null,
            "createdAt": "2015-01-01T00:00:00.000Z",
            "groups": {"href": "https://api.example.com/v1/accounts/1/groups"},
            "tags": ["a", null, 3],
            "loginCount": 42,
            "offsetMinutes": -90,
            "maxU64": u64::MAX,
            "minI64": i64::MIN,
            "beyondU64": beyond_u64,
            "ratio": 0.25,
            "verified": false,
        });
        let map = original.as_object().unwrap().clone();

        let text = JsonMapMarshaller.marshal(&map).unwrap();
        let back = JsonMapMarshaller.unmarshal(&text).unwrap();
        assert_eq!(back, map);
        assert!(back["middleName"].is_null());
        assert_eq!(back["loginCount"].as_u64(), Some(42));
        assert_eq!(back["minI64"].as_i64(), Some(i64::MIN));
        assert_eq!(back["beyondU64"].to_string(), "123456789012345678901234567890");
    }

    #[test]
    fn test_large_numbers_keep_precision() {
        let map = JsonMapMarshaller
            .unmarshal(r#"{"n":123456789012345678901234567890}"#)
            .unwrap();
        let text = JsonMapMarshaller.marshal(&map).unwrap();
        assert_eq!(text, r#"{"n":123456789012345678901234567890}"#);
    }

    #[test]
    fn test_top_level_array_is_wrapped() {
        let map = JsonMapMarshaller
            .unmarshal(r#"[{"name":"one"},{"name":"two"},{"name":"three"}]"#)
            .unwrap();

        assert_eq!(map[HREF], json!("local"));
        assert_eq!(map[OFFSET], json!(0));
        assert_eq!(map[LIMIT], json!(25));
        assert_eq!(map[SIZE], json!(3));
        assert_eq!(map[ITEMS].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_malformed_payload_is_a_from_wire_error() {
        let error = JsonMapMarshaller.unmarshal("{not json").unwrap_err();
        assert_eq!(error.direction, MarshalDirection::FromWire);
    }

    #[test]
    fn test_scalar_payload_is_rejected() {
        let error = JsonMapMarshaller.unmarshal("42").unwrap_err();
        assert!(error.to_string().contains("a number"));
    }
}
