//! Multi-valued, deterministically ordered query strings.

use std::collections::BTreeMap;
use std::fmt;

/// An ordered, multi-valued query parameter map.
///
/// Keys are kept sorted so the serialized form is deterministic and can be
/// used verbatim as a cache key. Values are percent-encoded on output and
/// percent-decoded on parse.
///
/// # Example
///
/// ```rust
/// use idm_sdk::http::QueryString;
///
/// let mut query = QueryString::new();
/// query.put("limit", "25");
/// query.put("expand", "groups");
/// assert_eq!(query.to_string(), "expand=groups&limit=25");
///
/// let parsed = QueryString::parse("username=jsmith%40example.com");
/// assert_eq!(parsed.get("username"), Some("jsmith@example.com"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryString {
    params: BTreeMap<String, Vec<String>>,
}

impl QueryString {
    /// Creates an empty query string.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            params: BTreeMap::new(),
        }
    }

    /// Parses a raw query (without the leading `?`).
    ///
    /// Repeated keys accumulate values. Pairs without `=` map to an empty
    /// value. Sequences that are not valid percent-encoding are kept verbatim.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut query = Self::new();
        for pair in raw.trim_start_matches('?').split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            query.append(decode(key), decode(value));
        }
        query
    }

    /// Sets `key` to a single value, replacing any existing values.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), vec![value.into()]);
    }

    /// Adds a value for `key`, keeping existing values.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.entry(key.into()).or_default().push(value.into());
    }

    /// Returns the first value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns every value for `key`.
    #[must_use]
    pub fn get_all(&self, key: &str) -> &[String] {
        self.params.get(key).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Removes `key`, returning its values.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.params.remove(key)
    }

    /// Returns `true` if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns the number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Iterates over keys and their values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.params
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    /// Copies every key of `other` into `self`, replacing values on collision.
    pub fn merge_overriding(&mut self, other: &Self) {
        for (key, values) in &other.params {
            self.params.insert(key.clone(), values.clone());
        }
    }
}

impl fmt::Display for QueryString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, values) in &self.params {
            for value in values {
                if !first {
                    f.write_str("&")?;
                }
                first = false;
                write!(
                    f,
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(value)
                )?;
            }
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryString {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Self::new();
        for (key, value) in iter {
            query.append(key, value);
        }
        query
    }
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_string(), |decoded| decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_is_sorted_by_key() {
        let query: QueryString = [("offset", "0"), ("expand", "customData"), ("limit", "25")]
            .into_iter()
            .collect();
        assert_eq!(query.to_string(), "expand=customData&limit=25&offset=0");
    }

    #[test]
    fn test_values_are_percent_encoded() {
        let mut query = QueryString::new();
        query.put("q", "a b&c");
        assert_eq!(query.to_string(), "q=a%20b%26c");
    }

    #[test]
    fn test_parse_decodes_and_accumulates_repeated_keys() {
        let query = QueryString::parse("tag=a&tag=b%20c&flag");
        assert_eq!(query.get_all("tag"), &["a".to_string(), "b c".to_string()]);
        assert_eq!(query.get("flag"), Some(""));
        assert_eq!(query.len(), 2);
    }

    #[test]
    fn test_put_replaces_existing_values() {
        let mut query = QueryString::parse("limit=10&limit=20");
        query.put("limit", "50");
        assert_eq!(query.get_all("limit"), &["50".to_string()]);
    }

    #[test]
    fn test_merge_overriding_prefers_other() {
        let mut base = QueryString::parse("limit=10&offset=5");
        base.merge_overriding(&QueryString::parse("limit=50"));
        assert_eq!(base.to_string(), "limit=50&offset=5");
    }

    #[test]
    fn test_parse_of_display_is_identity() {
        let mut query = QueryString::new();
        query.put("email", "jsmith+test@example.com");
        query.put("expand", "groups(offset:0,limit:10)");
        assert_eq!(QueryString::parse(&query.to_string()), query);
    }
}
