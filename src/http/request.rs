//! HTTP request types.
//!
//! This module provides the [`Request`] handed to a
//! [`RequestExecutor`](super::RequestExecutor) and the [`HttpHeaders`] map it
//! shares with [`Response`](super::Response).

use std::collections::BTreeMap;
use std::fmt;

use crate::http::uri::CanonicalUri;

/// HTTP methods used by the data store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP GET method for retrieving resources.
    Get,
    /// HTTP POST method for creating and updating resources.
    Post,
    /// HTTP PUT method.
    Put,
    /// HTTP DELETE method for removing resources.
    Delete,
}

impl HttpMethod {
    /// Returns the upper-case method name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive, multi-valued header map.
///
/// Names are stored lower-cased and iterate in sorted order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpHeaders {
    entries: BTreeMap<String, Vec<String>>,
}

impl HttpHeaders {
    /// Creates an empty header map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Sets `name` to a single value, replacing existing values.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .insert(name.to_ascii_lowercase(), vec![value.into()]);
    }

    /// Adds a value for `name`.
    pub fn add(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// Returns the first value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns every value for `name`.
    #[must_use]
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Removes `name`, returning its values.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.entries.remove(&name.to_ascii_lowercase())
    }

    /// Copies every header of `other`, replacing values on collision.
    pub fn extend_from(&mut self, other: &Self) {
        for (name, values) in &other.entries {
            self.entries.insert(name.clone(), values.clone());
        }
    }

    /// Returns `true` if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over lower-cased names and their values in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }
}

/// An HTTP request ready for a [`RequestExecutor`](super::RequestExecutor).
#[derive(Clone, Debug)]
pub struct Request {
    /// The HTTP method.
    pub method: HttpMethod,
    /// The canonical request URI.
    pub uri: CanonicalUri,
    /// Request headers.
    pub headers: HttpHeaders,
    /// Serialized request body, if any.
    pub body: Option<String>,
}

impl Request {
    /// Creates a request without headers or body.
    #[must_use]
    pub fn new(method: HttpMethod, uri: CanonicalUri) -> Self {
        Self {
            method,
            uri,
            headers: HttpHeaders::new(),
            body: None,
        }
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_display_is_upper_case() {
        assert_eq!(HttpMethod::Get.to_string(), "GET");
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let mut headers = HttpHeaders::new();
        headers.set("Content-Type", "application/json");
        assert_eq!(headers.get("content-type"), Some("application/json"));
        assert!(headers.contains("CONTENT-TYPE"));
    }

    #[test]
    fn test_headers_keep_multiple_values() {
        let mut headers = HttpHeaders::new();
        headers.add("Accept", "application/json");
        headers.add("accept", "text/plain");
        assert_eq!(headers.get_all("Accept").len(), 2);

        headers.set("Accept", "application/json");
        assert_eq!(headers.get_all("Accept").len(), 1);
    }

    #[test]
    fn test_request_builder_helpers() {
        let request = Request::new(
            HttpMethod::Post,
            CanonicalUri::parse("https://api.example.com/v1/accounts"),
        )
        .with_header("Accept", "application/json")
        .with_body("{}");

        assert_eq!(request.body.as_deref(), Some("{}"));
        assert_eq!(request.headers.get("accept"), Some("application/json"));
    }
}
