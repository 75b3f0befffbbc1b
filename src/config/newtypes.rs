//! Validated newtype wrappers for configuration values.
//!
//! This module provides type-safe wrappers around string values that validate
//! their contents on construction. Invalid values are rejected with clear error messages.

use crate::error::ConfigError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A validated API key id.
///
/// # Example
///
/// ```rust
/// use idm_sdk::ApiKeyId;
///
/// let id = ApiKeyId::new("4J2M0XW8ZKWFQ8JN5WQ6YEXAMPLE").unwrap();
/// assert_eq!(id.as_ref(), "4J2M0XW8ZKWFQ8JN5WQ6YEXAMPLE");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiKeyId(String);

impl ApiKeyId {
    /// Creates a new validated API key id.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyApiKeyId`] if the id is empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ConfigError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ConfigError::EmptyApiKeyId);
        }
        Ok(Self(id))
    }
}

impl AsRef<str> for ApiKeyId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A validated API key secret.
///
/// The `Debug` implementation masks the secret value, displaying only
/// `ApiKeySecret(*****)` so the secret never ends up in logs.
///
/// # Example
///
/// ```rust
/// use idm_sdk::ApiKeySecret;
///
/// let secret = ApiKeySecret::new("my-secret").unwrap();
/// assert_eq!(format!("{:?}", secret), "ApiKeySecret(*****)");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKeySecret(String);

impl ApiKeySecret {
    /// Creates a new validated API key secret.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyApiKeySecret`] if the secret is empty.
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ConfigError::EmptyApiKeySecret);
        }
        Ok(Self(secret))
    }
}

impl AsRef<str> for ApiKeySecret {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKeySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKeySecret(*****)")
    }
}

/// A validated API base URL.
///
/// Relative resource hrefs are resolved against this URL. The scheme must be
/// `http` or `https` (case-insensitive) and a trailing `/` is stripped so that
/// joining with an href never produces a double slash.
///
/// # Example
///
/// ```rust
/// use idm_sdk::BaseUrl;
///
/// let url = BaseUrl::new("https://api.example.com/v1/").unwrap();
/// assert_eq!(url.as_ref(), "https://api.example.com/v1");
/// assert_eq!(url.scheme(), "https");
/// assert_eq!(url.host(), "api.example.com");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseUrl {
    url: String,
    scheme_end: usize,
    host_end: usize,
}

impl BaseUrl {
    /// Creates a new validated base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if the URL has no `http`/`https`
    /// scheme or no host.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();
        let url = url.trim().trim_end_matches('/').to_string();

        let scheme_end = url
            .find("://")
            .ok_or_else(|| ConfigError::InvalidBaseUrl { url: url.clone() })?;

        let scheme = &url[..scheme_end];
        if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
            return Err(ConfigError::InvalidBaseUrl { url });
        }

        let host_start = scheme_end + 3;
        let remainder = &url[host_start..];
        let host_end = remainder
            .find(['/', '?', '#'])
            .map_or(url.len(), |i| host_start + i);

        if host_end == host_start || remainder.contains(['?', '#']) {
            return Err(ConfigError::InvalidBaseUrl { url });
        }

        Ok(Self {
            url,
            scheme_end,
            host_end,
        })
    }

    /// Returns the URL scheme (e.g., "https").
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.url[..self.scheme_end]
    }

    /// Returns the host, including the port when one is present.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.url[self.scheme_end + 3..self.host_end]
    }

    /// Returns the path portion of the URL, empty when the URL has none.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.url[self.host_end..]
    }
}

impl AsRef<str> for BaseUrl {
    fn as_ref(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

impl Serialize for BaseUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.url)
    }
}

impl<'de> Deserialize<'de> for BaseUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(de::Error::custom)
    }
}
