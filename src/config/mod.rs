//! Configuration types for the client SDK.
//!
//! This module provides the configuration used to construct a
//! [`DataStore`](crate::ds::DataStore) and its default HTTP transport.
//!
//! # Overview
//!
//! - [`ClientConfig`]: The main configuration struct holding all SDK settings
//! - [`ClientConfigBuilder`]: A builder for constructing [`ClientConfig`] instances
//! - [`ApiKeyCredentials`]: The API key pair used to sign requests
//! - [`CacheSettings`]: Region time-to-live / time-to-idle policy
//! - [`BaseUrl`], [`ApiKeyId`], [`ApiKeySecret`]: validated newtypes
//!
//! # Example
//!
//! ```rust
//! use idm_sdk::{ApiKeyCredentials, BaseUrl, ClientConfig};
//!
//! let config = ClientConfig::builder()
//!     .base_url(BaseUrl::new("https://api.example.com/v1").unwrap())
//!     .credentials(ApiKeyCredentials::new("key-id", "key-secret").unwrap())
//!     .build()
//!     .unwrap();
//!
//! assert!(config.cache().is_enabled());
//! ```

mod newtypes;

pub use newtypes::{ApiKeyId, ApiKeySecret, BaseUrl};

use std::collections::HashMap;
use std::time::Duration;

use crate::error::ConfigError;

/// Default time-to-live and time-to-idle for cache regions.
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(3600);

/// Default connect and read timeout for the HTTP transport.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of hrefs tracked by the identity map before dead entries are pruned.
pub const DEFAULT_ENLISTMENT_CAPACITY: usize = 1024;

/// An API key id/secret pair.
///
/// # Example
///
/// ```rust
/// use idm_sdk::ApiKeyCredentials;
///
/// let credentials = ApiKeyCredentials::new("id", "secret").unwrap();
/// assert_eq!(credentials.id().as_ref(), "id");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiKeyCredentials {
    id: ApiKeyId,
    secret: ApiKeySecret,
}

impl ApiKeyCredentials {
    /// Creates validated credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyApiKeyId`] or [`ConfigError::EmptyApiKeySecret`]
    /// when either half is empty.
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            id: ApiKeyId::new(id)?,
            secret: ApiKeySecret::new(secret)?,
        })
    }

    /// Returns the API key id.
    #[must_use]
    pub const fn id(&self) -> &ApiKeyId {
        &self.id
    }

    /// Returns the API key secret.
    #[must_use]
    pub const fn secret(&self) -> &ApiKeySecret {
        &self.secret
    }
}

/// Per-region expiration policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegionTimeouts {
    /// Maximum age of an entry since it was written.
    pub time_to_live: Option<Duration>,
    /// Maximum age of an entry since it was last read.
    pub time_to_idle: Option<Duration>,
}

/// Cache settings for resource data.
///
/// Caching is enabled by default with a one hour time-to-live and time-to-idle
/// for every region. Collection caching is off by default: collection pages are
/// always fetched, while the instances inside them are still cached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheSettings {
    enabled: bool,
    collection_caching: bool,
    defaults: RegionTimeouts,
    regions: HashMap<String, RegionTimeouts>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            collection_caching: false,
            defaults: RegionTimeouts {
                time_to_live: Some(DEFAULT_CACHE_TIMEOUT),
                time_to_idle: Some(DEFAULT_CACHE_TIMEOUT),
            },
            regions: HashMap::new(),
        }
    }
}

impl CacheSettings {
    /// Settings with caching turned off entirely.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Enables or disables caching.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Enables or disables caching of collection pages.
    #[must_use]
    pub const fn collection_caching(mut self, enabled: bool) -> Self {
        self.collection_caching = enabled;
        self
    }

    /// Sets the default time-to-live for regions without an override.
    #[must_use]
    pub const fn default_time_to_live(mut self, ttl: Option<Duration>) -> Self {
        self.defaults.time_to_live = ttl;
        self
    }

    /// Sets the default time-to-idle for regions without an override.
    #[must_use]
    pub const fn default_time_to_idle(mut self, tti: Option<Duration>) -> Self {
        self.defaults.time_to_idle = tti;
        self
    }

    /// Overrides the expiration policy of a single region.
    #[must_use]
    pub fn region(mut self, name: impl Into<String>, timeouts: RegionTimeouts) -> Self {
        self.regions.insert(name.into(), timeouts);
        self
    }

    /// Returns whether caching is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns whether collection pages are cached.
    #[must_use]
    pub const fn is_collection_caching_enabled(&self) -> bool {
        self.collection_caching
    }

    /// Returns the default region expiration policy.
    #[must_use]
    pub const fn defaults(&self) -> RegionTimeouts {
        self.defaults
    }

    /// Returns the expiration policy for `region`.
    #[must_use]
    pub fn timeouts_for(&self, region: &str) -> RegionTimeouts {
        self.regions.get(region).copied().unwrap_or(self.defaults)
    }
}

/// Configuration for the client SDK.
///
/// `ClientConfig` is `Clone`, `Send`, and `Sync`.
///
/// # Example
///
/// ```rust
/// use idm_sdk::{BaseUrl, CacheSettings, ClientConfig};
///
/// let config = ClientConfig::builder()
///     .base_url(BaseUrl::new("https://api.example.com/v1").unwrap())
///     .cache(CacheSettings::disabled())
///     .build()
///     .unwrap();
///
/// assert!(!config.cache().is_enabled());
/// assert!(config.credentials().is_none());
/// ```
#[derive(Clone, Debug)]
pub struct ClientConfig {
    base_url: BaseUrl,
    credentials: Option<ApiKeyCredentials>,
    cache: CacheSettings,
    user_agent_prefix: Option<String>,
    tries: u32,
    connect_timeout: Duration,
    read_timeout: Duration,
    enlistment_capacity: usize,
}

impl ClientConfig {
    /// Creates a new builder for constructing a `ClientConfig`.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Returns the base URL relative hrefs are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    /// Returns the API key credentials, if configured.
    #[must_use]
    pub const fn credentials(&self) -> Option<&ApiKeyCredentials> {
        self.credentials.as_ref()
    }

    /// Returns the cache settings.
    #[must_use]
    pub const fn cache(&self) -> &CacheSettings {
        &self.cache
    }

    /// Returns the user agent prefix, if configured.
    #[must_use]
    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }

    /// Returns how many times the default transport attempts a request.
    #[must_use]
    pub const fn tries(&self) -> u32 {
        self.tries
    }

    /// Returns the transport connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the transport read timeout.
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Returns the identity map size that triggers pruning of dead entries.
    #[must_use]
    pub const fn enlistment_capacity(&self) -> usize {
        self.enlistment_capacity
    }
}

// Verify ClientConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ClientConfig>();
};

/// Builder for constructing [`ClientConfig`] instances.
///
/// The only required field is `base_url`.
///
/// # Defaults
///
/// - `credentials`: `None` (requests are sent unsigned)
/// - `cache`: [`CacheSettings::default`]
/// - `user_agent_prefix`: `None`
/// - `tries`: `1`
/// - `connect_timeout` / `read_timeout`: 10 seconds
/// - `enlistment_capacity`: 1024
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<BaseUrl>,
    credentials: Option<ApiKeyCredentials>,
    cache: Option<CacheSettings>,
    user_agent_prefix: Option<String>,
    tries: Option<u32>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    enlistment_capacity: Option<usize>,
}

impl ClientConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL (required).
    #[must_use]
    pub fn base_url(mut self, url: BaseUrl) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Sets the API key credentials used to sign requests.
    #[must_use]
    pub fn credentials(mut self, credentials: ApiKeyCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets the cache settings.
    #[must_use]
    pub fn cache(mut self, cache: CacheSettings) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the user agent prefix for HTTP requests.
    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Sets how many times the default transport attempts a request.
    #[must_use]
    pub const fn tries(mut self, tries: u32) -> Self {
        self.tries = Some(tries);
        self
    }

    /// Sets the transport connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the transport read timeout.
    #[must_use]
    pub const fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Sets the identity map size that triggers pruning of dead entries.
    #[must_use]
    pub const fn enlistment_capacity(mut self, capacity: usize) -> Self {
        self.enlistment_capacity = Some(capacity);
        self
    }

    /// Builds the [`ClientConfig`], validating that required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `base_url` is not set,
    /// or [`ConfigError::InvalidSetting`] if `tries` or `enlistment_capacity`
    /// is zero.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let base_url = self
            .base_url
            .ok_or(ConfigError::MissingRequiredField { field: "base_url" })?;

        let tries = self.tries.unwrap_or(1);
        if tries == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "tries",
                reason: "at least one attempt is required".to_string(),
            });
        }

        let enlistment_capacity = self
            .enlistment_capacity
            .unwrap_or(DEFAULT_ENLISTMENT_CAPACITY);
        if enlistment_capacity == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "enlistment_capacity",
                reason: "capacity must be greater than zero".to_string(),
            });
        }

        Ok(ClientConfig {
            base_url,
            credentials: self.credentials,
            cache: self.cache.unwrap_or_default(),
            user_agent_prefix: self.user_agent_prefix,
            tries,
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT),
            read_timeout: self.read_timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT),
            enlistment_capacity,
        })
    }
}
