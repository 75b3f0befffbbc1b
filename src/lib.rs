//! # Identity Management SDK
//!
//! The resource data-store layer of a client SDK for an identity-management
//! REST API: typed resources (accounts, groups, directories, API keys, MFA
//! factors and more) loaded, created, saved and deleted through a single
//! [`DataStore`](ds::DataStore).
//!
//! ## Overview
//!
//! This SDK provides:
//! - Type-safe configuration via [`ClientConfig`] and [`ClientConfigBuilder`]
//! - Validated newtypes for API credentials and the base URL
//! - A blocking HTTP transport with SAuthc1 request signing via [`http`]
//! - An href-keyed identity map: one shared property map per remote resource
//! - Partial updates: `save` sends only the properties that changed
//! - A per-type resource cache with time-to-live and time-to-idle via [`cache`]
//! - Transparent API key secret decryption
//! - Polymorphic resources (MFA factors) dispatched on a discriminator property
//!
//! ## Quick Start
//!
//! ```rust
//! use idm_sdk::{ApiKeyCredentials, BaseUrl, CacheSettings, ClientConfig};
//! use idm_sdk::ds::DataStore;
//!
//! let config = ClientConfig::builder()
//!     .base_url(BaseUrl::new("https://api.example.com/v1").unwrap())
//!     .credentials(ApiKeyCredentials::new("key-id", "key-secret").unwrap())
//!     .cache(CacheSettings::disabled())
//!     .build()
//!     .unwrap();
//!
//! let data_store = DataStore::builder().config(config).build().unwrap();
//! assert!(data_store.filter_names().contains(&"enlistment"));
//! ```
//!
//! ## Working With Resources
//!
//! ```rust,ignore
//! use idm_sdk::resources::{Account, Directory};
//!
//! let directory: Directory = data_store.get_resource("/directories/abc", None)?;
//!
//! let mut account = Account::new();
//! account.set_email("joan@example.com");
//! account.set_password("Changeme1!");
//! data_store.create("/directories/abc/accounts", &mut account, None)?;
//!
//! account.set_surname("Doe");
//! data_store.save(&mut account, None)?; // sends {"surname": "Doe"}
//!
//! data_store.delete(&account)?;
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: configuration, caches and the identity map belong to
//!   one data store instance
//! - **Fail-fast validation**: all newtypes validate on construction
//! - **Thread-safe**: the data store and all resources are `Send + Sync`
//! - **Explicit errors**: every remote call returns a typed
//!   [`DataStoreError`](ds::DataStoreError)

pub mod cache;
pub mod config;
pub mod ds;
pub mod error;
pub mod http;
pub mod resources;

// Re-export public types at crate root for convenience
pub use config::{
    ApiKeyCredentials, ApiKeyId, ApiKeySecret, BaseUrl, CacheSettings, ClientConfig,
    ClientConfigBuilder, RegionTimeouts,
};
pub use error::ConfigError;

pub use ds::{DataStore, DataStoreBuilder, DataStoreError};
