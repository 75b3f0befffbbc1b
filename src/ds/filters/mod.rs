//! The standard filters.
//!
//! The data store assembles them in this order, outermost first:
//!
//! 1. [`EnlistmentFilter`]
//! 2. [`DecryptApiKeySecretFilter`] (API key credentials and a decryptor configured)
//! 3. [`ReadCacheFilter`]
//! 4. [`WriteCacheFilter`]
//! 5. [`ApiKeyQueryFilter`] (same condition as 2)
//! 6. [`ProviderAccountResultFilter`]

mod api_key;
mod enlistment;
mod provider;
mod read_cache;
mod write_cache;

pub use api_key::{
    AesSecretDecryptor, ApiKeyQueryFilter, DecryptApiKeySecretFilter, EncryptionParams,
    SecretDecryptor, API_KEY_META_DATA, DEFAULT_ENCRYPTION_ITERATIONS, DEFAULT_ENCRYPTION_KEY_SIZE,
    ENCRYPTION_KEY_ITERATIONS, ENCRYPTION_KEY_SALT, ENCRYPTION_KEY_SIZE, ENCRYPT_SECRET,
};
pub use enlistment::EnlistmentFilter;
pub use provider::{ProviderAccountResultFilter, IS_NEW_ACCOUNT};
pub use read_cache::ReadCacheFilter;
pub use write_cache::WriteCacheFilter;

use crate::ds::resource::ResourceType;
use crate::http::CanonicalUri;

/// Returns the cache key for `uri` addressing a `resource_type`.
///
/// Instances are keyed by absolute path; collection pages by the full URI
/// including the query, since each query selects a different page.
pub(crate) fn cache_key(uri: &CanonicalUri, resource_type: &ResourceType) -> String {
    if resource_type.is_collection() {
        uri.to_string()
    } else {
        uri.absolute_path().to_string()
    }
}
