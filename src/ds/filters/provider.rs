//! Provider account results.

use serde_json::Value;

use crate::ds::errors::DataStoreError;
use crate::ds::filter::{
    Filter, FilterChain, ResourceAction, ResourceDataRequest, ResourceDataResult,
};
use crate::ds::resource::ResourceTag;

/// Property telling whether a provider login created the account.
pub const IS_NEW_ACCOUNT: &str = "isNewAccount";

/// Marks provider account results as new when the server created the account.
///
/// The server answers `201 Created` for a first login through a provider and
/// `200 OK` for an existing account; the flag is derived from that.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProviderAccountResultFilter;

impl ProviderAccountResultFilter {
    /// Creates the filter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Filter for ProviderAccountResultFilter {
    fn filter(
        &self,
        request: ResourceDataRequest,
        chain: FilterChain<'_>,
    ) -> Result<ResourceDataResult, DataStoreError> {
        let mut result = chain.filter(request)?;

        if result.resource_type.tag() == ResourceTag::ProviderAccountResult {
            let is_new = result.action == ResourceAction::Create;
            result
                .data
                .insert(IS_NEW_ACCOUNT.to_string(), Value::Bool(is_new));
        }

        Ok(result)
    }

    fn name(&self) -> &'static str {
        "provider-account-result"
    }
}
