//! API keys.

use super::account::ACCOUNT;
use crate::ds::filters::API_KEY_META_DATA;
use crate::ds::{ResourceTag, ResourceType};

pub(crate) static API_KEY: ResourceType = ResourceType::instance("ApiKey")
    .tagged(ResourceTag::ApiKey)
    .with_references(&[("account", &ACCOUNT)])
    .with_raw_maps(&[API_KEY_META_DATA]);

pub(crate) static API_KEY_LIST: ResourceType =
    ResourceType::collection("ApiKeyList", &API_KEY).tagged(ResourceTag::ApiKey);

resource!(
    /// An account API key.
    ///
    /// The server returns the secret encrypted; when the data store has client
    /// credentials and a secret decryptor, [`secret`](ApiKey::secret) holds the
    /// plaintext.
    ApiKey => API_KEY
);

impl ApiKey {
    #[must_use]
    pub fn id(&self) -> Option<String> {
        self.data.get_str("id")
    }

    #[must_use]
    pub fn secret(&self) -> Option<String> {
        self.data.get_str("secret")
    }

    #[must_use]
    pub fn status(&self) -> Option<String> {
        self.data.get_str("status")
    }

    pub fn set_status(&mut self, status: &str) {
        self.data.set("status", status);
    }

    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.data.get_str("name")
    }

    pub fn set_name(&mut self, name: &str) {
        self.data.set("name", name);
    }
}

collection_resource!(
    /// A page of API keys.
    ApiKeyList => API_KEY_LIST of ApiKey
);
