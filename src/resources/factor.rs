//! Multi-factor authentication factors.
//!
//! A factor's concrete kind is named by its `type` property. Reading a
//! [`Factor`] through the data store yields the matching variant; an unknown
//! type is an error rather than a silent fallback.

use crate::ds::{
    FromResourceData, Resource, ResourceData, ResourceType, SubtypeDispatch, TypedResource,
};

const FACTOR_TYPE: &str = "type";

pub(crate) static FACTOR: ResourceType = ResourceType::instance("Factor");

pub(crate) static FACTOR_LIST: ResourceType = ResourceType::collection("FactorList", &FACTOR);

resource!(
    /// A factor delivering one-time codes by text message.
    SmsFactor => FACTOR
);

impl SmsFactor {
    /// Creates an unsaved SMS factor for `phone_number`.
    #[must_use]
    pub fn new(phone_number: &str) -> Self {
        let mut data = ResourceData::new();
        data.set(FACTOR_TYPE, "SMS");
        data.set("phone", serde_json::json!({ "number": phone_number }));
        Self { data }
    }

    #[must_use]
    pub fn phone_number(&self) -> Option<String> {
        self.data
            .get_map("phone")
            .and_then(|phone| phone.get("number")?.as_str().map(str::to_string))
    }
}

resource!(
    /// A time-based one-time password factor.
    GoogleAuthenticatorFactor => FACTOR
);

impl GoogleAuthenticatorFactor {
    /// Creates an unsaved authenticator factor labelled `account_name`.
    #[must_use]
    pub fn new(account_name: &str) -> Self {
        let mut data = ResourceData::new();
        data.set(FACTOR_TYPE, "google-authenticator");
        data.set("accountName", account_name);
        Self { data }
    }

    #[must_use]
    pub fn account_name(&self) -> Option<String> {
        self.data.get_str("accountName")
    }

    /// Returns the shared secret, present only in the creation response.
    #[must_use]
    pub fn secret(&self) -> Option<String> {
        self.data.get_str("secret")
    }

    #[must_use]
    pub fn key_uri(&self) -> Option<String> {
        self.data.get_str("keyUri")
    }
}

/// A factor of any supported kind.
#[derive(Clone, Debug)]
pub enum Factor {
    /// `type: "SMS"`.
    Sms(SmsFactor),
    /// `type: "google-authenticator"`.
    GoogleAuthenticator(GoogleAuthenticatorFactor),
}

impl Factor {
    /// Returns the dispatch table the data store builds factors with.
    #[must_use]
    pub fn dispatch() -> SubtypeDispatch<Self> {
        SubtypeDispatch::new(FACTOR_TYPE)
            .variant("SMS", |data| Self::Sms(SmsFactor::from_data(data)))
            .variant("google-authenticator", |data| {
                Self::GoogleAuthenticator(GoogleAuthenticatorFactor::from_data(data))
            })
    }

    #[must_use]
    pub fn status(&self) -> Option<String> {
        self.data().get_str("status")
    }

    #[must_use]
    pub fn verification_status(&self) -> Option<String> {
        self.data().get_str("verificationStatus")
    }
}

impl Resource for Factor {
    fn resource_type(&self) -> &'static ResourceType {
        &FACTOR
    }

    fn data(&self) -> &ResourceData {
        match self {
            Self::Sms(factor) => factor.data(),
            Self::GoogleAuthenticator(factor) => factor.data(),
        }
    }

    fn data_mut(&mut self) -> &mut ResourceData {
        match self {
            Self::Sms(factor) => factor.data_mut(),
            Self::GoogleAuthenticator(factor) => factor.data_mut(),
        }
    }
}

impl TypedResource for Factor {
    fn declared_type() -> &'static ResourceType {
        &FACTOR
    }
}

impl From<SmsFactor> for Factor {
    fn from(factor: SmsFactor) -> Self {
        Self::Sms(factor)
    }
}

impl From<GoogleAuthenticatorFactor> for Factor {
    fn from(factor: GoogleAuthenticatorFactor) -> Self {
        Self::GoogleAuthenticator(factor)
    }
}

collection_resource!(
    /// A page of factors.
    FactorList => FACTOR_LIST of Factor
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ds::{DataStoreError, PropertyMap};
    use serde_json::json;

    fn data(value: serde_json::Value) -> ResourceData {
        ResourceData::from_properties(value.as_object().cloned().unwrap_or_else(PropertyMap::new))
    }

    #[test]
    fn test_dispatch_picks_variant_case_insensitively() {
        let factor = Factor::dispatch()
            .resolve(data(json!({"href": "factors/1", "type": "sms"})))
            .unwrap();
        assert!(matches!(factor, Factor::Sms(_)));

        let factor = Factor::dispatch()
            .resolve(data(json!({"href": "factors/2", "type": "google-authenticator"})))
            .unwrap();
        assert!(matches!(factor, Factor::GoogleAuthenticator(_)));
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let error = Factor::dispatch()
            .resolve(data(json!({"href": "factors/3", "type": "email"})))
            .unwrap_err();
        assert!(matches!(
            error,
            DataStoreError::UnknownSubtype { resource: "Factor", ref discriminator } if discriminator == "email"
        ));
    }

    #[test]
    fn test_new_factors_carry_their_type() {
        let sms = Factor::from(SmsFactor::new("+15555550100"));
        assert_eq!(sms.data().get_str(FACTOR_TYPE).as_deref(), Some("SMS"));
        if let Factor::Sms(inner) = &sms {
            assert_eq!(inner.phone_number().as_deref(), Some("+15555550100"));
        }
    }
}
