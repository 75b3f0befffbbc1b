//! Authentication requests, results and tokens.

use base64::prelude::*;
use serde_json::Value;

use super::account::ACCOUNT;
use crate::ds::filters::IS_NEW_ACCOUNT;
use crate::ds::{PropertyMap, ResourceData, ResourceTag, ResourceType, HREF};

pub(crate) static LOGIN_ATTEMPT: ResourceType = ResourceType::instance("LoginAttempt")
    .tagged(ResourceTag::LoginAttempt)
    .with_raw_maps(&["accountStore"]);

pub(crate) static PROVIDER_ACCOUNT_ACCESS: ResourceType =
    ResourceType::instance("ProviderAccountAccess")
        .tagged(ResourceTag::ProviderAccountAccess)
        .with_embedded(&["providerData"]);

pub(crate) static PROVIDER_ACCOUNT_RESULT: ResourceType =
    ResourceType::instance("ProviderAccountResult")
        .tagged(ResourceTag::ProviderAccountResult)
        .with_references(&[("account", &ACCOUNT)]);

pub(crate) static PASSWORD_RESET_TOKEN: ResourceType = ResourceType::instance("PasswordResetToken")
    .tagged(ResourceTag::PasswordResetToken)
    .with_references(&[("account", &ACCOUNT)])
    .with_sensitive(&["password"]);

pub(crate) static EMAIL_VERIFICATION_TOKEN: ResourceType =
    ResourceType::instance("EmailVerificationToken").tagged(ResourceTag::EmailVerificationToken);

pub(crate) static ACCESS_TOKEN: ResourceType = ResourceType::instance("AccessToken")
    .tagged(ResourceTag::AccessToken)
    .with_references(&[("account", &ACCOUNT)])
    .with_raw_maps(&["expandedJwt"]);

fn account_href(data: &ResourceData) -> Option<String> {
    data.get_map("account")
        .and_then(|account| account.get(HREF)?.as_str().map(str::to_string))
}

resource!(
    /// A username/password login attempt. Always sent to the server.
    LoginAttempt => LOGIN_ATTEMPT
);

impl LoginAttempt {
    /// Builds a `basic` attempt: the value is `base64("username:password")`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use idm_sdk::resources::LoginAttempt;
    ///
    /// let attempt = LoginAttempt::basic("joan", "secret");
    /// assert_eq!(attempt.attempt_type().as_deref(), Some("basic"));
    /// assert_eq!(attempt.value().as_deref(), Some("am9hbjpzZWNyZXQ="));
    /// ```
    #[must_use]
    pub fn basic(username: &str, password: &str) -> Self {
        let mut data = ResourceData::new();
        data.set("type", "basic");
        data.set(
            "value",
            BASE64_STANDARD.encode(format!("{username}:{password}")),
        );
        Self { data }
    }

    #[must_use]
    pub fn attempt_type(&self) -> Option<String> {
        self.data.get_str("type")
    }

    #[must_use]
    pub fn value(&self) -> Option<String> {
        self.data.get_str("value")
    }

    /// Restricts authentication to one account store.
    ///
    /// The store is submitted as given, `{"href": ...}` or a name-key map.
    pub fn set_account_store(&mut self, account_store: PropertyMap) {
        self.data.set("accountStore", Value::Object(account_store));
    }
}

resource!(
    /// A login request through a third-party provider.
    ///
    /// `providerData` is submitted verbatim, e.g.
    /// `{"providerId": "google", "code": "..."}`.
    ProviderAccountAccess => PROVIDER_ACCOUNT_ACCESS
);

impl ProviderAccountAccess {
    #[must_use]
    pub fn new(provider_data: PropertyMap) -> Self {
        let mut data = ResourceData::new();
        data.set("providerData", Value::Object(provider_data));
        Self { data }
    }
}

resource!(
    /// The outcome of a provider login.
    ProviderAccountResult => PROVIDER_ACCOUNT_RESULT
);

impl ProviderAccountResult {
    /// Returns `true` if the login created the account.
    #[must_use]
    pub fn is_new_account(&self) -> bool {
        self.data.get_bool(IS_NEW_ACCOUNT).unwrap_or(false)
    }

    #[must_use]
    pub fn account_href(&self) -> Option<String> {
        account_href(&self.data)
    }
}

resource!(
    /// A password reset token. Never cached.
    PasswordResetToken => PASSWORD_RESET_TOKEN
);

impl PasswordResetToken {
    /// Requests a reset for the account with `email`.
    #[must_use]
    pub fn for_email(email: &str) -> Self {
        let mut data = ResourceData::new();
        data.set("email", email);
        Self { data }
    }

    #[must_use]
    pub fn email(&self) -> Option<String> {
        self.data.get_str("email")
    }

    /// Sets the new password sent when the token is consumed.
    pub fn set_password(&mut self, password: &str) {
        self.data.set("password", password);
    }

    #[must_use]
    pub fn account_href(&self) -> Option<String> {
        account_href(&self.data)
    }
}

resource!(
    /// An email verification token.
    ///
    /// Consuming one returns the verified account, whose cached copy is then
    /// evicted.
    EmailVerificationToken => EMAIL_VERIFICATION_TOKEN
);

resource!(
    /// An OAuth access token. Never cached.
    AccessToken => ACCESS_TOKEN
);

impl AccessToken {
    /// Returns the compact JWT.
    #[must_use]
    pub fn jwt(&self) -> Option<String> {
        self.data.get_str("jwt")
    }

    /// Returns the decoded claims, as returned by the server.
    #[must_use]
    pub fn expanded_jwt(&self) -> Option<PropertyMap> {
        self.data.get_map("expandedJwt")
    }

    #[must_use]
    pub fn account_href(&self) -> Option<String> {
        account_href(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ds::{ConversionMode, Resource, ResourceConverter};
    use serde_json::json;

    #[test]
    fn test_account_store_is_submitted_verbatim() {
        let mut attempt = LoginAttempt::basic("joan", "secret");
        let store = json!({"href": "directories/1", "name": "Main"});
        attempt.set_account_store(store.as_object().unwrap().clone());

        let converted =
            ResourceConverter.convert(&LOGIN_ATTEMPT, attempt.data(), ConversionMode::Full);
        assert_eq!(converted["accountStore"], store);
    }

    #[test]
    fn test_tokens_are_never_written_to_cache() {
        assert!(!PASSWORD_RESET_TOKEN.writes_to_cache());
        assert!(!ACCESS_TOKEN.writes_to_cache());
        assert!(!PROVIDER_ACCOUNT_RESULT.writes_to_cache());
        assert!(!LOGIN_ATTEMPT.reads_from_cache());
        assert!(!PROVIDER_ACCOUNT_ACCESS.reads_from_cache());
    }

    #[test]
    fn test_new_account_flag_defaults_to_false() {
        let result = <ProviderAccountResult as crate::ds::FromResourceData>::from_data(
            ResourceData::new(),
        );
        assert!(!result.is_new_account());
    }
}
