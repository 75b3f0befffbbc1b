//! Accounts.

use std::fmt;

use chrono::{DateTime, Utc};

use super::api_key::API_KEY_LIST;
use super::custom_data::CUSTOM_DATA_TYPE;
use super::directory::DIRECTORY;
use super::group::GROUP_LIST;
use crate::ds::{ResourceData, ResourceTag, ResourceType, CUSTOM_DATA, HREF};

pub(crate) static ACCOUNT: ResourceType = ResourceType::instance("Account")
    .tagged(ResourceTag::Account)
    .with_references(&[
        ("directory", &DIRECTORY),
        ("groups", &GROUP_LIST),
        (CUSTOM_DATA, &CUSTOM_DATA_TYPE),
        ("apiKeys", &API_KEY_LIST),
    ])
    .with_embedded(&[CUSTOM_DATA, "providerData"])
    .with_sensitive(&["password"])
    .extendable();

pub(crate) static ACCOUNT_LIST: ResourceType = ResourceType::collection("AccountList", &ACCOUNT);

/// Lifecycle status of an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountStatus {
    /// The account may log in.
    Enabled,
    /// The account may not log in.
    Disabled,
    /// The account is waiting for email verification.
    Unverified,
}

impl AccountStatus {
    /// Returns the wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enabled => "ENABLED",
            Self::Disabled => "DISABLED",
            Self::Unverified => "UNVERIFIED",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "ENABLED" => Some(Self::Enabled),
            "DISABLED" => Some(Self::Disabled),
            "UNVERIFIED" => Some(Self::Unverified),
            _ => None,
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

resource!(
    /// A user account.
    ///
    /// The password is write-only: it is sent on create and save but never
    /// returned by the server and never cached.
    ///
    /// # Example
    ///
    /// ```rust
    /// use idm_sdk::resources::{Account, AccountStatus};
    /// use idm_sdk::ds::Resource;
    ///
    /// let mut account = Account::new();
    /// account.set_email("joan@example.com");
    /// account.set_given_name("Joan");
    /// account.set_password("Changeme1!");
    /// account.set_status(AccountStatus::Enabled);
    ///
    /// assert_eq!(account.given_name().as_deref(), Some("Joan"));
    /// assert!(account.data().is_dirty());
    /// ```
    Account => ACCOUNT
);

impl Account {
    /// Creates a new, unsaved account.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: ResourceData::new(),
        }
    }

    #[must_use]
    pub fn username(&self) -> Option<String> {
        self.data.get_str("username")
    }

    pub fn set_username(&mut self, username: &str) {
        self.data.set("username", username);
    }

    #[must_use]
    pub fn email(&self) -> Option<String> {
        self.data.get_str("email")
    }

    pub fn set_email(&mut self, email: &str) {
        self.data.set("email", email);
    }

    #[must_use]
    pub fn given_name(&self) -> Option<String> {
        self.data.get_str("givenName")
    }

    pub fn set_given_name(&mut self, given_name: &str) {
        self.data.set("givenName", given_name);
    }

    #[must_use]
    pub fn middle_name(&self) -> Option<String> {
        self.data.get_str("middleName")
    }

    pub fn set_middle_name(&mut self, middle_name: &str) {
        self.data.set("middleName", middle_name);
    }

    #[must_use]
    pub fn surname(&self) -> Option<String> {
        self.data.get_str("surname")
    }

    pub fn set_surname(&mut self, surname: &str) {
        self.data.set("surname", surname);
    }

    /// Returns the server-computed full name.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        self.data.get_str("fullName")
    }

    /// Sets the password sent with the next create or save.
    pub fn set_password(&mut self, password: &str) {
        self.data.set("password", password);
    }

    /// Returns the status, if known.
    #[must_use]
    pub fn status(&self) -> Option<AccountStatus> {
        self.data
            .get_str("status")
            .as_deref()
            .and_then(AccountStatus::parse)
    }

    pub fn set_status(&mut self, status: AccountStatus) {
        self.data.set("status", status.as_str());
    }

    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.data.get_date("createdAt")
    }

    #[must_use]
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.data.get_date("modifiedAt")
    }

    /// Returns the href of the owning directory.
    #[must_use]
    pub fn directory_href(&self) -> Option<String> {
        self.data
            .get_map("directory")
            .and_then(|directory| directory.get(HREF)?.as_str().map(str::to_string))
    }
}

impl Default for Account {
    fn default() -> Self {
        Self::new()
    }
}

collection_resource!(
    /// A page of accounts.
    AccountList => ACCOUNT_LIST of Account
);
