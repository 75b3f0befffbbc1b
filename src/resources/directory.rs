//! Directories and applications.

use super::account::ACCOUNT_LIST;
use super::api_key::API_KEY_LIST;
use super::custom_data::CUSTOM_DATA_TYPE;
use super::group::GROUP_LIST;
use crate::ds::{ResourceData, ResourceType, CUSTOM_DATA};

pub(crate) static DIRECTORY: ResourceType = ResourceType::instance("Directory")
    .with_references(&[
        ("accounts", &ACCOUNT_LIST),
        ("groups", &GROUP_LIST),
        (CUSTOM_DATA, &CUSTOM_DATA_TYPE),
    ])
    .with_raw_maps(&["provider"])
    .with_embedded(&[CUSTOM_DATA])
    .extendable();

pub(crate) static APPLICATION: ResourceType = ResourceType::instance("Application")
    .with_references(&[
        ("accounts", &ACCOUNT_LIST),
        ("groups", &GROUP_LIST),
        ("apiKeys", &API_KEY_LIST),
        (CUSTOM_DATA, &CUSTOM_DATA_TYPE),
    ])
    .with_embedded(&[CUSTOM_DATA])
    .extendable();

resource!(
    /// An account store: owns accounts and groups.
    Directory => DIRECTORY
);

impl Directory {
    /// Creates a new, unsaved directory named `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut data = ResourceData::new();
        data.set("name", name);
        Self { data }
    }

    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.data.get_str("name")
    }

    pub fn set_name(&mut self, name: &str) {
        self.data.set("name", name);
    }

    #[must_use]
    pub fn description(&self) -> Option<String> {
        self.data.get_str("description")
    }

    pub fn set_description(&mut self, description: &str) {
        self.data.set("description", description);
    }
}

resource!(
    /// An application that authenticates accounts from its mapped stores.
    Application => APPLICATION
);

impl Application {
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.data.get_str("name")
    }

    pub fn set_name(&mut self, name: &str) {
        self.data.set("name", name);
    }
}
