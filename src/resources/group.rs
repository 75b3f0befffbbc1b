//! Groups.

use super::account::ACCOUNT_LIST;
use super::custom_data::CUSTOM_DATA_TYPE;
use super::directory::DIRECTORY;
use crate::ds::{ResourceData, ResourceType, CUSTOM_DATA};

pub(crate) static GROUP: ResourceType = ResourceType::instance("Group")
    .with_references(&[
        ("directory", &DIRECTORY),
        ("accounts", &ACCOUNT_LIST),
        (CUSTOM_DATA, &CUSTOM_DATA_TYPE),
    ])
    .with_embedded(&[CUSTOM_DATA])
    .extendable();

pub(crate) static GROUP_LIST: ResourceType = ResourceType::collection("GroupList", &GROUP);

resource!(
    /// A named group of accounts within a directory.
    Group => GROUP
);

impl Group {
    /// Creates a new, unsaved group named `name`.
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

    #[must_use]
    pub fn status(&self) -> Option<String> {
        self.data.get_str("status")
    }
}

collection_resource!(
    /// A page of groups.
    GroupList => GROUP_LIST of Group
);
