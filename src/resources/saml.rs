//! SAML identity providers.

use serde_json::Value;

use crate::ds::{ResourceType, ITEMS};

const MAPPING_RULES: &str = "attributeStatementMappingRules";

pub(crate) static SAML_PROVIDER: ResourceType =
    ResourceType::instance("SamlProvider").with_rule_sets(&[MAPPING_RULES]);

resource!(
    /// A SAML identity provider backing a directory.
    ///
    /// Attribute mapping rules are a set: duplicates are dropped when the
    /// provider is saved.
    SamlProvider => SAML_PROVIDER
);

impl SamlProvider {
    #[must_use]
    pub fn sso_login_url(&self) -> Option<String> {
        self.data.get_str("ssoLoginUrl")
    }

    #[must_use]
    pub fn sso_logout_url(&self) -> Option<String> {
        self.data.get_str("ssoLogoutUrl")
    }

    /// Returns the mapping rules, whichever shape the server used.
    #[must_use]
    pub fn attribute_statement_mapping_rules(&self) -> Vec<Value> {
        match self.data.get(MAPPING_RULES) {
            Some(Value::Array(rules)) => rules,
            Some(Value::Object(mut page)) => match page.remove(ITEMS) {
                Some(Value::Array(rules)) => rules,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    pub fn set_attribute_statement_mapping_rules(&mut self, rules: Vec<Value>) {
        self.data.set(MAPPING_RULES, Value::Array(rules));
    }
}
