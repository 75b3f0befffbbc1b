//! Email templates.

use crate::ds::{PropertyMap, ResourceType};

pub(crate) static MODELED_EMAIL_TEMPLATE: ResourceType =
    ResourceType::instance("ModeledEmailTemplate").with_raw_maps(&["defaultModel"]);

resource!(
    /// An email template whose placeholders are filled from `defaultModel`.
    ModeledEmailTemplate => MODELED_EMAIL_TEMPLATE
);

impl ModeledEmailTemplate {
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.data.get_str("name")
    }

    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.data.get_str("subject")
    }

    pub fn set_subject(&mut self, subject: &str) {
        self.data.set("subject", subject);
    }

    #[must_use]
    pub fn html_body(&self) -> Option<String> {
        self.data.get_str("htmlBody")
    }

    pub fn set_html_body(&mut self, html_body: &str) {
        self.data.set("htmlBody", html_body);
    }

    #[must_use]
    pub fn default_model(&self) -> Option<PropertyMap> {
        self.data.get_map("defaultModel")
    }

    /// Replaces the default model. Sent as a plain map, never as a reference.
    pub fn set_default_model(&mut self, model: PropertyMap) {
        self.data.set("defaultModel", serde_json::Value::Object(model));
    }
}
