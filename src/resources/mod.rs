//! Resource schemas.
//!
//! Each resource is a thin typed view over [`ResourceData`](crate::ds::ResourceData)
//! with a static [`ResourceType`](crate::ds::ResourceType) descriptor. The
//! descriptors declare what the data store needs to know about the type:
//! nested references, raw map properties, properties that are never cached and
//! so on.
//!
//! # Available Resources
//!
//! - [`Account`], [`AccountList`] - user accounts
//! - [`Group`], [`GroupList`] - account groups
//! - [`Directory`], [`Application`] - account stores and applications
//! - [`CustomData`] - free-form data attached to extendable resources
//! - [`ApiKey`], [`ApiKeyList`] - API keys, with encrypted secrets
//! - [`LoginAttempt`] - username/password authentication
//! - [`ProviderAccountAccess`], [`ProviderAccountResult`] - social/provider login
//! - [`SamlProvider`] - SAML identity provider settings
//! - [`ModeledEmailTemplate`] - email templates with a default model
//! - [`PasswordResetToken`], [`EmailVerificationToken`], [`AccessToken`] - tokens
//! - [`Factor`], [`FactorList`] - polymorphic multi-factor authentication factors

macro_rules! resource {
    ($(#[$meta:meta])* $name:ident => $descriptor:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name {
            data: $crate::ds::ResourceData,
        }

        impl $crate::ds::Resource for $name {
            fn resource_type(&self) -> &'static $crate::ds::ResourceType {
                &$descriptor
            }

            fn data(&self) -> &$crate::ds::ResourceData {
                &self.data
            }

            fn data_mut(&mut self) -> &mut $crate::ds::ResourceData {
                &mut self.data
            }
        }

        impl $crate::ds::TypedResource for $name {
            fn declared_type() -> &'static $crate::ds::ResourceType {
                &$descriptor
            }
        }

        impl $crate::ds::FromResourceData for $name {
            fn from_data(data: $crate::ds::ResourceData) -> Self {
                Self { data }
            }
        }
    };
}

macro_rules! collection_resource {
    ($(#[$meta:meta])* $name:ident => $descriptor:ident of $item:ty) => {
        resource!($(#[$meta])* $name => $descriptor);

        impl $crate::ds::CollectionResource for $name {
            type Item = $item;
        }
    };
}

mod account;
mod api_key;
mod auth;
mod custom_data;
mod directory;
mod email_template;
mod factor;
mod group;
mod saml;

pub use account::{Account, AccountList, AccountStatus};
pub use api_key::{ApiKey, ApiKeyList};
pub use auth::{
    AccessToken, EmailVerificationToken, LoginAttempt, PasswordResetToken, ProviderAccountAccess,
    ProviderAccountResult,
};
pub use custom_data::CustomData;
pub use directory::{Application, Directory};
pub use email_template::ModeledEmailTemplate;
pub use factor::{Factor, FactorList, GoogleAuthenticatorFactor, SmsFactor};
pub use group::{Group, GroupList};
pub use saml::SamlProvider;

use crate::ds::ResourceFactory;

/// Registers every resource type of this module with `factory`.
pub fn register_defaults(factory: &mut ResourceFactory) {
    factory
        .register::<Account>()
        .register::<AccountList>()
        .register::<Group>()
        .register::<GroupList>()
        .register::<Directory>()
        .register::<Application>()
        .register::<CustomData>()
        .register::<ApiKey>()
        .register::<ApiKeyList>()
        .register::<LoginAttempt>()
        .register::<ProviderAccountAccess>()
        .register::<ProviderAccountResult>()
        .register::<SamlProvider>()
        .register::<ModeledEmailTemplate>()
        .register::<PasswordResetToken>()
        .register::<EmailVerificationToken>()
        .register::<AccessToken>()
        .register::<SmsFactor>()
        .register::<GoogleAuthenticatorFactor>()
        .register::<FactorList>()
        .register_subtypes(Factor::dispatch());
}
