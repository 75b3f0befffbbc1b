//! Resource construction.
//!
//! The data store never guesses how to build a resource. Every type it hands
//! out is constructed through a [`ResourceFactory`] registry keyed by the
//! Rust type. Polymorphic types (such as a multi-factor authentication factor
//! whose concrete kind depends on a `type` property) register a
//! [`SubtypeDispatch`] table instead of a plain constructor.
//!
//! # Example
//!
//! ```rust
//! use idm_sdk::ds::ResourceFactory;
//! use idm_sdk::resources::Account;
//!
//! let factory = ResourceFactory::with_defaults();
//! assert!(factory.is_registered::<Account>());
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::ds::errors::DataStoreError;
use crate::ds::resource::{FromResourceData, ResourceData, TypedResource};

type Constructor =
    Arc<dyn Fn(ResourceData) -> Result<Box<dyn Any + Send>, DataStoreError> + Send + Sync>;

/// Registry of resource constructors.
#[derive(Clone, Default)]
pub struct ResourceFactory {
    constructors: HashMap<TypeId, Constructor>,
}

// Verify ResourceFactory is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ResourceFactory>();
};

impl ResourceFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory with every resource type shipped by this crate.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut factory = Self::new();
        crate::resources::register_defaults(&mut factory);
        factory
    }

    /// Registers `T`, built directly from its data.
    pub fn register<T: FromResourceData>(&mut self) -> &mut Self {
        self.constructors.insert(
            TypeId::of::<T>(),
            Arc::new(|data| Ok(Box::new(T::from_data(data)) as Box<dyn Any + Send>)),
        );
        self
    }

    /// Registers the polymorphic type `T`, built through `dispatch`.
    pub fn register_subtypes<T: TypedResource>(
        &mut self,
        dispatch: SubtypeDispatch<T>,
    ) -> &mut Self {
        self.constructors.insert(
            TypeId::of::<T>(),
            Arc::new(move |data| {
                dispatch
                    .resolve(data)
                    .map(|resource| Box::new(resource) as Box<dyn Any + Send>)
            }),
        );
        self
    }

    /// Returns `true` if `T` can be instantiated.
    #[must_use]
    pub fn is_registered<T: 'static>(&self) -> bool {
        self.constructors.contains_key(&TypeId::of::<T>())
    }

    /// Builds a `T` around `data`.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::UnregisteredResource`] if `T` was never
    /// registered, or [`DataStoreError::UnknownSubtype`] if a polymorphic
    /// payload names a variant with no constructor.
    pub fn instantiate<T: TypedResource>(&self, data: ResourceData) -> Result<T, DataStoreError> {
        let constructor = self.constructors.get(&TypeId::of::<T>()).ok_or(
            DataStoreError::UnregisteredResource {
                resource: T::declared_type().name(),
            },
        )?;

        let built = constructor(data)?;
        built.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
            DataStoreError::IllegalState(format!(
                "constructor registered for {} produced another type",
                T::declared_type().name()
            ))
        })
    }
}

impl fmt::Debug for ResourceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceFactory")
            .field("registered", &self.constructors.len())
            .finish()
    }
}

/// Table mapping a discriminator property value to a variant constructor.
///
/// Discriminator values are compared case-insensitively.
///
/// # Example
///
/// ```rust
/// use idm_sdk::ds::SubtypeDispatch;
/// use idm_sdk::resources::{Factor, GoogleAuthenticatorFactor, SmsFactor};
/// use idm_sdk::ds::FromResourceData;
///
/// let dispatch = SubtypeDispatch::<Factor>::new("type")
///     .variant("SMS", |data| Factor::Sms(SmsFactor::from_data(data)))
///     .variant("google-authenticator", |data| {
///         Factor::GoogleAuthenticator(GoogleAuthenticatorFactor::from_data(data))
///     });
/// assert_eq!(dispatch.discriminator(), "type");
/// ```
pub struct SubtypeDispatch<T> {
    discriminator: &'static str,
    variants: Vec<(String, fn(ResourceData) -> T)>,
}

impl<T: TypedResource> SubtypeDispatch<T> {
    /// Creates an empty table keyed by the `discriminator` property.
    #[must_use]
    pub const fn new(discriminator: &'static str) -> Self {
        Self {
            discriminator,
            variants: Vec::new(),
        }
    }

    /// Adds a variant.
    #[must_use]
    pub fn variant(mut self, value: &str, constructor: fn(ResourceData) -> T) -> Self {
        self.variants.push((value.to_string(), constructor));
        self
    }

    /// Returns the discriminator property name.
    #[must_use]
    pub const fn discriminator(&self) -> &'static str {
        self.discriminator
    }

    /// Builds the variant named by the data's discriminator.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::UnknownSubtype`] if the discriminator is
    /// missing or names no registered variant.
    pub fn resolve(&self, data: ResourceData) -> Result<T, DataStoreError> {
        let value = data.get_str(self.discriminator).unwrap_or_default();

        let constructor = self
            .variants
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&value))
            .map(|(_, constructor)| *constructor)
            .ok_or_else(|| DataStoreError::UnknownSubtype {
                resource: T::declared_type().name(),
                discriminator: value.clone(),
            })?;

        Ok(constructor(data))
    }
}

impl<T> fmt::Debug for SubtypeDispatch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubtypeDispatch")
            .field("discriminator", &self.discriminator)
            .field(
                "variants",
                &self.variants.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .finish()
    }
}
