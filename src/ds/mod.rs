//! The resource data store.
//!
//! This module maps typed resources to and from the remote API:
//!
//! - [`DataStore`]: get, create, save and delete resources
//! - [`ResourceData`] and [`ResourceType`]: the resource model
//! - [`EnlistmentRegistry`]: the href-keyed identity map
//! - [`ResourceConverter`]: which properties are sent, and in which shape
//! - [`MapMarshaller`]: property maps to and from JSON
//! - [`ResourceFactory`]: typed construction, including polymorphic types
//! - [`FilterPipeline`] and [`filters`]: the request/response filter chain
//!
//! # Identity
//!
//! Loading the same href twice, from any thread, yields two resource values
//! backed by the same property map:
//!
//! ```rust,ignore
//! let a: Account = data_store.get_resource("/accounts/1", None)?;
//! let mut b: Account = data_store.get_resource("/accounts/1", None)?;
//! b.set_given_name("Joan");
//! assert_eq!(a.given_name().as_deref(), Some("Joan"));
//! ```

mod converter;
mod datastore;
mod enlistment;
mod errors;
mod factory;
mod filter;
pub mod filters;
mod handler;
mod marshal;
mod resource;

pub use converter::{ConversionMode, ResourceConverter};
pub use datastore::{DataStore, DataStoreBuilder};
pub use enlistment::{Enlistment, EnlistmentRegistry};
pub use errors::{ApiError, DataStoreError, MarshalDirection, MarshalingError, ResourceException};
pub use factory::{ResourceFactory, SubtypeDispatch};
pub use filter::{
    Filter, FilterChain, FilterPipeline, Handler, ResourceAction, ResourceDataRequest,
    ResourceDataResult,
};
pub use handler::HttpResourceHandler;
pub use marshal::{JsonMapMarshaller, MapMarshaller, DEFAULT_LIMIT};
pub use resource::{
    is_instance_shaped, is_materialized, reference, CollectionResource, FromResourceData,
    PropertyMap, Resource, ResourceData, ResourceKind, ResourceTag, ResourceType, TypedResource,
    CUSTOM_DATA, HREF, ITEMS, LIMIT, LOCAL_HREF, OFFSET, SIZE,
};
