//! The data store.
//!
//! [`DataStore`] is the single entry point through which resources are read,
//! created, updated and deleted. Every call is canonicalized, converted and
//! sent through the filter pipeline; the resulting data is bound to the
//! identity map and wrapped in the requested resource type by the factory.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::cache::{cache_manager_for, CacheManager, CacheRegionNameResolver, CacheResolver};
use crate::config::ClientConfig;
use crate::ds::converter::{ConversionMode, ResourceConverter};
use crate::ds::enlistment::EnlistmentRegistry;
use crate::ds::errors::DataStoreError;
use crate::ds::factory::{ResourceFactory, SubtypeDispatch};
use crate::ds::filter::{FilterPipeline, ResourceAction, ResourceDataRequest, ResourceDataResult};
use crate::ds::filters::{
    AesSecretDecryptor, ApiKeyQueryFilter, DecryptApiKeySecretFilter, EnlistmentFilter,
    ProviderAccountResultFilter, ReadCacheFilter, SecretDecryptor, WriteCacheFilter,
};
use crate::ds::handler::HttpResourceHandler;
use crate::ds::marshal::{JsonMapMarshaller, MapMarshaller};
use crate::ds::resource::{
    is_instance_shaped, CollectionResource, PropertyMap, Resource, ResourceData, ResourceType,
    TypedResource, HREF, ITEMS, LIMIT, OFFSET,
};
use crate::error::ConfigError;
use crate::http::{user_agent, Canonicalizer, QueryString, ReqwestRequestExecutor, RequestExecutor};

/// Reads and writes resources through the filter pipeline.
///
/// # Thread Safety
///
/// `DataStore` is `Send + Sync`; share one instance via `Arc` across threads.
/// All instances loaded for the same href, from any thread, share one property
/// map.
///
/// # Example
///
/// ```rust,ignore
/// use idm_sdk::ds::DataStore;
/// use idm_sdk::resources::Account;
/// use idm_sdk::{ApiKeyCredentials, BaseUrl, ClientConfig};
///
/// let config = ClientConfig::builder()
///     .base_url(BaseUrl::new("https://api.example.com/v1")?)
///     .credentials(ApiKeyCredentials::new("id", "secret")?)
///     .build()?;
/// let data_store = DataStore::builder().config(config).build()?;
///
/// let mut account: Account = data_store.get_resource("/accounts/1", None)?;
/// account.set_given_name("Joan");
/// data_store.save(&mut account, None)?;
/// ```
pub struct DataStore {
    canonicalizer: Canonicalizer,
    pipeline: FilterPipeline,
    registry: Arc<EnlistmentRegistry>,
    cache: CacheResolver,
    factory: ResourceFactory,
    converter: ResourceConverter,
}

// Verify DataStore is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DataStore>();
};

impl DataStore {
    /// Returns a builder.
    #[must_use]
    pub fn builder() -> DataStoreBuilder {
        DataStoreBuilder::new()
    }

    /// Returns the canonicalizer resolving relative hrefs.
    #[must_use]
    pub const fn canonicalizer(&self) -> &Canonicalizer {
        &self.canonicalizer
    }

    /// Returns the identity map.
    #[must_use]
    pub fn enlistments(&self) -> &EnlistmentRegistry {
        &self.registry
    }

    /// Returns the cache used by the cache filters.
    #[must_use]
    pub const fn cache(&self) -> &CacheResolver {
        &self.cache
    }

    /// Returns the filter names in execution order, outermost first.
    #[must_use]
    pub fn filter_names(&self) -> Vec<&'static str> {
        self.pipeline.filter_names()
    }

    /// Creates a new, unpersisted resource.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::UnregisteredResource`] if `T` is unknown to the
    /// factory.
    pub fn instantiate<T: TypedResource>(&self) -> Result<T, DataStoreError> {
        self.factory.instantiate(ResourceData::new())
    }

    /// Creates a resource around existing properties without contacting the server.
    ///
    /// A bare `{"href": ...}` reference shares the live identity-map entry for
    /// that href when one exists.
    ///
    /// # Errors
    ///
    /// Returns the factory's errors.
    pub fn instantiate_with<T: TypedResource>(
        &self,
        properties: PropertyMap,
    ) -> Result<T, DataStoreError> {
        self.factory.instantiate(self.bind(properties))
    }

    /// Loads a resource or collection.
    ///
    /// # Arguments
    ///
    /// * `href` - Absolute href, or a path relative to the base URL
    /// * `query` - Extra query parameters; parameters embedded in `href` win
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::InvalidArgument`] for an empty href,
    /// [`DataStoreError::IllegalState`] if neither the cache nor the server
    /// produced any data, and any transport or API error.
    pub fn get_resource<T: TypedResource>(
        &self,
        href: &str,
        query: Option<&QueryString>,
    ) -> Result<T, DataStoreError> {
        let result = self.read(href, query, T::declared_type())?;
        self.factory.instantiate(Self::into_resource_data(result))
    }

    /// Fetches the full state of a reference, keeping local changes.
    ///
    /// Does nothing if the resource already holds more than its href.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::InvalidArgument`] if the resource has no href,
    /// and any error [`get_resource`](Self::get_resource) may return.
    pub fn materialize<T: Resource>(&self, resource: &mut T) -> Result<(), DataStoreError> {
        if resource.data().is_materialized() {
            return Ok(());
        }
        let href = Self::require_href(resource, "materialize")?;
        let query = resource.data().query().cloned();

        let result = self.read(&href, query.as_ref(), resource.resource_type())?;
        resource.data_mut().rebase(result.data, result.enlistment);
        Ok(())
    }

    /// Resolves a nested resource property of `parent`.
    ///
    /// Expanded nested data is bound to the identity map; a bare reference
    /// shares the live identity-map entry when one exists. Returns `None` when
    /// the property is absent or not a map.
    ///
    /// # Errors
    ///
    /// Returns the factory's errors.
    pub fn resource_property<R: TypedResource>(
        &self,
        parent: &impl Resource,
        name: &str,
    ) -> Result<Option<R>, DataStoreError> {
        parent
            .data()
            .get_map(name)
            .map(|properties| self.factory.instantiate(self.bind(properties)))
            .transpose()
    }

    /// Returns the items of a collection page.
    ///
    /// # Errors
    ///
    /// Returns the factory's errors.
    pub fn collection_items<C: CollectionResource>(
        &self,
        collection: &C,
    ) -> Result<Vec<C::Item>, DataStoreError> {
        let Some(Value::Array(items)) = collection.data().get(ITEMS) else {
            return Ok(Vec::new());
        };

        items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(properties) => Some(properties),
                _ => None,
            })
            .map(|properties| self.factory.instantiate(self.bind(properties)))
            .collect()
    }

    /// Loads the page following `collection`, if any.
    ///
    /// The query the page was loaded with is reused with an advanced offset.
    ///
    /// # Errors
    ///
    /// Returns any error [`get_resource`](Self::get_resource) may return.
    pub fn next_page<C: CollectionResource>(
        &self,
        collection: &C,
    ) -> Result<Option<C>, DataStoreError> {
        if !collection.has_next_page() {
            return Ok(None);
        }
        let href = Self::require_href(collection, "next_page")?;
        let path = href.split_once('?').map_or(href.as_str(), |(path, _)| path);

        let mut query = collection.data().query().cloned().unwrap_or_default();
        query.put(
            OFFSET,
            collection.offset().saturating_add(collection.limit()).to_string(),
        );
        query.put(LIMIT, collection.limit().to_string());

        self.get_resource(path, Some(&query)).map(Some)
    }

    /// Creates `resource` under `parent_href` and refreshes it with the server state.
    ///
    /// All set properties are sent. When the server accepts the request
    /// without returning a body (`202 Accepted`) the resource is left as is.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::InvalidArgument`] for an empty href and any
    /// transport, marshaling or API error.
    pub fn create<T: Resource>(
        &self,
        parent_href: &str,
        resource: &mut T,
        query: Option<&QueryString>,
    ) -> Result<(), DataStoreError> {
        let return_type = resource.resource_type();
        if let Some(result) =
            self.write(ResourceAction::Create, parent_href, resource, return_type, query)?
        {
            resource
                .data_mut()
                .refresh(result.data, result.enlistment);
        }
        Ok(())
    }

    /// Creates `resource` under `parent_href`, returning the server's answer as `R`.
    ///
    /// Returns `None` when the server sent no body.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`create`](Self::create) and the factory's errors.
    pub fn create_returning<T: Resource, R: TypedResource>(
        &self,
        parent_href: &str,
        resource: &T,
        query: Option<&QueryString>,
    ) -> Result<Option<R>, DataStoreError> {
        self.write(ResourceAction::Create, parent_href, resource, R::declared_type(), query)?
            .map(|result| self.factory.instantiate(Self::into_resource_data(result)))
            .transpose()
    }

    /// Sends the properties changed on `resource` and refreshes it with the server state.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::InvalidArgument`] if the resource was never
    /// persisted, and any transport, marshaling or API error.
    pub fn save<T: Resource>(
        &self,
        resource: &mut T,
        query: Option<&QueryString>,
    ) -> Result<(), DataStoreError> {
        let href = Self::require_href(resource, "save")?;
        let return_type = resource.resource_type();
        if let Some(result) =
            self.write(ResourceAction::Update, &href, resource, return_type, query)?
        {
            resource
                .data_mut()
                .refresh(result.data, result.enlistment);
        }
        Ok(())
    }

    /// Sends the properties changed on `resource`, returning the server's answer as `R`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`save`](Self::save) and the factory's errors.
    pub fn save_returning<T: Resource, R: TypedResource>(
        &self,
        resource: &T,
        query: Option<&QueryString>,
    ) -> Result<Option<R>, DataStoreError> {
        let href = Self::require_href(resource, "save")?;
        self.write(ResourceAction::Update, &href, resource, R::declared_type(), query)?
            .map(|result| self.factory.instantiate(Self::into_resource_data(result)))
            .transpose()
    }

    /// Deletes `resource`.
    ///
    /// The identity-map entry for its href is removed even if the call fails.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::InvalidArgument`] if the resource has no href,
    /// and any transport or API error.
    pub fn delete<T: Resource>(&self, resource: &T) -> Result<(), DataStoreError> {
        let href = Self::require_href(resource, "delete")?;
        let uri = self.canonicalizer.canonicalize(&href, None)?;
        tracing::debug!(%uri, "Deleting resource");

        self.pipeline.run(ResourceDataRequest::new(
            ResourceAction::Delete,
            uri,
            resource.resource_type(),
        ))?;
        Ok(())
    }

    /// Deletes the property `name` of `resource` on the server and locally.
    ///
    /// The owner's identity-map and cache entries are dropped, so the next
    /// load of the owner fetches fresh state.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::InvalidArgument`] if the resource has no href
    /// or `name` is empty, and any transport or API error.
    pub fn delete_property<T: Resource>(
        &self,
        resource: &mut T,
        name: &str,
    ) -> Result<(), DataStoreError> {
        if name.trim().is_empty() {
            return Err(DataStoreError::InvalidArgument(
                "property name cannot be empty".to_string(),
            ));
        }
        let href = Self::require_href(resource, "delete a property of")?;
        let owner = self.canonicalizer.canonicalize(&href, None)?;
        let uri = self
            .canonicalizer
            .canonicalize(&format!("{}/{name}", owner.absolute_path()), None)?;

        let outcome = self.pipeline.run(ResourceDataRequest::new(
            ResourceAction::Delete,
            uri,
            resource.resource_type(),
        ));

        self.registry.evict(owner.absolute_path());
        self.cache
            .evict(resource.resource_type(), owner.absolute_path());
        outcome?;

        resource.data_mut().remove(name);
        Ok(())
    }

    fn read(
        &self,
        href: &str,
        query: Option<&QueryString>,
        resource_type: &'static ResourceType,
    ) -> Result<ResourceDataResult, DataStoreError> {
        let uri = self.canonicalizer.canonicalize(href, query)?;
        let result = self
            .pipeline
            .run(ResourceDataRequest::new(ResourceAction::Read, uri, resource_type))?;

        if result.data.is_empty() {
            return Err(DataStoreError::IllegalState(format!(
                "Unable to obtain resource data from the API server or from cache for {href}."
            )));
        }
        Ok(result)
    }

    /// Sends a create or update, returning `None` when the server sent no body.
    fn write<T: Resource + ?Sized>(
        &self,
        action: ResourceAction,
        href: &str,
        resource: &T,
        return_type: &'static ResourceType,
        query: Option<&QueryString>,
    ) -> Result<Option<ResourceDataResult>, DataStoreError> {
        let uri = self.canonicalizer.canonicalize(href, query)?;
        let mode = if action == ResourceAction::Create {
            ConversionMode::Full
        } else {
            ConversionMode::Partial
        };
        let data = self
            .converter
            .convert(resource.resource_type(), resource.data(), mode);

        tracing::debug!(%action, %uri, properties = data.len(), "Writing resource");

        let request = ResourceDataRequest::new(action, uri, resource.resource_type())
            .with_data(data)
            .with_return_type(return_type);
        let result = self.pipeline.run(request)?;

        if result.data.is_empty() {
            return Ok(None);
        }
        Ok(Some(result))
    }

    /// Wraps a pipeline result, keeping the query of collection pages.
    fn into_resource_data(result: ResourceDataResult) -> ResourceData {
        let query = result
            .resource_type
            .is_collection()
            .then(|| result.uri.query().clone());
        match result.enlistment {
            Some(enlistment) => ResourceData::enlisted(enlistment),
            None => ResourceData::from_properties(result.data),
        }
        .with_query(query)
    }

    /// Binds nested or caller-supplied properties to the identity map.
    fn bind(&self, properties: PropertyMap) -> ResourceData {
        let Some(href) = properties.get(HREF).and_then(Value::as_str) else {
            return ResourceData::from_properties(properties);
        };

        if is_instance_shaped(&properties) {
            let enlistment = self.registry.enlist(href, properties.clone());
            return ResourceData::enlisted(enlistment);
        }

        match self.registry.lookup(href) {
            Some(live) if properties.len() == 1 => ResourceData::enlisted(live),
            _ => ResourceData::from_properties(properties),
        }
    }

    fn require_href<T: Resource + ?Sized>(
        resource: &T,
        operation: &str,
    ) -> Result<String, DataStoreError> {
        resource.href().ok_or_else(|| {
            DataStoreError::InvalidArgument(format!(
                "Cannot {operation} a {} without an href; it has not been persisted.",
                resource.resource_type()
            ))
        })
    }
}

impl fmt::Debug for DataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStore")
            .field("base_url", &self.canonicalizer.base_url())
            .field("pipeline", &self.pipeline)
            .field("factory", &self.factory)
            .finish_non_exhaustive()
    }
}

/// Builder for [`DataStore`].
///
/// Only the client configuration is required. Without an explicit executor a
/// [`ReqwestRequestExecutor`] is built from the configuration; without an
/// explicit cache manager one is derived from the configured cache settings.
///
/// # Example
///
/// ```rust
/// use idm_sdk::ds::DataStore;
/// use idm_sdk::{BaseUrl, CacheSettings, ClientConfig};
///
/// let config = ClientConfig::builder()
///     .base_url(BaseUrl::new("https://api.example.com/v1").unwrap())
///     .cache(CacheSettings::disabled())
///     .build()
///     .unwrap();
///
/// let data_store = DataStore::builder().config(config).build().unwrap();
/// assert_eq!(
///     data_store.filter_names(),
///     vec!["enlistment", "provider-account-result"]
/// );
/// ```
pub struct DataStoreBuilder {
    config: Option<ClientConfig>,
    executor: Option<Arc<dyn RequestExecutor>>,
    cache_manager: Option<Arc<dyn CacheManager>>,
    region_names: Option<Arc<dyn CacheRegionNameResolver>>,
    marshaller: Option<Arc<dyn MapMarshaller>>,
    secret_decryptor: Option<Arc<dyn SecretDecryptor>>,
    factory: ResourceFactory,
}

impl DataStoreBuilder {
    /// Creates a builder whose factory knows every shipped resource type.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: None,
            executor: None,
            cache_manager: None,
            region_names: None,
            marshaller: None,
            secret_decryptor: None,
            factory: ResourceFactory::with_defaults(),
        }
    }

    /// Sets the client configuration (required).
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the transport.
    #[must_use]
    pub fn executor(mut self, executor: Arc<dyn RequestExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Sets the cache manager, enabling the cache filters.
    #[must_use]
    pub fn cache_manager(mut self, manager: Arc<dyn CacheManager>) -> Self {
        self.cache_manager = Some(manager);
        self
    }

    /// Sets how resource types map to cache region names.
    #[must_use]
    pub fn region_names(mut self, resolver: Arc<dyn CacheRegionNameResolver>) -> Self {
        self.region_names = Some(resolver);
        self
    }

    /// Sets the wire format.
    #[must_use]
    pub fn marshaller(mut self, marshaller: Arc<dyn MapMarshaller>) -> Self {
        self.marshaller = Some(marshaller);
        self
    }

    /// Replaces the [`AesSecretDecryptor`] used for encrypted API key secrets.
    ///
    /// Secrets are requested encrypted only when the configuration carries API
    /// key credentials; without them the decryptor is unused.
    #[must_use]
    pub fn secret_decryptor(mut self, decryptor: Arc<dyn SecretDecryptor>) -> Self {
        self.secret_decryptor = Some(decryptor);
        self
    }

    /// Registers an additional resource type.
    #[must_use]
    pub fn register<T: crate::ds::resource::FromResourceData>(mut self) -> Self {
        self.factory.register::<T>();
        self
    }

    /// Registers an additional polymorphic resource type.
    #[must_use]
    pub fn register_subtypes<T: TypedResource>(mut self, dispatch: SubtypeDispatch<T>) -> Self {
        self.factory.register_subtypes(dispatch);
        self
    }

    /// Builds the data store.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::Config`] if no configuration was given, and
    /// [`DataStoreError::Transport`] if the default HTTP client cannot be built.
    pub fn build(self) -> Result<DataStore, DataStoreError> {
        let config = self
            .config
            .ok_or(ConfigError::MissingRequiredField { field: "config" })?;

        let executor: Arc<dyn RequestExecutor> = match self.executor {
            Some(executor) => executor,
            None => Arc::new(ReqwestRequestExecutor::new(&config)?),
        };
        let marshaller = self
            .marshaller
            .unwrap_or_else(|| Arc::new(JsonMapMarshaller));

        let caching = self.cache_manager.is_some() || config.cache().is_enabled();
        let collection_caching = config.cache().is_collection_caching_enabled();
        let manager = self
            .cache_manager
            .unwrap_or_else(|| cache_manager_for(config.cache()));
        let cache = match self.region_names {
            Some(region_names) => CacheResolver::with_region_names(manager, region_names),
            None => CacheResolver::new(manager),
        };

        let canonicalizer = Canonicalizer::new(config.base_url());
        let registry = Arc::new(EnlistmentRegistry::new(config.enlistment_capacity()));
        let handler = HttpResourceHandler::new(
            executor,
            marshaller,
            user_agent(config.user_agent_prefix()),
        );

        let decryptor = self
            .secret_decryptor
            .unwrap_or_else(|| Arc::new(AesSecretDecryptor));
        let api_key_secrets = config
            .credentials()
            .map(|credentials| (credentials.secret().clone(), decryptor));

        let mut pipeline = FilterPipeline::new(Arc::new(handler))
            .with_filter(Arc::new(EnlistmentFilter::new(Arc::clone(&registry))));
        if let Some((secret, decryptor)) = &api_key_secrets {
            pipeline = pipeline.with_filter(Arc::new(DecryptApiKeySecretFilter::new(
                secret.clone(),
                Arc::clone(decryptor),
            )));
        }
        if caching {
            pipeline = pipeline
                .with_filter(Arc::new(ReadCacheFilter::new(
                    cache.clone(),
                    canonicalizer.clone(),
                    collection_caching,
                )))
                .with_filter(Arc::new(WriteCacheFilter::new(cache.clone(), collection_caching)));
        }
        if api_key_secrets.is_some() {
            pipeline = pipeline.with_filter(Arc::new(ApiKeyQueryFilter::new()));
        }
        pipeline = pipeline.with_filter(Arc::new(ProviderAccountResultFilter::new()));

        tracing::debug!(
            base_url = %config.base_url(),
            filters = ?pipeline.filter_names(),
            "Built data store"
        );

        Ok(DataStore {
            canonicalizer,
            pipeline,
            registry,
            cache,
            factory: self.factory,
            converter: ResourceConverter,
        })
    }
}

impl Default for DataStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DataStoreBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStoreBuilder")
            .field("config", &self.config)
            .field("factory", &self.factory)
            .finish_non_exhaustive()
    }
}
