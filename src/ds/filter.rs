//! The resource data filter chain.
//!
//! Every data store operation is expressed as a [`ResourceDataRequest`] that
//! travels through an ordered list of [`Filter`]s before reaching a terminal
//! [`Handler`]. Each filter may act before and after delegating to the rest of
//! the chain, or answer the request itself without delegating (a cache hit).

use std::fmt;
use std::sync::Arc;

use crate::ds::enlistment::Enlistment;
use crate::ds::errors::DataStoreError;
use crate::ds::resource::{PropertyMap, ResourceType};
use crate::http::{CanonicalUri, HttpHeaders, HttpMethod};

/// The kind of operation a request performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceAction {
    /// Fetch a resource or collection.
    Read,
    /// Create a resource.
    Create,
    /// Update an existing resource.
    Update,
    /// Delete a resource or property.
    Delete,
}

impl ResourceAction {
    /// Returns the HTTP method used for the action.
    ///
    /// Updates are sent as `POST` to the resource's href.
    #[must_use]
    pub const fn http_method(self) -> HttpMethod {
        match self {
            Self::Read => HttpMethod::Get,
            Self::Create | Self::Update => HttpMethod::Post,
            Self::Delete => HttpMethod::Delete,
        }
    }
}

impl fmt::Display for ResourceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Read => "READ",
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A request travelling down the chain.
#[derive(Clone, Debug)]
pub struct ResourceDataRequest {
    /// The operation.
    pub action: ResourceAction,
    /// The target URI.
    pub uri: CanonicalUri,
    /// The type addressed by the URI.
    pub resource_type: &'static ResourceType,
    /// The type expected back, usually `resource_type`.
    pub return_type: &'static ResourceType,
    /// The request body for create and update.
    pub data: PropertyMap,
    /// Extra request headers.
    pub headers: HttpHeaders,
}

impl ResourceDataRequest {
    /// Creates a request with no body whose return type equals its type.
    #[must_use]
    pub fn new(
        action: ResourceAction,
        uri: CanonicalUri,
        resource_type: &'static ResourceType,
    ) -> Self {
        Self {
            action,
            uri,
            resource_type,
            return_type: resource_type,
            data: PropertyMap::new(),
            headers: HttpHeaders::new(),
        }
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_data(mut self, data: PropertyMap) -> Self {
        self.data = data;
        self
    }

    /// Sets the expected result type.
    #[must_use]
    pub const fn with_return_type(mut self, return_type: &'static ResourceType) -> Self {
        self.return_type = return_type;
        self
    }

    /// Adds request headers.
    #[must_use]
    pub fn with_headers(mut self, headers: &HttpHeaders) -> Self {
        self.headers.extend_from(headers);
        self
    }
}

/// A result travelling back up the chain.
#[derive(Clone, Debug)]
pub struct ResourceDataResult {
    /// The operation the server reports (a create answered with `200` is a read).
    pub action: ResourceAction,
    /// The request URI.
    pub uri: CanonicalUri,
    /// The type of `data`.
    pub resource_type: &'static ResourceType,
    /// The response data, empty when the server sent no body.
    pub data: PropertyMap,
    /// The identity-map entry `data` was bound to, if any.
    pub enlistment: Option<Arc<Enlistment>>,
}

impl ResourceDataResult {
    /// Creates a result not bound to an enlistment.
    #[must_use]
    pub const fn new(
        action: ResourceAction,
        uri: CanonicalUri,
        resource_type: &'static ResourceType,
        data: PropertyMap,
    ) -> Self {
        Self {
            action,
            uri,
            resource_type,
            data,
            enlistment: None,
        }
    }
}

/// A stage of the chain.
pub trait Filter: Send + Sync {
    /// Processes `request`, usually by delegating to `chain`.
    ///
    /// # Errors
    ///
    /// Returns any error raised by this filter or further down the chain.
    fn filter(
        &self,
        request: ResourceDataRequest,
        chain: FilterChain<'_>,
    ) -> Result<ResourceDataResult, DataStoreError>;

    /// Returns a name for diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// The terminal stage of the chain.
pub trait Handler: Send + Sync {
    /// Answers `request`.
    ///
    /// # Errors
    ///
    /// Returns transport, marshaling and API errors.
    fn handle(&self, request: ResourceDataRequest) -> Result<ResourceDataResult, DataStoreError>;
}

/// The remainder of the chain after the current filter.
#[derive(Clone, Copy)]
pub struct FilterChain<'a> {
    filters: &'a [Arc<dyn Filter>],
    handler: &'a dyn Handler,
}

impl<'a> FilterChain<'a> {
    /// Passes `request` to the next filter, or the handler when none remain.
    ///
    /// # Errors
    ///
    /// Returns any error raised downstream.
    pub fn filter(self, request: ResourceDataRequest) -> Result<ResourceDataResult, DataStoreError> {
        match self.filters.split_first() {
            Some((first, rest)) => {
                tracing::trace!(filter = first.name(), action = %request.action, "Entering filter");
                first.filter(
                    request,
                    FilterChain {
                        filters: rest,
                        handler: self.handler,
                    },
                )
            }
            None => self.handler.handle(request),
        }
    }
}

impl fmt::Debug for FilterChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("remaining", &self.filters.len())
            .finish_non_exhaustive()
    }
}

/// An ordered filter list with its terminal handler.
#[derive(Clone)]
pub struct FilterPipeline {
    filters: Vec<Arc<dyn Filter>>,
    handler: Arc<dyn Handler>,
}

impl FilterPipeline {
    /// Creates a pipeline with no filters.
    #[must_use]
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self {
            filters: Vec::new(),
            handler,
        }
    }

    /// Appends `filter` inside the filters already added.
    #[must_use]
    pub fn with_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Returns the filter names, outermost first.
    #[must_use]
    pub fn filter_names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|filter| filter.name()).collect()
    }

    /// Runs `request` through the whole pipeline.
    ///
    /// # Errors
    ///
    /// Returns any error raised by a filter or the handler.
    pub fn run(&self, request: ResourceDataRequest) -> Result<ResourceDataResult, DataStoreError> {
        FilterChain {
            filters: &self.filters,
            handler: self.handler.as_ref(),
        }
        .filter(request)
    }
}

impl fmt::Debug for FilterPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterPipeline")
            .field("filters", &self.filter_names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::Value;

    static THING: ResourceType = ResourceType::instance("Thing");

    struct Recording {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Filter for Recording {
        fn filter(
            &self,
            request: ResourceDataRequest,
            chain: FilterChain<'_>,
        ) -> Result<ResourceDataResult, DataStoreError> {
            self.log.lock().push(format!("before {}", self.label));
            let result = chain.filter(request);
            self.log.lock().push(format!("after {}", self.label));
            result
        }

        fn name(&self) -> &'static str {
            self.label
        }
    }

    struct ShortCircuit;

    impl Filter for ShortCircuit {
        fn filter(
            &self,
            request: ResourceDataRequest,
            _chain: FilterChain<'_>,
        ) -> Result<ResourceDataResult, DataStoreError> {
            let mut data = PropertyMap::new();
            data.insert("from".to_string(), Value::from("filter"));
            Ok(ResourceDataResult::new(
                request.action,
                request.uri,
                request.resource_type,
                data,
            ))
        }
    }

    struct Echo(Arc<Mutex<Vec<String>>>);

    impl Handler for Echo {
        fn handle(
            &self,
            request: ResourceDataRequest,
        ) -> Result<ResourceDataResult, DataStoreError> {
            self.0.lock().push("handler".to_string());
            let mut data = PropertyMap::new();
            data.insert("from".to_string(), Value::from("handler"));
            Ok(ResourceDataResult::new(
                request.action,
                request.uri,
                request.return_type,
                data,
            ))
        }
    }

    fn request() -> ResourceDataRequest {
        ResourceDataRequest::new(
            ResourceAction::Read,
            CanonicalUri::parse("https://api.example.com/v1/things/1"),
            &THING,
        )
    }

    #[test]
    fn test_filters_wrap_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = FilterPipeline::new(Arc::new(Echo(log.clone())))
            .with_filter(Arc::new(Recording {
                label: "outer",
                log: log.clone(),
            }))
            .with_filter(Arc::new(Recording {
                label: "inner",
                log: log.clone(),
            }));

        let result = pipeline.run(request()).unwrap();
        assert_eq!(result.data["from"], "handler");
        assert_eq!(
            *log.lock(),
            vec!["before outer", "before inner", "handler", "after inner", "after outer"]
        );
        assert_eq!(pipeline.filter_names(), vec!["outer", "inner"]);
    }

    #[test]
    fn test_filter_can_answer_without_delegating() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline =
            FilterPipeline::new(Arc::new(Echo(log.clone()))).with_filter(Arc::new(ShortCircuit));

        let result = pipeline.run(request()).unwrap();
        assert_eq!(result.data["from"], "filter");
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_update_is_sent_as_post() {
        assert_eq!(ResourceAction::Update.http_method(), HttpMethod::Post);
        assert_eq!(ResourceAction::Delete.http_method(), HttpMethod::Delete);
        assert_eq!(ResourceAction::Create.to_string(), "CREATE");
    }
}
