//! The terminal handler: one HTTP round trip per request.

use std::fmt;
use std::sync::Arc;

use crate::ds::errors::{ApiError, DataStoreError, ResourceException};
use crate::ds::filter::{Handler, ResourceAction, ResourceDataRequest, ResourceDataResult};
use crate::ds::marshal::MapMarshaller;
use crate::ds::resource::PropertyMap;
use crate::http::{Request, RequestExecutor, Response};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Sends requests through a [`RequestExecutor`] and parses the responses.
pub struct HttpResourceHandler {
    executor: Arc<dyn RequestExecutor>,
    marshaller: Arc<dyn MapMarshaller>,
    user_agent: String,
}

impl HttpResourceHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(
        executor: Arc<dyn RequestExecutor>,
        marshaller: Arc<dyn MapMarshaller>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            marshaller,
            user_agent: user_agent.into(),
        }
    }

    fn build_request(&self, request: &ResourceDataRequest) -> Result<Request, DataStoreError> {
        let mut http = Request::new(request.action.http_method(), request.uri.clone())
            .with_header("Accept", JSON_CONTENT_TYPE)
            .with_header("User-Agent", self.user_agent.as_str());
        http.headers.extend_from(&request.headers);

        if matches!(request.action, ResourceAction::Create | ResourceAction::Update) {
            let body = self.marshaller.marshal(&request.data)?;
            http.headers.set("Content-Type", JSON_CONTENT_TYPE);
            http.body = Some(body);
        }

        Ok(http)
    }

    /// Builds the typed error for an error response.
    fn translate_error(response: &Response) -> DataStoreError {
        let mut error = response
            .body
            .as_deref()
            .and_then(|body| serde_json::from_str::<ApiError>(body).ok())
            .unwrap_or_else(|| ApiError {
                message: response.body.clone(),
                ..ApiError::default()
            });

        if error.status == 0 {
            error.status = response.status;
        }
        if error.request_id.is_none() {
            error.request_id = response.request_id().map(str::to_string);
        }

        tracing::warn!(
            status = error.status,
            code = error.code,
            request_id = error.request_id.as_deref().unwrap_or(""),
            "API returned an error"
        );

        DataStoreError::Resource(ResourceException::new(error))
    }
}

impl Handler for HttpResourceHandler {
    fn handle(&self, request: ResourceDataRequest) -> Result<ResourceDataResult, DataStoreError> {
        let http = self.build_request(&request)?;
        tracing::debug!(method = %http.method, uri = %http.uri, "Sending request");

        let response = self.executor.execute(&http)?;
        tracing::debug!(status = response.status, uri = %http.uri, "Received response");

        if response.is_error() {
            return Err(Self::translate_error(&response));
        }

        let data = match response.body.as_deref() {
            Some(body) => self.marshaller.unmarshal(body)?,
            None => PropertyMap::new(),
        };

        let action = match response.status {
            201 => ResourceAction::Create,
            200 => ResourceAction::Read,
            _ => request.action,
        };

        Ok(ResourceDataResult::new(
            action,
            request.uri,
            request.return_type,
            data,
        ))
    }
}

impl fmt::Debug for HttpResourceHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResourceHandler")
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ds::marshal::JsonMapMarshaller;
    use crate::ds::resource::ResourceType;
    use crate::http::{CanonicalUri, HttpHeaders, HttpMethod, TransportError, REQUEST_ID_HEADER};
    use parking_lot::Mutex;
    use serde_json::json;

    static THING: ResourceType = ResourceType::instance("Thing");

    struct Canned {
        response: Response,
        sent: Mutex<Vec<Request>>,
    }

    impl RequestExecutor for Canned {
        fn execute(&self, request: &Request) -> Result<Response, TransportError> {
            self.sent.lock().push(request.clone());
            Ok(self.response.clone())
        }
    }

    fn canned(status: u16, headers: HttpHeaders, body: Option<&str>) -> Arc<Canned> {
        Arc::new(Canned {
            response: Response::new(status, headers, body.map(str::to_string)),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn handler(executor: Arc<Canned>) -> HttpResourceHandler {
        HttpResourceHandler::new(executor, Arc::new(JsonMapMarshaller), "test-agent")
    }

    fn request(action: ResourceAction) -> ResourceDataRequest {
        ResourceDataRequest::new(
            action,
            CanonicalUri::parse("https://api.example.com/v1/things/1"),
            &THING,
        )
    }

    #[test]
    fn test_create_sends_json_body_and_maps_201() {
        let executor = canned(201, HttpHeaders::new(), Some(r#"{"href":"h","a":1}"#));
        let data = json!({"a": 1}).as_object().unwrap().clone();

        let result = handler(executor.clone())
            .handle(request(ResourceAction::Create).with_data(data))
            .unwrap();

        assert_eq!(result.action, ResourceAction::Create);
        let sent = executor.sent.lock();
        assert_eq!(sent[0].method, HttpMethod::Post);
        assert_eq!(sent[0].body.as_deref(), Some(r#"{"a":1}"#));
        assert_eq!(sent[0].headers.get("content-type"), Some(JSON_CONTENT_TYPE));
        assert_eq!(sent[0].headers.get("user-agent"), Some("test-agent"));
    }

    #[test]
    fn test_create_answered_with_200_is_a_read() {
        let executor = canned(200, HttpHeaders::new(), Some(r#"{"href":"h","a":1}"#));
        let result = handler(executor).handle(request(ResourceAction::Create)).unwrap();
        assert_eq!(result.action, ResourceAction::Read);
    }

    #[test]
    fn test_read_has_no_body_and_empty_response_is_empty_data() {
        let executor = canned(202, HttpHeaders::new(), None);
        let result = handler(executor.clone())
            .handle(request(ResourceAction::Read))
            .unwrap();

        assert!(result.data.is_empty());
        assert_eq!(result.action, ResourceAction::Read);
        assert!(executor.sent.lock()[0].body.is_none());
    }

    #[test]
    fn test_error_body_becomes_resource_exception() {
        let mut headers = HttpHeaders::new();
        headers.set(REQUEST_ID_HEADER, "abc");
        let executor = canned(
            400,
            headers,
            Some(r#"{"status":400,"code":2000,"message":"Invalid","developerMessage":"dev"}"#),
        );

        let error = handler(executor)
            .handle(request(ResourceAction::Update))
            .unwrap_err();
        let exception = error.as_resource_exception().unwrap();
        assert_eq!(exception.code(), 2000);
        assert_eq!(exception.status(), 400);
        assert_eq!(exception.request_id(), Some("abc"));
    }

    #[test]
    fn test_unparseable_error_body_keeps_status() {
        let executor = canned(503, HttpHeaders::new(), Some("upstream unavailable"));
        let error = handler(executor)
            .handle(request(ResourceAction::Read))
            .unwrap_err();
        let exception = error.as_resource_exception().unwrap();
        assert_eq!(exception.status(), 503);
        assert_eq!(exception.message(), Some("upstream unavailable"));
    }
}
