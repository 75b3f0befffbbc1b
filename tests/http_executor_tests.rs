//! Integration tests for the blocking HTTP executor against a local mock server.
//!
//! The executor owns a blocking client, so every call runs on a
//! `spawn_blocking` thread while wiremock serves from the async runtime.

use std::time::Duration;

use idm_sdk::ds::{DataStore, DataStoreError};
use idm_sdk::http::{
    CanonicalUri, HttpMethod, ReqwestRequestExecutor, Request, RequestExecutor, Response,
};
use idm_sdk::resources::Account;
use idm_sdk::{ApiKeyCredentials, BaseUrl, CacheSettings, ClientConfig};
use serde_json::json;
use wiremock::matchers::{
    body_json, header, header_regex, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer, tries: u32) -> ClientConfig {
    ClientConfig::builder()
        .base_url(BaseUrl::new(format!("{}/v1", server.uri())).unwrap())
        .credentials(ApiKeyCredentials::new("key-id", "key-secret").unwrap())
        .cache(CacheSettings::disabled())
        .tries(tries)
        .read_timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

async fn execute(config: ClientConfig, request: Request) -> Response {
    tokio::task::spawn_blocking(move || {
        let executor = ReqwestRequestExecutor::new(&config).unwrap();
        executor.execute(&request).unwrap()
    })
    .await
    .unwrap()
}

fn get(server: &MockServer, path: &str) -> Request {
    Request::new(
        HttpMethod::Get,
        CanonicalUri::parse(&format!("{}{path}", server.uri())),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn test_requests_are_signed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/accounts/1"))
        // The mock server splits header values on commas, so each part of the
        // Authorization value is matched on its own.
        .and(header_regex(
            "authorization",
            concat!(
                r"^(SAuthc1 sauthc1Id=key-id/\d{8}/[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}/sauthc1_request",
                r"|sauthc1SignedHeaders=[a-z0-9;-]*host[a-z0-9;-]*",
                r"|sauthc1Signature=[0-9a-f]{64}$)",
            ),
        ))
        .and(header_regex("x-stormpath-date", r"^\d{8}T\d{6}Z$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"href": "x"})))
        .expect(1)
        .mount(&server)
        .await;

    let response = execute(config(&server, 1), get(&server, "/v1/accounts/1")).await;
    assert_eq!(response.status, 200);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_server_errors_are_retried_up_to_tries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/accounts/1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/accounts/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"href": "x"})))
        .expect(1)
        .mount(&server)
        .await;

    let response = execute(config(&server, 2), get(&server, "/v1/accounts/1")).await;
    assert_eq!(response.status, 200);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_single_try_returns_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/accounts/1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let response = execute(config(&server, 1), get(&server, "/v1/accounts/1")).await;
    assert_eq!(response.status, 500);
    assert_eq!(response.body.as_deref(), Some("boom"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_relative_redirects_are_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/accounts/1"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/v1/accounts/2"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/accounts/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"href": "2"})))
        .expect(1)
        .mount(&server)
        .await;

    let response = execute(config(&server, 1), get(&server, "/v1/accounts/1")).await;
    assert_eq!(response.status, 200);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_body_is_absent() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/accounts/1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let request = Request::new(
        HttpMethod::Delete,
        CanonicalUri::parse(&format!("{}/v1/accounts/1", server.uri())),
    );
    let response = execute(config(&server, 1), request).await;
    assert_eq!(response.status, 204);
    assert!(response.body.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_data_store_round_trip_over_http() {
    let server = MockServer::start().await;
    let href = format!("{}/v1/accounts/1", server.uri());
    Mock::given(method("GET"))
        .and(path("/v1/accounts/1"))
        .and(query_param("expand", "directory"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "href": href,
            "email": "joan@example.com",
            "givenName": "Joan",
            "directory": {"href": format!("{}/v1/directories/1", server.uri()), "name": "Main"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts/1"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"givenName": "Jo"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "href": href,
            "email": "joan@example.com",
            "givenName": "Jo"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/accounts/1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server, 1);
    let outcome = tokio::task::spawn_blocking(move || -> Result<String, DataStoreError> {
        let data_store = DataStore::builder().config(config).build()?;
        let mut account: Account = data_store.get_resource("/accounts/1?expand=directory", None)?;
        account.set_given_name("Jo");
        data_store.save(&mut account, None)?;
        data_store.delete(&account)?;
        Ok(account.given_name().unwrap_or_default())
    })
    .await
    .unwrap();

    assert_eq!(outcome.unwrap(), "Jo");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_api_errors_surface_through_the_data_store() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/accounts/missing"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("Stormpath-Request-Id", "req-42")
                .set_body_json(json!({
                    "status": 404,
                    "code": 404,
                    "message": "The requested resource does not exist.",
                    "moreInfo": "https://docs.example.com/errors/404"
                })),
        )
        .mount(&server)
        .await;

    let config = config(&server, 1);
    let error = tokio::task::spawn_blocking(move || {
        let data_store = DataStore::builder().config(config).build().unwrap();
        data_store
            .get_resource::<Account>("/accounts/missing", None)
            .unwrap_err()
    })
    .await
    .unwrap();

    let exception = error.as_resource_exception().unwrap();
    assert_eq!(exception.status(), 404);
    assert_eq!(exception.request_id(), Some("req-42"));
    assert_eq!(exception.more_info(), Some("https://docs.example.com/errors/404"));
}
