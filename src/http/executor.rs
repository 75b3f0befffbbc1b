//! Request execution.
//!
//! The data store talks to the network only through the [`RequestExecutor`]
//! trait. [`ReqwestRequestExecutor`] is the default implementation: a blocking
//! `reqwest` client that signs every attempt, follows `301`/`302`/`307`
//! redirects itself and retries throttled, server-error and network failures
//! with exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::config::ClientConfig;
use crate::http::errors::TransportError;
use crate::http::request::{HttpHeaders, HttpMethod, Request};
use crate::http::response::Response;
use crate::http::signer::{RequestSigner, Sauthc1Signer};
use crate::http::uri::CanonicalUri;

/// SDK version from Cargo.toml.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum number of redirects followed for one request.
pub const MAX_REDIRECTS: u32 = 10;

const DEFAULT_SCALE_FACTOR_MS: u64 = 300;
const MAX_BACKOFF_MS: u64 = 20_000;
const THROTTLE_MIN_MS: u64 = 500;
const THROTTLE_MAX_MS: u64 = 600;

/// Sends a [`Request`] and returns the raw [`Response`].
///
/// Error statuses are returned as `Ok` responses; only failures to obtain a
/// response at all are reported as [`TransportError`].
pub trait RequestExecutor: Send + Sync {
    /// Executes `request`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if no response could be obtained.
    fn execute(&self, request: &Request) -> Result<Response, TransportError>;
}

impl<T: RequestExecutor + ?Sized> RequestExecutor for Arc<T> {
    fn execute(&self, request: &Request) -> Result<Response, TransportError> {
        (**self).execute(request)
    }
}

/// Builds the default `User-Agent` header value.
#[must_use]
pub fn user_agent(prefix: Option<&str>) -> String {
    let prefix = prefix.map_or(String::new(), |prefix| format!("{prefix} | "));
    let rust_version = env!("CARGO_PKG_RUST_VERSION");
    format!("{prefix}idm-sdk/{SDK_VERSION} | Rust {rust_version}")
}

/// Blocking `reqwest` executor.
///
/// Construct and use this executor outside of any async runtime thread; the
/// blocking client owns its own runtime.
///
/// # Thread Safety
///
/// `ReqwestRequestExecutor` is `Send + Sync` and is typically shared via `Arc`.
pub struct ReqwestRequestExecutor {
    client: reqwest::blocking::Client,
    signer: Option<Arc<dyn RequestSigner>>,
    tries: u32,
}

// Verify ReqwestRequestExecutor is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ReqwestRequestExecutor>();
};

impl std::fmt::Debug for ReqwestRequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRequestExecutor")
            .field("signed", &self.signer.is_some())
            .field("tries", &self.tries)
            .finish_non_exhaustive()
    }
}

impl ReqwestRequestExecutor {
    /// Creates an executor from client configuration.
    ///
    /// Requests are signed with [`Sauthc1Signer`] when credentials are configured.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Network`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(config.connect_timeout())
            .timeout(config.read_timeout())
            .build()?;

        let signer = config
            .credentials()
            .cloned()
            .map(|credentials| Arc::new(Sauthc1Signer::new(credentials)) as Arc<dyn RequestSigner>);

        Ok(Self {
            client,
            signer,
            tries: config.tries(),
        })
    }

    /// Replaces the request signer.
    #[must_use]
    pub fn with_signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Returns how many times a request is attempted.
    #[must_use]
    pub const fn tries(&self) -> u32 {
        self.tries
    }

    fn send_once(&self, request: &Request) -> Result<Response, TransportError> {
        let mut signed = request.clone();
        if let Some(signer) = &self.signer {
            signer.sign(&mut signed)?;
        }

        let url = signed.uri.to_string();
        let mut builder = match signed.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Put => self.client.put(&url),
            HttpMethod::Delete => self.client.delete(&url),
        };

        for (name, values) in signed.headers.iter() {
            for value in values {
                builder = builder.header(name, value);
            }
        }

        if let Some(body) = signed.body {
            builder = builder.body(body);
        }

        let res = builder.send()?;
        let status = res.status().as_u16();
        let headers = Self::parse_response_headers(res.headers());
        let body = res.text()?;
        let body = (!body.trim().is_empty()).then_some(body);

        Ok(Response::new(status, headers, body))
    }

    /// Parses response headers into [`HttpHeaders`].
    fn parse_response_headers(headers: &reqwest::header::HeaderMap) -> HttpHeaders {
        let mut result = HttpHeaders::new();
        for (name, value) in headers {
            result.add(name.as_str(), value.to_str().unwrap_or_default());
        }
        result
    }

    /// Calculates the delay before retry number `retry` (1-based).
    fn retry_delay(retry: u32, throttled: bool) -> Duration {
        if throttled {
            return Duration::from_millis(
                rand::thread_rng().gen_range(THROTTLE_MIN_MS..=THROTTLE_MAX_MS),
            );
        }
        let factor = 2u64.saturating_pow(retry);
        Duration::from_millis(
            factor
                .saturating_mul(DEFAULT_SCALE_FACTOR_MS)
                .min(MAX_BACKOFF_MS),
        )
    }

    fn redirect_target(current: &CanonicalUri, location: &str) -> CanonicalUri {
        if location.contains("://") {
            return CanonicalUri::parse(location);
        }
        let path = current.absolute_path();
        let origin_end = path
            .find("://")
            .and_then(|i| path[i + 3..].find('/').map(|j| i + 3 + j))
            .unwrap_or(path.len());
        CanonicalUri::parse(&format!("{}{location}", &path[..origin_end]))
    }
}

impl RequestExecutor for ReqwestRequestExecutor {
    fn execute(&self, request: &Request) -> Result<Response, TransportError> {
        let mut current = request.clone();
        let mut attempt: u32 = 0;
        let mut redirects: u32 = 0;

        loop {
            attempt += 1;
            tracing::debug!(
                method = %current.method,
                uri = %current.uri,
                attempt,
                "Executing request"
            );

            let outcome = self.send_once(&current);

            let response = match outcome {
                Ok(response) => response,
                Err(TransportError::Network(error)) if attempt < self.tries => {
                    let delay = Self::retry_delay(attempt, false);
                    tracing::warn!(%error, attempt, ?delay, "Network error, retrying");
                    std::thread::sleep(delay);
                    continue;
                }
                Err(error) => return Err(error),
            };

            if response.is_redirect() {
                redirects += 1;
                if redirects > MAX_REDIRECTS {
                    return Err(TransportError::TooManyRedirects {
                        limit: MAX_REDIRECTS,
                    });
                }
                let location = response.headers.get("Location").ok_or(
                    TransportError::MissingRedirectLocation {
                        status: response.status,
                    },
                )?;
                current.uri = Self::redirect_target(&current.uri, location);
                tracing::debug!(status = response.status, uri = %current.uri, "Following redirect");
                attempt -= 1;
                continue;
            }

            let retryable = response.is_throttled() || response.is_server_error();
            if retryable && attempt < self.tries {
                let delay = Self::retry_delay(attempt, response.is_throttled());
                tracing::warn!(
                    status = response.status,
                    attempt,
                    ?delay,
                    "Retryable response, retrying"
                );
                std::thread::sleep(delay);
                continue;
            }

            return Ok(response);
        }
    }
}
