//! HTTP response type returned by a [`RequestExecutor`](super::RequestExecutor).

use crate::http::request::HttpHeaders;

/// Header carrying the server-assigned request id.
pub const REQUEST_ID_HEADER: &str = "Stormpath-Request-Id";

const FALLBACK_REQUEST_ID_HEADER: &str = "X-Request-Id";

/// An HTTP response.
#[derive(Clone, Debug)]
pub struct Response {
    /// The HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HttpHeaders,
    /// The raw response body, `None` when the server sent none.
    pub body: Option<String>,
}

impl Response {
    /// Creates a response.
    #[must_use]
    pub fn new(status: u16, headers: HttpHeaders, body: Option<String>) -> Self {
        let body = body.filter(|b| !b.trim().is_empty());
        Self {
            status,
            headers,
            body,
        }
    }

    /// Returns `true` for any status outside 2xx/3xx.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.status >= 400
    }

    /// Returns `true` for 5xx statuses.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    /// Returns `true` for 429 Too Many Requests.
    #[must_use]
    pub const fn is_throttled(&self) -> bool {
        self.status == 429
    }

    /// Returns `true` for the redirect statuses followed by the transport.
    #[must_use]
    pub const fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 307)
    }

    /// Returns `true` if a non-blank body is present.
    #[must_use]
    pub const fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Returns the request id assigned by the server, if any.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.headers
            .get(REQUEST_ID_HEADER)
            .or_else(|| self.headers.get(FALLBACK_REQUEST_ID_HEADER))
    }
}
