//! Transport error types.
//!
//! - [`TransportError`]: failures raised by a [`RequestExecutor`](super::RequestExecutor)
//! - [`InvalidHrefError`]: an href that cannot be turned into a request URI
//!
//! Error responses (4xx/5xx with a body) are *not* transport errors: they are
//! returned as a normal [`Response`](super::Response) and translated into a
//! typed API error by the data store.

use thiserror::Error;

/// Errors raised while sending a request.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network or connection error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A redirect response did not carry a `Location` header.
    #[error("Received redirect status {status} without a Location header.")]
    MissingRedirectLocation {
        /// The redirect status code.
        status: u16,
    },

    /// Too many consecutive redirects were followed.
    #[error("Exceeded maximum redirect count of {limit}.")]
    TooManyRedirects {
        /// The configured redirect limit.
        limit: u32,
    },

    /// The request could not be signed.
    #[error("Unable to sign request: {reason}")]
    Signing {
        /// Why signing failed.
        reason: String,
    },
}

/// Error returned when an href cannot be canonicalized.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid href '{href}': {reason}")]
pub struct InvalidHrefError {
    /// The href that was rejected.
    pub href: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_error_includes_status() {
        let error = TransportError::MissingRedirectLocation { status: 302 };
        assert!(error.to_string().contains("302"));
    }

    #[test]
    fn test_invalid_href_error_message() {
        let error = InvalidHrefError {
            href: String::new(),
            reason: "href cannot be empty",
        };
        assert_eq!(error.to_string(), "Invalid href '': href cannot be empty");
    }

    #[test]
    fn test_error_types_implement_std_error() {
        let error: &dyn std::error::Error = &TransportError::TooManyRedirects { limit: 10 };
        let _ = error;
    }
}
