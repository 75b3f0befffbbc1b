//! Data store error types.
//!
//! Every data store operation returns `Result<T, DataStoreError>`. The API's
//! own error responses surface as [`DataStoreError::Resource`], carrying the
//! structured [`ApiError`] so callers can branch on its numeric `code`.
//!
//! # Example
//!
//! ```rust,ignore
//! use idm_sdk::ds::DataStoreError;
//!
//! match data_store.get_resource::<Account>("/accounts/1", None) {
//!     Ok(account) => println!("{:?}", account.email()),
//!     Err(DataStoreError::Resource(e)) if e.code() == 404 => println!("gone"),
//!     Err(e) => return Err(e.into()),
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ConfigError;
use crate::http::{InvalidHrefError, TransportError};

/// The structured error document returned by the API.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiError {
    /// HTTP status code.
    pub status: u16,
    /// API-specific error code.
    pub code: i64,
    /// End-user facing message.
    pub message: Option<String>,
    /// Developer facing message.
    pub developer_message: Option<String>,
    /// Link to documentation for the error code.
    pub more_info: Option<String>,
    /// Server-assigned request id.
    pub request_id: Option<String>,
}

/// An error response from the API.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub struct ResourceException {
    error: ApiError,
}

impl ResourceException {
    /// Wraps an API error document.
    #[must_use]
    pub const fn new(error: ApiError) -> Self {
        Self { error }
    }

    /// Returns the HTTP status.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.error.status
    }

    /// Returns the API error code.
    #[must_use]
    pub const fn code(&self) -> i64 {
        self.error.code
    }

    /// Returns the end-user message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.error.message.as_deref()
    }

    /// Returns the developer message.
    #[must_use]
    pub fn developer_message(&self) -> Option<&str> {
        self.error.developer_message.as_deref()
    }

    /// Returns the documentation link.
    #[must_use]
    pub fn more_info(&self) -> Option<&str> {
        self.error.more_info.as_deref()
    }

    /// Returns the server-assigned request id.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.error.request_id.as_deref()
    }

    /// Returns the full error document.
    #[must_use]
    pub const fn error(&self) -> &ApiError {
        &self.error
    }
}

impl fmt::Display for ResourceException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}, code {}", self.error.status, self.error.code)?;
        if let Some(more_info) = &self.error.more_info {
            write!(f, " ({more_info})")?;
        }
        let message = self
            .error
            .developer_message
            .as_deref()
            .or(self.error.message.as_deref())
            .unwrap_or("no message");
        write!(f, ": {message}")?;
        if let Some(request_id) = &self.error.request_id {
            write!(f, " [request id {request_id}]")?;
        }
        Ok(())
    }
}

/// Which way a property map was being converted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarshalDirection {
    /// Property map to wire text.
    ToWire,
    /// Wire text to property map.
    FromWire,
}

impl fmt::Display for MarshalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToWire => f.write_str("marshal"),
            Self::FromWire => f.write_str("unmarshal"),
        }
    }
}

/// A payload could not be (un)marshalled.
#[derive(Debug, Error)]
#[error("Unable to {direction} resource data: {source}")]
pub struct MarshalingError {
    /// The conversion direction.
    pub direction: MarshalDirection,
    /// The underlying JSON error.
    #[source]
    pub source: serde_json::Error,
}

/// Unified error type for data store operations.
#[derive(Debug, Error)]
pub enum DataStoreError {
    /// The transport failed to produce a response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The API answered with an error document.
    #[error(transparent)]
    Resource(#[from] ResourceException),

    /// A payload could not be converted.
    #[error(transparent)]
    Marshaling(#[from] MarshalingError),

    /// A precondition on the arguments failed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The API answered with something the data store cannot use.
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// No constructor is registered for the requested type.
    #[error("No resource constructor registered for type '{resource}'.")]
    UnregisteredResource {
        /// The requested resource type.
        resource: &'static str,
    },

    /// A polymorphic payload named a subtype with no registered constructor.
    #[error("Unknown {resource} subtype '{discriminator}'.")]
    UnknownSubtype {
        /// The polymorphic resource type.
        resource: &'static str,
        /// The discriminator value found in the payload.
        discriminator: String,
    },

    /// An API key secret could not be decrypted.
    #[error("Unable to decrypt API key secret: {reason}")]
    SecretDecryption {
        /// Why decryption failed.
        reason: String,
    },

    /// The client configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<InvalidHrefError> for DataStoreError {
    fn from(error: InvalidHrefError) -> Self {
        Self::InvalidArgument(error.to_string())
    }
}

impl DataStoreError {
    /// Returns the API error when this is an error response.
    #[must_use]
    pub const fn as_resource_exception(&self) -> Option<&ResourceException> {
        match self {
            Self::Resource(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_deserializes_camel_case_fields() {
        let error: ApiError = serde_json::from_str(
            r#"{"status":400,"code":2000,"message":"Invalid value","developerMessage":"dev","moreInfo":"http://docs/2000","requestId":"abc"}"#,
        )
        .unwrap();

        assert_eq!(error.status, 400);
        assert_eq!(error.code, 2000);
        assert_eq!(error.developer_message.as_deref(), Some("dev"));
        assert_eq!(error.request_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_api_error_tolerates_missing_fields() {
        let error: ApiError = serde_json::from_str(r#"{"status":404}"#).unwrap();
        assert_eq!(error.code, 0);
        assert!(error.message.is_none());
    }

    #[test]
    fn test_resource_exception_display_prefers_developer_message() {
        let exception = ResourceException::new(ApiError {
            status: 409,
            code: 2001,
            message: Some("user message".to_string()),
            developer_message: Some("developer message".to_string()),
            more_info: None,
            request_id: Some("r-1".to_string()),
        });
        let text = exception.to_string();
        assert!(text.starts_with("HTTP 409, code 2001: developer message"));
        assert!(text.contains("r-1"));
    }

    #[test]
    fn test_invalid_href_converts_to_invalid_argument() {
        let error: DataStoreError = InvalidHrefError {
            href: String::new(),
            reason: "href cannot be empty",
        }
        .into();
        assert!(matches!(error, DataStoreError::InvalidArgument(_)));
    }

    #[test]
    fn test_marshaling_error_names_direction() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = MarshalingError {
            direction: MarshalDirection::FromWire,
            source,
        };
        assert!(error.to_string().starts_with("Unable to unmarshal"));
    }
}
