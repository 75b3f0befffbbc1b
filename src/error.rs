//! Error types for client configuration.
//!
//! This module contains the errors raised while building a
//! [`ClientConfig`](crate::ClientConfig) or one of its validated newtypes.
//!
//! # Error Handling
//!
//! All configuration constructors return `Result<T, ConfigError>` so that an
//! invalid client setup fails before any request is issued.
//!
//! # Example
//!
//! ```rust
//! use idm_sdk::{ApiKeyId, ConfigError};
//!
//! let result = ApiKeyId::new("");
//! assert!(matches!(result, Err(ConfigError::EmptyApiKeyId)));
//! ```

use thiserror::Error;

/// Errors that can occur during client configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// API key id cannot be empty.
    #[error("API key id cannot be empty. Please provide the id of a valid API key.")]
    EmptyApiKeyId,

    /// API key secret cannot be empty.
    #[error("API key secret cannot be empty. Please provide the secret of a valid API key.")]
    EmptyApiKeySecret,

    /// Base URL is invalid.
    #[error("Invalid base URL '{url}'. Expected an absolute http or https URL (e.g., 'https://api.example.com/v1').")]
    InvalidBaseUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// A numeric setting is out of range.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidSetting {
        /// The name of the offending setting.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_api_key_id_error_message() {
        let message = ConfigError::EmptyApiKeyId.to_string();
        assert!(message.contains("API key id cannot be empty"));
    }

    #[test]
    fn test_invalid_base_url_error_message() {
        let error = ConfigError::InvalidBaseUrl {
            url: "ftp://nope".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("ftp://nope"));
        assert!(message.contains("http or https"));
    }

    #[test]
    fn test_missing_required_field_error_message() {
        let error = ConfigError::MissingRequiredField { field: "base_url" };
        let message = error.to_string();
        assert!(message.contains("base_url"));
        assert!(message.contains("must be set"));
    }

    #[test]
    fn test_error_implements_std_error() {
        let error = ConfigError::EmptyApiKeySecret;
        let _: &dyn std::error::Error = &error;
    }
}
