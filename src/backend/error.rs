//! Backend error type
//!
//! This module defines `BackendError`, the single error type every
//! `ChrisBackend` implementation reports. Intents classify it further.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors that can occur during backend operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendError {
    /// API request failed with the given message
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    /// Authentication failed or the token is invalid/expired
    AuthenticationError { message: String },

    /// Request timed out after the specified duration (in seconds)
    TimeoutError { seconds: u64 },

    /// The requested resource does not exist
    NotFound { resource: String },

    /// Invalid or malformed response from the API
    InvalidResponse {
        message: String,
        raw_response: Option<String>,
    },

    /// Configuration error (missing URL, missing token, invalid settings)
    ConfigurationError { message: String },

    /// Network-related error
    NetworkError { message: String },

    /// Generic error for other cases
    Other { message: String },
}

impl BackendError {
    /// Maps a transport-level reqwest failure onto a backend error
    pub fn from_reqwest(error: &reqwest::Error, timeout_secs: u64) -> Self {
        if error.is_timeout() {
            BackendError::TimeoutError {
                seconds: timeout_secs,
            }
        } else if error.is_connect() {
            BackendError::NetworkError {
                message: format!("Connection failed: {}", error),
            }
        } else if error.is_decode() {
            BackendError::InvalidResponse {
                message: format!("JSON parse error: {}", error),
                raw_response: None,
            }
        } else {
            BackendError::NetworkError {
                message: format!("Request failed: {}", error),
            }
        }
    }

    /// Maps a non-success HTTP status and body onto a backend error
    pub fn from_status(status: u16, body: &str, resource: &str) -> Self {
        match status {
            401 | 403 => BackendError::AuthenticationError {
                message: format!("HTTP {}: {}", status, body),
            },
            404 => BackendError::NotFound {
                resource: resource.to_string(),
            },
            _ => BackendError::ApiError {
                message: format!("HTTP {}: {}", status, body),
                status_code: Some(status),
            },
        }
    }

    /// Returns true when retrying the same request later could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::TimeoutError { .. } | BackendError::NetworkError { .. } => true,
            BackendError::ApiError { status_code, .. } => {
                matches!(status_code, Some(code) if *code >= 500)
            }
            _ => false,
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::ApiError {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "API error ({}): {}", code, message)
                } else {
                    write!(f, "API error: {}", message)
                }
            }
            BackendError::AuthenticationError { message } => {
                write!(f, "Authentication failed: {}", message)
            }
            BackendError::TimeoutError { seconds } => {
                write!(f, "Request timed out after {} seconds", seconds)
            }
            BackendError::NotFound { resource } => {
                write!(f, "Not found: {}", resource)
            }
            BackendError::InvalidResponse { message, .. } => {
                write!(f, "Invalid response from API: {}", message)
            }
            BackendError::ConfigurationError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            BackendError::NetworkError { message } => {
                write!(f, "Network error: {}", message)
            }
            BackendError::Other { message } => {
                write!(f, "Error: {}", message)
            }
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let error = BackendError::ApiError {
            message: "Test error".to_string(),
            status_code: Some(500),
        };
        assert!(error.to_string().contains("500"));
        assert!(error.to_string().contains("Test error"));

        let error = BackendError::NotFound {
            resource: "feed 7".to_string(),
        };
        assert_eq!(error.to_string(), "Not found: feed 7");
    }

    #[test]
    fn test_from_status() {
        assert!(matches!(
            BackendError::from_status(401, "bad token", "feeds"),
            BackendError::AuthenticationError { .. }
        ));
        assert_eq!(
            BackendError::from_status(404, "", "plugin pl-foo"),
            BackendError::NotFound {
                resource: "plugin pl-foo".to_string()
            }
        );
        assert_eq!(
            BackendError::from_status(400, "{\"dir\":[\"required\"]}", "instances"),
            BackendError::ApiError {
                message: "HTTP 400: {\"dir\":[\"required\"]}".to_string(),
                status_code: Some(400),
            }
        );
    }

    #[test]
    fn test_is_transient() {
        assert!(BackendError::TimeoutError { seconds: 30 }.is_transient());
        assert!(BackendError::ApiError {
            message: "boom".to_string(),
            status_code: Some(503),
        }
        .is_transient());
        assert!(!BackendError::ApiError {
            message: "bad".to_string(),
            status_code: Some(400),
        }
        .is_transient());
        assert!(!BackendError::AuthenticationError {
            message: "x".to_string()
        }
        .is_transient());
    }
}
