//! Error types for the partner center sell client.
//!
//! # Design
//! `MissingParameters` is the only error the request builder raises itself;
//! it is produced before any I/O happens. Every other variant originates in
//! the transport and reaches the caller unchanged. Non-2xx responses keep
//! the raw status code and body for debugging.

use thiserror::Error;

/// Errors returned by `PartnerCenterSell` operations and transports.
#[derive(Debug, Error)]
pub enum ApiError {
    /// One or more required parameters were absent (or null). No request was
    /// sent.
    #[error("Missing required parameters: {}", .0.join(", "))]
    MissingParameters(Vec<String>),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        body: String,
    },

    /// The request never produced a response (connect, TLS, timeout, ...).
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service URL or a rendered request path is not a valid URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// A parameter value or a response result could not be (de)serialized.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ApiError {
    /// HTTP status of the failed response, when there was one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether a transport with retries enabled should try again.
    ///
    /// Rate limiting and server errors are retryable, except 501 which will
    /// not change on a second attempt. Local errors never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Http { status, .. } => is_retryable_status(*status),
            ApiError::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

pub(crate) fn is_retryable_status(status: u16) -> bool {
    status == 429 || (status >= 500 && status != 501)
}

/// Problems found while reading `ServiceOptions` from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("{key} is required when auth type is {auth_type}")]
    MissingCredential { key: String, auth_type: String },

    #[error("unsupported auth type: {0}")]
    UnsupportedAuthType(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parameters_lists_every_name() {
        let err = ApiError::MissingParameters(vec!["productId".to_string(), "reason".to_string()]);
        assert_eq!(err.to_string(), "Missing required parameters: productId, reason");
    }

    #[test]
    fn http_error_display_and_status() {
        let err = ApiError::Http {
            status: 404,
            message: "product not found".to_string(),
            body: String::new(),
        };
        assert_eq!(err.to_string(), "HTTP 404: product not found");
        assert_eq!(err.status_code(), Some(404));
        assert!(!err.is_retryable());
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(501));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(404));
    }

    #[test]
    fn validation_errors_are_never_retried() {
        let err = ApiError::MissingParameters(vec!["productId".to_string()]);
        assert!(!err.is_retryable());
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn config_error_is_transparent() {
        let err: ApiError = ConfigError::UnsupportedAuthType("iam".to_string()).into();
        assert_eq!(err.to_string(), "unsupported auth type: iam");
    }
}
