//! Error types for secrets broker operations.

use thiserror::Error;

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Errors that can occur while talking to the secrets broker.
///
/// Messages never carry tokens or credential values.
#[derive(Error, Debug)]
pub enum BrokerError {
    /// Path or role does not exist on the broker.
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// The broker could not be reached (connect, DNS, timeout).
    #[error("Broker connection failed: {message}")]
    ConnectionFailed { message: String },

    /// The token was rejected or lacks permission for the path.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Role identifier is not usable as a path segment.
    #[error("Invalid role: {role} - {reason}")]
    InvalidRole { role: String, reason: String },

    /// A caller-supplied value failed validation.
    #[error("Invalid value: {reason}")]
    InvalidValue { reason: String },

    /// The broker answered, but the body does not have the expected shape.
    #[error("Invalid broker response: {reason}")]
    InvalidResponse { reason: String },

    /// Any other non-success answer from the broker.
    #[error("Broker error (status {status}): {message}")]
    BackendError { status: u16, message: String },

    /// Client configuration error.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// HTTP layer error that is not a connection failure.
    #[error("HTTP request failed: {0}")]
    HttpError(String),
}

impl BrokerError {
    /// Create a not found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: message.into() }
    }

    /// Create an authentication failed error.
    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::AuthenticationFailed { message: message.into() }
    }

    /// Create an invalid role error.
    pub fn invalid_role(role: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRole { role: role.into(), reason: reason.into() }
    }

    /// Create an invalid value error.
    pub fn invalid_value(reason: impl Into<String>) -> Self {
        Self::InvalidValue { reason: reason.into() }
    }

    /// Create an invalid response error.
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse { reason: reason.into() }
    }

    /// Create a backend error for a non-success status.
    pub fn backend_error(status: u16, message: impl Into<String>) -> Self {
        Self::BackendError { status, message: message.into() }
    }

    /// Create a config error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError { message: message.into() }
    }

    /// Whether a later attempt could succeed without any change on the caller side.
    ///
    /// Only transport failures qualify. The crate never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. })
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::ConnectionFailed { .. } => "connection_failed",
            Self::AuthenticationFailed { .. } => "authentication_failed",
            Self::InvalidRole { .. } => "invalid_role",
            Self::InvalidValue { .. } => "invalid_value",
            Self::InvalidResponse { .. } => "invalid_response",
            Self::BackendError { .. } => "backend_error",
            Self::ConfigError { .. } => "config_error",
            Self::SerializationError(_) => "serialization_error",
            Self::HttpError(_) => "http_error",
        }
    }
}

impl From<reqwest::Error> for BrokerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::connection_failed(err.to_string())
        } else if err.is_decode() {
            Self::invalid_response(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<vaultrs::error::ClientError> for BrokerError {
    fn from(err: vaultrs::error::ClientError) -> Self {
        use vaultrs::error::ClientError;

        match err {
            ClientError::APIError { code, errors } => {
                let message = errors.join("; ");
                match code {
                    401 | 403 => Self::authentication_failed(message),
                    404 => Self::not_found(message),
                    _ => Self::backend_error(code, message),
                }
            }
            other => Self::connection_failed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        let err = BrokerError::not_found("database/creds/readonly");
        assert!(matches!(err, BrokerError::NotFound { .. }));
        assert_eq!(err.to_string(), "Not found: database/creds/readonly");

        let err = BrokerError::connection_failed("connection refused");
        assert!(matches!(err, BrokerError::ConnectionFailed { .. }));

        let err = BrokerError::invalid_role("../admin", "contains '..'");
        assert!(matches!(err, BrokerError::InvalidRole { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = BrokerError::backend_error(500, "internal error");
        assert!(err.to_string().contains("status 500"));
        assert!(err.to_string().contains("internal error"));

        let err = BrokerError::invalid_response("missing field 'password'");
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn test_only_connection_failures_are_retryable() {
        assert!(BrokerError::connection_failed("timeout").is_retryable());
        assert!(!BrokerError::authentication_failed("permission denied").is_retryable());
        assert!(!BrokerError::backend_error(503, "sealed").is_retryable());
    }

    #[test]
    fn test_vaultrs_api_error_mapping() {
        let err: BrokerError = vaultrs::error::ClientError::APIError {
            code: 403,
            errors: vec!["permission denied".to_string()],
        }
        .into();
        assert!(matches!(err, BrokerError::AuthenticationFailed { .. }));

        let err: BrokerError =
            vaultrs::error::ClientError::APIError { code: 400, errors: vec![] }.into();
        assert!(matches!(err, BrokerError::BackendError { status: 400, .. }));
    }
}
