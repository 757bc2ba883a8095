// Error handling module
// Defines the error taxonomy for transport, authentication and locale loading

use thiserror::Error;

/// Failures raised by the request layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Request never produced an HTTP response (timeout, connect, ...)
    #[error("Network error ({kind}): {message}")]
    Network { kind: &'static str, message: String },

    /// Server answered with a non-success status
    #[error("Server error: {status} - {message}")]
    Status { status: u16, message: String },

    /// GraphQL response carried an `errors` array
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

impl TransportError {
    /// Whether the request may succeed if issued again
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Network { .. } => true,
            TransportError::Status { status, .. } => *status == 429 || *status >= 500,
            TransportError::GraphQl(_) | TransportError::Decode(_) => false,
        }
    }
}

/// Authentication lifecycle errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    /// Credentials were refused by the server
    #[error("Login rejected: invalid credentials")]
    Rejected,

    /// No valid session exists; the normal "not logged in" outcome of a silent refresh
    #[error("Token refresh denied")]
    RefreshDenied,

    /// Request layer failure
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    /// Server reported success but the payload is unusable
    #[error("Malformed auth response: {0}")]
    MalformedResponse(String),
}

/// Locale loading errors
#[derive(Error, Debug)]
pub enum LocaleError {
    #[error("Unsupported locale: {0}")]
    Unsupported(String),

    #[error("Failed to read locale file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse locale file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            AuthError::Rejected.to_string(),
            "Login rejected: invalid credentials"
        );
        assert_eq!(AuthError::RefreshDenied.to_string(), "Token refresh denied");

        let err = AuthError::Transport(TransportError::Status {
            status: 502,
            message: "Bad gateway".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Transport failure: Server error: 502 - Bad gateway"
        );
    }

    #[test]
    fn test_network_error_message() {
        let err = TransportError::Network {
            kind: "timeout",
            message: "operation timed out".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Network error (timeout): operation timed out"
        );
    }

    #[test]
    fn test_transport_error_converts_into_auth_error() {
        let err: AuthError = TransportError::GraphQl("boom".to_string()).into();
        assert!(matches!(err, AuthError::Transport(TransportError::GraphQl(_))));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(TransportError::Network {
            kind: "connection_failed",
            message: String::new()
        }
        .is_retryable());
        assert!(TransportError::Status {
            status: 429,
            message: String::new()
        }
        .is_retryable());
        assert!(TransportError::Status {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(!TransportError::Status {
            status: 400,
            message: String::new()
        }
        .is_retryable());
        assert!(!TransportError::GraphQl("x".to_string()).is_retryable());
        assert!(!TransportError::Decode("x".to_string()).is_retryable());
    }

    #[test]
    fn test_locale_error_message() {
        let err = LocaleError::Unsupported("xx".to_string());
        assert_eq!(err.to_string(), "Unsupported locale: xx");
    }
}
