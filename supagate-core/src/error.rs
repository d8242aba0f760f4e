use thiserror::Error;

/// Main result type for Supagate operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Main error type for Supagate operations
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A required request field is missing, empty or malformed
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// The request asks for something this gateway refuses to forward
    #[error("Forbidden operation: {message}")]
    Forbidden { message: String },

    /// Errors talking to the Supabase backend
    #[error("{0}")]
    Rpc(#[from] RpcError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Internal errors (should not normally occur)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Errors raised by a call against the Supabase REST/RPC interface
#[derive(Debug, Error)]
pub enum RpcError {
    /// The request never produced an HTTP response
    #[error("Network error: {message}")]
    Network { message: String },

    /// The backend answered with a non-2xx status
    #[error("Function call failed with status code: {status} - {message}")]
    Remote { status: u16, message: String },

    /// The response body was not the JSON shape we expected
    #[error("Failed to decode response: {message}")]
    Decode { message: String },
}

/// Convenience methods for creating specific errors
impl GatewayError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a forbidden operation error
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Message without the category prefix, as relayed to API callers
    pub fn client_message(&self) -> String {
        match self {
            GatewayError::Validation { message }
            | GatewayError::Forbidden { message }
            | GatewayError::Config { message }
            | GatewayError::Internal { message } => message.clone(),
            GatewayError::Rpc(e) => e.to_string(),
        }
    }
}

impl RpcError {
    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a remote status error
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// HTTP status returned by the backend, if it answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            RpcError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(error: serde_json::Error) -> Self {
        RpcError::Decode {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(error: serde_json::Error) -> Self {
        GatewayError::Internal {
            message: format!("Serialization error: {}", error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = GatewayError::validation("Table name is required");
        assert!(matches!(error, GatewayError::Validation { .. }));
        assert_eq!(error.to_string(), "Validation error: Table name is required");
        assert_eq!(error.client_message(), "Table name is required");
    }

    #[test]
    fn test_rpc_error_conversion() {
        let rpc_error = RpcError::remote(404, "function not found");
        assert_eq!(rpc_error.status(), Some(404));

        let error: GatewayError = rpc_error.into();
        assert!(matches!(error, GatewayError::Rpc(RpcError::Remote { status: 404, .. })));
        assert_eq!(
            error.client_message(),
            "Function call failed with status code: 404 - function not found"
        );
    }

    #[test]
    fn test_decode_error_from_serde() {
        let parse_error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: RpcError = parse_error.into();
        assert!(matches!(error, RpcError::Decode { .. }));
        assert_eq!(error.status(), None);
    }

    #[test]
    fn test_network_error_display() {
        let error = RpcError::network("connection refused");
        assert_eq!(error.to_string(), "Network error: connection refused");
    }
}
