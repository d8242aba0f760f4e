//! HTTP error responses for the gateway endpoints.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use supagate_core::GatewayError;

/// Hint attached to failures of operations that depend on `execute_sql`
pub const EXECUTE_SQL_HINT: &str = "Unable to execute query. You may need to create a custom function 'execute_sql' in your Supabase instance.";

/// Hint attached to `generate_types` when neither source of table metadata works
pub const SCHEMA_INFORMATION_HINT: &str = "Unable to generate types. You may need to create a custom function to retrieve schema information in your Supabase instance.";

/// JSON error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A [`GatewayError`] paired with the HTTP status it is reported with
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: GatewayError,
    hint: Option<String>,
}

impl ApiError {
    pub fn new(error: GatewayError) -> Self {
        let status = match &error {
            GatewayError::Validation { .. } => StatusCode::BAD_REQUEST,
            GatewayError::Forbidden { .. } => StatusCode::FORBIDDEN,
            GatewayError::Rpc(_) => StatusCode::BAD_REQUEST,
            GatewayError::Config { .. } | GatewayError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            error,
            hint: None,
        }
    }

    /// Report backend failures with a different status
    pub fn with_rpc_status(mut self, status: StatusCode) -> Self {
        if matches!(self.error, GatewayError::Rpc(_)) {
            self.status = status;
        }
        self
    }

    /// Attach a hint to backend failures
    pub fn with_rpc_hint(mut self, hint: impl Into<String>) -> Self {
        if matches!(self.error, GatewayError::Rpc(_)) {
            self.hint = Some(hint.into());
        }
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn error(&self) -> &GatewayError {
        &self.error
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }
}

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        ApiError::new(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(GatewayError::validation(rejection.body_text()))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.error, self.status)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {}", self.error);
        } else {
            tracing::debug!("Request rejected: {}", self.error);
        }

        let body = Json(ErrorResponse {
            error: self.error.client_message(),
            message: self.hint,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use supagate_core::RpcError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(GatewayError::validation("Query is required")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(GatewayError::forbidden("Only SELECT queries are allowed")).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(GatewayError::from(RpcError::remote(404, "missing"))).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(GatewayError::internal("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rpc_overrides_only_touch_backend_failures() {
        let rpc = ApiError::from(GatewayError::from(RpcError::network("refused")))
            .with_rpc_status(StatusCode::INTERNAL_SERVER_ERROR)
            .with_rpc_hint(EXECUTE_SQL_HINT);
        assert_eq!(rpc.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(rpc.hint(), Some(EXECUTE_SQL_HINT));

        let validation = ApiError::from(GatewayError::validation("Table name is required"))
            .with_rpc_status(StatusCode::INTERNAL_SERVER_ERROR)
            .with_rpc_hint(EXECUTE_SQL_HINT);
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(validation.hint(), None);
    }

    #[test]
    fn test_error_response_serialization() {
        let body = ErrorResponse {
            error: "Table name is required".to_string(),
            message: None,
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"error":"Table name is required"}"#
        );
    }
}
