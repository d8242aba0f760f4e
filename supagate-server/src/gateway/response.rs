//! Response bodies and request checks shared by the services

use serde::Serialize;
use supagate_core::{GatewayError, Result};

/// `{success, message}` body returned by every write operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationResponse {
    pub success: bool,
    pub message: String,
    /// How the change was applied, when more than one path exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<&'static str>,
}

impl MutationResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            method: None,
        }
    }

    pub fn with_method(mut self, method: &'static str) -> Self {
        self.method = Some(method);
        self
    }
}

/// Body returned when the backend has no usable implementation for an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImplementationNeeded {
    pub message: String,
    pub implementation_needed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<serde_json::Value>>,
}

impl ImplementationNeeded {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            implementation_needed: true,
            function_name: None,
            functions: None,
        }
    }

    pub fn for_function(mut self, name: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self
    }

    pub fn with_empty_listing(mut self) -> Self {
        self.functions = Some(Vec::new());
        self
    }
}

/// Fail with a validation error when a required field is blank
pub fn require(value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GatewayError::validation(message));
    }
    Ok(())
}

/// Fail with a validation error unless every field is filled in
pub fn require_all(values: &[&str], message: &str) -> Result<()> {
    if values.iter().any(|value| value.trim().is_empty()) {
        return Err(GatewayError::validation(message));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_response_serialization() {
        let plain = MutationResponse::success("Schema 'audit' created successfully");
        assert_eq!(
            serde_json::to_value(&plain).unwrap(),
            serde_json::json!({"success": true, "message": "Schema 'audit' created successfully"})
        );

        let with_method = MutationResponse::success("Bucket 'a' created successfully").with_method("sql");
        assert_eq!(serde_json::to_value(&with_method).unwrap()["method"], "sql");
    }

    #[test]
    fn test_implementation_needed_serialization() {
        let body = ImplementationNeeded::new("not available").with_empty_listing();
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["implementation_needed"], true);
        assert_eq!(value["functions"], serde_json::json!([]));
        assert!(value.get("function_name").is_none());
    }

    #[test]
    fn test_require() {
        assert!(require("users", "Table name is required").is_ok());
        let err = require("  ", "Table name is required").unwrap_err();
        assert_eq!(err.client_message(), "Table name is required");
        assert!(require_all(&["a", ""], "Missing required parameters").is_err());
        assert!(require_all(&["a", "b"], "Missing required parameters").is_ok());
    }
}
