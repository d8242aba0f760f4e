//! Edge function records kept in an `edge_functions` table.
//!
//! Self-hosted Supabase has no standard place for edge function sources, so
//! every backend failure here turns into an "implementation needed" answer
//! rather than an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use supagate_core::{EdgeFunction, Result, quote_literal};

use crate::gateway::client::{Backend, execute_sql};
use crate::gateway::response::{ImplementationNeeded, MutationResponse, require, require_all};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GetEdgeFunctionsRequest {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateEdgeFunctionRequest {
    pub name: String,
    pub code: String,
    pub verify_jwt: bool,
    pub import_map: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateEdgeFunctionRequest {
    pub name: String,
    pub code: String,
    pub verify_jwt: Option<bool>,
    pub import_map: Option<BTreeMap<String, String>>,
}

/// Body for delete and deploy, which only need the function name
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EdgeFunctionNameRequest {
    pub name: String,
}

/// Answer of an edge function operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EdgeFunctionResponse {
    Listing(Value),
    Done(MutationResponse),
    ImplementationNeeded(ImplementationNeeded),
}

fn import_map_literal(import_map: &BTreeMap<String, String>) -> Result<String> {
    Ok(quote_literal(&serde_json::to_string(import_map)?))
}

pub fn insert_edge_function_sql(function: &EdgeFunction) -> Result<String> {
    Ok(format!(
        "INSERT INTO edge_functions (name, code, verify_jwt, import_map, created_at, updated_at) \
         VALUES ({}, {}, {}, {}, NOW(), NOW())",
        quote_literal(&function.name),
        quote_literal(&function.code),
        function.verify_jwt,
        import_map_literal(&function.import_map)?
    ))
}

pub fn update_edge_function_sql(request: &UpdateEdgeFunctionRequest) -> Result<String> {
    let mut sql = format!("UPDATE edge_functions SET code = {}", quote_literal(&request.code));
    if let Some(verify_jwt) = request.verify_jwt {
        sql.push_str(&format!(", verify_jwt = {}", verify_jwt));
    }
    if let Some(import_map) = &request.import_map {
        sql.push_str(&format!(", import_map = {}", import_map_literal(import_map)?));
    }
    sql.push_str(&format!(", updated_at = NOW() WHERE name = {}", quote_literal(&request.name)));
    Ok(sql)
}

fn needs_implementation(action: &str) -> ImplementationNeeded {
    ImplementationNeeded::new(format!(
        "{} requires a specific implementation for your self-hosted Supabase setup",
        action
    ))
}

/// Edge function service
pub struct EdgeFunctionService;

impl EdgeFunctionService {
    pub async fn list(backend: &dyn Backend, request: GetEdgeFunctionsRequest) -> Result<EdgeFunctionResponse> {
        let mut sql = "SELECT * FROM edge_functions".to_string();
        if !request.name.trim().is_empty() {
            sql.push_str(&format!(" WHERE name = {}", quote_literal(&request.name)));
        }

        match execute_sql(backend, &sql).await {
            Ok(Value::Null) => Ok(EdgeFunctionResponse::ImplementationNeeded(
                needs_implementation("Edge functions management").with_empty_listing(),
            )),
            Ok(functions) => Ok(EdgeFunctionResponse::Listing(functions)),
            Err(e) => {
                tracing::warn!("Edge function listing unavailable: {}", e);
                Ok(EdgeFunctionResponse::ImplementationNeeded(
                    needs_implementation("Edge functions management").with_empty_listing(),
                ))
            }
        }
    }

    pub async fn create(backend: &dyn Backend, request: CreateEdgeFunctionRequest) -> Result<EdgeFunctionResponse> {
        require_all(
            &[request.name.as_str(), request.code.as_str()],
            "Missing required parameters",
        )?;
        let function = EdgeFunction {
            name: request.name,
            code: request.code,
            verify_jwt: request.verify_jwt,
            import_map: request.import_map,
        };

        match execute_sql(backend, &insert_edge_function_sql(&function)?).await {
            Ok(_) => {
                tracing::info!("Created edge function: {}", function.name);
                Ok(EdgeFunctionResponse::Done(MutationResponse::success(format!(
                    "Edge function '{}' created successfully",
                    function.name
                ))))
            }
            Err(e) => {
                tracing::warn!("Edge function creation unavailable: {}", e);
                Ok(EdgeFunctionResponse::ImplementationNeeded(
                    needs_implementation("Edge function creation").for_function(function.name),
                ))
            }
        }
    }

    pub async fn update(backend: &dyn Backend, request: UpdateEdgeFunctionRequest) -> Result<EdgeFunctionResponse> {
        require_all(
            &[request.name.as_str(), request.code.as_str()],
            "Missing required parameters",
        )?;

        match execute_sql(backend, &update_edge_function_sql(&request)?).await {
            Ok(_) => {
                tracing::info!("Updated edge function: {}", request.name);
                Ok(EdgeFunctionResponse::Done(MutationResponse::success(format!(
                    "Edge function '{}' updated successfully",
                    request.name
                ))))
            }
            Err(e) => {
                tracing::warn!("Edge function update unavailable: {}", e);
                Ok(EdgeFunctionResponse::ImplementationNeeded(
                    needs_implementation("Edge function update").for_function(request.name),
                ))
            }
        }
    }

    pub async fn delete(backend: &dyn Backend, request: EdgeFunctionNameRequest) -> Result<EdgeFunctionResponse> {
        require(&request.name, "Function name is required")?;

        let sql = format!("DELETE FROM edge_functions WHERE name = {}", quote_literal(&request.name));
        match execute_sql(backend, &sql).await {
            Ok(_) => {
                tracing::info!("Deleted edge function: {}", request.name);
                Ok(EdgeFunctionResponse::Done(MutationResponse::success(format!(
                    "Edge function '{}' deleted successfully",
                    request.name
                ))))
            }
            Err(e) => {
                tracing::warn!("Edge function deletion unavailable: {}", e);
                Ok(EdgeFunctionResponse::ImplementationNeeded(
                    needs_implementation("Edge function deletion").for_function(request.name),
                ))
            }
        }
    }

    /// Deployment has no generic mechanism; only the name is validated
    pub fn deploy(request: EdgeFunctionNameRequest) -> Result<EdgeFunctionResponse> {
        require(&request.name, "Function name is required")?;
        Ok(EdgeFunctionResponse::ImplementationNeeded(
            needs_implementation("Edge function deployment").for_function(request.name),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::client::MockBackend;
    use serde_json::json;
    use supagate_core::RpcError;

    #[test]
    fn test_insert_escapes_code_and_import_map() {
        let mut import_map = BTreeMap::new();
        import_map.insert("std/".to_string(), "https://deno.land/std/".to_string());
        let function = EdgeFunction {
            name: "hello".to_string(),
            code: "console.log('hi')".to_string(),
            verify_jwt: true,
            import_map,
        };

        let sql = insert_edge_function_sql(&function).unwrap();
        assert!(sql.contains("'console.log(''hi'')'"));
        assert!(sql.contains(r#"true, '{"std/":"https://deno.land/std/"}', NOW(), NOW()"#));
    }

    #[test]
    fn test_update_sql_only_sets_given_fields() {
        let request = UpdateEdgeFunctionRequest {
            name: "hello".to_string(),
            code: "export default 1".to_string(),
            verify_jwt: Some(false),
            import_map: None,
        };
        assert_eq!(
            update_edge_function_sql(&request).unwrap(),
            "UPDATE edge_functions SET code = 'export default 1', verify_jwt = false, updated_at = NOW() WHERE name = 'hello'"
        );
    }

    #[tokio::test]
    async fn test_list_degrades_on_backend_failure() {
        let mut backend = MockBackend::new();
        backend
            .expect_invoke()
            .returning(|_, _| Err(RpcError::remote(404, "relation \"edge_functions\" does not exist")));

        let response = EdgeFunctionService::list(&backend, GetEdgeFunctionsRequest::default())
            .await
            .unwrap();
        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(body["implementation_needed"], true);
        assert_eq!(body["functions"], json!([]));
    }

    #[tokio::test]
    async fn test_create_degrades_with_function_name() {
        let mut backend = MockBackend::new();
        backend
            .expect_invoke()
            .returning(|_, _| Err(RpcError::network("connection refused")));

        let request = CreateEdgeFunctionRequest {
            name: "hello".to_string(),
            code: "export default 1".to_string(),
            ..Default::default()
        };
        let body = serde_json::to_value(EdgeFunctionService::create(&backend, request).await.unwrap()).unwrap();
        assert_eq!(body["implementation_needed"], true);
        assert_eq!(body["function_name"], "hello");
    }

    #[tokio::test]
    async fn test_create_requires_code() {
        let mut backend = MockBackend::new();
        backend.expect_invoke().never();

        let request = CreateEdgeFunctionRequest {
            name: "hello".to_string(),
            ..Default::default()
        };
        assert!(EdgeFunctionService::create(&backend, request).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_success() {
        let mut backend = MockBackend::new();
        backend
            .expect_invoke()
            .withf(|_, payload| payload["query"] == "DELETE FROM edge_functions WHERE name = 'hello'")
            .returning(|_, _| Ok(json!([])));

        let request = EdgeFunctionNameRequest {
            name: "hello".to_string(),
        };
        let body = serde_json::to_value(EdgeFunctionService::delete(&backend, request).await.unwrap()).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Edge function 'hello' deleted successfully");
    }

    #[test]
    fn test_deploy_always_needs_implementation() {
        let response = EdgeFunctionService::deploy(EdgeFunctionNameRequest {
            name: "hello".to_string(),
        })
        .unwrap();
        assert!(matches!(response, EdgeFunctionResponse::ImplementationNeeded(_)));
        assert!(EdgeFunctionService::deploy(EdgeFunctionNameRequest::default()).is_err());
    }
}
