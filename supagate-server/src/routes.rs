//! HTTP routes and handlers
//!
//! Handlers are thin: extract the JSON body, open a [`LogContext`], call the
//! matching service and map its outcome to a response.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use supagate_core::{CorrelationId, LogContext, RlsPolicy, SchemaData};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::gateway::edge_function::{
    CreateEdgeFunctionRequest, EdgeFunctionNameRequest, GetEdgeFunctionsRequest,
    UpdateEdgeFunctionRequest,
};
use crate::gateway::error::{EXECUTE_SQL_HINT, SCHEMA_INFORMATION_HINT};
use crate::gateway::policy::{
    CreateRlsPolicyRequest, DeleteRlsPolicyRequest, GetRlsPoliciesRequest, UpdateRlsPolicyRequest,
};
use crate::gateway::schema::{
    CreateSchemaRequest, DeleteSchemaRequest, ExecuteQueryRequest, GetDatabaseSchemaRequest,
};
use crate::gateway::storage::{
    CreateBucketPolicyRequest, CreateBucketRequest, DeleteBucketPolicyRequest, DeleteBucketRequest,
    GetBucketPoliciesRequest, GetBucketsRequest, UpdateBucketPolicyRequest, UpdateBucketRequest,
};
use crate::gateway::table::{
    AlterTableRequest, CreateTableRequest, DropTableRequest, QueryTableRequest, SchemaRequest,
};
use crate::gateway::{
    AlterTableResponse, ApiError, Backend, EdgeFunctionResponse, EdgeFunctionService,
    MutationResponse, PolicyService, SchemaService, Specification, StorageService, TableService,
    TypesResponse,
};

const COMPONENT: &str = "supagate-server";

/// Request header carrying a caller-supplied correlation ID
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Shared, read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn Backend>,
    pub specification: Arc<Specification>,
}

impl AppState {
    pub fn new(backend: Arc<dyn Backend>, specification: Arc<Specification>) -> Self {
        Self {
            backend,
            specification,
        }
    }

    fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }
}

/// Open a log context, joining the caller's correlation ID when one is sent
fn request_context(operation: &str, headers: &HeaderMap) -> LogContext {
    match headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
    {
        Some(id) => LogContext::with_correlation_id(
            CorrelationId::from_string(id.to_string()),
            operation,
            COMPONENT,
        ),
        None => LogContext::new(operation, COMPONENT),
    }
}

type Payload<T> = Result<Json<T>, JsonRejection>;
type ApiResult<T> = Result<Json<T>, ApiError>;

/// Unwrap a JSON body, turning rejections into 400 responses
fn body<T>(context: &LogContext, payload: Payload<T>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(request)) => Ok(request),
        Err(rejection) => {
            context.warn(&format!("Invalid request body: {}", rejection.body_text()));
            Err(rejection.into())
        }
    }
}

fn finish<T, E: Into<ApiError>>(context: &LogContext, result: Result<T, E>) -> ApiResult<T> {
    match result {
        Ok(value) => {
            context.debug("Request completed");
            Ok(Json(value))
        }
        Err(e) => {
            let error = e.into();
            context.warn(&format!("Request failed: {}", error));
            Err(error)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub supabase: &'static str,
}

async fn server_info(headers: HeaderMap) -> Json<ServerInfo> {
    let context = request_context("server_info", &headers);
    context.debug("Server info requested");
    Json(ServerInfo {
        name: "Supagate",
        version: env!("CARGO_PKG_VERSION"),
        description: "HTTP gateway for self-hosted Supabase",
        status: "running",
    })
}

async fn health(State(state): State<AppState>, headers: HeaderMap) -> Json<HealthResponse> {
    let context = request_context("health_check", &headers);
    let connected = state.backend().ping().instrument(context.span()).await;
    context.debug(&format!("Supabase reachable: {}", connected));

    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        supabase: if connected { "connected" } else { "disconnected" },
    })
}

async fn specification(State(state): State<AppState>, headers: HeaderMap) -> Json<Specification> {
    let context = request_context("get_specification", &headers);
    context.debug(&format!("Serving {} operations", state.specification.functions.len()));
    Json(state.specification.as_ref().clone())
}

// Database

async fn execute_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<ExecuteQueryRequest>,
) -> ApiResult<Value> {
    let context = request_context("execute_query", &headers);
    let request = body(&context, payload)?;
    let result = SchemaService::execute_query(state.backend(), request)
        .instrument(context.span())
        .await
        .map_err(|e| ApiError::from(e).with_rpc_hint(EXECUTE_SQL_HINT));
    finish(&context, result)
}

async fn get_database_schema(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<GetDatabaseSchemaRequest>,
) -> ApiResult<SchemaData> {
    let context = request_context("get_database_schema", &headers);
    let request = body(&context, payload)?;
    let result = SchemaService::get_database_schema(state.backend(), request)
        .instrument(context.span())
        .await
        .map_err(|e| ApiError::from(e).with_rpc_hint(EXECUTE_SQL_HINT));
    finish(&context, result)
}

async fn create_schema(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<CreateSchemaRequest>,
) -> ApiResult<MutationResponse> {
    let context = request_context("create_schema", &headers);
    let request = body(&context, payload)?;
    finish(&context, SchemaService::create(state.backend(), request).instrument(context.span()).await)
}

async fn delete_schema(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<DeleteSchemaRequest>,
) -> ApiResult<MutationResponse> {
    let context = request_context("delete_schema", &headers);
    let request = body(&context, payload)?;
    finish(&context, SchemaService::delete(state.backend(), request).instrument(context.span()).await)
}

// RLS policies

async fn get_rls_policies(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<GetRlsPoliciesRequest>,
) -> ApiResult<Vec<RlsPolicy>> {
    let context = request_context("get_rls_policies", &headers);
    let request = body(&context, payload)?;
    let result = PolicyService::list(state.backend(), request)
        .instrument(context.span())
        .await
        .map_err(|e| {
            ApiError::from(e)
                .with_rpc_status(StatusCode::INTERNAL_SERVER_ERROR)
                .with_rpc_hint(EXECUTE_SQL_HINT)
        });
    finish(&context, result)
}

async fn create_rls_policy(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<CreateRlsPolicyRequest>,
) -> ApiResult<MutationResponse> {
    let context = request_context("create_rls_policy", &headers);
    let request = body(&context, payload)?;
    finish(&context, PolicyService::create(state.backend(), request).instrument(context.span()).await)
}

async fn update_rls_policy(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<UpdateRlsPolicyRequest>,
) -> ApiResult<MutationResponse> {
    let context = request_context("update_rls_policy", &headers);
    let request = body(&context, payload)?;
    finish(&context, PolicyService::update(state.backend(), request).instrument(context.span()).await)
}

async fn delete_rls_policy(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<DeleteRlsPolicyRequest>,
) -> ApiResult<MutationResponse> {
    let context = request_context("delete_rls_policy", &headers);
    let request = body(&context, payload)?;
    finish(&context, PolicyService::delete(state.backend(), request).instrument(context.span()).await)
}

// Tables

async fn query_table(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<QueryTableRequest>,
) -> ApiResult<Value> {
    let context = request_context("query_table", &headers);
    let request = body(&context, payload)?;
    finish(&context, TableService::query(state.backend(), request).instrument(context.span()).await)
}

async fn generate_types(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<SchemaRequest>,
) -> ApiResult<TypesResponse> {
    let context = request_context("generate_types", &headers);
    let request = body(&context, payload)?;
    let result = TableService::generate_types(state.backend(), request)
        .instrument(context.span())
        .await
        .map_err(|e| ApiError::from(e).with_rpc_hint(SCHEMA_INFORMATION_HINT));
    finish(&context, result)
}

async fn list_tables(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<SchemaRequest>,
) -> ApiResult<Value> {
    let context = request_context("list_tables", &headers);
    let request = body(&context, payload)?;
    finish(&context, TableService::list(state.backend(), request).instrument(context.span()).await)
}

async fn create_table(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<CreateTableRequest>,
) -> ApiResult<MutationResponse> {
    let context = request_context("create_table", &headers);
    let request = body(&context, payload)?;
    finish(&context, TableService::create(state.backend(), request).instrument(context.span()).await)
}

async fn alter_table(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<AlterTableRequest>,
) -> ApiResult<AlterTableResponse> {
    let context = request_context("alter_table", &headers);
    let request = body(&context, payload)?;
    finish(&context, TableService::alter(state.backend(), request).instrument(context.span()).await)
}

async fn drop_table(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<DropTableRequest>,
) -> ApiResult<MutationResponse> {
    let context = request_context("drop_table", &headers);
    let request = body(&context, payload)?;
    finish(&context, TableService::drop(state.backend(), request).instrument(context.span()).await)
}

// Storage

async fn get_buckets(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<GetBucketsRequest>,
) -> ApiResult<Value> {
    let context = request_context("get_buckets", &headers);
    let request = body(&context, payload)?;
    finish(&context, StorageService::list_buckets(state.backend(), request).instrument(context.span()).await)
}

async fn create_bucket(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<CreateBucketRequest>,
) -> ApiResult<MutationResponse> {
    let context = request_context("create_bucket", &headers);
    let request = body(&context, payload)?;
    finish(&context, StorageService::create_bucket(state.backend(), request).instrument(context.span()).await)
}

async fn update_bucket(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<UpdateBucketRequest>,
) -> ApiResult<MutationResponse> {
    let context = request_context("update_bucket", &headers);
    let request = body(&context, payload)?;
    finish(&context, StorageService::update_bucket(state.backend(), request).instrument(context.span()).await)
}

async fn delete_bucket(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<DeleteBucketRequest>,
) -> ApiResult<MutationResponse> {
    let context = request_context("delete_bucket", &headers);
    let request = body(&context, payload)?;
    finish(&context, StorageService::delete_bucket(state.backend(), request).instrument(context.span()).await)
}

async fn get_bucket_policies(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<GetBucketPoliciesRequest>,
) -> ApiResult<Value> {
    let context = request_context("get_bucket_policies", &headers);
    let request = body(&context, payload)?;
    finish(&context, StorageService::list_policies(state.backend(), request).instrument(context.span()).await)
}

async fn create_bucket_policy(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<CreateBucketPolicyRequest>,
) -> ApiResult<MutationResponse> {
    let context = request_context("create_bucket_policy", &headers);
    let request = body(&context, payload)?;
    finish(&context, StorageService::create_policy(state.backend(), request).instrument(context.span()).await)
}

async fn update_bucket_policy(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<UpdateBucketPolicyRequest>,
) -> ApiResult<MutationResponse> {
    let context = request_context("update_bucket_policy", &headers);
    let request = body(&context, payload)?;
    finish(&context, StorageService::update_policy(state.backend(), request).instrument(context.span()).await)
}

async fn delete_bucket_policy(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<DeleteBucketPolicyRequest>,
) -> ApiResult<MutationResponse> {
    let context = request_context("delete_bucket_policy", &headers);
    let request = body(&context, payload)?;
    finish(&context, StorageService::delete_policy(state.backend(), request).instrument(context.span()).await)
}

// Edge functions

async fn get_edge_functions(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<GetEdgeFunctionsRequest>,
) -> ApiResult<EdgeFunctionResponse> {
    let context = request_context("get_edge_functions", &headers);
    let request = body(&context, payload)?;
    finish(&context, EdgeFunctionService::list(state.backend(), request).instrument(context.span()).await)
}

async fn create_edge_function(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<CreateEdgeFunctionRequest>,
) -> ApiResult<EdgeFunctionResponse> {
    let context = request_context("create_edge_function", &headers);
    let request = body(&context, payload)?;
    finish(&context, EdgeFunctionService::create(state.backend(), request).instrument(context.span()).await)
}

async fn update_edge_function(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<UpdateEdgeFunctionRequest>,
) -> ApiResult<EdgeFunctionResponse> {
    let context = request_context("update_edge_function", &headers);
    let request = body(&context, payload)?;
    finish(&context, EdgeFunctionService::update(state.backend(), request).instrument(context.span()).await)
}

async fn delete_edge_function(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Payload<EdgeFunctionNameRequest>,
) -> ApiResult<EdgeFunctionResponse> {
    let context = request_context("delete_edge_function", &headers);
    let request = body(&context, payload)?;
    finish(&context, EdgeFunctionService::delete(state.backend(), request).instrument(context.span()).await)
}

async fn deploy_edge_function(
    headers: HeaderMap,
    payload: Payload<EdgeFunctionNameRequest>,
) -> ApiResult<EdgeFunctionResponse> {
    let context = request_context("deploy_edge_function", &headers);
    let request = body(&context, payload)?;
    finish(&context, EdgeFunctionService::deploy(request))
}

/// Build the application router with CORS and request tracing
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(server_info))
        .route("/health", get(health))
        .route("/v1/specification", get(specification))
        .route("/v1/execute_query", post(execute_query))
        .route("/v1/get_database_schema", post(get_database_schema))
        .route("/v1/create_schema", post(create_schema))
        .route("/v1/delete_schema", post(delete_schema))
        .route("/v1/get_rls_policies", post(get_rls_policies))
        .route("/v1/create_rls_policy", post(create_rls_policy))
        .route("/v1/update_rls_policy", post(update_rls_policy))
        .route("/v1/delete_rls_policy", post(delete_rls_policy))
        .route("/v1/query_table", post(query_table))
        .route("/v1/generate_types", post(generate_types))
        .route("/v1/list_tables", post(list_tables))
        .route("/v1/create_table", post(create_table))
        .route("/v1/alter_table", post(alter_table))
        .route("/v1/drop_table", post(drop_table))
        .route("/v1/get_buckets", post(get_buckets))
        .route("/v1/create_bucket", post(create_bucket))
        .route("/v1/update_bucket", post(update_bucket))
        .route("/v1/delete_bucket", post(delete_bucket))
        .route("/v1/get_bucket_policies", post(get_bucket_policies))
        .route("/v1/create_bucket_policy", post(create_bucket_policy))
        .route("/v1/update_bucket_policy", post(update_bucket_policy))
        .route("/v1/delete_bucket_policy", post(delete_bucket_policy))
        .route("/v1/get_edge_functions", post(get_edge_functions))
        .route("/v1/create_edge_function", post(create_edge_function))
        .route("/v1/update_edge_function", post(update_edge_function))
        .route("/v1/delete_edge_function", post(delete_edge_function))
        .route("/v1/deploy_edge_function", post(deploy_edge_function))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
