//! Signed HTTP access to the Supabase REST interface.
//!
//! Everything the gateway does against the backend goes through the [`Backend`]
//! trait: RPC calls (`POST /rest/v1/rpc/<fn>`), filtered PostgREST reads
//! (`GET /rest/v1/<table>`) and a reachability probe. [`SupabaseClient`] is the
//! real implementation; tests substitute mocks.

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use supagate_core::RpcError;
use tracing::debug;

use crate::config::SupabaseConfig;

/// Name of the generic SQL execution function every translator relies on
pub const EXECUTE_SQL: &str = "execute_sql";

/// Operations the gateway needs from a Supabase backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    /// Call a server-side function and return its JSON result
    async fn invoke(&self, function: &str, payload: Value) -> Result<Value, RpcError>;

    /// Read rows from a table through PostgREST filters
    async fn select_rows(&self, request: &SelectRequest) -> Result<Value, RpcError>;

    /// Whether the backend base URL answers with a 2xx status
    async fn ping(&self) -> bool;
}

/// Run one SQL statement through the `execute_sql` function
pub async fn execute_sql(backend: &dyn Backend, query: &str) -> Result<Value, RpcError> {
    debug!(query = %query, "Executing SQL");
    backend.invoke(EXECUTE_SQL, json!({ "query": query })).await
}

/// Decode a JSON result into the expected shape, treating `null` as "no rows"
pub fn decode_rows<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, RpcError> {
    let rows: Option<Vec<T>> = serde_json::from_value(value)?;
    Ok(rows.unwrap_or_default())
}

/// PostgREST comparison operators accepted by `query_table`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Ilike,
    Is,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Like => "like",
            FilterOperator::Ilike => "ilike",
            FilterOperator::Is => "is",
        }
    }

    /// Parse an operator name; unknown names yield `None`
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "eq" => Some(FilterOperator::Eq),
            "neq" => Some(FilterOperator::Neq),
            "gt" => Some(FilterOperator::Gt),
            "gte" => Some(FilterOperator::Gte),
            "lt" => Some(FilterOperator::Lt),
            "lte" => Some(FilterOperator::Lte),
            "like" => Some(FilterOperator::Like),
            "ilike" => Some(FilterOperator::Ilike),
            "is" => Some(FilterOperator::Is),
            _ => None,
        }
    }
}

/// One `column=op.value` PostgREST filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub operator: FilterOperator,
    pub value: String,
}

impl Filter {
    /// Build a filter from a JSON value; `null` renders as `null`, strings unquoted
    pub fn new(column: impl Into<String>, operator: FilterOperator, value: &Value) -> Self {
        let value = match value {
            Value::Null => "null".to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self {
            column: column.into(),
            operator,
            value,
        }
    }

    fn query_pair(&self) -> (String, String) {
        (
            self.column.clone(),
            format!("{}.{}", self.operator.as_str(), self.value),
        )
    }
}

/// A filtered read of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectRequest {
    pub schema: String,
    pub table: String,
    pub select: String,
    pub filters: Vec<Filter>,
    pub limit: Option<u32>,
}

impl SelectRequest {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            select: "*".to_string(),
            filters: Vec::new(),
            limit: None,
        }
    }

    pub fn with_select(mut self, select: impl Into<String>) -> Self {
        self.select = select.into();
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query string pairs in PostgREST form
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.select.clone())];
        pairs.extend(self.filters.iter().map(Filter::query_pair));
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }
}

/// HTTP client for one Supabase instance, signed with the service key
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    /// Create a client for the given base URL and service key
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            service_key: service_key.into(),
        }
    }

    pub fn from_config(config: &SupabaseConfig) -> Self {
        Self::new(&config.url, &config.key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, function)
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn signed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    /// Call an RPC function and decode the result into `T`
    pub async fn invoke_as<T, P>(&self, function: &str, payload: &P) -> Result<T, RpcError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let url = self.rpc_url(function);
        debug!(function = %function, url = %url, "Invoking Supabase RPC");

        let response = self
            .signed(self.http.post(&url))
            .json(payload)
            .send()
            .await
            .map_err(|e| RpcError::network(e.to_string()))?;

        decode_response(response).await
    }
}

/// Turn an HTTP response into a decoded body or an [`RpcError`]
async fn decode_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RpcError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| RpcError::network(e.to_string()))?;

    if !status.is_success() {
        let message = remote_message(&body)
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_default();
        debug!(status = status.as_u16(), message = %message, "Supabase call failed");
        return Err(RpcError::remote(status.as_u16(), message));
    }

    if body.trim().is_empty() {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    Ok(serde_json::from_str(&body)?)
}

/// PostgREST error bodies carry a `message` field; fall back to the raw text
fn remote_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => match map.get("message") {
            Some(Value::String(message)) => Some(message.clone()),
            _ => Some(trimmed.to_string()),
        },
        _ => Some(trimmed.to_string()),
    }
}

#[async_trait]
impl Backend for SupabaseClient {
    async fn invoke(&self, function: &str, payload: Value) -> Result<Value, RpcError> {
        self.invoke_as(function, &payload).await
    }

    async fn select_rows(&self, request: &SelectRequest) -> Result<Value, RpcError> {
        let url = self.table_url(&request.table);
        debug!(table = %request.table, schema = %request.schema, "Selecting rows");

        let mut builder = self
            .signed(self.http.get(&url))
            .query(&request.query_pairs());
        if request.schema != supagate_core::sql::DEFAULT_SCHEMA {
            builder = builder.header("Accept-Profile", &request.schema);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RpcError::network(e.to_string()))?;
        decode_response(response).await
    }

    async fn ping(&self) -> bool {
        match self.http.get(&self.base_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Supabase ping failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_trim_trailing_slash() {
        let client = SupabaseClient::new("http://supabase.local:8000/", "service-key");
        assert_eq!(client.base_url(), "http://supabase.local:8000");
        assert_eq!(
            client.rpc_url("execute_sql"),
            "http://supabase.local:8000/rest/v1/rpc/execute_sql"
        );
        assert_eq!(client.table_url("users"), "http://supabase.local:8000/rest/v1/users");
    }

    #[test]
    fn test_debug_hides_service_key() {
        let client = SupabaseClient::new("http://localhost:8000", "super-secret");
        assert!(!format!("{:?}", client).contains("super-secret"));
    }

    #[test]
    fn test_select_request_query_pairs() {
        let request = SelectRequest::new("public", "orders")
            .with_select("id,total")
            .with_filter(Filter::new("status", FilterOperator::Eq, &json!("paid")))
            .with_filter(Filter::new("total", FilterOperator::Gte, &json!(100)))
            .with_filter(Filter::new("deleted_at", FilterOperator::Is, &Value::Null))
            .with_limit(5);

        assert_eq!(
            request.query_pairs(),
            vec![
                ("select".to_string(), "id,total".to_string()),
                ("status".to_string(), "eq.paid".to_string()),
                ("total".to_string(), "gte.100".to_string()),
                ("deleted_at".to_string(), "is.null".to_string()),
                ("limit".to_string(), "5".to_string()),
            ]
        );
    }

    #[test]
    fn test_filter_operator_parse() {
        assert_eq!(FilterOperator::parse("ilike"), Some(FilterOperator::Ilike));
        assert_eq!(FilterOperator::parse("between"), None);
    }

    #[test]
    fn test_remote_message_extraction() {
        assert_eq!(
            remote_message(r#"{"code":"42P01","message":"relation does not exist"}"#),
            Some("relation does not exist".to_string())
        );
        assert_eq!(remote_message("Bad Gateway"), Some("Bad Gateway".to_string()));
        assert_eq!(remote_message("  "), None);
    }

    #[test]
    fn test_decode_rows_treats_null_as_empty() {
        let rows: Vec<Value> = decode_rows(Value::Null).unwrap();
        assert!(rows.is_empty());

        let err = decode_rows::<String>(json!({"not": "a list"})).unwrap_err();
        assert!(matches!(err, RpcError::Decode { .. }));
    }
}
