//! SupabaseClient tests against a local stub of the Supabase REST API

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};
use supagate_core::RpcError;
use supagate_server::{Backend, Filter, FilterOperator, SelectRequest, SupabaseClient};

/// What the stub saw on its last request
#[derive(Debug, Default, Clone)]
struct Seen {
    path: String,
    apikey: Option<String>,
    authorization: Option<String>,
    accept_profile: Option<String>,
    query: HashMap<String, String>,
    body: Value,
}

type Shared = Arc<Mutex<Seen>>;

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

async fn rpc(
    State(seen): State<Shared>,
    Path(function): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> axum::response::Response {
    if let Ok(mut seen) = seen.lock() {
        seen.path = format!("/rest/v1/rpc/{}", function);
        seen.apikey = header(&headers, "apikey");
        seen.authorization = header(&headers, "authorization");
        seen.body = body.clone();
    }

    match function.as_str() {
        "execute_sql" => Json(json!([{ "echo": body["query"] }])).into_response(),
        "silent" => StatusCode::NO_CONTENT.into_response(),
        "broken" => (
            StatusCode::NOT_FOUND,
            Json(json!({ "code": "PGRST202", "message": "Could not find the function public.broken" })),
        )
            .into_response(),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "plain failure").into_response(),
    }
}

async fn table(
    State(seen): State<Shared>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    if let Ok(mut seen) = seen.lock() {
        seen.path = format!("/rest/v1/{}", table);
        seen.apikey = header(&headers, "apikey");
        seen.accept_profile = header(&headers, "accept-profile");
        seen.query = query;
    }
    Json(json!([{ "id": 1 }]))
}

async fn stub() -> Result<(SupabaseClient, Shared), Box<dyn Error>> {
    let seen: Shared = Arc::new(Mutex::new(Seen::default()));
    let app = Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/rest/v1/rpc/{function}", post(rpc))
        .route("/rest/v1/{table}", get(table))
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let client = SupabaseClient::new(format!("http://{}/", address), "service-key");
    Ok((client, seen))
}

fn last(seen: &Shared) -> Seen {
    seen.lock().map(|s| s.clone()).unwrap_or_default()
}

#[tokio::test]
async fn test_invoke_signs_and_posts_payload() -> Result<(), Box<dyn Error>> {
    let (client, seen) = stub().await?;

    let rows = client.invoke("execute_sql", json!({ "query": "SELECT 1" })).await?;
    assert_eq!(rows, json!([{ "echo": "SELECT 1" }]));

    let seen = last(&seen);
    assert_eq!(seen.path, "/rest/v1/rpc/execute_sql");
    assert_eq!(seen.apikey.as_deref(), Some("service-key"));
    assert_eq!(seen.authorization.as_deref(), Some("Bearer service-key"));
    assert_eq!(seen.body, json!({ "query": "SELECT 1" }));
    Ok(())
}

#[tokio::test]
async fn test_invoke_empty_body_is_null() -> Result<(), Box<dyn Error>> {
    let (client, _) = stub().await?;
    assert_eq!(client.invoke("silent", json!({})).await?, Value::Null);
    Ok(())
}

#[tokio::test]
async fn test_invoke_maps_remote_errors() -> Result<(), Box<dyn Error>> {
    let (client, _) = stub().await?;

    match client.invoke("broken", json!({})).await {
        Err(RpcError::Remote { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "Could not find the function public.broken");
        }
        other => panic!("expected remote error, got {:?}", other),
    }

    match client.invoke("anything_else", json!({})).await {
        Err(e) => assert_eq!(
            e.to_string(),
            "Function call failed with status code: 500 - plain failure"
        ),
        Ok(value) => panic!("expected failure, got {}", value),
    }
    Ok(())
}

#[tokio::test]
async fn test_select_rows_sends_filters_and_profile() -> Result<(), Box<dyn Error>> {
    let (client, seen) = stub().await?;

    let request = SelectRequest::new("shop", "orders")
        .with_select("id,total")
        .with_filter(Filter::new("status", FilterOperator::Eq, &json!("paid")))
        .with_limit(10);
    let rows = client.select_rows(&request).await?;
    assert_eq!(rows, json!([{ "id": 1 }]));

    let seen = last(&seen);
    assert_eq!(seen.path, "/rest/v1/orders");
    assert_eq!(seen.apikey.as_deref(), Some("service-key"));
    assert_eq!(seen.accept_profile.as_deref(), Some("shop"));
    assert_eq!(seen.query.get("select").map(String::as_str), Some("id,total"));
    assert_eq!(seen.query.get("status").map(String::as_str), Some("eq.paid"));
    assert_eq!(seen.query.get("limit").map(String::as_str), Some("10"));
    Ok(())
}

#[tokio::test]
async fn test_select_rows_public_schema_has_no_profile() -> Result<(), Box<dyn Error>> {
    let (client, seen) = stub().await?;

    client.select_rows(&SelectRequest::new("public", "users")).await?;
    assert_eq!(last(&seen).accept_profile, None);
    Ok(())
}

#[tokio::test]
async fn test_ping() -> Result<(), Box<dyn Error>> {
    let (client, _) = stub().await?;
    assert!(client.ping().await);

    let unreachable = SupabaseClient::new("http://127.0.0.1:1", "service-key");
    assert!(!unreachable.ping().await);
    Ok(())
}
