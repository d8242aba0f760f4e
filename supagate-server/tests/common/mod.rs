//! Shared fixtures for the router tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use supagate_core::RpcError;
use supagate_server::{AppState, Backend, SelectRequest, Specification, router};
use tower::ServiceExt;

/// One recorded `invoke` call
#[derive(Debug, Clone)]
pub struct Call {
    pub function: String,
    pub payload: Value,
}

impl Call {
    pub fn query(&self) -> &str {
        self.payload["query"].as_str().unwrap_or_default()
    }
}

/// Backend that answers from a script and records every call
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<Value, RpcError>>>,
    calls: Mutex<Vec<Call>>,
    selects: Mutex<Vec<SelectRequest>>,
    reachable: bool,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reachable(mut self) -> Self {
        self.reachable = true;
        self
    }

    pub fn reply(self, reply: Result<Value, RpcError>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn selects(&self) -> Vec<SelectRequest> {
        self.selects.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn invoke(&self, function: &str, payload: Value) -> Result<Value, RpcError> {
        self.calls.lock().unwrap().push(Call {
            function: function.to_string(),
            payload,
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Value::Array(Vec::new())))
    }

    async fn select_rows(&self, request: &SelectRequest) -> Result<Value, RpcError> {
        self.selects.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Value::Array(Vec::new())))
    }

    async fn ping(&self) -> bool {
        self.reachable
    }
}

pub fn app(backend: Arc<ScriptedBackend>) -> Router {
    router(AppState::new(backend, Arc::new(Specification::standard())))
}

/// Send one request through the router and decode the JSON answer
pub async fn send(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<&str>,
) -> Result<(StatusCode, Value), Box<dyn std::error::Error>> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = builder.body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))?;

    let response = app.oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, value))
}

pub async fn post(
    backend: Arc<ScriptedBackend>,
    uri: &str,
    body: Value,
) -> Result<(StatusCode, Value), Box<dyn std::error::Error>> {
    send(app(backend), "POST", uri, Some(&body.to_string())).await
}
