//! Route handlers for the HTTP API.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::metrics::gather_metrics;
use crate::server::AppState;
use crate::Error;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

/// GET / — service identification for humans and probes.
pub async fn service_info(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "name": "kube-sleuth",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.model,
        "pattern": "react",
        "tools": state.tools,
    }))
}

/// GET /health — liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "agent_ready": true,
    }))
}

/// POST /ask — run one diagnostic question through the agent.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> Response {
    info!("Received question: {}", request.question);

    match state
        .service
        .ask(&request.question, request.namespace.as_deref())
        .await
    {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /metrics — Prometheus text exposition.
pub async fn metrics() -> String {
    gather_metrics()
}

fn error_response(error: Error) -> Response {
    let status = match &error {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::ModelCommunication(_) => StatusCode::BAD_GATEWAY,
        Error::RequestTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("Question failed: {}", error);
    }
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}
