//! HTTP Server
//!
//! Exposes the agent over four routes: service info, health, the ask
//! endpoint, and Prometheus metrics. Handlers stay thin; everything
//! interesting happens in the agent service.

mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::agent::service::AgentService;
use crate::config::Config;
use crate::ToolRegistry;

/// Shared, read-only request state.
pub struct AppState {
    pub service: Arc<AgentService>,
    pub model: String,
    pub tools: Vec<String>,
}

pub struct Server {
    state: Arc<AppState>,
    addr: String,
}

impl Server {
    pub fn new(config: &Config, service: Arc<AgentService>, registry: Arc<ToolRegistry>) -> Self {
        let state = Arc::new(AppState {
            service,
            model: config.llm.model.clone(),
            tools: registry.specs().iter().map(|t| t.name.clone()).collect(),
        });
        Self {
            state,
            addr: config.server.addr.clone(),
        }
    }

    pub fn build_router(&self) -> Router {
        Router::new()
            .route("/", get(routes::service_info))
            .route("/health", get(routes::health))
            .route("/ask", post(routes::ask))
            .route("/metrics", get(routes::metrics))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    pub async fn run(self) -> crate::Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.build_router()).await?;
        Ok(())
    }
}
