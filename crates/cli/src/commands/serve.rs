//! Serve command handler.
//!
//! Exposes the query pipeline over HTTP:
//! - `GET /health`
//! - `POST /api/query` with `{"query": "...", "top_k": 5}`
//! - `GET /api/stats`

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use clap::Args;
use nss_core::{config::AppConfig, AppError, AppResult};
use nss_rag::{AnswerResult, CorpusStats, QueryPipeline};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Largest `top_k` a single request may ask for.
const MAX_TOP_K: usize = 50;

/// Serve the query API over HTTP
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to bind (default from config: 0.0.0.0)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (default from config: 8000)
    #[arg(long)]
    pub port: Option<u16>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing serve command");

        let host = self.host.as_deref().unwrap_or(&config.server.host);
        let port = self.port.unwrap_or(config.server.port);
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid address {}:{}: {}", host, port, e)))?;

        let pipeline = Arc::new(QueryPipeline::from_config(config).await?);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::Config(format!("Failed to bind {}: {}", addr, e)))?;

        tracing::info!("Serving NSS query API on http://{}", addr);

        axum::serve(listener, router(pipeline))
            .await
            .map_err(|e| AppError::Other(format!("Server error: {}", e)))
    }
}

/// Build the HTTP router around a shared pipeline.
pub fn router(pipeline: Arc<QueryPipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/query", post(query))
        .route("/api/stats", get(stats))
        .with_state(pipeline)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,

    #[serde(default)]
    top_k: Option<usize>,
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn query(
    State(pipeline): State<Arc<QueryPipeline>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<AnswerResult>, ApiError> {
    let result = match request.top_k {
        Some(0) => {
            return Err(AppError::InvalidQuery("top_k must be at least 1".to_string()).into())
        }
        Some(top_k) => {
            pipeline
                .answer_with_top_k(&request.query, top_k.min(MAX_TOP_K))
                .await?
        }
        None => pipeline.answer(&request.query).await?,
    };
    Ok(Json(result))
}

async fn stats(State(pipeline): State<Arc<QueryPipeline>>) -> Result<Json<CorpusStats>, ApiError> {
    Ok(Json(pipeline.stats().await?))
}

/// Maps pipeline errors onto HTTP responses.
struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            AppError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            AppError::Llm(_) | AppError::Embedding(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(kind = self.0.kind(), "Request failed: {}", self.0);
        }

        let body = Json(json!({
            "error": {
                "type": self.0.kind(),
                "message": self.0.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
