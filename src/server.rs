//! Router assembly and the HTTP entry point

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{any, get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::functions::{
    authentication::login,
    media_upload::{upload_media, MAX_UPLOAD_BYTES},
    profile::profile,
    registration::register,
    transcription::storage_event,
};
use crate::genai::{gemini::GeminiClient, TranscriptionModel};
use crate::identity::{toolkit::IdentityToolkitClient, IdentityProvider};
use crate::storage::{s3::S3ObjectStore, ObjectStore};

/// Clients shared by every handler, built once per process
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub storage: Arc<dyn ObjectStore>,
    pub model: Arc<dyn TranscriptionModel>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("synapscribe/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        let identity = IdentityToolkitClient::new(http.clone(), &config.identity);
        let storage = S3ObjectStore::new(&config.storage).await;
        let model = GeminiClient::new(http, &config.genai);

        Ok(Self {
            identity: Arc::new(identity),
            storage: Arc::new(storage),
            model: Arc::new(model),
            config: Arc::new(config),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    // Over-limit bodies fail inside the multipart reader with a 413
    let upload = post(upload_media).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/profile", any(profile))
        .route("/upload", upload)
        .route("/events/storage", post(storage_event))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Bind and serve until the process is stopped
pub async fn serve(config: Config) -> anyhow::Result<()> {
    for key in config.validate() {
        tracing::warn!(setting = key, "Missing configuration, dependent handlers will fail");
    }

    let addr = config.listen_addr();
    let state = AppState::from_config(config).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(address = %addr, "SynapScribe functions listening");
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_support::server_with_storage;
    use crate::storage::MockObjectStore;

    #[tokio::test]
    async fn test_health() {
        let server = server_with_storage(MockObjectStore::new());
        let response = server.get("/health").await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let server = server_with_storage(MockObjectStore::new());
        server
            .get("/nope")
            .await
            .assert_status(axum::http::StatusCode::NOT_FOUND);
    }
}
