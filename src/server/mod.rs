//! HTTP surface.
//!
//! ```text
//! POST   /api/upload              multipart `file`
//! DELETE /api/delete?filename=
//! GET    /api/files
//! POST   /api/generate-sow        {contractType, selectedDocuments}
//! POST   /api/convert-to-pdf      {filePath}
//! GET    /api/pdf?file=
//! GET    /api/download-docx?file=
//! POST   /api/process-docx        {filePath}
//! GET    /api/libreoffice-status
//! GET    /api/contract-types
//! GET    /healthz
//! ```
//!
//! Every handler is a thin adapter over [`crate::documents`] and
//! [`crate::convert`]; errors are rendered by the `IntoResponse` impl in
//! `response.rs`.

pub mod handlers;
mod request_log;
mod response;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::AppConfig;
use crate::convert::Converters;
use crate::documents::DocumentStore;
use crate::error::SowError;
use crate::pipeline::sow_api::SowApiClient;

/// Headroom above the upload limit for multipart framing and JSON bodies.
const BODY_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<DocumentStore>,
    pub converters: Arc<Converters>,
    /// `None` when no SOW API endpoint is configured.
    pub api: Option<Arc<SowApiClient>>,
    request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, SowError> {
        let store = DocumentStore::new(&config)?;
        let converters = Converters::from_config(&config);
        let api = config
            .sow_api_endpoint
            .as_ref()
            .map(|endpoint| {
                SowApiClient::new(
                    endpoint.clone(),
                    config.sow_api_key.clone(),
                    config.api_timeout(),
                )
            })
            .transpose()?
            .map(Arc::new);

        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(store),
            converters: Arc::new(converters),
            api,
            request_id_seed: Arc::new(AtomicU64::new(1)),
        })
    }

    fn next_request_id(&self) -> String {
        let id = self.request_id_seed.fetch_add(1, Ordering::Relaxed);
        format!("req-{id:016x}")
    }

    fn max_body_bytes(&self) -> usize {
        usize::try_from(self.config.max_upload_bytes())
            .unwrap_or(usize::MAX)
            .saturating_add(BODY_OVERHEAD_BYTES)
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/api/upload", post(handlers::upload))
        .route("/api/delete", delete(handlers::delete_file))
        .route("/api/files", get(handlers::list_files))
        .route("/api/generate-sow", post(handlers::generate_sow))
        .route("/api/convert-to-pdf", post(handlers::convert_to_pdf))
        .route("/api/pdf", get(handlers::serve_pdf))
        .route("/api/download-docx", get(handlers::download_docx))
        .route("/api/process-docx", post(handlers::process_docx))
        .route("/api/libreoffice-status", get(handlers::libreoffice_status))
        .route("/api/contract-types", get(handlers::contract_types))
        .layer(from_fn_with_state(state.clone(), request_log::request_span))
        .layer(DefaultBodyLimit::max(state.max_body_bytes()))
        .with_state(state)
}

/// Bind `config.bind_addr` and serve until Ctrl-C.
pub async fn serve(config: AppConfig) -> Result<(), SowError> {
    let addr = config.bind_addr;
    let state = AppState::new(config)?;
    state.store.ensure_directories().await?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| SowError::io(format!("Failed to bind {addr}"), e))?;
    serve_on(listener, state).await
}

/// Serve on an already-bound listener until Ctrl-C.
pub async fn serve_on(listener: TcpListener, state: AppState) -> Result<(), SowError> {
    let local = listener
        .local_addr()
        .map_err(|e| SowError::io("Failed to read listener address", e))?;
    info!("sow-wizard listening on {local}");
    info!("Documents root: {}", state.store.paths().base.display());
    if state.api.is_none() {
        info!("No SOW API endpoint configured; /api/generate-sow will answer 500");
    }

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| SowError::io("Server error", e))?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received, draining connections");
    }
}
