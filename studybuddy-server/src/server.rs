use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use studybuddy_rag::{
    EmbeddingProvider, GeminiEmbeddingProvider, IngestOutcome, ResilientEmbedder, SearchResult,
    StoreStats,
};
use studybuddy_tutor::{GeminiTextModel, ModelGenerator, ResilientGenerator};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::{
    config::ServerConfig,
    error::ApiError,
    persistence::{JsonlMirror, Mirror},
    service::{
        ChatRequest, ChatResult, DocumentSummary, QuizRequest, QuizResult, SearchRequest,
        StudyService,
    },
};

// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<StudyService>,
}

impl AppState {
    pub fn new(service: StudyService) -> Self {
        Self { service: Arc::new(service) }
    }
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    let upload_limit = state.service.max_upload_bytes().saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(health))
        .route(
            "/api/documents",
            post(upload_document).get(list_documents).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/documents/{id}", get(get_document).delete(delete_document))
        .route("/api/search", post(search))
        .route("/api/chat", post(chat))
        .route("/api/quiz", post(quiz))
        .route("/api/stats", get(stats))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Wire the service from configuration: Gemini backends when a key is set,
/// offline fallbacks otherwise.
pub async fn build_service(config: &ServerConfig) -> anyhow::Result<StudyService> {
    let rag_config = config.rag_config().context("invalid retrieval settings")?;

    let mut embedder = ResilientEmbedder::new(rag_config.dimensions, rag_config.model_timeout);
    let mut generator = ResilientGenerator::new(rag_config.model_timeout);
    match config.api_key() {
        Some(key) => {
            let gemini_embedder = GeminiEmbeddingProvider::new(key)
                .context("failed to create Gemini embedding client")?
                .with_model(&config.embedding_model)
                .with_dimensions(rag_config.dimensions);
            embedder = embedder.with_primary(Arc::new(gemini_embedder));

            let model = GeminiTextModel::new(key)
                .context("failed to create Gemini generation client")?
                .with_model(&config.generation_model);
            generator = generator.with_primary(Arc::new(ModelGenerator::new(Arc::new(model))));
            info!(
                embedding_model = %config.embedding_model,
                generation_model = %config.generation_model,
                "using Gemini models"
            );
        }
        None => info!("no API key configured, using offline embedder and tutor"),
    }

    let mirror = match &config.data_dir {
        Some(dir) => {
            let jsonl = JsonlMirror::open(dir)
                .await
                .with_context(|| format!("failed to open data dir {}", dir.display()))?;
            info!(path = %jsonl.path().display(), "mirroring to JSON lines");
            Mirror::new(Arc::new(jsonl))
        }
        None => Mirror::noop(),
    };

    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(embedder);
    let service = StudyService::builder()
        .rag_config(rag_config)
        .embedder(embedder)
        .generator(Arc::new(generator))
        .mirror(mirror)
        .upload_dir(&config.upload_dir)
        .max_upload_bytes(config.max_upload_bytes)
        .build()
        .context("failed to build study service")?;
    Ok(service)
}

pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let state = AppState::new(build_service(&config).await?);
    let app = app_router(state.clone());
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for studybuddy server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("studybuddy listening on http://{}", addr);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    state.service.flush_mirror().await;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({"status":"ok","service":"studybuddy"}))
}

async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<IngestOutcome>), ApiError> {
    while let Some(field) = multipart.next_field().await? {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;

        let outcome = state
            .service
            .ingest_upload(&filename, content_type.as_deref(), bytes.to_vec())
            .await?;
        return Ok((StatusCode::CREATED, Json(outcome)));
    }
    Err(ApiError::BadRequest("multipart body has no file field".into()))
}

async fn list_documents(
    State(state): State<AppState>,
) -> Result<Json<Vec<DocumentSummary>>, ApiError> {
    Ok(Json(state.service.list_documents().await?))
}

async fn get_document(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DocumentSummary>, ApiError> {
    Ok(Json(state.service.get_document(&id).await?))
}

#[derive(Serialize)]
struct DeleteResponse {
    deleted: DocumentSummary,
}

async fn delete_document(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = state.service.delete_document(&id).await?;
    Ok(Json(DeleteResponse { deleted }))
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

async fn search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(request) = payload?;
    let results = state.service.search(request).await?;
    Ok(Json(SearchResponse { results }))
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResult>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(state.service.chat(request).await?))
}

async fn quiz(
    State(state): State<AppState>,
    payload: Result<Json<QuizRequest>, JsonRejection>,
) -> Result<Json<QuizResult>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(state.service.quiz(request).await?))
}

async fn stats(State(state): State<AppState>) -> Result<Json<StoreStats>, ApiError> {
    Ok(Json(state.service.stats().await?))
}
