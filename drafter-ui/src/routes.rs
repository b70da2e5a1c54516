//! HTTP route handlers for the drafting API.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{error, warn};

use drafter::agent::AgentResult;
use drafter::core::citations::Citation;
use drafter::core::profile::{ConstraintProfile, preset_summaries};
use drafter::io::document_store::Corpus;
use drafter::io::profiles::resolve_profile;

use crate::sse;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

const MIN_PROMPT_CHARS: usize = 10;

/// Full application: the API nested under `/api`, with state attached.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_router(state.clone()))
        .with_state(state)
}

/// Build the API router. Everything but `/health` sits behind the API key check.
pub fn api_router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/citations", get(list_citations))
        .route("/citations/{source_id}", get(get_citation))
        .route("/documents", get(list_documents))
        .route("/constraints/presets", get(list_presets))
        .route("/generate", post(generate))
        .route("/generate/stream", post(sse::generate_stream))
        .route_layer(middleware::from_fn_with_state(state, require_api_key));

    Router::new().route("/health", get(health)).merge(protected)
}

/// Error response with a client-safe `detail` message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    fn internal(detail: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

/// Body of `POST /generate` and `POST /generate/stream`.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub contract_type: Option<String>,
    pub jurisdiction: Option<String>,
    pub preset: Option<String>,
}

impl GenerateRequest {
    /// Check the prompt and resolve the constraint profile.
    pub fn into_job(self) -> Result<(String, ConstraintProfile), ApiError> {
        if self.prompt.trim().chars().count() < MIN_PROMPT_CHARS {
            return Err(ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("prompt must be at least {MIN_PROMPT_CHARS} characters"),
            ));
        }
        let profile = resolve_profile(
            self.preset.as_deref(),
            self.contract_type.as_deref(),
            self.jurisdiction.as_deref(),
        )
        .map_err(|err| ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, format!("{err:#}")))?;
        Ok((self.prompt, profile))
    }
}

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(expected) = state.api_key.as_deref() {
        let provided = request
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());
        if provided != Some(expected) {
            warn!(path = %request.uri().path(), "rejected request with missing or invalid API key");
            return ApiError::new(StatusCode::FORBIDDEN, "Invalid or missing API key")
                .into_response();
        }
    }
    next.run(request).await
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "version": env!("CARGO_PKG_VERSION") }))
}

fn corpus<'a>(state: &'a AppState, failure: &str) -> Result<&'a Corpus, ApiError> {
    state.store.corpus().map_err(|err| {
        error!(err = %err, "document store unavailable");
        ApiError::internal(failure)
    })
}

/// GET /api/citations - every citation keyed by source id.
async fn list_citations(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let corpus = corpus(&state, "Failed to retrieve citations")?;
    let index = corpus.citation_index();
    Ok(Json(json!({ "citations": index, "total": index.len() })))
}

/// GET /api/citations/{source_id} - one citation, 404 when unknown.
async fn get_citation(
    State(state): State<AppState>,
    Path(source_id): Path<String>,
) -> Result<Json<Citation>, ApiError> {
    let corpus = corpus(&state, "Failed to retrieve citation")?;
    corpus
        .citation(&source_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Citation not found"))
}

/// GET /api/documents - metadata of every ingested document.
async fn list_documents(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let corpus = corpus(&state, "Failed to retrieve documents")?;
    let documents = corpus.documents();
    Ok(Json(json!({ "documents": documents, "total": documents.len() })))
}

/// GET /api/constraints/presets - preset catalogue keyed by name.
async fn list_presets() -> Result<Json<Value>, ApiError> {
    let summaries = preset_summaries().map_err(|err| {
        error!(err = %err, "failed to build presets");
        ApiError::internal("Failed to load constraint presets")
    })?;
    let mut presets = Map::new();
    for summary in summaries {
        presets.insert(
            summary.name.to_string(),
            json!({
                "contract_type": summary.contract_type,
                "jurisdiction": summary.jurisdiction,
                "forbidden_clauses_count": summary.forbidden_patterns,
                "required_citations_count": summary.required_citations,
            }),
        );
    }
    Ok(Json(json!({ "presets": presets })))
}

/// POST /api/generate - run the agent to completion.
async fn generate(
    State(state): State<AppState>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<AgentResult>, ApiError> {
    let (prompt, profile) = body.into_job()?;
    let agent = Arc::clone(&state.agent);
    let run = tokio::task::spawn_blocking(move || agent.run_sync(&prompt, &profile))
        .await
        .map_err(|err| {
            error!(err = %err, "agent run aborted");
            ApiError::internal("Generation failed. Please try again.")
        })?;
    Ok(Json(run.result))
}
