use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequest, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    error::ServiceError,
    extract::ArticleExtractor,
    model::{
        AnalyzeRequest, AnalyzeResponse, ModelRegistry, SimplifyRequest, SimplifyResponse,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
    pub extractor: Arc<ArticleExtractor>,
}

/// JSON body extractor whose rejections use the service's error format.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ServiceError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub extracted_text: String,
    pub title: Option<String>,
    pub authors: Vec<String>,
}

pub fn build_router(registry: Arc<ModelRegistry>, extractor: Arc<ArticleExtractor>) -> Router {
    let state = AppState {
        registry,
        extractor,
    };

    Router::new()
        .route("/health", get(health))
        .route("/extract", post(extract))
        .route("/simplify", post(simplify))
        .route("/analyze", post(analyze))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

fn required(value: Option<String>, message: &str) -> Result<String, ServiceError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ServiceError::BadRequest(message.to_string()))
}

async fn extract(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ExtractRequest>,
) -> Result<Json<ExtractResponse>, ServiceError> {
    let url = required(request.url, "URL is required.")?;
    let article = state.extractor.extract(&url).await?;

    Ok(Json(ExtractResponse {
        extracted_text: article.text,
        title: article.title,
        authors: article.authors,
    }))
}

async fn simplify(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SimplifyRequest>,
) -> Result<Json<SimplifyResponse>, ServiceError> {
    let mode = request.mode();
    let text = required(request.text, "Text is required.")?;

    info!(%mode, chars = text.len(), "simplifying text");
    let simplified_text = state.registry.simplify(text, mode).await?;

    Ok(Json(SimplifyResponse {
        simplified_text,
        mode,
    }))
}

async fn analyze(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ServiceError> {
    let text = required(request.text, "Text is required.")?;
    if request.labels.as_ref().is_some_and(|labels| labels.is_empty()) {
        return Err(ServiceError::BadRequest(
            "labels must not be empty".to_string(),
        ));
    }

    info!(chars = text.len(), multi_label = request.multi_label, "analyzing emotion");
    let result = state
        .registry
        .analyze(text, request.labels, request.multi_label)
        .await?;

    AnalyzeResponse::from_result(result)
        .map(Json)
        .ok_or_else(|| ServiceError::Inference("classifier returned no labels".into()))
}
