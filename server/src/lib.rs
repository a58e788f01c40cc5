use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use invidx_core::{BatchId, BatchStore, BooleanQuery, Evaluator, MetaFile, Normalizer, Operator, ScanMode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default)]
    pub first_match: bool,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub operator: Operator,
    pub took_s: f64,
    pub total_hits: usize,
    pub doc_ids: Vec<String>,
}

#[derive(Serialize)]
pub struct BatchesResponse {
    pub batches: Vec<BatchId>,
    pub meta: Option<MetaFile>,
}

#[derive(Clone)]
pub struct AppState {
    pub store: BatchStore,
    pub normalizer: Arc<Normalizer>,
}

type ApiError = (StatusCode, String);

pub fn build_app(index_dir: PathBuf, normalizer: Normalizer) -> Result<Router> {
    let store = BatchStore::new(&index_dir);
    let batches = store.list_batches()?;
    match store.load_meta() {
        Ok(meta) => tracing::info!(
            batches = batches.len(),
            policy = %meta.policy,
            num_docs = meta.num_docs,
            "opened batch store"
        ),
        Err(_) => tracing::info!(batches = batches.len(), "opened batch store without build metadata"),
    }
    let app_state = AppState { store, normalizer: Arc::new(normalizer) };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/batches", get(batches_handler))
        .with_state(app_state)
        .layer(cors);
    Ok(app)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let query = BooleanQuery::parse(&params.q).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let mode = if params.first_match { ScanMode::FirstMatch } else { ScanMode::AllBatches };

    // Batch files are read from disk; keep that off the async workers.
    let operator = query.operator;
    let doc_ids = tokio::task::spawn_blocking(move || -> invidx_core::Result<Vec<String>> {
        let batch_ids = state.store.list_batches()?;
        let hits = Evaluator::new(&state.store, &state.normalizer)
            .with_mode(mode)
            .evaluate(&query, &batch_ids);
        let mut ids: Vec<String> = hits.into_iter().collect();
        ids.sort();
        Ok(ids)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let elapsed = start.elapsed();
    tracing::debug!(q = %params.q, hits = doc_ids.len(), "search");
    Ok(Json(SearchResponse {
        query: params.q,
        operator,
        took_s: elapsed.as_secs_f64(),
        total_hits: doc_ids.len(),
        doc_ids,
    }))
}

pub async fn batches_handler(State(state): State<AppState>) -> Result<Json<BatchesResponse>, ApiError> {
    let batches = state
        .store
        .list_batches()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let meta = state.store.load_meta().ok();
    Ok(Json(BatchesResponse { batches, meta }))
}
