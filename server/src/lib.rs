use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use facsearch_core::persist::{load_context, load_records, save_index, IndexPaths, TermStore};
use facsearch_core::{build_index, EnglishNormalizer, Normalizer, RankedResult, SearchContext, TermIndexRecord, TfidfVectorizer};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub results: Vec<RankedResult>,
}

#[derive(Serialize)]
pub struct TermsResponse {
    pub term: String,
    pub records: Vec<TermIndexRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RebuildResponse {
    pub num_docs: usize,
    pub num_terms: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub index_dir: PathBuf,
    /// Record store re-read by `/index/rebuild`.
    pub records: Option<PathBuf>,
    pub admin_token: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub index_dir: PathBuf,
    pub records: Option<PathBuf>,
    pub admin_token: Option<String>,
    /// Queries take the read lock; a rebuild takes the write lock only to
    /// publish a fully fitted context.
    pub context: Arc<RwLock<SearchContext>>,
    pub terms: TermStore,
    rebuild_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: AppConfig, terms: TermStore) -> Result<Self> {
        let (context, meta) = load_context(&IndexPaths::new(&config.index_dir))?;
        tracing::info!(
            index = %config.index_dir.display(),
            num_docs = meta.num_docs,
            num_terms = meta.num_terms,
            lemmatizer = %meta.lemmatizer,
            "loaded index"
        );
        Ok(Self {
            index_dir: config.index_dir,
            records: config.records,
            admin_token: config.admin_token,
            context: Arc::new(RwLock::new(context)),
            terms,
            rebuild_lock: Arc::new(Mutex::new(())),
        })
    }
}

pub fn build_app(config: AppConfig) -> Result<Router> {
    let terms = TermStore::open(&IndexPaths::new(&config.index_dir))?;
    Ok(router(AppState::new(config, terms)?))
}

pub fn router(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/terms/:term", get(terms_handler))
        .route("/index/rebuild", post(rebuild_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let results = state.context.read().search(&params.q);
    let took_s = start.elapsed().as_secs_f64();
    tracing::debug!(query = %params.q, hits = results.len(), took_s, "search");
    Json(SearchResponse { query: params.q, took_s, results })
}

pub async fn terms_handler(
    State(state): State<AppState>,
    Path(term): Path<String>,
) -> Result<Json<TermsResponse>, (StatusCode, String)> {
    let key = state.context.read().normalizer.normalize(&term);
    let records = state.terms.lookup(&key).map_err(internal)?;
    Ok(Json(TermsResponse { term: key, records }))
}

async fn rebuild_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RebuildResponse>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let task_state = state.clone();
    let outcome = tokio::task::spawn_blocking(move || rebuild(&task_state)).await.map_err(internal)??;
    Ok(Json(outcome))
}

/// Re-read the record store, fit a new model and swap it in.
fn rebuild(state: &AppState) -> Result<RebuildResponse, (StatusCode, String)> {
    let Some(records_path) = state.records.as_ref() else {
        return Err((StatusCode::BAD_REQUEST, "no record store configured".into()));
    };
    let _guard = state.rebuild_lock.lock();

    let records = load_records(records_path).map_err(internal)?;
    let kind = state.context.read().normalizer.kind();
    let normalizer = EnglishNormalizer::new(kind);
    let build = build_index(&records, &normalizer, &TfidfVectorizer::default())
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    save_index(&IndexPaths::new(&state.index_dir), &build, kind, &state.terms).map_err(internal)?;

    let response = RebuildResponse {
        num_docs: build.documents.len(),
        num_terms: build.model.vocabulary.len(),
        skipped: build.skipped,
    };
    *state.context.write() = SearchContext::from_build(normalizer, build);
    tracing::info!(num_docs = response.num_docs, num_terms = response.num_terms, "index rebuilt");
    Ok(response)
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    tracing::error!(error = %e, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
