//! HTTP route handlers
//!
//! JSON endpoints over the loaded snapshot, plus the admin-gated crawl
//! trigger. Every data endpoint answers 503 until a dataset has been
//! loaded; partial crawl failures are never visible here, only in logs.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::api::ml::{self, PredictionRequestItem, PredictionResponseItem};
use crate::api::state::ApiState;
use crate::config::Settings;
use crate::crawler;
use crate::dataset::{BookRecord, Snapshot};

/// Request-level errors, mapped onto HTTP statuses
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Dataset not loaded")]
    DatasetUnavailable,

    #[error("Book {0} not found")]
    BookNotFound(u32),

    #[error("Missing or invalid bearer token")]
    Unauthorized,

    #[error("No admin token configured; trigger disabled")]
    TriggerDisabled,

    #[error("A crawl is already running")]
    CrawlInProgress,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::DatasetUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::BookNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::TriggerDisabled => StatusCode::FORBIDDEN,
            ApiError::CrawlInProgress => StatusCode::CONFLICT,
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Builds the API router
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/books", get(list_books))
        .route("/api/v1/books/search", get(search_books))
        .route("/api/v1/books/top-rated", get(top_rated))
        .route("/api/v1/books/:id", get(get_book))
        .route("/api/v1/categories", get(list_categories))
        .route("/api/v1/stats/overview", get(stats_overview))
        .route("/api/v1/ml/features", get(ml_features))
        .route("/api/v1/ml/training-data", get(ml_training_data))
        .route("/api/v1/ml/predictions", post(ml_predictions))
        .route("/api/v1/scraping/trigger", post(trigger_scrape))
        .with_state(state)
}

fn snapshot(state: &ApiState) -> Result<std::sync::Arc<Snapshot>, ApiError> {
    state.snapshot().ok_or(ApiError::DatasetUnavailable)
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    items: usize,
}

async fn health(State(state): State<ApiState>) -> Result<Json<Health>, ApiError> {
    let snapshot = snapshot(&state)?;
    Ok(Json(Health {
        status: "ok",
        items: snapshot.len(),
    }))
}

fn default_limit() -> usize {
    100
}

#[derive(Debug, Deserialize)]
struct Pagination {
    #[serde(default)]
    skip: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

async fn list_books(
    State(state): State<ApiState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<BookRecord>>, ApiError> {
    let snapshot = snapshot(&state)?;
    let books = snapshot
        .books
        .iter()
        .skip(page.skip)
        .take(page.limit)
        .cloned()
        .collect();
    Ok(Json(books))
}

async fn get_book(
    State(state): State<ApiState>,
    Path(id): Path<u32>,
) -> Result<Json<BookRecord>, ApiError> {
    let snapshot = snapshot(&state)?;
    snapshot
        .get(id)
        .cloned()
        .map(Json)
        .ok_or(ApiError::BookNotFound(id))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    title: Option<String>,
    category: Option<String>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    #[serde(default = "default_limit")]
    limit: usize,
}

async fn search_books(
    State(state): State<ApiState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<BookRecord>>, ApiError> {
    let snapshot = snapshot(&state)?;
    let title = params.title.as_deref().map(str::to_lowercase);
    let category = params.category.as_deref().map(str::to_lowercase);

    let books = snapshot
        .books
        .iter()
        .filter(|book| match &title {
            Some(needle) => book.title.to_lowercase().contains(needle),
            None => true,
        })
        .filter(|book| match &category {
            Some(needle) => book
                .category
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(needle)),
            None => true,
        })
        .filter(|book| match params.min_price {
            Some(min) => book.price_num().is_some_and(|p| p >= min),
            None => true,
        })
        .filter(|book| match params.max_price {
            Some(max) => book.price_num().is_some_and(|p| p <= max),
            None => true,
        })
        .take(params.limit)
        .cloned()
        .collect();
    Ok(Json(books))
}

fn default_top_limit() -> usize {
    10
}

#[derive(Debug, Deserialize)]
struct TopRatedParams {
    #[serde(default = "default_top_limit")]
    limit: usize,
}

async fn top_rated(
    State(state): State<ApiState>,
    Query(params): Query<TopRatedParams>,
) -> Result<Json<Vec<BookRecord>>, ApiError> {
    let snapshot = snapshot(&state)?;
    let mut books: Vec<BookRecord> = snapshot.books.clone();
    books.sort_by_key(|b| std::cmp::Reverse(b.rating.unwrap_or(0)));
    books.truncate(params.limit);
    Ok(Json(books))
}

#[derive(Debug, Serialize)]
struct Categories {
    categories: Vec<String>,
}

async fn list_categories(State(state): State<ApiState>) -> Result<Json<Categories>, ApiError> {
    let snapshot = snapshot(&state)?;
    Ok(Json(Categories {
        categories: snapshot.categories(),
    }))
}

#[derive(Debug, Serialize)]
struct StatsOverview {
    total_books: usize,
    avg_price: Option<f64>,
    rating_distribution: BTreeMap<u8, usize>,
}

async fn stats_overview(State(state): State<ApiState>) -> Result<Json<StatsOverview>, ApiError> {
    let snapshot = snapshot(&state)?;

    let prices: Vec<f64> = snapshot.books.iter().filter_map(|b| b.price_num()).collect();
    let avg_price = if prices.is_empty() {
        None
    } else {
        Some(prices.iter().sum::<f64>() / prices.len() as f64)
    };

    let mut rating_distribution = BTreeMap::new();
    for rating in snapshot.books.iter().filter_map(|b| b.rating) {
        *rating_distribution.entry(rating).or_insert(0) += 1;
    }

    Ok(Json(StatsOverview {
        total_books: snapshot.len(),
        avg_price,
        rating_distribution,
    }))
}

async fn ml_features(
    State(state): State<ApiState>,
) -> Result<Json<Vec<ml::FeatureRow>>, ApiError> {
    let snapshot = snapshot(&state)?;
    Ok(Json(ml::feature_rows(&snapshot)))
}

async fn ml_training_data(
    State(state): State<ApiState>,
) -> Result<Json<ml::TrainingData>, ApiError> {
    let snapshot = snapshot(&state)?;
    Ok(Json(ml::training_data(&snapshot)))
}

async fn ml_predictions(
    State(state): State<ApiState>,
    Json(items): Json<Vec<PredictionRequestItem>>,
) -> Result<Json<Vec<PredictionResponseItem>>, ApiError> {
    let snapshot = snapshot(&state)?;
    Ok(Json(ml::predict_prices(&snapshot, &items)))
}

/// Checks the `Authorization: Bearer <token>` header against the
/// configured admin token
fn authorize_admin(headers: &HeaderMap, settings: &Settings) -> Result<(), ApiError> {
    let expected = settings
        .admin_token
        .as_deref()
        .ok_or(ApiError::TriggerDisabled)?;
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;
    let (scheme, token) = value.split_once(' ').ok_or(ApiError::Unauthorized)?;
    if scheme.eq_ignore_ascii_case("bearer") && token.trim() == expected {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// Accepts a crawl request and runs it in the background
///
/// The caller gets a 202 immediately; the crawl's outcome is visible
/// through logs and, on success, a swapped-in snapshot. There is no
/// cancellation once a crawl has started.
async fn trigger_scrape(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    authorize_admin(&headers, state.settings())?;

    let guard = state.try_begin_crawl().ok_or(ApiError::CrawlInProgress)?;
    let settings = state.settings().clone();
    let state = state.clone();

    tokio::spawn(async move {
        let _guard = guard;
        match crawler::scrape(settings.clone()).await {
            Ok(count) => {
                tracing::info!("Triggered crawl finished with {} records", count);
                match Snapshot::load(&settings.data_path) {
                    Ok(snapshot) => state.install_snapshot(snapshot),
                    Err(e) => tracing::error!("Failed to reload dataset after crawl: {}", e),
                }
            }
            Err(e) => tracing::error!("Triggered crawl failed: {}", e),
        }
    });

    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "accepted" }))))
}
