use super::page_count;
use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::importer::{ImageReport, ImportOutcome, ImportReport, RatingOverride};
use crate::tmdb::{MoviePage, TmdbGenre};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

const MAX_SEARCH_PAGE: u32 = 500;
const MAX_TOP_VOTED: usize = 1000;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tmdb/search", get(search))
        .route("/tmdb/genres", get(genres))
        .route("/tmdb/genres/sync", post(sync_genres))
        .route("/tmdb/import", post(import_one))
        .route("/tmdb/import/search", post(import_search))
        .route("/tmdb/import/popular", post(import_popular))
        .route("/tmdb/import/top_rated", post(import_top_rated))
        .route("/tmdb/import/top_voted", post(import_top_voted))
        .route("/tmdb/refresh_images", post(refresh_images))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    query: String,
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ImportOneQuery {
    tmdb_id: i64,
    rating: Option<f64>,
    votes: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ImportSearchQuery {
    query: String,
    page_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PagesQuery {
    page_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TopVotedQuery {
    count: Option<usize>,
    min_votes: Option<u32>,
}

fn non_blank(query: &str) -> ApiResult<&str> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("query must not be empty"));
    }
    Ok(query)
}

// A batch where no page could be fetched is reported as an upstream failure.
fn batch_result(report: ImportReport) -> ApiResult<Json<ImportReport>> {
    if report.pages_requested > 0 && report.pages_failed == report.pages_requested {
        return Err(ApiError::upstream("TMDb pages could not be fetched"));
    }
    Ok(Json(report))
}

async fn search(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Json<MoviePage>> {
    let Query(query) = query?;
    let text = non_blank(&query.query)?;
    let page = query.page.unwrap_or(1);
    if !(1..=MAX_SEARCH_PAGE).contains(&page) {
        return Err(ApiError::bad_request(format!(
            "page must be between 1 and {MAX_SEARCH_PAGE}"
        )));
    }
    Ok(Json(state.tmdb.search_movies(text, page).await?))
}

async fn genres(State(state): State<AppState>) -> ApiResult<Json<Vec<TmdbGenre>>> {
    Ok(Json(state.tmdb.movie_genres().await?))
}

async fn sync_genres(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let added = state.importer.seed_genres().await?;
    let total = state.catalog.list_genres()?.len();
    Ok(Json(json!({ "added": added, "total": total })))
}

async fn import_one(
    State(state): State<AppState>,
    query: Result<Query<ImportOneQuery>, QueryRejection>,
) -> ApiResult<(StatusCode, Json<ImportOutcome>)> {
    let Query(query) = query?;
    if query.rating.is_some_and(|r| !(0.0..=10.0).contains(&r)) {
        return Err(ApiError::bad_request("rating must be between 0 and 10"));
    }
    if query.votes.is_some_and(|v| v < 0) {
        return Err(ApiError::bad_request("votes must not be negative"));
    }
    let overrides = RatingOverride {
        rating: query.rating,
        votes: query.votes,
    };
    let outcome = state
        .importer
        .import_by_id_with(query.tmdb_id, overrides)
        .await?;
    let status = match outcome {
        ImportOutcome::Imported { .. } => StatusCode::CREATED,
        _ => StatusCode::OK,
    };
    Ok((status, Json(outcome)))
}

async fn import_search(
    State(state): State<AppState>,
    query: Result<Query<ImportSearchQuery>, QueryRejection>,
) -> ApiResult<Json<ImportReport>> {
    let Query(query) = query?;
    let text = non_blank(&query.query)?;
    let pages = page_count(query.page_count, "page_count")?;
    batch_result(state.importer.import_search(text, pages).await)
}

async fn import_popular(
    State(state): State<AppState>,
    query: Result<Query<PagesQuery>, QueryRejection>,
) -> ApiResult<Json<ImportReport>> {
    let Query(query) = query?;
    let pages = page_count(query.page_count, "page_count")?;
    batch_result(state.importer.import_popular(pages).await)
}

async fn import_top_rated(
    State(state): State<AppState>,
    query: Result<Query<PagesQuery>, QueryRejection>,
) -> ApiResult<Json<ImportReport>> {
    let Query(query) = query?;
    let pages = page_count(query.page_count, "page_count")?;
    batch_result(state.importer.import_top_rated(pages).await)
}

async fn import_top_voted(
    State(state): State<AppState>,
    query: Result<Query<TopVotedQuery>, QueryRejection>,
) -> ApiResult<Json<ImportReport>> {
    let Query(query) = query?;
    let count = query.count.unwrap_or(100);
    if !(1..=MAX_TOP_VOTED).contains(&count) {
        return Err(ApiError::bad_request(format!(
            "count must be between 1 and {MAX_TOP_VOTED}"
        )));
    }
    let min_votes = query.min_votes.unwrap_or(1000);
    batch_result(state.importer.import_top_voted(count, min_votes).await)
}

async fn refresh_images(State(state): State<AppState>) -> ApiResult<Json<ImageReport>> {
    Ok(Json(state.importer.refresh_images().await?))
}
