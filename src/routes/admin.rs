use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::models::CatalogStats;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(stats))
        .route("/admin/clear", post(clear))
}

#[derive(Debug, Deserialize)]
struct ClearQuery {
    #[serde(default)]
    confirm: bool,
}

async fn stats(State(state): State<AppState>) -> ApiResult<Json<CatalogStats>> {
    Ok(Json(state.catalog.counts()?))
}

async fn clear(
    State(state): State<AppState>,
    query: Result<Query<ClearQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    if !query.confirm {
        return Err(ApiError::bad_request("pass confirm=true to clear the catalog"));
    }
    let removed = state.catalog.clear()?;
    Ok(Json(json!({ "removed": removed })))
}
