use crate::app::AppState;
use crate::error::ApiResult;
use crate::models::Genre;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/genres", get(list_genres).post(create_genre))
        .route("/genres/:id", get(get_genre))
}

#[derive(Debug, Deserialize)]
struct GenreInput {
    name: String,
}

async fn list_genres(State(state): State<AppState>) -> ApiResult<Json<Vec<Genre>>> {
    Ok(Json(state.catalog.list_genres()?))
}

async fn get_genre(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Genre>> {
    let Path(id) = path?;
    Ok(Json(state.catalog.get_genre(id)?))
}

/// 201 when the genre is new, 200 when it already existed.
async fn create_genre(
    State(state): State<AppState>,
    body: Result<Json<GenreInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Genre>)> {
    let Json(input) = body?;
    let existed = state.catalog.get_genre_by_name(&input.name)?.is_some();
    let genre = state.catalog.create_genre(&input.name)?;
    let status = if existed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(genre)))
}
