//! HTTP handlers under `/api`.

mod admin;
mod charts;
mod genres;
mod movies;
mod tmdb;

use crate::app::AppState;
use crate::error::ApiError;
use axum::Router;

/// Upper bound on pages per import or chart request.
pub const MAX_PAGE_COUNT: u32 = 5;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(movies::router())
        .merge(genres::router())
        .merge(tmdb::router())
        .merge(charts::router())
        .merge(admin::router())
}

/// Split a comma-separated query value, dropping blank entries.
pub(crate) fn comma_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

pub(crate) fn page_count(value: Option<u32>, name: &str) -> Result<u32, ApiError> {
    let count = value.unwrap_or(1);
    if !(1..=MAX_PAGE_COUNT).contains(&count) {
        return Err(ApiError::bad_request(format!(
            "{name} must be between 1 and {MAX_PAGE_COUNT}"
        )));
    }
    Ok(count)
}
