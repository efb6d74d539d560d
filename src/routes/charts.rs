use super::page_count;
use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::scores::{update_scores_from_chart, ScoreReport};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

pub fn router() -> Router<AppState> {
    Router::new().route("/rym/scores", post(update_scores))
}

#[derive(Debug, Deserialize)]
struct ScoresQuery {
    pages: Option<u32>,
}

async fn update_scores(
    State(state): State<AppState>,
    query: Result<Query<ScoresQuery>, QueryRejection>,
) -> ApiResult<Json<ScoreReport>> {
    let Query(query) = query?;
    let pages = page_count(query.pages, "pages")?;
    let report = update_scores_from_chart(
        &state.catalog,
        state.chart.as_ref(),
        pages,
        state.chart_page_delay,
    )
    .await;
    if report.pages_failed == report.pages_requested {
        return Err(ApiError::upstream("chart pages could not be fetched"));
    }
    Ok(Json(report))
}
