use super::comma_list;
use crate::app::AppState;
use crate::catalog::MovieFilter;
use crate::error::{ApiError, ApiResult};
use crate::models::{MovieDetail, MoviePatch, NewMovie, PersonInput, PersonRole};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/movies", get(list_movies).post(create_movie))
        .route(
            "/movies/:identifier",
            get(get_movie).put(update_movie).delete(delete_movie),
        )
        .route(
            "/movies/:identifier/genres/:genre_id",
            post(attach_genre).delete(detach_genre),
        )
        .route("/movies/:identifier/actors", post(attach_actor))
        .route("/movies/:identifier/actors/:person_id", delete(detach_actor))
        .route("/movies/:identifier/directors", post(attach_director))
        .route(
            "/movies/:identifier/directors/:person_id",
            delete(detach_director),
        )
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    title: Option<String>,
    year_from: Option<i32>,
    year_to: Option<i32>,
    rating_from: Option<f64>,
    rating_to: Option<f64>,
    genres: Option<String>,
    directors: Option<String>,
    actors: Option<String>,
    skip: Option<u32>,
    limit: Option<u32>,
}

impl ListQuery {
    fn into_filter(self) -> ApiResult<MovieFilter> {
        if let (Some(from), Some(to)) = (self.year_from, self.year_to) {
            if from > to {
                return Err(ApiError::bad_request("year_from is after year_to"));
            }
        }
        if let (Some(from), Some(to)) = (self.rating_from, self.rating_to) {
            if from > to {
                return Err(ApiError::bad_request("rating_from is above rating_to"));
            }
        }
        Ok(MovieFilter {
            genres: comma_list(self.genres.as_deref()),
            directors: comma_list(self.directors.as_deref()),
            actors: comma_list(self.actors.as_deref()),
            title: self.title,
            year_from: self.year_from,
            year_to: self.year_to,
            rating_from: self.rating_from,
            rating_to: self.rating_to,
            skip: self.skip,
            limit: self.limit,
        })
    }
}

async fn list_movies(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<MovieDetail>>> {
    let Query(query) = query?;
    let filter = query.into_filter()?;
    Ok(Json(state.catalog.list_movies(&filter)?))
}

async fn create_movie(
    State(state): State<AppState>,
    body: Result<Json<NewMovie>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MovieDetail>)> {
    let Json(new) = body?;
    let movie = state.catalog.create_movie(&new)?;
    info!("Created {} via API", movie.movie.identifier);
    Ok((StatusCode::CREATED, Json(movie)))
}

async fn get_movie(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<MovieDetail>> {
    let Path(identifier) = path?;
    Ok(Json(state.catalog.get_movie(&identifier)?))
}

async fn update_movie(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<MoviePatch>, JsonRejection>,
) -> ApiResult<Json<MovieDetail>> {
    let Path(identifier) = path?;
    let Json(patch) = body?;
    Ok(Json(state.catalog.update_movie(&identifier, &patch)?))
}

async fn delete_movie(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(identifier) = path?;
    state.catalog.delete_movie(&identifier)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn attach_genre(
    State(state): State<AppState>,
    path: Result<Path<(String, i64)>, PathRejection>,
) -> ApiResult<Json<MovieDetail>> {
    let Path((identifier, genre_id)) = path?;
    Ok(Json(state.catalog.attach_genre(&identifier, genre_id)?))
}

async fn detach_genre(
    State(state): State<AppState>,
    path: Result<Path<(String, i64)>, PathRejection>,
) -> ApiResult<Json<MovieDetail>> {
    let Path((identifier, genre_id)) = path?;
    Ok(Json(state.catalog.detach_genre(&identifier, genre_id)?))
}

async fn attach_actor(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<PersonInput>, JsonRejection>,
) -> ApiResult<Json<MovieDetail>> {
    attach_person(&state, path, PersonRole::Actor, body)
}

async fn attach_director(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<PersonInput>, JsonRejection>,
) -> ApiResult<Json<MovieDetail>> {
    attach_person(&state, path, PersonRole::Director, body)
}

fn attach_person(
    state: &AppState,
    path: Result<Path<String>, PathRejection>,
    role: PersonRole,
    body: Result<Json<PersonInput>, JsonRejection>,
) -> ApiResult<Json<MovieDetail>> {
    let Path(identifier) = path?;
    let Json(person) = body?;
    Ok(Json(state.catalog.attach_person(&identifier, role, &person)?))
}

async fn detach_actor(
    State(state): State<AppState>,
    path: Result<Path<(String, i64)>, PathRejection>,
) -> ApiResult<Json<MovieDetail>> {
    let Path((identifier, person_id)) = path?;
    Ok(Json(state.catalog.detach_person(
        &identifier,
        PersonRole::Actor,
        person_id,
    )?))
}

async fn detach_director(
    State(state): State<AppState>,
    path: Result<Path<(String, i64)>, PathRejection>,
) -> ApiResult<Json<MovieDetail>> {
    let Path((identifier, person_id)) = path?;
    Ok(Json(state.catalog.detach_person(
        &identifier,
        PersonRole::Director,
        person_id,
    )?))
}
