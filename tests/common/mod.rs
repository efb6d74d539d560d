#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use movieseek::app::{build_router, AppState};
use movieseek::catalog::Catalog;
use movieseek::importer::ImportSettings;
use movieseek::models::canonical_identifier;
use movieseek::rym::{ChartFilm, ChartPage, ChartSource};
use movieseek::tmdb::{MovieDetails, MoviePage, MovieSummary, TmdbApi, TmdbGenre};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::util::ServiceExt;

#[derive(Default)]
pub struct FakeTmdb {
    /// Page `n` is `pages[n - 1]`; later pages are empty.
    pub pages: Vec<MoviePage>,
    pub failing_pages: HashSet<u32>,
    pub details: HashMap<i64, MovieDetails>,
    pub genres: Vec<TmdbGenre>,
    pub detail_calls: Mutex<Vec<i64>>,
}

impl FakeTmdb {
    fn page(&self, page: u32) -> anyhow::Result<MoviePage> {
        if self.failing_pages.contains(&page) {
            return Err(anyhow::anyhow!("TMDb /movie/popular -> 503 Service Unavailable"));
        }
        Ok(self
            .pages
            .get(page as usize - 1)
            .cloned()
            .unwrap_or_default())
    }

    pub fn detail_calls(&self) -> Vec<i64> {
        self.detail_calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TmdbApi for FakeTmdb {
    async fn search_movies(&self, _query: &str, page: u32) -> anyhow::Result<MoviePage> {
        self.page(page)
    }
    async fn movie_details(&self, tmdb_id: i64) -> anyhow::Result<MovieDetails> {
        self.detail_calls.lock().unwrap().push(tmdb_id);
        self.details
            .get(&tmdb_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("TMDb /movie/{} -> 404 Not Found", tmdb_id))
    }
    async fn popular_movies(&self, page: u32) -> anyhow::Result<MoviePage> {
        self.page(page)
    }
    async fn top_rated_movies(&self, page: u32) -> anyhow::Result<MoviePage> {
        self.page(page)
    }
    async fn discover_top_voted(&self, page: u32, _min_votes: u32) -> anyhow::Result<MoviePage> {
        self.page(page)
    }
    async fn movie_genres(&self) -> anyhow::Result<Vec<TmdbGenre>> {
        Ok(self.genres.clone())
    }
}

/// Chart pages keyed by number: `None` is an HTTP failure, a missing key an empty page.
#[derive(Default)]
pub struct FakeChart {
    pub pages: HashMap<u32, Option<Vec<ChartFilm>>>,
}

#[async_trait::async_trait]
impl ChartSource for FakeChart {
    async fn fetch_page(&self, page: u32) -> anyhow::Result<ChartPage> {
        match self.pages.get(&page) {
            Some(None) => Err(anyhow::anyhow!("chart page {} -> 503", page)),
            Some(Some(films)) => Ok(ChartPage {
                page,
                films: films.clone(),
            }),
            None => Ok(ChartPage {
                page,
                films: Vec::new(),
            }),
        }
    }
}

pub fn test_settings() -> ImportSettings {
    ImportSettings {
        page_delay: Duration::ZERO,
        detail_concurrency: 2,
    }
}

pub fn app(catalog: Arc<Catalog>, tmdb: Arc<FakeTmdb>, chart: FakeChart) -> Router {
    let state = AppState::new(
        catalog,
        tmdb,
        Arc::new(chart),
        test_settings(),
        Duration::ZERO,
    );
    build_router(state)
}

pub fn genres(names: &[&str]) -> Vec<TmdbGenre> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| TmdbGenre {
            id: Some(i as i64 + 1),
            name: name.to_string(),
        })
        .collect()
}

pub fn summary(id: Option<i64>, title: Option<&str>, release_date: &str) -> MovieSummary {
    MovieSummary {
        id,
        title: title.map(str::to_string),
        release_date: Some(release_date.to_string()),
        ..MovieSummary::default()
    }
}

pub fn page_of(results: Vec<MovieSummary>) -> MoviePage {
    MoviePage {
        page: 1,
        total_results: results.len() as u32,
        results,
        total_pages: 0,
    }
}

pub fn details(id: i64, title: &str, release_date: &str, genres: &[&str]) -> MovieDetails {
    let genres: Vec<Value> = genres
        .iter()
        .enumerate()
        .map(|(i, g)| json!({ "id": i + 1, "name": g }))
        .collect();
    serde_json::from_value(json!({
        "id": id,
        "title": title,
        "release_date": release_date,
        "vote_average": 7.5,
        "vote_count": 1000,
        "genres": genres,
        "credits": {
            "cast": [ { "id": id * 10, "name": format!("Lead of {title}"), "order": 0 } ],
            "crew": [ { "id": id * 10 + 1, "name": format!("Director of {title}"), "job": "Director" } ]
        }
    }))
    .unwrap()
}

pub fn matrix_details() -> MovieDetails {
    serde_json::from_value(json!({
        "id": 603,
        "title": "The Matrix",
        "release_date": "1999-03-30",
        "runtime": 136,
        "imdb_id": "tt0133093",
        "vote_average": 8.2,
        "vote_count": 25000,
        "genres": [
            { "id": 28, "name": "Action" },
            { "id": 878, "name": "Science Fiction" }
        ],
        "credits": {
            "cast": [
                { "id": 6384, "name": "Keanu Reeves", "order": 0 },
                { "id": 2975, "name": "Laurence Fishburne", "order": 1 }
            ],
            "crew": [
                { "id": 9340, "name": "Lana Wachowski", "job": "Director" },
                { "id": 9339, "name": "Lilly Wachowski", "job": "Director" }
            ]
        }
    }))
    .unwrap()
}

pub fn chart_film(title: &str, year: Option<i32>, rating: Option<f64>, votes: i64) -> ChartFilm {
    ChartFilm {
        rank: None,
        title: title.to_string(),
        year,
        rating,
        votes,
        genres: Vec::new(),
        url: None,
        poster_url: None,
        identifier: canonical_identifier(title, year),
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(request).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn post(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).unwrap()
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::delete(uri).body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
