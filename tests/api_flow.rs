mod common;

use axum::http::StatusCode;
use common::{app, delete, get, json_request, post, send, FakeChart, FakeTmdb};
use movieseek::catalog::Catalog;
use movieseek::models::{NewMovie, PersonInput};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

fn catalog() -> Arc<Catalog> {
    let catalog = Catalog::open_in_memory().unwrap();
    catalog
        .ensure_genres(["Action", "Drama", "Science Fiction", "Thriller"])
        .unwrap();
    Arc::new(catalog)
}

fn seed(catalog: &Catalog, title: &str, year: i32, rating: f64, genres: &[&str], director: &str) {
    catalog
        .create_movie(&NewMovie {
            title: title.to_string(),
            year: Some(year),
            rating: Some(rating),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            directors: vec![PersonInput::named(director)],
            ..NewMovie::default()
        })
        .unwrap();
}

fn identifiers(body: &Value) -> Vec<String> {
    let mut ids: Vec<String> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["identifier"].as_str().unwrap().to_string())
        .collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn root_and_health() {
    let app = app(catalog(), Arc::new(FakeTmdb::default()), FakeChart::default());
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".into()));

    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to MovieSeek API");
}

#[tokio::test]
async fn create_read_and_duplicate() {
    let app = app(catalog(), Arc::new(FakeTmdb::default()), FakeChart::default());
    let payload = json!({
        "title": "The Matrix",
        "release_date": "1999-03-30",
        "rating": 8.2,
        "genres": ["Action", "Science Fiction", "Cyberpunk"],
        "directors": [{ "name": "Lana Wachowski" }],
        "actors": [{ "name": "Keanu Reeves", "tmdb_id": 6384 }]
    });

    let (status, body) = send(&app, json_request("POST", "/api/movies", payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["identifier"], "The Matrix (1999)");
    assert_eq!(body["year"], 1999);
    let genres: Vec<&str> = body["genres"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["name"].as_str().unwrap())
        .collect();
    assert_eq!(genres, vec!["Action", "Science Fiction"]);
    assert_eq!(body["actors"][0]["tmdb_id"], 6384);

    let (status, body) = send(&app, json_request("POST", "/api/movies", payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["status"], 409);

    let (status, body) = send(&app, get("/api/movies/The%20Matrix%20(1999)")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["directors"][0]["name"], "Lana Wachowski");

    let (status, body) = send(&app, get("/api/movies/Heat%20(1995)")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "movie not found: Heat (1995)");
}

#[tokio::test]
async fn blank_title_is_unprocessable() {
    let app = app(catalog(), Arc::new(FakeTmdb::default()), FakeChart::default());
    let (status, _) = send(&app, json_request("POST", "/api/movies", json!({ "title": "  " }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn list_filters_combine() {
    let catalog = catalog();
    seed(&catalog, "Die Hard", 1988, 8.2, &["Action"], "John McTiernan");
    seed(&catalog, "Heat", 1995, 8.3, &["Action", "Thriller"], "Michael Mann");
    seed(&catalog, "Fargo", 1996, 8.1, &["Drama"], "Joel Coen");
    seed(&catalog, "Gattaca", 1997, 7.8, &["Science Fiction"], "Andrew Niccol");
    let app = app(catalog, Arc::new(FakeTmdb::default()), FakeChart::default());

    let (status, body) = send(&app, get("/api/movies?genres=Action,Drama&year_from=1990")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(identifiers(&body), vec!["Fargo (1996)", "Heat (1995)"]);

    let (_, body) = send(&app, get("/api/movies?year_from=1995&year_to=1996")).await;
    assert_eq!(identifiers(&body), vec!["Fargo (1996)", "Heat (1995)"]);

    let (_, body) = send(&app, get("/api/movies?directors=michael%20mann")).await;
    assert_eq!(identifiers(&body), vec!["Heat (1995)"]);

    let (_, body) = send(&app, get("/api/movies?title=HARD")).await;
    assert_eq!(identifiers(&body), vec!["Die Hard (1988)"]);

    let (_, body) = send(&app, get("/api/movies?limit=2")).await;
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Heat", "Die Hard"]);

    let (status, body) = send(&app, get("/api/movies?year_from=abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["status"], 400);

    let (status, _) = send(&app, get("/api/movies?year_from=2000&year_to=1990")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_merges_and_delete_removes() {
    let catalog = catalog();
    seed(&catalog, "Heat", 1995, 8.3, &["Action"], "Michael Mann");
    let app = app(catalog.clone(), Arc::new(FakeTmdb::default()), FakeChart::default());

    let (status, body) = send(
        &app,
        json_request("PUT", "/api/movies/Heat%20(1995)", json!({ "runtime": 170 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["runtime"], 170);
    assert_eq!(body["rating"], 8.3);
    assert_eq!(body["genres"][0]["name"], "Action");

    let (status, _) = send(
        &app,
        json_request("PUT", "/api/movies/Heat%20(1995)", json!({ "identifier": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(&app, delete("/api/movies/Heat%20(1995)")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
    assert_eq!(catalog.counts().unwrap().movies, 0);

    let (status, _) = send(&app, delete("/api/movies/Heat%20(1995)")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn associations_attach_and_detach() {
    let catalog = catalog();
    seed(&catalog, "Heat", 1995, 8.3, &[], "Michael Mann");
    let drama = catalog.get_genre_by_name("Drama").unwrap().unwrap();
    let app = app(catalog, Arc::new(FakeTmdb::default()), FakeChart::default());

    let uri = format!("/api/movies/Heat%20(1995)/genres/{}", drama.id);
    let (status, body) = send(&app, post(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["genres"][0]["name"], "Drama");
    let (_, body) = send(&app, delete(&uri)).await;
    assert_eq!(body["genres"], json!([]));

    let (status, _) = send(&app, post("/api/movies/Heat%20(1995)/genres/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/movies/Heat%20(1995)/actors",
            json!({ "name": "Al Pacino" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let actor_id = body["actors"][0]["id"].as_i64().unwrap();

    let (_, body) = send(
        &app,
        delete(&format!("/api/movies/Heat%20(1995)/actors/{actor_id}")),
    )
    .await;
    assert_eq!(body["actors"], json!([]));

    let (_, body) = send(
        &app,
        json_request(
            "POST",
            "/api/movies/Heat%20(1995)/directors",
            json!({ "name": "michael mann" }),
        ),
    )
    .await;
    assert_eq!(body["directors"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn genres_are_created_once() {
    let app = app(catalog(), Arc::new(FakeTmdb::default()), FakeChart::default());
    let (status, body) = send(&app, json_request("POST", "/api/genres", json!({ "name": "Western" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_i64().unwrap();

    let (status, body) = send(&app, json_request("POST", "/api/genres", json!({ "name": "western" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"].as_i64(), Some(id));

    let (_, body) = send(&app, get("/api/genres")).await;
    let names: HashSet<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 5);
    assert!(names.contains("Western"));

    let (status, _) = send(&app, get("/api/genres/9999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_path_ids_answer_json_errors() {
    let catalog = catalog();
    seed(&catalog, "Heat", 1995, 8.3, &[], "Michael Mann");
    let app = app(catalog, Arc::new(FakeTmdb::default()), FakeChart::default());

    for (method, uri) in [
        ("GET", "/api/genres/abc"),
        ("POST", "/api/movies/Heat%20(1995)/genres/abc"),
        ("DELETE", "/api/movies/Heat%20(1995)/actors/first"),
    ] {
        let request = axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(axum::body::Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{method} {uri}");
        assert_eq!(body["error"]["status"], 400, "{method} {uri}");
        assert!(body["error"]["message"].is_string(), "{method} {uri}");
    }
}

#[tokio::test]
async fn admin_stats_and_guarded_clear() {
    let catalog = catalog();
    seed(&catalog, "Heat", 1995, 8.3, &["Action"], "Michael Mann");
    let app = app(catalog.clone(), Arc::new(FakeTmdb::default()), FakeChart::default());

    let (_, body) = send(&app, get("/api/admin/stats")).await;
    assert_eq!(body, json!({ "movies": 1, "genres": 4, "actors": 0, "directors": 1 }));

    let (status, _) = send(&app, post("/api/admin/clear")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(catalog.counts().unwrap().movies, 1);

    let (status, body) = send(&app, post("/api/admin/clear?confirm=true")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"]["movies"], 1);
    assert_eq!(catalog.counts().unwrap().genres, 0);
}

#[tokio::test]
async fn tmdb_search_proxy_reports_upstream_failure() {
    let tmdb = FakeTmdb {
        failing_pages: HashSet::from([1]),
        ..FakeTmdb::default()
    };
    let app = app(catalog(), Arc::new(tmdb), FakeChart::default());

    let (status, body) = send(&app, get("/api/tmdb/search?query=matrix")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["status"], 502);

    let (status, _) = send(&app, get("/api/tmdb/search?query=%20")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get("/api/tmdb/search")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
