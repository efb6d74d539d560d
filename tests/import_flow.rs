mod common;

use axum::http::StatusCode;
use common::{
    app, details, genres, get, matrix_details, page_of, post, send, summary, test_settings,
    FakeChart, FakeTmdb,
};
use movieseek::catalog::Catalog;
use movieseek::importer::{ImportOutcome, Importer, SkipReason};
use movieseek::models::NewMovie;
use movieseek::tmdb::MovieDetails;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

fn catalog() -> Arc<Catalog> {
    Arc::new(Catalog::open_in_memory().unwrap())
}

fn matrix_tmdb() -> FakeTmdb {
    FakeTmdb {
        pages: vec![page_of(vec![summary(
            Some(603),
            Some("The Matrix"),
            "1999-03-30",
        )])],
        details: HashMap::from([(603, matrix_details())]),
        genres: genres(&["Action", "Science Fiction", "Drama"]),
        ..FakeTmdb::default()
    }
}

#[tokio::test]
async fn search_import_stores_matrix_with_links() {
    let catalog = catalog();
    let tmdb = Arc::new(matrix_tmdb());
    let app = app(catalog.clone(), tmdb.clone(), FakeChart::default());

    let (status, body) = send(&app, post("/api/tmdb/genres/sync")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["added"], 3);

    let (status, body) = send(&app, post("/api/tmdb/import/search?query=matrix&page_count=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["imported"], 1);
    assert_eq!(body["imported_identifiers"][0], "The Matrix (1999)");

    let (status, body) = send(&app, get("/api/movies/The%20Matrix%20(1999)")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tmdb_id"], 603);
    assert_eq!(body["runtime"], 136);
    assert_eq!(body["genres"].as_array().unwrap().len(), 2);
    assert_eq!(body["directors"].as_array().unwrap().len(), 2);
    assert_eq!(body["actors"][0]["name"], "Keanu Reeves");
}

#[tokio::test]
async fn incomplete_records_are_skipped_not_fatal() {
    let catalog = catalog();
    catalog.ensure_genres(["Drama"]).unwrap();
    let tmdb = FakeTmdb {
        pages: vec![page_of(vec![
            summary(Some(1), Some("Alpha"), "2001-01-01"),
            summary(Some(2), None, "2002-01-01"),
            summary(None, Some("Gamma"), "2003-01-01"),
            summary(Some(4), Some("Delta"), "2004-01-01"),
        ])],
        details: HashMap::from([
            (1, details(1, "Alpha", "2001-01-01", &["Drama"])),
            (4, details(4, "Delta", "2004-01-01", &["Drama"])),
        ]),
        ..FakeTmdb::default()
    };
    let importer = Importer::new(catalog.clone(), Arc::new(tmdb), test_settings());

    let report = importer.import_popular(1).await;
    assert_eq!(report.records_seen, 4);
    assert_eq!(report.imported, 2);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(catalog.counts().unwrap().movies, 2);
}

#[tokio::test]
async fn reimport_is_a_noop() {
    let catalog = catalog();
    let tmdb = Arc::new(FakeTmdb {
        pages: vec![page_of(vec![
            summary(Some(1), Some("Alpha"), "2001-01-01"),
            summary(Some(2), Some("Beta"), "2002-01-01"),
        ])],
        details: HashMap::from([
            (1, details(1, "Alpha", "2001-01-01", &[])),
            (2, details(2, "Beta", "2002-01-01", &[])),
        ]),
        ..FakeTmdb::default()
    });
    let importer = Importer::new(catalog.clone(), tmdb.clone(), test_settings());

    let first = importer.import_top_rated(1).await;
    assert_eq!(first.imported, 2);
    let calls_after_first = tmdb.detail_calls().len();

    let second = importer.import_top_rated(1).await;
    assert_eq!(second.imported, 0);
    assert_eq!(second.existing, 2);
    assert_eq!(tmdb.detail_calls().len(), calls_after_first);
    assert_eq!(catalog.counts().unwrap().movies, 2);
}

#[tokio::test]
async fn unknown_genres_are_not_created() {
    let catalog = catalog();
    catalog.ensure_genres(["Drama"]).unwrap();
    let tmdb = FakeTmdb {
        details: HashMap::from([(7, details(7, "Seven", "1995-09-22", &["Drama", "Crime"]))]),
        ..FakeTmdb::default()
    };
    let importer = Importer::new(catalog.clone(), Arc::new(tmdb), test_settings());

    let outcome = importer.import_by_id(7).await.unwrap();
    let ImportOutcome::Imported { movie } = outcome else {
        panic!("expected an import, got {outcome:?}");
    };
    assert_eq!(movie.genre_names(), vec!["Drama"]);
    assert_eq!(catalog.list_genres().unwrap().len(), 1);
}

#[tokio::test]
async fn minimal_details_record_imports_once() {
    let catalog = catalog();
    catalog.ensure_genres(["Action", "Drama"]).unwrap();
    let record: MovieDetails = serde_json::from_value(serde_json::json!({
        "id": 603,
        "title": "The Matrix",
        "release_date": "1999-03-30",
        "genres": [{ "name": "Action" }],
        "vote_average": 8.1,
        "vote_count": 20000
    }))
    .unwrap();
    let tmdb = Arc::new(FakeTmdb {
        details: HashMap::from([(603, record)]),
        ..FakeTmdb::default()
    });
    let importer = Importer::new(catalog.clone(), tmdb.clone(), test_settings());

    let outcome = importer.import_by_id(603).await.unwrap();
    let ImportOutcome::Imported { movie } = outcome else {
        panic!("expected an import, got {outcome:?}");
    };
    assert_eq!(movie.movie.identifier, "The Matrix (1999)");
    assert_eq!(movie.genre_names(), vec!["Action"]);
    assert_eq!(movie.movie.rating, Some(8.1));

    let again = importer.import_by_id(603).await.unwrap();
    assert_eq!(
        again,
        ImportOutcome::Existing {
            identifier: "The Matrix (1999)".into()
        }
    );
    assert_eq!(tmdb.detail_calls(), vec![603]);
    assert_eq!(catalog.counts().unwrap().movies, 1);
}

#[tokio::test]
async fn missing_details_fail_one_record_only() {
    let catalog = catalog();
    let tmdb = FakeTmdb {
        pages: vec![page_of(vec![
            summary(Some(1), Some("Alpha"), "2001-01-01"),
            summary(Some(99), Some("Ghost"), "2009-01-01"),
        ])],
        details: HashMap::from([(1, details(1, "Alpha", "2001-01-01", &[]))]),
        ..FakeTmdb::default()
    };
    let importer = Importer::new(catalog, Arc::new(tmdb), test_settings());
    let report = importer.import_popular(1).await;
    assert_eq!(report.imported, 1);
    assert_eq!(report.failed, 1);
}

#[tokio::test]
async fn failed_pages_are_counted_and_skipped() {
    let catalog = catalog();
    let tmdb = FakeTmdb {
        pages: vec![
            page_of(vec![summary(Some(1), Some("Alpha"), "2001-01-01")]),
            page_of(vec![summary(Some(2), Some("Beta"), "2002-01-01")]),
        ],
        failing_pages: HashSet::from([1]),
        details: HashMap::from([(2, details(2, "Beta", "2002-01-01", &[]))]),
        ..FakeTmdb::default()
    };
    let importer = Importer::new(catalog, Arc::new(tmdb), test_settings());
    let report = importer.import_popular(2).await;
    assert_eq!(report.pages_requested, 2);
    assert_eq!(report.pages_failed, 1);
    assert_eq!(report.imported_identifiers, vec!["Beta (2002)"]);
}

#[tokio::test]
async fn top_voted_filters_known_ids_and_respects_count() {
    let catalog = catalog();
    let summaries = (1..=6)
        .map(|i| summary(Some(i), Some(&format!("Film {i}")), "2010-01-01"))
        .collect();
    let details_by_id = (1..=6)
        .map(|i| (i, details(i, &format!("Film {i}"), "2010-01-01", &[])))
        .collect();
    let tmdb = Arc::new(FakeTmdb {
        pages: vec![page_of(summaries)],
        details: details_by_id,
        ..FakeTmdb::default()
    });
    let importer = Importer::new(catalog.clone(), tmdb.clone(), test_settings());

    assert!(matches!(
        importer.import_by_id(1).await.unwrap(),
        ImportOutcome::Imported { .. }
    ));

    let report = importer.import_top_voted(4, 100).await;
    assert_eq!(report.pages_requested, 1);
    assert_eq!(report.existing, 1);
    assert_eq!(report.imported, 4);
    assert_eq!(
        report.imported_identifiers,
        vec!["Film 2 (2010)", "Film 3 (2010)", "Film 4 (2010)", "Film 5 (2010)"]
    );
    assert!(!tmdb.detail_calls().contains(&6));
}

#[tokio::test]
async fn import_by_id_over_http() {
    let catalog = catalog();
    let app = app(catalog, Arc::new(matrix_tmdb()), FakeChart::default());

    let (status, body) = send(&app, post("/api/tmdb/import?tmdb_id=603")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "imported");
    assert_eq!(body["movie"]["identifier"], "The Matrix (1999)");

    let (status, body) = send(&app, post("/api/tmdb/import?tmdb_id=603")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "existing");

    let (status, body) = send(&app, post("/api/tmdb/import?tmdb_id=42")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["status"], 502);
}

#[tokio::test]
async fn page_count_is_validated() {
    let app = app(catalog(), Arc::new(matrix_tmdb()), FakeChart::default());
    for uri in [
        "/api/tmdb/import/popular?page_count=0",
        "/api/tmdb/import/popular?page_count=6",
        "/api/tmdb/import/search?query=matrix&page_count=9",
        "/api/tmdb/import/top_voted?count=0",
    ] {
        let (status, _) = send(&app, post(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn batch_with_every_page_failing_is_upstream_error() {
    let tmdb = FakeTmdb {
        failing_pages: HashSet::from([1, 2]),
        ..FakeTmdb::default()
    };
    let app = app(catalog(), Arc::new(tmdb), FakeChart::default());
    let (status, _) = send(&app, post("/api/tmdb/import/popular?page_count=2")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn skip_reason_is_reported() {
    let importer = Importer::new(catalog(), Arc::new(FakeTmdb::default()), test_settings());
    let outcome = importer
        .import_summary(&summary(None, Some("Untracked"), "2000-01-01"))
        .await;
    assert_eq!(
        outcome,
        ImportOutcome::Skipped {
            reason: SkipReason::MissingExternalId
        }
    );
}

#[tokio::test]
async fn rating_override_applies_on_import_and_on_stored_rows() {
    let catalog = catalog();
    let tmdb = Arc::new(matrix_tmdb());
    let app = app(catalog.clone(), tmdb.clone(), FakeChart::default());

    let (status, body) = send(
        &app,
        post("/api/tmdb/import?tmdb_id=603&rating=9.5&votes=18051856"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["movie"]["rating"], 9.5);
    assert_eq!(body["movie"]["votes"], 18051856);

    let (status, body) = send(&app, post("/api/tmdb/import?tmdb_id=603&rating=9.9")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "existing");
    let stored = catalog.find_by_tmdb_id(603).unwrap().unwrap();
    assert_eq!(stored.rating, Some(9.9));
    assert_eq!(stored.votes, Some(18051856));
    assert_eq!(tmdb.detail_calls(), vec![603]);

    let (status, _) = send(&app, post("/api/tmdb/import?tmdb_id=603&rating=11")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn image_refresh_fills_only_missing_paths() {
    let catalog = catalog();
    for (tmdb_id, title, poster) in [
        (348, "Alien", Some("/kept.jpg")),
        (679, "Aliens", None),
        (999, "Lost Print", None),
    ] {
        catalog
            .create_movie(&NewMovie {
                title: title.to_string(),
                year: Some(1980),
                tmdb_id: Some(tmdb_id),
                poster_path: poster.map(str::to_string),
                ..NewMovie::default()
            })
            .unwrap();
    }
    let with_images = |id: i64, title: &str| {
        serde_json::from_value::<MovieDetails>(serde_json::json!({
            "id": id,
            "title": title,
            "poster_path": format!("/{id}-poster.jpg"),
            "backdrop_path": format!("/{id}-backdrop.jpg")
        }))
        .unwrap()
    };
    let tmdb = Arc::new(FakeTmdb {
        details: HashMap::from([(348, with_images(348, "Alien")), (679, with_images(679, "Aliens"))]),
        ..FakeTmdb::default()
    });
    let app = app(catalog.clone(), tmdb, FakeChart::default());

    let (status, body) = send(&app, post("/api/tmdb/refresh_images")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["candidates"], 3);
    assert_eq!(body["updated"], 2);
    assert_eq!(body["failed"], 1);

    let alien = catalog.find_by_tmdb_id(348).unwrap().unwrap();
    assert_eq!(alien.poster_path.as_deref(), Some("/kept.jpg"));
    assert_eq!(alien.backdrop_path.as_deref(), Some("/348-backdrop.jpg"));
    let aliens = catalog.find_by_tmdb_id(679).unwrap().unwrap();
    assert_eq!(aliens.poster_path.as_deref(), Some("/679-poster.jpg"));

    let (_, body) = send(&app, post("/api/tmdb/refresh_images")).await;
    assert_eq!(body["candidates"], 1);
    assert_eq!(body["updated"], 0);
}
