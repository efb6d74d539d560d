use crate::catalog::Catalog;
use crate::config::Config;
use crate::importer::{ImportSettings, Importer};
use crate::routes;
use crate::rym::{ChartSource, RymScraper};
use crate::tmdb::{TmdbApi, TmdbClient};
use anyhow::{Context, Result};
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};

const MAX_BODY_BYTES: usize = 1024 * 1024; // 1MB safety cap

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub tmdb: Arc<dyn TmdbApi>,
    pub chart: Arc<dyn ChartSource>,
    pub importer: Importer,
    pub chart_page_delay: Duration,
}

impl AppState {
    pub fn new(
        catalog: Arc<Catalog>,
        tmdb: Arc<dyn TmdbApi>,
        chart: Arc<dyn ChartSource>,
        import: ImportSettings,
        chart_page_delay: Duration,
    ) -> Self {
        let importer = Importer::new(Arc::clone(&catalog), Arc::clone(&tmdb), import);
        Self {
            catalog,
            tmdb,
            chart,
            importer,
            chart_page_delay,
        }
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let catalog = Arc::new(
        Catalog::open(&config.database_path)
            .with_context(|| format!("opening catalog {}", config.database_path.display()))?,
    );
    let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::new(config.tmdb.clone())?);
    let chart: Arc<dyn ChartSource> = Arc::new(RymScraper::new(config.rym.clone())?);
    let state = AppState::new(
        catalog,
        tmdb,
        chart,
        config.import.clone(),
        config.chart_page_delay,
    );

    let stats = state.catalog.counts()?;
    info!(
        "Catalog holds {} movies, {} genres",
        stats.movies, stats.genres
    );
    if stats.genres == 0 {
        match state.importer.seed_genres().await {
            Ok(added) => info!("Seeded {} genres from TMDb", added),
            Err(e) => warn!("Failed to seed genres from TMDb, starting without: {:#}", e),
        }
    }

    let app = build_router(state);

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api", routes::router())
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to MovieSeek API" }))
}

async fn health() -> &'static str {
    "OK"
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
