//! MovieSeek: a movie catalog fed from TMDb and the RateYourMusic film chart.

pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod importer;
pub mod models;
pub mod routes;
pub mod rym;
pub mod scores;
pub mod tmdb;

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
