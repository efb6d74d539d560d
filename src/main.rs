use anyhow::Result;
use dotenvy::dotenv;
use movieseek::config::Config;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let loaded = dotenv();
    movieseek::init_tracing();
    match loaded {
        Ok(path) => info!("Loaded environment from {:?}", path),
        Err(e) => warn!("No .env file loaded ({}) - relying on environment", e),
    }
    let config = Config::from_env()?;
    info!(
        "Catalog at {}, TMDb at {}",
        config.database_path.display(),
        config.tmdb.base_url
    );
    movieseek::app::run_server(config).await
}
