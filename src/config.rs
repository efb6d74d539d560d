use crate::importer::ImportSettings;
use crate::rym::{RymConfig, DEFAULT_CHART_URL};
use crate::tmdb::{TmdbConfig, DEFAULT_BASE_URL};
use anyhow::{anyhow, Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub tmdb: TmdbConfig,
    pub rym: RymConfig,
    pub import: ImportSettings,
    pub chart_page_delay: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("TMDB_API_KEY").ok_or_else(|| anyhow!("TMDB_API_KEY must be set"))?;
        let mut tmdb = TmdbConfig::new(api_key);
        tmdb.access_token = get("TMDB_ACCESS_TOKEN");
        tmdb.base_url = get("TMDB_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let rym = RymConfig {
            chart_url: get("RYM_CHART_URL").unwrap_or_else(|| DEFAULT_CHART_URL.to_string()),
            ..RymConfig::default()
        };

        let import = ImportSettings {
            page_delay: Duration::from_millis(parse_or(&get, "IMPORT_PAGE_DELAY_MS", 1000)?),
            detail_concurrency: parse_or(&get, "DETAIL_CONCURRENCY", 5)?,
        };
        if import.detail_concurrency == 0 {
            return Err(anyhow!("DETAIL_CONCURRENCY must be at least 1"));
        }

        Ok(Self {
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("movieseek.db")),
            bind_addr: parse_or(&get, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8000)))?,
            tmdb,
            rym,
            import,
            chart_page_delay: Duration::from_millis(parse_or(&get, "RYM_PAGE_DELAY_MS", 2000)?),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{key} has invalid value '{raw}'")),
        None => Ok(default),
    }
}
