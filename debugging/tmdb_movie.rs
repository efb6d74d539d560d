//! Fetch a TMDb movie and print the catalog record it maps to.
//! Usage:
//!   cargo run --bin tmdb_movie -- <tmdb_id>
//!   cargo run --bin tmdb_movie -- search <query>
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{Context, Result};
use dotenvy::dotenv;
use movieseek::tmdb::{TmdbApi, TmdbClient, TmdbConfig};
use serde_json::json;
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: cargo run --bin tmdb_movie -- <tmdb_id>");
        eprintln!("       cargo run --bin tmdb_movie -- search <query>");
        std::process::exit(1);
    }

    let api_key = env::var("TMDB_API_KEY").context("TMDB_API_KEY not set")?;
    let mut config = TmdbConfig::new(api_key);
    config.access_token = env::var("TMDB_ACCESS_TOKEN").ok();
    let client = TmdbClient::new(config)?;

    if args[1] == "search" {
        let query = args[2..].join(" ");
        let page = client.search_movies(&query, 1).await?;
        for movie in &page.results {
            println!(
                "{:>8}  {}",
                movie.id.map(|id| id.to_string()).unwrap_or_default(),
                movie.identifier().unwrap_or_else(|| "<untitled>".to_string())
            );
        }
        eprintln!("{} of {} results", page.results.len(), page.total_results);
        return Ok(());
    }

    let tmdb_id: i64 = args[1].parse().context("tmdb_id must be an integer")?;
    let details = client.movie_details(tmdb_id).await?;
    let movie = details.to_new_movie();
    let out = json!({
        "identifier": movie.identifier(),
        "movie": movie,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
