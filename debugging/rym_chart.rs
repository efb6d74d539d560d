//! Scrape chart pages or parse saved chart HTML and print the extracted films as JSON.
//! Usage:
//!   cargo run --bin rym_chart -- fetch <page> [<page> ...]
//!   cargo run --bin rym_chart -- file <chart.html> [<chart.html> ...]
//! `RYM_CHART_URL` overrides the chart address (.env supported).

use anyhow::{Context, Result};
use dotenvy::dotenv;
use movieseek::rym::{self, ChartSource, RymConfig, RymScraper};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: cargo run --bin rym_chart -- fetch <page> [<page> ...]");
        eprintln!("       cargo run --bin rym_chart -- file <chart.html> [<chart.html> ...]");
        std::process::exit(1);
    }

    let mut films = Vec::new();
    match args[1].as_str() {
        "fetch" => {
            let mut config = RymConfig::default();
            if let Ok(url) = env::var("RYM_CHART_URL") {
                config.chart_url = url;
            }
            let scraper = RymScraper::new(config)?;
            for raw in &args[2..] {
                let page: u32 = raw.parse().context("page must be a positive integer")?;
                let chart = scraper.fetch_page(page).await?;
                if chart.is_empty() {
                    eprintln!("page {page}: no films extracted");
                }
                films.extend(chart.films);
            }
        }
        "file" => {
            for path in &args[2..] {
                films.extend(rym::load_chart_file(path)?);
            }
        }
        other => anyhow::bail!("unknown mode '{}', expected 'fetch' or 'file'", other),
    }

    let films = rym::dedupe_films(films);
    eprintln!("{} unique films", films.len());
    println!("{}", serde_json::to_string_pretty(&films)?);
    Ok(())
}
