//! RateYourMusic film chart scraping.

use crate::models::canonical_identifier;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{header, Client};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_CHART_URL: &str =
    "https://rateyourmusic.com/charts/top/film/all-time/separate:live,archival,soundtrack/";
const SITE_ROOT: &str = "https://rateyourmusic.com";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ITEM_ID_PREFIX: &str = "page_charts_section_charts_item_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartGenre {
    pub name: String,
    pub primary: bool,
}

/// One film scraped from a chart page. Only `title` is guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartFilm {
    pub rank: Option<u32>,
    pub title: String,
    pub year: Option<i32>,
    pub rating: Option<f64>,
    pub votes: i64,
    pub genres: Vec<ChartGenre>,
    pub url: Option<String>,
    pub poster_url: Option<String>,
    pub identifier: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartPage {
    pub page: u32,
    pub films: Vec<ChartFilm>,
}

impl ChartPage {
    /// Fetched fine but nothing was extracted; usually a layout change or a block page.
    pub fn is_empty(&self) -> bool {
        self.films.is_empty()
    }
}

#[async_trait]
pub trait ChartSource: Send + Sync {
    /// `Err` only for transport or HTTP status failures.
    async fn fetch_page(&self, page: u32) -> Result<ChartPage>;
}

#[derive(Debug, Clone)]
pub struct RymConfig {
    pub chart_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for RymConfig {
    fn default() -> Self {
        Self {
            chart_url: DEFAULT_CHART_URL.to_string(),
            user_agent: BROWSER_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RymScraper {
    client: Client,
    config: RymConfig,
}

impl RymScraper {
    pub fn new(config: RymConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.timeout)
            .build()
            .context("building chart HTTP client")?;
        Ok(Self { client, config })
    }

    pub fn page_url(&self, page: u32) -> String {
        let base = if self.config.chart_url.ends_with('/') {
            self.config.chart_url.clone()
        } else {
            format!("{}/", self.config.chart_url)
        };
        if page <= 1 {
            base
        } else {
            format!("{base}{page}/")
        }
    }
}

#[async_trait]
impl ChartSource for RymScraper {
    async fn fetch_page(&self, page: u32) -> Result<ChartPage> {
        let url = self.page_url(page);
        info!("Fetching chart page {} ({})", page, url);
        let res = self
            .client
            .get(&url)
            .header(header::USER_AGENT, &self.config.user_agent)
            .header(
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .send()
            .await
            .with_context(|| format!("chart request for page {page} failed"))?;
        let status = res.status();
        if !status.is_success() {
            return Err(anyhow!("chart page {} -> {}", page, status));
        }
        let html = res.text().await.context("reading chart body failed")?;
        let films = parse_chart_html(&html);
        if films.is_empty() {
            warn!(
                "Chart page {} returned {} bytes but no films were extracted",
                page,
                html.len()
            );
        } else {
            debug!("Chart page {}: {} films", page, films.len());
        }
        Ok(ChartPage { page, films })
    }
}

struct ChartSelectors {
    items: Vec<Selector>,
    title: Vec<Selector>,
    date: Vec<Selector>,
    rating: Vec<Selector>,
    votes: Vec<Selector>,
    primary_genres: Vec<Selector>,
    secondary_genres: Vec<Selector>,
    link: Vec<Selector>,
    poster: Vec<Selector>,
}

fn selectors(css: &[&str]) -> Vec<Selector> {
    css.iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
}

// Each list is tried in order; the first selector that yields a value wins.
static SELECTORS: Lazy<ChartSelectors> = Lazy::new(|| ChartSelectors {
    items: selectors(&[
        ".page_charts_section_charts_item.object_film",
        ".page_charts_section_charts_item",
        ".chart_item_release",
    ]),
    title: selectors(&[
        ".page_charts_section_charts_item_title .ui_name_locale_original",
        ".page_charts_section_charts_item_link",
        "a.page_charts_section_charts_item_link.film",
    ]),
    date: selectors(&[
        ".page_charts_section_charts_item_date span",
        ".page_charts_section_charts_item_title_date_compact span",
    ]),
    rating: selectors(&[".page_charts_section_charts_item_details_average_num"]),
    votes: selectors(&[".page_charts_section_charts_item_details_ratings .abbr"]),
    primary_genres: selectors(&[".page_charts_section_charts_item_genres_primary .genre"]),
    secondary_genres: selectors(&[".page_charts_section_charts_item_genres_secondary .genre"]),
    link: selectors(&[
        ".page_charts_section_charts_item_title a",
        "a.page_charts_section_charts_item_link",
    ]),
    poster: selectors(&[".page_charts_section_charts_item_image_link picture img"]),
});

/// Extract chart entries from one page of HTML. Records without a title are dropped.
pub fn parse_chart_html(html: &str) -> Vec<ChartFilm> {
    let document = Html::parse_document(html);
    let sel = &*SELECTORS;

    let items: Vec<ElementRef> = sel
        .items
        .iter()
        .map(|s| document.select(s).collect::<Vec<_>>())
        .find(|found| !found.is_empty())
        .unwrap_or_default();

    items
        .into_iter()
        .filter_map(|item| parse_item(item, sel))
        .collect()
}

fn parse_item(item: ElementRef, sel: &ChartSelectors) -> Option<ChartFilm> {
    let title = first_text(item, &sel.title)?;
    let year = first_text(item, &sel.date).and_then(|d| parse_year(&d));
    let rating = first_text(item, &sel.rating).and_then(|r| r.parse::<f64>().ok());
    let votes = first_text(item, &sel.votes)
        .and_then(|v| parse_votes(&v))
        .unwrap_or(0);

    let mut genres = Vec::new();
    for (list, primary) in [(&sel.primary_genres, true), (&sel.secondary_genres, false)] {
        for s in list {
            for el in item.select(s) {
                let name = element_text(el);
                if !name.is_empty() {
                    genres.push(ChartGenre { name, primary });
                }
            }
        }
    }

    let url = first_attr(item, &sel.link, "href").map(|href| absolute_url(&href));
    let poster_url = first_attr(item, &sel.poster, "src").map(|src| absolute_url(&src));
    let rank = item
        .value()
        .attr("id")
        .and_then(|id| id.strip_prefix(ITEM_ID_PREFIX))
        .and_then(|n| n.parse::<u32>().ok());

    let identifier = canonical_identifier(&title, year);
    Some(ChartFilm {
        rank,
        title,
        year,
        rating,
        votes,
        genres,
        url,
        poster_url,
        identifier,
    })
}

fn element_text(el: ElementRef) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(item: ElementRef, list: &[Selector]) -> Option<String> {
    list.iter()
        .filter_map(|s| item.select(s).next())
        .map(element_text)
        .find(|t| !t.is_empty())
}

fn first_attr(item: ElementRef, list: &[Selector], attr: &str) -> Option<String> {
    list.iter()
        .filter_map(|s| item.select(s).next())
        .filter_map(|el| el.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn absolute_url(href: &str) -> String {
    if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else if href.starts_with('/') {
        format!("{SITE_ROOT}{href}")
    } else {
        href.to_string()
    }
}

/// Year from a chart date such as `31 March 1999`; the last token wins.
pub fn parse_year(date: &str) -> Option<i32> {
    let token = date.split_whitespace().last()?;
    if token.len() != 4 || !token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Vote counts as printed on the chart: `12,345`, `12k`, `1.2k`, `1.1m`.
pub fn parse_votes(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    let (number, multiplier) = if let Some(n) = cleaned.strip_suffix('k') {
        (n, 1_000.0)
    } else if let Some(n) = cleaned.strip_suffix('m') {
        (n, 1_000_000.0)
    } else {
        (cleaned.as_str(), 1.0)
    };
    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value * multiplier).round() as i64)
}

/// Parse a chart page previously saved to disk.
pub fn load_chart_file(path: impl AsRef<Path>) -> Result<Vec<ChartFilm>> {
    let path = path.as_ref();
    let html = std::fs::read_to_string(path)
        .with_context(|| format!("reading chart file {}", path.display()))?;
    let films = parse_chart_html(&html);
    info!("{}: {} films", path.display(), films.len());
    Ok(films)
}

/// Keep the first film per identifier, preserving order.
pub fn dedupe_films(films: impl IntoIterator<Item = ChartFilm>) -> Vec<ChartFilm> {
    let mut seen = HashSet::new();
    films
        .into_iter()
        .filter(|f| seen.insert(f.identifier.clone()))
        .collect()
}
