use crate::models::{canonical_identifier, year_from_date, NewMovie, PersonInput};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
const MAX_CAST: usize = 10;

/// Connection settings for the TMDb v3 API.
#[derive(Debug, Clone)]
pub struct TmdbConfig {
    pub api_key: String,
    /// v4 read token; sent as a bearer header instead of the `api_key` query parameter.
    pub access_token: Option<String>,
    pub base_url: String,
    pub language: String,
    pub timeout: Duration,
}

impl TmdbConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            access_token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            language: "en-US".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn search_movies(&self, query: &str, page: u32) -> Result<MoviePage>;
    async fn movie_details(&self, tmdb_id: i64) -> Result<MovieDetails>;
    async fn popular_movies(&self, page: u32) -> Result<MoviePage>;
    async fn top_rated_movies(&self, page: u32) -> Result<MoviePage>;
    async fn discover_top_voted(&self, page: u32, min_votes: u32) -> Result<MoviePage>;
    async fn movie_genres(&self) -> Result<Vec<TmdbGenre>>;
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    config: TmdbConfig,
}

impl TmdbClient {
    pub fn new(config: TmdbConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() && config.access_token.is_none() {
            return Err(anyhow!("TMDb API key is empty"));
        }
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.timeout)
            .build()
            .context("building TMDb HTTP client")?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> String {
        let mut url = format!(
            "{}{}?language={}",
            self.config.base_url.trim_end_matches('/'),
            path,
            urlencoding::encode(&self.config.language)
        );
        if self.config.access_token.is_none() {
            url.push_str("&api_key=");
            url.push_str(&urlencoding::encode(&self.config.api_key));
        }
        for (key, value) in query {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    // Errors name the path only; the full URL may carry the API key.
    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let mut request = self.client.get(self.url(path, query));
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }
        let res = request
            .send()
            .await
            .map_err(|e| anyhow!("TMDb request to {} failed: {}", path, e.without_url()))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| anyhow!("reading TMDb {} body failed: {}", path, e.without_url()))?;
        if !status.is_success() {
            let snippet: String = text.chars().take(200).collect();
            return Err(anyhow!("TMDb {} -> {}: {}", path, status, snippet));
        }
        debug!("TMDb {} -> {} ({} bytes)", path, status, text.len());
        serde_json::from_str(&text).with_context(|| format!("decoding TMDb {path} response"))
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn search_movies(&self, query: &str, page: u32) -> Result<MoviePage> {
        self.get_json(
            "/search/movie",
            &[
                ("query", query.to_string()),
                ("page", page.to_string()),
                ("include_adult", "false".to_string()),
            ],
        )
        .await
    }

    async fn movie_details(&self, tmdb_id: i64) -> Result<MovieDetails> {
        self.get_json(
            &format!("/movie/{tmdb_id}"),
            &[(
                "append_to_response",
                "credits,keywords,release_dates".to_string(),
            )],
        )
        .await
    }

    async fn popular_movies(&self, page: u32) -> Result<MoviePage> {
        self.get_json("/movie/popular", &[("page", page.to_string())])
            .await
    }

    async fn top_rated_movies(&self, page: u32) -> Result<MoviePage> {
        self.get_json("/movie/top_rated", &[("page", page.to_string())])
            .await
    }

    async fn discover_top_voted(&self, page: u32, min_votes: u32) -> Result<MoviePage> {
        self.get_json(
            "/discover/movie",
            &[
                ("sort_by", "vote_count.desc".to_string()),
                ("vote_count.gte", min_votes.to_string()),
                ("include_adult", "false".to_string()),
                ("page", page.to_string()),
            ],
        )
        .await
    }

    async fn movie_genres(&self) -> Result<Vec<TmdbGenre>> {
        #[derive(Deserialize)]
        struct GenreList {
            #[serde(default)]
            genres: Vec<TmdbGenre>,
        }

        let list: GenreList = self.get_json("/genre/movie/list", &[]).await?;
        Ok(list.genres)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TmdbGenre {
    /// Absent on some embedded genre lists; only the name is used for linking.
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
}

/// One page of summary records (search, popular, top rated, discover).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoviePage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<MovieSummary>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovieSummary {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<i64>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
}

impl MovieSummary {
    /// Title with surrounding whitespace removed; `None` when blank.
    pub fn clean_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn year(&self) -> Option<i32> {
        self.release_date.as_deref().and_then(year_from_date)
    }

    pub fn identifier(&self) -> Option<String> {
        self.clean_title()
            .map(|title| canonical_identifier(title, self.year()))
    }
}

/// Full record from `/movie/{id}` with credits, keywords and release dates appended.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieDetails {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<i32>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<i64>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub budget: Option<i64>,
    #[serde(default)]
    pub revenue: Option<i64>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub credits: Option<Credits>,
    #[serde(default)]
    pub keywords: Option<Keywords>,
    #[serde(default)]
    pub release_dates: Option<ReleaseDates>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CastMember {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub order: Option<i32>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrewMember {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub job: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Keywords {
    #[serde(default)]
    pub keywords: Vec<Keyword>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Keyword {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReleaseDates {
    #[serde(default)]
    pub results: Vec<ReleaseEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseEntry {
    pub iso_3166_1: String,
    #[serde(default)]
    pub release_dates: Vec<ReleaseCert>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseCert {
    #[serde(default)]
    pub certification: String,
}

impl MovieDetails {
    pub fn year(&self) -> Option<i32> {
        self.release_date.as_deref().and_then(year_from_date)
    }

    pub fn identifier(&self) -> String {
        canonical_identifier(&self.title, self.year())
    }

    /// Map the record onto a catalog insert: directors from crew, top-billed cast,
    /// and the extra fields kept under `metadata`.
    pub fn to_new_movie(&self) -> NewMovie {
        let release_date = non_blank(self.release_date.as_ref());

        let mut metadata = Map::new();
        if let Some(cert) = self.release_dates.as_ref().and_then(us_cert_from_release_dates) {
            metadata.insert("us_certification".to_string(), json!(cert));
        }
        let keywords: Vec<&str> = self
            .keywords
            .iter()
            .flat_map(|k| k.keywords.iter().map(|kw| kw.name.as_str()))
            .collect();
        if !keywords.is_empty() {
            metadata.insert("keywords".to_string(), json!(keywords));
        }
        if let Some(popularity) = self.popularity {
            metadata.insert("popularity".to_string(), json!(popularity));
        }
        for (key, amount) in [("budget", self.budget), ("revenue", self.revenue)] {
            if let Some(amount) = amount.filter(|a| *a > 0) {
                metadata.insert(key.to_string(), Value::from(amount));
            }
        }

        let (actors, directors) = match &self.credits {
            Some(credits) => (
                top_cast(&credits.cast, MAX_CAST),
                crew_directors(&credits.crew),
            ),
            None => (Vec::new(), Vec::new()),
        };

        NewMovie {
            title: self.title.trim().to_string(),
            original_title: non_blank(self.original_title.as_ref()),
            year: release_date.as_deref().and_then(year_from_date),
            release_date,
            runtime: self.runtime.filter(|r| *r > 0),
            language: non_blank(self.original_language.as_ref()),
            tmdb_id: Some(self.id),
            imdb_id: non_blank(self.imdb_id.as_ref()),
            rating: self.vote_average,
            votes: self.vote_count,
            rym_rating: None,
            rym_votes: None,
            plot: non_blank(self.overview.as_ref()),
            tagline: non_blank(self.tagline.as_ref()),
            poster_path: self.poster_path.clone(),
            backdrop_path: self.backdrop_path.clone(),
            metadata,
            genres: self.genres.iter().map(|g| g.name.clone()).collect(),
            actors,
            directors,
        }
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn us_cert_from_release_dates(data: &ReleaseDates) -> Option<String> {
    data.results
        .iter()
        .find(|r| r.iso_3166_1 == "US")
        .and_then(|r| {
            r.release_dates
                .iter()
                .find(|rd| !rd.certification.is_empty())
        })
        .map(|rd| rd.certification.clone())
}

fn top_cast(cast: &[CastMember], max: usize) -> Vec<PersonInput> {
    let mut billed: Vec<&CastMember> = cast.iter().collect();
    billed.sort_by_key(|c| c.order.unwrap_or(i32::MAX));
    billed
        .into_iter()
        .take(max)
        .map(|c| PersonInput {
            name: c.name.clone(),
            tmdb_id: c.id,
            imdb_id: None,
            profile_path: c.profile_path.clone(),
        })
        .collect()
}

fn crew_directors(crew: &[CrewMember]) -> Vec<PersonInput> {
    let mut out: Vec<PersonInput> = Vec::new();
    for member in crew.iter().filter(|c| c.job.as_deref() == Some("Director")) {
        if out
            .iter()
            .any(|p| p.name.to_lowercase() == member.name.to_lowercase())
        {
            continue;
        }
        out.push(PersonInput {
            name: member.name.clone(),
            tmdb_id: member.id,
            imdb_id: None,
            profile_path: member.profile_path.clone(),
        });
    }
    out
}
