//! TMDb import and reconciliation against the catalog.

use crate::catalog::{Catalog, CatalogError};
use crate::models::{MovieDetail, MoviePatch, NewMovie};
use crate::tmdb::{MovieDetails, MoviePage, MovieSummary, TmdbApi};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Results per page on TMDb list endpoints.
pub const TMDB_PAGE_SIZE: usize = 20;

/// Detail fetches between pauses during an image refresh.
const IMAGE_BATCH: usize = 5;

#[derive(Debug, Clone)]
pub struct ImportSettings {
    /// Pause between page requests.
    pub page_delay: Duration,
    /// Parallel detail fetches during a top-voted import.
    pub detail_concurrency: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            page_delay: Duration::from_millis(1000),
            detail_concurrency: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingTitle,
    MissingExternalId,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingTitle => write!(f, "record has no title"),
            SkipReason::MissingExternalId => write!(f, "record has no TMDb id"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportOutcome {
    Imported { movie: Box<MovieDetail> },
    Existing { identifier: String },
    Skipped { reason: SkipReason },
    Failed { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub pages_requested: u32,
    pub pages_failed: u32,
    pub records_seen: usize,
    pub imported: usize,
    pub existing: usize,
    pub skipped: usize,
    pub failed: usize,
    pub imported_identifiers: Vec<String>,
}

impl ImportReport {
    pub fn record(&mut self, outcome: &ImportOutcome) {
        match outcome {
            ImportOutcome::Imported { movie } => {
                self.imported += 1;
                self.imported_identifiers
                    .push(movie.movie.identifier.clone());
            }
            ImportOutcome::Existing { .. } => self.existing += 1,
            ImportOutcome::Skipped { .. } => self.skipped += 1,
            ImportOutcome::Failed { .. } => self.failed += 1,
        }
    }

    fn log(&self, label: &str) {
        info!(
            "{}: {} seen, {} imported, {} existing, {} skipped, {} failed ({} of {} pages failed)",
            label,
            self.records_seen,
            self.imported,
            self.existing,
            self.skipped,
            self.failed,
            self.pages_failed,
            self.pages_requested
        );
    }
}

/// Hand-set rating and vote count that replace TMDb's on a single import.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatingOverride {
    pub rating: Option<f64>,
    pub votes: Option<i64>,
}

impl RatingOverride {
    pub fn is_empty(&self) -> bool {
        self.rating.is_none() && self.votes.is_none()
    }

    fn apply(&self, new: &mut NewMovie) {
        if self.rating.is_some() {
            new.rating = self.rating;
        }
        if self.votes.is_some() {
            new.votes = self.votes;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageReport {
    pub candidates: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub updated_identifiers: Vec<String>,
}

#[derive(Clone)]
pub struct Importer {
    catalog: Arc<Catalog>,
    tmdb: Arc<dyn TmdbApi>,
    settings: ImportSettings,
}

impl Importer {
    pub fn new(catalog: Arc<Catalog>, tmdb: Arc<dyn TmdbApi>, settings: ImportSettings) -> Self {
        Self {
            catalog,
            tmdb,
            settings,
        }
    }

    /// Load TMDb's genre list into the catalog. Returns how many genres were new.
    pub async fn seed_genres(&self) -> Result<usize> {
        let genres = self
            .tmdb
            .movie_genres()
            .await
            .context("fetching TMDb genre list")?;
        let added = self
            .catalog
            .ensure_genres(genres.iter().map(|g| g.name.as_str()))?;
        info!("Seeded genres: {} fetched, {} new", genres.len(), added);
        Ok(added)
    }

    /// Import one movie by TMDb id. A failed details fetch is returned as `Err`.
    pub async fn import_by_id(&self, tmdb_id: i64) -> Result<ImportOutcome> {
        self.import_by_id_with(tmdb_id, RatingOverride::default())
            .await
    }

    /// Like [`Importer::import_by_id`], with a rating/votes override. When the movie
    /// is already stored the override is written onto it and nothing is fetched.
    pub async fn import_by_id_with(
        &self,
        tmdb_id: i64,
        overrides: RatingOverride,
    ) -> Result<ImportOutcome> {
        if let Some(movie) = self.catalog.find_by_tmdb_id(tmdb_id)? {
            debug!("TMDb id {} already stored as {}", tmdb_id, movie.identifier);
            if !overrides.is_empty() {
                let patch = MoviePatch {
                    rating: overrides.rating,
                    votes: overrides.votes,
                    ..MoviePatch::default()
                };
                self.catalog.update_movie(&movie.identifier, &patch)?;
                info!(
                    "Overrode rating of {} (rating {:?}, votes {:?})",
                    movie.identifier, overrides.rating, overrides.votes
                );
            }
            return Ok(ImportOutcome::Existing {
                identifier: movie.identifier,
            });
        }
        let details = self
            .tmdb
            .movie_details(tmdb_id)
            .await
            .with_context(|| format!("fetching TMDb movie {tmdb_id}"))?;
        let mut new = details.to_new_movie();
        overrides.apply(&mut new);
        Ok(self.store(new, details.id)?)
    }

    /// Insert a full TMDb record unless its identifier or TMDb id is already stored.
    pub fn import_details(&self, details: &MovieDetails) -> Result<ImportOutcome, CatalogError> {
        self.store(details.to_new_movie(), details.id)
    }

    fn store(&self, new: NewMovie, tmdb_id: i64) -> Result<ImportOutcome, CatalogError> {
        if new.title.trim().is_empty() {
            return Ok(ImportOutcome::Skipped {
                reason: SkipReason::MissingTitle,
            });
        }
        let identifier = new.identifier();
        if let Some(existing) = self.existing(&identifier, Some(tmdb_id))? {
            return Ok(ImportOutcome::Existing {
                identifier: existing,
            });
        }
        match self.catalog.create_movie(&new) {
            Ok(movie) => {
                info!("Imported {}", movie.movie.identifier);
                Ok(ImportOutcome::Imported {
                    movie: Box::new(movie),
                })
            }
            // Lost a race with a concurrent insert of the same movie.
            Err(CatalogError::Conflict(_)) => Ok(ImportOutcome::Existing { identifier }),
            Err(e) => Err(e),
        }
    }

    /// Reconcile one summary record. Never fails; problems become the outcome.
    pub async fn import_summary(&self, summary: &MovieSummary) -> ImportOutcome {
        let tmdb_id = match self.precheck(summary) {
            Ok(id) => id,
            Err(outcome) => return outcome,
        };
        match self.tmdb.movie_details(tmdb_id).await {
            Ok(details) => self.import_loaded(tmdb_id, &details),
            Err(e) => {
                warn!("Details for TMDb id {} unavailable: {:#}", tmdb_id, e);
                ImportOutcome::Failed {
                    reason: format!("{e:#}"),
                }
            }
        }
    }

    pub async fn import_search(&self, query: &str, pages: u32) -> ImportReport {
        let report = self
            .import_pages(pages, |page| self.tmdb.search_movies(query, page))
            .await;
        report.log(&format!("Search import '{query}'"));
        report
    }

    pub async fn import_popular(&self, pages: u32) -> ImportReport {
        let report = self
            .import_pages(pages, |page| self.tmdb.popular_movies(page))
            .await;
        report.log("Popular import");
        report
    }

    pub async fn import_top_rated(&self, pages: u32) -> ImportReport {
        let report = self
            .import_pages(pages, |page| self.tmdb.top_rated_movies(page))
            .await;
        report.log("Top-rated import");
        report
    }

    /// Backfill poster and backdrop paths for stored movies that have a TMDb id
    /// but lack images. Stored paths are kept; a failed fetch skips the movie.
    pub async fn refresh_images(&self) -> Result<ImageReport, CatalogError> {
        let movies = self.catalog.movies_missing_images()?;
        let mut report = ImageReport {
            candidates: movies.len(),
            ..ImageReport::default()
        };
        info!("Refreshing images for {} movies", movies.len());

        for (index, movie) in movies.iter().enumerate() {
            if index > 0 && index % IMAGE_BATCH == 0 {
                tokio::time::sleep(self.settings.page_delay).await;
            }
            let Some(tmdb_id) = movie.tmdb_id else {
                continue;
            };
            let details = match self.tmdb.movie_details(tmdb_id).await {
                Ok(details) => details,
                Err(e) => {
                    warn!("Images for {} unavailable: {:#}", movie.identifier, e);
                    report.failed += 1;
                    continue;
                }
            };
            match self.catalog.fill_images(
                movie.id,
                details.poster_path.as_deref(),
                details.backdrop_path.as_deref(),
            ) {
                Ok(true) => {
                    report.updated += 1;
                    report.updated_identifiers.push(movie.identifier.clone());
                }
                Ok(false) => report.unchanged += 1,
                Err(e) => {
                    warn!("Storing images for {} failed: {}", movie.identifier, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Image refresh: {} candidates, {} updated, {} unchanged, {} failed",
            report.candidates, report.updated, report.unchanged, report.failed
        );
        Ok(report)
    }

    /// Import up to `count` of the most-voted movies not already stored.
    ///
    /// Stored TMDb ids are dropped before the list is cut to `count`, so a run
    /// adds up to `count` new movies rather than re-walking the same top entries.
    /// Candidates keep TMDb's `vote_count.desc` order and no language filter applies.
    pub async fn import_top_voted(&self, count: usize, min_votes: u32) -> ImportReport {
        let mut report = ImportReport::default();
        let known = match self.catalog.existing_tmdb_ids() {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Could not read stored TMDb ids: {}", e);
                HashSet::new()
            }
        };

        let pages = count.div_ceil(TMDB_PAGE_SIZE) as u32;
        let mut candidates: Vec<MovieSummary> = Vec::new();
        for page in 1..=pages {
            if page > 1 {
                tokio::time::sleep(self.settings.page_delay).await;
            }
            report.pages_requested += 1;
            match self.tmdb.discover_top_voted(page, min_votes).await {
                Ok(result) if result.results.is_empty() => break,
                Ok(result) => {
                    for summary in result.results {
                        report.records_seen += 1;
                        match summary.id {
                            Some(id) if known.contains(&id) => report.existing += 1,
                            _ => candidates.push(summary),
                        }
                    }
                }
                Err(e) => {
                    warn!("Top-voted page {} failed: {:#}", page, e);
                    report.pages_failed += 1;
                }
            }
        }
        candidates.truncate(count);

        let mut ids = Vec::new();
        for summary in &candidates {
            match self.precheck(summary) {
                Ok(id) => ids.push(id),
                Err(outcome) => report.record(&outcome),
            }
        }

        let permits = Arc::new(Semaphore::new(self.settings.detail_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for (index, tmdb_id) in ids.into_iter().enumerate() {
            let tmdb = Arc::clone(&self.tmdb);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                (index, tmdb_id, tmdb.movie_details(tmdb_id).await)
            });
        }

        let mut fetched = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => fetched.push(result),
                Err(e) => {
                    warn!("Detail fetch task aborted: {}", e);
                    report.failed += 1;
                }
            }
        }
        fetched.sort_by_key(|(index, _, _)| *index);

        for (_, tmdb_id, result) in fetched {
            let outcome = match result {
                Ok(details) => self.import_loaded(tmdb_id, &details),
                Err(e) => {
                    warn!("Details for TMDb id {} unavailable: {:#}", tmdb_id, e);
                    ImportOutcome::Failed {
                        reason: format!("{e:#}"),
                    }
                }
            };
            report.record(&outcome);
        }

        report.log("Top-voted import");
        report
    }

    async fn import_pages<F, Fut>(&self, pages: u32, fetch: F) -> ImportReport
    where
        F: Fn(u32) -> Fut,
        Fut: Future<Output = Result<MoviePage>>,
    {
        let mut report = ImportReport::default();
        for page in 1..=pages {
            if page > 1 {
                tokio::time::sleep(self.settings.page_delay).await;
            }
            report.pages_requested += 1;
            let result = match fetch(page).await {
                Ok(result) => result,
                Err(e) => {
                    warn!("Page {} failed: {:#}", page, e);
                    report.pages_failed += 1;
                    continue;
                }
            };
            if result.results.is_empty() {
                debug!("Page {} has no results, stopping", page);
                break;
            }
            for summary in &result.results {
                report.records_seen += 1;
                let outcome = self.import_summary(summary).await;
                report.record(&outcome);
            }
            if result.total_pages > 0 && page >= result.total_pages {
                break;
            }
        }
        report
    }

    fn import_loaded(&self, tmdb_id: i64, details: &MovieDetails) -> ImportOutcome {
        match self.import_details(details) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Storing TMDb id {} failed: {}", tmdb_id, e);
                ImportOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    // The cheap checks that need no details fetch. `Err` carries the final outcome.
    fn precheck(&self, summary: &MovieSummary) -> std::result::Result<i64, ImportOutcome> {
        let Some(identifier) = summary.identifier() else {
            debug!("Skipping record without title (TMDb id {:?})", summary.id);
            return Err(ImportOutcome::Skipped {
                reason: SkipReason::MissingTitle,
            });
        };
        match self.existing(&identifier, summary.id) {
            Ok(Some(existing)) => {
                debug!("{} already stored", existing);
                return Err(ImportOutcome::Existing {
                    identifier: existing,
                });
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Lookup of {} failed: {}", identifier, e);
                return Err(ImportOutcome::Failed {
                    reason: e.to_string(),
                });
            }
        }
        summary.id.ok_or_else(|| {
            warn!("Skipping {}: no TMDb id", identifier);
            ImportOutcome::Skipped {
                reason: SkipReason::MissingExternalId,
            }
        })
    }

    fn existing(
        &self,
        identifier: &str,
        tmdb_id: Option<i64>,
    ) -> Result<Option<String>, CatalogError> {
        if let Some(movie) = self.catalog.find_by_identifier(identifier)? {
            return Ok(Some(movie.identifier));
        }
        match tmdb_id {
            Some(id) => Ok(self.catalog.find_by_tmdb_id(id)?.map(|m| m.identifier)),
            None => Ok(None),
        }
    }
}
