//! Applies chart ratings to catalog movies.

use crate::catalog::{Catalog, CatalogError};
use crate::rym::{ChartFilm, ChartSource};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmbiguousMatch {
    pub identifier: String,
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    Updated { identifier: String },
    NotFound,
    Skipped,
    Ambiguous(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreReport {
    pub pages_requested: u32,
    pub pages_failed: u32,
    /// Pages that loaded but yielded no films; worth a manual look.
    pub empty_pages: Vec<u32>,
    pub films_seen: usize,
    pub updated: usize,
    pub not_found: usize,
    pub skipped: usize,
    pub failed: usize,
    pub ambiguous: Vec<AmbiguousMatch>,
}

impl ScoreReport {
    fn record(&mut self, film: &ChartFilm, outcome: ScoreOutcome) {
        match outcome {
            ScoreOutcome::Updated { .. } => self.updated += 1,
            ScoreOutcome::NotFound => self.not_found += 1,
            ScoreOutcome::Skipped => self.skipped += 1,
            ScoreOutcome::Ambiguous(candidates) => self.ambiguous.push(AmbiguousMatch {
                identifier: film.identifier.clone(),
                candidates,
            }),
        }
    }
}

/// Match one chart film and store its score. Exact identifier first, then a
/// title-substring match within the same year; several candidates are not guessed.
pub fn apply_chart_score(catalog: &Catalog, film: &ChartFilm) -> Result<ScoreOutcome, CatalogError> {
    if film.title.trim().is_empty() || film.identifier.trim().is_empty() {
        return Ok(ScoreOutcome::Skipped);
    }
    let Some(rating) = film.rating else {
        debug!("{} has no chart rating", film.identifier);
        return Ok(ScoreOutcome::Skipped);
    };

    let target = match catalog.find_by_identifier(&film.identifier)? {
        Some(movie) => movie,
        None => {
            let Some(year) = film.year else {
                return Ok(ScoreOutcome::NotFound);
            };
            let mut candidates = catalog.find_fuzzy(&film.title, year)?;
            match candidates.len() {
                0 => return Ok(ScoreOutcome::NotFound),
                1 => candidates.remove(0),
                _ => {
                    let names: Vec<String> =
                        candidates.into_iter().map(|m| m.identifier).collect();
                    warn!(
                        "{} matches {} movies ({}), not updating",
                        film.identifier,
                        names.len(),
                        names.join(", ")
                    );
                    return Ok(ScoreOutcome::Ambiguous(names));
                }
            }
        }
    };

    catalog.set_chart_score(target.id, rating, film.votes)?;
    debug!(
        "{} -> {} ({} / {} votes)",
        film.identifier, target.identifier, rating, film.votes
    );
    Ok(ScoreOutcome::Updated {
        identifier: target.identifier,
    })
}

pub fn apply_chart_scores(catalog: &Catalog, films: &[ChartFilm]) -> ScoreReport {
    let mut report = ScoreReport::default();
    apply_into(catalog, films, &mut report);
    report
}

fn apply_into(catalog: &Catalog, films: &[ChartFilm], report: &mut ScoreReport) {
    for film in films {
        report.films_seen += 1;
        match apply_chart_score(catalog, film) {
            Ok(outcome) => report.record(film, outcome),
            Err(e) => {
                warn!("Storing chart score for {} failed: {}", film.identifier, e);
                report.failed += 1;
            }
        }
    }
}

/// Walk `pages` chart pages, applying scores as they arrive.
pub async fn update_scores_from_chart(
    catalog: &Catalog,
    source: &dyn ChartSource,
    pages: u32,
    delay: Duration,
) -> ScoreReport {
    let mut report = ScoreReport::default();
    for page in 1..=pages {
        if page > 1 {
            tokio::time::sleep(delay).await;
        }
        report.pages_requested += 1;
        match source.fetch_page(page).await {
            Ok(chart) if chart.is_empty() => {
                warn!("Chart page {} yielded no films; needs inspection", page);
                report.empty_pages.push(page);
            }
            Ok(chart) => apply_into(catalog, &chart.films, &mut report),
            Err(e) => {
                warn!("Chart page {} unavailable: {:#}", page, e);
                report.pages_failed += 1;
            }
        }
    }
    info!(
        "Chart scores: {} films, {} updated, {} not found, {} skipped, {} ambiguous, {} failed pages, {} empty pages",
        report.films_seen,
        report.updated,
        report.not_found,
        report.skipped,
        report.ambiguous.len(),
        report.pages_failed,
        report.empty_pages.len()
    );
    report
}
