use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Derived catalog key: `"{title} ({year})"`, or the bare title when the year is unknown.
pub fn canonical_identifier(title: &str, year: Option<i32>) -> String {
    let title = title.trim();
    match year {
        Some(year) => format!("{title} ({year})"),
        None => title.to_string(),
    }
}

/// Year prefix of an ISO `YYYY-MM-DD` date. Empty or malformed dates yield `None`.
pub fn year_from_date(date: &str) -> Option<i32> {
    let prefix = date.trim().get(..4)?;
    if !prefix.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    prefix.parse().ok().filter(|y| *y > 0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movie {
    pub id: i64,
    pub identifier: String,
    pub tmdb_id: Option<i64>,
    pub imdb_id: Option<String>,
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<i32>,
    pub release_date: Option<String>,
    pub runtime: Option<i32>,
    pub language: Option<String>,
    pub rating: Option<f64>,
    pub votes: Option<i64>,
    pub rym_rating: Option<f64>,
    pub rym_votes: Option<i64>,
    pub plot: Option<String>,
    pub tagline: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub tmdb_id: Option<i64>,
    pub imdb_id: Option<String>,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonRole {
    Actor,
    Director,
}

impl PersonRole {
    pub(crate) fn table(self) -> &'static str {
        match self {
            PersonRole::Actor => "actors",
            PersonRole::Director => "directors",
        }
    }

    pub(crate) fn link_table(self) -> &'static str {
        match self {
            PersonRole::Actor => "movie_actors",
            PersonRole::Director => "movie_directors",
        }
    }

    pub(crate) fn link_column(self) -> &'static str {
        match self {
            PersonRole::Actor => "actor_id",
            PersonRole::Director => "director_id",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PersonRole::Actor => "actor",
            PersonRole::Director => "director",
        }
    }
}

/// A person reference as supplied by an importer or an API caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonInput {
    pub name: String,
    #[serde(default)]
    pub tmdb_id: Option<i64>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

impl PersonInput {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A movie row together with its associations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieDetail {
    #[serde(flatten)]
    pub movie: Movie,
    pub genres: Vec<Genre>,
    pub actors: Vec<Person>,
    pub directors: Vec<Person>,
}

impl MovieDetail {
    pub fn genre_names(&self) -> Vec<&str> {
        self.genres.iter().map(|g| g.name.as_str()).collect()
    }
}

/// Payload for creating a movie. Genre entries are names resolved against the genre table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewMovie {
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<i32>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub tmdb_id: Option<i64>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub votes: Option<i64>,
    #[serde(default)]
    pub rym_rating: Option<f64>,
    #[serde(default)]
    pub rym_votes: Option<i64>,
    #[serde(default)]
    pub plot: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub actors: Vec<PersonInput>,
    #[serde(default)]
    pub directors: Vec<PersonInput>,
}

impl NewMovie {
    /// Year used for the identifier: explicit year first, then the release date.
    pub fn effective_year(&self) -> Option<i32> {
        self.year
            .or_else(|| self.release_date.as_deref().and_then(year_from_date))
    }

    pub fn identifier(&self) -> String {
        canonical_identifier(&self.title, self.effective_year())
    }
}

/// Partial update. Absent (or `null`) fields leave the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoviePatch {
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub year: Option<i32>,
    pub release_date: Option<String>,
    pub runtime: Option<i32>,
    pub language: Option<String>,
    pub tmdb_id: Option<i64>,
    pub imdb_id: Option<String>,
    pub rating: Option<f64>,
    pub votes: Option<i64>,
    pub rym_rating: Option<f64>,
    pub rym_votes: Option<i64>,
    pub plot: Option<String>,
    pub tagline: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

fn merge<T: Clone>(slot: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *slot = v.clone();
    }
}

fn merge_opt<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
    if let Some(v) = value {
        *slot = Some(v.clone());
    }
}

impl MoviePatch {
    /// Merge the provided fields into `movie` and recompute its identifier.
    /// Metadata keys are merged shallowly.
    pub fn apply(&self, movie: &mut Movie) {
        merge(&mut movie.title, &self.title);
        merge_opt(&mut movie.original_title, &self.original_title);
        merge_opt(&mut movie.year, &self.year);
        merge_opt(&mut movie.release_date, &self.release_date);
        merge_opt(&mut movie.runtime, &self.runtime);
        merge_opt(&mut movie.language, &self.language);
        merge_opt(&mut movie.tmdb_id, &self.tmdb_id);
        merge_opt(&mut movie.imdb_id, &self.imdb_id);
        merge_opt(&mut movie.rating, &self.rating);
        merge_opt(&mut movie.votes, &self.votes);
        merge_opt(&mut movie.rym_rating, &self.rym_rating);
        merge_opt(&mut movie.rym_votes, &self.rym_votes);
        merge_opt(&mut movie.plot, &self.plot);
        merge_opt(&mut movie.tagline, &self.tagline);
        merge_opt(&mut movie.poster_path, &self.poster_path);
        merge_opt(&mut movie.backdrop_path, &self.backdrop_path);
        if let Some(extra) = &self.metadata {
            for (key, value) in extra {
                movie.metadata.insert(key.clone(), value.clone());
            }
        }
        if movie.year.is_none() {
            movie.year = movie.release_date.as_deref().and_then(year_from_date);
        }
        movie.identifier = canonical_identifier(&movie.title, movie.year);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub movies: i64,
    pub genres: i64,
    pub actors: i64,
    pub directors: i64,
}
