//! SQLite-backed catalog of movies, genres and people.

mod filter;
mod schema;

pub use filter::{MovieFilter, DEFAULT_LIMIT, MAX_LIMIT};
pub use schema::{Migration, MIGRATIONS};

use crate::models::{
    CatalogStats, Genre, Movie, MovieDetail, MoviePatch, NewMovie, Person, PersonInput,
    PersonRole,
};
use chrono::{DateTime, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Params, Row};
use serde_json::Map;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("already exists: {0}")]
    Conflict(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl CatalogError {
    fn not_found(entity: &'static str, key: impl ToString) -> Self {
        CatalogError::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

const MOVIE_COLUMNS: &str = "m.id, m.identifier, m.tmdb_id, m.imdb_id, m.title, m.original_title, \
     m.year, m.release_date, m.runtime, m.language, m.rating, m.votes, m.rym_rating, m.rym_votes, \
     m.plot, m.tagline, m.poster_path, m.backdrop_path, m.metadata, m.created_at, m.updated_at";

/// The movie catalog. All writes of one logical operation run in a single transaction.
#[derive(Debug)]
pub struct Catalog {
    conn: Mutex<Connection>,
}

impl Catalog {
    /// Open (or create) the catalog at `path` and apply pending migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!("Opened catalog at {}", path.display());
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        register_fold(&conn)?;
        schema::apply_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// Movies
impl Catalog {
    /// Insert a movie with its genre and people links. Genre names that are not in
    /// the genre table are ignored; genres are never created here.
    pub fn create_movie(&self, new: &NewMovie) -> Result<MovieDetail> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(CatalogError::InvalidData(
                "movie title must not be empty".to_string(),
            ));
        }
        let identifier = new.identifier();

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        if select_movie(&tx, "m.identifier = ?1", params![identifier])?.is_some() {
            return Err(CatalogError::Conflict(identifier));
        }
        if let Some(tmdb_id) = new.tmdb_id {
            if select_movie(&tx, "m.tmdb_id = ?1", params![tmdb_id])?.is_some() {
                return Err(CatalogError::Conflict(format!("tmdb id {tmdb_id}")));
            }
        }

        let now = Utc::now().to_rfc3339();
        let metadata = serde_json::to_string(&new.metadata)?;
        tx.execute(
            "INSERT INTO movies (
                identifier, tmdb_id, imdb_id, title, original_title, year, release_date,
                runtime, language, rating, votes, rym_rating, rym_votes, plot, tagline,
                poster_path, backdrop_path, metadata, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?19)",
            params![
                identifier,
                new.tmdb_id,
                new.imdb_id,
                title,
                new.original_title,
                new.effective_year(),
                new.release_date,
                new.runtime,
                new.language,
                new.rating,
                new.votes,
                new.rym_rating,
                new.rym_votes,
                new.plot,
                new.tagline,
                new.poster_path,
                new.backdrop_path,
                metadata,
                now,
            ],
        )?;
        let movie_id = tx.last_insert_rowid();

        for name in &new.genres {
            match genre_by_name(&tx, name)? {
                Some(genre) => link_genre(&tx, movie_id, genre.id)?,
                None => debug!("Genre '{}' unknown, not linking {}", name, identifier),
            }
        }
        for person in &new.actors {
            link_new_person(&tx, PersonRole::Actor, movie_id, person)?;
        }
        for person in &new.directors {
            link_new_person(&tx, PersonRole::Director, movie_id, person)?;
        }

        let detail = detail_by_id(&tx, movie_id)?;
        tx.commit()?;
        debug!(
            identifier = %detail.movie.identifier,
            genres = detail.genres.len(),
            actors = detail.actors.len(),
            directors = detail.directors.len(),
            "Created movie"
        );
        Ok(detail)
    }

    pub fn get_movie(&self, identifier: &str) -> Result<MovieDetail> {
        let conn = self.lock();
        let movie = select_movie(&conn, "m.identifier = ?1", params![identifier])?
            .ok_or_else(|| CatalogError::not_found("movie", identifier))?;
        Ok(with_links(&conn, movie)?)
    }

    pub fn find_by_identifier(&self, identifier: &str) -> Result<Option<Movie>> {
        let conn = self.lock();
        Ok(select_movie(&conn, "m.identifier = ?1", params![identifier])?)
    }

    pub fn find_by_tmdb_id(&self, tmdb_id: i64) -> Result<Option<Movie>> {
        let conn = self.lock();
        Ok(select_movie(&conn, "m.tmdb_id = ?1", params![tmdb_id])?)
    }

    pub fn existing_tmdb_ids(&self) -> Result<HashSet<i64>> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT tmdb_id FROM movies WHERE tmdb_id IS NOT NULL")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<HashSet<i64>>>()?;
        Ok(ids)
    }

    /// Rows whose title contains `title` (case-insensitive) and whose year equals `year`.
    pub fn find_fuzzy(&self, title: &str, year: i32) -> Result<Vec<Movie>> {
        let pattern = format!("%{}%", filter::escape_like(&filter::fold_case(title.trim())));
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies m
             WHERE fold(m.title) LIKE ?1 ESCAPE '\\' AND m.year = ?2
             ORDER BY m.identifier"
        ))?;
        let movies = stmt
            .query_map(params![pattern, year], row_to_movie)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(movies)
    }

    pub fn list_movies(&self, filter: &MovieFilter) -> Result<Vec<MovieDetail>> {
        let sql = filter.to_sql();
        let query = format!(
            "SELECT {MOVIE_COLUMNS} FROM movies m WHERE {}
             ORDER BY m.rating IS NULL, m.rating DESC, m.identifier
             LIMIT ? OFFSET ?",
            sql.clause
        );
        let mut values = sql.params;
        values.push(Value::Integer(filter.limit().into()));
        values.push(Value::Integer(filter.skip().into()));

        let conn = self.lock();
        let movies = {
            let mut stmt = conn.prepare(&query)?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), row_to_movie)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        movies
            .into_iter()
            .map(|movie| with_links(&conn, movie).map_err(CatalogError::from))
            .collect()
    }

    /// Merge `patch` into the stored movie. Absent fields are left as they are.
    pub fn update_movie(&self, identifier: &str, patch: &MoviePatch) -> Result<MovieDetail> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let mut movie = select_movie(&tx, "m.identifier = ?1", params![identifier])?
            .ok_or_else(|| CatalogError::not_found("movie", identifier))?;

        patch.apply(&mut movie);
        if movie.title.trim().is_empty() {
            return Err(CatalogError::InvalidData(
                "movie title must not be empty".to_string(),
            ));
        }
        if movie.identifier != identifier
            && select_movie(&tx, "m.identifier = ?1", params![movie.identifier])?.is_some()
        {
            return Err(CatalogError::Conflict(movie.identifier));
        }
        if let Some(tmdb_id) = movie.tmdb_id {
            let clash = select_movie(
                &tx,
                "m.tmdb_id = ?1 AND m.id != ?2",
                params![tmdb_id, movie.id],
            )?;
            if clash.is_some() {
                return Err(CatalogError::Conflict(format!("tmdb id {tmdb_id}")));
            }
        }

        movie.updated_at = Utc::now();
        write_movie(&tx, &movie)?;
        let detail = detail_by_id(&tx, movie.id)?;
        tx.commit()?;
        if detail.movie.identifier != identifier {
            info!("Renamed movie {} -> {}", identifier, detail.movie.identifier);
        }
        Ok(detail)
    }

    /// Overwrite the chart rating/vote pair of a movie.
    pub fn set_chart_score(&self, movie_id: i64, rating: f64, votes: i64) -> Result<()> {
        let conn = self.lock();
        let changed = conn.execute(
            "UPDATE movies SET rym_rating = ?2, rym_votes = ?3, updated_at = ?4 WHERE id = ?1",
            params![movie_id, rating, votes, Utc::now().to_rfc3339()],
        )?;
        if changed == 0 {
            return Err(CatalogError::not_found("movie", movie_id));
        }
        Ok(())
    }

    /// Movies with a TMDb id that still lack a poster or a backdrop.
    pub fn movies_missing_images(&self) -> Result<Vec<Movie>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies m
             WHERE m.tmdb_id IS NOT NULL
               AND (m.poster_path IS NULL OR m.backdrop_path IS NULL)
             ORDER BY m.identifier"
        ))?;
        let movies = stmt
            .query_map([], row_to_movie)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(movies)
    }

    /// Fill image paths that are still empty; stored paths are never replaced.
    /// Returns whether the row changed.
    pub fn fill_images(
        &self,
        movie_id: i64,
        poster_path: Option<&str>,
        backdrop_path: Option<&str>,
    ) -> Result<bool> {
        let poster = poster_path.map(str::trim).filter(|p| !p.is_empty());
        let backdrop = backdrop_path.map(str::trim).filter(|p| !p.is_empty());
        let conn = self.lock();
        let changed = conn.execute(
            "UPDATE movies SET
                poster_path = COALESCE(poster_path, ?2),
                backdrop_path = COALESCE(backdrop_path, ?3),
                updated_at = ?4
             WHERE id = ?1
               AND ((poster_path IS NULL AND ?2 IS NOT NULL)
                 OR (backdrop_path IS NULL AND ?3 IS NOT NULL))",
            params![movie_id, poster, backdrop, Utc::now().to_rfc3339()],
        )?;
        Ok(changed > 0)
    }

    /// Delete a movie; its genre and people links go with it.
    pub fn delete_movie(&self, identifier: &str) -> Result<()> {
        let conn = self.lock();
        let deleted = conn.execute(
            "DELETE FROM movies WHERE identifier = ?1",
            params![identifier],
        )?;
        if deleted == 0 {
            return Err(CatalogError::not_found("movie", identifier));
        }
        info!("Deleted movie {}", identifier);
        Ok(())
    }

    /// Remove every movie, person, genre and link. Returns what was removed.
    pub fn clear(&self) -> Result<CatalogStats> {
        let mut conn = self.lock();
        let removed = stats(&conn)?;
        let tx = conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM movie_genres;
             DELETE FROM movie_actors;
             DELETE FROM movie_directors;
             DELETE FROM movies;
             DELETE FROM actors;
             DELETE FROM directors;
             DELETE FROM genres;",
        )?;
        tx.commit()?;
        warn!(
            "Catalog cleared: {} movies, {} genres, {} actors, {} directors removed",
            removed.movies, removed.genres, removed.actors, removed.directors
        );
        Ok(removed)
    }

    pub fn counts(&self) -> Result<CatalogStats> {
        let conn = self.lock();
        Ok(stats(&conn)?)
    }
}

// Genres
impl Catalog {
    pub fn list_genres(&self) -> Result<Vec<Genre>> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT id, name FROM genres ORDER BY name")?;
        let genres = stmt
            .query_map([], row_to_genre)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(genres)
    }

    pub fn get_genre(&self, id: i64) -> Result<Genre> {
        let conn = self.lock();
        conn.query_row(
            "SELECT id, name FROM genres WHERE id = ?1",
            params![id],
            row_to_genre,
        )
        .optional()?
        .ok_or_else(|| CatalogError::not_found("genre", id))
    }

    pub fn get_genre_by_name(&self, name: &str) -> Result<Option<Genre>> {
        let conn = self.lock();
        Ok(genre_by_name(&conn, name)?)
    }

    /// Idempotent: returns the existing genre when the name is already known.
    pub fn create_genre(&self, name: &str) -> Result<Genre> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::InvalidData(
                "genre name must not be empty".to_string(),
            ));
        }
        let conn = self.lock();
        conn.execute(
            "INSERT OR IGNORE INTO genres (name) VALUES (?1)",
            params![name],
        )?;
        genre_by_name(&conn, name)?.ok_or_else(|| CatalogError::not_found("genre", name))
    }

    /// Insert the names that are missing. Returns how many were added.
    pub fn ensure_genres<I, S>(&self, names: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let mut added = 0;
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            added += tx.execute(
                "INSERT OR IGNORE INTO genres (name) VALUES (?1)",
                params![name],
            )?;
        }
        tx.commit()?;
        Ok(added)
    }
}

// Links
impl Catalog {
    pub fn attach_genre(&self, identifier: &str, genre_id: i64) -> Result<MovieDetail> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let movie = require_movie(&tx, identifier)?;
        let exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM genres WHERE id = ?1",
                params![genre_id],
                |r| r.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(CatalogError::not_found("genre", genre_id));
        }
        link_genre(&tx, movie.id, genre_id)?;
        let detail = detail_by_id(&tx, movie.id)?;
        tx.commit()?;
        Ok(detail)
    }

    pub fn detach_genre(&self, identifier: &str, genre_id: i64) -> Result<MovieDetail> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let movie = require_movie(&tx, identifier)?;
        tx.execute(
            "DELETE FROM movie_genres WHERE movie_id = ?1 AND genre_id = ?2",
            params![movie.id, genre_id],
        )?;
        let detail = detail_by_id(&tx, movie.id)?;
        tx.commit()?;
        Ok(detail)
    }

    pub fn attach_person(
        &self,
        identifier: &str,
        role: PersonRole,
        person: &PersonInput,
    ) -> Result<MovieDetail> {
        if person.name.trim().is_empty() {
            return Err(CatalogError::InvalidData(format!(
                "{} name must not be empty",
                role.label()
            )));
        }
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let movie = require_movie(&tx, identifier)?;
        link_new_person(&tx, role, movie.id, person)?;
        let detail = detail_by_id(&tx, movie.id)?;
        tx.commit()?;
        Ok(detail)
    }

    pub fn detach_person(
        &self,
        identifier: &str,
        role: PersonRole,
        person_id: i64,
    ) -> Result<MovieDetail> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let movie = require_movie(&tx, identifier)?;
        tx.execute(
            &format!(
                "DELETE FROM {} WHERE movie_id = ?1 AND {} = ?2",
                role.link_table(),
                role.link_column()
            ),
            params![movie.id, person_id],
        )?;
        let detail = detail_by_id(&tx, movie.id)?;
        tx.commit()?;
        Ok(detail)
    }
}

/// SQLite's `lower()` only folds ASCII; `fold()` applies the same Unicode
/// lowercasing the filters apply to their inputs.
fn register_fold(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "fold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| filter::fold_case(&t)))
        },
    )
}

fn select_movie<P: Params>(
    conn: &Connection,
    clause: &str,
    params: P,
) -> rusqlite::Result<Option<Movie>> {
    conn.query_row(
        &format!("SELECT {MOVIE_COLUMNS} FROM movies m WHERE {clause}"),
        params,
        row_to_movie,
    )
    .optional()
}

fn require_movie(conn: &Connection, identifier: &str) -> Result<Movie> {
    select_movie(conn, "m.identifier = ?1", params![identifier])?
        .ok_or_else(|| CatalogError::not_found("movie", identifier))
}

fn detail_by_id(conn: &Connection, movie_id: i64) -> Result<MovieDetail> {
    let movie = select_movie(conn, "m.id = ?1", params![movie_id])?
        .ok_or_else(|| CatalogError::not_found("movie", movie_id))?;
    Ok(with_links(conn, movie)?)
}

fn with_links(conn: &Connection, movie: Movie) -> rusqlite::Result<MovieDetail> {
    let genres = genres_for(conn, movie.id)?;
    let actors = persons_for(conn, PersonRole::Actor, movie.id)?;
    let directors = persons_for(conn, PersonRole::Director, movie.id)?;
    Ok(MovieDetail {
        movie,
        genres,
        actors,
        directors,
    })
}

fn write_movie(conn: &Connection, movie: &Movie) -> Result<()> {
    let metadata = serde_json::to_string(&movie.metadata)?;
    conn.execute(
        "UPDATE movies SET
            identifier = ?2, tmdb_id = ?3, imdb_id = ?4, title = ?5, original_title = ?6,
            year = ?7, release_date = ?8, runtime = ?9, language = ?10, rating = ?11,
            votes = ?12, rym_rating = ?13, rym_votes = ?14, plot = ?15, tagline = ?16,
            poster_path = ?17, backdrop_path = ?18, metadata = ?19, updated_at = ?20
         WHERE id = ?1",
        params![
            movie.id,
            movie.identifier,
            movie.tmdb_id,
            movie.imdb_id,
            movie.title.trim(),
            movie.original_title,
            movie.year,
            movie.release_date,
            movie.runtime,
            movie.language,
            movie.rating,
            movie.votes,
            movie.rym_rating,
            movie.rym_votes,
            movie.plot,
            movie.tagline,
            movie.poster_path,
            movie.backdrop_path,
            metadata,
            movie.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn genre_by_name(conn: &Connection, name: &str) -> rusqlite::Result<Option<Genre>> {
    conn.query_row(
        "SELECT id, name FROM genres WHERE name = ?1",
        params![name.trim()],
        row_to_genre,
    )
    .optional()
}

fn link_genre(conn: &Connection, movie_id: i64, genre_id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO movie_genres (movie_id, genre_id) VALUES (?1, ?2)",
        params![movie_id, genre_id],
    )?;
    Ok(())
}

fn genres_for(conn: &Connection, movie_id: i64) -> rusqlite::Result<Vec<Genre>> {
    let mut stmt = conn.prepare(
        "SELECT g.id, g.name FROM genres g
         JOIN movie_genres mg ON mg.genre_id = g.id
         WHERE mg.movie_id = ?1
         ORDER BY g.name",
    )?;
    let genres = stmt
        .query_map(params![movie_id], row_to_genre)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(genres)
}

/// Upsert by name, backfilling external ids that are still empty, then link.
fn link_new_person(
    conn: &Connection,
    role: PersonRole,
    movie_id: i64,
    person: &PersonInput,
) -> rusqlite::Result<()> {
    let name = person.name.trim();
    if name.is_empty() {
        return Ok(());
    }
    let table = role.table();
    conn.execute(
        &format!(
            "INSERT INTO {table} (name, tmdb_id, imdb_id, profile_path, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(name) DO UPDATE SET
                tmdb_id = COALESCE({table}.tmdb_id, excluded.tmdb_id),
                imdb_id = COALESCE({table}.imdb_id, excluded.imdb_id),
                profile_path = COALESCE({table}.profile_path, excluded.profile_path),
                updated_at = excluded.updated_at"
        ),
        params![
            name,
            person.tmdb_id,
            person.imdb_id,
            person.profile_path,
            Utc::now().to_rfc3339(),
        ],
    )?;
    let person_id: i64 = conn.query_row(
        &format!("SELECT id FROM {table} WHERE name = ?1"),
        params![name],
        |r| r.get(0),
    )?;
    conn.execute(
        &format!(
            "INSERT OR IGNORE INTO {} (movie_id, {}) VALUES (?1, ?2)",
            role.link_table(),
            role.link_column()
        ),
        params![movie_id, person_id],
    )?;
    Ok(())
}

fn persons_for(conn: &Connection, role: PersonRole, movie_id: i64) -> rusqlite::Result<Vec<Person>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT p.id, p.name, p.tmdb_id, p.imdb_id, p.profile_path FROM {} p
         JOIN {} l ON l.{} = p.id
         WHERE l.movie_id = ?1
         ORDER BY l.rowid",
        role.table(),
        role.link_table(),
        role.link_column()
    ))?;
    let people = stmt
        .query_map(params![movie_id], |row| {
            Ok(Person {
                id: row.get(0)?,
                name: row.get(1)?,
                tmdb_id: row.get(2)?,
                imdb_id: row.get(3)?,
                profile_path: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(people)
}

fn stats(conn: &Connection) -> rusqlite::Result<CatalogStats> {
    let count = |table: &str| -> rusqlite::Result<i64> {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
    };
    Ok(CatalogStats {
        movies: count("movies")?,
        genres: count("genres")?,
        actors: count("actors")?,
        directors: count("directors")?,
    })
}

fn row_to_genre(row: &Row) -> rusqlite::Result<Genre> {
    Ok(Genre {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn row_to_movie(row: &Row) -> rusqlite::Result<Movie> {
    let metadata_raw: String = row.get(18)?;
    let metadata: Map<String, serde_json::Value> = serde_json::from_str(&metadata_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(18, Type::Text, Box::new(e)))?;
    Ok(Movie {
        id: row.get(0)?,
        identifier: row.get(1)?,
        tmdb_id: row.get(2)?,
        imdb_id: row.get(3)?,
        title: row.get(4)?,
        original_title: row.get(5)?,
        year: row.get(6)?,
        release_date: row.get(7)?,
        runtime: row.get(8)?,
        language: row.get(9)?,
        rating: row.get(10)?,
        votes: row.get(11)?,
        rym_rating: row.get(12)?,
        rym_votes: row.get(13)?,
        plot: row.get(14)?,
        tagline: row.get(15)?,
        poster_path: row.get(16)?,
        backdrop_path: row.get(17)?,
        metadata,
        created_at: timestamp(row, 19)?,
        updated_at: timestamp(row, 20)?,
    })
}

fn timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
