use rusqlite::types::Value;

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 500;

/// Read filter over the catalog. Dimensions are AND-combined; the name lists
/// match a movie linked to ANY of the listed names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieFilter {
    pub title: Option<String>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    pub rating_from: Option<f64>,
    pub rating_to: Option<f64>,
    pub genres: Vec<String>,
    pub directors: Vec<String>,
    pub actors: Vec<String>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

/// WHERE clause (without the keyword) plus positional parameters.
#[derive(Debug)]
pub(crate) struct SqlFilter {
    pub clause: String,
    pub params: Vec<Value>,
}

impl MovieFilter {
    pub fn skip(&self) -> u32 {
        self.skip.unwrap_or(0)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)
    }

    pub(crate) fn to_sql(&self) -> SqlFilter {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(title) = self.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            conditions.push("fold(m.title) LIKE ? ESCAPE '\\'".to_string());
            params.push(Value::Text(format!("%{}%", escape_like(&fold_case(title)))));
        }
        if let Some(from) = self.year_from {
            conditions.push("m.year >= ?".to_string());
            params.push(Value::Integer(from.into()));
        }
        if let Some(to) = self.year_to {
            conditions.push("m.year <= ?".to_string());
            params.push(Value::Integer(to.into()));
        }
        if let Some(from) = self.rating_from {
            conditions.push("m.rating >= ?".to_string());
            params.push(Value::Real(from));
        }
        if let Some(to) = self.rating_to {
            conditions.push("m.rating <= ?".to_string());
            params.push(Value::Real(to));
        }

        let memberships = [
            ("movie_genres", "genres", "genre_id", &self.genres),
            ("movie_directors", "directors", "director_id", &self.directors),
            ("movie_actors", "actors", "actor_id", &self.actors),
        ];
        for (link, entity, column, names) in memberships {
            let names = clean_names(names);
            if names.is_empty() {
                continue;
            }
            let placeholders = vec!["?"; names.len()].join(", ");
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM {link} l JOIN {entity} e ON e.id = l.{column} \
                 WHERE l.movie_id = m.id AND fold(e.name) IN ({placeholders}))"
            ));
            params.extend(names.into_iter().map(Value::Text));
        }

        let clause = if conditions.is_empty() {
            "1 = 1".to_string()
        } else {
            conditions.join(" AND ")
        };
        SqlFilter { clause, params }
    }
}

fn clean_names(names: &[String]) -> Vec<String> {
    names
        .iter()
        .map(|n| fold_case(n.trim()))
        .filter(|n| !n.is_empty())
        .collect()
}

/// Unicode case fold shared by Rust-side inputs and the SQL `fold()` function.
pub(crate) fn fold_case(input: &str) -> String {
    input.to_lowercase()
}

pub(crate) fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
