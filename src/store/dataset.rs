use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use chrono::DateTime;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::{Movie, MovieId, Rating};

/// Raw movies CSV row
///
/// `release_year` is optional; when absent the year is recovered from a
/// trailing `(YYYY)` in the title. Genres are `|`-separated tags.
#[derive(Debug, Deserialize)]
struct MovieRecord {
    id: MovieId,
    title: String,
    #[serde(default)]
    release_year: Option<i32>,
    #[serde(default)]
    genres: Option<String>,
}

/// Raw ratings CSV row, timestamp in unix seconds
#[derive(Debug, Deserialize)]
struct RatingRecord {
    user_id: u32,
    movie_id: MovieId,
    rating: u8,
    #[serde(default)]
    timestamp: Option<i64>,
}

/// The bulk tabular source loaded once at process start
///
/// A missing or corrupt file is a fatal startup condition, not a per-request
/// error.
#[derive(Debug)]
pub struct Dataset {
    pub movies: Vec<Movie>,
    pub ratings: Vec<Rating>,
}

impl Dataset {
    /// Loads movies and ratings from the configured CSV files
    pub fn load(movies_path: &str, ratings_path: &str) -> AppResult<Self> {
        let movies = read_movies(open(movies_path)?)
            .map_err(|e| AppError::Startup(format!("{}: {}", movies_path, e)))?;

        let known_ids: HashSet<MovieId> = movies.iter().map(|m| m.id).collect();
        if known_ids.len() != movies.len() {
            return Err(AppError::Startup(format!(
                "{}: duplicate movie ids",
                movies_path
            )));
        }

        let ratings = read_ratings(open(ratings_path)?, &known_ids)
            .map_err(|e| AppError::Startup(format!("{}: {}", ratings_path, e)))?;

        tracing::info!(
            movies = movies.len(),
            ratings = ratings.len(),
            "Dataset loaded"
        );

        Ok(Self { movies, ratings })
    }
}

fn open(path: &str) -> AppResult<std::fs::File> {
    std::fs::File::open(Path::new(path))
        .map_err(|e| AppError::Startup(format!("cannot open {}: {}", path, e)))
}

fn read_movies<R: Read>(reader: R) -> AppResult<Vec<Movie>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut movies = Vec::new();

    for row in csv_reader.deserialize() {
        let record: MovieRecord =
            row.map_err(|e| AppError::Startup(format!("bad movie row: {}", e)))?;

        let release_year = record.release_year.or_else(|| year_from_title(&record.title));
        let genres = record
            .genres
            .as_deref()
            .map(parse_genres)
            .unwrap_or_default();

        movies.push(Movie {
            id: record.id,
            title: record.title,
            release_year,
            genres,
        });
    }

    if movies.is_empty() {
        return Err(AppError::Startup("no movies in dataset".to_string()));
    }

    Ok(movies)
}

fn read_ratings<R: Read>(reader: R, known_ids: &HashSet<MovieId>) -> AppResult<Vec<Rating>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut ratings = Vec::new();

    for row in csv_reader.deserialize() {
        let record: RatingRecord =
            row.map_err(|e| AppError::Startup(format!("bad rating row: {}", e)))?;

        if !(1..=5).contains(&record.rating) {
            return Err(AppError::Startup(format!(
                "rating {} for movie {} outside the 1-5 scale",
                record.rating, record.movie_id
            )));
        }

        if !known_ids.contains(&record.movie_id) {
            return Err(AppError::Startup(format!(
                "rating references unknown movie {}",
                record.movie_id
            )));
        }

        let rated_at = record
            .timestamp
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or(DateTime::UNIX_EPOCH);

        ratings.push(Rating {
            user_id: record.user_id,
            movie_id: record.movie_id,
            score: record.rating,
            rated_at,
        });
    }

    Ok(ratings)
}

/// Splits a `|`-separated genre field, dropping the MovieLens placeholder
fn parse_genres(field: &str) -> Vec<String> {
    field
        .split('|')
        .map(str::trim)
        .filter(|g| !g.is_empty() && *g != "(no genres listed)")
        .map(str::to_string)
        .collect()
}

/// Recovers a release year from a title like "Heat (1995)"
fn year_from_title(title: &str) -> Option<i32> {
    let open = title.rfind('(')?;
    let close = title.rfind(')')?;
    if close <= open {
        return None;
    }
    title[open + 1..close].trim().parse().ok()
}
