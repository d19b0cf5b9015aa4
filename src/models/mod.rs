use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable catalog identifier for a movie, fixed by the dataset
pub type MovieId = u32;

/// Identifier for a rating user
pub type UserId = u32;

/// A movie from the catalog
///
/// Immutable after the dataset load; everything downstream of the catalog
/// store refers to movies by id only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub release_year: Option<i32>,
    /// Genre tags drawn from the catalog-wide vocabulary (~19 tags)
    pub genres: Vec<String>,
}

/// A single user-submitted rating
///
/// Keyed by (user, movie); a later rating for the same pair replaces the
/// earlier one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// Integer score on the 1-5 scale
    pub score: u8,
    pub rated_at: DateTime<Utc>,
}

/// Which engine produced a recommendation score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Content,
    Collaborative,
    Hybrid,
}

/// A scored movie returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub movie: Movie,
    pub score: f64,
    pub algorithm: Algorithm,
}

/// Catalog-wide aggregate counters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stats {
    pub movie_count: usize,
    pub user_count: usize,
    pub rating_count: usize,
    pub popular_genres: Vec<GenreCount>,
}

/// Occurrence count for one genre tag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenreCount {
    pub genre: String,
    pub count: usize,
}

/// Enrichment fields fetched from the metadata collaborator
///
/// All fields are best-effort: a provider failure yields `None`s, never an
/// error on the surrounding call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MovieMetadata {
    pub poster_url: Option<String>,
    pub overview: Option<String>,
    pub vote_average: Option<f64>,
}

/// A catalog movie joined with whatever metadata could be fetched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDetails {
    #[serde(flatten)]
    pub movie: Movie,
    pub metadata: MovieMetadata,
}
