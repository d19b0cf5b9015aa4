use std::collections::{BTreeMap, HashMap};

use crate::error::{AppError, AppResult};
use crate::models::{GenreCount, Movie, MovieId, Rating, UserId};

pub mod dataset;

pub use dataset::Dataset;

/// Immutable movie table, built once from the dataset
///
/// Owns every `Movie`; the rest of the system refers to movies by id.
#[derive(Debug)]
pub struct Catalog {
    movies: HashMap<MovieId, Movie>,
    /// Ascending ids for deterministic listings and scans
    ordered_ids: Vec<MovieId>,
}

impl Catalog {
    pub fn new(movies: Vec<Movie>) -> Self {
        let mut ordered_ids: Vec<MovieId> = movies.iter().map(|m| m.id).collect();
        ordered_ids.sort_unstable();

        let movies = movies.into_iter().map(|m| (m.id, m)).collect();

        Self {
            movies,
            ordered_ids,
        }
    }

    pub fn get(&self, id: MovieId) -> AppResult<&Movie> {
        self.movies
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("movie {}", id)))
    }

    pub fn contains(&self, id: MovieId) -> bool {
        self.movies.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    /// Movies in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = &Movie> {
        self.ordered_ids.iter().map(|id| &self.movies[id])
    }

    pub fn list(&self, limit: usize) -> Vec<Movie> {
        self.iter().take(limit).cloned().collect()
    }

    /// Case-insensitive substring title search
    pub fn search(&self, query: &str, limit: usize) -> Vec<Movie> {
        let needle = query.to_lowercase();
        self.iter()
            .filter(|m| m.title.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Sorted distinct genre tags observed in the catalog
    pub fn genres(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .iter()
            .flat_map(|m| m.genres.iter().cloned())
            .collect();
        tags.sort();
        tags.dedup();
        tags
    }

    /// Genre tags with occurrence counts, most frequent first
    pub fn genre_counts(&self, limit: usize) -> Vec<GenreCount> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for movie in self.iter() {
            for genre in &movie.genres {
                *counts.entry(genre).or_default() += 1;
            }
        }

        let mut counted: Vec<GenreCount> = counts
            .into_iter()
            .map(|(genre, count)| GenreCount {
                genre: genre.to_string(),
                count,
            })
            .collect();

        // Most frequent first, alphabetical within a count
        counted.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.genre.cmp(&b.genre)));
        counted.truncate(limit);
        counted
    }
}

/// Mutable ratings table, the source of truth for all rating state
///
/// Keyed by (user, movie); an upsert for an existing pair replaces the prior
/// rating (last-write-wins). Mutation happens only through the engine's
/// writer-exclusive ingestion path.
#[derive(Debug, Default)]
pub struct RatingsTable {
    by_user: HashMap<UserId, BTreeMap<MovieId, Rating>>,
    rating_count: usize,
}

impl RatingsTable {
    pub fn from_ratings(ratings: Vec<Rating>) -> Self {
        let mut table = Self::default();
        for rating in ratings {
            table.upsert(rating);
        }
        table
    }

    /// Inserts or replaces the rating for its (user, movie) pair.
    /// Returns the outcome so callers can decide how much cached state the
    /// write invalidates.
    pub fn upsert(&mut self, rating: Rating) -> UpsertOutcome {
        let new_user = !self.by_user.contains_key(&rating.user_id);
        let row = self.by_user.entry(rating.user_id).or_default();
        let replaced = row.insert(rating.movie_id, rating).is_some();

        if !replaced {
            self.rating_count += 1;
        }

        if new_user {
            UpsertOutcome::NewUser
        } else if replaced {
            UpsertOutcome::Replaced
        } else {
            UpsertOutcome::NewPair
        }
    }

    /// A user's ratings in ascending movie id order
    pub fn user_ratings(&self, user_id: UserId) -> Vec<Rating> {
        self.by_user
            .get(&user_id)
            .map(|row| row.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    pub fn rating_count(&self) -> usize {
        self.rating_count
    }

    /// All (user, movie, score) triples, for matrix derivation
    pub fn iter(&self) -> impl Iterator<Item = (UserId, MovieId, u8)> + '_ {
        self.by_user.iter().flat_map(|(user_id, row)| {
            row.values().map(|r| (*user_id, r.movie_id, r.score))
        })
    }
}

/// How an upsert changed the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First rating from a user the table had never seen
    NewUser,
    /// New (user, movie) pair for an existing user
    NewPair,
    /// Existing pair, score replaced
    Replaced,
}
