use std::sync::Arc;

use crate::error::AppResult;
use crate::models::MovieId;

use super::genre_index::GenreIndex;
use super::rank_descending;

/// Movie-to-movie nearest-neighbor lookup
///
/// The linear scan below is plenty at catalog scale; an approximate index can
/// be dropped in behind this trait without touching callers.
pub trait NeighborIndex: Send + Sync {
    /// Top-k movies most similar to the query, excluding the query itself,
    /// descending by score with ascending-id tie-break.
    fn similar_movies(&self, movie_id: MovieId, k: usize) -> AppResult<Vec<(MovieId, f64)>>;
}

/// Exact content similarity over genre vectors
pub struct ContentEngine {
    index: Arc<GenreIndex>,
}

impl ContentEngine {
    pub fn new(index: Arc<GenreIndex>) -> Self {
        Self { index }
    }
}

impl NeighborIndex for ContentEngine {
    fn similar_movies(&self, movie_id: MovieId, k: usize) -> AppResult<Vec<(MovieId, f64)>> {
        let query = self.index.vector_for(movie_id)?;

        // A zero-overlap candidate is noise, not a recommendation; dropping
        // it also means a zero-genre query yields an empty result rather
        // than an arbitrary slice of the catalog.
        let mut scored: Vec<(MovieId, f64)> = self
            .index
            .iter()
            .filter(|(id, _)| *id != movie_id)
            .map(|(id, vector)| (id, query.cosine(vector)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        rank_descending(&mut scored);
        scored.truncate(k);
        Ok(scored)
    }
}
