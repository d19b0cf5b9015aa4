use std::collections::HashMap;

use crate::error::{AppError, AppResult};
use crate::models::MovieId;
use crate::store::Catalog;

/// Widest vocabulary a `GenreVector` bitmask can hold
pub const MAX_VOCABULARY: usize = 32;

/// Fixed-width binary genre vector
///
/// One bit per vocabulary tag; bit i is set when the movie carries the i-th
/// tag of the index vocabulary. Width always equals the vocabulary size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenreVector {
    bits: u32,
}

impl GenreVector {
    pub fn is_zero(self) -> bool {
        self.bits == 0
    }

    /// Cosine similarity between two binary vectors: |A∩B| / sqrt(|A|·|B|).
    /// Similarity against a zero vector is 0, never NaN.
    pub fn cosine(self, other: GenreVector) -> f64 {
        let overlap = (self.bits & other.bits).count_ones() as f64;
        let norm_self = self.bits.count_ones() as f64;
        let norm_other = other.bits.count_ones() as f64;

        if norm_self == 0.0 || norm_other == 0.0 {
            0.0
        } else {
            overlap / (norm_self * norm_other).sqrt()
        }
    }
}

/// Per-movie genre vectors over the catalog-wide vocabulary
///
/// Built in one pass at startup; the catalog is static afterwards, so the
/// index lives for the process lifetime without a rebuild path.
#[derive(Debug)]
pub struct GenreIndex {
    vocabulary: Vec<String>,
    vectors: HashMap<MovieId, GenreVector>,
}

impl GenreIndex {
    pub fn build(catalog: &Catalog) -> AppResult<Self> {
        let vocabulary = catalog.genres();
        if vocabulary.len() > MAX_VOCABULARY {
            return Err(AppError::Startup(format!(
                "genre vocabulary has {} tags, more than the supported {}",
                vocabulary.len(),
                MAX_VOCABULARY
            )));
        }

        let positions: HashMap<&str, u32> = vocabulary
            .iter()
            .enumerate()
            .map(|(i, tag)| (tag.as_str(), i as u32))
            .collect();

        let mut vectors = HashMap::with_capacity(catalog.len());
        for movie in catalog.iter() {
            let mut bits = 0u32;
            for genre in &movie.genres {
                if let Some(pos) = positions.get(genre.as_str()) {
                    bits |= 1 << pos;
                }
            }
            vectors.insert(movie.id, GenreVector { bits });
        }

        tracing::debug!(
            movies = vectors.len(),
            vocabulary = vocabulary.len(),
            "Genre index built"
        );

        Ok(Self {
            vocabulary,
            vectors,
        })
    }

    pub fn vector_for(&self, movie_id: MovieId) -> AppResult<GenreVector> {
        self.vectors
            .get(&movie_id)
            .copied()
            .ok_or_else(|| AppError::NotFound(format!("movie {}", movie_id)))
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// All (movie, vector) pairs, unordered
    pub fn iter(&self) -> impl Iterator<Item = (MovieId, GenreVector)> + '_ {
        self.vectors.iter().map(|(id, v)| (*id, *v))
    }
}
