use std::cmp::Ordering;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{
    Algorithm, Movie, MovieId, Rating, Recommendation, Stats, UserId,
};
use crate::store::{Catalog, Dataset, RatingsTable};

pub mod cache;
pub mod collaborative;
pub mod content;
pub mod genre_index;
pub mod hybrid;

use cache::{Ranked, RecKey, RecommendationCache};
use collaborative::{CollaborativeEngine, UserItemMatrix};
use content::{ContentEngine, NeighborIndex};
use genre_index::GenreIndex;

/// Engine tuning knobs, fixed at construction
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Neighbor pool size for collaborative aggregation, independent of the
    /// requested recommendation count
    pub neighbor_k: usize,
    /// Ratings a user needs before collaborative queries apply
    pub min_ratings: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            neighbor_k: 10,
            min_ratings: 1,
        }
    }
}

impl From<&Config> for EngineConfig {
    fn from(config: &Config) -> Self {
        Self {
            neighbor_k: config.neighbor_k,
            min_ratings: config.min_ratings,
        }
    }
}

/// Mutable rating state: the source-of-truth table and the matrix derived
/// from it, guarded together so ingestion is a single writer-exclusive step.
struct CollabState {
    table: RatingsTable,
    matrix: UserItemMatrix,
}

/// The recommendation engine facade
///
/// Catalog and genre index are immutable after construction and read without
/// locking. The only mutation path is `add_rating`: upsert the table, patch
/// the matrix, bump its generation, prune the cache — all under one writer
/// lock.
pub struct RecommendationEngine {
    catalog: Arc<Catalog>,
    content: ContentEngine,
    genre_index: Arc<GenreIndex>,
    collab: RwLock<CollabState>,
    cache: RecommendationCache,
    config: EngineConfig,
}

impl RecommendationEngine {
    pub fn new(dataset: Dataset, config: EngineConfig) -> AppResult<Self> {
        let catalog = Arc::new(Catalog::new(dataset.movies));
        let genre_index = Arc::new(GenreIndex::build(&catalog)?);
        let table = RatingsTable::from_ratings(dataset.ratings);
        let matrix = UserItemMatrix::build(&table);

        Ok(Self {
            content: ContentEngine::new(genre_index.clone()),
            genre_index,
            catalog,
            collab: RwLock::new(CollabState { table, matrix }),
            cache: RecommendationCache::new(),
            config,
        })
    }

    pub fn get_movie(&self, movie_id: MovieId) -> AppResult<Movie> {
        self.catalog.get(movie_id).cloned()
    }

    pub fn search_movies(&self, query: &str, limit: i64) -> AppResult<Vec<Movie>> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidRequest(
                "search query cannot be empty".to_string(),
            ));
        }
        let limit = validate_count("limit", limit)?;
        Ok(self.catalog.search(query, limit))
    }

    pub fn list_movies(&self, limit: i64) -> AppResult<Vec<Movie>> {
        let limit = validate_count("limit", limit)?;
        Ok(self.catalog.list(limit))
    }

    pub fn list_genres(&self) -> Vec<String> {
        self.genre_index.vocabulary().to_vec()
    }

    /// Ingests one rating: last-write-wins on the (user, movie) pair. The
    /// write lock covers table upsert, matrix patch, and generation bump;
    /// stale cache entries are pruned before the method returns.
    pub async fn add_rating(
        &self,
        user_id: UserId,
        movie_id: MovieId,
        score: u8,
    ) -> AppResult<Rating> {
        if !(1..=5).contains(&score) {
            return Err(AppError::InvalidRequest(format!(
                "score {} outside the 1-5 scale",
                score
            )));
        }
        self.catalog.get(movie_id)?;

        let rating = Rating {
            user_id,
            movie_id,
            score,
            rated_at: Utc::now(),
        };

        let generation = {
            let mut state = self.collab.write().await;
            let outcome = state.table.upsert(rating.clone());
            state.matrix.set(user_id, movie_id, score);
            tracing::info!(
                user_id,
                movie_id,
                score,
                outcome = ?outcome,
                generation = state.matrix.generation(),
                "Rating ingested"
            );
            state.matrix.generation()
        };

        self.cache.retain_generation(generation).await;
        Ok(rating)
    }

    /// A user's ratings in ascending movie id order; empty for unknown users
    pub async fn user_ratings(&self, user_id: UserId) -> Vec<Rating> {
        self.collab.read().await.table.user_ratings(user_id)
    }

    /// "Movies like this one", from genre overlap alone
    pub async fn content_recommend(
        &self,
        movie_id: MovieId,
        k: i64,
    ) -> AppResult<Vec<Recommendation>> {
        let k = validate_count("k", k)?;
        let ranked = self.content_ranked(movie_id, k).await?;
        Ok(self.hydrate(&ranked, Algorithm::Content))
    }

    /// Top-k most similar users, by co-rated cosine similarity
    pub async fn neighbors_of(&self, user_id: UserId, k: i64) -> AppResult<Vec<(UserId, f64)>> {
        let k = validate_count("k", k)?;
        let state = self.collab.read().await;
        CollaborativeEngine::neighbors_of(&state.matrix, user_id, k, self.config.min_ratings)
    }

    /// "Movies liked by users like this one"
    pub async fn collaborative_recommend(
        &self,
        user_id: UserId,
        k: i64,
    ) -> AppResult<Vec<Recommendation>> {
        let k = validate_count("k", k)?;
        let state = self.collab.read().await;
        let ranked = self.collaborative_ranked(user_id, k, &state).await?;
        Ok(self.hydrate(&ranked, Algorithm::Collaborative))
    }

    /// Blended recommendation from up to two seeds
    ///
    /// One seed degrades to that engine's ranking verbatim. A degenerate
    /// weight (exactly 0 or 1) skips the unweighted engine entirely, so the
    /// ranking is identical to the corresponding pure engine.
    pub async fn hybrid_recommend(
        &self,
        movie_id: Option<MovieId>,
        user_id: Option<UserId>,
        k: i64,
        weight_content: f64,
    ) -> AppResult<Vec<Recommendation>> {
        let k = validate_count("k", k)?;
        if !(0.0..=1.0).contains(&weight_content) {
            return Err(AppError::InvalidRequest(format!(
                "weight {} outside [0, 1]",
                weight_content
            )));
        }

        let ranked = match (movie_id, user_id) {
            (None, None) => {
                return Err(AppError::InvalidRequest(
                    "at least one of movie_id or user_id is required".to_string(),
                ))
            }
            (Some(movie_id), None) => self.content_ranked(movie_id, k).await?,
            (None, Some(user_id)) => {
                let state = self.collab.read().await;
                self.collaborative_ranked(user_id, k, &state).await?
            }
            (Some(movie_id), Some(user_id)) => {
                if weight_content == 1.0 {
                    self.content_ranked(movie_id, k).await?
                } else if weight_content == 0.0 {
                    let state = self.collab.read().await;
                    self.collaborative_ranked(user_id, k, &state).await?
                } else {
                    let state = self.collab.read().await;
                    let key = RecKey::Hybrid {
                        movie_id: Some(movie_id),
                        user_id: Some(user_id),
                        k,
                        weight_bits: weight_content.to_bits(),
                        generation: state.matrix.generation(),
                    };
                    self.cache
                        .get_or_compute(key, || async {
                            let content = self.content_ranked(movie_id, k).await?;
                            let collaborative =
                                self.collaborative_ranked(user_id, k, &state).await?;
                            Ok(hybrid::blend(&content, &collaborative, weight_content, k))
                        })
                        .await?
                }
            }
        };

        Ok(self.hydrate(&ranked, Algorithm::Hybrid))
    }

    pub async fn stats(&self) -> Stats {
        let state = self.collab.read().await;
        Stats {
            movie_count: self.catalog.len(),
            user_count: state.table.user_count(),
            rating_count: state.table.rating_count(),
            popular_genres: self.catalog.genre_counts(10),
        }
    }

    async fn content_ranked(&self, movie_id: MovieId, k: usize) -> AppResult<Arc<Ranked>> {
        let key = RecKey::Content { movie_id, k };
        self.cache
            .get_or_compute(key, || async { self.content.similar_movies(movie_id, k) })
            .await
    }

    async fn collaborative_ranked(
        &self,
        user_id: UserId,
        k: usize,
        state: &CollabState,
    ) -> AppResult<Arc<Ranked>> {
        let key = RecKey::Collaborative {
            user_id,
            k,
            generation: state.matrix.generation(),
        };
        self.cache
            .get_or_compute(key, || async {
                CollaborativeEngine::recommend_for(
                    &state.matrix,
                    user_id,
                    k,
                    self.config.neighbor_k,
                    self.config.min_ratings,
                )
            })
            .await
    }

    /// Joins a ranked id list back to full catalog movies
    fn hydrate(&self, ranked: &Ranked, algorithm: Algorithm) -> Vec<Recommendation> {
        ranked
            .iter()
            .filter_map(|(movie_id, score)| {
                self.catalog.get(*movie_id).ok().map(|movie| Recommendation {
                    movie: movie.clone(),
                    score: *score,
                    algorithm,
                })
            })
            .collect()
    }
}

/// Sorts a scored id list descending by score, ascending id on ties
pub(crate) fn rank_descending(items: &mut Vec<(u32, f64)>) {
    items.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
}

fn validate_count(name: &str, value: i64) -> AppResult<usize> {
    if value <= 0 {
        return Err(AppError::InvalidRequest(format!(
            "{} must be positive, got {}",
            name, value
        )));
    }
    Ok(value as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Movie;

    fn movie(id: MovieId, title: &str, genres: &[&str]) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            release_year: Some(1995),
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    fn rating(user_id: UserId, movie_id: MovieId, score: u8) -> Rating {
        Rating {
            user_id,
            movie_id,
            score,
            rated_at: Utc::now(),
        }
    }

    /// The Toy Story / Jumanji / Balto catalog with a small rating history
    fn engine() -> RecommendationEngine {
        let dataset = Dataset {
            movies: vec![
                movie(1, "Toy Story", &["Animation", "Comedy"]),
                movie(2, "Jumanji", &["Adventure", "Fantasy"]),
                movie(3, "Balto", &["Animation", "Adventure"]),
                movie(4, "Heat", &["Action", "Crime"]),
            ],
            ratings: vec![
                rating(1, 1, 5),
                rating(1, 2, 4),
                rating(2, 1, 5),
                rating(2, 2, 5),
                rating(2, 3, 4),
                rating(3, 1, 1),
            ],
        };
        RecommendationEngine::new(dataset, EngineConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_similar_movies_ranks_shared_genres_first() {
        let engine = engine();
        let recs = engine.content_recommend(1, 2).await.unwrap();

        // Balto shares a genre with Toy Story, Jumanji shares none
        assert_eq!(recs[0].movie.id, 3);
        assert!(recs.iter().all(|r| r.movie.id != 2));
        assert!(recs.iter().all(|r| r.algorithm == Algorithm::Content));
    }

    #[tokio::test]
    async fn test_content_recommend_unknown_movie() {
        let err = engine().content_recommend(99, 5).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_nonpositive_k_is_invalid() {
        let engine = engine();
        assert!(matches!(
            engine.content_recommend(1, 0).await.unwrap_err(),
            AppError::InvalidRequest(_)
        ));
        assert!(matches!(
            engine.collaborative_recommend(1, -3).await.unwrap_err(),
            AppError::InvalidRequest(_)
        ));
    }

    #[tokio::test]
    async fn test_collaborative_on_unrated_user_is_insufficient_data() {
        let err = engine().collaborative_recommend(42, 5).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientData(_)));
    }

    #[tokio::test]
    async fn test_collaborative_recommends_neighbor_movies() {
        let engine = engine();
        // User 1's closest neighbor (user 2) rated Balto; user 1 has not
        let recs = engine.collaborative_recommend(1, 5).await.unwrap();
        assert!(recs.iter().any(|r| r.movie.id == 3));
        assert!(recs.iter().all(|r| r.movie.id != 1 && r.movie.id != 2));
    }

    #[tokio::test]
    async fn test_hybrid_requires_a_seed() {
        let err = engine()
            .hybrid_recommend(None, None, 5, 0.5)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_hybrid_rejects_out_of_range_weight() {
        let engine = engine();
        for weight in [-0.1, 1.1, f64::NAN] {
            let err = engine
                .hybrid_recommend(Some(1), Some(1), 5, weight)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidRequest(_)));
        }
    }

    #[tokio::test]
    async fn test_hybrid_weight_one_matches_pure_content() {
        let engine = engine();
        let content = engine.content_recommend(1, 3).await.unwrap();
        let hybrid = engine
            .hybrid_recommend(Some(1), Some(1), 3, 1.0)
            .await
            .unwrap();

        let content_ids: Vec<MovieId> = content.iter().map(|r| r.movie.id).collect();
        let hybrid_ids: Vec<MovieId> = hybrid.iter().map(|r| r.movie.id).collect();
        assert_eq!(content_ids, hybrid_ids);
    }

    #[tokio::test]
    async fn test_hybrid_weight_zero_matches_pure_collaborative() {
        let engine = engine();
        let collaborative = engine.collaborative_recommend(1, 3).await.unwrap();
        let hybrid = engine
            .hybrid_recommend(Some(1), Some(1), 3, 0.0)
            .await
            .unwrap();

        let collaborative_ids: Vec<MovieId> =
            collaborative.iter().map(|r| r.movie.id).collect();
        let hybrid_ids: Vec<MovieId> = hybrid.iter().map(|r| r.movie.id).collect();
        assert_eq!(collaborative_ids, hybrid_ids);
    }

    #[tokio::test]
    async fn test_hybrid_single_seed_degrades_without_error() {
        let engine = engine();

        let by_movie = engine
            .hybrid_recommend(Some(1), None, 5, 0.5)
            .await
            .unwrap();
        assert!(!by_movie.is_empty());
        assert!(by_movie.iter().all(|r| r.algorithm == Algorithm::Hybrid));

        let by_user = engine
            .hybrid_recommend(None, Some(1), 5, 0.5)
            .await
            .unwrap();
        assert!(!by_user.is_empty());
    }

    #[tokio::test]
    async fn test_hybrid_cold_start_user_propagates_insufficient_data() {
        let err = engine()
            .hybrid_recommend(Some(1), Some(42), 5, 0.5)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientData(_)));
    }

    #[tokio::test]
    async fn test_repeated_request_is_bit_identical_until_mutation() {
        let engine = engine();

        let first = engine
            .hybrid_recommend(Some(1), Some(1), 5, 0.5)
            .await
            .unwrap();
        let second = engine
            .hybrid_recommend(Some(1), Some(1), 5, 0.5)
            .await
            .unwrap();
        assert_eq!(first, second);

        // A brand-new user who co-rates with user 1 enters the matrix: the
        // generation moves and the collaborative signal shifts detectably
        engine.add_rating(9, 1, 5).await.unwrap();
        engine.add_rating(9, 3, 5).await.unwrap();
        engine.add_rating(9, 4, 5).await.unwrap();

        let third = engine
            .hybrid_recommend(Some(1), Some(1), 5, 0.5)
            .await
            .unwrap();
        assert_ne!(first, third);
    }

    #[tokio::test]
    async fn test_add_rating_overwrites_and_becomes_visible() {
        let engine = engine();

        let before = engine.neighbors_of(1, 10).await.unwrap();
        let agreeing = before.iter().find(|(id, _)| *id == 2).unwrap().1;

        // User 1 flips their Jumanji score from 4 to 1, breaking the
        // agreement with user 2; the old score must stop influencing the
        // matrix on the very next query
        engine.add_rating(1, 2, 1).await.unwrap();

        let after = engine.neighbors_of(1, 10).await.unwrap();
        let disagreeing = after.iter().find(|(id, _)| *id == 2).unwrap().1;
        assert!(disagreeing < agreeing);

        let ratings = engine.user_ratings(1).await;
        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings.iter().find(|r| r.movie_id == 2).unwrap().score, 1);
    }

    #[tokio::test]
    async fn test_add_rating_validates_inputs() {
        let engine = engine();
        assert!(matches!(
            engine.add_rating(1, 1, 6).await.unwrap_err(),
            AppError::InvalidRequest(_)
        ));
        assert!(matches!(
            engine.add_rating(1, 99, 3).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_stats_counts_users_and_ratings() {
        let engine = engine();
        let stats = engine.stats().await;
        assert_eq!(stats.movie_count, 4);
        assert_eq!(stats.user_count, 3);
        assert_eq!(stats.rating_count, 6);

        engine.add_rating(1, 1, 4).await.unwrap(); // replace, not add
        assert_eq!(engine.stats().await.rating_count, 6);

        engine.add_rating(7, 1, 4).await.unwrap(); // new user
        let stats = engine.stats().await;
        assert_eq!(stats.user_count, 4);
        assert_eq!(stats.rating_count, 7);
    }

    #[tokio::test]
    async fn test_search_movies() {
        let engine = engine();
        let hits = engine.search_movies("toy", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);

        assert!(matches!(
            engine.search_movies("  ", 10).unwrap_err(),
            AppError::InvalidRequest(_)
        ));
    }

    #[tokio::test]
    async fn test_list_genres_is_sorted_vocabulary() {
        let genres = engine().list_genres();
        assert_eq!(
            genres,
            vec!["Action", "Adventure", "Animation", "Comedy", "Crime", "Fantasy"]
        );
    }
}
