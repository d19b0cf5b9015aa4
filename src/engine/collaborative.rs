use std::collections::HashMap;

use crate::error::{AppError, AppResult};
use crate::models::{MovieId, UserId};
use crate::store::RatingsTable;

use super::rank_descending;

/// Sparse user-by-movie rating matrix, derived from the ratings table
///
/// Rows exist only for users with at least one rating, and cells only for
/// rated movies, so absence stays distinguishable from a low score. Every
/// mutation bumps the generation; cache keys carry it so entries derived from
/// an older matrix can never be served again.
#[derive(Debug)]
pub struct UserItemMatrix {
    rows: HashMap<UserId, HashMap<MovieId, f64>>,
    generation: u64,
}

impl UserItemMatrix {
    /// Full derivation from the source-of-truth ratings table
    pub fn build(table: &RatingsTable) -> Self {
        let mut rows: HashMap<UserId, HashMap<MovieId, f64>> = HashMap::new();
        for (user_id, movie_id, score) in table.iter() {
            rows.entry(user_id)
                .or_default()
                .insert(movie_id, f64::from(score));
        }

        Self {
            rows,
            generation: 0,
        }
    }

    /// Patches one cell in place and bumps the generation. Equivalent to a
    /// rebuild from the updated table (the prior score is overwritten).
    pub fn set(&mut self, user_id: UserId, movie_id: MovieId, score: u8) {
        self.rows
            .entry(user_id)
            .or_default()
            .insert(movie_id, f64::from(score));
        self.generation += 1;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn row(&self, user_id: UserId) -> Option<&HashMap<MovieId, f64>> {
        self.rows.get(&user_id)
    }

    /// Cosine similarity between two users' rating vectors: the dot product
    /// runs over the co-rated intersection (absent cells contribute nothing),
    /// the norms over each user's full rated set. Zero co-rated movies means
    /// similarity 0, not an undefined pair.
    fn similarity(a: &HashMap<MovieId, f64>, b: &HashMap<MovieId, f64>) -> f64 {
        let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };

        let dot: f64 = small
            .iter()
            .filter_map(|(movie_id, score)| large.get(movie_id).map(|other| score * other))
            .sum();

        if dot == 0.0 {
            return 0.0;
        }

        let norm_a: f64 = a.values().map(|s| s * s).sum::<f64>().sqrt();
        let norm_b: f64 = b.values().map(|s| s * s).sum::<f64>().sqrt();
        dot / (norm_a * norm_b)
    }
}

/// Collaborative similarity engine over the user-item matrix
pub struct CollaborativeEngine;

impl CollaborativeEngine {
    /// Top-k users most similar to the query user, descending by similarity
    /// with ascending-id tie-break.
    ///
    /// Fails with `InsufficientData` when the user is absent from the matrix
    /// or below the minimum-ratings threshold; callers must be able to tell
    /// "not applicable" from an empty ranking.
    pub fn neighbors_of(
        matrix: &UserItemMatrix,
        user_id: UserId,
        k: usize,
        min_ratings: usize,
    ) -> AppResult<Vec<(UserId, f64)>> {
        let query_row = Self::applicable_row(matrix, user_id, min_ratings)?;
        let mut neighbors = Self::ranked_neighbors(matrix, user_id, query_row);
        neighbors.truncate(k);
        Ok(neighbors)
    }

    /// Movies rated by the query user's neighborhood but not by the user,
    /// scored by similarity-weighted average rating.
    pub fn recommend_for(
        matrix: &UserItemMatrix,
        user_id: UserId,
        k: usize,
        neighbor_k: usize,
        min_ratings: usize,
    ) -> AppResult<Vec<(MovieId, f64)>> {
        let query_row = Self::applicable_row(matrix, user_id, min_ratings)?;
        let mut neighbors = Self::ranked_neighbors(matrix, user_id, query_row);
        neighbors.truncate(neighbor_k);

        // score(movie) = Σ(sim × rating) / Σ(sim) over neighbors who rated it
        let mut weighted: HashMap<MovieId, (f64, f64)> = HashMap::new();
        for (neighbor_id, similarity) in neighbors {
            if similarity <= 0.0 {
                continue;
            }
            let Some(row) = matrix.row(neighbor_id) else {
                continue;
            };
            for (movie_id, score) in row {
                if query_row.contains_key(movie_id) {
                    continue;
                }
                let cell = weighted.entry(*movie_id).or_insert((0.0, 0.0));
                cell.0 += similarity * score;
                cell.1 += similarity;
            }
        }

        // Movies with no contributing neighbor are excluded, not scored 0
        let mut candidates: Vec<(MovieId, f64)> = weighted
            .into_iter()
            .filter(|(_, (_, sim_mass))| *sim_mass > 0.0)
            .map(|(movie_id, (sum, sim_mass))| (movie_id, sum / sim_mass))
            .collect();

        rank_descending(&mut candidates);
        candidates.truncate(k);
        Ok(candidates)
    }

    /// Every other user in the matrix, most similar first, ascending-id
    /// tie-break
    fn ranked_neighbors(
        matrix: &UserItemMatrix,
        user_id: UserId,
        query_row: &HashMap<MovieId, f64>,
    ) -> Vec<(UserId, f64)> {
        let mut neighbors: Vec<(UserId, f64)> = matrix
            .rows
            .iter()
            .filter(|(other_id, _)| **other_id != user_id)
            .map(|(other_id, row)| (*other_id, UserItemMatrix::similarity(query_row, row)))
            .collect();
        rank_descending(&mut neighbors);
        neighbors
    }

    fn applicable_row(
        matrix: &UserItemMatrix,
        user_id: UserId,
        min_ratings: usize,
    ) -> AppResult<&HashMap<MovieId, f64>> {
        let row = matrix.row(user_id).ok_or_else(|| {
            AppError::InsufficientData(format!("user {} has no ratings yet", user_id))
        })?;

        if row.len() < min_ratings {
            return Err(AppError::InsufficientData(format!(
                "user {} has {} ratings, below the minimum of {}",
                user_id,
                row.len(),
                min_ratings
            )));
        }

        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::Rating;

    fn rating(user_id: UserId, movie_id: MovieId, score: u8) -> Rating {
        Rating {
            user_id,
            movie_id,
            score,
            rated_at: Utc::now(),
        }
    }

    /// userA: {m1: 5, m2: 4}, userB: {m1: 5, m2: 5}, userC: {m1: 1}
    fn matrix() -> UserItemMatrix {
        UserItemMatrix::build(&RatingsTable::from_ratings(vec![
            rating(1, 1, 5),
            rating(1, 2, 4),
            rating(2, 1, 5),
            rating(2, 2, 5),
            rating(3, 1, 1),
        ]))
    }

    #[test]
    fn test_closest_neighbor_shares_the_most_rating_signal() {
        // userB co-rates both of userA's movies with near-identical scores;
        // userC overlaps on a single movie with a clashing score.
        let neighbors = CollaborativeEngine::neighbors_of(&matrix(), 1, 1, 1).unwrap();
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].0, 2);
    }

    #[test]
    fn test_neighbor_similarity_is_symmetric() {
        let matrix = matrix();
        let from_a = CollaborativeEngine::neighbors_of(&matrix, 1, 10, 1).unwrap();
        let from_b = CollaborativeEngine::neighbors_of(&matrix, 2, 10, 1).unwrap();

        let a_to_b = from_a.iter().find(|(id, _)| *id == 2).unwrap().1;
        let b_to_a = from_b.iter().find(|(id, _)| *id == 1).unwrap().1;
        assert!((a_to_b - b_to_a).abs() < 1e-12);
    }

    #[test]
    fn test_disjoint_users_have_zero_similarity() {
        let mut matrix = matrix();
        matrix.set(4, 50, 5); // rates nothing anyone else rated

        let neighbors = CollaborativeEngine::neighbors_of(&matrix, 4, 10, 1).unwrap();
        assert!(neighbors.iter().all(|(_, sim)| *sim == 0.0));
    }

    #[test]
    fn test_unknown_user_is_insufficient_data() {
        let err = CollaborativeEngine::neighbors_of(&matrix(), 99, 5, 1).unwrap_err();
        assert!(matches!(err, AppError::InsufficientData(_)));
    }

    #[test]
    fn test_below_min_ratings_is_insufficient_data() {
        // userC has one rating; a threshold of 2 puts them below the bar
        let err = CollaborativeEngine::recommend_for(&matrix(), 3, 5, 10, 2).unwrap_err();
        assert!(matches!(err, AppError::InsufficientData(_)));
    }

    #[test]
    fn test_recommendations_exclude_already_rated_movies() {
        let mut matrix = matrix();
        matrix.set(2, 3, 5); // userB also rated m3

        let recs = CollaborativeEngine::recommend_for(&matrix, 1, 10, 10, 1).unwrap();
        let ids: Vec<MovieId> = recs.iter().map(|(id, _)| *id).collect();

        assert!(ids.contains(&3));
        assert!(!ids.contains(&1));
        assert!(!ids.contains(&2));
    }

    #[test]
    fn test_weighted_score_is_similarity_weighted_average() {
        let mut matrix = matrix();
        matrix.set(2, 3, 4); // only userB rated m3

        let recs = CollaborativeEngine::recommend_for(&matrix, 1, 10, 10, 1).unwrap();
        let (_, score) = recs.iter().find(|(id, _)| *id == 3).unwrap();

        // A single contributing neighbor: sim × 4 / sim = the neighbor's score
        assert!((score - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_overwriting_a_rating_changes_similarity() {
        let mut matrix = matrix();
        matrix.set(3, 2, 5); // userC now rates both of userA's movies

        let before = CollaborativeEngine::neighbors_of(&matrix, 1, 10, 1).unwrap();
        let c_before = before.iter().find(|(id, _)| *id == 3).unwrap().1;

        // userC flips their m1 score from 1 to 5, agreeing with userA; the
        // old score must stop influencing the matrix
        matrix.set(3, 1, 5);
        let after = CollaborativeEngine::neighbors_of(&matrix, 1, 10, 1).unwrap();
        let c_after = after.iter().find(|(id, _)| *id == 3).unwrap().1;

        assert!(c_after > c_before);
    }

    #[test]
    fn test_set_bumps_generation() {
        let mut matrix = matrix();
        let generation = matrix.generation();
        matrix.set(1, 1, 4);
        assert_eq!(matrix.generation(), generation + 1);
    }
}
