use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::models::{
    Movie, MovieDetails, MovieId, Rating, Recommendation, Stats, UserId,
};
use crate::services::metadata::enrich_best_effort;

use super::AppState;

/// Recommendations returned when the caller does not ask for a count
const DEFAULT_K: i64 = 10;

/// Hybrid content weight when the caller does not supply one
const DEFAULT_CONTENT_WEIGHT: f64 = 0.6;

/// Rows returned by listings and searches by default
const DEFAULT_LIMIT: i64 = 20;

// Request types

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    pub k: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct HybridQuery {
    pub movie_id: Option<MovieId>,
    pub user_id: Option<UserId>,
    pub k: Option<i64>,
    pub weight: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRatingRequest {
    pub movie_id: MovieId,
    pub score: u8,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// List catalog movies in ascending id order
pub async fn list_movies(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Movie>>> {
    let movies = state
        .engine
        .list_movies(query.limit.unwrap_or(DEFAULT_LIMIT))?;
    Ok(Json(movies))
}

/// Case-insensitive title search
pub async fn search_movies(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<Movie>>> {
    let movies = state
        .engine
        .search_movies(&query.query, query.limit.unwrap_or(DEFAULT_LIMIT))?;
    Ok(Json(movies))
}

/// Fetch one movie by id
pub async fn get_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
) -> AppResult<Json<Movie>> {
    Ok(Json(state.engine.get_movie(movie_id)?))
}

/// Fetch one movie with best-effort metadata enrichment
///
/// Provider trouble shows up as empty metadata fields, never as a failed
/// request.
pub async fn get_movie_details(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
) -> AppResult<Json<MovieDetails>> {
    let movie = state.engine.get_movie(movie_id)?;
    let metadata = enrich_best_effort(state.metadata.as_ref(), &movie).await;
    Ok(Json(MovieDetails { movie, metadata }))
}

/// The catalog's genre vocabulary
pub async fn list_genres(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.engine.list_genres())
}

/// Catalog-wide aggregate counters
pub async fn get_stats(State(state): State<AppState>) -> Json<Stats> {
    Json(state.engine.stats().await)
}

/// Submit or overwrite a rating for one (user, movie) pair
pub async fn add_rating(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(request): Json<CreateRatingRequest>,
) -> AppResult<(StatusCode, Json<Rating>)> {
    let rating = state
        .engine
        .add_rating(user_id, request.movie_id, request.score)
        .await?;
    Ok((StatusCode::CREATED, Json(rating)))
}

/// A user's submitted ratings
pub async fn get_user_ratings(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Json<Vec<Rating>> {
    Json(state.engine.user_ratings(user_id).await)
}

/// "Movies like this one" from genre similarity
pub async fn content_recommendations(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
    Query(query): Query<RecommendQuery>,
) -> AppResult<Json<Vec<Recommendation>>> {
    let recommendations = state
        .engine
        .content_recommend(movie_id, query.k.unwrap_or(DEFAULT_K))
        .await?;
    Ok(Json(recommendations))
}

/// "Movies liked by users like this one"
pub async fn collaborative_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(query): Query<RecommendQuery>,
) -> AppResult<Json<Vec<Recommendation>>> {
    let recommendations = state
        .engine
        .collaborative_recommend(user_id, query.k.unwrap_or(DEFAULT_K))
        .await?;
    Ok(Json(recommendations))
}

/// Weighted blend of the two engines, seeded by movie and/or user
pub async fn hybrid_recommendations(
    State(state): State<AppState>,
    Query(query): Query<HybridQuery>,
) -> AppResult<Json<Vec<Recommendation>>> {
    let recommendations = state
        .engine
        .hybrid_recommend(
            query.movie_id,
            query.user_id,
            query.k.unwrap_or(DEFAULT_K),
            query.weight.unwrap_or(DEFAULT_CONTENT_WEIGHT),
        )
        .await?;
    Ok(Json(recommendations))
}
