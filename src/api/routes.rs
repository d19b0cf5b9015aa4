use axum::{middleware, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api
fn api_routes() -> Router<AppState> {
    Router::new()
        // Catalog
        .route("/movies", get(handlers::list_movies))
        .route("/movies/search", get(handlers::search_movies))
        .route("/movies/:movie_id", get(handlers::get_movie))
        .route("/movies/:movie_id/details", get(handlers::get_movie_details))
        .route("/genres", get(handlers::list_genres))
        .route("/stats", get(handlers::get_stats))
        // Ratings
        .route(
            "/users/:user_id/ratings",
            get(handlers::get_user_ratings).post(handlers::add_rating),
        )
        // Recommendations
        .route(
            "/recommendations/content/:movie_id",
            get(handlers::content_recommendations),
        )
        .route(
            "/recommendations/collaborative/:user_id",
            get(handlers::collaborative_recommendations),
        )
        .route(
            "/recommendations/hybrid",
            get(handlers::hybrid_recommendations),
        )
}
