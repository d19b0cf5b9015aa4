use crate::{error::AppResult, models::Movie, models::MovieMetadata};

pub mod tmdb;

/// Metadata enrichment provider abstraction
///
/// Poster, plot, and community-score lookups live behind this trait so the
/// backing service (TMDB today) can be swapped without touching callers.
/// Enrichment is strictly best-effort: the engine never depends on a provider
/// being reachable.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetch enrichment fields for a catalog movie
    ///
    /// Implementations may consult their own cache before going to the
    /// network. Errors are returned to let the caller decide how to degrade;
    /// the HTTP layer turns them into empty metadata, not failures.
    async fn fetch_metadata(&self, movie: &Movie) -> AppResult<MovieMetadata>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Fetches metadata for a movie, degrading to empty fields on any failure
///
/// A dead provider, an unreachable cache, or a malformed response all
/// collapse to "metadata unavailable"; recommendation calls keep working.
pub async fn enrich_best_effort(
    provider: &dyn MetadataProvider,
    movie: &Movie,
) -> MovieMetadata {
    match provider.fetch_metadata(movie).await {
        Ok(metadata) => metadata,
        Err(e) => {
            tracing::warn!(
                movie_id = movie.id,
                provider = provider.name(),
                error = %e,
                "Metadata lookup failed, serving without enrichment"
            );
            MovieMetadata::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn movie() -> Movie {
        Movie {
            id: 1,
            title: "Toy Story (1995)".to_string(),
            release_year: Some(1995),
            genres: vec!["Animation".to_string()],
        }
    }

    #[tokio::test]
    async fn test_enrich_best_effort_passes_through_success() {
        let mut provider = MockMetadataProvider::new();
        provider.expect_fetch_metadata().returning(|_| {
            Ok(MovieMetadata {
                poster_url: Some("https://image.example/poster.jpg".to_string()),
                overview: Some("A cowboy doll is threatened".to_string()),
                vote_average: Some(8.0),
            })
        });
        provider.expect_name().return_const("mock");

        let metadata = enrich_best_effort(&provider, &movie()).await;
        assert!(metadata.poster_url.is_some());
    }

    #[tokio::test]
    async fn test_enrich_best_effort_degrades_on_failure() {
        let mut provider = MockMetadataProvider::new();
        provider
            .expect_fetch_metadata()
            .returning(|_| Err(AppError::ExternalApi("provider down".to_string())));
        provider.expect_name().return_const("mock");

        let metadata = enrich_best_effort(&provider, &movie()).await;
        assert_eq!(metadata, MovieMetadata::default());
    }
}
