/// TMDB metadata provider
///
/// Resolves a catalog movie to TMDB's closest search hit and lifts poster,
/// overview, and vote average from it. Responses are cached best-effort in
/// Redis; the provider itself never retries.
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{Movie, MovieMetadata},
    services::metadata::MetadataProvider,
};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

const METADATA_CACHE_TTL: u64 = 604800; // 1 week
const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w342";

/// The slice of a TMDB search hit the provider keeps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbMovie {
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    vote_average: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse {
    #[serde(default)]
    results: Vec<TmdbMovie>,
}

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Cache,
}

impl TmdbProvider {
    pub fn new(cache: Cache, api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            cache,
        }
    }

    /// Strips a trailing "(YYYY)" so the search query matches TMDB titles
    fn clean_title(movie: &Movie) -> String {
        match movie.release_year {
            Some(year) => movie
                .title
                .replace(&format!("({})", year), "")
                .trim()
                .to_string(),
            None => movie.title.clone(),
        }
    }

    async fn search(&self, movie: &Movie) -> AppResult<Option<TmdbMovie>> {
        let query = Self::clean_title(movie);

        cached!(
            self.cache,
            CacheKey::Metadata(movie.id),
            METADATA_CACHE_TTL,
            async move {
                let url = format!("{}/search/movie", self.api_url);
                let mut params = vec![
                    ("api_key", self.api_key.clone()),
                    ("query", query.clone()),
                    ("language", "en-US".to_string()),
                ];
                if let Some(year) = movie.release_year {
                    params.push(("year", year.to_string()));
                }

                let response = self.http_client.get(&url).query(&params).send().await?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(AppError::ExternalApi(format!(
                        "TMDB returned status {}: {}",
                        status, body
                    )));
                }

                let search: TmdbSearchResponse = response.json().await?;
                let hit = search.results.into_iter().next();

                tracing::info!(
                    movie_id = movie.id,
                    query = %query,
                    found = hit.is_some(),
                    provider = "tmdb",
                    "Metadata search completed"
                );

                Ok(hit)
            }
        )
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    async fn fetch_metadata(&self, movie: &Movie) -> AppResult<MovieMetadata> {
        if self.api_key.is_empty() {
            return Err(AppError::ExternalApi(
                "TMDB API key not configured".to_string(),
            ));
        }

        let hit = self.search(movie).await?;

        Ok(match hit {
            Some(tmdb) => MovieMetadata {
                poster_url: tmdb
                    .poster_path
                    .map(|path| format!("{}{}", IMAGE_BASE_URL, path)),
                overview: tmdb.overview,
                vote_average: tmdb.vote_average,
            },
            None => MovieMetadata::default(),
        })
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(title: &str, release_year: Option<i32>) -> Movie {
        Movie {
            id: 1,
            title: title.to_string(),
            release_year,
            genres: vec![],
        }
    }

    #[test]
    fn test_clean_title_strips_year_suffix() {
        assert_eq!(
            TmdbProvider::clean_title(&movie("Toy Story (1995)", Some(1995))),
            "Toy Story"
        );
    }

    #[test]
    fn test_clean_title_without_year_is_unchanged() {
        assert_eq!(
            TmdbProvider::clean_title(&movie("Toy Story", None)),
            "Toy Story"
        );
    }

    #[test]
    fn test_search_response_tolerates_missing_fields() {
        let json = r#"{"results": [{"poster_path": null}]}"#;
        let parsed: TmdbSearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert!(parsed.results[0].poster_path.is_none());
        assert!(parsed.results[0].vote_average.is_none());
    }

    #[test]
    fn test_search_response_empty_results() {
        let parsed: TmdbSearchResponse = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert!(parsed.results.is_empty());
    }
}
