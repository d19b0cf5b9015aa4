use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Path to the movies CSV file
    #[serde(default = "default_movies_path")]
    pub movies_path: String,

    /// Path to the ratings CSV file
    #[serde(default = "default_ratings_path")]
    pub ratings_path: String,

    /// Redis connection URL (metadata lookup cache)
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// TMDB API key (metadata enrichment is skipped when empty)
    #[serde(default)]
    pub tmdb_api_key: String,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// Number of neighbor users pooled for collaborative aggregation
    #[serde(default = "default_neighbor_k")]
    pub neighbor_k: usize,

    /// Minimum ratings a user needs before collaborative queries apply
    #[serde(default = "default_min_ratings")]
    pub min_ratings: usize,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_movies_path() -> String {
    "data/movies.csv".to_string()
}

fn default_ratings_path() -> String {
    "data/ratings.csv".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_neighbor_k() -> usize {
    10
}

fn default_min_ratings() -> usize {
    1
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_values() {
        let config: Config = envy::from_iter(vec![(
            "TMDB_API_KEY".to_string(),
            "test-key".to_string(),
        )])
        .unwrap();

        assert_eq!(config.movies_path, "data/movies.csv");
        assert_eq!(config.neighbor_k, 10);
        assert_eq!(config.min_ratings, 1);
        assert_eq!(config.port, 8000);
    }
}
