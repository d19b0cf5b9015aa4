use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell, RwLock};

use crate::error::AppResult;
use crate::models::{MovieId, UserId};

/// A ranked (movie, score) list as produced by one of the engines
pub type Ranked = Vec<(MovieId, f64)>;

/// Cache key: engine kind, seeds, request parameters, and — for anything
/// derived from the rating matrix — the matrix generation.
///
/// Content keys carry no generation: the genre index is static, so rating
/// mutations never invalidate them. The hybrid weight is keyed by its bit
/// pattern to keep the key hashable without rounding surprises.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecKey {
    Content {
        movie_id: MovieId,
        k: usize,
    },
    Collaborative {
        user_id: UserId,
        k: usize,
        generation: u64,
    },
    Hybrid {
        movie_id: Option<MovieId>,
        user_id: Option<UserId>,
        k: usize,
        weight_bits: u64,
        generation: u64,
    },
}

impl RecKey {
    /// The matrix generation this key was derived from, if any
    fn generation(&self) -> Option<u64> {
        match self {
            RecKey::Content { .. } => None,
            RecKey::Collaborative { generation, .. } => Some(*generation),
            RecKey::Hybrid { generation, .. } => Some(*generation),
        }
    }
}

type InFlight = Arc<OnceCell<Arc<Ranked>>>;

/// Memoizes computed recommendation lists with a single-flight guarantee
///
/// N concurrent requests for the same key trigger one computation; the rest
/// wait on the same per-key cell and receive the shared result. A waiter that
/// is canceled simply drops its interest — if it was the one computing,
/// another waiter takes over; nobody else is affected. Failed computations
/// are not cached.
#[derive(Default)]
pub struct RecommendationCache {
    entries: RwLock<HashMap<RecKey, Arc<Ranked>>>,
    in_flight: Mutex<HashMap<RecKey, InFlight>>,
}

impl RecommendationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached list for `key`, computing it at most once across
    /// concurrent callers.
    pub async fn get_or_compute<F, Fut>(&self, key: RecKey, compute: F) -> AppResult<Arc<Ranked>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<Ranked>>,
    {
        if let Some(hit) = self.entries.read().await.get(&key) {
            return Ok(hit.clone());
        }

        let cell: InFlight = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight.entry(key.clone()).or_default().clone()
        };

        let value = cell
            .get_or_try_init(|| async { compute().await.map(Arc::new) })
            .await?
            .clone();

        self.entries.write().await.insert(key.clone(), value.clone());
        self.in_flight.lock().await.remove(&key);

        Ok(value)
    }

    /// Drops every entry derived from a matrix generation older than
    /// `current`. Content entries carry no generation and survive.
    pub async fn retain_generation(&self, current: u64) {
        self.entries
            .write()
            .await
            .retain(|key, _| match key.generation() {
                Some(generation) => generation >= current,
                None => true,
            });
        self.in_flight
            .lock()
            .await
            .retain(|key, _| match key.generation() {
                Some(generation) => generation >= current,
                None => true,
            });
    }

    #[cfg(test)]
    async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}
