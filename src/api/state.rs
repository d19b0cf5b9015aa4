use std::sync::Arc;

use crate::engine::RecommendationEngine;
use crate::services::MetadataProvider;

/// Shared application state
///
/// The engine is the single owner of all catalog and rating state; the
/// metadata provider is the best-effort enrichment collaborator.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
    pub metadata: Arc<dyn MetadataProvider>,
}

impl AppState {
    pub fn new(engine: RecommendationEngine, metadata: Arc<dyn MetadataProvider>) -> Self {
        Self {
            engine: Arc::new(engine),
            metadata,
        }
    }
}
