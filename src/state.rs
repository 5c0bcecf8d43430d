use std::sync::Arc;

use crate::db::WorkspaceStore;
use crate::extraction::ContentExtractor;
use crate::layout::GridConfig;
use crate::services::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub extractor: Arc<dyn ContentExtractor>,
    pub grid: GridConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn WorkspaceStore>, extractor: Arc<dyn ContentExtractor>, grid: GridConfig) -> Self {
        Self {
            sessions: Arc::new(SessionRegistry::new(store)),
            extractor,
            grid,
        }
    }
}
