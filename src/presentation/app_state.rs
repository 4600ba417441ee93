// Application state for HTTP handlers
use crate::application::dashboard_api::DashboardApi;
use crate::infrastructure::memory_store::InMemoryDashboardStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DashboardApi>,
}

impl AppState {
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemoryDashboardStore::new()),
        }
    }
}
