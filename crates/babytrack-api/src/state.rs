use std::sync::Arc;

use babytrack_core::TrackerStore;

/// Shared application state passed to all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Storage for users, profiles, tracker entries and checklist records.
    pub store: Arc<dyn TrackerStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn TrackerStore>) -> Self {
        Self { store }
    }
}
