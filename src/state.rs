use crate::store::Store;

/// Shared state for HTTP request handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
}
