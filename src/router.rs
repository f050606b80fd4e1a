use axum::{routing::get, Router};

use crate::controller::callback;
use crate::state::AppState;

/// Builds the HTTP router: a keep-alive root and the OAuth callback.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
        .route("/callback", get(callback::callback))
}

/// Keep-alive endpoint for hosting platforms that probe the service.
async fn health() -> &'static str {
    "Bot is running"
}
