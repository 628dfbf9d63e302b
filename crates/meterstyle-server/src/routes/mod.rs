//! HTTP route handlers.

pub mod page;
pub mod telemetry;

use crate::AppState;
use axum::Router;

/// Create the main Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let page_uri = state.page.uri.clone();
    Router::new()
        .merge(page::routes(&page_uri))
        .merge(telemetry::routes())
        .with_state(state)
}
