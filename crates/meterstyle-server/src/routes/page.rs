//! Configuration page routes.
//!
//! # Endpoints
//!
//! ### `GET /`
//! Redirects (302) to the configuration page.
//!
//! ### `GET <page uri>?Styles=<name>`
//! Applies the named style document, rebuilds the style list from the
//! document store and returns the page as HTML. Without the parameter the
//! current selection is kept.
//!
//! ### `GET <page uri>/elements`
//! Returns the page's elements as JSON, without running a page load:
//!
//! ```json
//! {
//!   "title": "Hello",
//!   "uri": "/hello",
//!   "element": [
//!     {"type": "ACText", "name": "Caption", "value": "Hello, world", ...},
//!     {"type": "ACRadio", "name": "Styles", "value": ["bright.json"], "checked": 0, ...},
//!     {"type": "ACSubmit", "name": "Apply", "value": "Apply", "uri": "/hello", ...}
//!   ]
//! }
//! ```

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use meterstyle_protocol::{encode_page, render_page, PageDocument};
use tracing::{debug, error};

use crate::{AppState, Portal};

/// Create page routes for the page served at `page_uri`.
pub fn routes(page_uri: &str) -> Router<AppState> {
    Router::new()
        .route("/", get(redirect_to_page))
        .route(page_uri, get(get_page))
        .route(&format!("{}/elements", page_uri), get(get_elements))
}

/// GET /
async fn redirect_to_page(State(state): State<AppState>) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, state.page.uri.clone())],
    )
        .into_response()
}

/// GET <page uri>
async fn get_page(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Html<String> {
    let mut portal = state.lock().await;
    let Portal { session, store, .. } = &mut *portal;

    if let Some(selected) = params.get(session.selector()) {
        session.select(selected);
    }
    let load = session.on_page_load(&**store);
    debug!(
        "Page load: selected={:?} loaded={} catalog={:?}",
        load.selected, load.loaded, load.catalog
    );

    Html(render_page(&state.page.title, &state.page.uri, session.tree()))
}

/// GET <page uri>/elements
async fn get_elements(State(state): State<AppState>) -> Response {
    let portal = state.lock().await;
    let page = PageDocument::new(&state.page.title, &state.page.uri, portal.session.tree());
    match encode_page(&page) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            error!("Failed to encode page: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
