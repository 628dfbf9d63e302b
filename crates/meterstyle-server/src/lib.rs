//! # meterstyle-server
//!
//! Route dispatch and request loop for the style portal.
//!
//! ## Architecture
//!
//! The web layer is built on Axum and exposes:
//!
//! - `/` - Redirect to the configuration page
//! - `<page uri>` - The configuration page (style selection)
//! - `<page uri>/elements` - The page's element tree as JSON
//! - `/pzem.json` - Power meter telemetry
//! - `/pzem/reset` - Energy counter reset
//!
//! Every core operation runs under a single lock, so a request finishes its
//! catalog rebuild, style load or meter poll before the next one starts.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meterstyle_server::{create_router, PageConfig, PortalServer, ServerConfig, ServerState};
//!
//! let state = ServerState::new(page, Box::new(store), meter);
//! let app = create_router(state);
//! PortalServer::new(config, app, heartbeat).run().await?;
//! ```

pub mod routes;
pub mod server;

// Re-exports
pub use routes::create_router;
pub use server::{PortalServer, ServerConfig, ServerError};

use std::sync::Arc;

use meterstyle_core::{DocumentStore, MeterDevice, PortalSession};
use tokio::sync::{Mutex, MutexGuard};

/// Identity of the configuration page.
#[derive(Debug, Clone)]
pub struct PageConfig {
    pub title: String,
    pub uri: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            title: "Hello".to_string(),
            uri: "/hello".to_string(),
        }
    }
}

/// The core collaborators a request works on.
pub struct Portal {
    pub session: PortalSession,
    pub store: Box<dyn DocumentStore>,
    pub meter: Box<dyn MeterDevice>,
}

/// Shared server state for all route handlers.
pub struct ServerState {
    pub page: PageConfig,
    portal: Mutex<Portal>,
}

impl ServerState {
    /// Create state for the portal page described by `page`.
    pub fn new(
        page: PageConfig,
        store: Box<dyn DocumentStore>,
        meter: Box<dyn MeterDevice>,
    ) -> AppState {
        let session = PortalSession::portal(&page.uri);
        Self::with_session(page, session, store, meter)
    }

    /// Create state around an existing session.
    pub fn with_session(
        page: PageConfig,
        session: PortalSession,
        store: Box<dyn DocumentStore>,
        meter: Box<dyn MeterDevice>,
    ) -> AppState {
        Arc::new(Self {
            page,
            portal: Mutex::new(Portal {
                session,
                store,
                meter,
            }),
        })
    }

    /// Take exclusive access to the core collaborators.
    pub async fn lock(&self) -> MutexGuard<'_, Portal> {
        self.portal.lock().await
    }
}

/// Type alias for shared state in Axum handlers.
pub type AppState = Arc<ServerState>;
