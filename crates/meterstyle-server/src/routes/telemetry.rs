//! Power meter routes.
//!
//! # Endpoints
//!
//! ### `GET /pzem.json`
//! Polls the meter and returns the readings that were available:
//!
//! ```json
//! {"voltage": 230.1, "power": 50.0, "frequency": 50.0, "pf": 0.95}
//! ```
//!
//! Unavailable metrics are left out. The document may be `{}`.
//!
//! ### `POST /pzem/reset`
//! Zeroes the meter's energy counter. `204 No Content` on success,
//! `501` if the meter cannot do it, `502` if the device failed.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use meterstyle_core::{MeterError, TelemetryAssembler};
use meterstyle_protocol::{encode_telemetry, ErrorResponse};
use tracing::{error, info, warn};

use crate::AppState;

/// Create meter routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pzem.json", get(get_telemetry))
        .route("/pzem/reset", post(reset_energy))
}

/// GET /pzem.json
async fn get_telemetry(State(state): State<AppState>) -> Response {
    let snapshot = {
        let mut portal = state.lock().await;
        TelemetryAssembler::snapshot(&mut *portal.meter)
    };
    match encode_telemetry(&snapshot) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            error!("Failed to encode telemetry: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// POST /pzem/reset
async fn reset_energy(State(state): State<AppState>) -> Response {
    let result = state.lock().await.meter.reset_energy();
    match result {
        Ok(()) => {
            info!("Meter energy counter reset");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e @ MeterError::Unsupported) => (
            StatusCode::NOT_IMPLEMENTED,
            Json(ErrorResponse::new(e.to_string())),
        )
            .into_response(),
        Err(e @ MeterError::Device(_)) => {
            warn!("Meter energy reset failed: {}", e);
            (StatusCode::BAD_GATEWAY, Json(ErrorResponse::new(e.to_string()))).into_response()
        }
    }
}
