pub mod extract;
pub mod health;
pub mod live_page;
pub mod sos;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub const START_SOS_PATH: &str = "/api/sos/start";

/// Routes that are not rate limited.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/sos/update", post(sos::update_location))
        .route("/api/sos/end", post(sos::end_sos))
        .route("/api/sos/live/{token}", get(sos::get_live_snapshot))
        .route("/live/{token}", get(live_page::live_page))
}

/// The session-start route on its own so callers can layer a rate limiter on it.
pub fn start_router() -> Router<AppState> {
    Router::new().route(START_SOS_PATH, post(sos::start_sos))
}
