//! Route definitions for the `/pairing` resource.

use axum::routing::{any, get, post};
use axum::Router;

use crate::handlers::pairing;
use crate::state::AppState;

/// Routes mounted at `/pairing`.
///
/// ```text
/// POST /                  -> create session (auth)
/// GET  /{token}           -> status snapshot (polling fallback)
/// GET  /{token}/ws        -> status WebSocket (?role=web|phone)
/// POST /{token}/scan      -> phone reports scan
/// POST /{token}/complete  -> phone confirms link
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(pairing::create))
        .route("/{token}", get(pairing::get_status))
        .route("/{token}/ws", any(pairing::ws_attach))
        .route("/{token}/scan", post(pairing::scan))
        .route("/{token}/complete", post(pairing::complete))
}
