pub mod auth;
pub mod billing;
pub mod company;
pub mod health;
pub mod notification;
pub mod pairing;

use axum::routing::{any, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                                   notification WebSocket
///
/// /auth/register                        register (public)
/// /auth/login                           login (public)
/// /auth/refresh                         refresh (public)
/// /auth/logout                          logout (requires auth)
///
/// /companies                            list, create
/// /companies/{company_id}/...           tenant-scoped resources
///
/// /billing/webhook                      Stripe webhook (signature-authed)
/// /surveys/{public_token}/responses     public survey responses
///
/// /pairing                              QR pairing sessions
/// /notifications                        per-user notifications
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", any(ws::ws_handler))
        .nest("/auth", auth::router())
        .nest("/companies", company::router())
        .nest("/billing", billing::router())
        .route(
            "/surveys/{public_token}/responses",
            post(handlers::survey::submit_response),
        )
        .nest("/pairing", pairing::router())
        .nest("/notifications", notification::router())
}
