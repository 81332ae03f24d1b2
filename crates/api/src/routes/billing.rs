//! Route definitions for `/billing`.

use axum::routing::post;
use axum::Router;

use crate::handlers::billing;
use crate::state::AppState;

/// Routes mounted at `/billing`.
///
/// ```text
/// POST /webhook -> Stripe webhook consumer (signature-authenticated)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/webhook", post(billing::webhook))
}
