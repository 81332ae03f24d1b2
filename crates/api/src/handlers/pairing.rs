//! Handlers for the WhatsApp QR pairing flow under `/pairing`.
//!
//! The web client creates a session and holds a WebSocket open for status
//! events; the phone drives the transitions over plain POSTs after reading
//! the token out of the QR code.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use canteiro_core::error::CoreError;
use canteiro_core::pairing::{PairingSession, PairingState};
use canteiro_core::types::Timestamp;
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::pairing::{PairingRole, StoreError};
use crate::state::AppState;

/// Response for `POST /pairing` and `GET /pairing/{token}`.
#[derive(Debug, Serialize)]
pub struct PairingView {
    pub token: String,
    /// Payload the web client renders as a QR code.
    pub qr_payload: String,
    pub state: PairingState,
    pub deadline: Timestamp,
}

impl PairingView {
    fn from_session(session: PairingSession) -> Self {
        Self {
            qr_payload: format!("canteiro://pair/{}", session.token),
            token: session.token,
            state: session.state,
            deadline: session.deadline,
        }
    }
}

fn map_store_error(err: StoreError) -> AppError {
    match err {
        StoreError::Unknown => AppError::Core(CoreError::NotFound {
            entity: "PairingSession",
            id: 0,
        }),
        StoreError::Expired => {
            AppError::Core(CoreError::Gone("Pairing session expired".into()))
        }
        StoreError::Transition(e) => AppError::Core(CoreError::Conflict(e.to_string())),
    }
}

/// POST /api/v1/pairing
///
/// Create a pairing session for the authenticated user.
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<PairingView>)> {
    let session = state.pairing.create(auth.user_id, Utc::now()).await;
    tracing::info!(user_id = auth.user_id, token = %session.token, "Pairing session created");
    Ok((StatusCode::CREATED, Json(PairingView::from_session(session))))
}

/// GET /api/v1/pairing/{token}
///
/// Polling fallback for clients without WebSocket support.
pub async fn get_status(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<PairingView>> {
    let session = state
        .pairing
        .get(&token)
        .await
        .ok_or_else(|| map_store_error(StoreError::Unknown))?;
    Ok(Json(PairingView::from_session(session)))
}

/// POST /api/v1/pairing/{token}/scan
///
/// The phone reports it scanned the QR code.
pub async fn scan(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<StatusCode> {
    state
        .pairing
        .scan(&token, Utc::now())
        .await
        .map_err(map_store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/pairing/{token}/complete
///
/// The phone confirms the link. Both sockets are notified and closed; the
/// session is consumed.
pub async fn complete(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<StatusCode> {
    let user_id = state
        .pairing
        .complete(&token, Utc::now())
        .await
        .map_err(map_store_error)?;

    tracing::info!(user_id, "Pairing completed");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// WebSocket attach
// ---------------------------------------------------------------------------

/// Query parameters for the pairing WebSocket.
#[derive(Debug, Deserialize)]
pub struct AttachParams {
    /// `web` (default) or `phone`.
    pub role: Option<String>,
}

/// GET /api/v1/pairing/{token}/ws?role=web|phone
///
/// Attach a WebSocket to one side of the session and stream status events
/// until the session reaches a terminal state.
pub async fn ws_attach(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(token): Path<String>,
    Query(params): Query<AttachParams>,
) -> AppResult<impl IntoResponse> {
    let role = match params.role.as_deref() {
        None | Some("web") => PairingRole::Web,
        Some("phone") => PairingRole::Phone,
        Some(other) => {
            return Err(AppError::BadRequest(format!(
                "Unknown pairing role: {other}"
            )))
        }
    };

    let rx = state
        .pairing
        .attach(&token, role)
        .await
        .map_err(map_store_error)?;

    Ok(ws.on_upgrade(move |socket| pump_status(socket, token, rx)))
}

/// Forward status events from the store to the socket until either side
/// closes. The store sends the Close frame on terminal transitions.
async fn pump_status(
    socket: WebSocket,
    token: String,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                match outbound {
                    Some(msg) => {
                        let closing = matches!(msg, Message::Close(_));
                        if sink.send(msg).await.is_err() || closing {
                            break;
                        }
                    }
                    None => break,
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    tracing::debug!(token = %token, "Pairing socket closed");
}
