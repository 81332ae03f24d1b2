//! In-memory QR pairing session store.
//!
//! Maps a one-time token to its [`PairingSession`] plus up to two WebSocket
//! senders: the web client that displayed the QR code and the phone that
//! scanned it. Both sides receive JSON status events on every transition;
//! terminal transitions close both sockets and drop the entry.
//!
//! The store is process-local. Pairing is interactive and short-lived
//! (seconds), so sessions are not shared across instances; a deployment
//! must route both ends of one pairing to the same instance.

use std::collections::HashMap;

use axum::extract::ws::{Message, Utf8Bytes};
use canteiro_core::pairing::{PairingError, PairingSession, PairingState};
use canteiro_core::types::{DbId, Timestamp};
use tokio::sync::{mpsc, RwLock};

use crate::ws::manager::WsSender;

/// Which side of the pairing a WebSocket belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingRole {
    Web,
    Phone,
}

/// Store operation failures, mapped onto HTTP statuses by the handlers.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown pairing token")]
    Unknown,

    #[error("pairing session expired")]
    Expired,

    #[error(transparent)]
    Transition(#[from] PairingError),
}

struct PairingEntry {
    session: PairingSession,
    web: Option<WsSender>,
    phone: Option<WsSender>,
}

impl PairingEntry {
    /// Push a status event to every attached socket.
    fn notify(&self, state: PairingState) {
        let payload = serde_json::json!({ "type": "status", "state": state });
        let message = Message::Text(Utf8Bytes::from(payload.to_string()));
        for sender in [&self.web, &self.phone].into_iter().flatten() {
            let _ = sender.send(message.clone());
        }
    }

    /// Send Close frames to both sockets and drop the senders.
    fn close_sockets(&mut self) {
        for sender in [self.web.take(), self.phone.take()].into_iter().flatten() {
            let _ = sender.send(Message::Close(None));
        }
    }
}

/// Process-wide pairing session store.
pub struct PairingStore {
    entries: RwLock<HashMap<String, PairingEntry>>,
}

impl PairingStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new pending session for `user_id` and return a copy of it.
    pub async fn create(&self, user_id: DbId, now: Timestamp) -> PairingSession {
        let session = PairingSession::new(user_id, now);
        let entry = PairingEntry {
            session: session.clone(),
            web: None,
            phone: None,
        };
        self.entries
            .write()
            .await
            .insert(session.token.clone(), entry);
        session
    }

    /// Snapshot of a session's current state.
    pub async fn get(&self, token: &str) -> Option<PairingSession> {
        self.entries
            .read()
            .await
            .get(token)
            .map(|e| e.session.clone())
    }

    /// Attach a WebSocket to one side of the session.
    ///
    /// Returns the receiver half of the connection's message channel; the
    /// WebSocket task forwards from it to the socket sink. A second attach
    /// on the same side replaces the previous socket.
    pub async fn attach(
        &self,
        token: &str,
        role: PairingRole,
    ) -> Result<mpsc::UnboundedReceiver<Message>, StoreError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(token).ok_or(StoreError::Unknown)?;
        if entry.session.is_terminal() {
            return Err(StoreError::Expired);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        match role {
            PairingRole::Web => entry.web = Some(tx),
            PairingRole::Phone => entry.phone = Some(tx),
        }
        Ok(rx)
    }

    /// The phone reported a scan: `pending -> scanned`, both sides notified.
    pub async fn scan(&self, token: &str, now: Timestamp) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(token).ok_or(StoreError::Unknown)?;
        if entry.session.is_overdue(now) || entry.session.state == PairingState::Expired {
            return Err(StoreError::Expired);
        }
        entry.session.scan(now)?;
        entry.notify(PairingState::Scanned);
        Ok(())
    }

    /// The phone confirmed the link: `scanned -> completed`. Both sides are
    /// notified, the sockets are closed, and the entry is removed. Returns
    /// the id of the user that initiated the pairing.
    pub async fn complete(&self, token: &str, now: Timestamp) -> Result<DbId, StoreError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(token).ok_or(StoreError::Unknown)?;
        if entry.session.is_overdue(now) || entry.session.state == PairingState::Expired {
            return Err(StoreError::Expired);
        }
        entry.session.complete()?;
        entry.notify(PairingState::Completed);
        entry.close_sockets();

        let user_id = entry.session.user_id;
        entries.remove(token);
        Ok(user_id)
    }

    /// Expire every overdue session: notify both sides, close sockets, and
    /// drop the entries. Returns the number of sessions expired.
    pub async fn sweep(&self, now: Timestamp) -> usize {
        let mut entries = self.entries.write().await;
        let overdue: Vec<String> = entries
            .iter()
            .filter(|(_, e)| e.session.is_overdue(now))
            .map(|(token, _)| token.clone())
            .collect();

        for token in &overdue {
            if let Some(mut entry) = entries.remove(token) {
                // expire() cannot fail here: is_overdue() only matches live
                // sessions.
                let _ = entry.session.expire();
                entry.notify(PairingState::Expired);
                entry.close_sockets();
            }
        }

        if !overdue.is_empty() {
            tracing::info!(count = overdue.len(), "Expired pairing sessions");
        }
        overdue.len()
    }

    /// Number of live sessions. For tests and shutdown logging.
    pub async fn session_count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Close all sockets and clear the store. Used during graceful shutdown.
    pub async fn shutdown_all(&self) {
        let mut entries = self.entries.write().await;
        for entry in entries.values_mut() {
            entry.close_sockets();
        }
        entries.clear();
    }
}

impl Default for PairingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    async fn recv_text(rx: &mut mpsc::UnboundedReceiver<Message>) -> serde_json::Value {
        match rx.recv().await.expect("message expected") {
            Message::Text(text) => serde_json::from_str(text.as_str()).expect("valid JSON"),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn full_pairing_flow_notifies_and_cleans_up() {
        let store = PairingStore::new();
        let now = Utc::now();
        let session = store.create(7, now).await;

        let mut web_rx = store.attach(&session.token, PairingRole::Web).await.unwrap();
        let mut phone_rx = store
            .attach(&session.token, PairingRole::Phone)
            .await
            .unwrap();

        store.scan(&session.token, now).await.unwrap();
        assert_eq!(recv_text(&mut web_rx).await["state"], "scanned");
        assert_eq!(recv_text(&mut phone_rx).await["state"], "scanned");

        let user_id = store.complete(&session.token, now).await.unwrap();
        assert_eq!(user_id, 7);
        assert_eq!(recv_text(&mut web_rx).await["state"], "completed");

        // Both sockets receive a Close frame after the status event.
        assert!(matches!(
            web_rx.recv().await,
            Some(Message::Close(_))
        ));
        assert!(matches!(phone_rx.recv().await, Some(Message::Close(_))));

        // Entry is gone.
        assert_eq!(store.session_count().await, 0);
        assert_eq!(
            store.scan(&session.token, now).await,
            Err(StoreError::Unknown)
        );
    }

    #[tokio::test]
    async fn complete_before_scan_is_a_transition_error() {
        let store = PairingStore::new();
        let session = store.create(1, Utc::now()).await;

        let err = store.complete(&session.token, Utc::now()).await.unwrap_err();
        assert!(matches!(err, StoreError::Transition(_)));
        // The failed complete must not consume the session.
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn double_scan_is_a_transition_error() {
        let store = PairingStore::new();
        let now = Utc::now();
        let session = store.create(1, now).await;

        store.scan(&session.token, now).await.unwrap();
        let err = store.scan(&session.token, now).await.unwrap_err();
        assert!(matches!(err, StoreError::Transition(_)));
    }

    #[tokio::test]
    async fn sweep_expires_only_overdue_sessions() {
        let store = PairingStore::new();
        let now = Utc::now();

        let stale = store
            .create(1, now - Duration::seconds(canteiro_core::pairing::PENDING_TTL_SECS + 5))
            .await;
        let fresh = store.create(2, now).await;

        let mut stale_rx = store.attach(&stale.token, PairingRole::Web).await.unwrap();

        let expired = store.sweep(now).await;
        assert_eq!(expired, 1);

        assert_eq!(recv_text(&mut stale_rx).await["state"], "expired");
        assert!(matches!(stale_rx.recv().await, Some(Message::Close(_))));

        assert!(store.get(&stale.token).await.is_none());
        assert!(store.get(&fresh.token).await.is_some());
    }

    #[tokio::test]
    async fn scan_after_deadline_reports_expired() {
        let store = PairingStore::new();
        let created = Utc::now();
        let session = store.create(1, created).await;

        let late = created + Duration::seconds(canteiro_core::pairing::PENDING_TTL_SECS + 1);
        assert_eq!(
            store.scan(&session.token, late).await,
            Err(StoreError::Expired)
        );
    }
}
