use std::sync::Arc;

use canteiro_billing::WebhookProcessor;
use canteiro_events::EventBus;
use canteiro_storage::StorageProvider;

use crate::config::ServerConfig;
use crate::pairing::PairingStore;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: canteiro_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (notification clients).
    pub ws_manager: Arc<WsManager>,
    /// QR pairing session store.
    pub pairing: Arc<PairingStore>,
    /// Centralized event bus for publishing domain events.
    pub event_bus: Arc<EventBus>,
    /// Attachment blob storage.
    pub storage: Arc<dyn StorageProvider>,
    /// Stripe webhook processor; `None` when billing is not configured.
    pub billing: Option<Arc<WebhookProcessor>>,
}
