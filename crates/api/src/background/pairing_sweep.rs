//! Periodic expiration sweep for QR pairing sessions.
//!
//! Walks the in-memory pairing store on a fixed interval, expiring sessions
//! past their deadline: both attached sockets are notified and closed, and
//! the entry is dropped.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::pairing::PairingStore;

/// How often the sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(15);

/// Run the pairing expiration loop until `cancel` is triggered.
pub async fn run(store: Arc<PairingStore>, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = SWEEP_INTERVAL.as_secs(),
        "Pairing sweep started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Pairing sweep stopping");
                break;
            }
            _ = interval.tick() => {
                let expired = store.sweep(Utc::now()).await;
                if expired > 0 {
                    tracing::debug!(expired, "Pairing sweep: expired sessions");
                }
            }
        }
    }
}
