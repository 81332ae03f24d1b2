//! WhatsApp QR pairing session state machine.
//!
//! A pairing session links a logged-in web client with a phone: the web
//! client displays a QR code carrying a one-time token, the phone scans it
//! and confirms, and both sides are notified. The session itself is pure
//! state + timestamps; socket bookkeeping lives in the API layer so this
//! module stays unit-testable without a runtime.
//!
//! Transitions:
//!
//! ```text
//! Pending --scan--> Scanned --complete--> Completed
//!    |                 |
//!    +----expire-------+--------> Expired
//! ```
//!
//! Any other transition is a [`PairingError::InvalidTransition`].

use chrono::Duration;
use serde::Serialize;
use uuid::Uuid;

use crate::types::{DbId, Timestamp};

/// How long a freshly created session waits for a scan.
pub const PENDING_TTL_SECS: i64 = 120;

/// How long a scanned session waits for confirmation. Shorter than the
/// pending window: once a phone has scanned, confirmation is immediate
/// or the user walked away.
pub const SCANNED_TTL_SECS: i64 = 60;

/// Lifecycle state of a pairing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingState {
    Pending,
    Scanned,
    Completed,
    Expired,
}

/// Error returned by an out-of-order transition.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PairingError {
    #[error("invalid pairing transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: PairingState,
        to: PairingState,
    },
}

/// A single pairing session keyed by its one-time token.
#[derive(Debug, Clone)]
pub struct PairingSession {
    /// One-time token embedded in the QR payload.
    pub token: String,
    /// User that initiated the pairing from the web client.
    pub user_id: DbId,
    pub state: PairingState,
    pub created_at: Timestamp,
    /// Moment after which the session counts as overdue.
    pub deadline: Timestamp,
}

impl PairingSession {
    /// Create a new session in `Pending` with a random token.
    pub fn new(user_id: DbId, now: Timestamp) -> Self {
        Self {
            token: Uuid::new_v4().to_string(),
            user_id,
            state: PairingState::Pending,
            created_at: now,
            deadline: now + Duration::seconds(PENDING_TTL_SECS),
        }
    }

    /// The phone reported a scan. Refreshes the deadline to the shorter
    /// confirmation window.
    pub fn scan(&mut self, now: Timestamp) -> Result<(), PairingError> {
        match self.state {
            PairingState::Pending => {
                self.state = PairingState::Scanned;
                self.deadline = now + Duration::seconds(SCANNED_TTL_SECS);
                Ok(())
            }
            from => Err(PairingError::InvalidTransition {
                from,
                to: PairingState::Scanned,
            }),
        }
    }

    /// The phone confirmed the link.
    pub fn complete(&mut self) -> Result<(), PairingError> {
        match self.state {
            PairingState::Scanned => {
                self.state = PairingState::Completed;
                Ok(())
            }
            from => Err(PairingError::InvalidTransition {
                from,
                to: PairingState::Completed,
            }),
        }
    }

    /// Force-expire the session. Only live sessions can expire.
    pub fn expire(&mut self) -> Result<(), PairingError> {
        match self.state {
            PairingState::Pending | PairingState::Scanned => {
                self.state = PairingState::Expired;
                Ok(())
            }
            from => Err(PairingError::InvalidTransition {
                from,
                to: PairingState::Expired,
            }),
        }
    }

    /// Whether the session has outlived its deadline at `now`.
    pub fn is_overdue(&self, now: Timestamp) -> bool {
        matches!(self.state, PairingState::Pending | PairingState::Scanned) && now > self.deadline
    }

    /// Whether the session is finished (completed or expired) and can be
    /// dropped from the store.
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, PairingState::Completed | PairingState::Expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn session() -> PairingSession {
        PairingSession::new(1, Utc::now())
    }

    #[test]
    fn happy_path_pending_scanned_completed() {
        let mut s = session();
        assert_eq!(s.state, PairingState::Pending);

        s.scan(Utc::now()).expect("scan from pending");
        assert_eq!(s.state, PairingState::Scanned);

        s.complete().expect("complete from scanned");
        assert_eq!(s.state, PairingState::Completed);
        assert!(s.is_terminal());
    }

    #[test]
    fn complete_before_scan_is_rejected() {
        let mut s = session();
        let err = s.complete().unwrap_err();
        assert_eq!(
            err,
            PairingError::InvalidTransition {
                from: PairingState::Pending,
                to: PairingState::Completed,
            }
        );
        // State unchanged after the failed transition.
        assert_eq!(s.state, PairingState::Pending);
    }

    #[test]
    fn double_scan_is_rejected() {
        let mut s = session();
        s.scan(Utc::now()).unwrap();
        assert!(s.scan(Utc::now()).is_err());
    }

    #[test]
    fn scan_refreshes_deadline() {
        let now = Utc::now();
        let mut s = PairingSession::new(7, now);
        let pending_deadline = s.deadline;

        // Scan near the end of the pending window: the confirmation
        // window starts from the scan, not from creation.
        let scan_time = now + Duration::seconds(PENDING_TTL_SECS - 1);
        s.scan(scan_time).unwrap();
        assert_eq!(s.deadline, scan_time + Duration::seconds(SCANNED_TTL_SECS));
        assert!(s.deadline > pending_deadline);
    }

    #[test]
    fn overdue_only_after_deadline() {
        let now = Utc::now();
        let s = PairingSession::new(1, now);
        assert!(!s.is_overdue(now));
        assert!(!s.is_overdue(now + Duration::seconds(PENDING_TTL_SECS)));
        assert!(s.is_overdue(now + Duration::seconds(PENDING_TTL_SECS + 1)));
    }

    #[test]
    fn expired_session_rejects_everything() {
        let mut s = session();
        s.expire().unwrap();
        assert!(s.is_terminal());
        assert!(s.scan(Utc::now()).is_err());
        assert!(s.complete().is_err());
        assert!(s.expire().is_err());
    }

    #[test]
    fn completed_session_cannot_expire() {
        let mut s = session();
        s.scan(Utc::now()).unwrap();
        s.complete().unwrap();
        assert!(s.expire().is_err());

        // A terminal session is never overdue, whatever the clock says.
        assert!(!s.is_overdue(Utc::now() + Duration::days(1)));
    }
}
