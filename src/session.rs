//! Session lifecycle: decide whether the stored session id is still current.
//!
//! The session id carries its own creation time (see [`crate::identifier`]), so
//! the check needs nothing but the stored string and the clock.

use crate::identifier;
use crate::platform::Platform;
use crate::store::IdentityStore;
use serde::{Deserialize, Serialize};
use tracing::debug;

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Where the stored session id stands relative to the timeout window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing stored.
    Absent,
    /// Decodes and is within the window.
    Fresh,
    /// Decodes but the window has passed.
    Stale,
    /// Stored but does not decode.
    Corrupt,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Absent => "absent",
            SessionState::Fresh => "fresh",
            SessionState::Stale => "stale",
            SessionState::Corrupt => "corrupt",
        }
    }

    /// Every state but Fresh requires a new session id.
    pub fn needs_rotation(self) -> bool {
        !matches!(self, SessionState::Fresh)
    }
}

/// Outcome of a session check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResolution {
    /// The id to stamp on the outgoing event.
    pub session_id: String,
    /// State of the stored id before resolution.
    pub state: SessionState,
    pub rotated: bool,
}

/// Classify a stored session id at `now_millis`.
///
/// Elapsed whole minutes are compared with strict greater-than, so exactly
/// `timeout_minutes` is still Fresh. A timestamp ahead of the clock is Fresh.
pub fn classify(stored: Option<&str>, now_millis: u64, timeout_minutes: u64) -> SessionState {
    let Some(stored) = stored else {
        return SessionState::Absent;
    };
    let Some(created) = identifier::decode(stored) else {
        return SessionState::Corrupt;
    };

    let now = i64::try_from(now_millis).unwrap_or(i64::MAX);
    let elapsed_minutes = now.saturating_sub(created) / MILLIS_PER_MINUTE;
    let timeout = i64::try_from(timeout_minutes).unwrap_or(i64::MAX);

    if elapsed_minutes > timeout {
        SessionState::Stale
    } else {
        SessionState::Fresh
    }
}

/// Single authority for session rotation.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    store: IdentityStore,
    platform: Platform,
    timeout_minutes: u64,
}

impl SessionTracker {
    pub fn new(store: IdentityStore, platform: Platform, timeout_minutes: u64) -> Self {
        Self {
            store,
            platform,
            timeout_minutes,
        }
    }

    pub fn timeout_minutes(&self) -> u64 {
        self.timeout_minutes
    }

    /// Check the stored session and rotate it if it is absent, corrupt, or stale.
    ///
    /// Only a timeout (Stale) clears `experiment_id`.
    pub fn resolve(&self, experiment_id: &mut Option<String>) -> SessionResolution {
        let stored = self.store.session_id();
        let now = self.platform.now_millis();
        let state = classify(stored.as_deref(), now, self.timeout_minutes);

        match stored.filter(|_| !state.needs_rotation()) {
            Some(session_id) => SessionResolution {
                session_id,
                state,
                rotated: false,
            },
            None => {
                if state == SessionState::Stale && experiment_id.take().is_some() {
                    debug!("Session expired, cleared experiment id");
                }
                SessionResolution {
                    session_id: self.mint(now, state),
                    state,
                    rotated: true,
                }
            }
        }
    }

    /// Start a new session regardless of the stored one.
    pub fn rotate(&self) -> String {
        let now = self.platform.now_millis();
        let state = classify(self.store.session_id().as_deref(), now, self.timeout_minutes);
        self.mint(now, state)
    }

    fn mint(&self, now: u64, previous: SessionState) -> String {
        let session_id = identifier::encode(now, self.platform.random.as_ref());
        self.store.set_session_id(&session_id);
        debug!(
            session_id = %session_id,
            previous = previous.as_str(),
            "Rotated session"
        );
        session_id
    }
}
