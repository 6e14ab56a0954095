//! Heartbeat trigger: turns raw editor activity into heartbeat decisions.
//!
//! ```text
//! dispatch ⇔ save ∨ elapsed ≥ window ∨ file ≠ last_file
//! ```
//!
//! Session state advances as soon as a heartbeat is decided, before the
//! dispatch outcome is known, and is never rolled back.

use chrono::{DateTime, Utc};
use pulse_protocol::ActivityKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heartbeat {
    pub file: String,
    pub is_write: bool,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub last_file: Option<String>,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Debouncer {
    window_ms: i64,
    session: SessionState,
}

impl Debouncer {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms: i64::try_from(window_ms).unwrap_or(i64::MAX),
            session: SessionState::default(),
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Records an activity signal and returns the heartbeat to send, if any.
    /// Signals without an active file are ignored.
    pub fn observe(
        &mut self,
        kind: ActivityKind,
        file: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<Heartbeat> {
        let file = file.filter(|f| !f.is_empty())?;
        let is_write = kind.is_write();

        if !self.should_dispatch(file, is_write, now) {
            return None;
        }

        self.session.last_file = Some(file.to_string());
        self.session.last_heartbeat = Some(now);

        Some(Heartbeat {
            file: file.to_string(),
            is_write,
            time: now,
        })
    }

    pub fn should_dispatch(&self, file: &str, is_write: bool, now: DateTime<Utc>) -> bool {
        is_write || self.enough_time_passed(now) || self.session.last_file.as_deref() != Some(file)
    }

    fn enough_time_passed(&self, now: DateTime<Utc>) -> bool {
        match self.session.last_heartbeat {
            Some(last) => now.signed_duration_since(last).num_milliseconds() >= self.window_ms,
            None => true,
        }
    }
}
