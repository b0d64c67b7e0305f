//! Session lifecycle
//!
//! `Unauthenticated -> Authenticated -> (TimedOut | LoggedOut)`.
//! The idle timeout is a sliding window: each accepted operation moves
//! `last_activity` forward. Expiry is evaluated lazily on the next call.

use chrono::{DateTime, Duration, Utc};

use crate::error::{AtmError, AtmResult};

/// Where the interactive session stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    TimedOut,
    LoggedOut,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticated => "authenticated",
            Self::TimedOut => "timed out",
            Self::LoggedOut => "logged out",
        };
        f.write_str(label)
    }
}

/// Session state plus the last-activity timestamp
#[derive(Debug, Clone)]
pub struct SessionClock {
    state: SessionState,
    last_activity: DateTime<Utc>,
    timeout: Duration,
}

impl SessionClock {
    pub fn new(timeout: Duration, now: DateTime<Utc>) -> Self {
        Self {
            state: SessionState::Unauthenticated,
            last_activity: now,
            timeout,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Enter `Authenticated` after a successful MFA run
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.state = SessionState::Authenticated;
        self.last_activity = now;
    }

    /// Whether more than the timeout has elapsed since the last activity
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.last_activity > self.timeout
    }

    /// Gate for every operation inside a session
    ///
    /// Rejects calls outside `Authenticated`; on expiry moves to `TimedOut`
    /// and rejects without touching `last_activity`.
    pub fn check(&mut self, now: DateTime<Utc>) -> AtmResult<()> {
        match self.state {
            SessionState::Authenticated => {}
            SessionState::TimedOut => {
                return Err(AtmError::SessionTimedOut {
                    idle_secs: self.idle(now).num_seconds(),
                })
            }
            SessionState::Unauthenticated | SessionState::LoggedOut => {
                return Err(AtmError::NotAuthenticated)
            }
        }

        if self.is_expired(now) {
            self.state = SessionState::TimedOut;
            return Err(AtmError::SessionTimedOut {
                idle_secs: self.idle(now).num_seconds(),
            });
        }

        Ok(())
    }

    /// Record activity
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    /// Leave the session voluntarily
    pub fn end(&mut self) {
        if self.state == SessionState::Authenticated {
            self.state = SessionState::LoggedOut;
        }
    }

    fn idle(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_activity
    }
}
