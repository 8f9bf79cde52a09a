//! Per-connection session state.
//!
//! A session starts unidentified, becomes identified exactly once through
//! the login handshake, and ends in the terminal closing state. The value is
//! owned by its connection task; the registry only holds the session's
//! outbound handle.

use crate::errors::server_error::ServerError;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Stable handle assigned to a connection at accept time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session {}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Unidentified,
    Identified,
    Closing,
}

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    login_id: Option<String>,
    state: SessionState,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Session {
            id,
            login_id: None,
            state: SessionState::Unidentified,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn login_id(&self) -> Option<&str> {
        self.login_id.as_deref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// One-shot transition to `Identified`. Fails without touching the
    /// stored login id when the session already has one.
    pub fn identify(&mut self, login_id: &str) -> Result<(), ServerError> {
        if self.state != SessionState::Unidentified || self.login_id.is_some() {
            return Err(ServerError::LoginAlreadySet(self.id));
        }

        self.login_id = Some(login_id.to_string());
        self.state = SessionState::Identified;
        Ok(())
    }

    /// Terminal transition; safe to call more than once.
    pub fn close(&mut self) {
        self.state = SessionState::Closing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(SessionId::next(), SessionId::next());
    }

    #[test]
    fn identify_transitions_exactly_once() {
        let mut session = Session::new(SessionId::next());
        assert_eq!(session.state(), SessionState::Unidentified);
        assert_eq!(session.login_id(), None);

        session.identify("alice").unwrap();
        assert_eq!(session.state(), SessionState::Identified);
        assert_eq!(session.login_id(), Some("alice"));

        // A second attempt fails and leaves the login id untouched.
        assert!(session.identify("bob").is_err());
        assert_eq!(session.login_id(), Some("alice"));
    }

    #[test]
    fn closing_is_terminal_and_idempotent() {
        let mut session = Session::new(SessionId::next());
        session.close();
        session.close();
        assert_eq!(session.state(), SessionState::Closing);
        assert!(session.identify("late").is_err());
    }
}
