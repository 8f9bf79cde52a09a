//! Shared collection of live sessions and the fan-out path.
//!
//! Every add, remove, and enumeration goes through the one mutex here, which
//! also serializes a sender's broadcasts so each peer sees that sender's
//! messages in order. Delivery is best-effort: a peer whose outbound queue is
//! full or gone is torn down and fan-out continues to the rest.

use crate::command::COMMAND_MARKER;
use crate::errors::server_error::ServerError;
use crate::server::session::SessionId;
use log::{trace, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, mpsc};

/// Outbound queue depth per session. A peer that falls this far behind is
/// disconnected rather than allowed to stall fan-out.
pub const OUTBOUND_QUEUE: usize = 32;

/// What the registry keeps per live session: the bounded outbound queue and
/// the signal that unblocks the connection's read loop on forced close.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    outbound: mpsc::Sender<String>,
    closed: Arc<Notify>,
}

impl SessionHandle {
    pub fn new(outbound: mpsc::Sender<String>, closed: Arc<Notify>) -> Self {
        SessionHandle { outbound, closed }
    }

    /// Signals the owning connection task to stop reading. Calling this more
    /// than once is a no-op.
    pub fn close(&self) {
        self.closed.notify_one();
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    sessions: Mutex<HashMap<SessionId, SessionHandle>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a freshly accepted session. No identity is required at this
    /// point; unidentified sessions take part in fan-out.
    pub fn register(&self, id: SessionId, handle: SessionHandle) -> Result<(), ServerError> {
        self.sessions
            .lock()
            .or(Err(ServerError::RegistryLock))?
            .insert(id, handle);
        Ok(())
    }

    /// Removes a session; removing one that is already gone is a no-op.
    pub fn unregister(&self, id: SessionId) -> Result<bool, ServerError> {
        Ok(self
            .sessions
            .lock()
            .or(Err(ServerError::RegistryLock))?
            .remove(&id)
            .is_some())
    }

    pub fn len(&self) -> Result<usize, ServerError> {
        Ok(self.sessions.lock().or(Err(ServerError::RegistryLock))?.len())
    }

    pub fn is_empty(&self) -> Result<bool, ServerError> {
        Ok(self.len()? == 0)
    }

    /// Sends `text` to every currently registered session, regardless of
    /// state. A session whose queue is full or closed is removed and its
    /// connection shut down; the rest still receive the message.
    pub fn broadcast(&self, text: &str) -> Result<(), ServerError> {
        let mut dead = Vec::new();
        {
            let sessions = self.sessions.lock().or(Err(ServerError::RegistryLock))?;
            trace!("S: {text} (to {} sessions)", sessions.len());

            for (id, handle) in sessions.iter() {
                if handle.outbound.try_send(text.to_string()).is_err() {
                    warn!("Could not send to {id}, dropping its connection");
                    dead.push(*id);
                }
            }
        }

        for id in dead {
            let handle = self
                .sessions
                .lock()
                .or(Err(ServerError::RegistryLock))?
                .remove(&id);
            if let Some(handle) = handle {
                handle.close();
            }
        }

        Ok(())
    }

    /// Fan-out for server-console chatter. Lines containing the command
    /// marker are administrative, not payload, and are never broadcast.
    pub fn server_broadcast(&self, text: &str) -> Result<(), ServerError> {
        if text.contains(COMMAND_MARKER) {
            return Ok(());
        }

        self.broadcast(&format!("<SERVER MSG> : {text}"))
    }

    /// Shuts down every session: read loops are signalled and outbound
    /// queues are dropped once drained.
    pub fn close_all(&self) -> Result<(), ServerError> {
        let sessions = std::mem::take(&mut *self.sessions.lock().or(Err(ServerError::RegistryLock))?);
        for handle in sessions.into_values() {
            handle.close();
        }
        Ok(())
    }
}
