use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::relay::{OutputRelay, RelayEvent};
use super::remote::{ConnectedSession, RemoteSession};
use super::SessionId;
use crate::error::{AppError, Result};

struct Entry {
    session: RemoteSession,
    relay: JoinHandle<()>,
}

/// Owns every open session and the relay feeding its view.
///
/// All input to a remote shell is routed through here by id, so a view can
/// only ever reach the session it was opened for.
#[derive(Default)]
pub struct SessionRegistry {
    entries: HashMap<SessionId, Entry>,
    order: Vec<SessionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the session's output relay and take ownership of it.
    pub fn register<E>(&mut self, connected: ConnectedSession, events: mpsc::Sender<E>) -> SessionId
    where
        E: From<RelayEvent> + Send + 'static,
    {
        let ConnectedSession { session, reader } = connected;
        let id = session.id();
        let relay = OutputRelay::new(id, reader).spawn(events, session.child_token());
        info!(session = %id, "Registered session {}", session.label());

        self.order.push(id);
        self.entries.insert(id, Entry { session, relay });
        id
    }

    pub fn lookup(&self, id: SessionId) -> Option<&RemoteSession> {
        self.entries.get(&id).map(|e| &e.session)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Forget a session without closing it.
    pub fn unregister(&mut self, id: SessionId) -> Option<RemoteSession> {
        self.order.retain(|i| *i != id);
        let entry = self.entries.remove(&id)?;
        debug!(session = %id, "Unregistered session");
        Some(entry.session)
    }

    /// Remove and close a session; the returned handle resolves once its relay stops.
    pub fn close(&mut self, id: SessionId) -> Result<JoinHandle<()>> {
        self.order.retain(|i| *i != id);
        let entry = self
            .entries
            .remove(&id)
            .ok_or_else(|| AppError::RoutingError(format!("No open session {id}")))?;
        info!(session = %id, "Closing session {}", entry.session.label());
        entry.session.close();
        Ok(entry.relay)
    }

    pub fn close_all(&mut self) {
        for id in self.order.clone() {
            let _ = self.close(id);
        }
    }

    /// Send bytes to exactly the session `id`.
    pub fn route(&self, id: SessionId, data: &[u8]) -> Result<()> {
        self.lookup(id)
            .ok_or_else(|| AppError::RoutingError(format!("No open session {id}")))?
            .send(data)
    }

    /// Open sessions in the order they were registered.
    pub fn ids(&self) -> &[SessionId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
