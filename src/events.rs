use crossterm::event::Event;

use crate::error::Result;
use crate::session::{ConnectedSession, RelayEvent, SessionId};
use crate::transfer::TransferReport;

#[derive(Debug)]
pub enum AppEvent {
    Input(Event),
    Tick,
    /// Output or closure reported by a session relay
    Relay(RelayEvent),
    /// A launch task finished connecting (or failed to)
    SessionOpened {
        label: String,
        result: Result<ConnectedSession>,
    },
    TransferFinished {
        session: SessionId,
        result: Result<TransferReport>,
    },
}

impl From<RelayEvent> for AppEvent {
    fn from(event: RelayEvent) -> Self {
        AppEvent::Relay(event)
    }
}
