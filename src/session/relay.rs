use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::SessionId;
use crate::ansi;

const READ_BUFFER: usize = 8192;

/// Why a session's output ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    Eof,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// Stripped text for the session's view.
    Output { id: SessionId, text: String },
    /// The channel ended; emitted once, never on cancellation.
    Closed { id: SessionId, reason: CloseReason },
}

/// Moves a session's output to the UI as plain text.
///
/// Reads block until data arrives; there is no polling interval. A UTF-8
/// sequence or escape sequence split across two reads is held back until
/// the rest arrives.
pub struct OutputRelay<R> {
    id: SessionId,
    reader: R,
    pending: Vec<u8>,
    carry: String,
}

impl<R> OutputRelay<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(id: SessionId, reader: R) -> Self {
        Self {
            id,
            reader,
            pending: Vec::new(),
            carry: String::new(),
        }
    }

    pub fn spawn<E>(self, events: mpsc::Sender<E>, cancel: CancellationToken) -> JoinHandle<()>
    where
        R: Send + 'static,
        E: From<RelayEvent> + Send + 'static,
    {
        tokio::spawn(self.run(events, cancel))
    }

    pub async fn run<E>(mut self, events: mpsc::Sender<E>, cancel: CancellationToken)
    where
        E: From<RelayEvent>,
    {
        let id = self.id;
        let mut buf = vec![0u8; READ_BUFFER];
        debug!(session = %id, "Output relay started");

        let reason = loop {
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(session = %id, "Output relay cancelled");
                    return;
                }
                read = self.reader.read(&mut buf) => read,
            };

            match read {
                Ok(0) => break CloseReason::Eof,
                Ok(n) => {
                    let text = self.decode(&buf[..n]);
                    if text.is_empty() {
                        continue;
                    }
                    if events.send(RelayEvent::Output { id, text }.into()).await.is_err() {
                        debug!(session = %id, "Event channel closed, relay exiting");
                        return;
                    }
                }
                Err(e) => {
                    warn!(session = %id, "Read from channel failed: {}", e);
                    break CloseReason::Error(e.to_string());
                }
            }
        };

        let rest = self.flush();
        if !rest.is_empty() {
            let _ = events.send(RelayEvent::Output { id, text: rest }.into()).await;
        }
        info!(session = %id, "Session output ended: {:?}", reason);
        let _ = events.send(RelayEvent::Closed { id, reason }.into()).await;
    }

    fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let text = match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                let text = text.to_string();
                self.pending.clear();
                text
            }
            // Truncated multi-byte character at the end
            Err(e) if e.error_len().is_none() => {
                let valid = e.valid_up_to();
                let text = String::from_utf8_lossy(&self.pending[..valid]).into_owned();
                self.pending.drain(..valid);
                text
            }
            Err(_) => {
                let text = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                text
            }
        };

        self.carry.push_str(&text);
        let combined = std::mem::take(&mut self.carry);
        let (ready, tail) = ansi::split_incomplete(&combined);
        self.carry = tail.to_string();
        ansi::strip(ready)
    }

    fn flush(&mut self) -> String {
        let mut text = std::mem::take(&mut self.carry);
        if !self.pending.is_empty() {
            text.push_str(&String::from_utf8_lossy(&self.pending));
            self.pending.clear();
        }
        ansi::strip(&text)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::AsyncWriteExt;

    use super::*;
    use crate::session::test_support::BrokenChannel;

    async fn next(rx: &mut mpsc::Receiver<RelayEvent>) -> RelayEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("relay event timed out")
            .expect("relay channel closed")
    }

    #[tokio::test]
    async fn test_output_is_stripped_then_closed_on_eof() {
        let (mut remote, local) = tokio::io::duplex(256);
        let id = SessionId::new();
        let (tx, mut rx) = mpsc::channel(8);
        let handle = OutputRelay::new(id, local).spawn(tx, CancellationToken::new());

        remote.write_all(b"\x1b[32mok\x1b[0m\r\n").await.unwrap();
        assert_eq!(
            next(&mut rx).await,
            RelayEvent::Output {
                id,
                text: "ok\r\n".into()
            }
        );

        drop(remote);
        assert_eq!(
            next(&mut rx).await,
            RelayEvent::Closed {
                id,
                reason: CloseReason::Eof
            }
        );
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_read_error_is_reported_once_as_closed() {
        let id = SessionId::new();
        let (tx, mut rx) = mpsc::channel(8);
        let handle = OutputRelay::new(id, BrokenChannel).spawn(tx, CancellationToken::new());

        match next(&mut rx).await {
            RelayEvent::Closed {
                id: closed,
                reason: CloseReason::Error(message),
            } => {
                assert_eq!(closed, id);
                assert!(message.contains("connection reset"));
            }
            other => panic!("expected an error closure, got {other:?}"),
        }
        handle.await.unwrap();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_stops_without_closed_event() {
        let (_remote, local) = tokio::io::duplex(64);
        let (tx, mut rx) = mpsc::channel::<RelayEvent>(8);
        let cancel = CancellationToken::new();
        let handle = OutputRelay::new(SessionId::new(), local).spawn(tx, cancel.clone());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_split_utf8_and_escape_are_carried() {
        let (_remote, local) = tokio::io::duplex(8);
        let mut relay = OutputRelay::new(SessionId::new(), local);

        let check = "✓".as_bytes();
        assert_eq!(relay.decode(&check[..1]), "");
        assert_eq!(relay.decode(&check[1..]), "✓");

        assert_eq!(relay.decode(b"red\x1b[3"), "red");
        assert_eq!(relay.decode(b"1mtext"), "text");
    }

    #[test]
    fn test_flush_releases_leftovers() {
        let (_remote, local) = tokio::io::duplex(8);
        let mut relay = OutputRelay::new(SessionId::new(), local);
        assert_eq!(relay.decode(b"end\xe2\x9c"), "end");
        assert_eq!(relay.flush(), "\u{FFFD}");
    }
}
