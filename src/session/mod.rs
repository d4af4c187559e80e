//! Live SSH sessions: transport, shell channel I/O, output relays and the
//! registry mapping session ids to their resources.

pub mod client;
pub mod registry;
pub mod relay;
pub mod remote;

use std::fmt;

use uuid::Uuid;

pub use client::{ConnectOptions, LaunchSecret, SshTransport};
pub use registry::SessionRegistry;
pub use relay::{CloseReason, OutputRelay, RelayEvent};
pub use remote::{ConnectedSession, RemoteSession, ShellReader};

/// Identifier of one open session, independent of the host it points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let simple = self.0.simple().to_string();
        f.write_str(&simple[..8])
    }
}

/// Control bytes sent straight to the channel instead of through the input line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlInput {
    /// Ctrl+C
    Interrupt,
    /// Ctrl+D
    EndOfInput,
}

impl ControlInput {
    pub fn byte(self) -> u8 {
        match self {
            ControlInput::Interrupt => 0x03,
            ControlInput::EndOfInput => 0x04,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

    /// A channel whose reads always fail and whose writes are discarded.
    pub(crate) struct BrokenChannel;

    impl AsyncRead for BrokenChannel {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::other("connection reset by peer")))
        }
    }

    impl AsyncWrite for BrokenChannel {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }
}
