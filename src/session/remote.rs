use std::fmt;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::SessionId;
use super::client::{ConnectOptions, LaunchSecret, SshTransport};
use crate::config::profiles::ConnectionProfile;
use crate::error::{AppError, Result};
use crate::filesystem::SftpFiles;

/// Read half of a session's shell channel, consumed by its output relay.
pub type ShellReader = Box<dyn AsyncRead + Send + Unpin>;

/// One live shell on a remote host.
///
/// Input is queued without blocking and written by a background task in
/// submission order. Dropping or closing the session cancels that task and
/// the relay reading its output.
pub struct RemoteSession {
    id: SessionId,
    label: String,
    transport: Option<SshTransport>,
    outbound: mpsc::UnboundedSender<Bytes>,
    cancel: CancellationToken,
}

/// A freshly opened session together with the reader its relay will own.
pub struct ConnectedSession {
    pub session: RemoteSession,
    pub reader: ShellReader,
}

impl fmt::Debug for ConnectedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectedSession")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for RemoteSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSession")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("closed", &self.cancel.is_cancelled())
            .finish()
    }
}

impl RemoteSession {
    /// Connect to `profile`, authenticate and start an interactive shell.
    pub async fn open(
        profile: &ConnectionProfile,
        secret: &LaunchSecret,
        options: &ConnectOptions,
    ) -> Result<ConnectedSession> {
        let transport = SshTransport::connect(profile, secret, options).await?;
        let stream = match transport.open_shell(options).await {
            Ok(stream) => stream,
            Err(e) => {
                let _ = transport.disconnect().await;
                return Err(AppError::SshConnectionError(format!(
                    "Failed to start shell on {}: {}",
                    transport.label(),
                    e
                )));
            }
        };
        let label = profile.host.clone();
        Ok(Self::attach(SessionId::new(), label, stream, Some(transport)))
    }

    /// Wrap an already established shell stream.
    pub fn attach<S>(
        id: SessionId,
        label: String,
        stream: S,
        transport: Option<SshTransport>,
    ) -> ConnectedSession
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let (outbound, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        tokio::spawn(write_loop(id, writer, rx, cancel.clone()));
        info!(session = %id, "Session {} attached", label);

        ConnectedSession {
            session: Self {
                id,
                label,
                transport,
                outbound,
                cancel,
            },
            reader: Box::new(reader),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn transport(&self) -> Option<&SshTransport> {
        self.transport.as_ref()
    }

    /// Token for tasks that must stop when this session closes.
    pub fn child_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Queue bytes for the shell. Never waits on the network.
    pub fn send(&self, data: &[u8]) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(AppError::SshWriteError(format!(
                "Session {} is closed",
                self.label
            )));
        }
        self.outbound
            .send(Bytes::copy_from_slice(data))
            .map_err(|_| AppError::SshWriteError(format!("Session {} is not writable", self.label)))
    }

    /// Open an SFTP channel on this session's connection.
    pub async fn open_file_transfer(&self) -> Result<SftpFiles> {
        match &self.transport {
            Some(transport) => transport.open_file_transfer().await,
            None => Err(AppError::TransferError(format!(
                "Session {} has no SSH connection",
                self.label
            ))),
        }
    }

    /// Stop the writer and relay, then drop the connection in the background.
    pub fn close(mut self) {
        self.cancel.cancel();
        if let Some(transport) = self.transport.take() {
            tokio::spawn(async move {
                if let Err(e) = transport.disconnect().await {
                    debug!("Disconnect failed: {}", e);
                }
            });
        }
    }
}

impl Drop for RemoteSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn write_loop<W>(
    id: SessionId,
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<Bytes>,
    cancel: CancellationToken,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            data = rx.recv() => {
                let Some(data) = data else { break };
                if let Err(e) = writer.write_all(&data).await {
                    warn!(session = %id, "Write to channel failed: {}", e);
                    break;
                }
                if let Err(e) = writer.flush().await {
                    warn!(session = %id, "Flush to channel failed: {}", e);
                    break;
                }
            }
        }
    }
    let _ = writer.shutdown().await;
    debug!(session = %id, "Writer stopped");
}
