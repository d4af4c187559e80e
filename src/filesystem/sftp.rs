use std::path::Path;

use russh_sftp::client::SftpSession;
use russh_sftp::client::fs::File as SftpFile;
use russh_sftp::protocol::OpenFlags;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::transfer::FileTransfer;

/// SFTP subsystem channel opened next to a session's shell.
pub struct SftpFiles {
    session: SftpSession,
}

impl SftpFiles {
    pub fn new(session: SftpSession) -> Self {
        Self { session }
    }

    /// Open an SFTP file for reading
    async fn open_for_read(&self, path: &str) -> Result<SftpFile> {
        self.session
            .open_with_flags(path, OpenFlags::READ)
            .await
            .map_err(|e| AppError::TransferError(format!("Failed to open {path} for reading: {e}")))
    }

    /// Open an SFTP file for writing (creates new file or truncates existing)
    async fn open_for_write(&self, path: &str) -> Result<SftpFile> {
        self.session
            .open_with_flags(
                path,
                OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE,
            )
            .await
            .map_err(|e| AppError::TransferError(format!("Failed to open {path} for writing: {e}")))
    }
}

impl FileTransfer for SftpFiles {
    async fn put(&mut self, local: &Path, remote: &str) -> Result<u64> {
        let mut source = tokio::fs::File::open(local).await?;
        let mut target = self.open_for_write(remote).await?;
        let bytes = tokio::io::copy(&mut source, &mut target).await?;
        target.shutdown().await?;
        debug!("Wrote {} bytes to {}", bytes, remote);
        Ok(bytes)
    }

    async fn get(&mut self, remote: &str, local: &Path) -> Result<u64> {
        let mut source = self.open_for_read(remote).await?;
        let mut target = tokio::fs::File::create(local).await?;
        let bytes = tokio::io::copy(&mut source, &mut target).await?;
        target.flush().await?;
        debug!("Read {} bytes from {}", bytes, remote);
        Ok(bytes)
    }

    async fn close(self) -> Result<()> {
        self.session.close().await?;
        Ok(())
    }
}
