//! Single-file uploads and downloads over a session's SFTP channel.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::session::SshTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    Upload,
    Download,
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferDirection::Upload => write!(f, "Upload"),
            TransferDirection::Download => write!(f, "Download"),
        }
    }
}

/// Outcome of a completed transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub direction: TransferDirection,
    pub source: String,
    pub destination: String,
    pub bytes: u64,
}

impl fmt::Display for TransferReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} complete: {} -> {} ({} bytes)",
            self.direction, self.source, self.destination, self.bytes
        )
    }
}

/// An open file-transfer channel.
pub trait FileTransfer: Send {
    /// Copy a local file to `remote`, replacing it. Returns bytes written.
    fn put(&mut self, local: &Path, remote: &str) -> impl Future<Output = Result<u64>> + Send;

    /// Copy `remote` to a local file, replacing it. Returns bytes written.
    fn get(&mut self, remote: &str, local: &Path) -> impl Future<Output = Result<u64>> + Send;

    /// Release the channel.
    fn close(self) -> impl Future<Output = Result<()>> + Send
    where
        Self: Sized;
}

/// `remote_dir/<basename of local>`
pub fn remote_upload_target(local: &Path, remote_dir: &str) -> Result<String> {
    let name = local
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::TransferError(format!("{} has no file name", local.display())))?;
    let dir = remote_dir.trim_end_matches('/');
    if dir.is_empty() && !remote_dir.is_empty() {
        return Ok(format!("/{name}"));
    }
    if dir.is_empty() {
        return Ok(name.to_string());
    }
    Ok(format!("{dir}/{name}"))
}

/// `local_dir/<basename of remote>`
pub fn local_download_target(remote: &str, local_dir: &Path) -> Result<PathBuf> {
    let name = remote
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::TransferError(format!("{remote} has no file name")))?;
    Ok(local_dir.join(name))
}

fn transfer_error(context: &str, e: AppError) -> AppError {
    match e {
        AppError::TransferError(msg) => AppError::TransferError(format!("{context}: {msg}")),
        other => AppError::TransferError(format!("{context}: {other}")),
    }
}

/// Upload through `files`; the channel is closed whether or not the copy succeeds.
pub async fn upload_with<F: FileTransfer>(
    mut files: F,
    local: &Path,
    remote_dir: &str,
) -> Result<TransferReport> {
    let target = remote_upload_target(local, remote_dir)?;
    let copied = files.put(local, &target).await;
    let closed = files.close().await;

    let bytes = copied.map_err(|e| transfer_error(&format!("Upload to {target} failed"), e))?;
    if let Err(e) = closed {
        warn!("Closing transfer channel failed: {}", e);
    }
    info!("Uploaded {} to {} ({} bytes)", local.display(), target, bytes);
    Ok(TransferReport {
        direction: TransferDirection::Upload,
        source: local.display().to_string(),
        destination: target,
        bytes,
    })
}

/// Download through `files`; the channel is closed whether or not the copy succeeds.
pub async fn download_with<F: FileTransfer>(
    mut files: F,
    remote: &str,
    local_dir: &Path,
) -> Result<TransferReport> {
    let target = local_download_target(remote, local_dir)?;
    let copied = files.get(remote, &target).await;
    let closed = files.close().await;

    let bytes = copied.map_err(|e| transfer_error(&format!("Download of {remote} failed"), e))?;
    if let Err(e) = closed {
        warn!("Closing transfer channel failed: {}", e);
    }
    info!("Downloaded {} to {} ({} bytes)", remote, target.display(), bytes);
    Ok(TransferReport {
        direction: TransferDirection::Download,
        source: remote.to_string(),
        destination: target.display().to_string(),
        bytes,
    })
}

/// Upload `local` into `remote_dir` on the session's connection.
pub async fn upload(transport: &SshTransport, local: &Path, remote_dir: &str) -> Result<TransferReport> {
    let files = transport
        .open_file_transfer()
        .await
        .map_err(|e| transfer_error("Opening SFTP channel failed", e))?;
    upload_with(files, local, remote_dir).await
}

/// Download `remote` into `local_dir` from the session's connection.
pub async fn download(transport: &SshTransport, remote: &str, local_dir: &Path) -> Result<TransferReport> {
    let files = transport
        .open_file_transfer()
        .await
        .map_err(|e| transfer_error("Opening SFTP channel failed", e))?;
    download_with(files, remote, local_dir).await
}
