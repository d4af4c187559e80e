use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("SSH connection failed: {0}")]
    SshConnectionError(String),

    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Host key error: {0}")]
    HostKeyError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("SSH write error: {0}")]
    SshWriteError(String),

    #[error("Transfer error: {0}")]
    TransferError(String),

    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    #[error("Routing error: {0}")]
    RoutingError(String),

    #[error("Russh error: {0}")]
    RusshError(#[from] russh::Error),

    #[error("Russh Sftp error: {0}")]
    RusshSftpError(#[from] russh_sftp::client::error::Error),
}

/// Application result type alias
pub type Result<T> = std::result::Result<T, AppError>;
