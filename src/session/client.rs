use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use russh::client::{self, AuthResult, KeyboardInteractiveAuthResponse};
use russh::keys::{self, PrivateKeyWithHashAlg, ssh_key};
use russh::{ChannelStream, Disconnect, MethodKind};
use russh_sftp::client::SftpSession;
use tracing::{debug, info, warn};

use crate::config::profiles::{ConnectionProfile, Credential};
use crate::config::settings::{AppSettings, HostKeyPolicy};
use crate::error::{AppError, Result};
use crate::filesystem::SftpFiles;

/// Secrets collected from the user when a session is launched. Never persisted.
#[derive(Clone, Default)]
pub struct LaunchSecret {
    pub password: Option<String>,
    pub passphrase: Option<String>,
}

impl fmt::Debug for LaunchSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchSecret")
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("passphrase", &self.passphrase.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Connection parameters derived from the application settings.
#[derive(Clone, Debug)]
pub struct ConnectOptions {
    pub default_port: u16,
    pub timeout: Duration,
    pub host_key_policy: HostKeyPolicy,
    pub known_hosts: PathBuf,
    pub terminal_type: String,
    pub cols: u32,
    pub rows: u32,
}

impl ConnectOptions {
    pub fn from_settings(settings: &AppSettings) -> Result<Self> {
        Ok(Self {
            default_port: settings.default_port,
            timeout: Duration::from_secs(settings.connection_timeout),
            host_key_policy: settings.host_key_policy,
            known_hosts: settings.known_hosts()?,
            terminal_type: settings.terminal_type.clone(),
            cols: settings.pty_cols,
            rows: settings.pty_rows,
        })
    }
}

pub struct ClientHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
    known_hosts: PathBuf,
}

impl client::Handler for ClientHandler {
    type Error = AppError;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let fingerprint = server_public_key.fingerprint(Default::default());
        match self.policy {
            HostKeyPolicy::AcceptAny => {
                warn!(
                    "Accepting host key {} for {}:{} without verification",
                    fingerprint, self.host, self.port
                );
                Ok(true)
            }
            HostKeyPolicy::Strict => {
                let known = keys::check_known_hosts_path(
                    &self.host,
                    self.port,
                    server_public_key,
                    &self.known_hosts,
                )
                .map_err(|e| host_key_error(&self.host, e))?;
                if !known {
                    warn!("Rejecting unknown host key {} for {}", fingerprint, self.host);
                }
                Ok(known)
            }
            HostKeyPolicy::AcceptNew => {
                let known = keys::check_known_hosts_path(
                    &self.host,
                    self.port,
                    server_public_key,
                    &self.known_hosts,
                )
                .map_err(|e| host_key_error(&self.host, e))?;
                if !known {
                    info!("Learning new host key {} for {}", fingerprint, self.host);
                    keys::known_hosts::learn_known_hosts_path(
                        &self.host,
                        self.port,
                        server_public_key,
                        &self.known_hosts,
                    )
                    .map_err(|e| host_key_error(&self.host, e))?;
                }
                Ok(true)
            }
        }
    }
}

fn host_key_error(host: &str, e: keys::Error) -> AppError {
    match e {
        keys::Error::KeyChanged { line } => AppError::HostKeyError(format!(
            "Host key for {} has changed (known_hosts line {})",
            host, line
        )),
        other => AppError::HostKeyError(format!("known_hosts check for {} failed: {}", host, other)),
    }
}

/// An authenticated SSH connection. Cloning shares the same connection.
#[derive(Clone)]
pub struct SshTransport {
    handle: Arc<client::Handle<ClientHandler>>,
    label: String,
}

impl SshTransport {
    /// Connect and authenticate, bounded by the configured timeout.
    pub async fn connect(
        profile: &ConnectionProfile,
        secret: &LaunchSecret,
        options: &ConnectOptions,
    ) -> Result<Self> {
        let (host, port) = profile.host_port(options.default_port);
        let label = format!("{}@{}:{}", profile.username, host, port);
        info!("Connecting to {}", label);

        let attempt = Self::establish(options, host.clone(), port);
        let mut handle = tokio::time::timeout(options.timeout, attempt)
            .await
            .map_err(|_| {
                AppError::SshConnectionError(format!(
                    "Timed out after {}s connecting to {}",
                    options.timeout.as_secs(),
                    label
                ))
            })??;

        if let Err(e) = Self::authenticate(&mut handle, profile, secret).await {
            let _ = handle.disconnect(Disconnect::ByApplication, "", "").await;
            return Err(e);
        }

        info!("Authenticated to {}", label);
        Ok(Self {
            handle: Arc::new(handle),
            label,
        })
    }

    async fn establish(
        options: &ConnectOptions,
        host: String,
        port: u16,
    ) -> Result<client::Handle<ClientHandler>> {
        let config = Arc::new(client::Config {
            inactivity_timeout: None,
            ..Default::default()
        });
        let handler = ClientHandler {
            host: host.clone(),
            port,
            policy: options.host_key_policy,
            known_hosts: options.known_hosts.clone(),
        };

        client::connect(config, (host.clone(), port), handler)
            .await
            .map_err(|e| match e {
                AppError::RusshError(russh::Error::UnknownKey) => AppError::HostKeyError(format!(
                    "Host key for {} is not in known_hosts",
                    host
                )),
                e @ AppError::HostKeyError(_) => e,
                other => AppError::SshConnectionError(format!(
                    "Failed to connect to {}:{}: {}",
                    host, port, other
                )),
            })
    }

    async fn authenticate(
        session: &mut client::Handle<ClientHandler>,
        profile: &ConnectionProfile,
        secret: &LaunchSecret,
    ) -> Result<()> {
        let user = &profile.username;
        match &profile.credential {
            Credential::KeyFile(path) => {
                let key_path = crate::expand_tilde(path);
                let private_key = keys::load_secret_key(&key_path, secret.passphrase.as_deref())
                    .map_err(|e| {
                        AppError::AuthenticationError(format!(
                            "Failed to load private key {}: {}",
                            key_path.display(),
                            e
                        ))
                    })?;

                let algo = session.best_supported_rsa_hash().await?.flatten();
                let key = PrivateKeyWithHashAlg::new(Arc::new(private_key), algo);
                let auth_result = session.authenticate_publickey(user, key).await?;
                if !auth_result.success() {
                    return Err(AppError::AuthenticationError(
                        "Public key authentication failed".to_string(),
                    ));
                }
            }
            Credential::PasswordPrompt => {
                let password = secret.password.as_deref().ok_or_else(|| {
                    AppError::AuthenticationError("Password is required".to_string())
                })?;

                let auth_result = session.authenticate_password(user, password).await?;
                if auth_result.success() {
                    return Ok(());
                }

                let keyboard_interactive = matches!(
                    &auth_result,
                    AuthResult::Failure { remaining_methods, .. }
                        if remaining_methods.contains(&MethodKind::KeyboardInteractive)
                );
                if !keyboard_interactive {
                    return Err(AppError::AuthenticationError(
                        "Password authentication failed".to_string(),
                    ));
                }

                debug!("Password rejected, trying keyboard-interactive");
                let mut step = session
                    .authenticate_keyboard_interactive_start(user, None)
                    .await?;
                loop {
                    match step {
                        KeyboardInteractiveAuthResponse::Success => break,
                        KeyboardInteractiveAuthResponse::Failure { .. } => {
                            return Err(AppError::AuthenticationError(
                                "Keyboard-interactive authentication failed".to_string(),
                            ));
                        }
                        KeyboardInteractiveAuthResponse::InfoRequest { ref prompts, .. } => {
                            let answers = prompts.iter().map(|_| password.to_string()).collect();
                            step = session
                                .authenticate_keyboard_interactive_respond(answers)
                                .await?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Open an interactive shell channel with a PTY.
    pub async fn open_shell(&self, options: &ConnectOptions) -> Result<ChannelStream<client::Msg>> {
        let channel = self.handle.channel_open_session().await?;
        channel
            .request_pty(
                true,
                &options.terminal_type,
                options.cols,
                options.rows,
                0,
                0,
                &[],
            )
            .await?;
        channel.request_shell(true).await?;
        debug!("Shell channel opened on {}", self.label);
        Ok(channel.into_stream())
    }

    /// Open a separate SFTP channel on this connection.
    pub async fn open_file_transfer(&self) -> Result<SftpFiles> {
        let channel = self.handle.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;
        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| AppError::TransferError(format!("SFTP session creation failed: {e}")))?;
        debug!("SFTP channel opened on {}", self.label);
        Ok(SftpFiles::new(sftp))
    }

    pub async fn disconnect(&self) -> Result<()> {
        info!("Disconnecting from {}", self.label);
        self.handle
            .disconnect(Disconnect::ByApplication, "", "")
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ConnectOptions {
        ConnectOptions {
            default_port: 22,
            timeout: Duration::from_secs(5),
            host_key_policy: HostKeyPolicy::AcceptNew,
            known_hosts: PathBuf::from("/tmp/jetssh-test-known-hosts"),
            terminal_type: "xterm-256color".to_string(),
            cols: 80,
            rows: 24,
        }
    }

    #[test]
    fn test_launch_secret_debug_redacts() {
        let secret = LaunchSecret {
            password: Some("hunter2".to_string()),
            passphrase: None,
        };
        let shown = format!("{:?}", secret);
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("***"));
    }

    #[test]
    fn test_options_from_settings() {
        let settings = AppSettings {
            connection_timeout: 7,
            known_hosts_path: Some("/tmp/kh".to_string()),
            ..AppSettings::default()
        };
        let opts = ConnectOptions::from_settings(&settings).unwrap();
        assert_eq!(opts.timeout, Duration::from_secs(7));
        assert_eq!(opts.known_hosts, PathBuf::from("/tmp/kh"));
        assert_eq!(opts.host_key_policy, HostKeyPolicy::AcceptNew);
    }

    #[tokio::test]
    async fn test_connection_refused_is_connection_error() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let profile = ConnectionProfile::new(
            format!("127.0.0.1:{port}"),
            "nobody".to_string(),
            Credential::PasswordPrompt,
        );
        let secret = LaunchSecret {
            password: Some("x".to_string()),
            passphrase: None,
        };
        match SshTransport::connect(&profile, &secret, &options()).await {
            Err(AppError::SshConnectionError(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("connection should fail"),
        }
    }

    #[tokio::test]
    #[ignore = "requires a running ssh server"]
    async fn test_connect_docker() {
        let profile = ConnectionProfile::new(
            "127.0.0.1:2222".to_string(),
            "dockeruser".to_string(),
            Credential::PasswordPrompt,
        );
        let secret = LaunchSecret {
            password: Some("dockerpass".to_string()),
            passphrase: None,
        };
        let opts = ConnectOptions {
            host_key_policy: HostKeyPolicy::AcceptAny,
            ..options()
        };
        let transport = SshTransport::connect(&profile, &secret, &opts).await.unwrap();
        transport.open_shell(&opts).await.unwrap();
        transport.disconnect().await.unwrap();
    }
}
