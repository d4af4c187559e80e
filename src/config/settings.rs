use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, Result};

const SETTINGS_FILE: &str = "config.toml";
const CONNECTIONS_FILE: &str = "connections.json";
const COMMANDS_FILE: &str = "commands.json";

/// How unknown or changed server host keys are treated.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyPolicy {
    /// Accept every host key without looking at known_hosts.
    AcceptAny,
    /// Trust on first use: learn unknown keys, reject changed ones.
    AcceptNew,
    /// Only accept keys already present in known_hosts.
    Strict,
}

impl std::fmt::Display for HostKeyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HostKeyPolicy::AcceptAny => "accept-any",
            HostKeyPolicy::AcceptNew => "accept-new",
            HostKeyPolicy::Strict => "strict",
        };
        f.write_str(name)
    }
}

/// Application settings
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub default_port: u16,
    /// Seconds allowed for TCP connect, handshake and authentication.
    pub connection_timeout: u64,
    pub host_key_policy: HostKeyPolicy,
    pub known_hosts_path: Option<String>,
    pub terminal_type: String,
    pub pty_cols: u32,
    pub pty_rows: u32,
    pub scrollback_lines: usize,
    pub event_buffer: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            default_port: 22,
            connection_timeout: 20,
            host_key_policy: HostKeyPolicy::AcceptNew,
            known_hosts_path: None,
            terminal_type: "xterm-256color".to_string(),
            pty_cols: 120,
            pty_rows: 40,
            scrollback_lines: 5000,
            event_buffer: 256,
        }
    }
}

impl AppSettings {
    /// Load settings from `dir/config.toml`. A missing file is created with the defaults.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(SETTINGS_FILE);
        if !path.exists() {
            let settings = Self::default();
            settings.save(dir)?;
            info!("Wrote default settings to {}", path.display());
            return Ok(settings);
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| AppError::ConfigError(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| AppError::ConfigError(format!("Failed to parse config file: {}", e)))
    }

    /// Persist settings to `dir/config.toml`
    pub fn save(&self, dir: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| AppError::ConfigError(format!("Failed to serialize config: {}", e)))?;
        fs::write(dir.join(SETTINGS_FILE), toml)
            .map_err(|e| AppError::ConfigError(format!("Failed to write config: {}", e)))?;
        Ok(())
    }

    /// Resolved known_hosts location (`~/.ssh/known_hosts` unless overridden).
    pub fn known_hosts(&self) -> Result<PathBuf> {
        if let Some(path) = &self.known_hosts_path {
            return Ok(crate::expand_tilde(path));
        }
        dirs::home_dir()
            .map(|home| home.join(".ssh").join("known_hosts"))
            .ok_or_else(|| AppError::ConfigError("Cannot determine home directory".to_string()))
    }
}

/// Filesystem locations used by the application.
#[derive(Clone, Debug)]
pub struct DataPaths {
    pub dir: PathBuf,
}

impl DataPaths {
    /// Use `dir` if given, otherwise `~/.config/jetssh`; the directory is created.
    pub fn resolve(dir: Option<PathBuf>) -> Result<Self> {
        let dir = match dir {
            Some(dir) => dir,
            None => dirs::home_dir()
                .map(|home| home.join(".config").join("jetssh"))
                .ok_or_else(|| {
                    AppError::ConfigError("Cannot determine home directory".to_string())
                })?,
        };

        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| {
                AppError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        Ok(Self { dir })
    }

    pub fn connections(&self) -> PathBuf {
        self.dir.join(CONNECTIONS_FILE)
    }

    pub fn commands(&self) -> PathBuf {
        self.dir.join(COMMANDS_FILE)
    }
}
