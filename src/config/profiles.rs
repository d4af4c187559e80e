use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, Result};

/// How a profile authenticates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credential {
    /// Private key file, path as entered (may start with `~/`).
    KeyFile(String),
    /// Password requested from the user at launch.
    PasswordPrompt,
}

/// A saved SSH connection.
///
/// Persisted as `{"host": .., "user": .., "private_key": ..}` where an empty
/// `private_key` means password authentication.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(from = "ProfileRecord", into = "ProfileRecord")]
pub struct ConnectionProfile {
    pub host: String,
    pub username: String,
    pub credential: Credential,
}

#[derive(Serialize, Deserialize)]
struct ProfileRecord {
    host: String,
    user: String,
    #[serde(default)]
    private_key: String,
}

impl From<ProfileRecord> for ConnectionProfile {
    fn from(record: ProfileRecord) -> Self {
        let credential = if record.private_key.is_empty() {
            Credential::PasswordPrompt
        } else {
            Credential::KeyFile(record.private_key)
        };
        Self {
            host: record.host,
            username: record.user,
            credential,
        }
    }
}

impl From<ConnectionProfile> for ProfileRecord {
    fn from(profile: ConnectionProfile) -> Self {
        let private_key = match profile.credential {
            Credential::KeyFile(path) => path,
            Credential::PasswordPrompt => String::new(),
        };
        Self {
            host: profile.host,
            user: profile.username,
            private_key,
        }
    }
}

impl ConnectionProfile {
    pub fn new(host: String, username: String, credential: Credential) -> Self {
        Self {
            host,
            username,
            credential,
        }
    }

    /// `host (user) [Using Key|Using Password]`
    pub fn display_name(&self) -> String {
        let method = match self.credential {
            Credential::KeyFile(_) => "Using Key",
            Credential::PasswordPrompt => "Using Password",
        };
        format!("{} ({}) [{}]", self.host, self.username, method)
    }

    /// Split the host field into address and port.
    ///
    /// Accepts `host`, `host:port` and `[v6addr]:port`; anything else keeps
    /// the whole string as the address with `default_port`.
    pub fn host_port(&self, default_port: u16) -> (String, u16) {
        let host = self.host.trim();
        if let Some(rest) = host.strip_prefix('[') {
            if let Some((addr, tail)) = rest.split_once(']') {
                let port = tail
                    .strip_prefix(':')
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(default_port);
                return (addr.to_string(), port);
            }
        }
        if let Some((addr, port)) = host.split_once(':') {
            if !port.contains(':') {
                if let Ok(port) = port.parse() {
                    return (addr.to_string(), port);
                }
            }
        }
        (host.to_string(), default_port)
    }
}

/// Ordered list of connection profiles backed by a JSON file.
pub struct ProfileStore {
    path: PathBuf,
    profiles: Vec<ConnectionProfile>,
}

impl ProfileStore {
    /// Open the store at `path`, loading any existing profiles.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let profiles = Self::load(&path)?;
        info!("Loaded {} connection profiles", profiles.len());
        Ok(Self { path, profiles })
    }

    /// Read the persisted list; a missing file is an empty list.
    pub fn load(path: &Path) -> Result<Vec<ConnectionProfile>> {
        Ok(super::read_json(path)?.unwrap_or_default())
    }

    /// Overwrite the file at `path` with `profiles`.
    pub fn save_to(path: &Path, profiles: &[ConnectionProfile]) -> Result<()> {
        super::write_json(path, profiles)
    }

    pub fn save(&self) -> Result<()> {
        Self::save_to(&self.path, &self.profiles)
    }

    pub fn profiles(&self) -> &[ConnectionProfile] {
        &self.profiles
    }

    pub fn get(&self, index: usize) -> Option<&ConnectionProfile> {
        self.profiles.get(index)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Append a profile and persist. Duplicates are allowed.
    pub fn add(&mut self, profile: ConnectionProfile) -> Result<()> {
        self.profiles.push(profile);
        self.save()
    }

    /// Remove the profile at `index` and persist.
    pub fn remove(&mut self, index: usize) -> Result<ConnectionProfile> {
        if index >= self.profiles.len() {
            return Err(AppError::ValidationError(format!(
                "No connection at position {}",
                index
            )));
        }
        let removed = self.profiles.remove(index);
        self.save()?;
        Ok(removed)
    }
}
