//! SSH key pair generation in OpenSSH format.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use russh::keys::ssh_key::private::{DsaKeypair, KeypairData, RsaKeypair};
use russh::keys::ssh_key::{Algorithm, EcdsaCurve, LineEnding, PrivateKey};
use tracing::info;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Rsa,
    Dsa,
    Ecdsa,
    Ed25519,
}

impl KeyAlgorithm {
    pub const ALL: [KeyAlgorithm; 4] = [
        KeyAlgorithm::Rsa,
        KeyAlgorithm::Dsa,
        KeyAlgorithm::Ecdsa,
        KeyAlgorithm::Ed25519,
    ];

    /// Key sizes offered for this algorithm; empty when the size is fixed.
    pub fn allowed_bits(self) -> &'static [u32] {
        match self {
            KeyAlgorithm::Rsa => &[1024, 2048, 3072, 4096],
            KeyAlgorithm::Dsa => &[1024],
            KeyAlgorithm::Ecdsa => &[256, 384, 521],
            KeyAlgorithm::Ed25519 => &[],
        }
    }

    pub fn default_bits(self) -> Option<u32> {
        match self {
            KeyAlgorithm::Rsa => Some(3072),
            KeyAlgorithm::Dsa => Some(1024),
            KeyAlgorithm::Ecdsa => Some(256),
            KeyAlgorithm::Ed25519 => None,
        }
    }

    /// Conventional file name under ~/.ssh
    pub fn default_file_name(self) -> &'static str {
        match self {
            KeyAlgorithm::Rsa => "id_rsa",
            KeyAlgorithm::Dsa => "id_dsa",
            KeyAlgorithm::Ecdsa => "id_ecdsa",
            KeyAlgorithm::Ed25519 => "id_ed25519",
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyAlgorithm::Rsa => "RSA",
            KeyAlgorithm::Dsa => "DSA",
            KeyAlgorithm::Ecdsa => "ECDSA",
            KeyAlgorithm::Ed25519 => "Ed25519",
        };
        f.write_str(name)
    }
}

impl FromStr for KeyAlgorithm {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rsa" => Ok(KeyAlgorithm::Rsa),
            "dsa" => Ok(KeyAlgorithm::Dsa),
            "ecdsa" => Ok(KeyAlgorithm::Ecdsa),
            "ed25519" => Ok(KeyAlgorithm::Ed25519),
            other => Err(AppError::ValidationError(format!(
                "Unknown key algorithm: {other}"
            ))),
        }
    }
}

/// A validated algorithm and size combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySpec {
    algorithm: KeyAlgorithm,
    bits: Option<u32>,
}

impl KeySpec {
    pub fn new(algorithm: KeyAlgorithm, bits: Option<u32>) -> Result<Self> {
        let allowed = algorithm.allowed_bits();
        match bits {
            None if allowed.is_empty() => {}
            Some(b) if allowed.contains(&b) => {}
            None => {
                return Err(AppError::KeyGenerationError(format!(
                    "{algorithm} keys need a size, one of {allowed:?}"
                )));
            }
            Some(b) if allowed.is_empty() => {
                return Err(AppError::KeyGenerationError(format!(
                    "{algorithm} keys have a fixed size, got {b} bits"
                )));
            }
            Some(b) => {
                return Err(AppError::KeyGenerationError(format!(
                    "{b} bits is not valid for {algorithm}, expected one of {allowed:?}"
                )));
            }
        }
        Ok(Self { algorithm, bits })
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    pub fn bits(&self) -> Option<u32> {
        self.bits
    }
}

/// Serialized key pair, ready to write to disk.
#[derive(Clone)]
pub struct GeneratedKey {
    pub algorithm: KeyAlgorithm,
    /// OpenSSH private key PEM, encrypted when a passphrase was given.
    pub private_key: String,
    /// `authorized_keys` line.
    pub public_key: String,
}

impl fmt::Debug for GeneratedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedKey")
            .field("algorithm", &self.algorithm)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

fn keygen_error(algorithm: KeyAlgorithm, e: impl fmt::Display) -> AppError {
    AppError::KeyGenerationError(format!("{algorithm} key generation failed: {e}"))
}

/// Generate a fresh key pair. An empty passphrase leaves the key unencrypted.
pub fn generate(spec: &KeySpec, passphrase: Option<&str>, comment: &str) -> Result<GeneratedKey> {
    let algorithm = spec.algorithm;
    let mut rng = rand::thread_rng();

    let mut key = match algorithm {
        KeyAlgorithm::Ed25519 => PrivateKey::random(&mut rng, Algorithm::Ed25519),
        KeyAlgorithm::Ecdsa => {
            let curve = match spec.bits {
                Some(384) => EcdsaCurve::NistP384,
                Some(521) => EcdsaCurve::NistP521,
                _ => EcdsaCurve::NistP256,
            };
            PrivateKey::random(&mut rng, Algorithm::Ecdsa { curve })
        }
        KeyAlgorithm::Rsa => {
            let bits = spec.bits.unwrap_or(3072) as usize;
            RsaKeypair::random(&mut rng, bits)
                .and_then(|pair| PrivateKey::new(KeypairData::from(pair), comment))
        }
        KeyAlgorithm::Dsa => DsaKeypair::random(&mut rng)
            .and_then(|pair| PrivateKey::new(KeypairData::from(pair), comment)),
    }
    .map_err(|e| keygen_error(algorithm, e))?;
    key.set_comment(comment);

    let public_key = key
        .public_key()
        .to_openssh()
        .map_err(|e| keygen_error(algorithm, e))?;

    if let Some(passphrase) = passphrase.filter(|p| !p.is_empty()) {
        key = key
            .encrypt(&mut rng, passphrase)
            .map_err(|e| keygen_error(algorithm, e))?;
    }
    let private_key = key
        .to_openssh(LineEnding::LF)
        .map_err(|e| keygen_error(algorithm, e))?
        .to_string();

    info!("Generated {} key", algorithm);
    Ok(GeneratedKey {
        algorithm,
        private_key,
        public_key,
    })
}

/// Write the private key, readable only by the owner on unix.
pub fn save_private_key(key: &GeneratedKey, path: &Path) -> Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(key.private_key.as_bytes())?;
    info!("Saved private key to {}", path.display());
    Ok(())
}

pub fn save_public_key(key: &GeneratedKey, path: &Path) -> Result<()> {
    std::fs::write(path, format!("{}\n", key.public_key))?;
    info!("Saved public key to {}", path.display());
    Ok(())
}
