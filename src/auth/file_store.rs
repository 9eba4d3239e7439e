//! Encrypted file-based credential storage
//!
//! The bearer token is stored encrypted with AES-256-GCM. The encryption key
//! is derived from machine-specific identifiers, so the file is useless when
//! copied to another machine.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::{CredentialStore, StoreError};

const NONCE_SIZE: usize = 12;

#[derive(Debug, Serialize, Deserialize)]
struct StoredCredentials {
    bearer_token: String,
}

/// Credential store backed by a single encrypted file
pub struct EncryptedFileStore {
    path: PathBuf,
    key: [u8; 32],
    // Serializes read-modify-write of the file within this process.
    lock: Mutex<()>,
}

impl EncryptedFileStore {
    /// Create a store at `path` using the machine-derived key
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            key: derive_key(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the credentials file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<StoredCredentials>, StoreError> {
        let encrypted = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if encrypted.len() < NONCE_SIZE {
            tracing::warn!(path = %self.path.display(), "Credentials file truncated, ignoring");
            return Ok(None);
        }

        let (nonce_bytes, ciphertext) = encrypted.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|_| StoreError::Crypto)?;
        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| StoreError::Crypto)?;

        Ok(Some(serde_json::from_slice(&plaintext)?))
    }

    fn write(&self, creds: &StoredCredentials) -> Result<(), StoreError> {
        let json = serde_json::to_vec(creds)?;

        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|_| StoreError::Crypto)?;

        let mut rng = rand::rng();
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rng.fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, json.as_slice())
            .map_err(|_| StoreError::Crypto)?;

        let mut output = nonce_bytes.to_vec();
        output.extend(ciphertext);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write next to the target and rename, so readers never see a half-written file.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, output)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&tmp)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&tmp, perms)?;
        }

        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl std::fmt::Debug for EncryptedFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedFileStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl CredentialStore for EncryptedFileStore {
    fn token(&self) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read()?.map(|c| c.bearer_token))
    }

    fn set_token(&self, token: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write(&StoredCredentials {
            bearer_token: token.to_string(),
        })
    }

    fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Stable per-machine identifier mixed into the file key
#[cfg(target_os = "linux")]
fn machine_id() -> Option<String> {
    ["/etc/machine-id", "/var/lib/dbus/machine-id"]
        .iter()
        .filter_map(|path| fs::read_to_string(path).ok())
        .map(|id| id.trim().to_string())
        .find(|id| !id.is_empty())
}

#[cfg(target_os = "macos")]
fn machine_id() -> Option<String> {
    command_value(
        "ioreg",
        &["-rd1", "-c", "IOPlatformExpertDevice"],
        "IOPlatformUUID",
        |line| line.split('"').nth(3),
    )
}

#[cfg(target_os = "windows")]
fn machine_id() -> Option<String> {
    command_value(
        "reg",
        &["query", r"HKLM\SOFTWARE\Microsoft\Cryptography", "/v", "MachineGuid"],
        "MachineGuid",
        |line| line.split_whitespace().last(),
    )
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const fn machine_id() -> Option<String> {
    None
}

/// Run `program` and pull a value out of the first output line mentioning `key`
#[cfg(any(target_os = "macos", target_os = "windows"))]
fn command_value(
    program: &str,
    args: &[&str],
    key: &str,
    pick: impl Fn(&str) -> Option<&str>,
) -> Option<String> {
    let output = std::process::Command::new(program).args(args).output().ok()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .find(|line| line.contains(key))
        .and_then(pick)
        .map(str::to_string)
}

/// Derive the encryption key from machine-specific data
fn derive_key() -> [u8; 32] {
    let home = dirs::home_dir().map(|p| p.to_string_lossy().into_owned());
    let mut hasher = Sha256::new();
    if let Some(id) = machine_id() {
        hasher.update(id.as_bytes());
    }
    hasher.update(home.unwrap_or_default().as_bytes());
    hasher.update(b"imagefeed-credentials-v1");
    hasher.finalize().into()
}
