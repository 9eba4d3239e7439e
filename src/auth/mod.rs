//! Authentication: bearer token storage and the OAuth authorization-code flow
//!
//! The token lives behind the [`CredentialStore`] trait so services never
//! care whether it is kept in memory or in the encrypted credentials file.

mod exchange;
mod file_store;
pub mod oauth;

pub use exchange::TokenExchange;
pub use file_store::EncryptedFileStore;

use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use crate::error::{Error, Result};

/// Failures of a credential store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("Credential file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The decrypted payload is not valid JSON
    #[error("Credential file is malformed: {0}")]
    Format(#[from] serde_json::Error),

    /// Encryption or decryption failed (wrong machine key or tampered file)
    #[error("Failed to encrypt or decrypt credentials")]
    Crypto,
}

/// Secure key-value storage for the single bearer token.
///
/// Setting a token fully replaces the previous one.
pub trait CredentialStore: Send + Sync {
    /// Current token, if any
    fn token(&self) -> Result<Option<String>, StoreError>;

    /// Replace the stored token
    fn set_token(&self, token: &str) -> Result<(), StoreError>;

    /// Remove the stored token (logout)
    fn clear(&self) -> Result<(), StoreError>;

    /// Check if a token is stored; read errors count as "no token"
    fn has_token(&self) -> bool {
        self.token().map(|t| t.is_some()).unwrap_or(false)
    }
}

/// In-process store, for tests and sessions that should not persist
#[derive(Debug, Default)]
pub struct MemoryStore {
    token: Mutex<Option<String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a token
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.token.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn set_token(&self, token: &str) -> Result<(), StoreError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }
}

/// Read the token for an authenticated request, failing fast when absent.
pub(crate) fn require_token(store: &dyn CredentialStore) -> Result<String> {
    store.token()?.ok_or_else(|| {
        tracing::warn!("Authorization token missing");
        Error::MissingCredential
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_replaces_and_clears() {
        let store = MemoryStore::new();
        assert!(!store.has_token());

        store.set_token("first").unwrap();
        store.set_token("second").unwrap();
        assert_eq!(store.token().unwrap().as_deref(), Some("second"));

        store.clear().unwrap();
        assert!(store.token().unwrap().is_none());
    }

    #[test]
    fn missing_token_is_missing_credential() {
        let store = MemoryStore::new();
        assert!(matches!(require_token(&store), Err(Error::MissingCredential)));

        let store = MemoryStore::with_token("abc");
        assert_eq!(require_token(&store).unwrap(), "abc");
    }
}
