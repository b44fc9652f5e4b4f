//! Credential persistence.
//!
//! The session credential outlives the in-memory cache, so it lives in a host
//! key-value slot (`KeyValueSlot`). [`CredentialStore`] uses exactly one key of
//! that slot.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use launchpad_core::Credential;
use thiserror::Error;
use tracing::debug;

/// The one key the credential is stored under.
pub const CREDENTIAL_KEY: &str = "token";

/// Errors from the backing key-value slot.
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    /// Reading or writing the slot failed.
    #[error("credential slot I/O error: {0}")]
    Io(#[from] io::Error),

    /// The slot's lock was poisoned by a panicking writer.
    #[error("credential slot lock poisoned")]
    Poisoned,

    /// Slot keys must be plain names.
    #[error("invalid slot key: {0}")]
    InvalidKey(String),
}

/// A host-provided key-value slot.
pub trait KeyValueSlot {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, CredentialStoreError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), CredentialStoreError>;

    /// Remove a value. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be written.
    fn remove(&self, key: &str) -> Result<(), CredentialStoreError>;
}

/// Process-local slot. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueSlot for MemorySlot {
    fn get(&self, key: &str) -> Result<Option<String>, CredentialStoreError> {
        let values = self
            .values
            .lock()
            .map_err(|_| CredentialStoreError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CredentialStoreError> {
        self.values
            .lock()
            .map_err(|_| CredentialStoreError::Poisoned)?
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CredentialStoreError> {
        self.values
            .lock()
            .map_err(|_| CredentialStoreError::Poisoned)?
            .remove(key);
        Ok(())
    }
}

/// Slot backed by one file per key in a directory.
///
/// Survives process restarts, which is what makes `isLoggedIn` stick across
/// sessions.
#[derive(Debug, Clone)]
pub struct FileSlot {
    dir: PathBuf,
}

impl FileSlot {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the slot files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, CredentialStoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(CredentialStoreError::InvalidKey(key.to_owned()));
        }
        Ok(self.dir.join(key))
    }
}

impl KeyValueSlot for FileSlot {
    fn get(&self, key: &str) -> Result<Option<String>, CredentialStoreError> {
        match std::fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CredentialStoreError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        // The visible file is only ever a complete value.
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(tmp, path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CredentialStoreError> {
        match std::fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Holds the single session credential.
#[derive(Debug, Clone)]
pub struct CredentialStore<S> {
    slot: S,
}

impl<S: KeyValueSlot> CredentialStore<S> {
    #[must_use]
    pub const fn new(slot: S) -> Self {
        Self { slot }
    }

    /// Current credential, if one is stored. An empty stored value counts as
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be read.
    pub fn get(&self) -> Result<Option<Credential>, CredentialStoreError> {
        Ok(self
            .slot
            .get(CREDENTIAL_KEY)?
            .map(Credential::new)
            .filter(|c| !c.is_empty()))
    }

    /// Returns true if a credential is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be read.
    pub fn is_present(&self) -> Result<bool, CredentialStoreError> {
        Ok(self.get()?.is_some())
    }

    /// Persist a new credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be written.
    pub fn set(&self, credential: &Credential) -> Result<(), CredentialStoreError> {
        debug!("persisting session credential");
        self.slot.set(CREDENTIAL_KEY, credential.expose())
    }

    /// Forget the credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be written.
    pub fn clear(&self) -> Result<(), CredentialStoreError> {
        debug!("clearing session credential");
        self.slot.remove(CREDENTIAL_KEY)
    }

    /// The backing slot.
    pub const fn slot(&self) -> &S {
        &self.slot
    }
}
