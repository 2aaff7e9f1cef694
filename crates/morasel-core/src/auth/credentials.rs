//! Durable storage for the session's token and user record.
//!
//! `CredentialStore` owns the two fixed keys and the JSON encoding of the
//! user; the `CredentialBackend` underneath is a plain string key-value store
//! (OS keychain, a JSON file, or memory).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use keyring::Entry;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::User;

/// Keychain service name
const SERVICE_NAME: &str = "morasel";

/// Key holding the bearer token
pub const TOKEN_KEY: &str = "@morasel_auth_token";

/// Key holding the JSON-encoded user record
pub const USER_KEY: &str = "@morasel_user_data";

/// File name used by `FileBackend`
pub const CREDENTIALS_FILE: &str = "credentials.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Storage error: {0}")]
    Backend(String),
}

/// String key-value persistence.
///
/// Reading a missing key is `Ok(None)` and removing one is `Ok(())`.
#[async_trait]
pub trait CredentialBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

// ============================================================================
// Credential Store
// ============================================================================

/// The persisted projection of a session.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn CredentialBackend>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn CredentialBackend>) -> Self {
        Self { backend }
    }

    /// Store backed by process memory. Nothing survives a restart.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Get the stored bearer token
    pub async fn get_token(&self) -> Result<Option<String>, StoreError> {
        self.backend.get(TOKEN_KEY).await
    }

    /// Get the stored user. A record that no longer parses counts as absent.
    pub async fn get_user(&self) -> Result<Option<User>, StoreError> {
        let Some(raw) = self.backend.get(USER_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!(error = %e, "Stored user record is malformed, ignoring it");
                Ok(None)
            }
        }
    }

    /// Persist token and user together.
    ///
    /// The token is written first. If the user write then fails the token
    /// is removed again, so a later restore never pairs a new token with an
    /// old user.
    pub async fn save_session(&self, token: &str, user: &User) -> Result<(), StoreError> {
        let user_json = serde_json::to_string(user)?;

        self.backend.set(TOKEN_KEY, token).await?;
        if let Err(e) = self.backend.set(USER_KEY, &user_json).await {
            warn!(error = %e, "Failed to store user record, rolling back token");
            if let Err(rollback) = self.backend.remove(TOKEN_KEY).await {
                warn!(error = %rollback, "Failed to roll back stored token");
            }
            return Err(e);
        }
        debug!(user_id = %user.id, "Session persisted");
        Ok(())
    }

    /// Remove both records. Safe to call when nothing is stored.
    pub async fn clear_session(&self) -> Result<(), StoreError> {
        let token = self.backend.remove(TOKEN_KEY).await;
        let user = self.backend.remove(USER_KEY).await;
        token?;
        user?;
        debug!("Session cleared from storage");
        Ok(())
    }
}

// ============================================================================
// Keychain Backend
// ============================================================================

/// OS keychain, one entry per key.
#[derive(Debug, Clone)]
pub struct KeyringBackend {
    service: String,
}

impl KeyringBackend {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialBackend for KeyringBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let (service, key) = (self.service.clone(), key.to_string());
        tokio::task::spawn_blocking(move || -> Result<Option<String>, StoreError> {
            let entry = Entry::new(&service, &key)?;
            match entry.get_password() {
                Ok(value) => Ok(Some(value)),
                Err(keyring::Error::NoEntry) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await?
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let (service, key, value) = (self.service.clone(), key.to_string(), value.to_string());
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let entry = Entry::new(&service, &key)?;
            entry.set_password(&value)?;
            Ok(())
        })
        .await?
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let (service, key) = (self.service.clone(), key.to_string());
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let entry = Entry::new(&service, &key)?;
            match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(e.into()),
            }
        })
        .await?
    }
}

// ============================================================================
// File Backend
// ============================================================================

/// JSON object file, for hosts without a keychain.
///
/// Writes go through a temp file and a rename so a crash never leaves a
/// half-written file behind.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Backend storing `credentials.json` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(CREDENTIALS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_map(&self) -> Result<HashMap<String, String>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_map(&self, map: &HashMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_map().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        if map.remove(key).is_some() {
            self.write_map(&map).await?;
        }
        Ok(())
    }
}

// ============================================================================
// Memory Backend
// ============================================================================

/// In-process map with switchable failures for exercising error paths.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    hang_reads: AtomicBool,
    fail_key: Mutex<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `get` return an error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every `set` and `remove` return an error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every `get` wait forever.
    pub fn hang_reads(&self, hang: bool) {
        self.hang_reads.store(hang, Ordering::SeqCst);
    }

    /// Make writes to one key fail while others succeed.
    pub fn fail_writes_to(&self, key: Option<&str>) {
        *self.fail_key.lock().unwrap_or_else(|e| e.into_inner()) = key.map(str::to_string);
    }

    /// Raw value under `key`, bypassing failure switches.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn check_write(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("write failed".to_string()));
        }
        let fail_key = self.fail_key.lock().unwrap_or_else(|e| e.into_inner());
        if fail_key.as_deref() == Some(key) {
            return Err(StoreError::Backend(format!("write to {} failed", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.hang_reads.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("read failed".to_string()));
        }
        Ok(self.peek(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_write(key)?;
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check_write(key)?;
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}
