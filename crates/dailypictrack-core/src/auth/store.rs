//! Storage for the single session credential.
//!
//! Every backend holds at most one value. `set` replaces whatever was there,
//! `remove` is idempotent, and an empty store is `Ok(None)` rather than an
//! error.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::debug;

/// File name of the persisted credential inside the cache directory
const TOKEN_FILE: &str = "token";

/// Persistent home of the bearer credential.
///
/// Implementations are shared between concurrent requests, so each operation
/// must be atomic with respect to the single stored value.
pub trait TokenStore: Send + Sync {
    /// Store `token`, replacing any existing credential.
    fn set(&self, token: &str) -> Result<()>;

    /// Current credential, or `None` if nothing is stored.
    fn get(&self) -> Result<Option<String>>;

    /// Delete the credential. Removing from an empty store succeeds.
    fn remove(&self) -> Result<()>;
}

/// In-process store, used by tests and short-lived sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `token`
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        // A poisoned lock still holds a valid Option; recover it.
        self.token.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn set(&self, token: &str) -> Result<()> {
        *self.slot() = Some(token.to_string());
        Ok(())
    }

    fn get(&self) -> Result<Option<String>> {
        Ok(self.slot().clone())
    }

    fn remove(&self) -> Result<()> {
        self.slot().take();
        Ok(())
    }
}

/// Stores the raw credential string in `<cache_dir>/token`.
pub struct FileTokenStore {
    cache_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn token_path(&self) -> PathBuf {
        self.cache_dir.join(TOKEN_FILE)
    }
}

impl TokenStore for FileTokenStore {
    fn set(&self, token: &str) -> Result<()> {
        std::fs::create_dir_all(&self.cache_dir)
            .context("Failed to create cache directory")?;
        std::fs::write(self.token_path(), token).context("Failed to write token file")?;
        debug!(path = %self.token_path().display(), "Stored session token");
        Ok(())
    }

    fn get(&self) -> Result<Option<String>> {
        let path = self.token_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read token file")?;
        let token = contents.trim();
        if token.is_empty() {
            Ok(None)
        } else {
            Ok(Some(token.to_string()))
        }
    }

    fn remove(&self) -> Result<()> {
        match std::fs::remove_file(self.token_path()) {
            Ok(()) => {
                debug!("Removed session token file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to delete token file"),
        }
    }
}
