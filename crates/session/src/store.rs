//! Access-token persistence in client-local storage.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use basaltpass_auth::AccessToken;

/// File name used by [`FileTokenStore`] inside its storage directory.
pub const SESSION_FILE: &str = "session.json";

/// Token storage abstraction.
///
/// Purely mechanical: no validation happens here.
pub trait TokenStore: Send + Sync {
    /// Read the stored token, if any.
    fn get(&self) -> Option<AccessToken>;

    /// Persist `token`, replacing any previous one.
    fn set(&self, token: &AccessToken) -> Result<(), StoreError>;

    /// Remove the stored token. Clearing an empty store is not an error.
    fn clear(&self) -> Result<(), StoreError>;
}

/// Token store error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode stored session: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory store
// ─────────────────────────────────────────────────────────────────────────────

/// Process-local token store (tests, embedding, ephemeral sessions).
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<AccessToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: AccessToken) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<AccessToken> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set(&self, token: &AccessToken) -> Result<(), StoreError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File-backed store
// ─────────────────────────────────────────────────────────────────────────────

/// On-disk record. `access_token` is the storage key.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    access_token: Option<AccessToken>,
}

/// JSON-file token store, the native counterpart of browser local storage.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store the token in `dir/session.json`. The directory is created on first write.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<AccessToken> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "failed to read stored session: {e}");
                return None;
            }
        };

        match serde_json::from_str::<StoredSession>(&content) {
            Ok(stored) => stored
                .access_token
                .and_then(|t| AccessToken::non_empty(t.as_str())),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "ignoring malformed stored session: {e}"
                );
                None
            }
        }
    }

    fn set(&self, token: &AccessToken) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let body = serde_json::to_vec_pretty(&StoredSession {
            access_token: Some(token.clone()),
        })?;

        // Write-then-rename: readers see either the old file or the new one.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}
