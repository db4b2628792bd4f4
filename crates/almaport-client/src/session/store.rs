//! Session token storage.
//!
//! Persists the credential pair in `<base>/session.json` with restricted
//! permissions (0600). Tokens are never logged or displayed in full.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::paths;

/// Session token file name.
const SESSION_FILE: &str = "session.json";

pub(crate) fn now_millis_u64() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| u64::try_from(d.as_millis()).ok())
        .unwrap_or(u64::MAX)
}

/// Token roles within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Short-lived bearer token attached to API calls
    Access,
    /// Long-lived token used solely to mint new access tokens
    Refresh,
}

/// A stored bearer token with absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    /// The opaque token value
    pub value: String,
    /// Expiry timestamp in milliseconds since epoch
    pub expires: u64,
}

impl StoredToken {
    /// Creates a token expiring `ttl` from now.
    pub fn new(value: impl Into<String>, ttl: Duration) -> Self {
        let expires = now_millis_u64()
            .saturating_add(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX));
        Self {
            value: value.into(),
            expires,
        }
    }

    /// Returns true if the token's expiry has passed.
    pub fn is_expired(&self) -> bool {
        now_millis_u64() >= self.expires
    }
}

/// Storage seam for the session credential pair.
///
/// Injected into the session client at construction so tests can swap in
/// fakes. Expired tokens read as absent.
pub trait TokenStore: Send + Sync {
    /// Reads a token, returning None when missing or expired.
    ///
    /// # Errors
    /// Returns an error if the operation fails.
    fn get(&self, kind: TokenKind) -> Result<Option<StoredToken>>;

    /// Writes a token, replacing any previous value for that role.
    ///
    /// # Errors
    /// Returns an error if the operation fails.
    fn set(&self, kind: TokenKind, token: StoredToken) -> Result<()>;

    /// Removes both tokens. Safe to call when nothing is stored.
    ///
    /// # Errors
    /// Returns an error if the operation fails.
    fn clear(&self) -> Result<()>;
}

/// On-disk session document. Keys match the original cookie names.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct SessionFileDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<StoredToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<StoredToken>,
}

impl SessionFileDoc {
    fn slot(&self, kind: TokenKind) -> &Option<StoredToken> {
        match kind {
            TokenKind::Access => &self.access_token,
            TokenKind::Refresh => &self.refresh_token,
        }
    }

    fn slot_mut(&mut self, kind: TokenKind) -> &mut Option<StoredToken> {
        match kind {
            TokenKind::Access => &mut self.access_token,
            TokenKind::Refresh => &mut self.refresh_token,
        }
    }
}

/// File-backed token store.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Creates a store backed by the given file path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Creates a store backed by `<almaport home>/session.json`.
    pub fn open_default() -> Self {
        Self::new(paths::almaport_home().join(SESSION_FILE))
    }

    fn load(&self) -> Result<SessionFileDoc> {
        if !self.path.exists() {
            return Ok(SessionFileDoc::default());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session from {}", self.path.display()))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse session from {}", self.path.display()))
    }

    fn save(&self, doc: &SessionFileDoc) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = serde_json::to_string_pretty(doc).context("Failed to serialize session")?;

        // Write with restricted permissions
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&self.path, contents)
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, kind: TokenKind) -> Result<Option<StoredToken>> {
        let doc = self.load()?;
        Ok(doc.slot(kind).clone().filter(|token| !token.is_expired()))
    }

    fn set(&self, kind: TokenKind, token: StoredToken) -> Result<()> {
        let mut doc = self.load()?;
        *doc.slot_mut(kind) = Some(token);
        self.save(&doc)
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove session at {}", self.path.display())),
        }
    }
}

/// In-memory token store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: Mutex<SessionFileDoc>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, kind: TokenKind) -> Result<Option<StoredToken>> {
        let doc = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("session store poisoned"))?;
        Ok(doc.slot(kind).clone().filter(|token| !token.is_expired()))
    }

    fn set(&self, kind: TokenKind, token: StoredToken) -> Result<()> {
        let mut doc = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("session store poisoned"))?;
        *doc.slot_mut(kind) = Some(token);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut doc = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("session store poisoned"))?;
        *doc = SessionFileDoc::default();
        Ok(())
    }
}

/// Returns a masked version of a token for display (first 12 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.len() <= 16 {
        return "***".to_string();
    }
    format!("{}...", &token[..12])
}
