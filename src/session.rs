//! Local session: which wallet is logged in and its user id
//!
//! Persisted as a small JSON file next to the database.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Normalize a wallet address typed at login.
///
/// Returns `None` for anything that is not a plain alphanumeric id.
pub fn normalize_wallet_address(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.len() < 8 || trimmed.len() > 128 {
        return None;
    }
    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(trimmed.to_ascii_lowercase())
}

pub struct SessionStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current session; a missing file is an empty session
    pub fn load(&self) -> Result<Session> {
        if !self.path.exists() {
            return Ok(Session::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file: {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(Session::default());
        }

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file: {}", self.path.display()))
    }

    fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create session directory: {}", parent.display())
                })?;
            }
        }

        let content = serde_json::to_string_pretty(session)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)
            .with_context(|| format!("Failed to write session file: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace session file: {}", self.path.display()))?;

        Ok(())
    }

    /// Start a session for a wallet; a different wallet drops the cached user id
    pub fn login(&self, wallet_address: &str) -> Result<Session> {
        let _guard = self.write_lock.lock().map_err(|_| anyhow::anyhow!("session lock poisoned"))?;
        let current = self.load()?;

        let session = Session {
            wallet_address: Some(wallet_address.to_string()),
            user_id: current
                .user_id
                .filter(|_| current.wallet_address.as_deref() == Some(wallet_address)),
        };
        self.save(&session)?;
        Ok(session)
    }

    pub fn set_user_id(&self, user_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().map_err(|_| anyhow::anyhow!("session lock poisoned"))?;
        let mut session = self.load()?;
        session.user_id = Some(user_id.to_string());
        self.save(&session)
    }

    pub fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().map_err(|_| anyhow::anyhow!("session lock poisoned"))?;
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove session file: {}", self.path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty_session() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        assert_eq!(store.load().unwrap(), Session::default());
    }

    #[test]
    fn test_login_roundtrip_and_clear() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));

        store.login("0xabc123def").unwrap();
        store.set_user_id("user-1").unwrap();

        let session = store.load().unwrap();
        assert_eq!(session.wallet_address.as_deref(), Some("0xabc123def"));
        assert_eq!(session.user_id.as_deref(), Some("user-1"));

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("walletAddress"));
        assert!(raw.contains("userId"));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), Session::default());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_login_with_other_wallet_drops_user_id() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));

        store.login("0xabc123def").unwrap();
        store.set_user_id("user-1").unwrap();
        assert_eq!(store.login("0xabc123def").unwrap().user_id.as_deref(), Some("user-1"));

        let switched = store.login("0xfff000111").unwrap();
        assert_eq!(switched.user_id, None);
    }

    #[test]
    fn test_normalize_wallet_address() {
        assert_eq!(
            normalize_wallet_address("  0xABCdef1234  ").as_deref(),
            Some("0xabcdef1234")
        );
        assert_eq!(normalize_wallet_address(""), None);
        assert_eq!(normalize_wallet_address("short"), None);
        assert_eq!(normalize_wallet_address("0xabc def1234"), None);
        assert_eq!(normalize_wallet_address("<script>alert(1)</script>"), None);
    }
}
