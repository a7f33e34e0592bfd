use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::source::SourceKind;

pub const STATE_FILE_NAME: &str = "session.json";

/// Durable record of the active source, enough to resume after a restart
/// without asking the user again. Written on every successful root listing,
/// removed on reset.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub source: SourceKind,
    /// Remote: the `owner/repo` identifier. Local: the provider's persist
    /// token.
    pub reference: String,
    pub display_name: String,
}

/// Reads and writes the session record under a state directory.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: state_dir.into().join(STATE_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored record, if any. An unreadable or unparsable record is
    /// treated as absent, not as an error.
    pub async fn load(&self) -> Option<SessionRecord> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(_) => {
                debug!(path = %self.path.display(), "no persisted session");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!("ignoring unreadable session record: {err}");
                None
            }
        }
    }

    /// Replaces the record, writing through a temporary sibling and a
    /// rename.
    pub async fn save(&self, record: &SessionRecord) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(record).map_err(std::io::Error::other)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "session persisted");
        Ok(())
    }

    /// Removes the record. Already absent counts as removed.
    pub async fn clear(&self) -> std::io::Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record() -> SessionRecord {
        SessionRecord {
            source: SourceKind::Remote,
            reference: "octocat/hello".to_owned(),
            display_name: "octocat/hello".to_owned(),
        }
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path().join("state"));

        store.save(&record()).await.unwrap();
        assert_eq!(store.load().await, Some(record()));
    }

    #[tokio::test]
    async fn load_without_a_record_is_none() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path());
        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn corrupt_record_is_treated_as_absent() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path());
        std::fs::write(store.path(), b"{ not json").unwrap();

        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn record_kinds_serialize_as_lowercase_tags() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path());
        let local = SessionRecord {
            source: SourceKind::Local,
            reference: "/home/me/project".to_owned(),
            display_name: "project".to_owned(),
        };

        store.save(&local).await.unwrap();
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"local\""));
        assert_eq!(store.load().await, Some(local));
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path());

        store.save(&record()).await.unwrap();
        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.load().await, None);
    }
}
