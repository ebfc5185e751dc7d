//! File-backed state store.
//!
//! Keeps the set of processed object names in a single JSON file under
//! `general.state_dir`. The file is rewritten through a temporary sibling
//! and renamed into place so a crash never leaves a truncated state file.
//! There is no cross-process locking.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use honeyaws_core::error::{HoneyawsError, StateError};
use honeyaws_core::pipeline::Stater;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// State file name inside the state directory.
pub const STATE_FILE: &str = "honeyaws-state.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    processed: BTreeSet<String>,
}

/// JSON file implementation of [`Stater`].
pub struct FileStater {
    path: PathBuf,
    processed: Mutex<BTreeSet<String>>,
}

impl FileStater {
    /// Open (or create) the state store in `state_dir`.
    pub async fn open(state_dir: impl AsRef<Path>) -> Result<Self, HoneyawsError> {
        let dir = state_dir.as_ref();
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            StateError::Unavailable(format!("cannot create {}: {e}", dir.display()))
        })?;

        let path = dir.join(STATE_FILE);
        let processed = match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let state: StateFile = serde_json::from_str(&content).map_err(|e| {
                    StateError::Corrupted(format!("{}: {e}", path.display()))
                })?;
                state.processed
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => {
                return Err(
                    StateError::Unavailable(format!("cannot read {}: {e}", path.display())).into(),
                );
            }
        };

        tracing::debug!(path = %path.display(), objects = processed.len(), "state loaded");
        Ok(Self {
            path,
            processed: Mutex::new(processed),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of objects recorded as processed.
    pub async fn len(&self) -> usize {
        self.processed.lock().await.len()
    }

    async fn persist(&self, state: &StateFile) -> Result<(), HoneyawsError> {
        let body = serde_json::to_vec_pretty(state)
            .map_err(|e| StateError::Unavailable(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| StateError::Unavailable(format!("cannot write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            StateError::Unavailable(format!("cannot replace {}: {e}", self.path.display()))
        })?;
        Ok(())
    }
}

impl Stater for FileStater {
    async fn is_processed(&self, object: &str) -> Result<bool, HoneyawsError> {
        Ok(self.processed.lock().await.contains(object))
    }

    /// The in-memory set only changes once the new state is on disk.
    async fn mark_processed(&self, object: &str) -> Result<(), HoneyawsError> {
        let mut processed = self.processed.lock().await;
        if processed.contains(object) {
            return Ok(());
        }

        let mut next = StateFile {
            processed: processed.clone(),
        };
        next.processed.insert(object.to_owned());
        self.persist(&next).await?;
        *processed = next.processed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn marks_and_reloads() {
        let dir = tempfile::tempdir().unwrap();

        let stater = FileStater::open(dir.path()).await.unwrap();
        assert!(!stater.is_processed("logs/a.log").await.unwrap());
        stater.mark_processed("logs/a.log").await.unwrap();
        assert!(stater.is_processed("logs/a.log").await.unwrap());

        let reopened = FileStater::open(dir.path()).await.unwrap();
        assert!(reopened.is_processed("logs/a.log").await.unwrap());
        assert!(!reopened.is_processed("logs/b.log").await.unwrap());
        assert_eq!(reopened.len().await, 1);
    }

    #[tokio::test]
    async fn marking_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let stater = FileStater::open(dir.path()).await.unwrap();
        stater.mark_processed("x").await.unwrap();
        stater.mark_processed("x").await.unwrap();
        assert_eq!(stater.len().await, 1);
    }

    #[tokio::test]
    async fn creates_missing_state_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("var/lib/honeyaws");
        let stater = FileStater::open(&nested).await.unwrap();
        stater.mark_processed("obj").await.unwrap();
        assert!(nested.join(STATE_FILE).exists());
    }

    #[tokio::test]
    async fn failed_write_leaves_object_unprocessed() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = dir.path().join("state");
        let stater = FileStater::open(&state_dir).await.unwrap();
        stater.mark_processed("kept").await.unwrap();

        std::fs::remove_dir_all(&state_dir).unwrap();
        let err = stater.mark_processed("lost").await.unwrap_err();
        assert!(matches!(
            err,
            HoneyawsError::State(StateError::Unavailable(_))
        ));
        assert!(!stater.is_processed("lost").await.unwrap());
        assert!(stater.is_processed("kept").await.unwrap());
        assert_eq!(stater.len().await, 1);
    }

    #[tokio::test]
    async fn corrupted_state_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(STATE_FILE), "not json").unwrap();
        let err = FileStater::open(dir.path()).await.err().unwrap();
        assert!(matches!(
            err,
            HoneyawsError::State(StateError::Corrupted(_))
        ));
    }
}
