//! Where DisplayState snapshots come from.
//!
//! The orchestrator owns the state and rewrites a JSON file; the dashboard
//! only ever reads it and swaps in whole snapshots.

use crate::errors::TaskboardError;
use crate::runtime::FileSystem;
use crate::types::DisplayState;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub fn decode_snapshot(text: &str) -> Result<DisplayState, TaskboardError> {
    serde_json::from_str(text).map_err(|e| TaskboardError::Snapshot(e.to_string()))
}

pub trait SnapshotSource {
    /// A new snapshot when one is available, `None` when nothing changed.
    fn poll(&mut self) -> Result<Option<DisplayState>, TaskboardError>;
}

/// Re-reads a JSON file and reports a snapshot only when its contents change.
pub struct FileSnapshotSource {
    path: PathBuf,
    file_system: Arc<dyn FileSystem>,
    last_contents: Option<String>,
}

impl FileSnapshotSource {
    pub fn new(path: impl AsRef<Path>, file_system: Arc<dyn FileSystem>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file_system,
            last_contents: None,
        }
    }
}

impl SnapshotSource for FileSnapshotSource {
    fn poll(&mut self) -> Result<Option<DisplayState>, TaskboardError> {
        if !self.file_system.exists(&self.path) {
            return Ok(None);
        }
        let contents = self.file_system.read_to_string(&self.path)?;
        if self.last_contents.as_deref() == Some(contents.as_str()) {
            return Ok(None);
        }
        let decoded = if contents.trim().is_empty() {
            Ok(None)
        } else {
            decode_snapshot(&contents).map(Some)
        };
        // Remembered even when broken so the same bad file is reported once.
        self.last_contents = Some(contents);
        decoded
    }
}

/// Hands out one fixed snapshot, then reports no changes.
pub struct StaticSnapshotSource {
    pending: Option<DisplayState>,
}

impl StaticSnapshotSource {
    pub fn new(state: DisplayState) -> Self {
        Self {
            pending: Some(state),
        }
    }
}

impl SnapshotSource for StaticSnapshotSource {
    fn poll(&mut self) -> Result<Option<DisplayState>, TaskboardError> {
        Ok(self.pending.take())
    }
}
