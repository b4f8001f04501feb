//! JSON file persistence.
//!
//! The whole collection lives in one pretty-printed JSON array. Each save
//! writes `<path>.tmp` and renames it over `<path>`, so readers never see a
//! half-written document.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use todo_api_core::snapshot_store::{
    Revision, Snapshot, SnapshotFuture, SnapshotStore, SnapshotStoreError,
};
use tokio::sync::Mutex;

use crate::types::TodoRecord;

/// Snapshot store backed by a single file on local disk
///
/// Writers are serialized. A snapshot older than the last one written is
/// dropped, so the file always ends up holding the newest revision even if
/// saves complete out of order.
#[derive(Debug)]
pub struct FileSnapshotStore {
    path: PathBuf,
    last_written: Mutex<Option<Revision>>,
}

impl FileSnapshotStore {
    /// Creates a store for `path` (the file need not exist yet)
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_written: Mutex::new(None),
        }
    }

    /// Path of the durable document
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    async fn write(&self, snapshot: Snapshot) -> Result<(), SnapshotStoreError> {
        let mut last_written = self.last_written.lock().await;

        if let Some(last) = *last_written {
            if snapshot.revision < last {
                tracing::debug!(
                    revision = %snapshot.revision,
                    last_written = %last,
                    "Skipping stale snapshot"
                );
                return Ok(());
            }
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, &snapshot.payload).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        *last_written = Some(snapshot.revision);
        tracing::debug!(
            path = %self.path.display(),
            revision = %snapshot.revision,
            bytes = snapshot.payload.len(),
            "Snapshot written"
        );
        Ok(())
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> SnapshotFuture<'_, Option<Vec<u8>>> {
        Box::pin(async move {
            match tokio::fs::read(&self.path).await {
                Ok(bytes) => Ok(Some(bytes)),
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(error) => Err(error.into()),
            }
        })
    }

    fn save(&self, snapshot: Snapshot) -> SnapshotFuture<'_, ()> {
        Box::pin(self.write(snapshot))
    }
}

/// Loads the persisted collection
///
/// Never fails: a missing document means an empty list, and an unreadable or
/// malformed one is logged and treated as empty. Entries of a well-formed
/// array are kept as stored, whatever their shape.
pub async fn load_todos(store: &dyn SnapshotStore) -> Vec<TodoRecord> {
    match store.load().await {
        Ok(Some(bytes)) => decode_todos(&bytes),
        Ok(None) => {
            tracing::info!("No saved todos, starting empty");
            Vec::new()
        },
        Err(error) => {
            tracing::warn!(error = %error, "Could not read saved todos, starting empty");
            Vec::new()
        },
    }
}

/// Decodes a persisted document into records
#[must_use]
pub fn decode_todos(bytes: &[u8]) -> Vec<TodoRecord> {
    let records = match serde_json::from_slice::<Vec<TodoRecord>>(bytes) {
        Ok(records) => records,
        Err(error) => {
            tracing::warn!(error = %error, "Saved todos are not a JSON array, starting empty");
            return Vec::new();
        },
    };

    let unusual = records.iter().filter(|record| record.task().is_none()).count();
    if unusual > 0 {
        tracing::warn!(count = unusual, "Saved todos without a string task, keeping as stored");
    }

    tracing::info!(count = records.len(), "Loaded saved todos");
    records
}
