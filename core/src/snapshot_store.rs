//! Snapshot store trait and related types for whole-state persistence.
//!
//! A snapshot store keeps exactly one durable document: the latest serialized
//! state of a feature. Every mutation replaces the document wholesale, so the
//! trait only needs two operations:
//!
//! - Load the current document (if any) at start-up
//! - Save a new document, tagged with the [`Revision`] it was taken at
//!
//! # Implementations
//!
//! - `FileSnapshotStore` (in `todo-server`): JSON file on local disk
//! - `InMemorySnapshotStore` (in `todo-api-testing`): Fast, deterministic testing
//!
//! # Example
//!
//! ```no_run
//! use todo_api_core::snapshot_store::{Revision, Snapshot, SnapshotStore, SnapshotStoreError};
//!
//! async fn example<S: SnapshotStore>(store: &S) -> Result<(), SnapshotStoreError> {
//!     let _previous = store.load().await?;
//!
//!     store
//!         .save(Snapshot::new(Revision::new(1), b"[]".to_vec()))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Monotonic counter identifying a version of the persisted state.
///
/// Revisions only ever grow. A store receiving a snapshot older than the one it
/// last wrote may discard it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Revision(u64);

impl Revision {
    /// Creates a revision from a raw value
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns the revision following this one
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A serialized state document together with the revision it was taken at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    /// Revision of the state this document represents
    pub revision: Revision,
    /// Serialized state
    pub payload: Vec<u8>,
}

impl Snapshot {
    /// Creates a new snapshot
    #[must_use]
    pub const fn new(revision: Revision, payload: Vec<u8>) -> Self {
        Self { revision, payload }
    }
}

/// Errors that can occur during snapshot store operations.
#[derive(Error, Debug)]
pub enum SnapshotStoreError {
    /// Reading or writing the durable medium failed.
    #[error("I/O error: {0}")]
    IoError(String),

    /// The store refused the write (used by test doubles and read-only stores).
    #[error("Snapshot rejected: {0}")]
    Rejected(String),
}

impl From<std::io::Error> for SnapshotStoreError {
    fn from(error: std::io::Error) -> Self {
        Self::IoError(error.to_string())
    }
}

/// Boxed future returned by [`SnapshotStore`] methods.
pub type SnapshotFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, SnapshotStoreError>> + Send + 'a>>;

/// Whole-state persistence abstraction.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: the store is shared between request
/// handlers and the effects spawned by the runtime.
///
/// # Ordering
///
/// Saves may be issued concurrently and complete in any order. Implementations
/// must never let an older [`Revision`] overwrite a newer one.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// so it can be held as `Arc<dyn SnapshotStore>` inside effect descriptions.
pub trait SnapshotStore: Send + Sync {
    /// Load the current document.
    ///
    /// Returns `Ok(None)` when nothing has been persisted yet.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotStoreError::IoError`] if the medium cannot be read.
    fn load(&self) -> SnapshotFuture<'_, Option<Vec<u8>>>;

    /// Replace the current document with `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotStoreError`] if the document could not be written.
    fn save(&self, snapshot: Snapshot) -> SnapshotFuture<'_, ()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_next_increments() {
        let revision = Revision::new(41);
        assert_eq!(revision.next(), Revision::new(42));
        assert!(revision.next() > revision);
    }

    #[test]
    fn revision_next_saturates() {
        assert_eq!(Revision::new(u64::MAX).next(), Revision::new(u64::MAX));
    }

    #[test]
    fn io_error_converts() {
        let error: SnapshotStoreError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into();
        assert!(error.to_string().contains("read-only"));
    }
}
