//! # Todo API Testing
//!
//! Testing utilities and helpers for the todo service.
//!
//! This crate provides:
//! - Mock implementations of Environment traits
//! - A Given-When-Then builder for reducers
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use todo_api_testing::mocks::InMemorySnapshotStore;
//! use todo_api_runtime::Store;
//!
//! #[tokio::test]
//! async fn test_create_flow() {
//!     let snapshots = Arc::new(InMemorySnapshotStore::new());
//!     let store = Store::new(TodoState::new(), TodoReducer::new(), env(snapshots.clone()));
//!
//!     store.send(action).await?;
//!
//!     assert_eq!(snapshots.save_count(), 1);
//! }
//! ```


pub use reducer_test::{assertions, resolve, EffectKind, ReducerTest};

/// Mock implementations of Environment traits
pub mod mocks {
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
    use todo_api_core::snapshot_store::{
        Revision, Snapshot, SnapshotFuture, SnapshotStore, SnapshotStoreError,
    };

    #[derive(Debug, Default)]
    struct Inner {
        current: Option<Snapshot>,
        saves: Vec<Revision>,
    }

    /// In-memory snapshot store for fast, deterministic tests
    ///
    /// Mirrors the ordering rule of the file store: a snapshot older than the
    /// one already held is discarded. Every accepted save is recorded so tests
    /// can assert on write counts.
    ///
    /// # Example
    ///
    /// ```
    /// use todo_api_testing::mocks::InMemorySnapshotStore;
    ///
    /// let store = InMemorySnapshotStore::with_payload(b"[]".to_vec());
    /// assert_eq!(store.current_payload(), Some(b"[]".to_vec()));
    /// ```
    #[derive(Debug, Clone, Default)]
    pub struct InMemorySnapshotStore {
        inner: Arc<Mutex<Inner>>,
    }

    impl InMemorySnapshotStore {
        /// Create an empty store (nothing persisted yet)
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a store that already holds `payload` at revision zero
        #[must_use]
        pub fn with_payload(payload: Vec<u8>) -> Self {
            let store = Self::new();
            store.lock().current = Some(Snapshot::new(Revision::default(), payload));
            store
        }

        /// The payload of the most recent accepted snapshot
        #[must_use]
        pub fn current_payload(&self) -> Option<Vec<u8>> {
            self.lock().current.as_ref().map(|s| s.payload.clone())
        }

        /// The revision of the most recent accepted snapshot
        #[must_use]
        pub fn current_revision(&self) -> Option<Revision> {
            self.lock().current.as_ref().map(|s| s.revision)
        }

        /// Number of accepted saves
        #[must_use]
        pub fn save_count(&self) -> usize {
            self.lock().saves.len()
        }

        /// Revisions of all accepted saves, in write order
        #[must_use]
        pub fn saved_revisions(&self) -> Vec<Revision> {
            self.lock().saves.clone()
        }

        fn lock(&self) -> MutexGuard<'_, Inner> {
            self.inner.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    impl SnapshotStore for InMemorySnapshotStore {
        fn load(&self) -> SnapshotFuture<'_, Option<Vec<u8>>> {
            let payload = self.current_payload();
            Box::pin(async move { Ok(payload) })
        }

        fn save(&self, snapshot: Snapshot) -> SnapshotFuture<'_, ()> {
            {
                let mut inner = self.lock();
                let stale = inner
                    .current
                    .as_ref()
                    .is_some_and(|current| current.revision > snapshot.revision);
                if !stale {
                    inner.saves.push(snapshot.revision);
                    inner.current = Some(snapshot);
                }
            }
            Box::pin(async { Ok(()) })
        }
    }

    /// Snapshot store whose every operation fails
    ///
    /// Used to check that persistence failures are logged and swallowed.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct FailingSnapshotStore;

    impl FailingSnapshotStore {
        /// Create a new failing store
        #[must_use]
        pub const fn new() -> Self {
            Self
        }
    }

    impl SnapshotStore for FailingSnapshotStore {
        fn load(&self) -> SnapshotFuture<'_, Option<Vec<u8>>> {
            Box::pin(async {
                Err(SnapshotStoreError::IoError("disk unavailable".to_string()))
            })
        }

        fn save(&self, _snapshot: Snapshot) -> SnapshotFuture<'_, ()> {
            Box::pin(async {
                Err(SnapshotStoreError::Rejected("disk unavailable".to_string()))
            })
        }
    }
}

// Re-export commonly used items
pub use mocks::{FailingSnapshotStore, InMemorySnapshotStore};
