//! # Todo API Core
//!
//! The seams the todo service is built around.
//!
//! A [`Reducer`](reducer::Reducer) owns every business rule: given the current
//! state and an action it mutates the state and returns [`Effect`](effect::Effect)
//! values describing the I/O to perform next. It never performs that I/O
//! itself, which keeps it synchronous and testable without a runtime.
//!
//! Durable storage sits behind [`SnapshotStore`](snapshot_store::SnapshotStore)
//! and reaches reducers through their environment.
//!
//! ```ignore
//! impl Reducer for TodoReducer {
//!     type State = TodoState;
//!     type Action = TodoAction;
//!     type Environment = TodoEnvironment;
//!
//!     fn reduce(&self, state: &mut TodoState, action: TodoAction, env: &TodoEnvironment)
//!         -> SmallVec<[Effect<TodoAction>; 4]>
//!     {
//!         let (id, index) = state.append(record);
//!         smallvec![save_snapshot! { .. }]
//!     }
//! }
//! ```

pub use smallvec::{smallvec, SmallVec};

/// `save_snapshot!` and `async_effect!`
pub mod effect_macros;

/// Whole-state persistence
pub mod snapshot_store;

/// The [`Reducer`](reducer::Reducer) trait
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// Business logic for one kind of state
    ///
    /// `reduce` runs with exclusive access to the state. It should decide,
    /// mutate and describe follow-up work, and return quickly.
    pub trait Reducer {
        /// What the reducer mutates
        type State;

        /// Commands in, and the outcomes effects feed back
        type Action;

        /// Injected dependencies (stores, clocks)
        type Environment;

        /// Applies `action` to `state` and returns the effects to run
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Descriptions of work for the runtime
///
/// Every effect may produce one action, which the runtime reduces in turn.
pub mod effect {
    use crate::snapshot_store::{Snapshot, SnapshotStore, SnapshotStoreError};
    use std::fmt;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;

    /// Callback invoked after a successful snapshot write.
    pub type OnSaved<Action> = Box<dyn FnOnce(()) -> Option<Action> + Send>;

    /// Callback invoked after a failed snapshot write.
    pub type OnSaveFailed<Action> = Box<dyn FnOnce(SnapshotStoreError) -> Option<Action> + Send>;

    /// A write to a [`SnapshotStore`]
    pub enum SnapshotOperation<Action> {
        /// Replace the durable document with `snapshot`
        Save {
            /// Where to write
            snapshot_store: Arc<dyn SnapshotStore>,
            /// What to write
            snapshot: Snapshot,
            /// Action to feed back once the write succeeded
            on_success: OnSaved<Action>,
            /// Action to feed back if the write failed
            on_error: OnSaveFailed<Action>,
        },
    }

    /// Work a reducer asks the runtime to do
    pub enum Effect<Action> {
        /// Nothing
        None,

        /// Any async work; a `Some` result is fed back as an action
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Persist a snapshot, then feed back the matching callback's action
        Snapshot(SnapshotOperation<Action>),
    }

    impl<Action> fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::None => f.write_str("Effect::None"),
                Self::Future(_) => f.write_str("Effect::Future(<future>)"),
                Self::Snapshot(SnapshotOperation::Save { snapshot, .. }) => f
                    .debug_struct("Effect::Snapshot::Save")
                    .field("revision", &snapshot.revision)
                    .field("bytes", &snapshot.payload.len())
                    .finish(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// The snapshot this effect would save, if it is a save
        #[must_use]
        pub const fn snapshot(&self) -> Option<&Snapshot> {
            if let Self::Snapshot(SnapshotOperation::Save { snapshot, .. }) = self {
                Some(snapshot)
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::Effect;
    use super::snapshot_store::{Revision, Snapshot, SnapshotFuture, SnapshotStore};
    use std::sync::Arc;

    struct NullStore;

    impl SnapshotStore for NullStore {
        fn load(&self) -> SnapshotFuture<'_, Option<Vec<u8>>> {
            Box::pin(async { Ok(None) })
        }

        fn save(&self, _snapshot: Snapshot) -> SnapshotFuture<'_, ()> {
            Box::pin(async { Ok(()) })
        }
    }

    fn save_at(revision: u64) -> Effect<()> {
        let store: Arc<dyn SnapshotStore> = Arc::new(NullStore);
        crate::save_snapshot! {
            store: store,
            snapshot: Snapshot::new(Revision::new(revision), b"[]".to_vec()),
            on_success: |_saved| None,
            on_error: |_error| None
        }
    }

    #[test]
    fn only_saves_expose_a_snapshot() {
        assert_eq!(save_at(3).snapshot().map(|s| s.revision), Some(Revision::new(3)));
        assert!(Effect::<()>::None.snapshot().is_none());
        assert!(crate::async_effect! { None::<()> }.snapshot().is_none());
    }

    #[test]
    fn debug_output() {
        assert_eq!(format!("{:?}", crate::async_effect! { None::<()> }), "Effect::Future(<future>)");
        assert_eq!(
            format!("{:?}", save_at(2)),
            "Effect::Snapshot::Save { revision: Revision(2), bytes: 2 }"
        );
    }
}
