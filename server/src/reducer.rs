//! Reducer logic for the todo list.
//!
//! Every command is answered by exactly one outcome action, delivered through
//! an effect so the waiting HTTP handler observes it. Successful mutations
//! answer through the snapshot save; rejected commands answer immediately.

use std::sync::Arc;

use crate::types::{TodoAction, TodoState};
use crate::validation::{validate_new, validate_patch};
use todo_api_core::{
    async_effect, effect::Effect, reducer::Reducer, save_snapshot, smallvec,
    snapshot_store::SnapshotStore, SmallVec,
};

/// Environment dependencies for the todo reducer
#[derive(Clone)]
pub struct TodoEnvironment {
    /// Where the collection is persisted after each mutation
    pub snapshots: Arc<dyn SnapshotStore>,
}

impl TodoEnvironment {
    /// Creates a new `TodoEnvironment`
    #[must_use]
    pub fn new(snapshots: Arc<dyn SnapshotStore>) -> Self {
        Self { snapshots }
    }
}

/// Reducer for the todo list
#[derive(Clone, Debug)]
pub struct TodoReducer;

impl TodoReducer {
    /// Creates a new `TodoReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Answers a command without touching state
    fn reply(outcome: TodoAction) -> SmallVec<[Effect<TodoAction>; 4]> {
        smallvec![async_effect! { Some(outcome) }]
    }

    /// Persists the current state, answering with `outcome` once the write
    /// has finished (whether or not it succeeded).
    fn persist(
        state: &TodoState,
        env: &TodoEnvironment,
        outcome: TodoAction,
    ) -> SmallVec<[Effect<TodoAction>; 4]> {
        let snapshot = match state.snapshot() {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::error!(
                    revision = %state.revision(),
                    error = %error,
                    "Failed to serialize todos, skipping save"
                );
                return Self::reply(outcome);
            },
        };

        let on_error = outcome.clone();
        smallvec![save_snapshot! {
            store: env.snapshots,
            snapshot: snapshot,
            on_success: |_saved| Some(outcome),
            on_error: |_error| Some(on_error)
        }]
    }
}

impl Default for TodoReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for TodoReducer {
    type State = TodoState;
    type Action = TodoAction;
    type Environment = TodoEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            TodoAction::CreateTodo { request_id, fields } => {
                let record = match validate_new(&fields) {
                    Ok(record) => record,
                    Err(error) => {
                        tracing::debug!(%request_id, %error, "Create rejected");
                        return Self::reply(TodoAction::ValidationFailed { request_id, error });
                    },
                };

                let (id, index) = state.append(record);
                tracing::info!(%request_id, %id, index, "Todo created");

                Self::persist(state, env, TodoAction::TodoCreated { request_id, id, index })
            },

            TodoAction::UpdateTodo {
                request_id,
                index,
                fields,
            } => {
                let Some((id, position)) = state.resolve(index) else {
                    return Self::reply(TodoAction::TodoNotFound { request_id, index });
                };

                let patch = match validate_patch(&fields) {
                    Ok(patch) => patch,
                    Err(error) => {
                        tracing::debug!(%request_id, %error, "Update rejected");
                        return Self::reply(TodoAction::ValidationFailed { request_id, error });
                    },
                };

                state.merge(id, patch);
                tracing::info!(%request_id, %id, index = position, "Todo updated");

                Self::persist(
                    state,
                    env,
                    TodoAction::TodoUpdated {
                        request_id,
                        id,
                        index: position,
                    },
                )
            },

            TodoAction::DeleteTodo { request_id, index } => {
                let Some((id, position)) = state.resolve(index) else {
                    return Self::reply(TodoAction::TodoNotFound { request_id, index });
                };

                state.remove(id);
                tracing::info!(%request_id, %id, index = position, "Todo deleted");

                Self::persist(
                    state,
                    env,
                    TodoAction::TodoDeleted {
                        request_id,
                        id,
                        index: position,
                    },
                )
            },

            // ========== Outcomes ==========
            // Already applied while handling the command; they only travel
            // back to the caller.
            TodoAction::TodoCreated { .. }
            | TodoAction::TodoUpdated { .. }
            | TodoAction::TodoDeleted { .. }
            | TodoAction::ValidationFailed { .. }
            | TodoAction::TodoNotFound { .. } => SmallVec::new(),
        }
    }
}
