//! Todo list HTTP service.
//!
//! A single-resource CRUD API over an ordered, index-addressed todo list,
//! persisted as one JSON document after every change.
//!
//! - [`types`]: records, the collection, and the command/outcome actions
//! - [`validation`]: body rules and their client-facing messages
//! - [`reducer`]: applies commands under the store's write lock
//! - [`storage`]: the JSON file snapshot store
//! - [`handlers`] and [`router`]: the HTTP surface
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use todo_api_runtime::Store;
//! use todo_server::{
//!     load_todos, todo_router, FileSnapshotStore, TodoEnvironment, TodoReducer, TodoState,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let snapshots = Arc::new(FileSnapshotStore::new("todos.json"));
//! let records = load_todos(snapshots.as_ref()).await;
//!
//! let store = Arc::new(Store::new(
//!     TodoState::from_records(records),
//!     TodoReducer::new(),
//!     TodoEnvironment::new(snapshots),
//! ));
//!
//! let listener = tokio::net::TcpListener::bind("localhost:8000").await?;
//! axum::serve(listener, todo_router(store)).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod handlers;
pub mod reducer;
pub mod router;
pub mod storage;
pub mod types;
pub mod validation;

use todo_api_runtime::Store;

// Re-export commonly used types
pub use config::Config;
pub use reducer::{TodoEnvironment, TodoReducer};
pub use router::todo_router;
pub use storage::{load_todos, FileSnapshotStore};
pub use types::{RequestId, TodoAction, TodoId, TodoIndex, TodoRecord, TodoState};
pub use validation::ValidationError;

/// The store wired for the todo list
pub type TodoStore = Store<TodoState, TodoAction, TodoEnvironment, TodoReducer>;
