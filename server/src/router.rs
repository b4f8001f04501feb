//! Todo HTTP router.
//!
//! Composes the todo handlers into a single Axum router.

use std::sync::Arc;

use axum::{routing::get, Router};
use todo_api_web::correlation_id_layer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::TodoStore;

/// Create the todo router with all endpoints.
///
/// # Routes
///
/// - `GET /todo` - List all todos
/// - `POST /todo` - Create a todo
/// - `GET /todo/:index` - Get one todo
/// - `PUT /todo/:index` - Merge fields into one todo
/// - `DELETE /todo/:index` - Delete one todo
///
/// Every other method or path answers `404 {"error": "Path not found"}`.
///
/// # Example
///
/// ```rust,ignore
/// let store = Arc::new(Store::new(
///     TodoState::from_records(records),
///     TodoReducer::new(),
///     environment,
/// ));
///
/// axum::serve(listener, todo_router(store)).await?;
/// ```
pub fn todo_router(store: Arc<TodoStore>) -> Router {
    Router::new()
        .route(
            "/todo",
            get(handlers::list_todos)
                .post(handlers::create_todo)
                .fallback(handlers::path_not_found),
        )
        .route(
            "/todo/",
            get(handlers::missing_index)
                .put(handlers::missing_index)
                .delete(handlers::missing_index)
                .fallback(handlers::path_not_found),
        )
        .route(
            "/todo/:index",
            get(handlers::get_todo)
                .put(handlers::update_todo)
                .delete(handlers::delete_todo)
                .fallback(handlers::path_not_found),
        )
        .fallback(handlers::path_not_found)
        .with_state(store)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
}
