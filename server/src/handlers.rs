//! HTTP handlers for the todo API.
//!
//! Reads go straight to store state. Mutations are dispatched as commands with
//! `send_and_wait_for()` and answered by the matching outcome action.
//!
//! A query string counts as part of the path: `/todo?x=1` is an unknown
//! path, and `/todo/0?x=1` carries the index `0?x=1`, which is invalid.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, Path, RawQuery, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use todo_api_web::{AppError, CorrelationId, WebResult};

use crate::types::{RequestId, TodoAction, TodoIndex, TodoRecord};
use crate::TodoStore;

/// How long a mutation waits for its outcome
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// Body of every successful mutation.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    /// Human-readable result.
    pub message: &'static str,
}

impl MessageResponse {
    const fn json(message: &'static str) -> Json<Self> {
        Json(Self { message })
    }
}

type MessageReply = WebResult<(StatusCode, Json<MessageResponse>)>;

/// List all todos.
///
/// ```text
/// GET /todo
/// ```
pub async fn list_todos(
    State(store): State<Arc<TodoStore>>,
    query: RawQuery,
) -> WebResult<Json<Vec<TodoRecord>>> {
    reject_query(&query)?;
    Ok(Json(store.state(|s| s.records().cloned().collect()).await))
}

/// Get the todo at a position.
///
/// ```text
/// GET /todo/:index
/// ```
pub async fn get_todo(
    State(store): State<Arc<TodoStore>>,
    path: Result<Path<String>, PathRejection>,
    query: RawQuery,
) -> WebResult<Json<TodoRecord>> {
    let index = parse_index(path, &query)?;

    store
        .state(|s| s.get(index).cloned())
        .await
        .map(Json)
        .ok_or_else(task_not_found)
}

/// Create a todo.
///
/// ```text
/// POST /todo
///
/// {"task": "Buy milk", "completed": false}
/// ```
///
/// Responds `201 {"message": "Task added successfully"}`.
pub async fn create_todo(
    State(store): State<Arc<TodoStore>>,
    correlation_id: CorrelationId,
    query: RawQuery,
    body: Bytes,
) -> MessageReply {
    reject_query(&query)?;
    let fields = parse_body(&body)?;
    let request_id = RequestId::new();
    tracing::debug!(%correlation_id, %request_id, "Dispatching CreateTodo");

    dispatch(&store, TodoAction::CreateTodo { request_id, fields }).await
}

/// Merge fields into the todo at a position.
///
/// ```text
/// PUT /todo/:index
///
/// {"completed": true}
/// ```
///
/// The index is checked before the body is parsed, so an unknown position
/// answers 404 even when the body is malformed.
pub async fn update_todo(
    State(store): State<Arc<TodoStore>>,
    correlation_id: CorrelationId,
    path: Result<Path<String>, PathRejection>,
    query: RawQuery,
    body: Bytes,
) -> MessageReply {
    let index = parse_index(path, &query)?;
    if !store.state(|s| s.contains(index)).await {
        return Err(task_not_found());
    }

    let fields = parse_body(&body)?;
    let request_id = RequestId::new();
    tracing::debug!(%correlation_id, %request_id, %index, "Dispatching UpdateTodo");

    dispatch(
        &store,
        TodoAction::UpdateTodo {
            request_id,
            index,
            fields,
        },
    )
    .await
}

/// Delete the todo at a position.
///
/// ```text
/// DELETE /todo/:index
/// ```
pub async fn delete_todo(
    State(store): State<Arc<TodoStore>>,
    correlation_id: CorrelationId,
    path: Result<Path<String>, PathRejection>,
    query: RawQuery,
) -> MessageReply {
    let index = parse_index(path, &query)?;
    let request_id = RequestId::new();
    tracing::debug!(%correlation_id, %request_id, %index, "Dispatching DeleteTodo");

    dispatch(&store, TodoAction::DeleteTodo { request_id, index }).await
}

/// `/todo/` with nothing after the slash.
pub async fn missing_index() -> AppError {
    AppError::bad_request("Invalid index")
}

/// Any route or method the API does not serve.
pub async fn path_not_found() -> AppError {
    unknown_path()
}

fn unknown_path() -> AppError {
    AppError::not_found("Path not found")
}

fn reject_query(RawQuery(query): &RawQuery) -> WebResult<()> {
    match query {
        Some(query) => {
            tracing::debug!(%query, "Query string on collection path");
            Err(unknown_path())
        },
        None => Ok(()),
    }
}

fn task_not_found() -> AppError {
    AppError::not_found("Task not found")
}

fn parse_index(
    path: Result<Path<String>, PathRejection>,
    RawQuery(query): &RawQuery,
) -> WebResult<TodoIndex> {
    let Path(raw) = path.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Unreadable index segment");
        AppError::bad_request("Invalid index")
    })?;

    if let Some(query) = query {
        tracing::debug!(%raw, %query, "Query string on index path");
        return Err(AppError::bad_request("Invalid index"));
    }

    raw.parse::<TodoIndex>()
        .map_err(|error| AppError::bad_request(error.to_string()))
}

fn parse_body(body: &[u8]) -> WebResult<Value> {
    serde_json::from_slice(body).map_err(|error| {
        tracing::debug!(error = %error, "Rejected request body");
        AppError::bad_request("Invalid JSON")
    })
}

/// Sends `action` and maps the outcome that answers it to a response.
async fn dispatch(store: &TodoStore, action: TodoAction) -> MessageReply {
    let request_id = action.request_id();

    let outcome = store
        .send_and_wait_for(
            action,
            move |a| a.is_outcome_for(request_id),
            REPLY_TIMEOUT,
        )
        .await?;

    match outcome {
        TodoAction::TodoCreated { .. } => Ok((
            StatusCode::CREATED,
            MessageResponse::json("Task added successfully"),
        )),
        TodoAction::TodoUpdated { .. } => {
            Ok((StatusCode::OK, MessageResponse::json("Task updated successfully")))
        },
        TodoAction::TodoDeleted { .. } => {
            Ok((StatusCode::OK, MessageResponse::json("Task deleted successfully")))
        },
        TodoAction::ValidationFailed { error, .. } => Err(AppError::bad_request(error.to_string())),
        TodoAction::TodoNotFound { .. } => Err(task_not_found()),
        command @ (TodoAction::CreateTodo { .. }
        | TodoAction::UpdateTodo { .. }
        | TodoAction::DeleteTodo { .. }) => {
            tracing::error!(?command, "Command matched as an outcome");
            Err(AppError::internal())
        },
    }
}
