//! HTTP plumbing shared by the todo handlers.
//!
//! - [`AppError`] renders every failure as `{"error": "<message>"}` and maps
//!   store errors (timeouts, shutdown) to statuses.
//! - [`CorrelationId`] and [`correlation_id_layer`] give each request an id
//!   that shows up on its span and in the `X-Correlation-ID` response header.
//!
//! Handlers return [`WebResult`] and use `?` on `send_and_wait_for`:
//!
//! ```ignore
//! async fn delete_todo(State(store): State<Arc<TodoStore>>, ..) -> WebResult<Json<MessageResponse>> {
//!     let outcome = store.send_and_wait_for(action, predicate, REPLY_TIMEOUT).await?;
//!     ..
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod middleware;

pub use error::AppError;
pub use extractors::CorrelationId;
pub use middleware::{correlation_id_layer, CORRELATION_ID_HEADER};

/// What handlers return
pub type WebResult<T> = Result<T, AppError>;
