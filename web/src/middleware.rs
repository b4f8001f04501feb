//! Correlation-id middleware.
//!
//! Every request gets a [`CorrelationId`]: the client's, if it sent a valid
//! `X-Correlation-ID`, otherwise a new one. The id is stored in request
//! extensions for the [`CorrelationId`] extractor, recorded on an
//! `http_request` span wrapping the whole request, and echoed back in the
//! response header.
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/todo", get(list_todos))
//!     .layer(correlation_id_layer());
//! ```

use axum::{extract::Request, response::Response};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::{Instrument, Span};

use crate::extractors::CorrelationId;

/// Request and response header carrying the correlation id
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Layer installing [`CorrelationIdMiddleware`]
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// See [`correlation_id_layer`]
#[derive(Clone, Copy, Debug, Default)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Service produced by [`CorrelationIdLayer`]
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

type ResponseFuture<E> = Pin<Box<dyn Future<Output = Result<Response, E>> + Send>>;

fn request_span(request: &Request, correlation_id: CorrelationId) -> Span {
    tracing::info_span!(
        "http_request",
        correlation_id = %correlation_id,
        method = %request.method(),
        path = %request.uri().path(),
    )
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = ResponseFuture<S::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let correlation_id =
            CorrelationId::from_headers(request.headers()).unwrap_or_else(CorrelationId::generate);
        request.extensions_mut().insert(correlation_id);

        let span = request_span(&request, correlation_id);
        let started = Instant::now();
        let inner = span.in_scope(|| self.inner.call(request));

        Box::pin(
            async move {
                let mut response = inner.await?;
                tracing::debug!(
                    status = response.status().as_u16(),
                    latency_ms = started.elapsed().as_millis(),
                    "Request finished"
                );
                response
                    .headers_mut()
                    .insert(CORRELATION_ID_HEADER, correlation_id.header_value());
                Ok(response)
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode, routing::get, Router};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn app() -> Router {
        Router::new()
            .route("/echo", get(|id: CorrelationId| async move { id.to_string() }))
            .layer(correlation_id_layer())
    }

    async fn call(header: Option<&str>, uri: &str) -> (StatusCode, Option<String>, String) {
        let mut builder = Request::builder().uri(uri);
        if let Some(value) = header {
            builder = builder.header(CORRELATION_ID_HEADER, value);
        }
        let response = app().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();

        let status = response.status();
        let echoed = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, echoed, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn client_id_reaches_handler_and_response() {
        let sent = Uuid::new_v4().to_string();

        let (_, echoed, seen_by_handler) = call(Some(&sent), "/echo").await;

        assert_eq!(echoed.as_deref(), Some(sent.as_str()));
        assert_eq!(seen_by_handler, sent);
    }

    #[tokio::test]
    async fn missing_or_bad_id_is_replaced() {
        for header in [None, Some("not-a-uuid")] {
            let (_, echoed, seen_by_handler) = call(header, "/echo").await;

            let echoed = echoed.unwrap();
            assert!(Uuid::parse_str(&echoed).is_ok(), "{header:?}");
            assert_eq!(seen_by_handler, echoed);
        }
    }

    #[tokio::test]
    async fn unmatched_routes_are_stamped_too() {
        let (status, echoed, _) = call(None, "/nowhere").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(echoed.is_some());
    }
}
