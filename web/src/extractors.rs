//! Request extractors.
//!
//! [`CorrelationId`] ties every log line of one request together. The
//! middleware assigns it; handlers just ask for it:
//!
//! ```ignore
//! async fn create_todo(correlation_id: CorrelationId, body: Bytes) -> WebResult<..> {
//!     tracing::debug!(%correlation_id, "Dispatching CreateTodo");
//!     ..
//! }
//! ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, HeaderValue},
};
use std::convert::Infallible;
use std::fmt;
use uuid::Uuid;

use crate::middleware::CORRELATION_ID_HEADER;

/// Per-request correlation id (a UUID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    /// Parses a header value; anything but a UUID is ignored
    #[must_use]
    pub fn from_header_value(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim()).ok().map(Self)
    }

    /// The id a client sent in `X-Correlation-ID`, if it is usable
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get(CORRELATION_ID_HEADER)?
            .to_str()
            .ok()
            .and_then(Self::from_header_value)
    }

    /// A fresh random id
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The id as a response header value
    #[must_use]
    pub fn header_value(self) -> HeaderValue {
        let mut buf = Uuid::encode_buffer();
        // A hyphenated UUID is always a valid header value
        HeaderValue::from_str(self.0.hyphenated().encode_lower(&mut buf))
            .unwrap_or_else(|_| HeaderValue::from_static(""))
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Uses the id the middleware stored; outside the middleware, falls back to
/// the request header or a new id.
#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Self>()
            .copied()
            .or_else(|| Self::from_headers(&parts.headers))
            .unwrap_or_else(Self::generate))
    }
}
