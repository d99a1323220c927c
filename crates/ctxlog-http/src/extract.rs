//! Axum extractors for the per-request logging context.

use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use ctxlog_core::{Context, Logger};

const MISSING_CONTEXT: &str = "request logging middleware is not installed";

/// Extracts the request [`Context`] installed by [`LoggerLayer`](crate::LoggerLayer).
#[derive(Clone, Debug)]
pub struct LogContext(pub Context);

impl LogContext {
    /// Logger bound in the request context.
    #[must_use]
    pub fn logger(&self) -> &Logger {
        self.0.current()
    }
}

impl<S> FromRequestParts<S> for LogContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Context>()
            .cloned()
            .map(Self)
            .ok_or((StatusCode::INTERNAL_SERVER_ERROR, MISSING_CONTEXT))
    }
}
