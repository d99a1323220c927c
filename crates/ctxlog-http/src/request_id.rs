//! `x-request-id` assignment and lookup for the logging middleware.
//!
//! # Design
//! - [`request_id_layers`] keeps a client-supplied identifier, generates a UUID
//!   otherwise, and echoes the identifier on the response.
//! - [`request_id_of`] reads the `RequestId` extension those layers set, falling back
//!   to the raw header for stacks that assign identifiers elsewhere.

use axum::http::Request;
use tower::layer::util::Stack;
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};

/// Header carrying the HTTP request identifier.
pub const HEADER_REQUEST_ID: &str = "x-request-id";

/// Request-id layers, applied outside [`crate::LoggerLayer`] so the logger sees the
/// identifier they assign.
pub type RequestIdLayers = Stack<PropagateRequestIdLayer, SetRequestIdLayer<MakeRequestUuid>>;

/// Assign `x-request-id` to requests lacking one and copy it onto the response.
#[must_use]
pub fn request_id_layers() -> RequestIdLayers {
    Stack::new(
        PropagateRequestIdLayer::x_request_id(),
        SetRequestIdLayer::x_request_id(MakeRequestUuid),
    )
}

/// Request identifier for `request`, if one was generated or supplied.
///
/// Empty or non-UTF-8 values count as absent.
#[must_use]
pub fn request_id_of<B>(request: &Request<B>) -> Option<String> {
    request
        .extensions()
        .get::<RequestId>()
        .map(RequestId::header_value)
        .or_else(|| request.headers().get(HEADER_REQUEST_ID))
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}
