//! Request identifier carried in gRPC metadata.

use ctxlog_core::Context;
use http::HeaderMap;
use tonic::metadata::{Ascii, MetadataMap, MetadataValue};

/// Metadata key consulted for the request identifier.
pub const METADATA_REQUEST_ID: &str = "request_id";

/// Request identifier in raw inbound headers, if present and non-empty.
#[must_use]
pub fn request_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(METADATA_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

/// Request identifier in tonic metadata, if present and non-empty.
#[must_use]
pub fn request_id_from_metadata(metadata: &MetadataMap) -> Option<String> {
    metadata
        .get(METADATA_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

/// Build an outbound request carrying `request_id` metadata.
///
/// Identifiers that are not valid metadata values are dropped.
pub fn with_request_id<T>(message: T, request_id: &str) -> tonic::Request<T> {
    let mut request = tonic::Request::new(message);
    if !request_id.is_empty() {
        if let Ok(value) = request_id.parse::<MetadataValue<Ascii>>() {
            request.metadata_mut().insert(METADATA_REQUEST_ID, value);
        }
    }
    request
}

/// Access the logging context installed by [`GrpcLoggerLayer`](crate::GrpcLoggerLayer).
pub trait RequestContextExt {
    /// Context bound for this call, if the layer ran.
    fn log_context(&self) -> Option<&Context>;
}

impl<T> RequestContextExt for tonic::Request<T> {
    fn log_context(&self) -> Option<&Context> {
        self.extensions().get::<Context>()
    }
}

impl<T> RequestContextExt for http::Request<T> {
    fn log_context(&self) -> Option<&Context> {
        self.extensions().get::<Context>()
    }
}
