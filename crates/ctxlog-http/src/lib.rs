#![forbid(unsafe_code)]
#![deny(
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! HTTP front-end for request-scoped logging.
//!
//! [`LoggerLayer`] wraps any Tower service over `http::Request`. Each request gets a
//! child [`ctxlog_core::Context`] whose logger carries method, path, remote address,
//! user agent and request id, and exactly one `request completed` entry is written
//! with status, byte count and duration.
//! Layout: layer.rs (middleware), body.rs (response capture), extract.rs (axum
//! extractor), request_id.rs (request id layers).

pub mod body;
pub mod extract;
pub mod layer;
pub mod request_id;

pub use body::{CountingBody, REQUEST_COMPLETED, ResponseMetadata};
pub use extract::LogContext;
pub use layer::{COMPONENT_NAME, LoggerLayer, LoggerService, MIDDLEWARE_ENABLED, RemoteAddr};
pub use request_id::{HEADER_REQUEST_ID, RequestIdLayers, request_id_layers, request_id_of};
