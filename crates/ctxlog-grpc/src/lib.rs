#![forbid(unsafe_code)]
#![deny(
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! gRPC front-end for request-scoped logging.
//!
//! Add [`GrpcLoggerLayer`] to a tonic server (`Server::builder().layer(...)`). Each
//! unary call logs a `request` entry with the full method name and receive time, and
//! the handler finds the call's [`ctxlog_core::Context`] through
//! [`RequestContextExt::log_context`] or [`ctxlog_core::Context::ambient`].

pub mod interceptor;
pub mod metadata;

pub use interceptor::{GrpcLoggerLayer, GrpcLoggerService, NO_REQUEST_ID, REQUEST};
pub use metadata::{
    METADATA_REQUEST_ID, RequestContextExt, request_id_from_headers, request_id_from_metadata,
    with_request_id,
};
