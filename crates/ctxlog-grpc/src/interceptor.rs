//! Unary call logging for gRPC servers.
//!
//! # Design
//! - Runs as a Tower layer in front of the generated service so the full method path
//!   (`/package.Service/Method`) and raw metadata are both available.
//! - The base context is captured once when the server is built; calls only add the
//!   request identifier found in their metadata.
//! - Responses and errors from the inner service are returned untouched.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use chrono::Utc;
use ctxlog_core::Context;
use ctxlog_core::field::{Field, METHOD, REQUEST_TIME};
use http::Request;
use tower::{Layer, Service};

use crate::metadata::request_id_from_headers;

/// Message of the per-call entry.
pub const REQUEST: &str = "request";
/// Message emitted when a call arrives without a request identifier.
pub const NO_REQUEST_ID: &str = "No request id";

/// Wraps gRPC services so every call is logged and carries a request context.
#[derive(Clone, Debug)]
pub struct GrpcLoggerLayer {
    ctx: Context,
}

impl GrpcLoggerLayer {
    /// Capture the base context shared by all calls.
    ///
    /// # Panics
    ///
    /// Panics if no logger is installed in `ctx`.
    #[must_use]
    pub fn new(ctx: &Context) -> Self {
        assert!(
            ctx.try_current().is_some(),
            "no logger installed in context; call Context::install before building the gRPC server"
        );
        Self { ctx: ctx.clone() }
    }
}

impl<S> Layer<S> for GrpcLoggerLayer {
    type Service = GrpcLoggerService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GrpcLoggerService {
            inner,
            ctx: self.ctx.clone(),
        }
    }
}

/// Service produced by [`GrpcLoggerLayer`].
#[derive(Clone, Debug)]
pub struct GrpcLoggerService<S> {
    inner: S,
    ctx: Context,
}

impl<S> GrpcLoggerService<S> {
    fn call_context<B>(&self, req: &Request<B>) -> Context {
        match request_id_from_headers(req.headers()) {
            Some(request_id) => self.ctx.with_request_id(request_id),
            None => {
                self.ctx.current().error(&self.ctx, NO_REQUEST_ID, []);
                self.ctx.clone()
            }
        }
    }
}

impl<S, B> Service<Request<B>> for GrpcLoggerService<S>
where
    S: Service<Request<B>> + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let ctx = self.call_context(&req);
        ctx.current().info(
            &ctx,
            REQUEST,
            [
                Field::str(METHOD, req.uri().path()),
                Field::time(REQUEST_TIME, Utc::now()),
            ],
        );
        req.extensions_mut().insert(ctx.clone());
        let fut = self.inner.call(req);
        Box::pin(ctx.scope(fut))
    }
}
