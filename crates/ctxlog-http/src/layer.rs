//! Request logging middleware.
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use axum::extract::ConnectInfo;
use axum::http::{Request, Response, header::USER_AGENT};
use ctxlog_core::Context;
use ctxlog_core::field::{
    COMPONENT, Field, METHOD, PATH, REMOTE_ADDR, REQUEST_ID, USER_AGENT as USER_AGENT_FIELD,
};
use tower::{Layer, Service};

use crate::body::{CompletionGuard, CountingBody};
use crate::request_id::request_id_of;

/// Value of the `component` field attached by the middleware.
pub const COMPONENT_NAME: &str = "middleware/logger";
/// Message emitted once per layer construction.
pub const MIDDLEWARE_ENABLED: &str = "logger middleware enabled";

/// Peer address supplied by stacks that do not use axum's `ConnectInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAddr(pub String);

/// Wraps HTTP services so every request gets an enriched logger and a completion entry.
#[derive(Clone, Debug)]
pub struct LoggerLayer {
    ctx: Context,
}

impl LoggerLayer {
    /// Derive the middleware context from `ctx` and announce the middleware.
    ///
    /// # Panics
    ///
    /// Panics if no logger is installed in `ctx`.
    #[must_use]
    pub fn new(ctx: &Context) -> Self {
        let ctx = ctx.enrich([Field::str(COMPONENT, COMPONENT_NAME)]);
        ctx.current().info(&ctx, MIDDLEWARE_ENABLED, []);
        Self { ctx }
    }
}

impl<S> Layer<S> for LoggerLayer {
    type Service = LoggerService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggerService {
            inner,
            ctx: self.ctx.clone(),
        }
    }
}

/// Service produced by [`LoggerLayer`].
#[derive(Clone, Debug)]
pub struct LoggerService<S> {
    inner: S,
    ctx: Context,
}

impl<S> LoggerService<S> {
    fn request_context<B>(&self, req: &Request<B>) -> Context {
        let mut fields = vec![
            Field::str(METHOD, req.method().as_str()),
            Field::str(PATH, req.uri().path()),
        ];
        if let Some(addr) = remote_addr_of(req) {
            fields.push(Field::str(REMOTE_ADDR, addr));
        }
        let user_agent = req
            .headers()
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        fields.push(Field::str(USER_AGENT_FIELD, user_agent));
        if let Some(request_id) = request_id_of(req) {
            fields.push(Field::str(REQUEST_ID, request_id));
        }
        self.ctx.enrich(fields)
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for LoggerService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<CountingBody<ResBody>>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let ctx = self.request_context(&req);
        req.extensions_mut().insert(ctx.clone());
        let mut guard = CompletionGuard::start(ctx.clone());
        let fut = self.inner.call(req);

        Box::pin(async move {
            let response = ctx.scope(fut).await?;
            guard.record_status(response.status());
            let (parts, body) = response.into_parts();
            Ok(Response::from_parts(parts, CountingBody::new(body, guard)))
        })
    }
}

fn remote_addr_of<B>(req: &Request<B>) -> Option<String> {
    let extensions = req.extensions();
    extensions
        .get::<RemoteAddr>()
        .map(|addr| addr.0.clone())
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
}
