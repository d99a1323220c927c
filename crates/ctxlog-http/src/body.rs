//! Response capture: byte counting body and the completion entry.
//!
//! # Design
//! - `CompletionGuard` emits `request completed` from `Drop`, so exactly one entry is
//!   written whether the response finishes, the body is abandoned, the inner service
//!   errors, or the request future is cancelled or unwinds.
//! - `CountingBody` owns the guard while the response streams and releases it at end of
//!   stream, which makes the byte count final.

use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use std::time::Instant;

use axum::http::StatusCode;
use bytes::Buf;
use ctxlog_core::Context;
use ctxlog_core::field::{BYTES, DURATION, Field, STATUS};
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;

/// Message of the per-request completion entry.
pub const REQUEST_COMPLETED: &str = "request completed";

/// Status and byte count observed for one response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
    status: u16,
    bytes: u64,
}

impl ResponseMetadata {
    /// Final status code, `0` when no response was produced.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Body bytes handed to the transport.
    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.bytes
    }

    fn record_status(&mut self, status: StatusCode) {
        self.status = status.as_u16();
    }

    fn record_bytes(&mut self, count: usize) {
        let count = u64::try_from(count).unwrap_or(u64::MAX);
        self.bytes = self.bytes.saturating_add(count);
    }
}

/// Emits the completion entry for one request when dropped.
pub(crate) struct CompletionGuard {
    ctx: Context,
    started: Instant,
    metadata: ResponseMetadata,
}

impl CompletionGuard {
    pub(crate) fn start(ctx: Context) -> Self {
        Self {
            ctx,
            started: Instant::now(),
            metadata: ResponseMetadata::default(),
        }
    }

    pub(crate) fn record_status(&mut self, status: StatusCode) {
        self.metadata.record_status(status);
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        self.ctx.current().info(
            &self.ctx,
            REQUEST_COMPLETED,
            [
                Field::uint(STATUS, u64::from(self.metadata.status())),
                Field::uint(BYTES, self.metadata.bytes_written()),
                Field::duration(DURATION, elapsed),
            ],
        );
    }
}

pin_project! {
    /// Response body wrapper counting data bytes as they are polled.
    pub struct CountingBody<B> {
        #[pin]
        inner: B,
        guard: Option<CompletionGuard>,
    }
}

impl<B> CountingBody<B> {
    pub(crate) fn new(inner: B, guard: CompletionGuard) -> Self {
        Self {
            inner,
            guard: Some(guard),
        }
    }
}

impl<B> Body for CountingBody<B>
where
    B: Body,
{
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.project();
        let polled = this.inner.poll_frame(cx);
        match &polled {
            Poll::Ready(Some(Ok(frame))) => {
                if let (Some(data), Some(guard)) = (frame.data_ref(), this.guard.as_mut()) {
                    guard.metadata.record_bytes(data.remaining());
                }
            }
            Poll::Ready(Some(Err(_)) | None) => {
                drop(this.guard.take());
            }
            Poll::Pending => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
