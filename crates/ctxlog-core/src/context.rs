//! Per-request execution context carrying the logger handle and request identifier.
//!
//! # Design
//! - A context is an immutable chain of `Arc` frames; binding a value pushes a new frame
//!   in front of the parent and returns a new context, so sibling branches never see
//!   each other's bindings.
//! - Lookups walk from the newest frame, which makes the latest binding for a key win.
//! - A task-local slot exposes the context to code that was not handed one explicitly.

use std::any::{Any, TypeId};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::field::{Field, REQUEST_ID};
use crate::logger::Logger;

/// Typed lookup key. Keys match when both the name and the value type agree.
pub struct ContextKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ContextKey<T> {
    /// Declare a key with the given name.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Key name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

/// Key under which the logger handle is bound.
pub const LOGGER_KEY: ContextKey<Logger> = ContextKey::new("logger");
/// Key under which the request identifier is bound.
pub const REQUEST_ID_KEY: ContextKey<Arc<str>> = ContextKey::new(REQUEST_ID);

struct Frame {
    name: &'static str,
    type_id: TypeId,
    value: Arc<dyn Any + Send + Sync>,
    parent: Option<Arc<Frame>>,
}

/// Immutable, cheaply cloneable per-request context.
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Frame>>,
}

impl Context {
    /// Empty root context.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Return a child context with `value` bound under `key`.
    #[must_use]
    pub fn with_value<T>(&self, key: &ContextKey<T>, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self {
            head: Some(Arc::new(Frame {
                name: key.name,
                type_id: TypeId::of::<T>(),
                value: Arc::new(value),
                parent: self.head.clone(),
            })),
        }
    }

    /// Most recent value bound under `key`, if any.
    #[must_use]
    pub fn value<T>(&self, key: &ContextKey<T>) -> Option<&T>
    where
        T: 'static,
    {
        let type_id = TypeId::of::<T>();
        let mut frame = self.head.as_deref();
        while let Some(current) = frame {
            if current.type_id == type_id && current.name == key.name {
                return current.value.downcast_ref::<T>();
            }
            frame = current.parent.as_deref();
        }
        None
    }

    /// Return a child context with `logger` installed, shadowing any earlier handle.
    #[must_use]
    pub fn install(&self, logger: Logger) -> Self {
        self.with_value(&LOGGER_KEY, logger)
    }

    /// The most recently installed logger.
    ///
    /// # Panics
    ///
    /// Panics if no logger was installed anywhere in this context's chain. Install one
    /// at the root before deriving request contexts.
    #[must_use]
    pub fn current(&self) -> &Logger {
        match self.try_current() {
            Some(logger) => logger,
            None => panic!("no logger installed in context; call Context::install at startup"),
        }
    }

    /// The most recently installed logger, or `None`.
    #[must_use]
    pub fn try_current(&self) -> Option<&Logger> {
        self.value(&LOGGER_KEY)
    }

    /// Install `current().with(fields)` into a child context.
    ///
    /// # Panics
    ///
    /// Panics if no logger is installed.
    #[must_use]
    pub fn enrich<I>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = Field>,
    {
        self.install(self.current().with(fields))
    }

    /// Return a child context with the request identifier bound.
    #[must_use]
    pub fn with_request_id(&self, id: impl Into<Arc<str>>) -> Self {
        self.with_value(&REQUEST_ID_KEY, id.into())
    }

    /// Request identifier bound in this context, if any.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.value(&REQUEST_ID_KEY).map(AsRef::as_ref)
    }

    /// Run `fut` with this context reachable through [`Context::ambient`].
    pub async fn scope<Fut, T>(self, fut: Fut) -> T
    where
        Fut: Future<Output = T>,
    {
        AMBIENT_CONTEXT.scope(self, fut).await
    }

    /// The context of the enclosing [`Context::scope`], if the caller runs inside one.
    #[must_use]
    pub fn ambient() -> Option<Self> {
        AMBIENT_CONTEXT.try_with(Clone::clone).ok()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys = Vec::new();
        let mut frame = self.head.as_deref();
        while let Some(current) = frame {
            keys.push(current.name);
            frame = current.parent.as_deref();
        }
        formatter.debug_struct("Context").field("keys", &keys).finish()
    }
}

tokio::task_local! {
    static AMBIENT_CONTEXT: Context;
}
