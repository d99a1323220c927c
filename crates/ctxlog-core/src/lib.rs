#![forbid(unsafe_code)]
#![deny(
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Request-scoped structured logging primitives.
//!
//! A root [`Logger`] is installed into a [`Context`] at startup. Transport adapters
//! derive child contexts carrying enriched handles and the request identifier, and
//! every entry emitted through a handle picks the identifier up from the context it
//! is given.
//! Layout: field.rs (typed fields), level.rs (severities), backend.rs (presets and
//! subscribers), callsite.rs (runtime field names), logger.rs (handle), context.rs
//! (carrier), config.rs, error.rs.

pub mod backend;
mod callsite;
pub mod config;
pub mod context;
pub mod error;
pub mod field;
pub mod level;
pub mod logger;

pub use backend::{Backend, Preset};
pub use config::{LoggerConfig, Output, logger_config_from_value};
pub use context::{Context, ContextKey, LOGGER_KEY, REQUEST_ID_KEY};
pub use error::{LoggerError, Result};
pub use field::{Field, FieldValue};
pub use level::Level;
pub use logger::Logger;
