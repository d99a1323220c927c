//! Interned `tracing` callsites for runtime-named fields.
//!
//! `tracing` events carry `'static` metadata whose field names are fixed at the
//! callsite. Handle fields are only known at runtime, so each distinct
//! (level, field names) combination gets one leaked callsite, created on first
//! use and reused afterwards. The set of combinations is bounded by the fields
//! the application attaches.

use std::collections::{HashMap, HashSet};
use std::sync::{LazyLock, Mutex, OnceLock, PoisonError};

use tracing::callsite::{Callsite, Identifier};
use tracing::field::FieldSet;
use tracing::metadata::Kind;
use tracing::subscriber::Interest;
use tracing::{Level, Metadata};

/// Target recorded on every entry.
pub(crate) const TARGET: &str = "ctxlog";
/// Event name recorded on every entry.
const EVENT_NAME: &str = "ctxlog entry";

type CallsiteKey = (Level, Vec<&'static str>);

static NAMES: LazyLock<Mutex<HashSet<&'static str>>> = LazyLock::new(Mutex::default);
static CALLSITES: LazyLock<Mutex<HashMap<CallsiteKey, &'static Metadata<'static>>>> =
    LazyLock::new(Mutex::default);

struct EntryCallsite {
    metadata: OnceLock<Metadata<'static>>,
}

impl Callsite for EntryCallsite {
    fn set_interest(&self, _interest: Interest) {}

    fn metadata(&self) -> &Metadata<'_> {
        self.metadata.get().unwrap_or(&UNSET_METADATA)
    }
}

struct UnsetCallsite;

impl Callsite for UnsetCallsite {
    fn set_interest(&self, _interest: Interest) {}

    fn metadata(&self) -> &Metadata<'_> {
        &UNSET_METADATA
    }
}

static UNSET_CALLSITE: UnsetCallsite = UnsetCallsite;
static UNSET_METADATA: Metadata<'static> = Metadata::new(
    EVENT_NAME,
    TARGET,
    Level::TRACE,
    None,
    None,
    None,
    FieldSet::new(&[], Identifier(&UNSET_CALLSITE)),
    Kind::EVENT,
);

/// `'static` copy of a field name, allocated once per distinct name.
pub(crate) fn intern(name: &str) -> &'static str {
    let mut names = NAMES.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(&existing) = names.get(name) {
        return existing;
    }
    let leaked: &'static str = Box::leak(name.to_owned().into_boxed_str());
    names.insert(leaked);
    leaked
}

/// Event metadata for `level` with exactly `names`, in order.
pub(crate) fn metadata(level: Level, names: Vec<&'static str>) -> &'static Metadata<'static> {
    let mut callsites = CALLSITES.lock().unwrap_or_else(PoisonError::into_inner);
    let key = (level, names);
    if let Some(&existing) = callsites.get(&key) {
        return existing;
    }

    let field_names: &'static [&'static str] = Box::leak(key.1.clone().into_boxed_slice());
    let callsite: &'static EntryCallsite = Box::leak(Box::new(EntryCallsite {
        metadata: OnceLock::new(),
    }));
    let built = callsite.metadata.get_or_init(|| {
        Metadata::new(
            EVENT_NAME,
            TARGET,
            level,
            None,
            None,
            None,
            FieldSet::new(field_names, Identifier(callsite)),
            Kind::EVENT,
        )
    });
    callsites.insert(key, built);
    built
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_reuses_the_first_allocation() {
        let first = intern("tenant");
        let second = intern(&String::from("tenant"));
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn callsites_are_shared_per_level_and_names() {
        let a = metadata(Level::INFO, vec!["message", "method"]);
        let b = metadata(Level::INFO, vec!["message", "method"]);
        let c = metadata(Level::ERROR, vec!["message", "method"]);

        assert!(std::ptr::eq(a, b));
        assert!(!std::ptr::eq(a, c));
        let names: Vec<&str> = a.fields().iter().map(|field| field.name()).collect();
        assert_eq!(names, vec!["message", "method"]);
        assert_eq!(*c.level(), Level::ERROR);
        assert!(a.callsite() == b.callsite());
        assert!(a.callsite() != c.callsite());
    }
}
