//! Driver catalog: the closed set of recognized backend names.
//!
//! The catalog translates user-facing driver name tokens (what goes in
//! `driver_order`) into the opaque identifiers drivers register under.
//! The set of names is closed; an unrecognized token is a configuration
//! error, never silently skipped.

use crate::error::{StoreError, StoreResult};
use std::str::FromStr;

/// Default driver preference when the configuration supplies none.
pub const DEFAULT_DRIVER_ORDER: [&str; 5] = [
    "sqlite",
    "indexeddb",
    "leveldatastore",
    "websql",
    "localstorage",
];

/// The recognized backend kinds.
///
/// Each kind corresponds to one class of storage engine; which of them
/// actually have a driver registered varies by build and host
/// environment, and selection skips the absent ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverKind {
    /// Mobile-embedded relational store.
    Sqlite,
    /// Browser indexed-object store.
    IndexedDb,
    /// Flat log-structured key-value store for non-browser use.
    LevelStore,
    /// Relational store usable in legacy browsers.
    WebSql,
    /// Simple origin-scoped string store.
    LocalStorage,
}

impl DriverKind {
    /// All recognized kinds, in default preference order.
    pub const ALL: [DriverKind; 5] = [
        DriverKind::Sqlite,
        DriverKind::IndexedDb,
        DriverKind::LevelStore,
        DriverKind::WebSql,
        DriverKind::LocalStorage,
    ];

    /// The configuration token naming this kind.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            DriverKind::Sqlite => "sqlite",
            DriverKind::IndexedDb => "indexeddb",
            DriverKind::LevelStore => "leveldatastore",
            DriverKind::WebSql => "websql",
            DriverKind::LocalStorage => "localstorage",
        }
    }

    /// The identifier a driver of this kind registers under.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            DriverKind::Sqlite => "sqlite-store",
            DriverKind::IndexedDb => "indexed-store",
            DriverKind::LevelStore => omnistore_backend::LOG_DRIVER_ID,
            DriverKind::WebSql => "websql-store",
            DriverKind::LocalStorage => "local-store",
        }
    }
}

impl FromStr for DriverKind {
    type Err = StoreError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "sqlite" => Ok(DriverKind::Sqlite),
            "indexeddb" => Ok(DriverKind::IndexedDb),
            "leveldatastore" => Ok(DriverKind::LevelStore),
            "websql" => Ok(DriverKind::WebSql),
            "localstorage" => Ok(DriverKind::LocalStorage),
            other => Err(StoreError::unknown_driver(other)),
        }
    }
}

/// Translates a driver preference list into driver identifiers.
///
/// Order is preserved exactly. The first unrecognized token fails the
/// whole translation.
///
/// # Errors
///
/// Returns [`StoreError::UnknownDriver`] naming the offending token.
pub fn resolve(order: &[String]) -> StoreResult<Vec<&'static str>> {
    order
        .iter()
        .map(|token| token.parse::<DriverKind>().map(DriverKind::id))
        .collect()
}
