//! Driver and connection capability traits.

use crate::error::BackendResult;
use async_trait::async_trait;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;

/// Settings handed to a driver when it opens a store.
///
/// This is the fully-merged form of the user configuration: every field
/// is concrete. Which fields a driver consumes is driver-specific; a
/// driver ignores the ones it has no use for (`size` is a byte hint for
/// quota-limited stores, `path` is a filesystem hint, `db_key` is an
/// alias of `name` for stores that address databases by key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// Logical database identifier. Also used as a key namespace prefix
    /// by backends that have no native namespacing.
    pub name: String,

    /// Sub-namespace within the database (table / object-store name).
    pub store_name: String,

    /// Byte-size hint for quota-limited backends.
    pub size: u64,

    /// Human-readable description of the store.
    pub description: String,

    /// Alias of `name` for backends that address databases by key.
    pub db_key: String,

    /// Filesystem location hint for file-backed backends.
    pub path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            name: "_omnistore".to_string(),
            store_name: "_omnikv".to_string(),
            size: 4_980_736, // ~4.75 MB, the conventional quota hint
            description: String::new(),
            db_key: "_omnikey".to_string(),
            path: std::env::temp_dir().join("omnistore"),
        }
    }
}

/// Callback invoked for each entry during iteration.
///
/// Receives `(value, key, ordinal)`. Returning [`ControlFlow::Break`]
/// stops the iteration early.
pub type IterVisitor<'a> = &'a mut (dyn FnMut(&[u8], &str, usize) -> ControlFlow<()> + Send);

/// A storage driver: one selectable backend implementation.
///
/// A driver is registered once per process under its identifier and can
/// open any number of stores. Selection walks the configured priority
/// list and activates the first driver whose [`probe`](Driver::probe)
/// succeeds.
///
/// # Invariants
///
/// - `id` is stable for the lifetime of the driver instance
/// - `probe` must be side-effect free; it may be called at any time,
///   including concurrently with `open`
/// - `open` scopes the returned connection to `(name, store_name)`;
///   two connections with different settings must not observe each
///   other's keys
#[async_trait]
pub trait Driver: Send + Sync {
    /// The opaque identifier this driver is registered under.
    fn id(&self) -> &str;

    /// Checks whether this driver is usable in the current environment.
    async fn probe(&self) -> bool;

    /// Opens a store scoped to the given settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be opened, for
    /// example when another instance holds an exclusive lock.
    async fn open(&self, settings: &StoreSettings) -> BackendResult<Arc<dyn Connection>>;
}

/// An open store connection bound to one `(name, store_name)` namespace.
///
/// Values are opaque byte payloads; encoding is the caller's concern.
/// All operations apply to this connection's namespace only.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Reads the value stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>>;

    /// Stores `value` under `key`, overwriting unconditionally.
    async fn set(&self, key: &str, value: &[u8]) -> BackendResult<()>;

    /// Removes `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> BackendResult<()>;

    /// Removes every key in this store's namespace.
    async fn clear(&self) -> BackendResult<()>;

    /// Returns the number of entries in this store's namespace.
    async fn len(&self) -> BackendResult<usize>;

    /// Returns all keys in this store's namespace.
    ///
    /// Key order is backend-defined and not guaranteed to be stable
    /// across backends.
    async fn keys(&self) -> BackendResult<Vec<String>>;

    /// Visits every entry in backend-defined order.
    async fn iterate(&self, visit: IterVisitor<'_>) -> BackendResult<()>;

    /// Destructive teardown of this store instance.
    ///
    /// Backends without destructive teardown keep the default no-op.
    async fn drop_instance(&self) -> BackendResult<()> {
        Ok(())
    }
}
