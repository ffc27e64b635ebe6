//! In-memory driver for tests and ephemeral storage.

use crate::driver::{Connection, Driver, IterVisitor, StoreSettings};
use crate::error::BackendResult;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::ops::ControlFlow;
use std::sync::Arc;

/// Identifier the memory driver registers under by default.
pub const MEMORY_DRIVER_ID: &str = "memory-store";

type Entries = Arc<RwLock<BTreeMap<String, Vec<u8>>>>;

/// An in-memory storage driver.
///
/// Stores are keyed by `(name, store_name)` and shared between
/// connections opened from the same driver instance, so data written
/// through one store handle is visible through another with the same
/// settings. Nothing survives the driver instance.
///
/// Suitable for:
/// - Unit and integration tests
/// - Ephemeral stores that don't need persistence
/// - Standing in for an absent backend: [`with_id`](Self::with_id)
///   registers the driver under any identifier, and
///   [`unavailable`](Self::unavailable) makes its capability probe
///   fail, which is how selection-order tests simulate a backend that
///   is not viable in the current environment.
///
/// # Example
///
/// ```rust
/// use omnistore_backend::MemoryDriver;
///
/// let standin = MemoryDriver::new().with_id("sqlite-store").unavailable();
/// assert_eq!(standin.id(), "sqlite-store");
/// ```
#[derive(Debug)]
pub struct MemoryDriver {
    id: String,
    available: bool,
    stores: Arc<RwLock<HashMap<(String, String), Entries>>>,
}

impl MemoryDriver {
    /// Creates a new memory driver under the default identifier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: MEMORY_DRIVER_ID.to_string(),
            available: true,
            stores: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Sets the identifier this driver registers under.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Makes the capability probe report this driver as not viable.
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// The identifier this driver instance uses.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    fn entries_for(&self, settings: &StoreSettings) -> Entries {
        let key = (settings.name.clone(), settings.store_name.clone());
        let mut stores = self.stores.write();
        Arc::clone(stores.entry(key).or_default())
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    fn id(&self) -> &str {
        &self.id
    }

    async fn probe(&self) -> bool {
        self.available
    }

    async fn open(&self, settings: &StoreSettings) -> BackendResult<Arc<dyn Connection>> {
        let entries = self.entries_for(settings);
        Ok(Arc::new(MemoryConnection {
            namespace: (settings.name.clone(), settings.store_name.clone()),
            entries,
            stores: Arc::clone(&self.stores),
        }))
    }
}

/// A connection to one in-memory store.
#[derive(Debug)]
pub struct MemoryConnection {
    namespace: (String, String),
    entries: Entries,
    stores: Arc<RwLock<HashMap<(String, String), Entries>>>,
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> BackendResult<()> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn remove(&self, key: &str) -> BackendResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn clear(&self) -> BackendResult<()> {
        self.entries.write().clear();
        Ok(())
    }

    async fn len(&self) -> BackendResult<usize> {
        Ok(self.entries.read().len())
    }

    async fn keys(&self) -> BackendResult<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    async fn iterate(&self, visit: IterVisitor<'_>) -> BackendResult<()> {
        let entries = self.entries.read();
        for (ordinal, (key, value)) in entries.iter().enumerate() {
            if let ControlFlow::Break(()) = visit(value, key, ordinal) {
                break;
            }
        }
        Ok(())
    }

    async fn drop_instance(&self) -> BackendResult<()> {
        self.stores.write().remove(&self.namespace);
        self.entries.write().clear();
        Ok(())
    }
}
