//! Storage engine: the driver table and the selection walk.

use crate::error::{StoreError, StoreResult};
use omnistore_backend::{Connection, Driver, StoreSettings};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// An activated store session.
///
/// Pairs the identifier of the driver that won the selection walk with
/// the connection it opened. Cloning shares the same connection.
#[derive(Clone)]
pub struct Session {
    /// Identifier of the driver that was activated.
    pub driver_id: String,
    /// The open connection, scoped to one `(name, store_name)`.
    pub connection: Arc<dyn Connection>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("driver_id", &self.driver_id)
            .finish_non_exhaustive()
    }
}

/// The storage engine: a table of registered drivers plus the
/// priority-ordered selection walk.
///
/// Registration is **not** idempotent at this level: registering the
/// same identifier twice is an error, because re-registration could
/// clobber state observed by stores already using that driver. The
/// [`Registry`](crate::Registry) layers the idempotent, serialized
/// `ensure_registered` protocol on top.
#[derive(Default)]
pub struct Engine {
    drivers: RwLock<HashMap<String, Arc<dyn Driver>>>,
}

impl Engine {
    /// Creates an engine with an empty driver table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine pre-populated with the given drivers.
    ///
    /// These are the engine's "native" drivers: present without any
    /// explicit registration step.
    #[must_use]
    pub fn with_drivers(drivers: impl IntoIterator<Item = Arc<dyn Driver>>) -> Self {
        let table = drivers
            .into_iter()
            .map(|d| (d.id().to_string(), d))
            .collect();
        Self {
            drivers: RwLock::new(table),
        }
    }

    /// Registers a driver under its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyRegistered`] if the identifier is
    /// already taken.
    pub fn register(&self, driver: Arc<dyn Driver>) -> StoreResult<()> {
        let id = driver.id().to_string();
        let mut drivers = self.drivers.write();
        if drivers.contains_key(&id) {
            return Err(StoreError::already_registered(id));
        }
        debug!(driver = %id, "driver registered");
        drivers.insert(id, driver);
        Ok(())
    }

    /// Looks up a registered driver by identifier.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<Arc<dyn Driver>> {
        self.drivers.read().get(id).cloned()
    }

    /// Checks whether a driver is registered under `id`.
    #[must_use]
    pub fn is_registered(&self, id: &str) -> bool {
        self.drivers.read().contains_key(id)
    }

    /// Returns the number of registered drivers.
    #[must_use]
    pub fn driver_count(&self) -> usize {
        self.drivers.read().len()
    }

    /// Walks the identifier priority list and opens the first viable
    /// driver.
    ///
    /// An identifier with no registered driver, a failed capability
    /// probe, or a failed open each move the walk to the next entry;
    /// only an exhausted list is an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoViableDriver`] when nothing in the list
    /// could be activated.
    pub async fn open_session(
        &self,
        settings: &StoreSettings,
        priority: &[&str],
    ) -> StoreResult<Session> {
        for &id in priority {
            let Some(driver) = self.lookup(id) else {
                debug!(driver = %id, "no driver registered under this identifier, skipping");
                continue;
            };

            if !driver.probe().await {
                debug!(driver = %id, "capability probe failed, skipping");
                continue;
            }

            match driver.open(settings).await {
                Ok(connection) => {
                    info!(
                        driver = %id,
                        name = %settings.name,
                        store_name = %settings.store_name,
                        "storage driver activated"
                    );
                    return Ok(Session {
                        driver_id: id.to_string(),
                        connection,
                    });
                }
                Err(e) => {
                    warn!(driver = %id, error = %e, "driver failed to open, trying next");
                }
            }
        }

        Err(StoreError::NoViableDriver)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("driver_count", &self.driver_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnistore_backend::MemoryDriver;

    fn settings() -> StoreSettings {
        StoreSettings::default()
    }

    #[test]
    fn register_and_lookup() {
        let engine = Engine::new();
        engine
            .register(Arc::new(MemoryDriver::new()))
            .unwrap();

        assert!(engine.is_registered("memory-store"));
        assert!(engine.lookup("memory-store").is_some());
        assert!(engine.lookup("other").is_none());
        assert_eq!(engine.driver_count(), 1);
    }

    #[test]
    fn duplicate_registration_fails() {
        let engine = Engine::new();
        engine.register(Arc::new(MemoryDriver::new())).unwrap();

        let result = engine.register(Arc::new(MemoryDriver::new()));
        assert!(matches!(result, Err(StoreError::AlreadyRegistered { .. })));
    }

    #[tokio::test]
    async fn selection_activates_first_viable() {
        let engine = Engine::with_drivers([
            Arc::new(MemoryDriver::new().with_id("first").unavailable()) as Arc<dyn Driver>,
            Arc::new(MemoryDriver::new().with_id("second")),
            Arc::new(MemoryDriver::new().with_id("third")),
        ]);

        let session = engine
            .open_session(&settings(), &["first", "second", "third"])
            .await
            .unwrap();
        assert_eq!(session.driver_id, "second");
    }

    #[tokio::test]
    async fn selection_skips_unregistered_identifiers() {
        let engine = Engine::with_drivers([
            Arc::new(MemoryDriver::new().with_id("present")) as Arc<dyn Driver>,
        ]);

        let session = engine
            .open_session(&settings(), &["absent", "present"])
            .await
            .unwrap();
        assert_eq!(session.driver_id, "present");
    }

    #[tokio::test]
    async fn selection_respects_priority_order() {
        let engine = Engine::with_drivers([
            Arc::new(MemoryDriver::new().with_id("a")) as Arc<dyn Driver>,
            Arc::new(MemoryDriver::new().with_id("b")),
        ]);

        let session = engine.open_session(&settings(), &["b", "a"]).await.unwrap();
        assert_eq!(session.driver_id, "b");
    }

    #[tokio::test]
    async fn exhausted_list_is_fatal() {
        let engine = Engine::with_drivers([
            Arc::new(MemoryDriver::new().with_id("down").unavailable()) as Arc<dyn Driver>,
        ]);

        let result = engine.open_session(&settings(), &["down", "missing"]).await;
        assert!(matches!(result, Err(StoreError::NoViableDriver)));
    }

    #[tokio::test]
    async fn empty_priority_list_is_fatal() {
        let engine = Engine::new();
        let result = engine.open_session(&settings(), &[]).await;
        assert!(matches!(result, Err(StoreError::NoViableDriver)));
    }
}
