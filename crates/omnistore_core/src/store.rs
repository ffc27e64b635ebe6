//! The storage facade.

use crate::catalog;
use crate::config::Config;
use crate::engine::Session;
use crate::error::StoreResult;
use crate::registry::Registry;
use futures::future::{BoxFuture, FutureExt, Shared};
use omnistore_backend::{Driver, LogDriver, StoreSettings};
use std::ops::ControlFlow;
use std::sync::Arc;

/// The shared one-shot initialization outcome.
type InitFuture = Shared<BoxFuture<'static, StoreResult<Session>>>;

/// Drivers that are not native to the engine and must be registered
/// explicitly before selection. Registration order here is fixed and
/// independent of any configured driver preference.
fn pluggable_drivers() -> Vec<Arc<dyn Driver>> {
    vec![Arc::new(LogDriver::new())]
}

/// A unified asynchronous key-value store.
///
/// Construction merges the caller's [`Config`] over defaults and starts
/// the initialization protocol: register pluggable drivers with the
/// process-wide [`Registry`], translate the configured driver
/// preference into driver identifiers, and activate the first viable
/// driver. The store is usable immediately: every operation awaits the
/// same initialization outcome before delegating, so callers never need
/// to wait for [`ready`](Store::ready) explicitly.
///
/// Initialization runs exactly once per store. If it fails (no viable
/// driver, unrecognized driver name), the failure is sticky: `ready`
/// and every operation return the same error for the lifetime of the
/// instance.
///
/// # Example
///
/// ```rust,no_run
/// use omnistore_core::{Config, Store};
///
/// # async fn demo() -> Result<(), omnistore_core::StoreError> {
/// let store = Store::new(&Config::new().name("myapp"));
///
/// store.set("greeting", b"hello".to_vec()).await?;
/// assert_eq!(store.get("greeting").await?, Some(b"hello".to_vec()));
/// # Ok(())
/// # }
/// ```
pub struct Store {
    settings: StoreSettings,
    init: InitFuture,
}

impl Store {
    /// Creates a store against the process-wide registry.
    ///
    /// When called within a Tokio runtime, initialization is spawned
    /// immediately so it proceeds even before the first operation is
    /// issued. Outside a runtime it runs when the first operation (or
    /// [`ready`](Store::ready)) is awaited.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::with_registry(config, Registry::global())
    }

    /// Creates a store against an explicit registry.
    ///
    /// Stores sharing a registry share one registration ledger; tests
    /// typically construct a private registry per scenario.
    #[must_use]
    pub fn with_registry(config: &Config, registry: Arc<Registry>) -> Self {
        let (settings, order) = config.merge_over_defaults();

        let init_settings = settings.clone();
        let init = async move {
            for driver in pluggable_drivers() {
                registry.ensure_registered(driver).await;
            }
            let priority = catalog::resolve(&order)?;
            registry
                .engine()
                .open_session(&init_settings, &priority)
                .await
        }
        .boxed()
        .shared();

        // Drive initialization eagerly when a runtime is available;
        // otherwise the first awaited operation drives it.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(init.clone());
        }

        Self { settings, init }
    }

    /// Resolves when initialization has completed.
    ///
    /// Waiting here is optional (operations wait on their own) but
    /// lets callers surface a configuration problem up front.
    pub async fn ready(&self) -> StoreResult<()> {
        self.init.clone().await.map(|_| ())
    }

    /// The identifier of the active driver, or `None` while
    /// initialization is still pending or has failed.
    #[must_use]
    pub fn driver(&self) -> Option<String> {
        self.init
            .peek()
            .and_then(|outcome| outcome.as_ref().ok())
            .map(|session| session.driver_id.clone())
    }

    /// The merged settings this store was constructed with.
    #[must_use]
    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    async fn session(&self) -> StoreResult<Session> {
        self.init.clone().await
    }

    /// Reads the value stored under `key`, or `None` if absent.
    pub async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let session = self.session().await?;
        Ok(session.connection.get(key).await?)
    }

    /// Checks whether a value is stored under `key`.
    pub async fn has(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Stores `value` under `key`, overwriting unconditionally.
    ///
    /// Returns the bytes that were written.
    pub async fn set(
        &self,
        key: &str,
        value: impl Into<Vec<u8>> + Send,
    ) -> StoreResult<Vec<u8>> {
        let value = value.into();
        let session = self.session().await?;
        session.connection.set(key, &value).await?;
        Ok(value)
    }

    /// Removes `key`. Removing an absent key is not an error.
    pub async fn remove(&self, key: &str) -> StoreResult<()> {
        let session = self.session().await?;
        Ok(session.connection.remove(key).await?)
    }

    /// Removes every key in this store's namespace.
    ///
    /// Sibling stores with a different `store_name` under the same
    /// `name` are unaffected.
    pub async fn clear(&self) -> StoreResult<()> {
        let session = self.session().await?;
        Ok(session.connection.clear().await?)
    }

    /// Returns the number of entries in this store's namespace.
    pub async fn len(&self) -> StoreResult<usize> {
        let session = self.session().await?;
        Ok(session.connection.len().await?)
    }

    /// Checks whether this store's namespace is empty.
    pub async fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Returns all keys in this store's namespace, in backend-defined
    /// order.
    pub async fn keys(&self) -> StoreResult<Vec<String>> {
        let session = self.session().await?;
        Ok(session.connection.keys().await?)
    }

    /// Visits every entry as `(value, key, ordinal)` in backend-defined
    /// order. Returning [`ControlFlow::Break`] stops the iteration.
    pub async fn for_each<F>(&self, mut visit: F) -> StoreResult<()>
    where
        F: FnMut(&[u8], &str, usize) -> ControlFlow<()> + Send,
    {
        let session = self.session().await?;
        Ok(session.connection.iterate(&mut visit).await?)
    }

    /// Tears down the underlying store instance.
    ///
    /// Delegates to the backend's destructive teardown hook; backends
    /// without one treat this as a no-op.
    pub async fn close(&self) -> StoreResult<()> {
        let session = self.session().await?;
        Ok(session.connection.drop_instance().await?)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.settings.name)
            .field("store_name", &self.settings.store_name)
            .field("driver", &self.driver())
            .finish_non_exhaustive()
    }
}
