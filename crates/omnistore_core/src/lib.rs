//! Unified asynchronous key-value storage with prioritized backend
//! selection.
//!
//! A [`Store`] fronts one of several interchangeable storage backends.
//! At construction it merges the caller's [`Config`] over defaults,
//! registers pluggable drivers with the process-wide [`Registry`], and
//! walks the configured driver preference until one driver passes its
//! capability probe and opens. Callers never deal with the selection
//! machinery: every operation implicitly awaits initialization, so a
//! store is usable the moment it is constructed.
//!
//! ```rust,no_run
//! use omnistore_core::{Config, Store};
//!
//! # async fn demo() -> Result<(), omnistore_core::StoreError> {
//! let store = Store::new(
//!     &Config::new()
//!         .name("myapp")
//!         .driver_order(["leveldatastore", "localstorage"]),
//! );
//!
//! store.set("counter", b"1".to_vec()).await?;
//! println!("active driver: {:?}", store.driver());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
mod config;
mod engine;
mod error;
mod registry;
mod store;

pub use catalog::{DriverKind, DEFAULT_DRIVER_ORDER};
pub use config::Config;
pub use engine::{Engine, Session};
pub use error::{StoreError, StoreResult};
pub use registry::Registry;
pub use store::Store;

// Backend surface, re-exported so driver implementors need only this
// crate.
pub use omnistore_backend::{
    BackendError, BackendResult, Connection, Driver, IterVisitor, LogDriver,
    MemoryDriver, StoreSettings, LOG_DRIVER_ID, MEMORY_DRIVER_ID,
};
