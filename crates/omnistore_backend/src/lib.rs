//! # Omnistore Backend
//!
//! Backend capability contract and reference backends for Omnistore.
//!
//! This crate defines the minimal contract every storage backend must
//! satisfy (a [`Driver`] that can be probed for viability and opened,
//! and a [`Connection`] scoped to one `(name, store_name)` namespace)
//! plus two reference implementations.
//!
//! ## Design Principles
//!
//! - Backends store opaque byte payloads; value encoding is the
//!   caller's concern
//! - A driver's capability probe decides whether it is viable in the
//!   current environment; selection order is decided elsewhere
//! - Drivers and connections must be `Send + Sync` for concurrent use
//!
//! ## Available Backends
//!
//! - [`MemoryDriver`] - In-memory, for tests and ephemeral stores
//! - [`LogDriver`] - Flat log-structured file store for server and
//!   desktop processes

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod driver;
mod error;
mod log;
mod memory;

pub use driver::{Connection, Driver, IterVisitor, StoreSettings};
pub use error::{BackendError, BackendResult};
pub use log::{LogConnection, LogDriver, LOG_DRIVER_ID};
pub use memory::{MemoryConnection, MemoryDriver, MEMORY_DRIVER_ID};
