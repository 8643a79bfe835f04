//! # dbshift
//!
//! Schema version shifting for PostgreSQL on the `may` coroutine runtime.
//!
//! A database is moved between named versions by running the stages in between,
//! forward or backward, together with the version marker update in a single
//! transaction. See [`migration`] for the resolver and the migrator.

pub mod config;
pub mod connection;
pub mod executor;
pub mod migration;
pub mod transaction;

#[cfg(feature = "tracing")]
pub mod tracing_helpers;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use config::ShiftConfig;
pub use connection::{connect, validate_connection_string, ConnectionError};
pub use executor::{MayPostgresExecutor, ShiftError, ShiftExecutor};
pub use transaction::{Session, Transaction, TransactionError, Transactional};
