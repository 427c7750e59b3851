//! Grant storage backends.
//!
//! [`MemoryAccessStore`] keeps grants in a sharded map and suits tests and
//! single-process deployments. [`SqliteAccessStore`] persists them through
//! `sqlx` so access windows survive restarts.

mod memory;
mod sqlite;

pub use memory::MemoryAccessStore;
pub use sqlite::SqliteAccessStore;
