//! # mailroom-database
//!
//! Embedded persistence for the mailroom tracking service: a single-file
//! SQLite store in WAL mode with short-lived read handles, a serialized
//! write queue in front of the sole writer, schema/migrations, and the
//! per-entity repositories.

pub mod audit;
pub mod params;
pub mod repositories;
pub mod schema;
pub mod store;
pub mod write_queue;

pub use audit::AuditSink;
pub use store::Store;
pub use write_queue::{WriteQueue, WriteStmt};
