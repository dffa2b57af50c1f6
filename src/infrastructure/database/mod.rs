//! SQLite persistence.

pub mod connection;
pub mod segment_repo;

pub use connection::DatabaseConnection;
pub use segment_repo::SqliteSegmentStore;
