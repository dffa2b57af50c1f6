//! CLI subcommands.

pub mod delete;
pub mod ingest;
pub mod query;
pub mod summary;
