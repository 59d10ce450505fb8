//! Dwell Storage crate - SQLite listing store.
//!
//! Provides a WAL-mode SQLite database holding the building and property
//! tables, versioned migrations, a small repository for loading listings,
//! and the read-only query executor used by the conversation workflow.

pub mod db;
pub mod executor;
pub mod listings;
pub mod migrations;

pub use db::Database;
pub use executor::SqliteExecutor;
pub use listings::{ListingRepository, NewBuilding, NewProperty};
