//! SQLite persistence for reconciled league data.

pub mod repository;
pub mod schema;

pub use repository::Repository;
