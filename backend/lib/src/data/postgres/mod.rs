//! PostgreSQL data access module
//!
//! Tables are described in [`schema`] and created by the SQL migrations shipped
//! with this crate.

pub mod pool;
pub mod repository;
pub mod schema;

pub use pool::{DbConnection, PoolSettings, SmartPool};
pub use repository::PostgresRepository;
