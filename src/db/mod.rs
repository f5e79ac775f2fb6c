//! Database layer
//!
//! SQLite storage for the museum tour backend. Each document collection of
//! the domain is a table; list-valued fields are stored as JSON text.
//!
//! # Usage
//!
//! ```ignore
//! use museum_tour::config::DatabaseConfig;
//! use museum_tour::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool, SqliteDatabase};
