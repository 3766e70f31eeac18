//! Database layer
//!
//! SQLite (default, for single-binary deployment) or MySQL, selected by
//! configuration. Repositories hide the backend behind traits.
//!
//! ```ignore
//! use gitnaughty::config::DatabaseConfig;
//! use gitnaughty::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
