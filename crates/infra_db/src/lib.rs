//! Database infrastructure layer
//!
//! PostgreSQL adapters for the billing domain ports, built on SQLx:
//! connection pool management, schema migrations, and the
//! `PostgresLedgerStore` implementation of the `LedgerStore` port.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresLedgerStore};
//!
//! let config = DatabaseConfig::new("postgres://localhost/waterworks");
//! let pool = create_pool(config.clone()).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresLedgerStore::new(pool)
//!     .with_transaction_timeout(config.transaction_timeout);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;

pub use adapters::PostgresLedgerStore;
pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool};
