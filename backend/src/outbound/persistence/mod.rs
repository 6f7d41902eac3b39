//! PostgreSQL persistence for provisioned users.
//!
//! [`DieselUserStore`] implements the domain's `UserStore` port with Diesel,
//! `diesel-async` and a `bb8` pool.
//!
//! - Row structs (`models.rs`) and table definitions (`schema.rs`) stay
//!   private to this module; only domain types cross the port.
//! - Database failures are mapped to `UserStoreError`; unique violations
//!   become conflicts.
//! - The schema ships as embedded migrations applied by
//!   [`run_pending_migrations`].
//!
//! # Example
//!
//! ```rust,no_run
//! use scim_backend::outbound::persistence::{DbPool, DieselUserStore, PoolConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/scim")).await?;
//! let store = DieselUserStore::new(pool);
//! # let _ = store;
//! # Ok(())
//! # }
//! ```

mod child_rows;
mod diesel_user_store;
mod migrations;
mod models;
mod pool;
mod schema;
mod user_store_error_mapping;

pub use diesel_user_store::DieselUserStore;
pub use migrations::{MIGRATIONS, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
