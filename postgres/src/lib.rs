//! # Marquee Postgres
//!
//! PostgreSQL implementations of the Marquee boundary traits:
//!
//! - [`PgCatalogStore`]: the catalog store, including transactional writes
//!   and the audit log
//! - [`PgAccessControl`]: bearer-token resolution and per-event capability
//!   checks
//! - [`PgAvailability`]: row-counting quota availability reference
//!   implementation
//!
//! All three share one connection pool; see [`connect`].

pub mod access;
pub mod availability;
pub mod store;

pub use access::PgAccessControl;
pub use availability::PgAvailability;
pub use store::{PgCatalogStore, PgCatalogTransaction};

use marquee_core::store::StoreError;
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Opens a connection pool.
///
/// # Errors
///
/// Returns [`StoreError`] if the database is unreachable.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to connect: {e}")))
}
