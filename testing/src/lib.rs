//! # Marquee Testing
//!
//! In-memory fakes and fixtures shared by the Marquee test suites.
//!
//! The centerpiece is [`MemoryStore`], a transactional [`CatalogStore`]
//! implementation backed by plain maps. It honors the same ordering and
//! cascade contracts as the Postgres store, so service tests written
//! against it describe real behavior rather than mock choreography.
//!
//! [`CatalogStore`]: marquee_core::store::CatalogStore

pub mod fakes;
pub mod fixtures;
pub mod memory;

pub use fakes::{AllowAll, DenyAll, RecordingInvalidator, StaticAvailability};
pub use memory::MemoryStore;

/// Installs a test-friendly tracing subscriber honoring `RUST_LOG`.
///
/// Safe to call from every test; only the first call per process wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
