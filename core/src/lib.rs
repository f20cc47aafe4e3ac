//! # Marquee Core
//!
//! Domain model and orchestration for the Marquee catalog administration
//! service: the ordered lists (items, categories, questions) an event's
//! admin maintains, the reconciliation algorithm that keeps their positions
//! consistent, and the audit trail every mutation leaves behind.
//!
//! ## Core Concepts
//!
//! - **Reconciliation**: compare a submitted desired order against stored
//!   positions and persist only the records that actually moved
//!   ([`ordering`]).
//! - **Shared namespace**: built-in attendee questions order alongside
//!   persisted ones through one position space ([`system_fields`]).
//! - **Audit trail**: one record per logical change, committed atomically
//!   with the data writes it describes ([`audit`]).
//! - **Boundary traits**: persistence, access control, cache invalidation,
//!   availability, and extensions are seams ([`store`], [`access`],
//!   [`cache`], [`availability`], [`extensions`]); implementations live in
//!   sibling crates.
//!
//! ## Architecture Principles
//!
//! - Pure planning, effectful application: planners take snapshots and
//!   return change lists; services apply them in one transaction.
//! - Write avoidance: unchanged records produce no writes and no audit
//!   records.
//! - All-or-nothing requests: no partial application is ever observable.

pub mod access;
pub mod audit;
pub mod availability;
pub mod cache;
pub mod entities;
pub mod error;
pub mod extensions;
pub mod ids;
pub mod ordering;
pub mod services;
pub mod store;
pub mod system_fields;

pub use error::CatalogError;
pub use services::CatalogService;
