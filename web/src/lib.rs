//! HTTP admin API for the Marquee catalog.
//!
//! This crate is the imperative shell around
//! [`CatalogService`](marquee_core::CatalogService): handlers parse and
//! authenticate requests, dispatch one service call, and map the result to
//! JSON. No domain logic lives here: validation, ordering, auditing and
//! permission checks all happen behind the service boundary.
//!
//! # Request flow
//!
//! 1. Middleware assigns a correlation id and opens the request span.
//! 2. The [`CurrentActor`](extractors::CurrentActor) extractor resolves the
//!    bearer token; unauthenticated requests stop here with 401.
//! 3. The handler parses path, query and body into domain types.
//! 4. One `CatalogService` call does the work inside one transaction.
//! 5. [`AppError`] maps domain failures to status + JSON body.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use routes::router;
pub use state::AppState;
