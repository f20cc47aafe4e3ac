//! Shared application state for web handlers.

use marquee_core::access::AccessControl;
use marquee_core::CatalogService;
use std::sync::Arc;

/// State shared across all handlers.
///
/// Cheap to clone; Axum clones it per request.
#[derive(Clone)]
pub struct AppState {
    /// The catalog service every handler dispatches through.
    pub service: Arc<CatalogService>,
    /// Token authentication, used by the actor extractor.
    pub access: Arc<dyn AccessControl>,
}

impl AppState {
    /// Bundle the service with its authenticator.
    #[must_use]
    pub fn new(service: Arc<CatalogService>, access: Arc<dyn AccessControl>) -> Self {
        Self { service, access }
    }
}
