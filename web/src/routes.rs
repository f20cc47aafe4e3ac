//! Route table and middleware stack.

use crate::handlers::{categories, health, items, questions, quotas};
use crate::middleware::correlation;
use crate::state::AppState;
use axum::{
    middleware::from_fn,
    routing::{get, patch, post},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builds the application router.
///
/// Everything except the liveness probe lives under
/// `/api/events/{event}` and requires a bearer token.
#[must_use]
pub fn router(state: AppState) -> Router {
    // Reorder routes are registered before the id-parameter routes so the
    // static segment wins the match.
    let event_scope = Router::new()
        .route("/items", get(items::list).post(items::create))
        .route("/items/reorder/:category", post(items::reorder))
        .route(
            "/items/:item",
            get(items::detail).patch(items::update).delete(items::remove),
        )
        .route("/items/:item/up", post(items::move_up))
        .route("/items/:item/down", post(items::move_down))
        .route("/categories", get(categories::list).post(categories::create))
        .route("/categories/reorder", post(categories::reorder))
        .route(
            "/categories/:category",
            patch(categories::update).delete(categories::remove),
        )
        .route("/categories/:category/up", post(categories::move_up))
        .route("/categories/:category/down", post(categories::move_down))
        .route("/questions", get(questions::list).post(questions::create))
        .route("/questions/reorder", post(questions::reorder))
        .route(
            "/questions/:question",
            get(questions::detail)
                .patch(questions::update)
                .delete(questions::remove),
        )
        .route("/quotas", get(quotas::list).post(quotas::create))
        .route(
            "/quotas/:quota",
            get(quotas::detail).patch(quotas::update).delete(quotas::remove),
        )
        .route("/quotas/:quota/reopen", post(quotas::reopen));

    Router::new()
        .route("/healthz", get(health::healthz))
        .nest("/api/events/:event", event_scope)
        .layer(from_fn(correlation))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
