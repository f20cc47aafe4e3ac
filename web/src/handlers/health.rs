//! Liveness probe.

use axum::http::StatusCode;

/// Replies `ok` while the process is accepting requests. Unauthenticated,
/// mounted outside the event scope.
#[allow(clippy::unused_async)]
pub async fn healthz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}
