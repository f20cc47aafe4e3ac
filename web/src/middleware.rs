//! Request-tracking middleware.
//!
//! Every request gets a correlation id: taken from the `X-Correlation-ID`
//! header when the client sent one, freshly generated otherwise. The id is
//! stored in request extensions, attached to the request's tracing span, and
//! echoed back in the response header.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Correlation id of one request, available via `Extension<CorrelationId>`.
#[derive(Debug, Clone)]
pub struct CorrelationId(pub String);

/// Middleware function for [`axum::middleware::from_fn`].
pub async fn correlation(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), ToString::to_string);

    request.extensions_mut().insert(CorrelationId(id.clone()));

    let span = tracing::info_span!("http", correlation_id = %id);
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}
