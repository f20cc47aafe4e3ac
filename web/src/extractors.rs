//! Request extractors.
//!
//! [`CurrentActor`] resolves the `Authorization: Bearer` token through the
//! configured [`AccessControl`](marquee_core::access::AccessControl) before
//! the handler body runs; a missing or unknown token never reaches the
//! service layer.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use marquee_core::access::Actor;

/// The authenticated actor behind the current request.
///
/// # Examples
///
/// ```ignore
/// async fn handler(CurrentActor(actor): CurrentActor) -> … {
///     service.list_items(actor.id, event).await
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

#[async_trait]
impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::unauthorized("Missing bearer token"))?;
        let actor = state
            .access
            .authenticate(token)
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid or revoked token"))?;
        Ok(Self(actor))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
