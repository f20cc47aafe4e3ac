//! Category endpoints.

use super::{parse_ids, reorder_ids, reorder_rejection, CategoryDto};
use crate::error::AppError;
use crate::extractors::CurrentActor;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use marquee_core::entities::{CategoryDraft, CategoryPatch};
use marquee_core::ids::{CategoryId, EventId};
use marquee_core::ordering::MoveDirection;
use serde::Deserialize;

/// Wire body for category create and update.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryBody {
    name: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    internal_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    description: Option<Option<String>>,
}

impl CategoryBody {
    /// Create shape: a missing name arrives as empty and fails validation
    /// in the service.
    fn into_draft(self) -> CategoryDraft {
        CategoryDraft {
            name: self.name.unwrap_or_default(),
            internal_name: self.internal_name.flatten(),
            description: self.description.flatten(),
        }
    }

    fn into_patch(self) -> CategoryPatch {
        CategoryPatch {
            name: self.name,
            internal_name: self.internal_name,
            description: self.description,
        }
    }
}

/// `GET /api/events/{event}/categories`
pub async fn list(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(event): Path<EventId>,
) -> Result<Json<Vec<CategoryDto>>, AppError> {
    let categories = state.service.list_categories(actor.id, event).await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

/// `POST /api/events/{event}/categories`
pub async fn create(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(event): Path<EventId>,
    Json(body): Json<CategoryBody>,
) -> Result<Json<CategoryDto>, AppError> {
    let category = state
        .service
        .create_category(actor.id, event, body.into_draft())
        .await?;
    Ok(Json(category.into()))
}

/// `PATCH /api/events/{event}/categories/{category}`
pub async fn update(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((event, category)): Path<(EventId, CategoryId)>,
    Json(body): Json<CategoryBody>,
) -> Result<Json<CategoryDto>, AppError> {
    let category = state
        .service
        .update_category(actor.id, event, category, body.into_patch())
        .await?;
    Ok(Json(category.into()))
}

/// `DELETE /api/events/{event}/categories/{category}`
///
/// Items of the category survive as uncategorized; the response is empty.
pub async fn remove(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((event, category)): Path<(EventId, CategoryId)>,
) -> Result<StatusCode, AppError> {
    state.service.delete_category(actor.id, event, category).await?;
    Ok(StatusCode::OK)
}

/// `POST /api/events/{event}/categories/{category}/up`
pub async fn move_up(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((event, category)): Path<(EventId, CategoryId)>,
) -> Result<StatusCode, AppError> {
    state
        .service
        .move_category(actor.id, event, category, MoveDirection::Up)
        .await?;
    Ok(StatusCode::OK)
}

/// `POST /api/events/{event}/categories/{category}/down`
pub async fn move_down(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((event, category)): Path<(EventId, CategoryId)>,
) -> Result<StatusCode, AppError> {
    state
        .service
        .move_category(actor.id, event, category, MoveDirection::Down)
        .await?;
    Ok(StatusCode::OK)
}

/// `POST /api/events/{event}/categories/reorder`
///
/// Strict reorder: the submitted ids must cover every category of the event
/// exactly once.
pub async fn reorder(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(event): Path<EventId>,
    body: Bytes,
) -> Result<Response, AppError> {
    let Some(tokens) = reorder_ids(&body) else {
        return Ok(reorder_rejection());
    };
    let ids = parse_ids::<CategoryId>(&tokens)?;
    state.service.reorder_categories(actor.id, event, &ids).await?;
    Ok(StatusCode::OK.into_response())
}
