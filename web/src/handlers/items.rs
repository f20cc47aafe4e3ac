//! Item endpoints.

use super::{
    double_option, parse_ids, reorder_ids, reorder_rejection, CategoryDto, ItemDto,
};
use crate::error::AppError;
use crate::extractors::CurrentActor;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use marquee_core::entities::ItemPatch;
use marquee_core::extensions::FormSection;
use marquee_core::ids::{CategoryId, EventId, ItemId};
use marquee_core::ordering::MoveDirection;
use marquee_core::services::ItemRemoval;
use serde::{Deserialize, Serialize};

/// Wire body for item create and update. Every field is optional; on create,
/// missing fields fall back to the service defaults (or the copy source).
#[derive(Debug, Default, Deserialize)]
pub struct ItemBody {
    name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    internal_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    category: Option<Option<CategoryId>>,
    active: Option<bool>,
    admission: Option<bool>,
    default_price_cents: Option<i64>,
}

impl ItemBody {
    fn into_patch(self) -> ItemPatch {
        ItemPatch {
            name: self.name,
            internal_name: self.internal_name,
            category: self.category,
            active: self.active,
            admission: self.admission,
            default_price_cents: self.default_price_cents,
        }
    }
}

/// Query parameters for item creation.
#[derive(Debug, Default, Deserialize)]
pub struct CreateItemQuery {
    copy_from: Option<ItemId>,
}

/// Item list response: categories in display order plus items in catalog
/// order.
#[derive(Debug, Serialize)]
pub struct ItemOverviewDto {
    categories: Vec<CategoryDto>,
    items: Vec<ItemDto>,
}

/// Item detail response.
#[derive(Debug, Serialize)]
pub struct ItemDetailDto {
    item: ItemDto,
    sections: Vec<FormSection>,
}

/// How a delete request ended.
#[derive(Debug, Serialize)]
pub struct RemovalDto {
    outcome: &'static str,
}

/// `GET /api/events/{event}/items`
pub async fn list(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(event): Path<EventId>,
) -> Result<Json<ItemOverviewDto>, AppError> {
    let overview = state.service.list_items(actor.id, event).await?;
    Ok(Json(ItemOverviewDto {
        categories: overview.categories.into_iter().map(Into::into).collect(),
        items: overview.items.into_iter().map(Into::into).collect(),
    }))
}

/// `POST /api/events/{event}/items`
pub async fn create(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(event): Path<EventId>,
    Query(query): Query<CreateItemQuery>,
    Json(body): Json<ItemBody>,
) -> Result<Json<ItemDto>, AppError> {
    let item = state
        .service
        .create_item(actor.id, event, body.into_patch(), query.copy_from)
        .await?;
    Ok(Json(item.into()))
}

/// `GET /api/events/{event}/items/{item}`
pub async fn detail(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((event, item)): Path<(EventId, ItemId)>,
) -> Result<Json<ItemDetailDto>, AppError> {
    let detail = state.service.item_detail(actor.id, event, item).await?;
    Ok(Json(ItemDetailDto {
        item: detail.item.into(),
        sections: detail.sections,
    }))
}

/// `PATCH /api/events/{event}/items/{item}`
pub async fn update(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((event, item)): Path<(EventId, ItemId)>,
    Json(body): Json<ItemBody>,
) -> Result<Json<ItemDto>, AppError> {
    let item = state
        .service
        .update_item(actor.id, event, item, body.into_patch())
        .await?;
    Ok(Json(item.into()))
}

/// `DELETE /api/events/{event}/items/{item}`
pub async fn remove(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((event, item)): Path<(EventId, ItemId)>,
) -> Result<Json<RemovalDto>, AppError> {
    let removal = state.service.delete_item(actor.id, event, item).await?;
    let outcome = match removal {
        ItemRemoval::Deleted => "deleted",
        ItemRemoval::Disabled => "disabled",
    };
    Ok(Json(RemovalDto { outcome }))
}

/// `POST /api/events/{event}/items/{item}/up`
pub async fn move_up(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((event, item)): Path<(EventId, ItemId)>,
) -> Result<StatusCode, AppError> {
    state
        .service
        .move_item(actor.id, event, item, MoveDirection::Up)
        .await?;
    Ok(StatusCode::OK)
}

/// `POST /api/events/{event}/items/{item}/down`
pub async fn move_down(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((event, item)): Path<(EventId, ItemId)>,
) -> Result<StatusCode, AppError> {
    state
        .service
        .move_item(actor.id, event, item, MoveDirection::Down)
        .await?;
    Ok(StatusCode::OK)
}

/// `POST /api/events/{event}/items/reorder/{category}`
///
/// Relaxed reorder into the named category scope; category `0` addresses the
/// uncategorized scope.
pub async fn reorder(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((event, category)): Path<(EventId, i64)>,
    body: Bytes,
) -> Result<Response, AppError> {
    let Some(tokens) = reorder_ids(&body) else {
        return Ok(reorder_rejection());
    };
    let ids = parse_ids::<ItemId>(&tokens)?;
    let target = (category != 0).then_some(CategoryId::new(category));
    state
        .service
        .reorder_items(actor.id, event, target, &ids)
        .await?;
    Ok(StatusCode::OK.into_response())
}
