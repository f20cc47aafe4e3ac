//! Quota endpoints.

use super::{AvailabilityDto, QuotaDto};
use crate::error::AppError;
use crate::extractors::CurrentActor;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use marquee_core::entities::{QuotaDraft, QuotaPatch};
use marquee_core::ids::{EventId, ItemId, QuotaId};
use serde::{Deserialize, Serialize};

/// Wire body for quota create and update. `"size": null` means unlimited.
#[derive(Debug, Default, Deserialize)]
pub struct QuotaBody {
    name: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    size: Option<Option<i64>>,
    close_when_sold_out: Option<bool>,
    items: Option<Vec<ItemId>>,
}

impl QuotaBody {
    fn into_draft(self) -> QuotaDraft {
        QuotaDraft {
            name: self.name.unwrap_or_default(),
            size: self.size.flatten(),
            close_when_sold_out: self.close_when_sold_out.unwrap_or(false),
            item_ids: self.items.unwrap_or_default(),
        }
    }

    fn into_patch(self) -> QuotaPatch {
        QuotaPatch {
            name: self.name,
            size: self.size,
            close_when_sold_out: self.close_when_sold_out,
            item_ids: self.items,
        }
    }
}

/// Wire body for the reopen action; the whole body is optional.
#[derive(Debug, Default, Deserialize)]
pub struct ReopenBody {
    #[serde(default)]
    keep_open: bool,
}

/// One row of the quota list.
#[derive(Debug, Serialize)]
pub struct QuotaOverviewDto {
    #[serde(flatten)]
    quota: QuotaDto,
    availability: AvailabilityDto,
}

/// Quota detail response.
#[derive(Debug, Serialize)]
pub struct QuotaDetailDto {
    #[serde(flatten)]
    quota: QuotaDto,
    availability: AvailabilityDto,
    /// For closed quotas: whether demand alone would exhaust the quota if it
    /// were reopened. `null` while the quota is open.
    sold_out_when_open: Option<bool>,
}

/// `GET /api/events/{event}/quotas`
pub async fn list(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(event): Path<EventId>,
) -> Result<Json<Vec<QuotaOverviewDto>>, AppError> {
    let overviews = state.service.list_quotas(actor.id, event).await?;
    Ok(Json(
        overviews
            .into_iter()
            .map(|overview| QuotaOverviewDto {
                quota: overview.quota.into(),
                availability: overview.availability.into(),
            })
            .collect(),
    ))
}

/// `POST /api/events/{event}/quotas`
pub async fn create(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(event): Path<EventId>,
    Json(body): Json<QuotaBody>,
) -> Result<Json<QuotaDto>, AppError> {
    let quota = state
        .service
        .create_quota(actor.id, event, body.into_draft())
        .await?;
    Ok(Json(quota.into()))
}

/// `GET /api/events/{event}/quotas/{quota}`
pub async fn detail(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((event, quota)): Path<(EventId, QuotaId)>,
) -> Result<Json<QuotaDetailDto>, AppError> {
    let detail = state.service.quota_detail(actor.id, event, quota).await?;
    Ok(Json(QuotaDetailDto {
        quota: detail.quota.into(),
        availability: detail.availability.into(),
        sold_out_when_open: detail.sold_out_when_open,
    }))
}

/// `PATCH /api/events/{event}/quotas/{quota}`
pub async fn update(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((event, quota)): Path<(EventId, QuotaId)>,
    Json(body): Json<QuotaBody>,
) -> Result<Json<QuotaDto>, AppError> {
    let quota = state
        .service
        .update_quota(actor.id, event, quota, body.into_patch())
        .await?;
    Ok(Json(quota.into()))
}

/// `DELETE /api/events/{event}/quotas/{quota}`
pub async fn remove(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((event, quota)): Path<(EventId, QuotaId)>,
) -> Result<StatusCode, AppError> {
    state.service.delete_quota(actor.id, event, quota).await?;
    Ok(StatusCode::OK)
}

/// `POST /api/events/{event}/quotas/{quota}/reopen`
///
/// Manually reopens a closed quota. With `{"keep_open": true}` the quota also
/// stops closing itself when it next sells out.
pub async fn reopen(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((event, quota)): Path<(EventId, QuotaId)>,
    body: Option<Json<ReopenBody>>,
) -> Result<Json<QuotaDto>, AppError> {
    let keep_open = body.map_or(false, |Json(body)| body.keep_open);
    let quota = state
        .service
        .reopen_quota(actor.id, event, quota, keep_open)
        .await?;
    Ok(Json(quota.into()))
}
