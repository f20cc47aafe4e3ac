//! HTTP handlers, one module per entity.
//!
//! Response DTOs shared across modules live here. Request bodies are defined
//! next to the handlers that consume them; nullable fields use the
//! double-`Option` pattern so a patch can tell "absent" from "set to null".

pub mod categories;
pub mod health;
pub mod items;
pub mod questions;
pub mod quotas;

use crate::error::AppError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use marquee_core::availability::{AvailabilityLevel, QuotaSnapshot};
use marquee_core::entities::{Category, Item, Question, QuestionKind, Quota};
use marquee_core::error::CatalogError;
use marquee_core::ids::{CategoryId, ItemId, OptionId, QuestionId, QuotaId};
use marquee_core::ordering::ReorderError;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// A category as returned by the API.
#[derive(Debug, Serialize)]
pub struct CategoryDto {
    /// Category identifier.
    pub id: CategoryId,
    /// Public name.
    pub name: String,
    /// Backend-only name.
    pub internal_name: Option<String>,
    /// Public description.
    pub description: Option<String>,
    /// Rank within the event.
    pub position: i32,
}

impl From<Category> for CategoryDto {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            internal_name: category.internal_name,
            description: category.description,
            position: category.position,
        }
    }
}

/// An item as returned by the API.
#[derive(Debug, Serialize)]
pub struct ItemDto {
    /// Item identifier.
    pub id: ItemId,
    /// Owning category, `null` for uncategorized items.
    pub category: Option<CategoryId>,
    /// Public name.
    pub name: String,
    /// Backend-only name.
    pub internal_name: Option<String>,
    /// Whether the item is on sale.
    pub active: bool,
    /// Whether the item admits a person.
    pub admission: bool,
    /// Default price in minor units.
    pub default_price_cents: i64,
    /// Rank within the category scope.
    pub position: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Item> for ItemDto {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            category: item.category,
            name: item.name,
            internal_name: item.internal_name,
            active: item.active,
            admission: item.admission,
            default_price_cents: item.default_price_cents,
            position: item.position,
            created_at: item.created_at,
        }
    }
}

/// One option of a choice question.
#[derive(Debug, Serialize)]
pub struct OptionDto {
    /// Option identifier.
    pub id: OptionId,
    /// Answer text.
    pub label: String,
    /// Rank within the question.
    pub position: i32,
}

/// A question as returned by the API.
#[derive(Debug, Serialize)]
pub struct QuestionDto {
    /// Question identifier.
    pub id: QuestionId,
    /// Question text.
    pub label: String,
    /// Input widget / answer domain.
    pub kind: QuestionKind,
    /// Whether an answer is mandatory.
    pub required: bool,
    /// Rank within the event scope.
    pub position: i32,
    /// Items the question applies to.
    pub items: Vec<ItemId>,
    /// Options in display order; empty unless the kind has options.
    pub options: Vec<OptionDto>,
}

impl From<Question> for QuestionDto {
    fn from(question: Question) -> Self {
        Self {
            id: question.id,
            label: question.label,
            kind: question.kind,
            required: question.required,
            position: question.position,
            items: question.item_ids,
            options: question
                .options
                .into_iter()
                .map(|option| OptionDto {
                    id: option.id,
                    label: option.label,
                    position: option.position,
                })
                .collect(),
        }
    }
}

/// A quota as returned by the API.
#[derive(Debug, Serialize)]
pub struct QuotaDto {
    /// Quota identifier.
    pub id: QuotaId,
    /// Administrative name.
    pub name: String,
    /// Capacity, `null` for unlimited.
    pub size: Option<i64>,
    /// Whether the quota is closed.
    pub closed: bool,
    /// Whether it closes itself once sold out.
    pub close_when_sold_out: bool,
    /// Items counted against the quota.
    pub items: Vec<ItemId>,
}

impl From<Quota> for QuotaDto {
    fn from(quota: Quota) -> Self {
        Self {
            id: quota.id,
            name: quota.name,
            size: quota.size,
            closed: quota.closed,
            close_when_sold_out: quota.close_when_sold_out,
            items: quota.item_ids,
        }
    }
}

/// A quota usage snapshot as returned by the API.
#[derive(Debug, Serialize)]
pub struct AvailabilityDto {
    /// Overall verdict.
    pub level: AvailabilityLevel,
    /// Numeric code of the verdict, for clients that compare thresholds.
    pub code: u8,
    /// Units still available, `null` for unlimited quotas.
    pub remaining: Option<i64>,
    /// Paid sales counted against the quota.
    pub paid_orders: i64,
    /// Pending sales counted against the quota.
    pub pending_orders: i64,
}

impl From<QuotaSnapshot> for AvailabilityDto {
    fn from(snapshot: QuotaSnapshot) -> Self {
        Self {
            level: snapshot.level,
            code: snapshot.level.code(),
            remaining: snapshot.remaining,
            paid_orders: snapshot.paid_orders,
            pending_orders: snapshot.pending_orders,
        }
    }
}

/// Deserializes a nullable patch field: absent stays `None`, an explicit
/// `null` becomes `Some(None)`.
pub(crate) fn double_option<'de, T, D>(
    deserializer: D,
) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Fixed hint returned for malformed reorder payloads.
pub(crate) const REORDER_HINT: &str = "expected JSON: {ids:[]}";

#[derive(Debug, Deserialize)]
struct ReorderBody {
    ids: Vec<String>,
}

/// Pulls the id list out of a reorder payload, `None` when the body is not
/// the documented shape.
pub(crate) fn reorder_ids(bytes: &[u8]) -> Option<Vec<String>> {
    serde_json::from_slice::<ReorderBody>(bytes)
        .ok()
        .map(|body| body.ids)
}

/// The plain-text 400 sent for malformed reorder payloads.
pub(crate) fn reorder_rejection() -> Response {
    (StatusCode::BAD_REQUEST, REORDER_HINT).into_response()
}

/// Parses reorder id tokens. A token that is not a number cannot name an
/// existing row, so it is reported like an unknown id.
pub(crate) fn parse_ids<I: FromStr>(tokens: &[String]) -> Result<Vec<I>, AppError> {
    tokens
        .iter()
        .map(|token| token.parse::<I>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| CatalogError::from(ReorderError::UnknownIds).into())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn reorder_ids_accepts_only_the_documented_shape() {
        assert_eq!(
            reorder_ids(br#"{"ids": ["3", "1", "2"]}"#).unwrap(),
            vec!["3", "1", "2"]
        );
        assert!(reorder_ids(b"not-json").is_none());
        assert!(reorder_ids(br#"{"ids": 5}"#).is_none());
        assert!(reorder_ids(br"{}").is_none());
    }

    #[test]
    fn unparsable_tokens_read_as_unknown_ids() {
        let err = parse_ids::<ItemId>(&["7".into(), "seven".into()]).unwrap_err();
        assert!(err
            .to_string()
            .contains("Some of the provided object ids are invalid."));

        let ids = parse_ids::<ItemId>(&["7".into(), "8".into()]).unwrap();
        assert_eq!(ids, vec![ItemId::new(7), ItemId::new(8)]);
    }
}
