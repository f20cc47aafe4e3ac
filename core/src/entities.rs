//! Catalog entities managed by the administrative interface.
//!
//! These are the persisted shapes the services and stores exchange. Web-facing
//! request/response DTOs live in the web crate and convert to and from these
//! types. Events themselves are owned by another subsystem; only the fields
//! the catalog interface reads (and the system-question settings it writes)
//! appear here.

use crate::ids::{CategoryId, EventId, ItemId, OptionId, QuestionId, QuotaId};
use crate::system_fields::SystemOrderMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Events (read model + settings)
// ============================================================================

/// Attendee-field configuration flags on an event.
///
/// Each `*_asked` flag enables the corresponding built-in question on the
/// shop's checkout; the paired `*_required` flag marks it mandatory. One
/// address flag covers street, ZIP code, city and country together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttendeeFields {
    /// Attendee names are collected.
    pub names_asked: bool,
    /// Attendee names are mandatory.
    pub names_required: bool,
    /// Attendee email addresses are collected.
    pub emails_asked: bool,
    /// Attendee email addresses are mandatory.
    pub emails_required: bool,
    /// Company names are collected.
    pub company_asked: bool,
    /// Company names are mandatory.
    pub company_required: bool,
    /// Postal addresses are collected.
    pub addresses_asked: bool,
    /// Postal addresses are mandatory.
    pub addresses_required: bool,
}

/// The slice of an event this service reads and (partially) writes.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// Event identifier.
    pub id: EventId,
    /// URL slug, unique per organizer.
    pub slug: String,
    /// Human-readable event name.
    pub name: String,
    /// Built-in attendee question flags.
    pub attendee_fields: AttendeeFields,
    /// Stored ordering of the enabled system questions.
    pub system_question_order: SystemOrderMap,
}

// ============================================================================
// Categories
// ============================================================================

/// A product category; the ordering scope for its items.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    /// Category identifier.
    pub id: CategoryId,
    /// Owning event.
    pub event: EventId,
    /// Public category name.
    pub name: String,
    /// Optional name shown only in the backend.
    pub internal_name: Option<String>,
    /// Optional public description.
    pub description: Option<String>,
    /// Zero-based rank within the event.
    pub position: i32,
}

/// Fields for creating a category. Position is assigned by the service.
#[derive(Debug, Clone)]
pub struct CategoryDraft {
    /// Public category name.
    pub name: String,
    /// Optional backend-only name.
    pub internal_name: Option<String>,
    /// Optional public description.
    pub description: Option<String>,
}

/// Partial update of a category. `None` leaves a field untouched; the inner
/// `Option` distinguishes clearing a nullable field from skipping it.
#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    /// New public name.
    pub name: Option<String>,
    /// New backend-only name (`Some(None)` clears it).
    pub internal_name: Option<Option<String>>,
    /// New description (`Some(None)` clears it).
    pub description: Option<Option<String>>,
}

// ============================================================================
// Items
// ============================================================================

/// A product ("item") offered for an event.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Item identifier.
    pub id: ItemId,
    /// Owning event.
    pub event: EventId,
    /// Owning category; uncategorized items form their own ordering scope.
    pub category: Option<CategoryId>,
    /// Public product name.
    pub name: String,
    /// Optional name shown only in the backend.
    pub internal_name: Option<String>,
    /// Inactive items are hidden from the shop but kept for reporting.
    pub active: bool,
    /// Whether purchasing this item admits a person.
    pub admission: bool,
    /// Default sales price in the event currency's minor unit.
    pub default_price_cents: i64,
    /// Zero-based rank within the category scope.
    pub position: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Fields for creating an item. Position is assigned by the service.
#[derive(Debug, Clone)]
pub struct ItemDraft {
    /// Public product name.
    pub name: String,
    /// Optional backend-only name.
    pub internal_name: Option<String>,
    /// Target category.
    pub category: Option<CategoryId>,
    /// Whether the item starts out active.
    pub active: bool,
    /// Whether purchasing this item admits a person.
    pub admission: bool,
    /// Default sales price in minor units.
    pub default_price_cents: i64,
}

/// Partial update of an item's general fields.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    /// New public name.
    pub name: Option<String>,
    /// New backend-only name (`Some(None)` clears it).
    pub internal_name: Option<Option<String>>,
    /// New category (`Some(None)` makes the item uncategorized).
    pub category: Option<Option<CategoryId>>,
    /// New active flag.
    pub active: Option<bool>,
    /// New admission flag.
    pub admission: Option<bool>,
    /// New default price in minor units.
    pub default_price_cents: Option<i64>,
}

impl ItemPatch {
    /// Whether the patch carries no fields at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.internal_name.is_none()
            && self.category.is_none()
            && self.active.is_none()
            && self.admission.is_none()
            && self.default_price_cents.is_none()
    }
}

// ============================================================================
// Questions
// ============================================================================

/// The input widget and answer domain of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    /// Single-line free text.
    Text,
    /// Multi-line free text.
    Multiline,
    /// Numeric answer.
    Number,
    /// Yes/no checkbox.
    Boolean,
    /// One option from a fixed list.
    Choice,
    /// Any number of options from a fixed list.
    MultipleChoice,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Combined date and time.
    DateTime,
    /// File upload.
    File,
    /// Country selector.
    Country,
}

impl QuestionKind {
    /// Whether answers come from a fixed option list.
    #[must_use]
    pub const fn has_options(self) -> bool {
        matches!(self, Self::Choice | Self::MultipleChoice)
    }
}

/// One selectable option of a choice question.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionOption {
    /// Option identifier.
    pub id: OptionId,
    /// Answer text shown to the buyer.
    pub label: String,
    /// Zero-based rank within the question.
    pub position: i32,
}

/// A custom question asked during checkout for linked items.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    /// Question identifier.
    pub id: QuestionId,
    /// Owning event.
    pub event: EventId,
    /// Question text.
    pub label: String,
    /// Input widget / answer domain.
    pub kind: QuestionKind,
    /// Whether an answer is mandatory.
    pub required: bool,
    /// Zero-based rank within the event scope (shared with system fields).
    pub position: i32,
    /// Items this question applies to.
    pub item_ids: Vec<ItemId>,
    /// Options, ordered by position; empty unless `kind.has_options()`.
    pub options: Vec<QuestionOption>,
}

/// Fields for creating a question. Position is assigned by the service.
#[derive(Debug, Clone)]
pub struct QuestionDraft {
    /// Question text.
    pub label: String,
    /// Input widget / answer domain.
    pub kind: QuestionKind,
    /// Whether an answer is mandatory.
    pub required: bool,
    /// Items this question applies to.
    pub item_ids: Vec<ItemId>,
    /// Option labels in display order; only valid for choice kinds.
    pub options: Vec<String>,
}

/// Partial update of a question.
#[derive(Debug, Clone, Default)]
pub struct QuestionPatch {
    /// New question text.
    pub label: Option<String>,
    /// New answer kind.
    pub kind: Option<QuestionKind>,
    /// New required flag.
    pub required: Option<bool>,
    /// Replacement item links.
    pub item_ids: Option<Vec<ItemId>>,
    /// Replacement option labels in display order.
    pub options: Option<Vec<String>>,
}

// ============================================================================
// Quotas
// ============================================================================

/// A stock quota limiting how often its linked items can be sold.
#[derive(Debug, Clone, PartialEq)]
pub struct Quota {
    /// Quota identifier.
    pub id: QuotaId,
    /// Owning event.
    pub event: EventId,
    /// Administrative name.
    pub name: String,
    /// Maximum number of sales; `None` means unlimited.
    pub size: Option<i64>,
    /// Closed quotas sell nothing regardless of remaining capacity.
    pub closed: bool,
    /// Close automatically once sold out instead of reopening on cancels.
    pub close_when_sold_out: bool,
    /// Items counted against this quota.
    pub item_ids: Vec<ItemId>,
}

/// Fields for creating a quota.
#[derive(Debug, Clone)]
pub struct QuotaDraft {
    /// Administrative name.
    pub name: String,
    /// Maximum number of sales; `None` means unlimited.
    pub size: Option<i64>,
    /// Close automatically once sold out.
    pub close_when_sold_out: bool,
    /// Items counted against this quota.
    pub item_ids: Vec<ItemId>,
}

/// Partial update of a quota.
#[derive(Debug, Clone, Default)]
pub struct QuotaPatch {
    /// New administrative name.
    pub name: Option<String>,
    /// New size (`Some(None)` makes the quota unlimited).
    pub size: Option<Option<i64>>,
    /// New auto-close flag.
    pub close_when_sold_out: Option<bool>,
    /// Replacement item links.
    pub item_ids: Option<Vec<ItemId>>,
}
