//! Entity builders with sensible defaults.
//!
//! Every builder takes the raw id plus whatever the tests vary most; all
//! other fields get unremarkable defaults a test can override by mutating
//! the returned value.

use chrono::Utc;
use marquee_core::entities::{AttendeeFields, Category, EventRecord, Item, Question, QuestionKind, Quota};
use marquee_core::ids::{CategoryId, EventId, ItemId, QuestionId, QuotaId};
use marquee_core::system_fields::SystemOrderMap;

/// An event with no attendee fields enabled and no stored question order.
#[must_use]
pub fn event(id: EventId) -> EventRecord {
    EventRecord {
        id,
        slug: format!("event-{id}"),
        name: format!("Event {id}"),
        attendee_fields: AttendeeFields::default(),
        system_question_order: SystemOrderMap::default(),
    }
}

/// A category at the given position.
#[must_use]
pub fn category(id: i64, event: EventId, position: i32) -> Category {
    Category {
        id: CategoryId::new(id),
        event,
        name: format!("Category {id}"),
        internal_name: None,
        description: None,
        position,
    }
}

/// An active non-admission item priced at 10.00 in the given scope.
#[must_use]
pub fn item(id: i64, event: EventId, category: Option<CategoryId>, position: i32) -> Item {
    Item {
        id: ItemId::new(id),
        event,
        category,
        name: format!("Item {id}"),
        internal_name: None,
        active: true,
        admission: false,
        default_price_cents: 1000,
        position,
        created_at: Utc::now(),
    }
}

/// An optional free-text question linked to no items.
#[must_use]
pub fn question(id: i64, event: EventId, position: i32) -> Question {
    Question {
        id: QuestionId::new(id),
        event,
        label: format!("Question {id}"),
        kind: QuestionKind::Text,
        required: false,
        position,
        item_ids: Vec::new(),
        options: Vec::new(),
    }
}

/// An open quota of 50 linked to no items.
#[must_use]
pub fn quota(id: i64, event: EventId) -> Quota {
    Quota {
        id: QuotaId::new(id),
        event,
        name: format!("Quota {id}"),
        size: Some(50),
        closed: false,
        close_when_sold_out: false,
        item_ids: Vec::new(),
    }
}
