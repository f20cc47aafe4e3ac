//! Audit trail types.
//!
//! Every mutation records who changed what, as a structured entry committed
//! in the same transaction as the data write it describes. One entry per
//! logical change: each moved row in a reconciliation logs individually,
//! while the system-question-order map logs once no matter how many keys
//! moved.

use crate::ids::{ActorId, CategoryId, EventId, ItemId, QuestionId, QuotaId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The catalogued audit actions this service emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Item created.
    ItemAdded,
    /// Item fields changed (including the soft-disable fallback).
    ItemChanged,
    /// Item deleted.
    ItemDeleted,
    /// Item moved to a new position (and possibly category).
    ItemReordered,
    /// Category created.
    CategoryAdded,
    /// Category fields changed.
    CategoryChanged,
    /// Category deleted.
    CategoryDeleted,
    /// Category moved to a new position.
    CategoryReordered,
    /// Question created.
    QuestionAdded,
    /// Question fields changed.
    QuestionChanged,
    /// Question deleted.
    QuestionDeleted,
    /// Question moved to a new position.
    QuestionReordered,
    /// Quota created.
    QuotaAdded,
    /// Quota fields changed.
    QuotaChanged,
    /// Quota deleted.
    QuotaDeleted,
    /// Quota manually reopened.
    QuotaOpened,
    /// Event-level settings rewritten (system question order).
    Settings,
}

impl AuditAction {
    /// The dotted action name stored in the audit log.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ItemAdded => "event.item.added",
            Self::ItemChanged => "event.item.changed",
            Self::ItemDeleted => "event.item.deleted",
            Self::ItemReordered => "event.item.reordered",
            Self::CategoryAdded => "event.category.added",
            Self::CategoryChanged => "event.category.changed",
            Self::CategoryDeleted => "event.category.deleted",
            Self::CategoryReordered => "event.category.reordered",
            Self::QuestionAdded => "event.question.added",
            Self::QuestionChanged => "event.question.changed",
            Self::QuestionDeleted => "event.question.deleted",
            Self::QuestionReordered => "event.question.reordered",
            Self::QuotaAdded => "event.quota.added",
            Self::QuotaChanged => "event.quota.changed",
            Self::QuotaDeleted => "event.quota.deleted",
            Self::QuotaOpened => "event.quota.opened",
            Self::Settings => "event.settings",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an audit entry is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditTarget {
    /// The event itself (settings-level changes).
    Event,
    /// An item.
    Item(ItemId),
    /// A category.
    Category(CategoryId),
    /// A question.
    Question(QuestionId),
    /// A quota.
    Quota(QuotaId),
}

impl AuditTarget {
    /// The target kind stored alongside the entry.
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Item(_) => "item",
            Self::Category(_) => "category",
            Self::Question(_) => "question",
            Self::Quota(_) => "quota",
        }
    }

    /// The target's id, absent for event-level entries.
    #[must_use]
    pub const fn id(self) -> Option<i64> {
        match self {
            Self::Event => None,
            Self::Item(id) => Some(id.raw()),
            Self::Category(id) => Some(id.raw()),
            Self::Question(id) => Some(id.raw()),
            Self::Quota(id) => Some(id.raw()),
        }
    }
}

/// One audit entry, ready to append. The store assigns the timestamp on
/// insert so entries share the transaction's clock.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    /// Who performed the change.
    pub actor: ActorId,
    /// The event the change belongs to.
    pub event: EventId,
    /// What was changed.
    pub target: AuditTarget,
    /// Which catalogued action happened.
    pub action: AuditAction,
    /// Structured details, action-specific.
    pub payload: Value,
}

impl AuditEntry {
    /// A new entry with an empty payload.
    #[must_use]
    pub const fn new(
        actor: ActorId,
        event: EventId,
        target: AuditTarget,
        action: AuditAction,
    ) -> Self {
        Self {
            actor,
            event,
            target,
            action,
            payload: Value::Null,
        }
    }

    /// Attach structured details.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_names_follow_the_catalogue() {
        assert_eq!(AuditAction::ItemReordered.to_string(), "event.item.reordered");
        assert_eq!(AuditAction::Settings.to_string(), "event.settings");
        assert_eq!(AuditAction::QuotaOpened.to_string(), "event.quota.opened");
    }

    #[test]
    fn targets_split_into_kind_and_id() {
        let target = AuditTarget::Item(ItemId::new(4));
        assert_eq!(target.kind(), "item");
        assert_eq!(target.id(), Some(4));
        assert_eq!(AuditTarget::Event.id(), None);
    }

    #[test]
    fn builder_attaches_payload() {
        let entry = AuditEntry::new(
            ActorId::new(1),
            EventId::new(2),
            AuditTarget::Item(ItemId::new(3)),
            AuditAction::ItemReordered,
        )
        .with_payload(json!({"position": 0, "category": null}));

        assert_eq!(entry.payload["position"], 0);
        assert!(entry.payload["category"].is_null());
    }
}
