//! Built-in attendee questions and the shared ordering namespace.
//!
//! Seven fixed "system" fields (attendee name, email, company, and the four
//! address lines) can be asked during checkout without a persisted question
//! row. When enabled on an event they appear in the question list alongside
//! custom questions, ordered through the same position namespace, but their
//! positions persist in a keyed map on the event rather than as row
//! attributes. A mixed reorder request therefore writes through two channels:
//! strict reconciliation for the persisted rows, one wholesale map write for
//! the system keys.

use crate::entities::{EventRecord, Question};
use crate::ids::QuestionId;
use crate::ordering::{self, PositionChange, Ranked, ReorderError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// System fields
// ============================================================================

/// One of the seven built-in attendee questions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SystemField {
    /// Attendee name (split into configured name parts).
    #[serde(rename = "attendee_name_parts")]
    AttendeeName,
    /// Attendee email address.
    #[serde(rename = "attendee_email")]
    AttendeeEmail,
    /// Company name.
    #[serde(rename = "company")]
    Company,
    /// Street address line.
    #[serde(rename = "street")]
    Street,
    /// Postal code.
    #[serde(rename = "zipcode")]
    Zipcode,
    /// City.
    #[serde(rename = "city")]
    City,
    /// Country.
    #[serde(rename = "country")]
    Country,
}

impl SystemField {
    /// All system fields in their fixed canonical order.
    pub const ALL: [Self; 7] = [
        Self::AttendeeName,
        Self::AttendeeEmail,
        Self::Company,
        Self::Street,
        Self::Zipcode,
        Self::City,
        Self::Country,
    ];

    /// The stable string key used on the wire and in the stored order map.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::AttendeeName => "attendee_name_parts",
            Self::AttendeeEmail => "attendee_email",
            Self::Company => "company",
            Self::Street => "street",
            Self::Zipcode => "zipcode",
            Self::City => "city",
            Self::Country => "country",
        }
    }

    /// Resolve a wire token to a system field.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    /// Human-readable label for the question list.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AttendeeName => "Attendee name",
            Self::AttendeeEmail => "Attendee email",
            Self::Company => "Company",
            Self::Street => "Street",
            Self::Zipcode => "ZIP code",
            Self::City => "City",
            Self::Country => "Country",
        }
    }
}

impl fmt::Display for SystemField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ============================================================================
// Stored order map
// ============================================================================

/// The per-event position map for system fields.
///
/// A reorder rewrites the map wholesale: every key maps to its index in the
/// submitted sequence, or `-1` when absent from it. Events that never ran a
/// question reorder have an empty map; a missing key displays at position 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemOrderMap(BTreeMap<SystemField, i32>);

impl SystemOrderMap {
    /// Empty map (no reorder recorded yet).
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// The stored position for a field, if any.
    #[must_use]
    pub fn get(&self, field: SystemField) -> Option<i32> {
        self.0.get(&field).copied()
    }

    /// The position used for display: the stored value, or 0 when the key
    /// has never been written. A stored `-1` passes through and sorts the
    /// field to the top.
    #[must_use]
    pub fn display_position(&self, field: SystemField) -> i32 {
        self.get(field).unwrap_or(0)
    }

    /// Set a field's position.
    pub fn set(&mut self, field: SystemField, position: i32) {
        self.0.insert(field, position);
    }

    /// Build the full seven-key map from a mixed request sequence: each key's
    /// index in the sequence, or `-1` when absent.
    #[must_use]
    pub fn from_request(tokens: &[String]) -> Self {
        let mut map = BTreeMap::new();
        for field in SystemField::ALL {
            let position = tokens
                .iter()
                .position(|token| token == field.key())
                .map_or(-1, |idx| i32::try_from(idx).unwrap_or(i32::MAX));
            map.insert(field, position);
        }
        Self(map)
    }
}

// ============================================================================
// Display overlay
// ============================================================================

/// One row of the merged question list.
///
/// System entries are synthesized from event flags; custom entries are the
/// persisted questions. Both expose the minimal shared surface the list
/// needs, and the variant tag tells writers which channel a reorder must use.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionEntry {
    /// A built-in attendee field enabled on the event.
    System {
        /// Which built-in field.
        field: SystemField,
        /// Display position from the stored order map.
        position: i32,
        /// Whether the event marks this field mandatory.
        required: bool,
    },
    /// A persisted custom question.
    Custom(Question),
}

impl QuestionEntry {
    /// The identifier as it appears on the wire: the system key, or the
    /// question id in decimal.
    #[must_use]
    pub fn wire_id(&self) -> String {
        match self {
            Self::System { field, .. } => field.key().to_owned(),
            Self::Custom(question) => question.id.to_string(),
        }
    }

    /// Display label.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::System { field, .. } => field.label(),
            Self::Custom(question) => &question.label,
        }
    }

    /// Position in the shared namespace.
    #[must_use]
    pub const fn position(&self) -> i32 {
        match self {
            Self::System { position, .. } => *position,
            Self::Custom(question) => question.position,
        }
    }

    /// Whether an answer is mandatory.
    #[must_use]
    pub const fn required(&self) -> bool {
        match self {
            Self::System { required, .. } => *required,
            Self::Custom(question) => question.required,
        }
    }
}

/// Merge enabled system fields with persisted questions into the display
/// order: system entries first (fixed key order), then questions, stably
/// sorted by position so ties keep that concatenation order.
#[must_use]
pub fn build_display_list(event: &EventRecord, questions: Vec<Question>) -> Vec<QuestionEntry> {
    let flags = &event.attendee_fields;
    let mut entries: Vec<QuestionEntry> = Vec::with_capacity(questions.len() + 7);

    for field in SystemField::ALL {
        let (asked, required) = match field {
            SystemField::AttendeeName => (flags.names_asked, flags.names_required),
            SystemField::AttendeeEmail => (flags.emails_asked, flags.emails_required),
            SystemField::Company => (flags.company_asked, flags.company_required),
            SystemField::Street | SystemField::Zipcode | SystemField::City
            | SystemField::Country => (flags.addresses_asked, flags.addresses_required),
        };
        if asked {
            entries.push(QuestionEntry::System {
                field,
                position: event.system_question_order.display_position(field),
                required,
            });
        }
    }

    entries.extend(questions.into_iter().map(QuestionEntry::Custom));
    entries.sort_by_key(QuestionEntry::position);
    entries
}

// ============================================================================
// Mixed reconciliation
// ============================================================================

/// The two write channels produced by a mixed question reorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionOrderPlan {
    /// Position changes for persisted questions (one audit record each).
    pub question_changes: Vec<PositionChange<QuestionId>>,
    /// The full rewritten system map (one settings write, one audit record).
    pub system_order: SystemOrderMap,
}

/// Split a mixed request into its channels and reconcile.
///
/// Decimal tokens are persisted question ids and must form a strict
/// permutation of `universe`; system keys map to their index in the full
/// sequence (`-1` when absent). Positions for questions are likewise indices
/// into the full mixed sequence, so both kinds share one namespace.
///
/// # Errors
///
/// [`ReorderError::UnknownIds`] for tokens that are neither decimal ids nor
/// system keys, or ids missing from the universe;
/// [`ReorderError::IncompleteSelection`] when the decimal subset does not
/// cover the universe exactly once.
pub fn plan_question_order(
    universe: &[Ranked<QuestionId>],
    tokens: &[String],
) -> Result<QuestionOrderPlan, ReorderError> {
    let mut desired: Vec<(QuestionId, i32)> = Vec::new();
    for (idx, token) in tokens.iter().enumerate() {
        if let Ok(id) = token.parse::<QuestionId>() {
            let position = i32::try_from(idx).unwrap_or(i32::MAX);
            desired.push((id, position));
        } else if SystemField::from_key(token).is_none() {
            return Err(ReorderError::UnknownIds);
        }
    }

    let question_changes = ordering::plan_positions(universe, &desired)?;

    Ok(QuestionOrderPlan {
        question_changes,
        system_order: SystemOrderMap::from_request(tokens),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::{AttendeeFields, QuestionKind};
    use crate::ids::EventId;

    fn question(id: i64, label: &str, position: i32) -> Question {
        Question {
            id: QuestionId::new(id),
            event: EventId::new(1),
            label: label.to_owned(),
            kind: QuestionKind::Text,
            required: false,
            position,
            item_ids: Vec::new(),
            options: Vec::new(),
        }
    }

    fn event_with(flags: AttendeeFields, order: SystemOrderMap) -> EventRecord {
        EventRecord {
            id: EventId::new(1),
            slug: "congress".to_owned(),
            name: "Congress".to_owned(),
            attendee_fields: flags,
            system_question_order: order,
        }
    }

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn key_round_trip() {
        for field in SystemField::ALL {
            assert_eq!(SystemField::from_key(field.key()), Some(field));
        }
        assert_eq!(SystemField::from_key("17"), None);
        assert_eq!(SystemField::from_key("twitter_handle"), None);
    }

    #[test]
    fn order_map_serializes_with_string_keys() {
        let mut map = SystemOrderMap::new();
        map.set(SystemField::AttendeeEmail, 0);
        map.set(SystemField::Country, -1);
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["attendee_email"], 0);
        assert_eq!(json["country"], -1);
    }

    #[test]
    fn merged_list_sorts_by_position_regardless_of_origin() {
        let mut order = SystemOrderMap::new();
        order.set(SystemField::AttendeeName, 2);
        order.set(SystemField::AttendeeEmail, 0);
        let event = event_with(
            AttendeeFields {
                names_asked: true,
                emails_asked: true,
                ..AttendeeFields::default()
            },
            order,
        );
        let questions = vec![question(10, "Shirt size", 1), question(11, "Diet", 3)];

        let entries = build_display_list(&event, questions);

        let wire: Vec<String> = entries.iter().map(QuestionEntry::wire_id).collect();
        assert_eq!(wire, ["attendee_email", "10", "attendee_name_parts", "11"]);
        let positions: Vec<i32> = entries.iter().map(QuestionEntry::position).collect();
        assert!(positions.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn disabled_flags_contribute_no_entries() {
        let event = event_with(AttendeeFields::default(), SystemOrderMap::new());
        let entries = build_display_list(&event, vec![question(10, "Diet", 0)]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].wire_id(), "10");
    }

    #[test]
    fn address_flag_enables_all_four_lines() {
        let event = event_with(
            AttendeeFields {
                addresses_asked: true,
                addresses_required: true,
                ..AttendeeFields::default()
            },
            SystemOrderMap::new(),
        );
        let entries = build_display_list(&event, Vec::new());
        let wire: Vec<String> = entries.iter().map(QuestionEntry::wire_id).collect();
        assert_eq!(wire, ["street", "zipcode", "city", "country"]);
        assert!(entries.iter().all(QuestionEntry::required));
    }

    #[test]
    fn unwritten_key_displays_at_zero_but_stored_minus_one_passes_through() {
        let mut order = SystemOrderMap::new();
        order.set(SystemField::Company, -1);
        assert_eq!(order.display_position(SystemField::Company), -1);
        assert_eq!(order.display_position(SystemField::AttendeeEmail), 0);
    }

    #[test]
    fn mixed_reorder_splits_channels_and_shares_the_namespace() {
        // Scenario: one persisted question between two system fields.
        let universe = [Ranked {
            id: QuestionId::new(17),
            position: 0,
        }];
        let request = tokens(&["attendee_email", "17", "attendee_name_parts"]);

        let plan = plan_question_order(&universe, &request).unwrap();

        assert_eq!(plan.question_changes.len(), 1);
        assert_eq!(plan.question_changes[0].id, QuestionId::new(17));
        assert_eq!(plan.question_changes[0].to, 1);

        let map = serde_json::to_value(&plan.system_order).unwrap();
        assert_eq!(map["attendee_email"], 0);
        assert_eq!(map["attendee_name_parts"], 2);
        for absent in ["company", "street", "zipcode", "city", "country"] {
            assert_eq!(map[absent], -1, "{absent} should be unplaced");
        }
    }

    #[test]
    fn mixed_reorder_avoids_writes_for_unmoved_questions() {
        let universe = [
            Ranked {
                id: QuestionId::new(5),
                position: 0,
            },
            Ranked {
                id: QuestionId::new(6),
                position: 2,
            },
        ];
        // Question 5 keeps index 0; question 6 keeps index 2 via the system
        // key in between.
        let request = tokens(&["5", "company", "6"]);
        let plan = plan_question_order(&universe, &request).unwrap();
        assert!(plan.question_changes.is_empty());
    }

    #[test]
    fn mixed_reorder_rejects_foreign_tokens() {
        let universe = [Ranked {
            id: QuestionId::new(5),
            position: 0,
        }];
        let err = plan_question_order(&universe, &tokens(&["5", "twitter_handle"])).unwrap_err();
        assert_eq!(err, ReorderError::UnknownIds);
    }

    #[test]
    fn mixed_reorder_requires_full_question_coverage() {
        let universe = [
            Ranked {
                id: QuestionId::new(5),
                position: 0,
            },
            Ranked {
                id: QuestionId::new(6),
                position: 1,
            },
        ];
        let err = plan_question_order(&universe, &tokens(&["5", "attendee_email"])).unwrap_err();
        assert_eq!(err, ReorderError::IncompleteSelection);
    }

    #[test]
    fn system_only_reorder_plans_no_question_changes() {
        let plan = plan_question_order(&[], &tokens(&["attendee_email", "company"])).unwrap();
        assert!(plan.question_changes.is_empty());
        assert_eq!(plan.system_order.get(SystemField::AttendeeEmail), Some(0));
        assert_eq!(plan.system_order.get(SystemField::Company), Some(1));
        assert_eq!(plan.system_order.get(SystemField::Street), Some(-1));
    }
}
