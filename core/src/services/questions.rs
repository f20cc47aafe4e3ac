//! Question lifecycle, the merged display list, and the mixed reorder.

use super::{CatalogService, audit, note_reorder, resolve_items};
use crate::audit::{AuditAction, AuditEntry, AuditTarget};
use crate::entities::{Question, QuestionDraft, QuestionKind, QuestionOption, QuestionPatch};
use crate::error::CatalogError;
use crate::ids::{ActorId, EventId, OptionId, QuestionId};
use crate::ordering::{self, Ranked};
use crate::store::{AnswerBucket, StoreError};
use crate::system_fields::{self, QuestionEntry};
use metrics::counter;
use serde_json::{Map, Value, json};
use tracing::{info, instrument};

/// One grouped answer value with its share of all answers.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerStat {
    /// The answer as given.
    pub answer: String,
    /// How many order positions gave it.
    pub count: i64,
    /// Share of the total, in percent.
    pub percentage: f64,
}

/// A question with its collected-answer statistics.
#[derive(Debug, Clone)]
pub struct QuestionDetail {
    /// The question itself.
    pub question: Question,
    /// Total number of recorded answers.
    pub total_answers: i64,
    /// Grouped answers, most frequent first.
    pub answers: Vec<AnswerStat>,
}

impl CatalogService {
    /// The merged display list: enabled system fields and persisted
    /// questions, sorted by their shared position namespace.
    ///
    /// # Errors
    ///
    /// [`CatalogError::EventNotFound`] or [`CatalogError::PermissionDenied`].
    pub async fn list_questions(
        &self,
        actor: ActorId,
        event: EventId,
    ) -> Result<Vec<QuestionEntry>, CatalogError> {
        let record = self.authorize(actor, event).await?;
        let questions = self.store.questions(event).await?;
        Ok(system_fields::build_display_list(&record, questions))
    }

    /// One question plus its answer statistics. File questions collapse to a
    /// single "File uploaded" bucket.
    ///
    /// # Errors
    ///
    /// [`CatalogError::QuestionNotFound`] when the id misses within the
    /// event.
    #[allow(clippy::cast_precision_loss)]
    pub async fn question_detail(
        &self,
        actor: ActorId,
        event: EventId,
        question: QuestionId,
    ) -> Result<QuestionDetail, CatalogError> {
        self.authorize(actor, event).await?;
        let question = self
            .store
            .find_question(event, question)
            .await?
            .ok_or(CatalogError::QuestionNotFound)?;

        let mut buckets = self.store.question_answer_stats(question.id).await?;
        if question.kind == QuestionKind::File {
            let uploads: i64 = buckets.iter().map(|b| b.count).sum();
            buckets = if uploads > 0 {
                vec![AnswerBucket {
                    answer: "File uploaded".to_owned(),
                    count: uploads,
                }]
            } else {
                Vec::new()
            };
        }

        let total_answers: i64 = buckets.iter().map(|b| b.count).sum();
        let answers = buckets
            .into_iter()
            .map(|bucket| AnswerStat {
                percentage: if total_answers == 0 {
                    0.0
                } else {
                    bucket.count as f64 / total_answers as f64 * 100.0
                },
                answer: bucket.answer,
                count: bucket.count,
            })
            .collect();

        Ok(QuestionDetail {
            question,
            total_answers,
            answers,
        })
    }

    /// Creates a question at the end of the event scope.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Validation`] for an empty label, an option list on a
    /// non-choice kind, a choice kind without options, or item links outside
    /// the event.
    #[instrument(skip(self, draft), fields(event = %event, actor = %actor))]
    pub async fn create_question(
        &self,
        actor: ActorId,
        event: EventId,
        draft: QuestionDraft,
    ) -> Result<Question, CatalogError> {
        self.authorize(actor, event).await?;
        validate_question(&draft.label, draft.kind, !draft.options.is_empty())?;
        let mut tx = self.store.begin().await?;
        let item_ids = resolve_items(tx.as_mut(), event, &draft.item_ids).await?;
        let draft = QuestionDraft { item_ids, ..draft };

        let positions: Vec<i32> = tx
            .questions(event)
            .await?
            .iter()
            .map(|q| q.position)
            .collect();
        let question = tx
            .insert_question(event, &draft, ordering::append_position(&positions))
            .await?;
        audit(
            tx.as_mut(),
            AuditEntry::new(
                actor,
                event,
                AuditTarget::Question(question.id),
                AuditAction::QuestionAdded,
            )
            .with_payload(json!({
                "label": draft.label,
                "kind": draft.kind,
                "required": draft.required,
                "items": draft.item_ids,
                "options": draft.options,
                "position": question.position,
            })),
        )
        .await?;
        tx.commit().await?;
        counter!("catalog_mutations_total", "entity" => "question", "op" => "create").increment(1);
        info!(question = %question.id, "question created");
        Ok(question)
    }

    /// Applies a partial update, including wholesale replacement of the
    /// option list and item links. Only fields that actually change are
    /// persisted and audited.
    ///
    /// # Errors
    ///
    /// [`CatalogError::QuestionNotFound`] or [`CatalogError::Validation`].
    #[instrument(skip(self, patch), fields(event = %event, actor = %actor, question = %question))]
    pub async fn update_question(
        &self,
        actor: ActorId,
        event: EventId,
        question: QuestionId,
        patch: QuestionPatch,
    ) -> Result<Question, CatalogError> {
        self.authorize(actor, event).await?;
        let mut tx = self.store.begin().await?;
        let current = tx
            .find_question(event, question)
            .await?
            .ok_or(CatalogError::QuestionNotFound)?;

        let mut updated = current.clone();
        let mut changed = Map::new();
        if let Some(label) = patch.label {
            if label != updated.label {
                changed.insert("label".to_owned(), json!(label));
                updated.label = label;
            }
        }
        if let Some(kind) = patch.kind {
            if kind != updated.kind {
                changed.insert("kind".to_owned(), json!(kind));
                updated.kind = kind;
            }
        }
        if let Some(required) = patch.required {
            if required != updated.required {
                changed.insert("required".to_owned(), json!(required));
                updated.required = required;
            }
        }
        if let Some(item_ids) = patch.item_ids {
            let item_ids = resolve_items(tx.as_mut(), event, &item_ids).await?;
            if item_ids != updated.item_ids {
                changed.insert("items".to_owned(), json!(item_ids));
                updated.item_ids = item_ids;
            }
        }
        if let Some(labels) = patch.options {
            let current_labels: Vec<&str> =
                updated.options.iter().map(|o| o.label.as_str()).collect();
            if labels != current_labels {
                updated.options = fresh_options(&labels);
                changed.insert("options".to_owned(), json!(labels));
            }
        }
        validate_question(&updated.label, updated.kind, !updated.options.is_empty())?;

        if changed.is_empty() {
            return Ok(current);
        }
        tx.update_question(&updated).await?;
        let stored = tx
            .find_question(event, question)
            .await?
            .ok_or(CatalogError::QuestionNotFound)?;
        audit(
            tx.as_mut(),
            AuditEntry::new(
                actor,
                event,
                AuditTarget::Question(question),
                AuditAction::QuestionChanged,
            )
            .with_payload(Value::Object(changed)),
        )
        .await?;
        tx.commit().await?;
        counter!("catalog_mutations_total", "entity" => "question", "op" => "update").increment(1);
        Ok(stored)
    }

    /// Deletes a question unconditionally; recorded answers cascade.
    ///
    /// # Errors
    ///
    /// [`CatalogError::QuestionNotFound`] when the id misses within the
    /// event.
    #[instrument(skip(self), fields(event = %event, actor = %actor, question = %question))]
    pub async fn delete_question(
        &self,
        actor: ActorId,
        event: EventId,
        question: QuestionId,
    ) -> Result<(), CatalogError> {
        self.authorize(actor, event).await?;
        let mut tx = self.store.begin().await?;
        tx.find_question(event, question)
            .await?
            .ok_or(CatalogError::QuestionNotFound)?;
        audit(
            tx.as_mut(),
            AuditEntry::new(
                actor,
                event,
                AuditTarget::Question(question),
                AuditAction::QuestionDeleted,
            ),
        )
        .await?;
        tx.delete_question(question).await?;
        tx.commit().await?;
        counter!("catalog_mutations_total", "entity" => "question", "op" => "delete").increment(1);
        Ok(())
    }

    /// Mixed reorder over the shared namespace: decimal tokens are persisted
    /// question ids (strict rules), system keys land in the event's order
    /// map. The map is rewritten wholesale and audited exactly once, however
    /// many keys moved.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Reorder`] for foreign tokens, unknown ids, or
    /// incomplete question coverage.
    #[instrument(skip(self, tokens), fields(event = %event, actor = %actor, count = tokens.len()))]
    pub async fn reorder_questions(
        &self,
        actor: ActorId,
        event: EventId,
        tokens: &[String],
    ) -> Result<(), CatalogError> {
        self.authorize(actor, event).await?;
        let mut tx = self.store.begin().await?;
        let universe: Vec<Ranked<QuestionId>> = tx
            .questions(event)
            .await?
            .iter()
            .map(|q| Ranked {
                id: q.id,
                position: q.position,
            })
            .collect();
        let plan = system_fields::plan_question_order(&universe, tokens)?;
        note_reorder("question", universe.len(), plan.question_changes.len());

        for change in &plan.question_changes {
            tx.set_question_position(change.id, change.to).await?;
            audit(
                tx.as_mut(),
                AuditEntry::new(
                    actor,
                    event,
                    AuditTarget::Question(change.id),
                    AuditAction::QuestionReordered,
                )
                .with_payload(json!({"position": change.to})),
            )
            .await?;
        }

        tx.save_system_question_order(event, &plan.system_order).await?;
        let map = serde_json::to_value(&plan.system_order)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        audit(
            tx.as_mut(),
            AuditEntry::new(actor, event, AuditTarget::Event, AuditAction::Settings)
                .with_payload(json!({"system_question_order": map})),
        )
        .await?;

        tx.commit().await?;
        info!(changed = plan.question_changes.len(), "questions reordered");
        Ok(())
    }
}

fn validate_question(
    label: &str,
    kind: QuestionKind,
    has_option_list: bool,
) -> Result<(), CatalogError> {
    if label.trim().is_empty() {
        return Err(CatalogError::invalid("label", "This field is required."));
    }
    if kind.has_options() && !has_option_list {
        return Err(CatalogError::invalid(
            "options",
            "Choice questions need at least one answer option.",
        ));
    }
    if !kind.has_options() && has_option_list {
        return Err(CatalogError::invalid(
            "options",
            "Answer options can only be used for choice questions.",
        ));
    }
    Ok(())
}

/// Builds yet-unstored options for a replacement label list; the store
/// assigns their ids on insert.
fn fresh_options(labels: &[String]) -> Vec<QuestionOption> {
    labels
        .iter()
        .enumerate()
        .map(|(idx, label)| QuestionOption {
            id: OptionId::new(0),
            label: label.clone(),
            position: i32::try_from(idx).unwrap_or(i32::MAX),
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    // The fakes link the external `marquee_core` instance; the self
    // dev-dependency lets these tests name the same one.
    use marquee_core::CatalogService;
    use marquee_core::audit::AuditAction;
    use marquee_core::entities::{
        AttendeeFields, QuestionDraft, QuestionKind, QuestionOption, QuestionPatch,
    };
    use marquee_core::error::CatalogError;
    use marquee_core::extensions::ExtensionRegistry;
    use marquee_core::ids::{ActorId, EventId, OptionId, QuestionId};
    use marquee_core::ordering::ReorderError;
    use marquee_core::system_fields::{QuestionEntry, SystemField};
    use marquee_testing::{
        AllowAll, MemoryStore, RecordingInvalidator, StaticAvailability, fixtures,
    };
    use std::sync::Arc;

    const EVENT: EventId = EventId::new(1);
    const ACTOR: ActorId = ActorId::new(7);

    fn service(store: &Arc<MemoryStore>) -> CatalogService {
        CatalogService::new(
            Arc::<MemoryStore>::clone(store),
            Arc::new(AllowAll),
            Arc::new(RecordingInvalidator::default()),
            Arc::new(StaticAvailability::default()),
            ExtensionRegistry::new(),
        )
    }

    fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.seed_event(fixtures::event(EVENT));
        store
    }

    fn choice_draft(label: &str) -> QuestionDraft {
        QuestionDraft {
            label: label.to_owned(),
            kind: QuestionKind::Choice,
            required: false,
            item_ids: Vec::new(),
            options: vec!["S".to_owned(), "M".to_owned(), "L".to_owned()],
        }
    }

    #[tokio::test]
    async fn list_merges_enabled_system_fields() {
        let store = seeded_store();
        let mut record = fixtures::event(EVENT);
        record.attendee_fields = AttendeeFields {
            emails_asked: true,
            emails_required: true,
            ..AttendeeFields::default()
        };
        record.system_question_order.set(SystemField::AttendeeEmail, 1);
        store.seed_event(record);
        store.seed_question(fixtures::question(10, EVENT, 0));
        let service = service(&store);

        let entries = service.list_questions(ACTOR, EVENT).await.unwrap();

        let wire: Vec<String> = entries.iter().map(QuestionEntry::wire_id).collect();
        assert_eq!(wire, ["10", "attendee_email"]);
        assert!(entries[1].required());
    }

    #[tokio::test]
    async fn create_appends_within_the_question_scope() {
        let store = seeded_store();
        store.seed_question(fixtures::question(10, EVENT, 4));
        let service = service(&store);

        let question = service
            .create_question(ACTOR, EVENT, choice_draft("Shirt size"))
            .await
            .unwrap();

        assert_eq!(question.position, 5);
        assert_eq!(question.options.len(), 3);
        let entries = store.audit_entries();
        assert_eq!(entries[0].action, AuditAction::QuestionAdded);
        assert_eq!(entries[0].payload["kind"], "choice");
    }

    #[tokio::test]
    async fn options_on_a_text_question_are_rejected() {
        let store = seeded_store();
        let service = service(&store);

        let draft = QuestionDraft {
            kind: QuestionKind::Text,
            ..choice_draft("Diet")
        };
        let err = service.create_question(ACTOR, EVENT, draft).await.unwrap_err();

        assert!(matches!(err, CatalogError::Validation(_)));
        assert!(store.audit_entries().is_empty());
    }

    #[tokio::test]
    async fn update_replaces_the_option_list_and_audits_it() {
        let store = seeded_store();
        let mut question = fixtures::question(10, EVENT, 0);
        question.kind = QuestionKind::Choice;
        question.options = vec![QuestionOption {
            id: OptionId::new(1),
            label: "Red".to_owned(),
            position: 0,
        }];
        store.seed_question(question);
        let service = service(&store);

        let patch = QuestionPatch {
            options: Some(vec!["Red".to_owned(), "Blue".to_owned()]),
            ..QuestionPatch::default()
        };
        let updated = service
            .update_question(ACTOR, EVENT, QuestionId::new(10), patch)
            .await
            .unwrap();

        let labels: Vec<&str> = updated.options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, ["Red", "Blue"]);
        let entries = store.audit_entries();
        assert_eq!(entries.len(), 1);
        let payload = entries[0].payload.as_object().unwrap();
        assert_eq!(payload.len(), 1);
        assert!(payload.contains_key("options"));
    }

    #[tokio::test]
    async fn mixed_reorder_writes_both_channels_with_one_settings_record() {
        // One persisted question (id 17) between two system fields.
        let store = seeded_store();
        store.seed_question(fixtures::question(17, EVENT, 0));
        let service = service(&store);

        let tokens = vec![
            "attendee_email".to_owned(),
            "17".to_owned(),
            "attendee_name_parts".to_owned(),
        ];
        service.reorder_questions(ACTOR, EVENT, &tokens).await.unwrap();

        assert_eq!(store.question(QuestionId::new(17)).unwrap().position, 1);
        let record = store.event_record(EVENT).unwrap();
        let order = &record.system_question_order;
        assert_eq!(order.get(SystemField::AttendeeEmail), Some(0));
        assert_eq!(order.get(SystemField::AttendeeName), Some(2));
        for unplaced in [
            SystemField::Company,
            SystemField::Street,
            SystemField::Zipcode,
            SystemField::City,
            SystemField::Country,
        ] {
            assert_eq!(order.get(unplaced), Some(-1));
        }

        let entries = store.audit_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, AuditAction::QuestionReordered);
        assert_eq!(entries[1].action, AuditAction::Settings);
        assert_eq!(
            entries[1].payload["system_question_order"]["attendee_email"],
            0
        );
    }

    #[tokio::test]
    async fn foreign_reorder_token_changes_nothing() {
        let store = seeded_store();
        store.seed_question(fixtures::question(17, EVENT, 0));
        let service = service(&store);

        let tokens = vec!["17".to_owned(), "twitter_handle".to_owned()];
        let err = service
            .reorder_questions(ACTOR, EVENT, &tokens)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CatalogError::Reorder(ReorderError::UnknownIds)
        ));
        assert!(store.audit_entries().is_empty());
        let record = store.event_record(EVENT).unwrap();
        assert_eq!(record.system_question_order.get(SystemField::AttendeeEmail), None);
    }

    #[tokio::test]
    async fn detail_groups_answers_with_percentages() {
        let store = seeded_store();
        store.seed_question(fixtures::question(10, EVENT, 0));
        store.seed_answers(QuestionId::new(10), &[("Red", 3), ("Blue", 1)]);
        let service = service(&store);

        let detail = service
            .question_detail(ACTOR, EVENT, QuestionId::new(10))
            .await
            .unwrap();

        assert_eq!(detail.total_answers, 4);
        assert_eq!(detail.answers[0].answer, "Red");
        assert!((detail.answers[0].percentage - 75.0).abs() < f64::EPSILON);
        assert!((detail.answers[1].percentage - 25.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn file_answers_collapse_to_one_bucket() {
        let store = seeded_store();
        let mut question = fixtures::question(10, EVENT, 0);
        question.kind = QuestionKind::File;
        store.seed_question(question);
        store.seed_answers(QuestionId::new(10), &[("a.pdf", 1), ("b.pdf", 1)]);
        let service = service(&store);

        let detail = service
            .question_detail(ACTOR, EVENT, QuestionId::new(10))
            .await
            .unwrap();

        assert_eq!(detail.answers.len(), 1);
        assert_eq!(detail.answers[0].answer, "File uploaded");
        assert_eq!(detail.answers[0].count, 2);
    }

    #[tokio::test]
    async fn delete_is_audited_before_the_row_goes() {
        let store = seeded_store();
        store.seed_question(fixtures::question(10, EVENT, 0));
        let service = service(&store);

        service
            .delete_question(ACTOR, EVENT, QuestionId::new(10))
            .await
            .unwrap();

        assert!(store.question(QuestionId::new(10)).is_none());
        let entries = store.audit_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::QuestionDeleted);
    }
}
