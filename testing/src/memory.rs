//! Transactional in-memory [`CatalogStore`] for tests.
//!
//! [`MemoryStore`] keeps the whole catalog in a shared [`State`] behind a
//! lock. [`MemoryStore::begin`] clones that state; the transaction mutates
//! its private copy and swaps it back in on commit, so a dropped transaction
//! rolls back exactly like a database one would. Ordering and cascade rules
//! mirror the Postgres store's contracts.

use async_trait::async_trait;
use chrono::Utc;
use marquee_core::audit::AuditEntry;
use marquee_core::entities::{
    Category, CategoryDraft, EventRecord, Item, ItemDraft, Question, QuestionDraft,
    QuestionOption, Quota, QuotaDraft,
};
use marquee_core::ids::{CategoryId, EventId, ItemId, OptionId, QuestionId, QuotaId};
use marquee_core::store::{
    AnswerBucket, CatalogStore, CatalogTransaction, ItemDeletion, StoreError,
};
use marquee_core::system_fields::SystemOrderMap;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// ============================================================================
// Shared state
// ============================================================================

#[derive(Debug, Clone)]
struct State {
    events: BTreeMap<EventId, EventRecord>,
    categories: BTreeMap<CategoryId, Category>,
    items: BTreeMap<ItemId, Item>,
    questions: BTreeMap<QuestionId, Question>,
    quotas: BTreeMap<QuotaId, Quota>,
    audit: Vec<AuditEntry>,
    order_refs: HashSet<ItemId>,
    blocked_deletes: HashSet<ItemId>,
    answers: HashMap<QuestionId, Vec<(String, i64)>>,
    next_id: i64,
}

impl Default for State {
    fn default() -> Self {
        Self {
            events: BTreeMap::new(),
            categories: BTreeMap::new(),
            items: BTreeMap::new(),
            questions: BTreeMap::new(),
            quotas: BTreeMap::new(),
            audit: Vec::new(),
            order_refs: HashSet::new(),
            blocked_deletes: HashSet::new(),
            answers: HashMap::new(),
            // Seeded fixtures use small ids; generated ids start well above.
            next_id: 1000,
        }
    }
}

impl State {
    fn allocate(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn reserve(&mut self, raw: i64) {
        self.next_id = self.next_id.max(raw + 1);
    }

    /// Sort key placing uncategorized items first, then categories by rank.
    fn scope_rank(&self, category: Option<CategoryId>) -> (i32, i64) {
        category.map_or((-1, 0), |id| {
            let position = self.categories.get(&id).map_or(i32::MAX, |c| c.position);
            (position, id.raw())
        })
    }

    fn categories_of(&self, event: EventId) -> Vec<Category> {
        let mut rows: Vec<Category> = self
            .categories
            .values()
            .filter(|row| row.event == event)
            .cloned()
            .collect();
        rows.sort_by_key(|row| (row.position, row.id.raw()));
        rows
    }

    fn items_of(&self, event: EventId) -> Vec<Item> {
        let mut rows: Vec<Item> = self
            .items
            .values()
            .filter(|row| row.event == event)
            .cloned()
            .collect();
        rows.sort_by_key(|row| (self.scope_rank(row.category), row.position, row.id.raw()));
        rows
    }

    fn questions_of(&self, event: EventId) -> Vec<Question> {
        let mut rows: Vec<Question> = self
            .questions
            .values()
            .filter(|row| row.event == event)
            .cloned()
            .collect();
        rows.sort_by_key(|row| (row.position, row.id.raw()));
        rows
    }

    fn quotas_of(&self, event: EventId) -> Vec<Quota> {
        self.quotas
            .values()
            .filter(|row| row.event == event)
            .cloned()
            .collect()
    }
}

fn missing(what: &str) -> StoreError {
    StoreError::Database(format!("{what} does not exist"))
}

// ============================================================================
// Store
// ============================================================================

/// In-memory catalog store with database-like transaction semantics.
///
/// Clones share state through an [`Arc`], so a test can hand one clone to the
/// service under test and keep another for seeding and inspection.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ==========================================================================
    // Seeding
    // ==========================================================================

    /// Inserts or replaces an event.
    pub fn seed_event(&self, record: EventRecord) {
        let mut state = self.state_mut();
        state.reserve(record.id.raw());
        state.events.insert(record.id, record);
    }

    /// Inserts or replaces a category.
    pub fn seed_category(&self, category: Category) {
        let mut state = self.state_mut();
        state.reserve(category.id.raw());
        state.categories.insert(category.id, category);
    }

    /// Inserts or replaces an item.
    pub fn seed_item(&self, item: Item) {
        let mut state = self.state_mut();
        state.reserve(item.id.raw());
        state.items.insert(item.id, item);
    }

    /// Inserts or replaces a question. Item links are stored sorted.
    pub fn seed_question(&self, mut question: Question) {
        let mut state = self.state_mut();
        state.reserve(question.id.raw());
        for option in &question.options {
            state.reserve(option.id.raw());
        }
        question.item_ids.sort_unstable();
        state.questions.insert(question.id, question);
    }

    /// Inserts or replaces a quota. Item links are stored sorted.
    pub fn seed_quota(&self, mut quota: Quota) {
        let mut state = self.state_mut();
        state.reserve(quota.id.raw());
        quota.item_ids.sort_unstable();
        state.quotas.insert(quota.id, quota);
    }

    /// Marks an item as referenced by at least one order position.
    pub fn seed_order_reference(&self, item: ItemId) {
        self.state_mut().order_refs.insert(item);
    }

    /// Makes the next hard delete of the item fail like a foreign-key
    /// rejection that only surfaces at delete time.
    pub fn block_item_delete(&self, item: ItemId) {
        self.state_mut().blocked_deletes.insert(item);
    }

    /// Records answer values for a question's statistics.
    pub fn seed_answers(&self, question: QuestionId, rows: &[(&str, i64)]) {
        let rows = rows
            .iter()
            .map(|(answer, count)| ((*answer).to_owned(), *count))
            .collect();
        self.state_mut().answers.insert(question, rows);
    }

    // ==========================================================================
    // Inspection
    // ==========================================================================

    /// Every committed audit record, oldest first.
    #[must_use]
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.state().audit.clone()
    }

    /// Committed view of an event.
    #[must_use]
    pub fn event_record(&self, event: EventId) -> Option<EventRecord> {
        self.state().events.get(&event).cloned()
    }

    /// Committed view of an item.
    #[must_use]
    pub fn item(&self, item: ItemId) -> Option<Item> {
        self.state().items.get(&item).cloned()
    }

    /// Committed view of a category.
    #[must_use]
    pub fn category(&self, category: CategoryId) -> Option<Category> {
        self.state().categories.get(&category).cloned()
    }

    /// Committed view of a question.
    #[must_use]
    pub fn question(&self, question: QuestionId) -> Option<Question> {
        self.state().questions.get(&question).cloned()
    }

    /// Committed view of a quota.
    #[must_use]
    pub fn quota(&self, quota: QuotaId) -> Option<Quota> {
        self.state().quotas.get(&quota).cloned()
    }

    /// Committed categories of an event, ordered by position then id.
    #[must_use]
    pub fn categories_of(&self, event: EventId) -> Vec<Category> {
        self.state().categories_of(event)
    }

    /// Committed items of an event in display order.
    #[must_use]
    pub fn items_of(&self, event: EventId) -> Vec<Item> {
        self.state().items_of(event)
    }

    /// Committed questions of an event, ordered by position then id.
    #[must_use]
    pub fn questions_of(&self, event: EventId) -> Vec<Question> {
        self.state().questions_of(event)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn event(&self, event: EventId) -> Result<Option<EventRecord>, StoreError> {
        Ok(self.state().events.get(&event).cloned())
    }

    async fn categories(&self, event: EventId) -> Result<Vec<Category>, StoreError> {
        Ok(self.state().categories_of(event))
    }

    async fn items(&self, event: EventId) -> Result<Vec<Item>, StoreError> {
        Ok(self.state().items_of(event))
    }

    async fn questions(&self, event: EventId) -> Result<Vec<Question>, StoreError> {
        Ok(self.state().questions_of(event))
    }

    async fn quotas(&self, event: EventId) -> Result<Vec<Quota>, StoreError> {
        Ok(self.state().quotas_of(event))
    }

    async fn find_item(&self, event: EventId, item: ItemId) -> Result<Option<Item>, StoreError> {
        Ok(self
            .state()
            .items
            .get(&item)
            .filter(|row| row.event == event)
            .cloned())
    }

    async fn find_question(
        &self,
        event: EventId,
        question: QuestionId,
    ) -> Result<Option<Question>, StoreError> {
        Ok(self
            .state()
            .questions
            .get(&question)
            .filter(|row| row.event == event)
            .cloned())
    }

    async fn find_quota(
        &self,
        event: EventId,
        quota: QuotaId,
    ) -> Result<Option<Quota>, StoreError> {
        Ok(self
            .state()
            .quotas
            .get(&quota)
            .filter(|row| row.event == event)
            .cloned())
    }

    async fn question_answer_stats(
        &self,
        question: QuestionId,
    ) -> Result<Vec<AnswerBucket>, StoreError> {
        let state = self.state();
        let mut buckets: Vec<AnswerBucket> = state
            .answers
            .get(&question)
            .into_iter()
            .flatten()
            .map(|(answer, count)| AnswerBucket {
                answer: answer.clone(),
                count: *count,
            })
            .collect();
        buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.answer.cmp(&b.answer)));
        Ok(buckets)
    }

    async fn begin(&self) -> Result<Box<dyn CatalogTransaction>, StoreError> {
        let work = self.state().clone();
        Ok(Box::new(MemoryTransaction {
            shared: Arc::clone(&self.state),
            work,
        }))
    }
}

// ============================================================================
// Transaction
// ============================================================================

/// Transaction over a [`MemoryStore`]. Dropping it discards all work.
#[derive(Debug)]
pub struct MemoryTransaction {
    shared: Arc<RwLock<State>>,
    work: State,
}

#[async_trait]
impl CatalogTransaction for MemoryTransaction {
    async fn find_category(
        &mut self,
        event: EventId,
        category: CategoryId,
    ) -> Result<Option<Category>, StoreError> {
        Ok(self
            .work
            .categories
            .get(&category)
            .filter(|row| row.event == event)
            .cloned())
    }

    async fn find_item(&mut self, event: EventId, item: ItemId) -> Result<Option<Item>, StoreError> {
        Ok(self
            .work
            .items
            .get(&item)
            .filter(|row| row.event == event)
            .cloned())
    }

    async fn find_question(
        &mut self,
        event: EventId,
        question: QuestionId,
    ) -> Result<Option<Question>, StoreError> {
        Ok(self
            .work
            .questions
            .get(&question)
            .filter(|row| row.event == event)
            .cloned())
    }

    async fn find_quota(
        &mut self,
        event: EventId,
        quota: QuotaId,
    ) -> Result<Option<Quota>, StoreError> {
        Ok(self
            .work
            .quotas
            .get(&quota)
            .filter(|row| row.event == event)
            .cloned())
    }

    async fn items_by_ids(
        &mut self,
        event: EventId,
        ids: &[ItemId],
    ) -> Result<Vec<Item>, StoreError> {
        let wanted: HashSet<ItemId> = ids.iter().copied().collect();
        Ok(self
            .work
            .items_of(event)
            .into_iter()
            .filter(|row| wanted.contains(&row.id))
            .collect())
    }

    async fn items_in_scope(
        &mut self,
        event: EventId,
        category: Option<CategoryId>,
    ) -> Result<Vec<Item>, StoreError> {
        let mut rows: Vec<Item> = self
            .work
            .items
            .values()
            .filter(|row| row.event == event && row.category == category)
            .cloned()
            .collect();
        rows.sort_by_key(|row| (row.position, row.id.raw()));
        Ok(rows)
    }

    async fn categories(&mut self, event: EventId) -> Result<Vec<Category>, StoreError> {
        Ok(self.work.categories_of(event))
    }

    async fn questions(&mut self, event: EventId) -> Result<Vec<Question>, StoreError> {
        Ok(self.work.questions_of(event))
    }

    async fn item_has_order_references(&mut self, item: ItemId) -> Result<bool, StoreError> {
        Ok(self.work.order_refs.contains(&item))
    }

    async fn insert_item(
        &mut self,
        event: EventId,
        draft: &ItemDraft,
        position: i32,
    ) -> Result<Item, StoreError> {
        let id = ItemId::new(self.work.allocate());
        let row = Item {
            id,
            event,
            category: draft.category,
            name: draft.name.clone(),
            internal_name: draft.internal_name.clone(),
            active: draft.active,
            admission: draft.admission,
            default_price_cents: draft.default_price_cents,
            position,
            created_at: Utc::now(),
        };
        self.work.items.insert(id, row.clone());
        Ok(row)
    }

    async fn update_item(&mut self, item: &Item) -> Result<(), StoreError> {
        let slot = self
            .work
            .items
            .get_mut(&item.id)
            .ok_or_else(|| missing("updated item"))?;
        *slot = item.clone();
        Ok(())
    }

    async fn set_item_placement(
        &mut self,
        item: ItemId,
        position: i32,
        category: Option<CategoryId>,
    ) -> Result<(), StoreError> {
        let slot = self
            .work
            .items
            .get_mut(&item)
            .ok_or_else(|| missing("placed item"))?;
        slot.position = position;
        slot.category = category;
        Ok(())
    }

    async fn set_item_active(&mut self, item: ItemId, active: bool) -> Result<(), StoreError> {
        let slot = self
            .work
            .items
            .get_mut(&item)
            .ok_or_else(|| missing("toggled item"))?;
        slot.active = active;
        Ok(())
    }

    async fn delete_item(&mut self, item: ItemId) -> Result<ItemDeletion, StoreError> {
        if self.work.blocked_deletes.contains(&item) || self.work.order_refs.contains(&item) {
            return Ok(ItemDeletion::Blocked);
        }
        self.work.items.remove(&item);
        for question in self.work.questions.values_mut() {
            question.item_ids.retain(|id| *id != item);
        }
        for quota in self.work.quotas.values_mut() {
            quota.item_ids.retain(|id| *id != item);
        }
        Ok(ItemDeletion::Deleted)
    }

    async fn insert_category(
        &mut self,
        event: EventId,
        draft: &CategoryDraft,
        position: i32,
    ) -> Result<Category, StoreError> {
        let id = CategoryId::new(self.work.allocate());
        let row = Category {
            id,
            event,
            name: draft.name.clone(),
            internal_name: draft.internal_name.clone(),
            description: draft.description.clone(),
            position,
        };
        self.work.categories.insert(id, row.clone());
        Ok(row)
    }

    async fn update_category(&mut self, category: &Category) -> Result<(), StoreError> {
        let slot = self
            .work
            .categories
            .get_mut(&category.id)
            .ok_or_else(|| missing("updated category"))?;
        *slot = category.clone();
        Ok(())
    }

    async fn set_category_position(
        &mut self,
        category: CategoryId,
        position: i32,
    ) -> Result<(), StoreError> {
        let slot = self
            .work
            .categories
            .get_mut(&category)
            .ok_or_else(|| missing("repositioned category"))?;
        slot.position = position;
        Ok(())
    }

    async fn detach_category_items(
        &mut self,
        category: CategoryId,
    ) -> Result<Vec<ItemId>, StoreError> {
        let mut detached: Vec<(i32, ItemId)> = Vec::new();
        for item in self.work.items.values_mut() {
            if item.category == Some(category) {
                item.category = None;
                detached.push((item.position, item.id));
            }
        }
        detached.sort_unstable();
        Ok(detached.into_iter().map(|(_, id)| id).collect())
    }

    async fn delete_category(&mut self, category: CategoryId) -> Result<(), StoreError> {
        self.work.categories.remove(&category);
        Ok(())
    }

    async fn insert_question(
        &mut self,
        event: EventId,
        draft: &QuestionDraft,
        position: i32,
    ) -> Result<Question, StoreError> {
        let id = QuestionId::new(self.work.allocate());
        let mut options = Vec::with_capacity(draft.options.len());
        for (index, label) in draft.options.iter().enumerate() {
            options.push(QuestionOption {
                id: OptionId::new(self.work.allocate()),
                label: label.clone(),
                position: i32::try_from(index).unwrap_or(i32::MAX),
            });
        }
        let mut item_ids = draft.item_ids.clone();
        item_ids.sort_unstable();
        let row = Question {
            id,
            event,
            label: draft.label.clone(),
            kind: draft.kind,
            required: draft.required,
            position,
            item_ids,
            options,
        };
        self.work.questions.insert(id, row.clone());
        Ok(row)
    }

    async fn update_question(&mut self, question: &Question) -> Result<(), StoreError> {
        let mut next = question.clone();
        for option in &mut next.options {
            if option.id.raw() == 0 {
                option.id = OptionId::new(self.work.allocate());
            }
        }
        next.item_ids.sort_unstable();
        let slot = self
            .work
            .questions
            .get_mut(&question.id)
            .ok_or_else(|| missing("updated question"))?;
        *slot = next;
        Ok(())
    }

    async fn set_question_position(
        &mut self,
        question: QuestionId,
        position: i32,
    ) -> Result<(), StoreError> {
        let slot = self
            .work
            .questions
            .get_mut(&question)
            .ok_or_else(|| missing("repositioned question"))?;
        slot.position = position;
        Ok(())
    }

    async fn delete_question(&mut self, question: QuestionId) -> Result<(), StoreError> {
        self.work.questions.remove(&question);
        self.work.answers.remove(&question);
        Ok(())
    }

    async fn save_system_question_order(
        &mut self,
        event: EventId,
        order: &SystemOrderMap,
    ) -> Result<(), StoreError> {
        let slot = self
            .work
            .events
            .get_mut(&event)
            .ok_or_else(|| missing("reordered event"))?;
        slot.system_question_order = order.clone();
        Ok(())
    }

    async fn insert_quota(
        &mut self,
        event: EventId,
        draft: &QuotaDraft,
    ) -> Result<Quota, StoreError> {
        let id = QuotaId::new(self.work.allocate());
        let mut item_ids = draft.item_ids.clone();
        item_ids.sort_unstable();
        let row = Quota {
            id,
            event,
            name: draft.name.clone(),
            size: draft.size,
            closed: false,
            close_when_sold_out: draft.close_when_sold_out,
            item_ids,
        };
        self.work.quotas.insert(id, row.clone());
        Ok(row)
    }

    async fn update_quota(&mut self, quota: &Quota) -> Result<(), StoreError> {
        let mut next = quota.clone();
        next.item_ids.sort_unstable();
        let slot = self
            .work
            .quotas
            .get_mut(&quota.id)
            .ok_or_else(|| missing("updated quota"))?;
        *slot = next;
        Ok(())
    }

    async fn delete_quota(&mut self, quota: QuotaId) -> Result<(), StoreError> {
        self.work.quotas.remove(&quota);
        Ok(())
    }

    async fn record_audit(&mut self, entry: AuditEntry) -> Result<(), StoreError> {
        self.work.audit.push(entry);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        *self.shared.write().unwrap_or_else(PoisonError::into_inner) = self.work;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = MemoryStore::new();
        store.seed_event(fixtures::event(EventId::new(1)));

        {
            let mut tx = store.begin().await.unwrap();
            let draft = CategoryDraft {
                name: "Tickets".into(),
                internal_name: None,
                description: None,
            };
            tx.insert_category(EventId::new(1), &draft, 0).await.unwrap();
            // No commit.
        }

        assert!(store.categories_of(EventId::new(1)).is_empty());
    }

    #[tokio::test]
    async fn commit_publishes_writes_and_audit_together() {
        let store = MemoryStore::new();
        store.seed_event(fixtures::event(EventId::new(1)));

        let mut tx = store.begin().await.unwrap();
        let draft = CategoryDraft {
            name: "Tickets".into(),
            internal_name: None,
            description: None,
        };
        let row = tx.insert_category(EventId::new(1), &draft, 0).await.unwrap();
        tx.record_audit(AuditEntry::new(
            marquee_core::ids::ActorId::new(1),
            EventId::new(1),
            marquee_core::audit::AuditTarget::Category(row.id),
            marquee_core::audit::AuditAction::CategoryAdded,
        ))
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.categories_of(EventId::new(1)).len(), 1);
        assert_eq!(store.audit_entries().len(), 1);
    }

    #[tokio::test]
    async fn items_sort_uncategorized_first_then_by_category_rank() {
        let store = MemoryStore::new();
        let event = EventId::new(1);
        store.seed_event(fixtures::event(event));
        store.seed_category(fixtures::category(10, event, 1));
        store.seed_category(fixtures::category(11, event, 0));
        store.seed_item(fixtures::item(100, event, Some(CategoryId::new(10)), 0));
        store.seed_item(fixtures::item(101, event, Some(CategoryId::new(11)), 0));
        store.seed_item(fixtures::item(102, event, None, 3));

        let ids: Vec<i64> = store
            .items(event)
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.id.raw())
            .collect();
        assert_eq!(ids, vec![102, 101, 100]);
    }

    #[tokio::test]
    async fn deleting_an_item_detaches_question_and_quota_links() {
        let store = MemoryStore::new();
        let event = EventId::new(1);
        store.seed_event(fixtures::event(event));
        store.seed_item(fixtures::item(100, event, None, 0));
        let mut question = fixtures::question(200, event, 0);
        question.item_ids = vec![ItemId::new(100)];
        store.seed_question(question);
        let mut quota = fixtures::quota(300, event);
        quota.item_ids = vec![ItemId::new(100)];
        store.seed_quota(quota);

        let mut tx = store.begin().await.unwrap();
        let outcome = tx.delete_item(ItemId::new(100)).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(outcome, ItemDeletion::Deleted);
        assert!(store.question(QuestionId::new(200)).unwrap().item_ids.is_empty());
        assert!(store.quota(QuotaId::new(300)).unwrap().item_ids.is_empty());
    }

    #[tokio::test]
    async fn blocked_delete_leaves_the_row_and_transaction_usable() {
        let store = MemoryStore::new();
        let event = EventId::new(1);
        store.seed_event(fixtures::event(event));
        store.seed_item(fixtures::item(100, event, None, 0));
        store.block_item_delete(ItemId::new(100));

        let mut tx = store.begin().await.unwrap();
        let outcome = tx.delete_item(ItemId::new(100)).await.unwrap();
        assert_eq!(outcome, ItemDeletion::Blocked);
        tx.set_item_active(ItemId::new(100), false).await.unwrap();
        tx.commit().await.unwrap();

        let row = store.item(ItemId::new(100)).unwrap();
        assert!(!row.active);
    }

    #[tokio::test]
    async fn option_sync_assigns_ids_to_fresh_rows_only() {
        let store = MemoryStore::new();
        let event = EventId::new(1);
        store.seed_event(fixtures::event(event));
        let mut question = fixtures::question(200, event, 0);
        question.options = vec![QuestionOption {
            id: OptionId::new(7),
            label: "Red".into(),
            position: 0,
        }];
        store.seed_question(question.clone());

        question.options.push(QuestionOption {
            id: OptionId::new(0),
            label: "Blue".into(),
            position: 1,
        });
        let mut tx = store.begin().await.unwrap();
        tx.update_question(&question).await.unwrap();
        let stored = tx
            .find_question(event, QuestionId::new(200))
            .await
            .unwrap()
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(stored.options[0].id, OptionId::new(7));
        assert!(stored.options[1].id.raw() >= 1000);
    }

    #[tokio::test]
    async fn answer_stats_sort_most_frequent_first() {
        let store = MemoryStore::new();
        let question = QuestionId::new(200);
        store.seed_answers(question, &[("Small", 2), ("Large", 5), ("Medium", 2)]);

        let buckets = store.question_answer_stats(question).await.unwrap();
        let ordered: Vec<(&str, i64)> = buckets
            .iter()
            .map(|bucket| (bucket.answer.as_str(), bucket.count))
            .collect();
        assert_eq!(ordered, vec![("Large", 5), ("Medium", 2), ("Small", 2)]);
    }
}
