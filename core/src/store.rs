//! Persistence boundary for the catalog.
//!
//! [`CatalogStore`] serves plain reads and opens transactions;
//! [`CatalogTransaction`] carries every mutation plus the snapshot reads that
//! must observe the transaction's own view. Audit records are written through
//! the transaction so they commit or roll back with the rows they describe.

use crate::audit::AuditEntry;
use crate::entities::{Category, CategoryDraft, EventRecord, Item, ItemDraft, Question, QuestionDraft, Quota, QuotaDraft};
use crate::ids::{CategoryId, EventId, ItemId, QuestionId, QuotaId};
use crate::system_fields::SystemOrderMap;
use async_trait::async_trait;
use thiserror::Error;

/// Storage-layer failure, opaque to callers beyond its class.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing database rejected or dropped the operation.
    #[error("database error: {0}")]
    Database(String),

    /// A stored value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Outcome of an item deletion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemDeletion {
    /// The row is gone.
    Deleted,
    /// Sold references surfaced at delete time; the row survives and the
    /// caller is expected to disable it instead.
    Blocked,
}

/// One answer value with its occurrence count, for question statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerBucket {
    /// The answer as given (option label for choice questions, raw text
    /// otherwise).
    pub answer: String,
    /// How many order positions gave it.
    pub count: i64,
}

/// Read access plus transaction entry. Shared behind `Arc<dyn CatalogStore>`.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Loads an event by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the lookup fails.
    async fn event(&self, event: EventId) -> Result<Option<EventRecord>, StoreError>;

    /// All categories of an event, ordered by position then id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn categories(&self, event: EventId) -> Result<Vec<Category>, StoreError>;

    /// All items of an event, ordered by category position, then item
    /// position, then id. Uncategorized items sort first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn items(&self, event: EventId) -> Result<Vec<Item>, StoreError>;

    /// All questions of an event with options and item links, ordered by
    /// position then id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn questions(&self, event: EventId) -> Result<Vec<Question>, StoreError>;

    /// All quotas of an event with item links, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn quotas(&self, event: EventId) -> Result<Vec<Quota>, StoreError>;

    /// One item scoped to its event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the lookup fails.
    async fn find_item(&self, event: EventId, item: ItemId) -> Result<Option<Item>, StoreError>;

    /// One question scoped to its event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the lookup fails.
    async fn find_question(
        &self,
        event: EventId,
        question: QuestionId,
    ) -> Result<Option<Question>, StoreError>;

    /// One quota scoped to its event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the lookup fails.
    async fn find_quota(&self, event: EventId, quota: QuotaId) -> Result<Option<Quota>, StoreError>;

    /// Answer histogram for a question, most frequent first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn question_answer_stats(
        &self,
        question: QuestionId,
    ) -> Result<Vec<AnswerBucket>, StoreError>;

    /// Opens a transaction. Dropping the value without [`CatalogTransaction::commit`]
    /// rolls everything back.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a connection cannot be acquired.
    async fn begin(&self) -> Result<Box<dyn CatalogTransaction>, StoreError>;
}

/// One unit of catalog work. All reads observe the transaction's snapshot;
/// all writes and audit records land atomically on [`commit`].
///
/// [`commit`]: CatalogTransaction::commit
#[async_trait]
pub trait CatalogTransaction: Send {
    // ==========================================================================
    // Snapshot reads
    // ==========================================================================

    /// One category scoped to its event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the lookup fails.
    async fn find_category(
        &mut self,
        event: EventId,
        category: CategoryId,
    ) -> Result<Option<Category>, StoreError>;

    /// One item scoped to its event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the lookup fails.
    async fn find_item(&mut self, event: EventId, item: ItemId) -> Result<Option<Item>, StoreError>;

    /// One question with options and item links, scoped to its event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the lookup fails.
    async fn find_question(
        &mut self,
        event: EventId,
        question: QuestionId,
    ) -> Result<Option<Question>, StoreError>;

    /// One quota with item links, scoped to its event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the lookup fails.
    async fn find_quota(
        &mut self,
        event: EventId,
        quota: QuotaId,
    ) -> Result<Option<Quota>, StoreError>;

    /// The event's items matching the given ids, in stored order. Ids from
    /// other events are silently absent from the result.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn items_by_ids(
        &mut self,
        event: EventId,
        ids: &[ItemId],
    ) -> Result<Vec<Item>, StoreError>;

    /// The event's items within one category scope (`None` = uncategorized),
    /// ordered by position then id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn items_in_scope(
        &mut self,
        event: EventId,
        category: Option<CategoryId>,
    ) -> Result<Vec<Item>, StoreError>;

    /// All categories of the event, ordered by position then id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn categories(&mut self, event: EventId) -> Result<Vec<Category>, StoreError>;

    /// All questions of the event, ordered by position then id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn questions(&mut self, event: EventId) -> Result<Vec<Question>, StoreError>;

    /// Whether any order position references the item. Used as the cheap
    /// pre-check before attempting a hard delete.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn item_has_order_references(&mut self, item: ItemId) -> Result<bool, StoreError>;

    // ==========================================================================
    // Item writes
    // ==========================================================================

    /// Inserts a new item at the given position and returns the stored row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    async fn insert_item(
        &mut self,
        event: EventId,
        draft: &ItemDraft,
        position: i32,
    ) -> Result<Item, StoreError>;

    /// Persists every column of an existing item from the given row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    async fn update_item(&mut self, item: &Item) -> Result<(), StoreError>;

    /// Rewrites an item's position and category in one statement.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    async fn set_item_placement(
        &mut self,
        item: ItemId,
        position: i32,
        category: Option<CategoryId>,
    ) -> Result<(), StoreError>;

    /// Flips an item's `active` flag.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    async fn set_item_active(&mut self, item: ItemId, active: bool) -> Result<(), StoreError>;

    /// Attempts a hard delete inside a savepoint. A foreign-key rejection
    /// from sold references rolls back to the savepoint and reports
    /// [`ItemDeletion::Blocked`] with the transaction still usable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the delete fails for any other reason.
    async fn delete_item(&mut self, item: ItemId) -> Result<ItemDeletion, StoreError>;

    // ==========================================================================
    // Category writes
    // ==========================================================================

    /// Inserts a new category at the given position and returns the stored
    /// row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    async fn insert_category(
        &mut self,
        event: EventId,
        draft: &CategoryDraft,
        position: i32,
    ) -> Result<Category, StoreError>;

    /// Persists every column of an existing category from the given row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    async fn update_category(&mut self, category: &Category) -> Result<(), StoreError>;

    /// Rewrites a category's position.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    async fn set_category_position(
        &mut self,
        category: CategoryId,
        position: i32,
    ) -> Result<(), StoreError>;

    /// Moves every item of the category to uncategorized. Returns the ids
    /// that were detached.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    async fn detach_category_items(
        &mut self,
        category: CategoryId,
    ) -> Result<Vec<ItemId>, StoreError>;

    /// Hard-deletes a category.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the delete fails.
    async fn delete_category(&mut self, category: CategoryId) -> Result<(), StoreError>;

    // ==========================================================================
    // Question writes
    // ==========================================================================

    /// Inserts a new question with its options and item links, and returns
    /// the stored row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    async fn insert_question(
        &mut self,
        event: EventId,
        draft: &QuestionDraft,
        position: i32,
    ) -> Result<Question, StoreError>;

    /// Persists an existing question from the given row. Options are synced
    /// by id: rows carrying id `0` are inserted fresh, existing ids are
    /// updated in place, and stored options absent from the row are deleted.
    /// Item links are replaced wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    async fn update_question(&mut self, question: &Question) -> Result<(), StoreError>;

    /// Rewrites a question's position.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    async fn set_question_position(
        &mut self,
        question: QuestionId,
        position: i32,
    ) -> Result<(), StoreError>;

    /// Hard-deletes a question with its options, item links, and recorded
    /// answers.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the delete fails.
    async fn delete_question(&mut self, question: QuestionId) -> Result<(), StoreError>;

    /// Persists the event's system question display order wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    async fn save_system_question_order(
        &mut self,
        event: EventId,
        order: &SystemOrderMap,
    ) -> Result<(), StoreError>;

    // ==========================================================================
    // Quota writes
    // ==========================================================================

    /// Inserts a new quota with its item links and returns the stored row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    async fn insert_quota(&mut self, event: EventId, draft: &QuotaDraft)
        -> Result<Quota, StoreError>;

    /// Persists an existing quota from the given row, replacing its item
    /// links wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    async fn update_quota(&mut self, quota: &Quota) -> Result<(), StoreError>;

    /// Hard-deletes a quota with its item links.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the delete fails.
    async fn delete_quota(&mut self, quota: QuotaId) -> Result<(), StoreError>;

    // ==========================================================================
    // Audit and commit
    // ==========================================================================

    /// Appends an audit record. It becomes durable only on [`commit`].
    ///
    /// [`commit`]: CatalogTransaction::commit
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    async fn record_audit(&mut self, entry: AuditEntry) -> Result<(), StoreError>;

    /// Commits every write and audit record at once.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the commit fails; all work is rolled back.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
