//! sqlx-backed catalog store.
//!
//! All reads run through shared fetch helpers taking a bare connection, so
//! the pool-backed store and the transaction serve identical row shapes. The
//! runtime query API is used throughout; schema lives in `./migrations`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marquee_core::audit::AuditEntry;
use marquee_core::entities::{
    AttendeeFields, Category, CategoryDraft, EventRecord, Item, ItemDraft, Question,
    QuestionDraft, QuestionKind, QuestionOption, Quota, QuotaDraft,
};
use marquee_core::ids::{CategoryId, EventId, ItemId, OptionId, QuestionId, QuotaId};
use marquee_core::store::{
    AnswerBucket, CatalogStore, CatalogTransaction, ItemDeletion, StoreError,
};
use marquee_core::system_fields::SystemOrderMap;
use sqlx::postgres::{PgConnection, PgPool, Postgres};
use sqlx::{Acquire, Transaction};
use std::collections::{HashMap, HashSet};

// ============================================================================
// Errors and codecs
// ============================================================================

fn db_err(context: &str, error: sqlx::Error) -> StoreError {
    StoreError::Database(format!("Failed to {context}: {error}"))
}

fn no_row(context: &str) -> StoreError {
    StoreError::Database(format!("Failed to {context}: no matching row"))
}

const fn kind_code(kind: QuestionKind) -> &'static str {
    match kind {
        QuestionKind::Text => "text",
        QuestionKind::Multiline => "multiline",
        QuestionKind::Number => "number",
        QuestionKind::Boolean => "boolean",
        QuestionKind::Choice => "choice",
        QuestionKind::MultipleChoice => "multiple_choice",
        QuestionKind::Date => "date",
        QuestionKind::Time => "time",
        QuestionKind::DateTime => "date_time",
        QuestionKind::File => "file",
        QuestionKind::Country => "country",
    }
}

fn kind_from_code(code: &str) -> Result<QuestionKind, StoreError> {
    match code {
        "text" => Ok(QuestionKind::Text),
        "multiline" => Ok(QuestionKind::Multiline),
        "number" => Ok(QuestionKind::Number),
        "boolean" => Ok(QuestionKind::Boolean),
        "choice" => Ok(QuestionKind::Choice),
        "multiple_choice" => Ok(QuestionKind::MultipleChoice),
        "date" => Ok(QuestionKind::Date),
        "time" => Ok(QuestionKind::Time),
        "date_time" => Ok(QuestionKind::DateTime),
        "file" => Ok(QuestionKind::File),
        "country" => Ok(QuestionKind::Country),
        other => Err(StoreError::Serialization(format!(
            "unknown question kind: {other}"
        ))),
    }
}

// ============================================================================
// Row shapes
// ============================================================================

#[derive(sqlx::FromRow)]
struct EventRow {
    id: i64,
    slug: String,
    name: String,
    names_asked: bool,
    names_required: bool,
    emails_asked: bool,
    emails_required: bool,
    company_asked: bool,
    company_required: bool,
    addresses_asked: bool,
    addresses_required: bool,
    system_question_order: serde_json::Value,
}

impl EventRow {
    fn into_record(self) -> Result<EventRecord, StoreError> {
        let system_question_order: SystemOrderMap =
            serde_json::from_value(self.system_question_order).map_err(|e| {
                StoreError::Serialization(format!("Failed to decode system question order: {e}"))
            })?;
        Ok(EventRecord {
            id: EventId::new(self.id),
            slug: self.slug,
            name: self.name,
            attendee_fields: AttendeeFields {
                names_asked: self.names_asked,
                names_required: self.names_required,
                emails_asked: self.emails_asked,
                emails_required: self.emails_required,
                company_asked: self.company_asked,
                company_required: self.company_required,
                addresses_asked: self.addresses_asked,
                addresses_required: self.addresses_required,
            },
            system_question_order,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    event_id: i64,
    name: String,
    internal_name: Option<String>,
    description: Option<String>,
    position: i32,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            event: EventId::new(row.event_id),
            name: row.name,
            internal_name: row.internal_name,
            description: row.description,
            position: row.position,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: i64,
    event_id: i64,
    category_id: Option<i64>,
    name: String,
    internal_name: Option<String>,
    active: bool,
    admission: bool,
    default_price_cents: i64,
    position: i32,
    created_at: DateTime<Utc>,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Self {
            id: ItemId::new(row.id),
            event: EventId::new(row.event_id),
            category: row.category_id.map(CategoryId::new),
            name: row.name,
            internal_name: row.internal_name,
            active: row.active,
            admission: row.admission,
            default_price_cents: row.default_price_cents,
            position: row.position,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct QuestionRow {
    id: i64,
    event_id: i64,
    label: String,
    kind: String,
    required: bool,
    position: i32,
}

impl QuestionRow {
    fn into_question(
        self,
        item_ids: Vec<ItemId>,
        options: Vec<QuestionOption>,
    ) -> Result<Question, StoreError> {
        Ok(Question {
            id: QuestionId::new(self.id),
            event: EventId::new(self.event_id),
            label: self.label,
            kind: kind_from_code(&self.kind)?,
            required: self.required,
            position: self.position,
            item_ids,
            options,
        })
    }
}

#[derive(sqlx::FromRow)]
struct QuotaRow {
    id: i64,
    event_id: i64,
    name: String,
    size: Option<i64>,
    closed: bool,
    close_when_sold_out: bool,
}

impl QuotaRow {
    fn into_quota(self, item_ids: Vec<ItemId>) -> Quota {
        Quota {
            id: QuotaId::new(self.id),
            event: EventId::new(self.event_id),
            name: self.name,
            size: self.size,
            closed: self.closed,
            close_when_sold_out: self.close_when_sold_out,
            item_ids,
        }
    }
}

const ITEM_COLUMNS: &str = "i.id, i.event_id, i.category_id, i.name, i.internal_name, \
     i.active, i.admission, i.default_price_cents, i.position, i.created_at";

// ============================================================================
// Shared fetch helpers
// ============================================================================

async fn fetch_event(
    conn: &mut PgConnection,
    event: EventId,
) -> Result<Option<EventRecord>, StoreError> {
    let row: Option<EventRow> = sqlx::query_as(
        "SELECT id, slug, name, names_asked, names_required, emails_asked, emails_required, \
                company_asked, company_required, addresses_asked, addresses_required, \
                system_question_order \
         FROM events WHERE id = $1",
    )
    .bind(event.raw())
    .fetch_optional(conn)
    .await
    .map_err(|e| db_err("load event", e))?;
    row.map(EventRow::into_record).transpose()
}

async fn fetch_categories(
    conn: &mut PgConnection,
    event: EventId,
) -> Result<Vec<Category>, StoreError> {
    let rows: Vec<CategoryRow> = sqlx::query_as(
        "SELECT id, event_id, name, internal_name, description, position \
         FROM categories WHERE event_id = $1 ORDER BY position, id",
    )
    .bind(event.raw())
    .fetch_all(conn)
    .await
    .map_err(|e| db_err("list categories", e))?;
    Ok(rows.into_iter().map(Category::from).collect())
}

async fn fetch_category(
    conn: &mut PgConnection,
    event: EventId,
    category: CategoryId,
) -> Result<Option<Category>, StoreError> {
    let row: Option<CategoryRow> = sqlx::query_as(
        "SELECT id, event_id, name, internal_name, description, position \
         FROM categories WHERE event_id = $1 AND id = $2",
    )
    .bind(event.raw())
    .bind(category.raw())
    .fetch_optional(conn)
    .await
    .map_err(|e| db_err("load category", e))?;
    Ok(row.map(Category::from))
}

async fn fetch_items(conn: &mut PgConnection, event: EventId) -> Result<Vec<Item>, StoreError> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM items i \
         LEFT JOIN categories c ON c.id = i.category_id \
         WHERE i.event_id = $1 \
         ORDER BY c.position NULLS FIRST, c.id NULLS FIRST, i.position, i.id"
    );
    let rows: Vec<ItemRow> = sqlx::query_as(&sql)
        .bind(event.raw())
        .fetch_all(conn)
        .await
        .map_err(|e| db_err("list items", e))?;
    Ok(rows.into_iter().map(Item::from).collect())
}

async fn fetch_item(
    conn: &mut PgConnection,
    event: EventId,
    item: ItemId,
) -> Result<Option<Item>, StoreError> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM items i WHERE i.event_id = $1 AND i.id = $2");
    let row: Option<ItemRow> = sqlx::query_as(&sql)
        .bind(event.raw())
        .bind(item.raw())
        .fetch_optional(conn)
        .await
        .map_err(|e| db_err("load item", e))?;
    Ok(row.map(Item::from))
}

async fn fetch_items_by_ids(
    conn: &mut PgConnection,
    event: EventId,
    ids: &[ItemId],
) -> Result<Vec<Item>, StoreError> {
    let raw: Vec<i64> = ids.iter().map(|id| id.raw()).collect();
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM items i \
         LEFT JOIN categories c ON c.id = i.category_id \
         WHERE i.event_id = $1 AND i.id = ANY($2) \
         ORDER BY c.position NULLS FIRST, c.id NULLS FIRST, i.position, i.id"
    );
    let rows: Vec<ItemRow> = sqlx::query_as(&sql)
        .bind(event.raw())
        .bind(&raw)
        .fetch_all(conn)
        .await
        .map_err(|e| db_err("load items by ids", e))?;
    Ok(rows.into_iter().map(Item::from).collect())
}

async fn fetch_items_in_scope(
    conn: &mut PgConnection,
    event: EventId,
    category: Option<CategoryId>,
) -> Result<Vec<Item>, StoreError> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM items i \
         WHERE i.event_id = $1 AND i.category_id IS NOT DISTINCT FROM $2 \
         ORDER BY i.position, i.id"
    );
    let rows: Vec<ItemRow> = sqlx::query_as(&sql)
        .bind(event.raw())
        .bind(category.map(CategoryId::raw))
        .fetch_all(conn)
        .await
        .map_err(|e| db_err("list items in scope", e))?;
    Ok(rows.into_iter().map(Item::from).collect())
}

async fn fetch_questions(
    conn: &mut PgConnection,
    event: EventId,
) -> Result<Vec<Question>, StoreError> {
    let rows: Vec<QuestionRow> = sqlx::query_as(
        "SELECT id, event_id, label, kind, required, position \
         FROM questions WHERE event_id = $1 ORDER BY position, id",
    )
    .bind(event.raw())
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| db_err("list questions", e))?;

    let option_rows: Vec<(i64, i64, String, i32)> = sqlx::query_as(
        "SELECT o.question_id, o.id, o.label, o.position \
         FROM question_options o JOIN questions q ON q.id = o.question_id \
         WHERE q.event_id = $1 ORDER BY o.position, o.id",
    )
    .bind(event.raw())
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| db_err("list question options", e))?;

    let link_rows: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT l.question_id, l.item_id \
         FROM question_items l JOIN questions q ON q.id = l.question_id \
         WHERE q.event_id = $1 ORDER BY l.item_id",
    )
    .bind(event.raw())
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| db_err("list question item links", e))?;

    let mut options: HashMap<i64, Vec<QuestionOption>> = HashMap::new();
    for (question_id, id, label, position) in option_rows {
        options.entry(question_id).or_default().push(QuestionOption {
            id: OptionId::new(id),
            label,
            position,
        });
    }
    let mut links: HashMap<i64, Vec<ItemId>> = HashMap::new();
    for (question_id, item_id) in link_rows {
        links.entry(question_id).or_default().push(ItemId::new(item_id));
    }

    rows.into_iter()
        .map(|row| {
            let item_ids = links.remove(&row.id).unwrap_or_default();
            let options = options.remove(&row.id).unwrap_or_default();
            row.into_question(item_ids, options)
        })
        .collect()
}

async fn fetch_question(
    conn: &mut PgConnection,
    event: EventId,
    question: QuestionId,
) -> Result<Option<Question>, StoreError> {
    let row: Option<QuestionRow> = sqlx::query_as(
        "SELECT id, event_id, label, kind, required, position \
         FROM questions WHERE event_id = $1 AND id = $2",
    )
    .bind(event.raw())
    .bind(question.raw())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| db_err("load question", e))?;
    let Some(row) = row else {
        return Ok(None);
    };

    let option_rows: Vec<(i64, String, i32)> = sqlx::query_as(
        "SELECT id, label, position FROM question_options \
         WHERE question_id = $1 ORDER BY position, id",
    )
    .bind(question.raw())
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| db_err("load question options", e))?;

    let link_rows: Vec<(i64,)> = sqlx::query_as(
        "SELECT item_id FROM question_items WHERE question_id = $1 ORDER BY item_id",
    )
    .bind(question.raw())
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| db_err("load question item links", e))?;

    let options = option_rows
        .into_iter()
        .map(|(id, label, position)| QuestionOption {
            id: OptionId::new(id),
            label,
            position,
        })
        .collect();
    let item_ids = link_rows.into_iter().map(|(id,)| ItemId::new(id)).collect();
    row.into_question(item_ids, options).map(Some)
}

async fn fetch_quotas(conn: &mut PgConnection, event: EventId) -> Result<Vec<Quota>, StoreError> {
    let rows: Vec<QuotaRow> = sqlx::query_as(
        "SELECT id, event_id, name, size, closed, close_when_sold_out \
         FROM quotas WHERE event_id = $1 ORDER BY id",
    )
    .bind(event.raw())
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| db_err("list quotas", e))?;

    let link_rows: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT l.quota_id, l.item_id \
         FROM quota_items l JOIN quotas q ON q.id = l.quota_id \
         WHERE q.event_id = $1 ORDER BY l.item_id",
    )
    .bind(event.raw())
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| db_err("list quota item links", e))?;

    let mut links: HashMap<i64, Vec<ItemId>> = HashMap::new();
    for (quota_id, item_id) in link_rows {
        links.entry(quota_id).or_default().push(ItemId::new(item_id));
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let item_ids = links.remove(&row.id).unwrap_or_default();
            row.into_quota(item_ids)
        })
        .collect())
}

async fn fetch_quota(
    conn: &mut PgConnection,
    event: EventId,
    quota: QuotaId,
) -> Result<Option<Quota>, StoreError> {
    let row: Option<QuotaRow> = sqlx::query_as(
        "SELECT id, event_id, name, size, closed, close_when_sold_out \
         FROM quotas WHERE event_id = $1 AND id = $2",
    )
    .bind(event.raw())
    .bind(quota.raw())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| db_err("load quota", e))?;
    let Some(row) = row else {
        return Ok(None);
    };

    let link_rows: Vec<(i64,)> =
        sqlx::query_as("SELECT item_id FROM quota_items WHERE quota_id = $1 ORDER BY item_id")
            .bind(quota.raw())
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| db_err("load quota item links", e))?;

    let item_ids = link_rows.into_iter().map(|(id,)| ItemId::new(id)).collect();
    Ok(Some(row.into_quota(item_ids)))
}

// ============================================================================
// Store
// ============================================================================

/// PostgreSQL-backed [`CatalogStore`].
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    /// Wraps an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// The underlying pool, for sharing with the other stores.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn conn(&self) -> Result<sqlx::pool::PoolConnection<Postgres>, StoreError> {
        self.pool
            .acquire()
            .await
            .map_err(|e| db_err("acquire connection", e))
    }
}

impl std::fmt::Debug for PgCatalogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgCatalogStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    #[tracing::instrument(level = "debug", skip(self), fields(event = %event))]
    async fn event(&self, event: EventId) -> Result<Option<EventRecord>, StoreError> {
        fetch_event(&mut *self.conn().await?, event).await
    }

    #[tracing::instrument(level = "debug", skip(self), fields(event = %event))]
    async fn categories(&self, event: EventId) -> Result<Vec<Category>, StoreError> {
        fetch_categories(&mut *self.conn().await?, event).await
    }

    #[tracing::instrument(level = "debug", skip(self), fields(event = %event))]
    async fn items(&self, event: EventId) -> Result<Vec<Item>, StoreError> {
        fetch_items(&mut *self.conn().await?, event).await
    }

    #[tracing::instrument(level = "debug", skip(self), fields(event = %event))]
    async fn questions(&self, event: EventId) -> Result<Vec<Question>, StoreError> {
        fetch_questions(&mut *self.conn().await?, event).await
    }

    #[tracing::instrument(level = "debug", skip(self), fields(event = %event))]
    async fn quotas(&self, event: EventId) -> Result<Vec<Quota>, StoreError> {
        fetch_quotas(&mut *self.conn().await?, event).await
    }

    async fn find_item(&self, event: EventId, item: ItemId) -> Result<Option<Item>, StoreError> {
        fetch_item(&mut *self.conn().await?, event, item).await
    }

    async fn find_question(
        &self,
        event: EventId,
        question: QuestionId,
    ) -> Result<Option<Question>, StoreError> {
        fetch_question(&mut *self.conn().await?, event, question).await
    }

    async fn find_quota(
        &self,
        event: EventId,
        quota: QuotaId,
    ) -> Result<Option<Quota>, StoreError> {
        fetch_quota(&mut *self.conn().await?, event, quota).await
    }

    #[tracing::instrument(level = "debug", skip(self), fields(question = %question))]
    async fn question_answer_stats(
        &self,
        question: QuestionId,
    ) -> Result<Vec<AnswerBucket>, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT answer, COUNT(*) FROM question_answers \
             WHERE question_id = $1 GROUP BY answer ORDER BY COUNT(*) DESC, answer",
        )
        .bind(question.raw())
        .fetch_all(&mut *self.conn().await?)
        .await
        .map_err(|e| db_err("count question answers", e))?;
        Ok(rows
            .into_iter()
            .map(|(answer, count)| AnswerBucket { answer, count })
            .collect())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn begin(&self) -> Result<Box<dyn CatalogTransaction>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_err("begin transaction", e))?;
        Ok(Box::new(PgCatalogTransaction { tx }))
    }
}

// ============================================================================
// Transaction
// ============================================================================

/// One database transaction's worth of catalog work.
pub struct PgCatalogTransaction {
    tx: Transaction<'static, Postgres>,
}

impl std::fmt::Debug for PgCatalogTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgCatalogTransaction").finish_non_exhaustive()
    }
}

#[async_trait]
impl CatalogTransaction for PgCatalogTransaction {
    async fn find_category(
        &mut self,
        event: EventId,
        category: CategoryId,
    ) -> Result<Option<Category>, StoreError> {
        fetch_category(&mut self.tx, event, category).await
    }

    async fn find_item(&mut self, event: EventId, item: ItemId) -> Result<Option<Item>, StoreError> {
        fetch_item(&mut self.tx, event, item).await
    }

    async fn find_question(
        &mut self,
        event: EventId,
        question: QuestionId,
    ) -> Result<Option<Question>, StoreError> {
        fetch_question(&mut self.tx, event, question).await
    }

    async fn find_quota(
        &mut self,
        event: EventId,
        quota: QuotaId,
    ) -> Result<Option<Quota>, StoreError> {
        fetch_quota(&mut self.tx, event, quota).await
    }

    async fn items_by_ids(
        &mut self,
        event: EventId,
        ids: &[ItemId],
    ) -> Result<Vec<Item>, StoreError> {
        fetch_items_by_ids(&mut self.tx, event, ids).await
    }

    async fn items_in_scope(
        &mut self,
        event: EventId,
        category: Option<CategoryId>,
    ) -> Result<Vec<Item>, StoreError> {
        fetch_items_in_scope(&mut self.tx, event, category).await
    }

    async fn categories(&mut self, event: EventId) -> Result<Vec<Category>, StoreError> {
        fetch_categories(&mut self.tx, event).await
    }

    async fn questions(&mut self, event: EventId) -> Result<Vec<Question>, StoreError> {
        fetch_questions(&mut self.tx, event).await
    }

    async fn item_has_order_references(&mut self, item: ItemId) -> Result<bool, StoreError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM order_positions WHERE item_id = $1)",
        )
        .bind(item.raw())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| db_err("check order references", e))?;
        Ok(exists)
    }

    async fn insert_item(
        &mut self,
        event: EventId,
        draft: &ItemDraft,
        position: i32,
    ) -> Result<Item, StoreError> {
        let (id, created_at): (i64, DateTime<Utc>) = sqlx::query_as(
            "INSERT INTO items \
                 (event_id, category_id, name, internal_name, active, admission, \
                  default_price_cents, position) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING id, created_at",
        )
        .bind(event.raw())
        .bind(draft.category.map(CategoryId::raw))
        .bind(&draft.name)
        .bind(draft.internal_name.as_deref())
        .bind(draft.active)
        .bind(draft.admission)
        .bind(draft.default_price_cents)
        .bind(position)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| db_err("insert item", e))?;

        Ok(Item {
            id: ItemId::new(id),
            event,
            category: draft.category,
            name: draft.name.clone(),
            internal_name: draft.internal_name.clone(),
            active: draft.active,
            admission: draft.admission,
            default_price_cents: draft.default_price_cents,
            position,
            created_at,
        })
    }

    async fn update_item(&mut self, item: &Item) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE items SET category_id = $2, name = $3, internal_name = $4, active = $5, \
                 admission = $6, default_price_cents = $7, position = $8 \
             WHERE id = $1",
        )
        .bind(item.id.raw())
        .bind(item.category.map(CategoryId::raw))
        .bind(&item.name)
        .bind(item.internal_name.as_deref())
        .bind(item.active)
        .bind(item.admission)
        .bind(item.default_price_cents)
        .bind(item.position)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_err("update item", e))?;
        if result.rows_affected() == 0 {
            return Err(no_row("update item"));
        }
        Ok(())
    }

    async fn set_item_placement(
        &mut self,
        item: ItemId,
        position: i32,
        category: Option<CategoryId>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE items SET position = $2, category_id = $3 WHERE id = $1")
            .bind(item.raw())
            .bind(position)
            .bind(category.map(CategoryId::raw))
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_err("place item", e))?;
        if result.rows_affected() == 0 {
            return Err(no_row("place item"));
        }
        Ok(())
    }

    async fn set_item_active(&mut self, item: ItemId, active: bool) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE items SET active = $2 WHERE id = $1")
            .bind(item.raw())
            .bind(active)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_err("toggle item", e))?;
        if result.rows_affected() == 0 {
            return Err(no_row("toggle item"));
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self), fields(item = %item))]
    async fn delete_item(&mut self, item: ItemId) -> Result<ItemDeletion, StoreError> {
        // Savepoint: a foreign-key rejection must not poison the transaction.
        let mut savepoint = self
            .tx
            .begin()
            .await
            .map_err(|e| db_err("open savepoint", e))?;
        let outcome = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(item.raw())
            .execute(&mut *savepoint)
            .await;
        match outcome {
            Ok(_) => {
                savepoint
                    .commit()
                    .await
                    .map_err(|e| db_err("release savepoint", e))?;
                Ok(ItemDeletion::Deleted)
            }
            Err(error) => {
                if let sqlx::Error::Database(db) = &error {
                    if db.is_foreign_key_violation() {
                        savepoint
                            .rollback()
                            .await
                            .map_err(|e| db_err("roll back savepoint", e))?;
                        return Ok(ItemDeletion::Blocked);
                    }
                }
                Err(db_err("delete item", error))
            }
        }
    }

    async fn insert_category(
        &mut self,
        event: EventId,
        draft: &CategoryDraft,
        position: i32,
    ) -> Result<Category, StoreError> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO categories (event_id, name, internal_name, description, position) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(event.raw())
        .bind(&draft.name)
        .bind(draft.internal_name.as_deref())
        .bind(draft.description.as_deref())
        .bind(position)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| db_err("insert category", e))?;

        Ok(Category {
            id: CategoryId::new(id),
            event,
            name: draft.name.clone(),
            internal_name: draft.internal_name.clone(),
            description: draft.description.clone(),
            position,
        })
    }

    async fn update_category(&mut self, category: &Category) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE categories SET name = $2, internal_name = $3, description = $4, \
                 position = $5 \
             WHERE id = $1",
        )
        .bind(category.id.raw())
        .bind(&category.name)
        .bind(category.internal_name.as_deref())
        .bind(category.description.as_deref())
        .bind(category.position)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_err("update category", e))?;
        if result.rows_affected() == 0 {
            return Err(no_row("update category"));
        }
        Ok(())
    }

    async fn set_category_position(
        &mut self,
        category: CategoryId,
        position: i32,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE categories SET position = $2 WHERE id = $1")
            .bind(category.raw())
            .bind(position)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_err("place category", e))?;
        if result.rows_affected() == 0 {
            return Err(no_row("place category"));
        }
        Ok(())
    }

    async fn detach_category_items(
        &mut self,
        category: CategoryId,
    ) -> Result<Vec<ItemId>, StoreError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "UPDATE items SET category_id = NULL WHERE category_id = $1 RETURNING id",
        )
        .bind(category.raw())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| db_err("detach category items", e))?;
        let mut ids: Vec<ItemId> = rows.into_iter().map(|(id,)| ItemId::new(id)).collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn delete_category(&mut self, category: CategoryId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(category.raw())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_err("delete category", e))?;
        Ok(())
    }

    async fn insert_question(
        &mut self,
        event: EventId,
        draft: &QuestionDraft,
        position: i32,
    ) -> Result<Question, StoreError> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO questions (event_id, label, kind, required, position) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(event.raw())
        .bind(&draft.label)
        .bind(kind_code(draft.kind))
        .bind(draft.required)
        .bind(position)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| db_err("insert question", e))?;
        let question = QuestionId::new(id);

        let mut options = Vec::with_capacity(draft.options.len());
        for (index, label) in draft.options.iter().enumerate() {
            let option_position = i32::try_from(index).unwrap_or(i32::MAX);
            let (option_id,): (i64,) = sqlx::query_as(
                "INSERT INTO question_options (question_id, label, position) \
                 VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(question.raw())
            .bind(label)
            .bind(option_position)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| db_err("insert question option", e))?;
            options.push(QuestionOption {
                id: OptionId::new(option_id),
                label: label.clone(),
                position: option_position,
            });
        }

        let mut item_ids = draft.item_ids.clone();
        item_ids.sort_unstable();
        for item in &item_ids {
            sqlx::query("INSERT INTO question_items (question_id, item_id) VALUES ($1, $2)")
                .bind(question.raw())
                .bind(item.raw())
                .execute(&mut *self.tx)
                .await
                .map_err(|e| db_err("link question item", e))?;
        }

        Ok(Question {
            id: question,
            event,
            label: draft.label.clone(),
            kind: draft.kind,
            required: draft.required,
            position,
            item_ids,
            options,
        })
    }

    async fn update_question(&mut self, question: &Question) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE questions SET label = $2, kind = $3, required = $4, position = $5 \
             WHERE id = $1",
        )
        .bind(question.id.raw())
        .bind(&question.label)
        .bind(kind_code(question.kind))
        .bind(question.required)
        .bind(question.position)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_err("update question", e))?;
        if result.rows_affected() == 0 {
            return Err(no_row("update question"));
        }

        // Sync options by id: id 0 rows are fresh inserts, known ids update
        // in place, stored rows missing from the list are deleted.
        let existing: Vec<(i64,)> =
            sqlx::query_as("SELECT id FROM question_options WHERE question_id = $1")
                .bind(question.id.raw())
                .fetch_all(&mut *self.tx)
                .await
                .map_err(|e| db_err("list stored options", e))?;
        let mut stale: HashSet<i64> = existing.into_iter().map(|(id,)| id).collect();

        for option in &question.options {
            if option.id.raw() == 0 {
                sqlx::query(
                    "INSERT INTO question_options (question_id, label, position) \
                     VALUES ($1, $2, $3)",
                )
                .bind(question.id.raw())
                .bind(&option.label)
                .bind(option.position)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| db_err("insert question option", e))?;
            } else {
                stale.remove(&option.id.raw());
                sqlx::query(
                    "UPDATE question_options SET label = $3, position = $4 \
                     WHERE id = $1 AND question_id = $2",
                )
                .bind(option.id.raw())
                .bind(question.id.raw())
                .bind(&option.label)
                .bind(option.position)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| db_err("update question option", e))?;
            }
        }
        if !stale.is_empty() {
            let stale: Vec<i64> = stale.into_iter().collect();
            sqlx::query("DELETE FROM question_options WHERE question_id = $1 AND id = ANY($2)")
                .bind(question.id.raw())
                .bind(&stale)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| db_err("delete stale options", e))?;
        }

        sqlx::query("DELETE FROM question_items WHERE question_id = $1")
            .bind(question.id.raw())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_err("clear question item links", e))?;
        for item in &question.item_ids {
            sqlx::query("INSERT INTO question_items (question_id, item_id) VALUES ($1, $2)")
                .bind(question.id.raw())
                .bind(item.raw())
                .execute(&mut *self.tx)
                .await
                .map_err(|e| db_err("link question item", e))?;
        }
        Ok(())
    }

    async fn set_question_position(
        &mut self,
        question: QuestionId,
        position: i32,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE questions SET position = $2 WHERE id = $1")
            .bind(question.raw())
            .bind(position)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_err("place question", e))?;
        if result.rows_affected() == 0 {
            return Err(no_row("place question"));
        }
        Ok(())
    }

    async fn delete_question(&mut self, question: QuestionId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(question.raw())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_err("delete question", e))?;
        Ok(())
    }

    async fn save_system_question_order(
        &mut self,
        event: EventId,
        order: &SystemOrderMap,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_value(order).map_err(|e| {
            StoreError::Serialization(format!("Failed to encode system question order: {e}"))
        })?;
        let result = sqlx::query("UPDATE events SET system_question_order = $2 WHERE id = $1")
            .bind(event.raw())
            .bind(value)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_err("save system question order", e))?;
        if result.rows_affected() == 0 {
            return Err(no_row("save system question order"));
        }
        Ok(())
    }

    async fn insert_quota(
        &mut self,
        event: EventId,
        draft: &QuotaDraft,
    ) -> Result<Quota, StoreError> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO quotas (event_id, name, size, closed, close_when_sold_out) \
             VALUES ($1, $2, $3, FALSE, $4) RETURNING id",
        )
        .bind(event.raw())
        .bind(&draft.name)
        .bind(draft.size)
        .bind(draft.close_when_sold_out)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| db_err("insert quota", e))?;
        let quota = QuotaId::new(id);

        let mut item_ids = draft.item_ids.clone();
        item_ids.sort_unstable();
        for item in &item_ids {
            sqlx::query("INSERT INTO quota_items (quota_id, item_id) VALUES ($1, $2)")
                .bind(quota.raw())
                .bind(item.raw())
                .execute(&mut *self.tx)
                .await
                .map_err(|e| db_err("link quota item", e))?;
        }

        Ok(Quota {
            id: quota,
            event,
            name: draft.name.clone(),
            size: draft.size,
            closed: false,
            close_when_sold_out: draft.close_when_sold_out,
            item_ids,
        })
    }

    async fn update_quota(&mut self, quota: &Quota) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE quotas SET name = $2, size = $3, closed = $4, close_when_sold_out = $5 \
             WHERE id = $1",
        )
        .bind(quota.id.raw())
        .bind(&quota.name)
        .bind(quota.size)
        .bind(quota.closed)
        .bind(quota.close_when_sold_out)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_err("update quota", e))?;
        if result.rows_affected() == 0 {
            return Err(no_row("update quota"));
        }

        sqlx::query("DELETE FROM quota_items WHERE quota_id = $1")
            .bind(quota.id.raw())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_err("clear quota item links", e))?;
        for item in &quota.item_ids {
            sqlx::query("INSERT INTO quota_items (quota_id, item_id) VALUES ($1, $2)")
                .bind(quota.id.raw())
                .bind(item.raw())
                .execute(&mut *self.tx)
                .await
                .map_err(|e| db_err("link quota item", e))?;
        }
        Ok(())
    }

    async fn delete_quota(&mut self, quota: QuotaId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM quotas WHERE id = $1")
            .bind(quota.raw())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_err("delete quota", e))?;
        Ok(())
    }

    async fn record_audit(&mut self, entry: AuditEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO audit_log (actor_id, event_id, target_kind, target_id, action, payload) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(entry.actor.raw())
        .bind(entry.event.raw())
        .bind(entry.target.kind())
        .bind(entry.target.id())
        .bind(entry.action.as_str())
        .bind(entry.payload)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_err("record audit entry", e))?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| db_err("commit transaction", e))?;
        metrics::counter!("catalog_store_commits_total").increment(1);
        Ok(())
    }
}
