//! Item lifecycle, relaxed reordering, and adjacent moves.

use super::{CatalogService, audit, note_reorder};
use crate::audit::{AuditAction, AuditEntry, AuditTarget};
use crate::entities::{Category, Item, ItemDraft, ItemPatch};
use crate::error::CatalogError;
use crate::extensions::FormSection;
use crate::ids::{ActorId, CategoryId, EventId, ItemId};
use crate::ordering::{self, MoveDirection, Placement, Ranked};
use crate::store::{CatalogTransaction, ItemDeletion, StoreError};
use metrics::counter;
use serde_json::{Map, Value, json};
use tracing::{info, instrument};

/// The item list together with its category grouping data.
#[derive(Debug, Clone)]
pub struct ItemOverview {
    /// Categories of the event, in display order.
    pub categories: Vec<Category>,
    /// Items ordered by (category position, item position).
    pub items: Vec<Item>,
}

/// One item plus the sections extensions contribute to its detail page.
#[derive(Debug, Clone)]
pub struct ItemDetail {
    /// The item itself.
    pub item: Item,
    /// Extension-contributed sections, in registration order.
    pub sections: Vec<FormSection>,
}

/// How a delete request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemRemoval {
    /// The item was deleted outright.
    Deleted,
    /// Dependent records exist; the item was disabled instead.
    Disabled,
}

impl CatalogService {
    /// Lists the event's items with their categories.
    ///
    /// # Errors
    ///
    /// [`CatalogError::EventNotFound`] or [`CatalogError::PermissionDenied`].
    pub async fn list_items(
        &self,
        actor: ActorId,
        event: EventId,
    ) -> Result<ItemOverview, CatalogError> {
        self.authorize(actor, event).await?;
        Ok(ItemOverview {
            categories: self.store.categories(event).await?,
            items: self.store.items(event).await?,
        })
    }

    /// One item plus extension sections.
    ///
    /// # Errors
    ///
    /// [`CatalogError::ItemNotFound`] when the id misses within the event.
    pub async fn item_detail(
        &self,
        actor: ActorId,
        event: EventId,
        item: ItemId,
    ) -> Result<ItemDetail, CatalogError> {
        self.authorize(actor, event).await?;
        let item = self
            .store
            .find_item(event, item)
            .await?
            .ok_or(CatalogError::ItemNotFound)?;
        let sections = self.extensions.sections_for(event, &item);
        Ok(ItemDetail { item, sections })
    }

    /// Creates an item at the end of its category scope.
    ///
    /// With `copy_from`, fields absent from the submission are seeded from
    /// the source item and the source's question links are cloned onto the
    /// new item.
    ///
    /// # Errors
    ///
    /// [`CatalogError::ItemNotFound`] for an unknown copy source,
    /// [`CatalogError::CategoryNotFound`] for an unknown target category,
    /// [`CatalogError::Validation`] for bad field values.
    #[instrument(skip(self, fields), fields(event = %event, actor = %actor))]
    pub async fn create_item(
        &self,
        actor: ActorId,
        event: EventId,
        fields: ItemPatch,
        copy_from: Option<ItemId>,
    ) -> Result<Item, CatalogError> {
        self.authorize(actor, event).await?;
        let mut tx = self.store.begin().await?;

        let source = match copy_from {
            Some(id) => Some(
                tx.find_item(event, id)
                    .await?
                    .ok_or(CatalogError::ItemNotFound)?,
            ),
            None => None,
        };
        let draft = seed_draft(fields, source.as_ref())?;
        validate_item(&draft.name, draft.default_price_cents)?;
        if let Some(category) = draft.category {
            tx.find_category(event, category)
                .await?
                .ok_or(CatalogError::CategoryNotFound)?;
        }

        let scope = tx.items_in_scope(event, draft.category).await?;
        let positions: Vec<i32> = scope.iter().map(|i| i.position).collect();
        let item = tx
            .insert_item(event, &draft, ordering::append_position(&positions))
            .await?;

        if let Some(source) = &source {
            clone_question_links(tx.as_mut(), event, source.id, item.id).await?;
        }

        let mut payload = item_payload(&draft, item.position);
        if let Some(source) = &source {
            payload.insert("copy_from".to_owned(), json!(source.id));
        }
        audit(
            tx.as_mut(),
            AuditEntry::new(actor, event, AuditTarget::Item(item.id), AuditAction::ItemAdded)
                .with_payload(Value::Object(payload)),
        )
        .await?;

        tx.commit().await?;
        self.cache.invalidate(event, item.id);
        counter!("catalog_mutations_total", "entity" => "item", "op" => "create").increment(1);
        info!(item = %item.id, "item created");
        Ok(item)
    }

    /// Applies a partial update. Only fields that actually change are
    /// persisted and audited; a no-change patch writes nothing.
    ///
    /// # Errors
    ///
    /// [`CatalogError::ItemNotFound`], [`CatalogError::CategoryNotFound`]
    /// for an unknown target category, or [`CatalogError::Validation`].
    #[instrument(skip(self, patch), fields(event = %event, actor = %actor, item = %item))]
    pub async fn update_item(
        &self,
        actor: ActorId,
        event: EventId,
        item: ItemId,
        patch: ItemPatch,
    ) -> Result<Item, CatalogError> {
        self.authorize(actor, event).await?;
        let mut tx = self.store.begin().await?;
        let current = tx
            .find_item(event, item)
            .await?
            .ok_or(CatalogError::ItemNotFound)?;

        let mut updated = current.clone();
        let mut changed = Map::new();
        if let Some(name) = patch.name {
            if name != updated.name {
                changed.insert("name".to_owned(), json!(name));
                updated.name = name;
            }
        }
        if let Some(internal_name) = patch.internal_name {
            if internal_name != updated.internal_name {
                changed.insert("internal_name".to_owned(), json!(internal_name));
                updated.internal_name = internal_name;
            }
        }
        if let Some(category) = patch.category {
            if category != updated.category {
                if let Some(target) = category {
                    tx.find_category(event, target)
                        .await?
                        .ok_or(CatalogError::CategoryNotFound)?;
                }
                changed.insert("category".to_owned(), json!(category));
                updated.category = category;
            }
        }
        if let Some(active) = patch.active {
            if active != updated.active {
                changed.insert("active".to_owned(), json!(active));
                updated.active = active;
            }
        }
        if let Some(admission) = patch.admission {
            if admission != updated.admission {
                changed.insert("admission".to_owned(), json!(admission));
                updated.admission = admission;
            }
        }
        if let Some(price) = patch.default_price_cents {
            if price != updated.default_price_cents {
                changed.insert("default_price_cents".to_owned(), json!(price));
                updated.default_price_cents = price;
            }
        }
        validate_item(&updated.name, updated.default_price_cents)?;

        if changed.is_empty() {
            return Ok(current);
        }
        tx.update_item(&updated).await?;
        audit(
            tx.as_mut(),
            AuditEntry::new(actor, event, AuditTarget::Item(item), AuditAction::ItemChanged)
                .with_payload(Value::Object(changed)),
        )
        .await?;
        tx.commit().await?;
        self.cache.invalidate(event, item);
        counter!("catalog_mutations_total", "entity" => "item", "op" => "update").increment(1);
        Ok(updated)
    }

    /// Deletes an item, or disables it when sold references exist.
    ///
    /// Items referenced by order positions are never deleted; they are
    /// marked inactive instead, as is any item whose delete trips a
    /// dependent-records constraint (plugin-owned rows).
    ///
    /// # Errors
    ///
    /// [`CatalogError::ItemNotFound`] when the id misses within the event.
    #[instrument(skip(self), fields(event = %event, actor = %actor, item = %item))]
    pub async fn delete_item(
        &self,
        actor: ActorId,
        event: EventId,
        item: ItemId,
    ) -> Result<ItemRemoval, CatalogError> {
        self.authorize(actor, event).await?;
        let mut tx = self.store.begin().await?;
        tx.find_item(event, item)
            .await?
            .ok_or(CatalogError::ItemNotFound)?;

        let removal = if tx.item_has_order_references(item).await? {
            ItemRemoval::Disabled
        } else {
            match tx.delete_item(item).await? {
                ItemDeletion::Deleted => ItemRemoval::Deleted,
                ItemDeletion::Blocked => ItemRemoval::Disabled,
            }
        };
        match removal {
            ItemRemoval::Deleted => {
                audit(
                    tx.as_mut(),
                    AuditEntry::new(actor, event, AuditTarget::Item(item), AuditAction::ItemDeleted),
                )
                .await?;
            }
            ItemRemoval::Disabled => {
                counter!("catalog_item_disable_fallbacks_total").increment(1);
                tx.set_item_active(item, false).await?;
                audit(
                    tx.as_mut(),
                    AuditEntry::new(actor, event, AuditTarget::Item(item), AuditAction::ItemChanged)
                        .with_payload(json!({"active": false})),
                )
                .await?;
            }
        }
        tx.commit().await?;
        self.cache.invalidate(event, item);
        counter!("catalog_mutations_total", "entity" => "item", "op" => "delete").increment(1);
        info!(outcome = ?removal, "item delete handled");
        Ok(removal)
    }

    /// Relaxed reorder: the submitted items are renumbered to their request
    /// index and re-scoped to the target category (`None` = uncategorized).
    /// Unmentioned items stay untouched.
    ///
    /// # Errors
    ///
    /// [`CatalogError::CategoryNotFound`] for an unknown target,
    /// [`CatalogError::Reorder`] for unknown or duplicated ids.
    #[instrument(skip(self, requested), fields(event = %event, actor = %actor, count = requested.len()))]
    pub async fn reorder_items(
        &self,
        actor: ActorId,
        event: EventId,
        target: Option<CategoryId>,
        requested: &[ItemId],
    ) -> Result<(), CatalogError> {
        self.authorize(actor, event).await?;
        let mut tx = self.store.begin().await?;
        if let Some(category) = target {
            tx.find_category(event, category)
                .await?
                .ok_or(CatalogError::CategoryNotFound)?;
        }
        let resolved: Vec<Placement> = tx
            .items_by_ids(event, requested)
            .await?
            .iter()
            .map(|i| Placement {
                id: i.id,
                position: i.position,
                category: i.category,
            })
            .collect();
        let changes = ordering::plan_relaxed(&resolved, requested, target)?;
        note_reorder("item", requested.len(), changes.len());
        for change in &changes {
            tx.set_item_placement(change.id, change.to_position, change.to_category)
                .await?;
            audit(
                tx.as_mut(),
                AuditEntry::new(
                    actor,
                    event,
                    AuditTarget::Item(change.id),
                    AuditAction::ItemReordered,
                )
                .with_payload(json!({
                    "position": change.to_position,
                    "category": change.to_category,
                })),
            )
            .await?;
        }
        tx.commit().await?;
        for change in &changes {
            self.cache.invalidate(event, change.id);
        }
        info!(changed = changes.len(), "items reordered");
        Ok(())
    }

    /// Moves an item one step within its category. At the boundary this is a
    /// silent no-op, but the scope is renumbered either way, repairing any
    /// position gaps.
    ///
    /// # Errors
    ///
    /// [`CatalogError::ItemNotFound`] when the id misses within the event.
    #[instrument(skip(self), fields(event = %event, actor = %actor, item = %item))]
    pub async fn move_item(
        &self,
        actor: ActorId,
        event: EventId,
        item: ItemId,
        direction: MoveDirection,
    ) -> Result<(), CatalogError> {
        self.authorize(actor, event).await?;
        let mut tx = self.store.begin().await?;
        let subject = tx
            .find_item(event, item)
            .await?
            .ok_or(CatalogError::ItemNotFound)?;
        let scope = tx.items_in_scope(event, subject.category).await?;
        let ranked: Vec<Ranked<ItemId>> = scope
            .iter()
            .map(|i| Ranked {
                id: i.id,
                position: i.position,
            })
            .collect();
        let changes = ordering::plan_adjacent(&ranked, item, direction)?;
        note_reorder("item", ranked.len(), changes.len());
        for change in &changes {
            tx.set_item_placement(change.id, change.to, subject.category)
                .await?;
            audit(
                tx.as_mut(),
                AuditEntry::new(
                    actor,
                    event,
                    AuditTarget::Item(change.id),
                    AuditAction::ItemReordered,
                )
                .with_payload(json!({"position": change.to})),
            )
            .await?;
        }
        tx.commit().await?;
        for change in &changes {
            self.cache.invalidate(event, change.id);
        }
        Ok(())
    }
}

/// Builds the final draft from submitted fields, falling back to the copy
/// source for anything not submitted.
fn seed_draft(fields: ItemPatch, source: Option<&Item>) -> Result<ItemDraft, CatalogError> {
    let name = fields
        .name
        .or_else(|| source.map(|s| s.name.clone()))
        .ok_or_else(|| CatalogError::invalid("name", "This field is required."))?;
    let default_price_cents = fields
        .default_price_cents
        .or_else(|| source.map(|s| s.default_price_cents))
        .ok_or_else(|| CatalogError::invalid("default_price_cents", "This field is required."))?;
    Ok(ItemDraft {
        name,
        internal_name: match fields.internal_name {
            Some(value) => value,
            None => source.and_then(|s| s.internal_name.clone()),
        },
        category: match fields.category {
            Some(value) => value,
            None => source.and_then(|s| s.category),
        },
        active: fields
            .active
            .unwrap_or_else(|| source.is_none_or(|s| s.active)),
        admission: fields
            .admission
            .unwrap_or_else(|| source.is_some_and(|s| s.admission)),
        default_price_cents,
    })
}

fn validate_item(name: &str, price: i64) -> Result<(), CatalogError> {
    if name.trim().is_empty() {
        return Err(CatalogError::invalid("name", "This field is required."));
    }
    if price < 0 {
        return Err(CatalogError::invalid(
            "default_price_cents",
            "The price must not be negative.",
        ));
    }
    Ok(())
}

/// Links the new item into every question that covers the copy source.
async fn clone_question_links(
    tx: &mut dyn CatalogTransaction,
    event: EventId,
    source: ItemId,
    target: ItemId,
) -> Result<(), StoreError> {
    for mut question in tx.questions(event).await? {
        if question.item_ids.contains(&source) {
            question.item_ids.push(target);
            tx.update_question(&question).await?;
        }
    }
    Ok(())
}

fn item_payload(draft: &ItemDraft, position: i32) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("name".to_owned(), json!(draft.name));
    payload.insert("internal_name".to_owned(), json!(draft.internal_name));
    payload.insert("category".to_owned(), json!(draft.category));
    payload.insert("active".to_owned(), json!(draft.active));
    payload.insert("admission".to_owned(), json!(draft.admission));
    payload.insert(
        "default_price_cents".to_owned(),
        json!(draft.default_price_cents),
    );
    payload.insert("position".to_owned(), json!(position));
    payload
}

// ============================================================================
// Tests
// ============================================================================
