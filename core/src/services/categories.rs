//! Category lifecycle, strict reordering, and adjacent moves.

use super::{CatalogService, audit, note_reorder};
use crate::audit::{AuditAction, AuditEntry, AuditTarget};
use crate::entities::{Category, CategoryDraft, CategoryPatch};
use crate::error::CatalogError;
use crate::ids::{ActorId, CategoryId, EventId};
use crate::ordering::{self, MoveDirection, Ranked};
use metrics::counter;
use serde_json::{Map, Value, json};
use tracing::{info, instrument};

impl CatalogService {
    /// Lists the event's categories in display order.
    ///
    /// # Errors
    ///
    /// [`CatalogError::EventNotFound`] or [`CatalogError::PermissionDenied`].
    pub async fn list_categories(
        &self,
        actor: ActorId,
        event: EventId,
    ) -> Result<Vec<Category>, CatalogError> {
        self.authorize(actor, event).await?;
        Ok(self.store.categories(event).await?)
    }

    /// Creates a category at the end of the event scope.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Validation`] for an empty name.
    #[instrument(skip(self, draft), fields(event = %event, actor = %actor))]
    pub async fn create_category(
        &self,
        actor: ActorId,
        event: EventId,
        draft: CategoryDraft,
    ) -> Result<Category, CatalogError> {
        self.authorize(actor, event).await?;
        if draft.name.trim().is_empty() {
            return Err(CatalogError::invalid("name", "This field is required."));
        }
        let mut tx = self.store.begin().await?;
        let positions: Vec<i32> = tx
            .categories(event)
            .await?
            .iter()
            .map(|c| c.position)
            .collect();
        let category = tx
            .insert_category(event, &draft, ordering::append_position(&positions))
            .await?;
        audit(
            tx.as_mut(),
            AuditEntry::new(
                actor,
                event,
                AuditTarget::Category(category.id),
                AuditAction::CategoryAdded,
            )
            .with_payload(json!({
                "name": draft.name,
                "internal_name": draft.internal_name,
                "description": draft.description,
                "position": category.position,
            })),
        )
        .await?;
        tx.commit().await?;
        counter!("catalog_mutations_total", "entity" => "category", "op" => "create").increment(1);
        info!(category = %category.id, "category created");
        Ok(category)
    }

    /// Applies a partial update; only fields that actually change are
    /// persisted and audited.
    ///
    /// # Errors
    ///
    /// [`CatalogError::CategoryNotFound`] or [`CatalogError::Validation`].
    #[instrument(skip(self, patch), fields(event = %event, actor = %actor, category = %category))]
    pub async fn update_category(
        &self,
        actor: ActorId,
        event: EventId,
        category: CategoryId,
        patch: CategoryPatch,
    ) -> Result<Category, CatalogError> {
        self.authorize(actor, event).await?;
        let mut tx = self.store.begin().await?;
        let current = tx
            .find_category(event, category)
            .await?
            .ok_or(CatalogError::CategoryNotFound)?;

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
        if let Some(description) = patch.description {
            if description != updated.description {
                changed.insert("description".to_owned(), json!(description));
                updated.description = description;
            }
        }
        if updated.name.trim().is_empty() {
            return Err(CatalogError::invalid("name", "This field is required."));
        }

        if changed.is_empty() {
            return Ok(current);
        }
        tx.update_category(&updated).await?;
        audit(
            tx.as_mut(),
            AuditEntry::new(
                actor,
                event,
                AuditTarget::Category(category),
                AuditAction::CategoryChanged,
            )
            .with_payload(Value::Object(changed)),
        )
        .await?;
        tx.commit().await?;
        counter!("catalog_mutations_total", "entity" => "category", "op" => "update").increment(1);
        Ok(updated)
    }

    /// Deletes a category after detaching its items. Detached items keep
    /// their positions; surviving categories are not renumbered.
    ///
    /// # Errors
    ///
    /// [`CatalogError::CategoryNotFound`] when the id misses within the
    /// event.
    #[instrument(skip(self), fields(event = %event, actor = %actor, category = %category))]
    pub async fn delete_category(
        &self,
        actor: ActorId,
        event: EventId,
        category: CategoryId,
    ) -> Result<(), CatalogError> {
        self.authorize(actor, event).await?;
        let mut tx = self.store.begin().await?;
        tx.find_category(event, category)
            .await?
            .ok_or(CatalogError::CategoryNotFound)?;

        let detached = tx.detach_category_items(category).await?;
        audit(
            tx.as_mut(),
            AuditEntry::new(
                actor,
                event,
                AuditTarget::Category(category),
                AuditAction::CategoryDeleted,
            ),
        )
        .await?;
        tx.delete_category(category).await?;
        tx.commit().await?;
        counter!("catalog_mutations_total", "entity" => "category", "op" => "delete").increment(1);
        info!(detached = detached.len(), "category deleted");
        Ok(())
    }

    /// Strict reorder: the submitted ids must cover every category of the
    /// event exactly once.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Reorder`] for unknown ids or incomplete coverage.
    #[instrument(skip(self, requested), fields(event = %event, actor = %actor, count = requested.len()))]
    pub async fn reorder_categories(
        &self,
        actor: ActorId,
        event: EventId,
        requested: &[CategoryId],
    ) -> Result<(), CatalogError> {
        self.authorize(actor, event).await?;
        let mut tx = self.store.begin().await?;
        let universe: Vec<Ranked<CategoryId>> = tx
            .categories(event)
            .await?
            .iter()
            .map(|c| Ranked {
                id: c.id,
                position: c.position,
            })
            .collect();
        let changes = ordering::plan_strict(&universe, requested)?;
        note_reorder("category", universe.len(), changes.len());
        for change in &changes {
            tx.set_category_position(change.id, change.to).await?;
            audit(
                tx.as_mut(),
                AuditEntry::new(
                    actor,
                    event,
                    AuditTarget::Category(change.id),
                    AuditAction::CategoryReordered,
                )
                .with_payload(json!({"position": change.to})),
            )
            .await?;
        }
        tx.commit().await?;
        info!(changed = changes.len(), "categories reordered");
        Ok(())
    }

    /// Moves a category one step within the event; a boundary move is a
    /// silent no-op apart from gap repair.
    ///
    /// # Errors
    ///
    /// [`CatalogError::CategoryNotFound`] when the id misses within the
    /// event.
    #[instrument(skip(self), fields(event = %event, actor = %actor, category = %category))]
    pub async fn move_category(
        &self,
        actor: ActorId,
        event: EventId,
        category: CategoryId,
        direction: MoveDirection,
    ) -> Result<(), CatalogError> {
        self.authorize(actor, event).await?;
        let mut tx = self.store.begin().await?;
        tx.find_category(event, category)
            .await?
            .ok_or(CatalogError::CategoryNotFound)?;
        let scope: Vec<Ranked<CategoryId>> = tx
            .categories(event)
            .await?
            .iter()
            .map(|c| Ranked {
                id: c.id,
                position: c.position,
            })
            .collect();
        let changes = ordering::plan_adjacent(&scope, category, direction)?;
        note_reorder("category", scope.len(), changes.len());
        for change in &changes {
            tx.set_category_position(change.id, change.to).await?;
            audit(
                tx.as_mut(),
                AuditEntry::new(
                    actor,
                    event,
                    AuditTarget::Category(change.id),
                    AuditAction::CategoryReordered,
                )
                .with_payload(json!({"position": change.to})),
            )
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
