//! Quota lifecycle, availability views, and the reopen action.

use super::{CatalogService, audit, resolve_items};
use crate::audit::{AuditAction, AuditEntry, AuditTarget};
use crate::availability::QuotaSnapshot;
use crate::entities::{Quota, QuotaDraft, QuotaPatch};
use crate::error::CatalogError;
use crate::ids::{ActorId, EventId, QuotaId};
use metrics::counter;
use serde_json::{Map, Value, json};
use tracing::{info, instrument};

/// One quota with its live availability, for the listing.
#[derive(Debug, Clone)]
pub struct QuotaOverview {
    /// The quota itself.
    pub quota: Quota,
    /// Current usage snapshot.
    pub availability: QuotaSnapshot,
}

/// Quota detail: the availability breakdown and, for closed quotas,
/// whether reopening would leave it sold out anyway.
#[derive(Debug, Clone)]
pub struct QuotaDetail {
    /// The quota itself.
    pub quota: Quota,
    /// Current usage snapshot.
    pub availability: QuotaSnapshot,
    /// For closed quotas: whether demand alone exhausts it. `None` when the
    /// quota is open.
    pub sold_out_when_open: Option<bool>,
}

impl CatalogService {
    /// Lists the event's quotas with availability snapshots.
    ///
    /// # Errors
    ///
    /// [`CatalogError::EventNotFound`] or [`CatalogError::PermissionDenied`].
    pub async fn list_quotas(
        &self,
        actor: ActorId,
        event: EventId,
    ) -> Result<Vec<QuotaOverview>, CatalogError> {
        self.authorize(actor, event).await?;
        let mut overview = Vec::new();
        for quota in self.store.quotas(event).await? {
            let availability = self.availability.snapshot(&quota, false).await?;
            overview.push(QuotaOverview {
                quota,
                availability,
            });
        }
        Ok(overview)
    }

    /// One quota with its availability breakdown.
    ///
    /// # Errors
    ///
    /// [`CatalogError::QuotaNotFound`] when the id misses within the event.
    pub async fn quota_detail(
        &self,
        actor: ActorId,
        event: EventId,
        quota: QuotaId,
    ) -> Result<QuotaDetail, CatalogError> {
        self.authorize(actor, event).await?;
        let quota = self
            .store
            .find_quota(event, quota)
            .await?
            .ok_or(CatalogError::QuotaNotFound)?;
        let availability = self.availability.snapshot(&quota, false).await?;
        let sold_out_when_open = if quota.closed {
            Some(self.availability.snapshot(&quota, true).await?.sold_out())
        } else {
            None
        };
        Ok(QuotaDetail {
            quota,
            availability,
            sold_out_when_open,
        })
    }

    /// Creates a quota.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Validation`] for an empty name, a negative size, or
    /// item links outside the event.
    #[instrument(skip(self, draft), fields(event = %event, actor = %actor))]
    pub async fn create_quota(
        &self,
        actor: ActorId,
        event: EventId,
        draft: QuotaDraft,
    ) -> Result<Quota, CatalogError> {
        self.authorize(actor, event).await?;
        validate_quota(&draft.name, draft.size)?;
        let mut tx = self.store.begin().await?;
        let item_ids = resolve_items(tx.as_mut(), event, &draft.item_ids).await?;
        let draft = QuotaDraft { item_ids, ..draft };

        let quota = tx.insert_quota(event, &draft).await?;
        audit(
            tx.as_mut(),
            AuditEntry::new(actor, event, AuditTarget::Quota(quota.id), AuditAction::QuotaAdded)
                .with_payload(json!({
                    "name": draft.name,
                    "size": draft.size,
                    "close_when_sold_out": draft.close_when_sold_out,
                    "items": draft.item_ids,
                })),
        )
        .await?;
        tx.commit().await?;
        counter!("catalog_mutations_total", "entity" => "quota", "op" => "create").increment(1);
        info!(quota = %quota.id, "quota created");
        Ok(quota)
    }

    /// Applies a partial update; only fields that actually change are
    /// persisted and audited.
    ///
    /// # Errors
    ///
    /// [`CatalogError::QuotaNotFound`] or [`CatalogError::Validation`].
    #[instrument(skip(self, patch), fields(event = %event, actor = %actor, quota = %quota))]
    pub async fn update_quota(
        &self,
        actor: ActorId,
        event: EventId,
        quota: QuotaId,
        patch: QuotaPatch,
    ) -> Result<Quota, CatalogError> {
        self.authorize(actor, event).await?;
        let mut tx = self.store.begin().await?;
        let current = tx
            .find_quota(event, quota)
            .await?
            .ok_or(CatalogError::QuotaNotFound)?;

        let mut updated = current.clone();
        let mut changed = Map::new();
        if let Some(name) = patch.name {
            if name != updated.name {
                changed.insert("name".to_owned(), json!(name));
                updated.name = name;
            }
        }
        if let Some(size) = patch.size {
            if size != updated.size {
                changed.insert("size".to_owned(), json!(size));
                updated.size = size;
            }
        }
        if let Some(close_when_sold_out) = patch.close_when_sold_out {
            if close_when_sold_out != updated.close_when_sold_out {
                changed.insert("close_when_sold_out".to_owned(), json!(close_when_sold_out));
                updated.close_when_sold_out = close_when_sold_out;
            }
        }
        if let Some(item_ids) = patch.item_ids {
            let item_ids = resolve_items(tx.as_mut(), event, &item_ids).await?;
            if item_ids != updated.item_ids {
                changed.insert("items".to_owned(), json!(item_ids));
                updated.item_ids = item_ids;
            }
        }
        validate_quota(&updated.name, updated.size)?;

        if changed.is_empty() {
            return Ok(current);
        }
        tx.update_quota(&updated).await?;
        audit(
            tx.as_mut(),
            AuditEntry::new(actor, event, AuditTarget::Quota(quota), AuditAction::QuotaChanged)
                .with_payload(Value::Object(changed)),
        )
        .await?;
        tx.commit().await?;
        counter!("catalog_mutations_total", "entity" => "quota", "op" => "update").increment(1);
        Ok(updated)
    }

    /// Deletes a quota unconditionally.
    ///
    /// # Errors
    ///
    /// [`CatalogError::QuotaNotFound`] when the id misses within the event.
    #[instrument(skip(self), fields(event = %event, actor = %actor, quota = %quota))]
    pub async fn delete_quota(
        &self,
        actor: ActorId,
        event: EventId,
        quota: QuotaId,
    ) -> Result<(), CatalogError> {
        self.authorize(actor, event).await?;
        let mut tx = self.store.begin().await?;
        tx.find_quota(event, quota)
            .await?
            .ok_or(CatalogError::QuotaNotFound)?;
        audit(
            tx.as_mut(),
            AuditEntry::new(actor, event, AuditTarget::Quota(quota), AuditAction::QuotaDeleted),
        )
        .await?;
        tx.delete_quota(quota).await?;
        tx.commit().await?;
        counter!("catalog_mutations_total", "entity" => "quota", "op" => "delete").increment(1);
        Ok(())
    }

    /// Reopens a closed quota. With `keep_open`, automatic closing is also
    /// switched off so the quota stays open once it sells out again. Flags
    /// that already hold the requested value are left untouched and not
    /// audited.
    ///
    /// # Errors
    ///
    /// [`CatalogError::QuotaNotFound`] when the id misses within the event.
    #[instrument(skip(self), fields(event = %event, actor = %actor, quota = %quota, keep_open))]
    pub async fn reopen_quota(
        &self,
        actor: ActorId,
        event: EventId,
        quota: QuotaId,
        keep_open: bool,
    ) -> Result<Quota, CatalogError> {
        self.authorize(actor, event).await?;
        let mut tx = self.store.begin().await?;
        let current = tx
            .find_quota(event, quota)
            .await?
            .ok_or(CatalogError::QuotaNotFound)?;

        let mut updated = current.clone();
        let mut entries = Vec::new();
        if updated.closed {
            updated.closed = false;
            entries.push(AuditEntry::new(
                actor,
                event,
                AuditTarget::Quota(quota),
                AuditAction::QuotaOpened,
            ));
        }
        if keep_open && updated.close_when_sold_out {
            updated.close_when_sold_out = false;
            entries.push(
                AuditEntry::new(actor, event, AuditTarget::Quota(quota), AuditAction::QuotaChanged)
                    .with_payload(json!({"close_when_sold_out": false})),
            );
        }

        if entries.is_empty() {
            return Ok(current);
        }
        tx.update_quota(&updated).await?;
        for entry in entries {
            audit(tx.as_mut(), entry).await?;
        }
        tx.commit().await?;
        counter!("catalog_mutations_total", "entity" => "quota", "op" => "reopen").increment(1);
        info!("quota reopened");
        Ok(updated)
    }
}

fn validate_quota(name: &str, size: Option<i64>) -> Result<(), CatalogError> {
    if name.trim().is_empty() {
        return Err(CatalogError::invalid("name", "This field is required."));
    }
    if size.is_some_and(|s| s < 0) {
        return Err(CatalogError::invalid(
            "size",
            "The size must not be negative.",
        ));
    }
    Ok(())
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
    use marquee_core::availability::{AvailabilityLevel, QuotaSnapshot};
    use marquee_core::entities::{QuotaDraft, QuotaPatch};
    use marquee_core::error::CatalogError;
    use marquee_core::extensions::ExtensionRegistry;
    use marquee_core::ids::{ActorId, EventId, ItemId, QuotaId};
    use marquee_testing::{
        AllowAll, MemoryStore, RecordingInvalidator, StaticAvailability, fixtures,
    };
    use serde_json::{Value, json};
    use std::sync::Arc;

    const EVENT: EventId = EventId::new(1);
    const ACTOR: ActorId = ActorId::new(7);

    fn service_with(
        store: &Arc<MemoryStore>,
        availability: StaticAvailability,
    ) -> CatalogService {
        CatalogService::new(
            Arc::<MemoryStore>::clone(store),
            Arc::new(AllowAll),
            Arc::new(RecordingInvalidator::default()),
            Arc::new(availability),
            ExtensionRegistry::new(),
        )
    }

    fn service(store: &Arc<MemoryStore>) -> CatalogService {
        service_with(store, StaticAvailability::default())
    }

    fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.seed_event(fixtures::event(EVENT));
        store
    }

    #[tokio::test]
    async fn create_validates_and_audits() {
        let store = seeded_store();
        store.seed_item(fixtures::item(1, EVENT, None, 0));
        let service = service(&store);

        let draft = QuotaDraft {
            name: "Main".to_owned(),
            size: Some(100),
            close_when_sold_out: true,
            item_ids: vec![ItemId::new(1)],
        };
        let quota = service.create_quota(ACTOR, EVENT, draft).await.unwrap();

        assert_eq!(quota.size, Some(100));
        let entries = store.audit_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::QuotaAdded);
        assert_eq!(entries[0].payload["size"], 100);
    }

    #[tokio::test]
    async fn negative_size_is_rejected() {
        let store = seeded_store();
        let service = service(&store);

        let draft = QuotaDraft {
            name: "Main".to_owned(),
            size: Some(-1),
            close_when_sold_out: false,
            item_ids: Vec::new(),
        };
        let err = service.create_quota(ACTOR, EVENT, draft).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[tokio::test]
    async fn reopen_clears_closed_and_logs_opened() {
        let store = seeded_store();
        let mut quota = fixtures::quota(20, EVENT);
        quota.closed = true;
        store.seed_quota(quota);
        let service = service(&store);

        let reopened = service
            .reopen_quota(ACTOR, EVENT, QuotaId::new(20), false)
            .await
            .unwrap();

        assert!(!reopened.closed);
        let entries = store.audit_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::QuotaOpened);
    }

    #[tokio::test]
    async fn reopen_keep_open_also_disables_auto_close_with_second_record() {
        let store = seeded_store();
        let mut quota = fixtures::quota(20, EVENT);
        quota.closed = true;
        quota.close_when_sold_out = true;
        store.seed_quota(quota);
        let service = service(&store);

        let reopened = service
            .reopen_quota(ACTOR, EVENT, QuotaId::new(20), true)
            .await
            .unwrap();

        assert!(!reopened.closed);
        assert!(!reopened.close_when_sold_out);
        let entries = store.audit_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, AuditAction::QuotaOpened);
        assert_eq!(entries[1].action, AuditAction::QuotaChanged);
        assert_eq!(entries[1].payload, json!({"close_when_sold_out": false}));
    }

    #[tokio::test]
    async fn reopening_an_open_quota_is_silent() {
        let store = seeded_store();
        store.seed_quota(fixtures::quota(20, EVENT));
        let service = service(&store);

        let quota = service
            .reopen_quota(ACTOR, EVENT, QuotaId::new(20), false)
            .await
            .unwrap();

        assert!(!quota.closed);
        assert!(store.audit_entries().is_empty());
    }

    #[tokio::test]
    async fn detail_reports_sold_out_hint_only_when_closed() {
        let store = seeded_store();
        let mut quota = fixtures::quota(20, EVENT);
        quota.closed = true;
        store.seed_quota(quota);
        store.seed_quota(fixtures::quota(21, EVENT));
        let availability = StaticAvailability::new(QuotaSnapshot {
            level: AvailabilityLevel::Gone,
            remaining: Some(0),
            paid_orders: 10,
            pending_orders: 0,
        })
        .when_ignoring_closed(QuotaSnapshot {
            level: AvailabilityLevel::Ordered,
            remaining: Some(0),
            paid_orders: 10,
            pending_orders: 0,
        });
        let service = service_with(&store, availability);

        let closed = service
            .quota_detail(ACTOR, EVENT, QuotaId::new(20))
            .await
            .unwrap();
        assert_eq!(closed.sold_out_when_open, Some(true));

        let open = service
            .quota_detail(ACTOR, EVENT, QuotaId::new(21))
            .await
            .unwrap();
        assert_eq!(open.sold_out_when_open, None);
    }

    #[tokio::test]
    async fn update_audits_changed_fields_only() {
        let store = seeded_store();
        store.seed_quota(fixtures::quota(20, EVENT));
        let service = service(&store);

        let patch = QuotaPatch {
            size: Some(None),
            ..QuotaPatch::default()
        };
        let updated = service
            .update_quota(ACTOR, EVENT, QuotaId::new(20), patch)
            .await
            .unwrap();

        assert_eq!(updated.size, None);
        let entries = store.audit_entries();
        assert_eq!(entries.len(), 1);
        let payload = entries[0].payload.as_object().unwrap();
        assert_eq!(payload.len(), 1);
        assert_eq!(payload["size"], Value::Null);
    }

    #[tokio::test]
    async fn delete_is_audited() {
        let store = seeded_store();
        store.seed_quota(fixtures::quota(20, EVENT));
        let service = service(&store);

        service.delete_quota(ACTOR, EVENT, QuotaId::new(20)).await.unwrap();

        assert!(store.quota(QuotaId::new(20)).is_none());
        assert_eq!(store.audit_entries()[0].action, AuditAction::QuotaDeleted);
    }
}
